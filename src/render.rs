//! Cursor-preserving renderer.
//!
//! The editable surface is abstracted as an ordered list of text nodes. The
//! caret is tracked as a *global offset*: the number of characters before it,
//! counting every text node in document order. Re-rendering replaces all
//! nodes and then maps the old global offset back onto the new nodes.

use crate::token::{Token, TokenKind};
use serde::Serialize;

/// One styled span per token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSpan {
    pub index: usize,
    pub kind: TokenKind,
    pub class: &'static str,
    pub text: String,
}

/// Output of [`render`]: new content plus the global caret offset to restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    pub spans: Vec<RenderedSpan>,
    pub caret: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretPlacement {
    /// Keep the caret at this global offset, clamped to the new length.
    Preserve(usize),
    /// Force the caret to the end of the content.
    End,
}

/// A caret position expressed as (text node, character offset in the node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodePosition {
    pub node: usize,
    pub offset: usize,
}

impl NodePosition {
    pub fn new(node: usize, offset: usize) -> Self {
        Self { node, offset }
    }
}

pub fn render(tokens: &[Token], placement: CaretPlacement) -> Rendered {
    let spans: Vec<RenderedSpan> = tokens
        .iter()
        .enumerate()
        .map(|(index, token)| RenderedSpan {
            index,
            kind: token.kind,
            class: token.kind.css_class(),
            text: token.value.clone(),
        })
        .collect();
    let total: usize = tokens.iter().map(Token::char_len).sum();
    let caret = match placement {
        CaretPlacement::Preserve(offset) => offset.min(total),
        CaretPlacement::End => total,
    };
    Rendered { spans, caret }
}

/// Characters preceding `caret`, counting only text-node characters in order.
pub fn global_offset<S: AsRef<str>>(nodes: &[S], caret: NodePosition) -> usize {
    let mut offset = 0;
    for (i, node) in nodes.iter().enumerate() {
        let len = node.as_ref().chars().count();
        if i == caret.node {
            return offset + caret.offset.min(len);
        }
        offset += len;
    }
    offset
}

/// Maps a global offset back to a node position, clamping past the end.
///
/// On a boundary between two nodes the end of the earlier node wins.
pub fn locate_offset<S: AsRef<str>>(nodes: &[S], offset: usize) -> NodePosition {
    let mut consumed = 0;
    for (i, node) in nodes.iter().enumerate() {
        let len = node.as_ref().chars().count();
        if offset <= consumed + len {
            return NodePosition::new(i, offset - consumed);
        }
        consumed += len;
    }
    match nodes.len() {
        0 => NodePosition::default(),
        n => NodePosition::new(n - 1, nodes[n - 1].as_ref().chars().count()),
    }
}

/// An editable surface the editor renders into.
///
/// Implementations live at the platform edge (a contenteditable element, a
/// terminal line, the in-memory [`TextSurface`]).
pub trait Surface {
    fn text_nodes(&self) -> Vec<&str>;
    fn caret(&self) -> Option<NodePosition>;
    fn replace_content(&mut self, spans: &[RenderedSpan]);
    fn set_caret(&mut self, position: NodePosition);
    fn focus(&mut self);

    fn text(&self) -> String {
        self.text_nodes().concat()
    }
}

/// Global caret offset of a surface; a missing selection counts as end of text.
pub fn caret_offset<S: Surface + ?Sized>(surface: &S) -> usize {
    let nodes = surface.text_nodes();
    match surface.caret() {
        Some(position) => global_offset(&nodes, position),
        None => nodes.iter().map(|n| n.chars().count()).sum(),
    }
}

/// Replaces the surface content and restores the caret inside it.
pub fn apply_render<S: Surface + ?Sized>(surface: &mut S, rendered: &Rendered) {
    surface.replace_content(&rendered.spans);
    let position = locate_offset(&surface.text_nodes(), rendered.caret);
    surface.set_caret(position);
    surface.focus();
}

/// In-memory surface: a list of spans and a caret.
#[derive(Debug, Clone, Default)]
pub struct TextSurface {
    spans: Vec<RenderedSpan>,
    caret: Option<NodePosition>,
    focused: bool,
}

impl TextSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> &[RenderedSpan] {
        &self.spans
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Replaces everything with one unstyled node, caret at the end.
    /// Simulates a paste or a host writing raw text into the surface.
    pub fn set_raw_text(&mut self, text: &str) {
        self.spans = vec![RenderedSpan {
            index: 0,
            kind: TokenKind::Value,
            class: "",
            text: text.to_string(),
        }];
        self.caret = Some(NodePosition::new(0, text.chars().count()));
    }

    /// Inserts `text` at the caret, as typing would, and advances the caret.
    pub fn type_text(&mut self, text: &str) {
        if self.spans.is_empty() {
            self.set_raw_text(text);
            return;
        }
        let nodes: Vec<&str> = self.spans.iter().map(|s| s.text.as_str()).collect();
        let position = self
            .caret
            .unwrap_or_else(|| locate_offset(&nodes, usize::MAX));
        let span = &mut self.spans[position.node];
        let byte = span
            .text
            .char_indices()
            .nth(position.offset)
            .map_or(span.text.len(), |(i, _)| i);
        span.text.insert_str(byte, text);
        self.caret = Some(NodePosition::new(
            position.node,
            position.offset + text.chars().count(),
        ));
    }

    /// Deletes the character before the caret, if any.
    pub fn backspace(&mut self) {
        let nodes: Vec<String> = self.spans.iter().map(|s| s.text.clone()).collect();
        let offset = caret_offset(&*self);
        if offset == 0 {
            return;
        }
        let mut text: String = nodes.concat();
        if let Some((byte, _)) = text.char_indices().nth(offset - 1) {
            text.remove(byte);
        }
        self.set_raw_text(&text);
        self.caret = Some(NodePosition::new(0, offset - 1));
    }

    pub fn move_caret(&mut self, offset: usize) {
        let position = locate_offset(&self.text_nodes(), offset);
        self.caret = Some(position);
    }
}

impl Surface for TextSurface {
    fn text_nodes(&self) -> Vec<&str> {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    fn caret(&self) -> Option<NodePosition> {
        self.caret
    }

    fn replace_content(&mut self, spans: &[RenderedSpan]) {
        self.spans = spans.to_vec();
        self.caret = None;
    }

    fn set_caret(&mut self, position: NodePosition) {
        self.caret = Some(position);
    }

    fn focus(&mut self) {
        self.focused = true;
    }
}
