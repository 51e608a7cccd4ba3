//! Query-string editor state machine.
//!
//! [`EditorState::handle`] takes one [`EditorEvent`] and returns the
//! [`Effect`]s the host has to carry out (invoke a callback, render, arm a
//! timer). The state machine itself never touches a surface or a clock.

use crate::classify::{normalized_offset, parse_query_string};
use crate::debounce::{Debouncer, TimerToken};
use crate::format::{PlainFormatter, TokenFormatter};
use crate::render::{render, CaretPlacement, Rendered};
use crate::suggest::{RequestId, SuggestionFence, SuggestionRequest, SuggestionSelection};
use crate::token::{is_opening_bracket, serialize, token_ranges, Token, TokenKind};
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// Surface text changed; `caret` is the global caret offset.
    Input { text: String, caret: usize },
    TimerFired(TimerToken),
    CompositionStart,
    CompositionEnd { text: String, caret: usize },
    Click { caret: usize },
    /// Enter pressed; `text` is whatever the surface currently shows.
    Enter { text: String },
    Escape,
    SetToken(SuggestionSelection),
    SetQueryString { text: String, caret: usize },
    SetPopup(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Input(String),
    Change(String),
    Search(String),
    Query,
    PopUp {
        id: RequestId,
        request: SuggestionRequest,
    },
    PopDown,
    Render(Rendered),
    ScheduleTimer {
        token: TimerToken,
        delay: Duration,
    },
}

/// What the popup should show for a caret position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionContext {
    /// `None` means the popup should be closed.
    pub request: Option<SuggestionRequest>,
    /// Fragment used to live-filter the candidate list.
    pub search: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingInput {
    text: String,
    caret: usize,
}

pub struct EditorState {
    query_string: String,
    tokens: Vec<Token>,
    caret: usize,
    is_composing: bool,
    is_popup: bool,
    popup: Option<SuggestionRequest>,
    pending: Option<PendingInput>,
    debouncer: Debouncer,
    fence: SuggestionFence,
    formatter: Box<dyn TokenFormatter>,
}

impl fmt::Debug for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorState")
            .field("query_string", &self.query_string)
            .field("caret", &self.caret)
            .field("is_composing", &self.is_composing)
            .field("is_popup", &self.is_popup)
            .field("popup", &self.popup)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl EditorState {
    pub fn new(initial: &str) -> Self {
        Self::with_options(initial, DEFAULT_DEBOUNCE, Box::new(PlainFormatter))
    }

    pub fn with_options(initial: &str, debounce: Duration, formatter: Box<dyn TokenFormatter>) -> Self {
        let tokens = parse_query_string(initial);
        let query_string = serialize(&tokens);
        let caret = query_string.chars().count();
        Self {
            query_string,
            tokens,
            caret,
            is_composing: false,
            is_popup: false,
            popup: None,
            pending: None,
            debouncer: Debouncer::new(debounce),
            fence: SuggestionFence::default(),
            formatter,
        }
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn is_composing(&self) -> bool {
        self.is_composing
    }

    pub fn is_popup(&self) -> bool {
        self.is_popup
    }

    /// The request the open popup is scoped to.
    pub fn popup(&self) -> Option<&SuggestionRequest> {
        self.popup.as_ref().filter(|_| self.is_popup)
    }

    /// True when `id` belongs to the latest popup request.
    pub fn accepts(&self, id: RequestId) -> bool {
        self.fence.accept(id)
    }

    /// Initial render of the current buffer, caret at the end.
    pub fn render(&self) -> Rendered {
        render(&self.tokens, CaretPlacement::End)
    }

    pub fn handle(&mut self, event: EditorEvent) -> Vec<Effect> {
        match event {
            EditorEvent::Input { text, caret } => self.on_input(text, caret),
            EditorEvent::TimerFired(token) => self.on_timer(token),
            EditorEvent::CompositionStart => {
                self.is_composing = true;
                Vec::new()
            }
            EditorEvent::CompositionEnd { text, caret } => {
                self.is_composing = false;
                self.on_input(text, caret)
            }
            EditorEvent::Click { caret } => self.on_click(caret),
            EditorEvent::Enter { text } => self.on_enter(text),
            EditorEvent::Escape => {
                let mut effects = Vec::new();
                self.close_popup(&mut effects);
                effects
            }
            EditorEvent::SetToken(selection) => self.set_token(selection),
            EditorEvent::SetQueryString { text, caret } => self.set_query_string(&text, caret),
            EditorEvent::SetPopup(open) => {
                self.is_popup = open;
                if !open {
                    self.popup = None;
                    self.fence.invalidate();
                }
                Vec::new()
            }
        }
    }

    fn on_input(&mut self, text: String, caret: usize) -> Vec<Effect> {
        if self.is_composing {
            return Vec::new();
        }
        let token = self.debouncer.schedule();
        let effects = vec![
            Effect::Input(text.clone()),
            Effect::ScheduleTimer {
                token,
                delay: self.debouncer.delay(),
            },
        ];
        self.pending = Some(PendingInput { text, caret });
        effects
    }

    fn on_timer(&mut self, token: TimerToken) -> Vec<Effect> {
        if !self.debouncer.fire(token) {
            trace!(?token, "stale debounce timer");
            return Vec::new();
        }
        let Some(pending) = self.pending.take() else {
            return Vec::new();
        };
        let mut effects = self.commit(&pending.text, CaretPlacement::Preserve(pending.caret));
        self.refresh_popup(&mut effects);
        effects
    }

    fn on_click(&mut self, caret: usize) -> Vec<Effect> {
        self.caret = caret.min(self.query_string.chars().count());
        let mut effects = Vec::new();
        if self.is_popup {
            self.close_popup(&mut effects);
            return effects;
        }
        let context = suggestion_context(&self.tokens, self.caret);
        let request = context.request.unwrap_or_else(SuggestionRequest::key);
        self.open_popup(request, &mut effects);
        effects.push(Effect::Search(context.search));
        effects
    }

    fn on_enter(&mut self, text: String) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(pending) = self.pending.take() {
            self.debouncer.cancel();
            effects = self.commit(&pending.text, CaretPlacement::Preserve(pending.caret));
        } else if self.query_string.is_empty() && !text.trim().is_empty() {
            effects = self.commit(&text, CaretPlacement::End);
        }
        effects.push(Effect::Query);
        effects
    }

    fn set_token(&mut self, selection: SuggestionSelection) -> Vec<Effect> {
        if let Some(pending) = self.pending.take() {
            self.debouncer.cancel();
            self.tokens = parse_query_string(&pending.text);
            self.query_string = serialize(&self.tokens);
        }

        let mut text = self.query_string.clone();
        match self.tokens.last() {
            Some(last) if last.kind == selection.kind => {
                let formatted = self.format_selection(&selection);
                text = serialize(&self.tokens[..self.tokens.len() - 1]);
                text.push_str(&formatted);
            }
            last => {
                let formatted = self.format_selection(&selection);
                if needs_separator(&text, last, selection.kind) {
                    text.push(' ');
                }
                text.push_str(&formatted);
            }
        }

        let mut effects = self.commit(&text, CaretPlacement::End);
        self.refresh_popup(&mut effects);
        effects
    }

    fn set_query_string(&mut self, text: &str, caret: usize) -> Vec<Effect> {
        self.pending = None;
        self.debouncer.cancel();
        self.tokens = parse_query_string(text);
        self.query_string = serialize(&self.tokens);
        let placement = normalize_placement(text, CaretPlacement::Preserve(caret));
        let rendered = render(&self.tokens, placement);
        self.caret = rendered.caret;
        vec![Effect::Render(rendered)]
    }

    fn format_selection(&self, selection: &SuggestionSelection) -> String {
        match selection.kind {
            TokenKind::Key => self.formatter.format_key(&selection.value),
            TokenKind::Value => {
                let field = cursor_field(&self.tokens, self.tokens.len());
                let method = self
                    .tokens
                    .iter()
                    .rev()
                    .find(|t| t.kind == TokenKind::Method)
                    .map_or("", |t| t.value.as_str());
                self.formatter.format_value(&field, method, &selection.value)
            }
            TokenKind::Condition | TokenKind::ValueCondition => {
                selection.value.trim().to_ascii_uppercase()
            }
            _ => selection.value.clone(),
        }
    }

    /// Re-tokenizes `text`, emits `Change` and a render.
    ///
    /// A preserved caret is measured in `text` and is mapped onto the
    /// normalized query string before rendering.
    fn commit(&mut self, text: &str, placement: CaretPlacement) -> Vec<Effect> {
        self.tokens = parse_query_string(text);
        self.query_string = serialize(&self.tokens);
        let rendered = render(&self.tokens, normalize_placement(text, placement));
        self.caret = rendered.caret;
        debug!(query = %self.query_string, caret = self.caret, "query string committed");
        vec![
            Effect::Change(self.query_string.clone()),
            Effect::Render(rendered),
        ]
    }

    fn refresh_popup(&mut self, effects: &mut Vec<Effect>) {
        let context = suggestion_context(&self.tokens, self.caret);
        debug!(?context, "suggestion context");
        match context.request {
            Some(request) => self.open_popup(request, effects),
            None => self.close_popup(effects),
        }
        effects.push(Effect::Search(context.search));
    }

    fn open_popup(&mut self, request: SuggestionRequest, effects: &mut Vec<Effect>) {
        let id = self.fence.issue();
        self.is_popup = true;
        self.popup = Some(request.clone());
        effects.push(Effect::PopUp { id, request });
    }

    fn close_popup(&mut self, effects: &mut Vec<Effect>) {
        if self.is_popup {
            self.is_popup = false;
            self.popup = None;
            self.fence.invalidate();
            effects.push(Effect::PopDown);
        }
    }
}

fn normalize_placement(text: &str, placement: CaretPlacement) -> CaretPlacement {
    match placement {
        CaretPlacement::Preserve(caret) => CaretPlacement::Preserve(normalized_offset(text, caret)),
        CaretPlacement::End => CaretPlacement::End,
    }
}

/// No space before a method, directly after a method or an opening bracket,
/// or when the buffer is empty or already ends in whitespace.
fn needs_separator(text: &str, last: Option<&Token>, kind: TokenKind) -> bool {
    if text.is_empty() || text.ends_with(char::is_whitespace) || kind == TokenKind::Method {
        return false;
    }
    match last {
        Some(token) if token.kind == TokenKind::Method => false,
        Some(token) if token.kind == TokenKind::Bracket => {
            !token.value.chars().next().is_some_and(is_opening_bracket)
        }
        _ => true,
    }
}

/// Index of the token under the caret.
///
/// A caret sitting on the boundary between two tokens belongs to the one on
/// its left. Falls back to the last token when nothing contains the caret.
pub fn cursor_token(tokens: &[Token], caret: usize) -> Option<usize> {
    if tokens.is_empty() {
        return None;
    }
    if caret == 0 {
        return Some(0);
    }
    token_ranges(tokens)
        .iter()
        .position(|range| range.start < caret && caret <= range.end)
        .or(Some(tokens.len() - 1))
}

/// Nearest `Key` before `index`, trimmed; empty when there is none.
pub fn cursor_field(tokens: &[Token], index: usize) -> String {
    tokens[..index.min(tokens.len())]
        .iter()
        .rev()
        .find(|t| t.kind == TokenKind::Key)
        .map(|t| t.value.trim().to_string())
        .unwrap_or_default()
}

/// Decides which popup belongs to `caret` in `tokens`.
pub fn suggestion_context(tokens: &[Token], caret: usize) -> SuggestionContext {
    let Some(index) = cursor_token(tokens, caret).filter(|_| !tokens.iter().all(Token::is_split))
    else {
        return SuggestionContext {
            request: Some(SuggestionRequest::key()),
            search: String::new(),
        };
    };

    let token = &tokens[index];
    let search = match token.kind {
        TokenKind::Key | TokenKind::Value => token.value.trim().to_string(),
        _ => String::new(),
    };
    let at_end = caret >= token_ranges(tokens)[index].end;

    let request = if index == tokens.len() - 1 && at_end {
        Some(trailing_request(tokens, index))
    } else {
        let field = || cursor_field(tokens, index);
        match token.kind {
            TokenKind::Key => Some(SuggestionRequest::key()),
            TokenKind::Value => Some(SuggestionRequest::new(TokenKind::Value, field())),
            TokenKind::Method => Some(SuggestionRequest::new(TokenKind::Method, field())),
            TokenKind::Condition => Some(SuggestionRequest::new(TokenKind::Condition, "")),
            TokenKind::ValueCondition => Some(SuggestionRequest::new(TokenKind::Condition, field())),
            TokenKind::Bracket | TokenKind::Split => None,
        }
    };
    SuggestionContext { request, search }
}

/// What comes after the last token once the user finished typing it.
fn trailing_request(tokens: &[Token], index: usize) -> SuggestionRequest {
    let Some(index) = tokens[..=index].iter().rposition(|t| !t.is_split()) else {
        return SuggestionRequest::key();
    };
    let token = &tokens[index];
    let field = cursor_field(tokens, index);
    match token.kind {
        TokenKind::Key => SuggestionRequest::new(TokenKind::Method, token.value.trim()),
        TokenKind::Method | TokenKind::ValueCondition => SuggestionRequest::new(TokenKind::Value, field),
        TokenKind::Value => SuggestionRequest::new(TokenKind::Condition, field),
        TokenKind::Condition => SuggestionRequest::key(),
        TokenKind::Bracket => {
            if token.value.chars().next().is_some_and(is_opening_bracket) {
                SuggestionRequest::new(TokenKind::Value, field)
            } else {
                SuggestionRequest::new(TokenKind::Condition, field)
            }
        }
        TokenKind::Split => SuggestionRequest::key(),
    }
}
