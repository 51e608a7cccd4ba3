//! Query-string engine for the log retrieval console: tokenizer, classifier,
//! cursor-preserving renderer and the autocomplete state machine.

pub mod ast;
pub mod classify;
pub mod config;
pub mod debounce;
pub mod editor;
pub mod format;
pub mod highlight;
pub mod lexer;
pub mod parser;
pub mod query_editor;
pub mod render;
pub mod suggest;
pub mod token;

pub use classify::parse_query_string;
pub use editor::{EditorEvent, EditorState, Effect};
pub use query_editor::{EditorHooks, QueryStringEditor};
pub use token::{serialize, Token, TokenKind};
