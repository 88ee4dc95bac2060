//! One-pass macro preprocessor: the live event source the token
//! mapping engine records. Handles `` `define ``/`` `undef ``,
//! conditional compilation, and macro expansion with argument
//! substitution; reports every output token and every expansion event
//! to a [`vela_tokens::PpEventSink`] in execution order.

use smol_str::SmolStr;
use vela_source::Span;

mod engine;
mod env;

pub use engine::{preprocess, preprocess_with_env, PreprocOutput};
pub use env::{BodyToken, MacroDef, MacroEnv};

/// A recoverable preprocessing error, anchored at source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocError {
    pub span: Span,
    pub message: SmolStr,
}
