use std::collections::HashMap;

use vela_source::{SourceLoc, SourceManager, SourceRange};

use crate::buffer::TokenBuffer;
use crate::builder::Builder;
use crate::token::Token;

/// Narrow capability the preprocessor reports into: every output token
/// and every macro-expansion event, in execution order. How events are
/// delivered (direct calls, a queue) is the caller's business.
pub trait PpEventSink {
    /// One token of the expanded stream, in emission order.
    fn expanded_token(&mut self, tok: Token);

    /// A macro was expanded. `name` is the invocation's name token and
    /// `span` the source range it consumed; `span.end` is the location
    /// of the last consumed token.
    fn macro_expanded(&mut self, sm: &SourceManager, name: &Token, span: SourceRange);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectorState {
    Active,
    Detached,
}

/// Live recorder for one preprocessing pass.
///
/// Accumulates the expanded token stream and a table of top-level
/// macro-expansion spans (invocation start location -> end location).
/// Hand the pass's `SourceManager` to [`TokenCollector::consume`] once
/// preprocessing finishes to build the [`TokenBuffer`].
#[derive(Default)]
pub struct TokenCollector {
    expanded: Vec<Token>,
    expansions: HashMap<SourceLoc, SourceLoc>,
    /// End of the most recently recorded top-level span. Used to detect
    /// nested expansions, which must not be recorded.
    last_expansion_end: Option<SourceLoc>,
    state: CollectorState,
}

impl Default for CollectorState {
    fn default() -> Self {
        CollectorState::Active
    }
}

impl TokenCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop recording. Further events are silently ignored, so an event
    /// source that outlives the recording pass cannot corrupt the
    /// captured state.
    pub fn detach(&mut self) {
        self.state = CollectorState::Detached;
    }

    /// Consume the captured state and build the token buffer. The
    /// recorder is gone afterwards; this is a one-way hand-off.
    pub fn consume(self, sm: &SourceManager) -> TokenBuffer {
        Builder::new(self.expanded, self.expansions, sm).build()
    }
}

impl PpEventSink for TokenCollector {
    fn expanded_token(&mut self, tok: Token) {
        if self.state == CollectorState::Detached {
            return;
        }
        // Trivia never reaches semantic analysis; keep the stream clean
        // even if the event source forwards it.
        if tok.kind.is_trivia() {
            return;
        }
        self.expanded.push(tok);
    }

    fn macro_expanded(&mut self, sm: &SourceManager, _name: &Token, span: SourceRange) {
        if self.state == CollectorState::Detached {
            return;
        }
        // Only record top-level expansions that directly produce
        // expanded tokens. Macro expansion is not a tree but a token
        // rewrite, so an invocation can also start inside one macro's
        // output and end in the file; that case is folded into the
        // enclosing span below.

        // The last token of any top-level expansion is in a file. A
        // span ending elsewhere is nested (e.g. inside another macro's
        // body or arguments) and the spelled tokens it would map are
        // not findable by raw lexing.
        if !span.end.is_file() {
            return;
        }
        // An enclosing, still-open expansion makes this one nested.
        if let Some(last) = self.last_expansion_end {
            if !sm.is_before_in_tu(last, span.end) {
                return;
            }
        }

        // An invocation that starts in a macro body but ends in the
        // file merges with the outer expansion: re-key it at the outer
        // start, overwriting the outer span's endpoint.
        let mut begin = span.begin;
        if !begin.is_file() {
            begin = sm.expansion_loc(begin);
            debug_assert!(
                self.expansions.contains_key(&begin),
                "overlapping expansions must share an expansion location"
            );
        }

        self.expansions.insert(begin, span.end);
        self.last_expansion_end = Some(span.end);
    }
}
