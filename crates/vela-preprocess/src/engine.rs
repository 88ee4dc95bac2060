use std::collections::VecDeque;

use smallvec::SmallVec;
use smol_str::SmolStr;
use vela_lexer::SyntaxKind;
use vela_source::{FileId, SourceLoc, SourceManager, SourceRange, Span, TextRange, TextSize};
use vela_tokens::{tokenize, PpEventSink, Token};

use crate::env::{BodyToken, MacroDef, MacroEnv};
use crate::PreprocError;

/// Hard cap on rescanning steps for a single top-level macro usage,
/// so a self-referential definition cannot loop forever.
const MAX_EXPANSION_STEPS: usize = 256;

struct CondFrame {
    allow_emit: bool,
    taken: bool,
    saw_else: bool,
}

/// What's left of a preprocessing pass after tokens and expansion
/// events have gone to the sink.
#[derive(Debug)]
pub struct PreprocOutput {
    pub errors: Vec<PreprocError>,
    pub final_env: MacroEnv,
}

type ArgTokens = Vec<(SyntaxKind, SmolStr)>;
type Args = SmallVec<[ArgTokens; 4]>;

/// Run one preprocessing pass over `file` with an empty starting
/// environment. Every output token (terminated by one eof sentinel)
/// and every macro-expansion event goes to `sink` in execution order.
pub fn preprocess(
    file: FileId,
    sm: &mut SourceManager,
    sink: &mut dyn PpEventSink,
) -> PreprocOutput {
    preprocess_with_env(file, sm, MacroEnv::empty(), sink)
}

/// Like [`preprocess`], but with pre-defined macros.
pub fn preprocess_with_env(
    file: FileId,
    sm: &mut SourceManager,
    env: MacroEnv,
    sink: &mut dyn PpEventSink,
) -> PreprocOutput {
    let tokens = tokenize(file, sm);
    Preprocessor {
        file,
        sm,
        tokens,
        env,
        cond_stack: Vec::new(),
        errors: Vec::new(),
        pos: 0,
    }
    .run(sink)
}

struct Preprocessor<'a> {
    file: FileId,
    sm: &'a mut SourceManager,
    /// The file's spelled tokens (trivia-free, file locations).
    tokens: Vec<Token>,
    env: MacroEnv,
    cond_stack: Vec<CondFrame>,
    errors: Vec<PreprocError>,
    pos: usize,
}

impl Preprocessor<'_> {
    fn run(mut self, sink: &mut dyn PpEventSink) -> PreprocOutput {
        while self.pos < self.tokens.len() {
            let tok = self.tokens[self.pos];
            match tok.kind {
                SyntaxKind::Directive => self.handle_directive(tok),
                SyntaxKind::MacroUsage => {
                    if self.currently_emitting() {
                        self.expand_macro_use(sink);
                    } else {
                        self.pos += 1;
                    }
                }
                _ => {
                    if self.currently_emitting() {
                        sink.expanded_token(tok);
                    }
                    self.pos += 1;
                }
            }
        }

        if !self.cond_stack.is_empty() {
            let eof = TextSize::of(self.sm.file_text(self.file));
            self.push_error(TextRange::empty(eof), "unterminated conditional directive");
        }

        sink.expanded_token(Token::new(
            self.sm.end_of_file_loc(self.file),
            TextSize::new(0),
            SyntaxKind::Eof,
        ));

        PreprocOutput {
            errors: self.errors,
            final_env: self.env,
        }
    }

    fn currently_emitting(&self) -> bool {
        self.cond_stack.last().is_none_or(|f| f.allow_emit)
    }

    fn push_error(&mut self, range: TextRange, message: impl Into<SmolStr>) {
        self.errors.push(PreprocError {
            span: Span {
                file: self.file,
                range,
            },
            message: message.into(),
        });
    }

    /// Report an error at a token, resolving macro locations to their
    /// expansion point so the anchor is always real source text.
    fn error_at(&mut self, tok: Token, message: impl Into<SmolStr>) {
        let anchor = self.sm.decompose(self.sm.expansion_loc(tok.loc));
        debug_assert_eq!(anchor.file, self.file);
        self.push_error(TextRange::at(anchor.offset, tok.len), message);
    }

    fn offset_of(&self, tok: &Token) -> TextSize {
        self.sm.decompose(tok.loc).offset
    }

    fn token_text(&self, tok: &Token) -> SmolStr {
        SmolStr::from(tok.text(self.sm))
    }

    /// Byte offset of the newline ending the line containing `from`
    /// (or end of file).
    fn line_end(&self, from: TextSize) -> TextSize {
        let text = self.sm.file_text(self.file);
        let start = usize::from(from);
        let end = text[start..].find('\n').map_or(text.len(), |i| start + i);
        #[allow(clippy::cast_possible_truncation)]
        TextSize::new(end as u32)
    }

    /// Advance past every remaining token of the current line.
    fn skip_line(&mut self, line_end: TextSize) {
        while self.pos < self.tokens.len() && self.offset_of(&self.tokens[self.pos]) < line_end {
            self.pos += 1;
        }
    }

    /// First token after the directive if it is an identifier on the
    /// same line.
    fn name_on_line(&self, line_end: TextSize) -> Option<(Token, SmolStr)> {
        let tok = self.tokens.get(self.pos + 1)?;
        if self.offset_of(tok) >= line_end || tok.kind != SyntaxKind::Ident {
            return None;
        }
        Some((*tok, self.token_text(tok)))
    }

    fn handle_directive(&mut self, dir: Token) {
        let text = self.token_text(&dir);
        match text.as_str() {
            "`ifdef" => self.handle_ifdef(dir, false),
            "`ifndef" => self.handle_ifdef(dir, true),
            "`elsif" => self.handle_elsif(dir),
            "`else" => self.handle_else(dir),
            "`endif" => self.handle_endif(dir),
            "`define" => self.handle_define(dir),
            "`undef" => self.handle_undef(dir),
            _ => self.handle_unsupported(dir, &text),
        }
    }

    fn handle_ifdef(&mut self, dir: Token, invert: bool) {
        let line_end = self.line_end(self.offset_of(&dir));
        let name = self.name_on_line(line_end);
        self.skip_line(line_end);

        let predicate = if let Some((_, n)) = &name {
            let defined = self.env.is_defined(n);
            if invert {
                !defined
            } else {
                defined
            }
        } else {
            let label = if invert { "`ifndef" } else { "`ifdef" };
            self.error_at(dir, format!("{label} missing macro name"));
            false
        };

        let parent = self.currently_emitting();
        self.cond_stack.push(CondFrame {
            allow_emit: parent && predicate,
            taken: predicate,
            saw_else: false,
        });
    }

    fn handle_elsif(&mut self, dir: Token) {
        let line_end = self.line_end(self.offset_of(&dir));
        let name = self.name_on_line(line_end);
        self.skip_line(line_end);

        let Some((frame, parent_frames)) = self.cond_stack.split_last_mut() else {
            self.error_at(dir, "`elsif without matching `ifdef/`ifndef");
            return;
        };
        let parent_emit = parent_frames.last().is_none_or(|p| p.allow_emit);

        if frame.saw_else {
            self.error_at(dir, "`elsif after `else");
            return;
        }

        let mut missing_name = false;
        let predicate = match &name {
            Some((_, n)) => self.env.is_defined(n),
            None => {
                missing_name = true;
                false
            }
        };

        if frame.taken {
            frame.allow_emit = false;
        } else {
            frame.allow_emit = parent_emit && predicate;
            if predicate {
                frame.taken = true;
            }
        }

        if missing_name {
            self.error_at(dir, "`elsif missing macro name");
        }
    }

    fn handle_else(&mut self, dir: Token) {
        let line_end = self.line_end(self.offset_of(&dir));
        self.skip_line(line_end);

        let Some((frame, parent_frames)) = self.cond_stack.split_last_mut() else {
            self.error_at(dir, "`else without matching `ifdef/`ifndef");
            return;
        };
        let parent_emit = parent_frames.last().is_none_or(|p| p.allow_emit);

        if frame.saw_else {
            self.error_at(dir, "duplicate `else");
            return;
        }
        frame.saw_else = true;
        frame.allow_emit = parent_emit && !frame.taken;
    }

    fn handle_endif(&mut self, dir: Token) {
        let line_end = self.line_end(self.offset_of(&dir));
        self.skip_line(line_end);
        if self.cond_stack.pop().is_none() {
            self.error_at(dir, "`endif without matching `ifdef/`ifndef");
        }
    }

    fn handle_define(&mut self, dir: Token) {
        let line_end = self.line_end(self.offset_of(&dir));
        if !self.currently_emitting() {
            self.skip_line(line_end);
            return;
        }

        let Some((name_tok, name)) = self.name_on_line(line_end) else {
            self.error_at(dir, "`define missing macro name");
            self.skip_line(line_end);
            return;
        };
        let mut idx = self.pos + 2;

        // Function-like iff `(` immediately follows the name.
        let mut params: Option<SmallVec<[SmolStr; 4]>> = None;
        if let Some(t) = self.tokens.get(idx) {
            if t.kind == SyntaxKind::LParen
                && t.loc == name_tok.end_location()
                && self.offset_of(t) < line_end
            {
                idx += 1;
                let mut list: SmallVec<[SmolStr; 4]> = SmallVec::new();
                let mut closed = false;
                while let Some(t) = self.tokens.get(idx).copied() {
                    if self.offset_of(&t) >= line_end {
                        break;
                    }
                    idx += 1;
                    match t.kind {
                        SyntaxKind::RParen => {
                            closed = true;
                            break;
                        }
                        SyntaxKind::Comma => {}
                        SyntaxKind::Ident => list.push(self.token_text(&t)),
                        _ => break,
                    }
                }
                if !closed {
                    self.error_at(dir, "malformed `define parameter list");
                    self.skip_line(line_end);
                    return;
                }
                params = Some(list);
            }
        }

        // The rest of the line is the body.
        let mut body = Vec::new();
        while let Some(t) = self.tokens.get(idx).copied() {
            if self.offset_of(&t) >= line_end {
                break;
            }
            let text = self.token_text(&t);
            let body_tok = match (&params, t.kind) {
                (Some(ps), SyntaxKind::Ident) => match ps.iter().position(|p| *p == text) {
                    Some(i) => BodyToken::Param(i),
                    None => BodyToken::Text(t.kind, text),
                },
                _ => BodyToken::Text(t.kind, text),
            };
            body.push(body_tok);
            idx += 1;
        }

        self.env.define(MacroDef { name, params, body });
        self.pos = idx;
    }

    fn handle_undef(&mut self, dir: Token) {
        let line_end = self.line_end(self.offset_of(&dir));
        if !self.currently_emitting() {
            self.skip_line(line_end);
            return;
        }
        match self.name_on_line(line_end) {
            Some((_, name)) => self.env.undef(&name),
            None => self.error_at(dir, "`undef missing macro name"),
        }
        self.skip_line(line_end);
    }

    fn handle_unsupported(&mut self, dir: Token, text: &str) {
        let line_end = self.line_end(self.offset_of(&dir));
        if self.currently_emitting() {
            self.error_at(dir, format!("unsupported directive: {text}"));
        }
        self.skip_line(line_end);
    }

    /// Expand the macro usage at the cursor, rescanning its output.
    ///
    /// Replacement tokens go through a pending queue: a usage produced
    /// by an expansion is expanded in turn, and a function-like usage
    /// at the end of the output takes its arguments from the file --
    /// the case where an invocation begins inside a macro body but
    /// ends in real source text.
    fn expand_macro_use(&mut self, sink: &mut dyn PpEventSink) {
        let name_tok = self.tokens[self.pos];
        self.pos += 1;

        let mut pending: VecDeque<Token> = VecDeque::new();
        self.expand_invocation(name_tok, &mut pending, sink);

        let mut steps = 0;
        while let Some(tok) = pending.pop_front() {
            if tok.kind == SyntaxKind::MacroUsage {
                steps += 1;
                if steps > MAX_EXPANSION_STEPS {
                    self.error_at(name_tok, "recursive macro expansion");
                    return;
                }
                self.expand_invocation(tok, &mut pending, sink);
            } else {
                sink.expanded_token(tok);
            }
        }
    }

    /// Expand one invocation (name token plus, for function-like
    /// macros, an argument list taken from the pending queue or the
    /// file), firing the expansion event before queuing the
    /// replacement tokens.
    fn expand_invocation(
        &mut self,
        name_tok: Token,
        pending: &mut VecDeque<Token>,
        sink: &mut dyn PpEventSink,
    ) {
        let spelled = self.token_text(&name_tok);
        let name = &spelled[1..];
        let Some(def) = self.env.get(name).cloned() else {
            self.error_at(name_tok, format!("undefined macro: {name}"));
            return;
        };

        let mut args: Args = SmallVec::new();
        let mut end_loc = name_tok.loc;
        if let Some(param_names) = &def.params {
            if pending.front().map(|t| t.kind) == Some(SyntaxKind::LParen) {
                let Some(rparen) = self.collect_args_from_queue(name_tok, pending, &mut args)
                else {
                    return;
                };
                end_loc = rparen.loc;
            } else if pending.is_empty()
                && self.tokens.get(self.pos).map(|t| t.kind) == Some(SyntaxKind::LParen)
            {
                let Some(rparen) = self.collect_args_from_file(name_tok, &mut args) else {
                    return;
                };
                end_loc = rparen.loc;
            } else {
                self.error_at(name_tok, format!("macro {name} requires arguments"));
                return;
            }
            if args.len() != param_names.len() {
                self.error_at(
                    name_tok,
                    format!(
                        "macro {name} expects {} argument(s), got {}",
                        param_names.len(),
                        args.len()
                    ),
                );
                return;
            }
        }

        // Report the expansion before emitting its replacement.
        sink.macro_expanded(self.sm, &name_tok, SourceRange::new(name_tok.loc, end_loc));

        // Substitute parameters and queue the output for rescanning.
        // Every produced token is rooted at this invocation.
        let call_site = name_tok.loc;
        let mut produced: Vec<Token> = Vec::new();
        for body_tok in &def.body {
            match body_tok {
                BodyToken::Text(kind, text) => {
                    produced.push(self.mint(call_site, *kind, text.clone()));
                }
                BodyToken::Param(i) => {
                    for (kind, text) in &args[*i] {
                        produced.push(self.mint(call_site, *kind, text.clone()));
                    }
                }
            }
        }
        for tok in produced.into_iter().rev() {
            pending.push_front(tok);
        }
    }

    /// Collect `( ... )` argument tokens from the pending queue (the
    /// parens themselves came out of an enclosing expansion).
    fn collect_args_from_queue(
        &mut self,
        name_tok: Token,
        pending: &mut VecDeque<Token>,
        args: &mut Args,
    ) -> Option<Token> {
        pending.pop_front(); // the '('
        let mut depth = 1usize;
        let mut current: ArgTokens = Vec::new();
        while let Some(t) = pending.pop_front() {
            match t.kind {
                SyntaxKind::LParen => {
                    depth += 1;
                    current.push((t.kind, self.token_text(&t)));
                }
                SyntaxKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        args.push(std::mem::take(&mut current));
                        return Some(t);
                    }
                    current.push((t.kind, self.token_text(&t)));
                }
                SyntaxKind::Comma if depth == 1 => args.push(std::mem::take(&mut current)),
                _ => current.push((t.kind, self.token_text(&t))),
            }
        }
        self.error_at(name_tok, "unterminated macro argument list");
        None
    }

    /// Collect `( ... )` argument tokens from the file, advancing the
    /// spelled cursor past the closing paren.
    fn collect_args_from_file(&mut self, name_tok: Token, args: &mut Args) -> Option<Token> {
        self.pos += 1; // the '('
        let mut depth = 1usize;
        let mut current: ArgTokens = Vec::new();
        while self.pos < self.tokens.len() {
            let t = self.tokens[self.pos];
            self.pos += 1;
            match t.kind {
                SyntaxKind::LParen => {
                    depth += 1;
                    current.push((t.kind, self.token_text(&t)));
                }
                SyntaxKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        args.push(std::mem::take(&mut current));
                        return Some(t);
                    }
                    current.push((t.kind, self.token_text(&t)));
                }
                SyntaxKind::Comma if depth == 1 => args.push(std::mem::take(&mut current)),
                _ => current.push((t.kind, self.token_text(&t))),
            }
        }
        self.error_at(name_tok, "unterminated macro argument list");
        None
    }

    /// Mint a macro-produced token rooted at `call_site`.
    fn mint(&mut self, call_site: SourceLoc, kind: SyntaxKind, text: SmolStr) -> Token {
        let len = TextSize::of(text.as_str());
        Token::new(self.sm.create_macro_loc(call_site, text), len, kind)
    }
}
