use vela_lexer::SyntaxKind;
use vela_source::{FileId, SourceLoc, SourceManager, Span, TextRange, TextSize};

/// An immutable token: location, byte length, lexical kind.
///
/// The printable text is the backing buffer sliced at
/// `[loc, loc + len)`; for macro locations the manager keeps the
/// spelling itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub loc: SourceLoc,
    pub len: TextSize,
    pub kind: SyntaxKind,
}

impl Token {
    pub fn new(loc: SourceLoc, len: TextSize, kind: SyntaxKind) -> Self {
        Self { loc, len, kind }
    }

    /// The token's spelling.
    pub fn text<'a>(&self, sm: &'a SourceManager) -> &'a str {
        sm.token_text(self.loc, self.len)
    }

    /// One past the last byte of the token. File locations only.
    pub fn end_location(&self) -> SourceLoc {
        self.loc.offset_by(self.len)
    }

    /// The file span this token covers. Spelled tokens only.
    pub fn file_range(&self, sm: &SourceManager) -> Span {
        assert!(self.loc.is_file(), "must be a spelled token");
        let begin = sm.decompose(self.loc);
        Span {
            file: begin.file,
            range: TextRange::at(begin.offset, self.len),
        }
    }

    /// The file span from the start of `first` to the end of `last`.
    /// Both tokens must be spelled tokens of the same file, in order.
    pub fn range_between(sm: &SourceManager, first: &Token, last: &Token) -> Span {
        let f = first.file_range(sm);
        let l = last.file_range(sm);
        assert_eq!(f.file, l.file, "tokens from different files");
        assert!(
            f.range == l.range || f.range.end() <= l.range.start(),
            "wrong order of tokens"
        );
        Span {
            file: f.file,
            range: TextRange::new(f.range.start(), l.range.end()),
        }
    }

    pub(crate) fn dump_for_tests(&self, sm: &SourceManager) -> String {
        format!("{:?}   {}", self.kind, self.text(sm))
    }
}

/// Re-lex a file's full buffer into its spelled-token sequence.
///
/// This is authoritative for the buffer builder: it depends only on the
/// file's text, never on tokens observed during preprocessing. Trivia
/// is dropped, identifier-like raw tokens arrive already canonicalized
/// to their keyword kind, and the terminal eof is never stored.
pub fn tokenize(file: FileId, sm: &SourceManager) -> Vec<Token> {
    let text = sm.file_text(file);
    let mut tokens = Vec::new();
    let mut offset = TextSize::new(0);
    for raw in vela_lexer::lex(text) {
        let start = offset;
        offset += raw.len;
        if raw.kind.is_trivia() || raw.kind == SyntaxKind::Eof {
            continue;
        }
        tokens.push(Token::new(sm.file_loc(file, start), raw.len, raw.kind));
    }
    tokens
}
