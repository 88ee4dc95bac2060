use vela_source::TextSize;

mod keywords;
use keywords::classify_word;

/// Token kinds for the raw lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    // Trivia
    Whitespace = 0,
    LineComment,
    BlockComment,

    // Punctuation
    Semicolon,
    Comma,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Dot,
    Assign,
    At,
    Hash,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,

    // Literals
    IntLiteral,
    StringLiteral,

    // Identifiers
    Ident,

    // Backtick tokens: built-in directives (`define, `ifdef, ...) and
    // macro usages (`NAME).
    Directive,
    MacroUsage,

    // Keywords
    ModuleKw,
    EndmoduleKw,
    InputKw,
    OutputKw,
    WireKw,
    RegKw,
    LogicKw,
    AssignKw,
    BeginKw,
    EndKw,
    IfKw,
    ElseKw,
    ParameterKw,

    // Special
    Error,
    Eof,
}

impl SyntaxKind {
    /// Whitespace and comments: lexed for spelled-token fidelity, but
    /// never part of the preprocessed token stream.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            SyntaxKind::Whitespace | SyntaxKind::LineComment | SyntaxKind::BlockComment
        )
    }

    /// Tokens that name something: plain identifiers and macro usages.
    pub fn is_identifier_like(self) -> bool {
        matches!(self, SyntaxKind::Ident | SyntaxKind::MacroUsage)
    }
}

/// A lexed token (kind + length).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub len: TextSize,
}

/// Lex the full source string into a list of tokens (including trivia).
pub fn lex(src: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = src;

    while !rest.is_empty() {
        let (kind, consumed) = lex_one(rest);
        tokens.push(Token {
            kind,
            #[allow(clippy::cast_possible_truncation)]
            len: TextSize::new(consumed as u32),
        });
        rest = &rest[consumed..];
    }

    tokens.push(Token {
        kind: SyntaxKind::Eof,
        len: TextSize::new(0),
    });
    tokens
}

fn lex_one(s: &str) -> (SyntaxKind, usize) {
    let bytes = s.as_bytes();
    let c = bytes[0];

    // Whitespace
    if c.is_ascii_whitespace() {
        let n = bytes.iter().take_while(|b| b.is_ascii_whitespace()).count();
        return (SyntaxKind::Whitespace, n);
    }

    // Line comment
    if bytes.len() >= 2 && c == b'/' && bytes[1] == b'/' {
        let n = bytes.iter().take_while(|&&b| b != b'\n').count();
        return (SyntaxKind::LineComment, n);
    }

    // Block comment
    if bytes.len() >= 2 && c == b'/' && bytes[1] == b'*' {
        let end = s[2..].find("*/").map_or(s.len(), |i| i + 4);
        return (SyntaxKind::BlockComment, end);
    }

    // Backtick directive or macro usage
    if c == b'`' {
        let word_len = ident_len(&bytes[1..]);
        if word_len == 0 {
            return (SyntaxKind::Error, 1);
        }
        let kind = if is_builtin_directive(&s[1..1 + word_len]) {
            SyntaxKind::Directive
        } else {
            SyntaxKind::MacroUsage
        };
        return (kind, 1 + word_len);
    }

    // Single-char punctuation
    let punct = match c {
        b';' => Some(SyntaxKind::Semicolon),
        b',' => Some(SyntaxKind::Comma),
        b'(' => Some(SyntaxKind::LParen),
        b')' => Some(SyntaxKind::RParen),
        b'{' => Some(SyntaxKind::LBrace),
        b'}' => Some(SyntaxKind::RBrace),
        b'[' => Some(SyntaxKind::LBracket),
        b']' => Some(SyntaxKind::RBracket),
        b':' => Some(SyntaxKind::Colon),
        b'.' => Some(SyntaxKind::Dot),
        b'=' => Some(SyntaxKind::Assign),
        b'@' => Some(SyntaxKind::At),
        b'#' => Some(SyntaxKind::Hash),
        b'+' => Some(SyntaxKind::Plus),
        b'-' => Some(SyntaxKind::Minus),
        b'*' => Some(SyntaxKind::Star),
        _ => None,
    };
    if let Some(kind) = punct {
        return (kind, 1);
    }

    // Slash (when not a comment)
    if c == b'/' {
        return (SyntaxKind::Slash, 1);
    }

    // String literal
    if c == b'"' {
        let n = 1 + bytes[1..].iter().take_while(|&&b| b != b'"').count() + 1;
        let n = n.min(s.len());
        return (SyntaxKind::StringLiteral, n);
    }

    // Integer literal
    if c.is_ascii_digit() {
        let n = bytes
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_' || **b == b'\'')
            .count();
        return (SyntaxKind::IntLiteral, n);
    }

    // Identifier / keyword
    if c.is_ascii_alphabetic() || c == b'_' || c == b'$' {
        let n = ident_len(bytes);
        return (classify_word(&s[..n]), n);
    }

    // Unknown -> error token, consume one byte
    (SyntaxKind::Error, 1)
}

fn ident_len(bytes: &[u8]) -> usize {
    if bytes
        .first()
        .is_none_or(|b| !(b.is_ascii_alphabetic() || *b == b'_' || *b == b'$'))
    {
        return 0;
    }
    bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_' || **b == b'$')
        .count()
}

fn is_builtin_directive(word: &str) -> bool {
    matches!(
        word,
        "define"
            | "undef"
            | "ifdef"
            | "ifndef"
            | "elsif"
            | "else"
            | "endif"
            | "include"
            | "timescale"
            | "resetall"
    )
}
