use std::collections::HashMap;
use std::fmt::Write as _;
use std::ops::Range;

use vela_lexer::SyntaxKind;
use vela_source::{FileId, SourceLoc, SourceManager, SourceRange};

use crate::token::Token;

/// One stretch where spelled and expanded streams diverge: the spelled
/// tokens `[begin_spelled, end_spelled)` of one file collapsed into the
/// expanded tokens `[begin_expanded, end_expanded)` of the global
/// stream. An empty expanded range means the spelled tokens produced no
/// output (a directive line, a macro expanding to nothing, a skipped
/// region).
///
/// Plain indices, never references: the backing arrays stay free to
/// move until the buffer is frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub begin_spelled: u32,
    pub end_spelled: u32,
    pub begin_expanded: u32,
    pub end_expanded: u32,
}

/// Per-file side of the buffer: the file's spelled tokens, the
/// contiguous slice of the expanded stream attributed to it, and its
/// mapping records sorted by construction.
///
/// Contiguity of `begin_expanded..end_expanded` is a precondition
/// established by the single preprocessing pass; it is not re-verified
/// against exotic interleavings.
#[derive(Debug, Default)]
pub(crate) struct MarkedFile {
    pub(crate) begin_expanded: u32,
    pub(crate) end_expanded: u32,
    pub(crate) spelled: Vec<Token>,
    pub(crate) mappings: Vec<Mapping>,
}

/// A macro expansion surfaced by a query: the spelled tokens of the
/// invocation and the expanded tokens it produced (possibly empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expansion<'a> {
    pub spelled: &'a [Token],
    pub expanded: &'a [Token],
}

/// The built artifact: the expanded token stream plus, per contributing
/// file, its spelled tokens and mapping records. Immutable once built;
/// queries are pure and safe to run from many readers.
///
/// The expanded stream always ends with one eof sentinel, counted in
/// bookkeeping but excluded from human-facing views.
#[derive(Debug, Default)]
pub struct TokenBuffer {
    pub(crate) expanded: Vec<Token>,
    pub(crate) files: HashMap<FileId, MarkedFile>,
}

impl TokenBuffer {
    /// The full expanded stream, terminal eof included.
    pub fn expanded_tokens(&self) -> &[Token] {
        &self.expanded
    }

    /// Expanded tokens covered by a location range, by binary search in
    /// translation-unit order. An empty or inverted range yields an
    /// empty slice, never an error.
    pub fn expanded_tokens_in_range(&self, range: SourceRange, sm: &SourceManager) -> &[Token] {
        let begin = self
            .expanded
            .partition_point(|t| sm.is_before_in_tu(t.loc, range.begin));
        let end = self
            .expanded
            .partition_point(|t| !sm.is_before_in_tu(range.end, t.loc));
        if begin > end {
            return &[];
        }
        &self.expanded[begin..end]
    }

    /// The spelled tokens of a contributing file.
    pub fn spelled_tokens(&self, file: FileId) -> &[Token] {
        &self.file(file).spelled
    }

    /// The spelled counterpart of one expanded token. Tokens inside a
    /// macro expansion all map to the invocation's first spelled token;
    /// everything else maps at the same relative offset.
    pub fn spelled_for_expanded_token(&self, expanded_index: usize, sm: &SourceManager) -> &Token {
        let (file, spelled_index, _) = self.resolve_expanded_index(expanded_index, sm);
        &self.file(file).spelled[spelled_index]
    }

    /// The spelled tokens corresponding to a range of expanded-stream
    /// indices.
    ///
    /// Returns `None` when the range is empty (boundary-ambiguous), the
    /// endpoints resolve to different files, or either endpoint cuts
    /// through the middle of a macro expansion's output. A boundary
    /// that lands exactly on a mapping widens to the mapping's full
    /// spelled span, so results always cover whole invocations.
    pub fn spelled_for_expanded(
        &self,
        expanded: Range<usize>,
        sm: &SourceManager,
    ) -> Option<&[Token]> {
        if expanded.is_empty() {
            return None;
        }

        let (begin_file, begin_spelled, begin_mapping) =
            self.resolve_expanded_index(expanded.start, sm);
        let (last_file, last_spelled, last_mapping) =
            self.resolve_expanded_index(expanded.end - 1, sm);

        if begin_file != last_file {
            return None;
        }

        // Do not allow ranges that cross macro expansion boundaries.
        if let Some(m) = begin_mapping {
            if (m.begin_expanded as usize) < expanded.start {
                return None;
            }
        }
        if let Some(m) = last_mapping {
            if expanded.end < m.end_expanded as usize {
                return None;
            }
        }

        let begin = begin_mapping.map_or(begin_spelled, |m| m.begin_spelled as usize);
        let end = last_mapping.map_or(last_spelled + 1, |m| m.end_spelled as usize);
        Some(&self.file(begin_file).spelled[begin..end])
    }

    /// The macro expansion whose invocation starts exactly at the given
    /// spelled token, if any. A token in the middle of an invocation
    /// yields `None`.
    pub fn expansion_starting_at(
        &self,
        file: FileId,
        spelled_index: usize,
    ) -> Option<Expansion<'_>> {
        let marked = self.file(file);
        assert!(spelled_index < marked.spelled.len());

        let i = marked
            .mappings
            .partition_point(|m| (m.begin_spelled as usize) < spelled_index);
        let m = marked.mappings.get(i)?;
        if m.begin_spelled as usize != spelled_index {
            return None;
        }
        Some(Expansion {
            spelled: &marked.spelled[m.begin_spelled as usize..m.end_spelled as usize],
            expanded: &self.expanded[m.begin_expanded as usize..m.end_expanded as usize],
        })
    }

    /// First spelled token of every mapping in `file` that looks like a
    /// macro usage. A heuristic: mappings also cover directive lines
    /// and skipped regions, whose leading token has a different shape,
    /// and no check is made that the name still denotes a macro.
    pub fn macro_expansions(&self, file: FileId) -> Vec<&Token> {
        let marked = self.file(file);
        marked
            .mappings
            .iter()
            .map(|m| &marked.spelled[m.begin_spelled as usize])
            .filter(|t| t.kind == SyntaxKind::MacroUsage)
            .collect()
    }

    /// Spelled tokens of `loc`'s file touching `loc`: the token
    /// containing or starting at it, plus the preceding token when it
    /// ends there. 0, 1 or 2 adjacent tokens.
    pub fn spelled_tokens_touching(&self, loc: SourceLoc, sm: &SourceManager) -> &[Token] {
        assert!(loc.is_file(), "expected a spelled location");
        let all = self.spelled_tokens(sm.file_id(loc));
        let right = all.partition_point(|t| t.loc < loc);
        let accept_right = right < all.len() && all[right].loc <= loc;
        let accept_left = right > 0 && all[right - 1].end_location() >= loc;
        &all[right - usize::from(accept_left)..right + usize::from(accept_right)]
    }

    /// First identifier-like token touching `loc`, if any.
    pub fn spelled_identifier_touching(
        &self,
        loc: SourceLoc,
        sm: &SourceManager,
    ) -> Option<&Token> {
        self.spelled_tokens_touching(loc, sm)
            .iter()
            .find(|t| t.kind.is_identifier_like())
    }

    /// Render the buffer for test fixtures: the expanded stream as
    /// space-joined text, then per file its spelled text and mappings.
    pub fn dump_for_tests(&self, sm: &SourceManager) -> String {
        let print_token = |t: &Token| -> String {
            if t.kind == SyntaxKind::Eof {
                "<eof>".to_owned()
            } else {
                t.text(sm).to_owned()
            }
        };
        let join = |tokens: &[Token]| -> String {
            if tokens.is_empty() {
                return "<empty>".to_owned();
            }
            tokens
                .iter()
                .filter(|t| t.kind != SyntaxKind::Eof)
                .map(|t| t.text(sm))
                .collect::<Vec<_>>()
                .join(" ")
        };

        let mut out = String::new();
        // The sentinel is bookkeeping, not content.
        let visible = &self.expanded[..self.expanded.len().saturating_sub(1)];
        writeln!(out, "expanded tokens:").unwrap();
        writeln!(out, "  {}", join(visible)).unwrap();

        let mut keys: Vec<FileId> = self.files.keys().copied().collect();
        keys.sort();

        for file in keys {
            let marked = &self.files[&file];
            writeln!(out, "file '{}'", sm.file_name(file)).unwrap();
            writeln!(out, "  spelled tokens:").unwrap();
            writeln!(out, "    {}", join(&marked.spelled)).unwrap();
            if marked.mappings.is_empty() {
                writeln!(out, "  no mappings.").unwrap();
                continue;
            }
            writeln!(out, "  mappings:").unwrap();
            for m in &marked.mappings {
                let end_spelled = if m.end_spelled as usize == marked.spelled.len() {
                    "<eof>".to_owned()
                } else {
                    print_token(&marked.spelled[m.end_spelled as usize])
                };
                writeln!(
                    out,
                    "    ['{}'_{}, '{}'_{}) => ['{}'_{}, '{}'_{})",
                    print_token(&marked.spelled[m.begin_spelled as usize]),
                    m.begin_spelled,
                    end_spelled,
                    m.end_spelled,
                    print_token(&self.expanded[m.begin_expanded as usize]),
                    m.begin_expanded,
                    print_token(&self.expanded[m.end_expanded as usize]),
                    m.end_expanded,
                )
                .unwrap();
            }
        }
        out
    }

    /// Indices of a file's slice of the expanded stream (terminal eof
    /// excluded). Contiguous by construction.
    pub fn expanded_range_for_file(&self, file: FileId) -> Range<usize> {
        let marked = self.file(file);
        marked.begin_expanded as usize..marked.end_expanded as usize
    }

    /// The mapping records of a file, sorted and non-overlapping by
    /// both spelled and expanded index.
    pub fn mappings(&self, file: FileId) -> &[Mapping] {
        &self.file(file).mappings
    }

    fn file(&self, file: FileId) -> &MarkedFile {
        self.files
            .get(&file)
            .expect("file not tracked by token buffer")
    }

    /// Resolve an expanded index to (file, spelled index, mapping). The
    /// spelled index is the mapping's first spelled token when the
    /// expanded token was macro-produced, otherwise the identity
    /// counterpart.
    fn resolve_expanded_index(
        &self,
        expanded_index: usize,
        sm: &SourceManager,
    ) -> (FileId, usize, Option<&Mapping>) {
        let tok = &self.expanded[expanded_index];
        let file = sm.file_id(sm.expansion_loc(tok.loc));
        let marked = self
            .files
            .get(&file)
            .expect("no file for an expanded token");

        // Last mapping that starts at or before this index.
        let i = marked
            .mappings
            .partition_point(|m| m.begin_expanded as usize <= expanded_index);
        if i == 0 {
            // No preceding mapping: identity from the file's start.
            return (
                file,
                expanded_index - marked.begin_expanded as usize,
                None,
            );
        }
        let m = &marked.mappings[i - 1];
        if expanded_index < m.end_expanded as usize {
            // Inside the mapping: the whole invocation maps as a unit.
            return (file, m.begin_spelled as usize, Some(m));
        }
        // Past it: identity continues from the mapping's end.
        (
            file,
            m.end_spelled as usize + (expanded_index - m.end_expanded as usize),
            None,
        )
    }
}
