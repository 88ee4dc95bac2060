use smol_str::SmolStr;
use text_size::TextSize;

use crate::{FileId, FileLoc, Span};

/// High bit marks a macro location; the payload is then an index into
/// the manager's expansion table instead of a global file offset.
const MACRO_FLAG: u32 = 1 << 31;

/// An opaque source location.
///
/// File locations are offsets into a single global address space that
/// all registered files share, so raw ordering of two file locations
/// agrees with translation-unit order. Macro locations index an
/// expansion entry and carry no positional meaning on their own; use
/// [`SourceManager::is_before_in_tu`] to compare locations that may
/// come from macro expansions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceLoc(u32);

impl SourceLoc {
    /// Whether this location points directly into a file buffer.
    pub fn is_file(self) -> bool {
        self.0 & MACRO_FLAG == 0
    }

    /// Whether this location was minted for a macro-produced token.
    pub fn is_macro(self) -> bool {
        !self.is_file()
    }

    /// Advance a file location by `by` bytes.
    pub fn offset_by(self, by: TextSize) -> SourceLoc {
        debug_assert!(self.is_file());
        SourceLoc(self.0 + u32::from(by))
    }

    fn macro_index(self) -> usize {
        debug_assert!(self.is_macro());
        (self.0 & !MACRO_FLAG) as usize
    }
}

/// A begin/end pair of locations. `end` is the location of the last
/// token in the range (token-start semantics), not one past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRange {
    pub begin: SourceLoc,
    pub end: SourceLoc,
}

impl SourceRange {
    pub fn new(begin: SourceLoc, end: SourceLoc) -> Self {
        Self { begin, end }
    }
}

struct FileEntry {
    name: SmolStr,
    text: String,
    /// First global offset owned by this file. The file owns
    /// `start..=start + text.len()` so the end-of-file location is
    /// still attributed to it.
    start: u32,
}

struct MacroEntry {
    /// Where the expansion that produced this token was invoked.
    /// Chains through nested expansions down to a file location.
    call_site: SourceLoc,
    /// The token's spelling, kept here because macro locations have no
    /// backing file buffer to slice text from.
    text: SmolStr,
}

/// Owns file buffers and the macro-expansion location table.
///
/// The location service for one translation unit: registers files,
/// decomposes locations, resolves macro locations to their ultimate
/// expansion point, and defines the total translation-unit order.
#[derive(Default)]
pub struct SourceManager {
    files: Vec<FileEntry>,
    macros: Vec<MacroEntry>,
    next_start: u32,
}

impl SourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file buffer; returns its handle.
    pub fn add_file(&mut self, name: &str, text: &str) -> FileId {
        let start = self.next_start;
        let len = u32::try_from(text.len()).expect("file too large");
        assert!(start + len < MACRO_FLAG, "source address space exhausted");
        // +1 keeps the end-of-file location of this file distinct from
        // the start of the next one.
        self.next_start = start + len + 1;
        self.files.push(FileEntry {
            name: SmolStr::from(name),
            text: text.to_owned(),
            start,
        });
        FileId(u32::try_from(self.files.len() - 1).expect("too many files"))
    }

    pub fn file_text(&self, file: FileId) -> &str {
        &self.files[file.0 as usize].text
    }

    pub fn file_name(&self, file: FileId) -> &str {
        &self.files[file.0 as usize].name
    }

    /// The location of byte `offset` within `file`.
    pub fn file_loc(&self, file: FileId, offset: TextSize) -> SourceLoc {
        let entry = &self.files[file.0 as usize];
        assert!(usize::from(offset) <= entry.text.len());
        SourceLoc(entry.start + u32::from(offset))
    }

    /// The location one past the last byte of `file`.
    pub fn end_of_file_loc(&self, file: FileId) -> SourceLoc {
        let entry = &self.files[file.0 as usize];
        SourceLoc(entry.start + entry.text.len() as u32)
    }

    /// Split a file location into its file and byte offset.
    ///
    /// Panics on macro locations; resolve via [`Self::expansion_loc`]
    /// first.
    pub fn decompose(&self, loc: SourceLoc) -> FileLoc {
        assert!(loc.is_file(), "cannot decompose a macro location");
        let idx = self.files.partition_point(|f| f.start <= loc.0) - 1;
        let entry = &self.files[idx];
        debug_assert!(loc.0 <= entry.start + entry.text.len() as u32);
        FileLoc {
            file: FileId(idx as u32),
            offset: TextSize::new(loc.0 - entry.start),
        }
    }

    /// The file owning a file location.
    pub fn file_id(&self, loc: SourceLoc) -> FileId {
        self.decompose(loc).file
    }

    /// Mint a location for one macro-produced token.
    ///
    /// `call_site` is the location of the invocation that produced it
    /// (itself a macro location for nested expansions).
    pub fn create_macro_loc(&mut self, call_site: SourceLoc, text: SmolStr) -> SourceLoc {
        let idx = u32::try_from(self.macros.len()).expect("too many macro locations");
        assert!(idx < MACRO_FLAG);
        self.macros.push(MacroEntry { call_site, text });
        SourceLoc(MACRO_FLAG | idx)
    }

    /// Resolve a location to its ultimate expansion point: the file
    /// location where the outermost enclosing macro invocation starts.
    /// File locations resolve to themselves.
    pub fn expansion_loc(&self, mut loc: SourceLoc) -> SourceLoc {
        while loc.is_macro() {
            loc = self.macros[loc.macro_index()].call_site;
        }
        loc
    }

    /// The spelling of a token at `loc` with byte length `len`.
    pub fn token_text(&self, loc: SourceLoc, len: TextSize) -> &str {
        if loc.is_file() {
            let FileLoc { file, offset } = self.decompose(loc);
            let begin = usize::from(offset);
            &self.file_text(file)[begin..begin + usize::from(len)]
        } else {
            let text = self.macros[loc.macro_index()].text.as_str();
            debug_assert_eq!(text.len(), usize::from(len));
            text
        }
    }

    /// Slice the text covered by a span.
    pub fn span_text(&self, span: Span) -> &str {
        let range = std::ops::Range::<usize>::from(span.range);
        &self.file_text(span.file)[range]
    }

    /// Total order over locations within one translation unit.
    ///
    /// Macro locations are ordered by their expansion point; two
    /// locations rooted at the same expansion point are unordered
    /// (neither is before the other).
    pub fn is_before_in_tu(&self, a: SourceLoc, b: SourceLoc) -> bool {
        self.expansion_loc(a).0 < self.expansion_loc(b).0
    }
}
