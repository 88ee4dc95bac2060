pub use text_size::{TextRange, TextSize};

mod manager;
pub use manager::{SourceLoc, SourceManager, SourceRange};

/// Opaque handle to a source file in the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A span within a single file.
///
/// Offsets are byte offsets into that file's buffer; comparing spans
/// from different files is meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub file: FileId,
    pub range: TextRange,
}

/// A precise location in a physical source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileLoc {
    pub file: FileId,
    pub offset: TextSize,
}
