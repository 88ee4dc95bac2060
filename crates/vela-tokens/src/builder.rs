use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Write as _;

use vela_lexer::SyntaxKind;
use vela_source::{FileId, SourceLoc, SourceManager};

use crate::buffer::{Mapping, MarkedFile, TokenBuffer};
use crate::token::{tokenize, Token};

/// Offline reconstruction: turns the captured expanded stream and the
/// expansion-span table into a [`TokenBuffer`].
///
/// Runs exactly once over the expanded stream. The expanded stream
/// consists of runs of tokens that came from the same source (a macro
/// expansion, part of a file); between those runs sit the logical
/// positions of spelled tokens that expanded to nothing.
pub(crate) struct Builder<'a> {
    result: TokenBuffer,
    /// Cursor in the expanded stream.
    next_expanded: usize,
    /// Per-file cursor in the spelled stream.
    next_spelled: HashMap<FileId, usize>,
    expansions: HashMap<SourceLoc, SourceLoc>,
    sm: &'a SourceManager,
}

impl<'a> Builder<'a> {
    pub(crate) fn new(
        expanded: Vec<Token>,
        expansions: HashMap<SourceLoc, SourceLoc>,
        sm: &'a SourceManager,
    ) -> Self {
        Self {
            result: TokenBuffer {
                expanded,
                files: HashMap::new(),
            },
            next_expanded: 0,
            next_spelled: HashMap::new(),
            expansions,
            sm,
        }
    }

    pub(crate) fn build(mut self) -> TokenBuffer {
        assert!(
            !self.result.expanded.is_empty(),
            "expanded stream must not be empty"
        );
        assert_eq!(
            self.result.expanded.last().map(|t| t.kind),
            Some(SyntaxKind::Eof),
            "expanded stream must end with eof"
        );

        // Re-lex every file that contributed to the expanded stream.
        self.build_spelled_tokens();

        while self.next_expanded < self.result.expanded.len() - 1 {
            // Empty mappings for spelled tokens that expanded to
            // nothing here. May advance the spelled cursor only.
            self.discard(None);
            // One contiguous run of expanded tokens. Must make
            // progress; anything else is a broken capture.
            let before = self.next_expanded;
            self.advance();
            if self.next_expanded == before {
                self.diagnose_advance_failure();
            }
        }

        // Tokens remaining in any file didn't expand to anything;
        // cover them with trailing empty mappings.
        let mut files: Vec<FileId> = self.result.files.keys().copied().collect();
        files.sort();
        for file in files {
            self.discard(Some(file));
        }

        self.result
    }

    /// Initializes per-file state: spelled tokens (authoritative
    /// re-lex) and each file's slice of the expanded stream.
    fn build_spelled_tokens(&mut self) {
        for i in 0..self.result.expanded.len() {
            let tok = self.result.expanded[i];
            let file = self.sm.file_id(self.sm.expansion_loc(tok.loc));

            // The eof sentinel is not part of its file's range.
            #[allow(clippy::cast_possible_truncation)]
            let end = if tok.kind == SyntaxKind::Eof { i } else { i + 1 } as u32;

            match self.result.files.entry(file) {
                Entry::Occupied(mut e) => e.get_mut().end_expanded = end,
                Entry::Vacant(e) => {
                    e.insert(MarkedFile {
                        #[allow(clippy::cast_possible_truncation)]
                        begin_expanded: i as u32,
                        end_expanded: end,
                        spelled: tokenize(file, self.sm),
                        mappings: Vec::new(),
                    });
                }
            }
        }
    }

    /// Consume spelled tokens that didn't expand to anything, emitting
    /// empty mappings for them. Skips up to the spelled position of the
    /// next expanded token, or to the end of `drain`'s file.
    ///
    /// A skipped stretch that begins a captured expansion span is split
    /// out into its own mapping: a macro known to have run but to have
    /// produced zero tokens.
    fn discard(&mut self, drain: Option<FileId>) {
        let sm = self.sm;
        let target = match drain {
            Some(file) => sm.end_of_file_loc(file),
            None => sm.expansion_loc(self.result.expanded[self.next_expanded].loc),
        };
        let file = sm.file_id(target);

        // A drain-time empty mapping still has to sit inside the
        // file's expanded range, so anchor it at that range's end.
        #[allow(clippy::cast_possible_truncation)]
        let expanded_at = match drain {
            Some(_) => self.result.files[&file].end_expanded,
            None => self.next_expanded as u32,
        };

        let next_spelled = self.next_spelled.entry(file).or_default();
        let marked = self
            .result
            .files
            .get_mut(&file)
            .expect("file not tracked by token buffer");
        let spelled = &marked.spelled;
        let mappings = &mut marked.mappings;

        // Emits [begin_spelled, next) if non-empty and starts a new
        // stretch. Zero-width mappings are never emitted.
        #[allow(clippy::cast_possible_truncation)]
        fn flush(mappings: &mut Vec<Mapping>, begin: &mut usize, next: usize, expanded_at: u32) {
            if *begin != next {
                mappings.push(Mapping {
                    begin_spelled: *begin as u32,
                    end_spelled: next as u32,
                    begin_expanded: expanded_at,
                    end_expanded: expanded_at,
                });
            }
            *begin = next;
        }

        let mut begin_spelled = *next_spelled;
        while *next_spelled < spelled.len() && spelled[*next_spelled].loc < target {
            // A captured span starting here bounds a zero-output
            // expansion; partition the stretch around it:
            //   [begin, next) [next, known_end] (known_end, target)
            if let Some(&known_end) = self.expansions.get(&spelled[*next_spelled].loc) {
                flush(mappings, &mut begin_spelled, *next_spelled, expanded_at);
                while *next_spelled < spelled.len() && spelled[*next_spelled].loc <= known_end {
                    *next_spelled += 1;
                }
                flush(mappings, &mut begin_spelled, *next_spelled, expanded_at);
            } else {
                *next_spelled += 1;
            }
        }
        flush(mappings, &mut begin_spelled, *next_spelled, expanded_at);
    }

    /// Consume the run of expanded tokens starting at the cursor. A run
    /// of file tokens advances both streams in lockstep with no mapping
    /// (identity is implicit); a macro run consumes the captured
    /// spelled span and every expanded token rooted at the same
    /// expansion point, and records one mapping.
    #[allow(clippy::cast_possible_truncation)]
    fn advance(&mut self) {
        let sm = self.sm;
        let tok = self.result.expanded[self.next_expanded];
        let expansion = sm.expansion_loc(tok.loc);
        let file = sm.file_id(expansion);

        let next_spelled = self.next_spelled.entry(file).or_default();
        let TokenBuffer { expanded, files } = &mut self.result;
        let marked = files
            .get_mut(&file)
            .expect("file not tracked by token buffer");

        if tok.loc.is_file() {
            // Literal copy-through; continues while the streams match.
            while *next_spelled < marked.spelled.len()
                && self.next_expanded < expanded.len()
                && marked.spelled[*next_spelled].loc == expanded[self.next_expanded].loc
            {
                *next_spelled += 1;
                self.next_expanded += 1;
            }
            return;
        }

        // A macro expansion; its spelling bounds must have been
        // captured during the preprocessing pass.
        let Some(&end) = self.expansions.get(&expansion) else {
            panic!("macro expansion at {expansion:?} wasn't captured");
        };

        let begin_expanded = self.next_expanded as u32;
        let begin_spelled = *next_spelled as u32;
        while *next_spelled < marked.spelled.len() && marked.spelled[*next_spelled].loc <= end {
            *next_spelled += 1;
        }
        while self.next_expanded < expanded.len()
            && sm.expansion_loc(expanded[self.next_expanded].loc) == expansion
        {
            self.next_expanded += 1;
        }
        marked.mappings.push(Mapping {
            begin_spelled,
            end_spelled: *next_spelled as u32,
            begin_expanded,
            end_expanded: self.next_expanded as u32,
        });
    }

    /// Unrecoverable: the capture no longer explains the expanded
    /// stream. Abort with the offending token in context.
    fn diagnose_advance_failure(&self) -> ! {
        let mut context = String::new();
        let begin = self.next_expanded.saturating_sub(10);
        let end = (self.next_expanded + 5).min(self.result.expanded.len());
        for i in begin..end {
            let marker = if i == self.next_expanded {
                "!! "
            } else if i < self.next_expanded {
                "ok "
            } else {
                "   "
            };
            writeln!(
                context,
                "{marker}{}",
                self.result.expanded[i].dump_for_tests(self.sm)
            )
            .unwrap();
        }
        panic!("failed to map an expanded token to spelled tokens:\n{context}");
    }
}
