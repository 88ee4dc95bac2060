//! Recorder behavior under hand-fed event sequences, independent of
//! the preprocessor.

use smol_str::SmolStr;
use vela_lexer::SyntaxKind;
use vela_source::{FileId, SourceManager, SourceRange, TextSize};
use vela_tokens::{tokenize, Mapping, PpEventSink, Token, TokenCollector};

use super::common::texts;

fn setup(text: &str) -> (SourceManager, FileId, Vec<Token>) {
    let mut sm = SourceManager::new();
    let file = sm.add_file("input.sv", text);
    let spelled = tokenize(file, &sm);
    (sm, file, spelled)
}

fn eof(sm: &SourceManager, file: FileId) -> Token {
    Token::new(sm.end_of_file_loc(file), TextSize::new(0), SyntaxKind::Eof)
}

#[test]
fn detached_collector_ignores_further_events() {
    let (sm, file, spelled) = setup("wire a ;");
    let mut collector = TokenCollector::new();
    for t in &spelled {
        collector.expanded_token(*t);
    }
    collector.expanded_token(eof(&sm, file));

    collector.detach();
    collector.expanded_token(spelled[0]);
    collector.macro_expanded(
        &sm,
        &spelled[1],
        SourceRange::new(spelled[1].loc, spelled[1].loc),
    );

    let buffer = collector.consume(&sm);
    assert_eq!(buffer.expanded_tokens().len(), spelled.len() + 1);
    assert!(buffer.mappings(file).is_empty());
}

#[test]
fn trivia_events_are_dropped() {
    let (sm, file, spelled) = setup("a b");
    let mut collector = TokenCollector::new();
    collector.expanded_token(spelled[0]);
    collector.expanded_token(Token::new(
        spelled[0].end_location(),
        TextSize::new(1),
        SyntaxKind::Whitespace,
    ));
    collector.expanded_token(spelled[1]);
    collector.expanded_token(eof(&sm, file));

    let buffer = collector.consume(&sm);
    assert_eq!(buffer.expanded_tokens().len(), 3);
}

// One recorded span splits the gap between `a` and `b` into three
// pieces: before, the invocation, after.
#[test]
fn recorded_span_splits_unmapped_gap() {
    let (sm, file, spelled) = setup("a X M Y b");
    let mut collector = TokenCollector::new();
    collector.expanded_token(spelled[0]);
    collector.macro_expanded(
        &sm,
        &spelled[2],
        SourceRange::new(spelled[2].loc, spelled[2].loc),
    );
    collector.expanded_token(spelled[4]);
    collector.expanded_token(eof(&sm, file));

    let buffer = collector.consume(&sm);
    assert_eq!(
        buffer.mappings(file),
        [
            Mapping {
                begin_spelled: 1,
                end_spelled: 2,
                begin_expanded: 1,
                end_expanded: 1,
            },
            Mapping {
                begin_spelled: 2,
                end_spelled: 3,
                begin_expanded: 1,
                end_expanded: 1,
            },
            Mapping {
                begin_spelled: 3,
                end_spelled: 4,
                begin_expanded: 1,
                end_expanded: 1,
            },
        ]
    );
}

// A span ending at a macro location is nested by definition and must
// not be recorded; the whole gap stays one piece.
#[test]
fn span_ending_at_macro_location_is_not_recorded() {
    let (mut sm, file, spelled) = setup("a X M Y b");
    let inner_end = sm.create_macro_loc(spelled[2].loc, SmolStr::from("M"));

    let mut collector = TokenCollector::new();
    collector.expanded_token(spelled[0]);
    collector.macro_expanded(
        &sm,
        &spelled[2],
        SourceRange::new(spelled[2].loc, inner_end),
    );
    collector.expanded_token(spelled[4]);
    collector.expanded_token(eof(&sm, file));

    let buffer = collector.consume(&sm);
    assert_eq!(
        buffer.mappings(file),
        [Mapping {
            begin_spelled: 1,
            end_spelled: 4,
            begin_expanded: 1,
            end_expanded: 1,
        }]
    );
}

// An expansion reported while an enclosing span is still open (its end
// not past the enclosing end) folds into the enclosing invocation.
#[test]
fn nested_expansion_folds_into_enclosing_span() {
    let (sm, file, spelled) = setup("a M ( N ) b");
    let mut collector = TokenCollector::new();
    collector.expanded_token(spelled[0]);
    // Outer: M consumed through the closing paren, produced nothing.
    collector.macro_expanded(
        &sm,
        &spelled[1],
        SourceRange::new(spelled[1].loc, spelled[4].loc),
    );
    // Inner: N expanded while substituting M's arguments.
    collector.macro_expanded(
        &sm,
        &spelled[3],
        SourceRange::new(spelled[3].loc, spelled[3].loc),
    );
    collector.expanded_token(spelled[5]);
    collector.expanded_token(eof(&sm, file));

    let buffer = collector.consume(&sm);
    assert_eq!(
        buffer.mappings(file),
        [Mapping {
            begin_spelled: 1,
            end_spelled: 5,
            begin_expanded: 1,
            end_expanded: 1,
        }]
    );
}

// An invocation starting inside another macro's output but ending in
// the file is re-keyed at the outer invocation's start.
#[test]
fn span_beginning_at_macro_location_merges_with_outer() {
    let (mut sm, file, spelled) = setup("A ( 2 )");
    let mut collector = TokenCollector::new();

    // Outer: object-like A, consuming just its own name.
    collector.macro_expanded(
        &sm,
        &spelled[0],
        SourceRange::new(spelled[0].loc, spelled[0].loc),
    );

    // A's body ended in a function-like usage that took `( 2 )` from
    // the file.
    let inner_name_loc = sm.create_macro_loc(spelled[0].loc, SmolStr::from("`B"));
    let inner_name = Token::new(inner_name_loc, TextSize::new(2), SyntaxKind::MacroUsage);
    collector.macro_expanded(&sm, &inner_name, SourceRange::new(inner_name_loc, spelled[3].loc));

    let produced_loc = sm.create_macro_loc(inner_name_loc, SmolStr::from("2"));
    collector.expanded_token(Token::new(
        produced_loc,
        TextSize::new(1),
        SyntaxKind::IntLiteral,
    ));
    collector.expanded_token(eof(&sm, file));

    let buffer = collector.consume(&sm);
    assert_eq!(
        buffer.mappings(file),
        [Mapping {
            begin_spelled: 0,
            end_spelled: 4,
            begin_expanded: 0,
            end_expanded: 1,
        }]
    );

    let expansion = buffer.expansion_starting_at(file, 0).unwrap();
    assert_eq!(texts(expansion.spelled, &sm), ["A", "(", "2", ")"]);
    assert_eq!(texts(expansion.expanded, &sm), ["2"]);
}
