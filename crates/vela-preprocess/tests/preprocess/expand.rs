use smol_str::SmolStr;
use vela_lexer::SyntaxKind;
use vela_preprocess::{MacroDef, MacroEnv};
use vela_source::TextSize;

use super::common::{emitted, error_messages, pp, pp_with_env};

#[test]
fn object_like_substitution() {
    let run = pp("`define W 8\nwire w = `W;\n");
    assert_eq!(emitted(&run), ["wire", "w", "=", "8", ";"]);
}

#[test]
fn expansion_to_nothing() {
    let run = pp("`define E\na `E b\n");
    assert_eq!(emitted(&run), ["a", "b"]);
    assert_eq!(run.sink.events.len(), 1);
}

#[test]
fn function_like_substitution() {
    let run = pp("`define ADD(a, b) a + b\n`ADD(1, 2)\n");
    assert_eq!(emitted(&run), ["1", "+", "2"]);
}

#[test]
fn nested_parens_stay_in_one_argument() {
    let run = pp("`define ID(x) x\n`ID((1, 2))\n");
    assert_eq!(emitted(&run), ["(", "1", ",", "2", ")"]);
    assert!(run.output.errors.is_empty());
}

#[test]
fn produced_tokens_carry_macro_locations() {
    let run = pp("`define W 8\nwire `W;\n");
    let locs: Vec<bool> = run.sink.tokens.iter().map(|t| t.loc.is_file()).collect();
    // wire (file), 8 (macro-produced), ; (file), eof (file).
    assert_eq!(locs, [true, false, true, true]);
}

#[test]
fn usage_in_body_is_rescanned() {
    let run = pp("`define INNER 1\n`define OUTER `INNER + 2\nx = `OUTER;\n");
    assert_eq!(emitted(&run), ["x", "=", "1", "+", "2", ";"]);

    // The outer event spans real source; the inner one happens inside
    // the replacement and ends at a macro location.
    let names: Vec<&str> = run.sink.events.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["`OUTER", "`INNER"]);
    assert!(run.sink.events[0].1.end.is_file());
    assert!(run.sink.events[1].1.end.is_macro());
}

#[test]
fn function_like_event_ends_at_closing_paren() {
    let run = pp("`define ID(x) x\n`ID(42)\n");
    assert_eq!(run.sink.events.len(), 1);
    let (name, span) = &run.sink.events[0];
    assert_eq!(name.as_str(), "`ID");

    let begin = run.sm.decompose(span.begin);
    let end = run.sm.decompose(span.end);
    assert_eq!(begin.offset, TextSize::new(16));
    assert_eq!(end.offset, TextSize::new(22));
}

#[test]
fn eof_sentinel_is_always_last() {
    let run = pp("`define E\n`E\n");
    let last = run.sink.tokens.last().unwrap();
    assert_eq!(last.kind, SyntaxKind::Eof);
    assert_eq!(last.loc, run.sm.end_of_file_loc(run.file));
}

#[test]
fn predefined_environment_is_visible() {
    let mut env = MacroEnv::empty();
    env.define(MacroDef {
        name: SmolStr::from("SIMULATION"),
        params: None,
        body: Vec::new(),
    });
    let run = pp_with_env("`ifdef SIMULATION\nwire sim;\n`endif\n", env);
    assert_eq!(emitted(&run), ["wire", "sim", ";"]);
    assert!(run.output.final_env.is_defined("SIMULATION"));
}

#[test]
fn undefined_macro_usage() {
    let run = pp("`FOO\n");
    assert_eq!(error_messages(&run), ["undefined macro: FOO"]);
    assert!(emitted(&run).is_empty());
}

#[test]
fn function_like_usage_without_arguments() {
    let run = pp("`define F(x) x\n`F\n");
    assert_eq!(error_messages(&run), ["macro F requires arguments"]);
}

#[test]
fn arity_mismatch() {
    let run = pp("`define F(a, b) a\n`F(1)\n");
    assert_eq!(
        error_messages(&run),
        ["macro F expects 2 argument(s), got 1"]
    );
}

#[test]
fn unterminated_argument_list() {
    let run = pp("`define F(x) x\n`F(1\n");
    assert_eq!(error_messages(&run), ["unterminated macro argument list"]);
}

#[test]
fn self_referential_macro_is_cut_off() {
    let run = pp("`define LOOP `LOOP\n`LOOP\n");
    assert_eq!(error_messages(&run), ["recursive macro expansion"]);
}

#[test]
fn arguments_spanning_file_complete_a_body_usage() {
    // `A's replacement ends in `B; the argument list is taken from the
    // source following `A.
    let run = pp("`define B(x) x\n`define A 1 + `B\ny = `A(2);\n");
    assert_eq!(emitted(&run), ["y", "=", "1", "+", "2", ";"]);

    // `B's event begins at its macro location but ends at the real `)`.
    let (name, span) = run.sink.events.last().unwrap();
    assert_eq!(name.as_str(), "`B");
    assert!(span.begin.is_macro());
    assert!(span.end.is_file());
}
