use super::common::{emitted, error_messages, pp};

#[test]
fn ifdef_taken_branch_emits() {
    let run = pp("`define FLAG\n`ifdef FLAG\nwire a;\n`endif\n");
    assert_eq!(emitted(&run), ["wire", "a", ";"]);
}

#[test]
fn ifdef_untaken_branch_skips() {
    let run = pp("`ifdef FLAG\nwire a;\n`endif\nwire b;\n");
    assert_eq!(emitted(&run), ["wire", "b", ";"]);
}

#[test]
fn ifndef_inverts() {
    let run = pp("`ifndef FLAG\nwire a;\n`endif\n");
    assert_eq!(emitted(&run), ["wire", "a", ";"]);
}

#[test]
fn else_takes_other_branch() {
    let run = pp("`ifdef FLAG\nwire a;\n`else\nwire b;\n`endif\n");
    assert_eq!(emitted(&run), ["wire", "b", ";"]);
}

#[test]
fn elsif_chain_takes_first_defined() {
    let text = "`define B\n\
                `ifdef A\nwire a;\n\
                `elsif B\nwire b;\n\
                `elsif C\nwire c;\n\
                `else\nwire d;\n\
                `endif\n";
    let run = pp(text);
    assert_eq!(emitted(&run), ["wire", "b", ";"]);
}

#[test]
fn elsif_after_taken_branch_skips() {
    let run = pp("`define A\n`define B\n`ifdef A\nwire a;\n`elsif B\nwire b;\n`endif\n");
    assert_eq!(emitted(&run), ["wire", "a", ";"]);
}

#[test]
fn nested_conditionals_respect_parent() {
    let text = "`define OUTER\n\
                `ifdef OUTER\n\
                `ifdef INNER\nwire a;\n`else\nwire b;\n`endif\n\
                `endif\n";
    let run = pp(text);
    assert_eq!(emitted(&run), ["wire", "b", ";"]);
}

#[test]
fn inner_else_stays_dark_under_false_parent() {
    let text = "`ifdef OUTER\n\
                `ifdef INNER\nwire a;\n`else\nwire b;\n`endif\n\
                `endif\n";
    let run = pp(text);
    assert!(emitted(&run).is_empty());
}

#[test]
fn macros_do_not_expand_in_skipped_regions() {
    let run = pp("`define M 1\n`ifdef NOPE\n`M\n`endif\n");
    assert!(emitted(&run).is_empty());
    assert!(run.sink.events.is_empty());
    assert!(run.output.errors.is_empty());
}

#[test]
fn unterminated_conditional() {
    let run = pp("`ifdef FLAG\nwire a;\n");
    assert_eq!(error_messages(&run), ["unterminated conditional directive"]);
}

#[test]
fn endif_without_opening() {
    let run = pp("`endif\n");
    assert_eq!(
        error_messages(&run),
        ["`endif without matching `ifdef/`ifndef"]
    );
}

#[test]
fn else_without_opening() {
    let run = pp("`else\n");
    assert_eq!(
        error_messages(&run),
        ["`else without matching `ifdef/`ifndef"]
    );
}

#[test]
fn duplicate_else() {
    let run = pp("`ifdef A\n`else\n`else\n`endif\n");
    assert_eq!(error_messages(&run), ["duplicate `else"]);
}

#[test]
fn elsif_after_else() {
    let run = pp("`ifdef A\n`else\n`elsif B\n`endif\n");
    assert_eq!(error_messages(&run), ["`elsif after `else"]);
}

#[test]
fn ifdef_missing_name() {
    let run = pp("`ifdef\nwire a;\n`endif\n");
    assert_eq!(error_messages(&run), ["`ifdef missing macro name"]);
    // Treated as false: the branch is skipped.
    assert!(emitted(&run).is_empty());
}
