use std::process::ExitCode;

use vela_source::SourceManager;
use vela_tokens::TokenCollector;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: vela <command> [args...]");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  dump-tokens <file>    Print the token buffer of a source file");
        return ExitCode::FAILURE;
    }

    match args[1].as_str() {
        "dump-tokens" => dump_tokens(&args[2..]),
        other => {
            eprintln!("Unknown command: {other}");
            ExitCode::FAILURE
        }
    }
}

fn dump_tokens(args: &[String]) -> ExitCode {
    let Some(path) = args.first() else {
        eprintln!("Usage: vela dump-tokens <file>");
        return ExitCode::FAILURE;
    };

    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut sm = SourceManager::new();
    let file = sm.add_file(path, &source);

    let mut collector = TokenCollector::new();
    let output = vela_preprocess::preprocess(file, &mut sm, &mut collector);
    for err in &output.errors {
        eprintln!("{}:{:?}: {}", path, err.span.range, err.message);
    }

    let buffer = collector.consume(&sm);
    print!("{}", buffer.dump_for_tests(&sm));

    ExitCode::SUCCESS
}
