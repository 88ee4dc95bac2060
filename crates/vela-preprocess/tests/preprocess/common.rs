use smol_str::SmolStr;
use vela_lexer::SyntaxKind;
use vela_preprocess::{MacroEnv, PreprocOutput};
use vela_source::{FileId, SourceManager, SourceRange};
use vela_tokens::{PpEventSink, Token};

/// Test sink that records everything the preprocessor reports.
#[derive(Default)]
pub struct CollectSink {
    pub tokens: Vec<Token>,
    /// (macro name, consumed span) per expansion event.
    pub events: Vec<(SmolStr, SourceRange)>,
}

impl PpEventSink for CollectSink {
    fn expanded_token(&mut self, tok: Token) {
        self.tokens.push(tok);
    }

    fn macro_expanded(&mut self, sm: &SourceManager, name: &Token, span: SourceRange) {
        self.events.push((SmolStr::from(name.text(sm)), span));
    }
}

pub struct PpRun {
    pub sm: SourceManager,
    pub file: FileId,
    pub sink: CollectSink,
    pub output: PreprocOutput,
}

/// Preprocess `text` as `input.sv` with an empty environment.
pub fn pp(text: &str) -> PpRun {
    pp_with_env(text, MacroEnv::empty())
}

pub fn pp_with_env(text: &str, env: MacroEnv) -> PpRun {
    let mut sm = SourceManager::new();
    let file = sm.add_file("input.sv", text);
    let mut sink = CollectSink::default();
    let output = vela_preprocess::preprocess_with_env(file, &mut sm, env, &mut sink);
    PpRun {
        sm,
        file,
        sink,
        output,
    }
}

/// Spellings of the emitted tokens, eof sentinel dropped.
pub fn emitted(run: &PpRun) -> Vec<String> {
    run.sink
        .tokens
        .iter()
        .filter(|t| t.kind != SyntaxKind::Eof)
        .map(|t| t.text(&run.sm).to_owned())
        .collect()
}

pub fn error_messages(run: &PpRun) -> Vec<&str> {
    run.output
        .errors
        .iter()
        .map(|e| e.message.as_str())
        .collect()
}
