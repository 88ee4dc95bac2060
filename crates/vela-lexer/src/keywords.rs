use crate::SyntaxKind;

/// Classify an identifier string as a keyword or plain `Ident`.
///
/// Only the structural subset of keywords this front-end currently
/// consumes is reserved; everything else lexes as `Ident`.
pub(crate) fn classify_word(word: &str) -> SyntaxKind {
    match word {
        "module" => SyntaxKind::ModuleKw,
        "endmodule" => SyntaxKind::EndmoduleKw,
        "input" => SyntaxKind::InputKw,
        "output" => SyntaxKind::OutputKw,
        "wire" => SyntaxKind::WireKw,
        "reg" => SyntaxKind::RegKw,
        "logic" => SyntaxKind::LogicKw,
        "assign" => SyntaxKind::AssignKw,
        "begin" => SyntaxKind::BeginKw,
        "end" => SyntaxKind::EndKw,
        "if" => SyntaxKind::IfKw,
        "else" => SyntaxKind::ElseKw,
        "parameter" => SyntaxKind::ParameterKw,
        _ => SyntaxKind::Ident,
    }
}
