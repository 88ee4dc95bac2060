use smallvec::SmallVec;
use smol_str::SmolStr;
use vela_lexer::SyntaxKind;

/// One token of a macro body, as stored at definition time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyToken {
    /// A literal token: kind plus spelling.
    Text(SyntaxKind, SmolStr),
    /// The n-th macro parameter, substituted at expansion time.
    Param(usize),
}

/// A single macro definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    pub name: SmolStr,
    /// `Some` for function-like macros (`` `define NAME(a, b) ... ``),
    /// `None` for object-like ones. Function-likeness is decided by
    /// `(` immediately following the name at the definition site.
    pub params: Option<SmallVec<[SmolStr; 4]>>,
    pub body: Vec<BodyToken>,
}

impl MacroDef {
    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }
}

/// Macro environment, kept sorted by name for deterministic lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroEnv {
    entries: Vec<MacroDef>,
}

impl MacroEnv {
    /// An empty environment with no definitions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether `name` is currently defined.
    pub fn is_defined(&self, name: &str) -> bool {
        self.entries
            .binary_search_by(|d| d.name.as_str().cmp(name))
            .is_ok()
    }

    /// Look up a macro definition by name.
    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.entries
            .binary_search_by(|d| d.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    /// Define (or redefine) a macro. Maintains sorted order.
    pub fn define(&mut self, def: MacroDef) {
        match self
            .entries
            .binary_search_by(|d| d.name.as_str().cmp(def.name.as_str()))
        {
            Ok(idx) => self.entries[idx] = def,
            Err(idx) => self.entries.insert(idx, def),
        }
    }

    /// Remove a macro definition; removing an undefined name is silent.
    pub fn undef(&mut self, name: &str) {
        if let Ok(idx) = self
            .entries
            .binary_search_by(|d| d.name.as_str().cmp(name))
        {
            self.entries.remove(idx);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
