use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::{GrammarError, Result};

/// Handle of a symbol interned in a [`SymbolTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Whether a symbol can be rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Variable,
    Terminal,
}

/// A named token of the grammar
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    name: String,
    kind: SymbolKind,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn is_variable(&self) -> bool {
        self.kind == SymbolKind::Variable
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Validated variable and terminal names of a grammar.
///
/// No declared name is a substring of another, so any concatenation of names
/// splits back into exactly one symbol sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
    /// Longest names first, for the tokenizer
    by_length: Vec<SymbolId>,
    start: SymbolId,
    null: SymbolId,
}

impl SymbolTable {
    /// Validate the declared names and build the table
    pub fn new<V, T>(variables: V, terminals: T, start: &str, null_symbol: &str) -> Result<Self>
    where
        V: IntoIterator,
        V::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let mut symbols: Vec<Symbol> = Vec::new();
        let mut by_name: HashMap<String, SymbolId> = HashMap::new();

        let declared = variables
            .into_iter()
            .map(|name| (name.as_ref().to_string(), SymbolKind::Variable))
            .chain(
                terminals
                    .into_iter()
                    .map(|name| (name.as_ref().to_string(), SymbolKind::Terminal)),
            );

        for (name, kind) in declared {
            if name.is_empty() {
                return Err(GrammarError::EmptySymbolName);
            }
            if name.chars().any(char::is_whitespace) {
                return Err(GrammarError::WhitespaceInSymbol(name));
            }
            if let Some(existing) = by_name.get(&name) {
                // Repeats inside one set collapse, repeats across sets are an error
                if symbols[existing.index()].kind == kind {
                    continue;
                }
                return Err(GrammarError::DuplicateSymbol(name));
            }

            let id = SymbolId(symbols.len() as u32);
            by_name.insert(name.clone(), id);
            symbols.push(Symbol { name, kind });
        }

        for (i, first) in symbols.iter().enumerate() {
            for second in &symbols[i + 1..] {
                let (container, contained) = if first.name.contains(&second.name) {
                    (first, second)
                } else if second.name.contains(&first.name) {
                    (second, first)
                } else {
                    continue;
                };
                return Err(GrammarError::SymbolContainment {
                    container: container.name.clone(),
                    contained: contained.name.clone(),
                });
            }
        }

        let start = match by_name.get(start) {
            Some(&id) if symbols[id.index()].is_variable() => id,
            _ => return Err(GrammarError::UnknownStartVariable(start.to_string())),
        };
        let null = match by_name.get(null_symbol) {
            Some(&id) if !symbols[id.index()].is_variable() => id,
            _ => return Err(GrammarError::NullSymbolNotTerminal(null_symbol.to_string())),
        };

        let mut by_length: Vec<SymbolId> = (0..symbols.len() as u32).map(SymbolId).collect();
        by_length.sort_by(|a, b| {
            let (a, b) = (&symbols[a.index()].name, &symbols[b.index()].name);
            b.len().cmp(&a.len()).then_with(|| a.cmp(b))
        });

        Ok(SymbolTable {
            symbols,
            by_name,
            by_length,
            start,
            null,
        })
    }

    /// Split `raw` into declared symbols, longest match first
    pub fn tokenize(&self, raw: &str) -> Result<Vec<SymbolId>> {
        self.scan(raw, |_| true)
    }

    /// Like [`SymbolTable::tokenize`], but only terminal names may match
    pub fn tokenize_terminals(&self, raw: &str) -> Result<Vec<SymbolId>> {
        self.scan(raw, |symbol| !symbol.is_variable())
    }

    fn scan<F>(&self, raw: &str, accept: F) -> Result<Vec<SymbolId>>
    where
        F: Fn(&Symbol) -> bool,
    {
        let mut tokens = Vec::new();
        let mut position = 0;

        while position < raw.len() {
            let rest = &raw[position..];
            let id = self
                .by_length
                .iter()
                .copied()
                .find(|id| {
                    let symbol = &self.symbols[id.index()];
                    accept(symbol) && rest.starts_with(symbol.name.as_str())
                })
                .ok_or_else(|| GrammarError::Tokenization {
                    input: raw.to_string(),
                    position,
                })?;

            position += self.symbols[id.index()].name.len();
            tokens.push(id);
        }

        Ok(tokens)
    }

    /// Concatenate the names of `ids`
    pub fn render(&self, ids: &[SymbolId]) -> String {
        ids.iter().map(|&id| self.name(id)).collect()
    }

    /// Id of the symbol called `name`, if declared
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    /// Panics if `id` was not issued by this table
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn name(&self, id: SymbolId) -> &str {
        &self.symbols[id.index()].name
    }

    /// Whether `name` is a declared variable
    pub fn is_variable(&self, name: &str) -> bool {
        self.lookup(name)
            .is_some_and(|id| self.symbol(id).is_variable())
    }

    /// Whether `name` is a declared terminal. The null symbol counts as one.
    pub fn is_terminal(&self, name: &str) -> bool {
        self.lookup(name)
            .is_some_and(|id| !self.symbol(id).is_variable())
    }

    /// Whether `name` is the null symbol
    pub fn is_null(&self, name: &str) -> bool {
        self.lookup(name) == Some(self.null)
    }

    /// Same as [`SymbolTable::is_variable`] for an interned id
    pub fn is_variable_id(&self, id: SymbolId) -> bool {
        self.symbol(id).is_variable()
    }

    /// The start variable
    pub fn start(&self) -> SymbolId {
        self.start
    }

    /// The terminal standing for the empty string
    pub fn null_symbol(&self) -> SymbolId {
        self.null
    }

    /// Variables in declaration order
    pub fn variables(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.is_variable())
    }

    /// Terminals in declaration order, null symbol included
    pub fn terminals(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| !s.is_variable())
    }

    /// Number of declared symbols of both kinds
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
