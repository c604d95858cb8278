use std::collections::BTreeMap;
use std::fmt;

use crate::symbol::{SymbolId, SymbolTable};
use crate::utils::{GrammarError, Result};

/// Rule declarations as given by the caller: variable name and its
/// production strings, in declaration order
pub type RuleDecl = (String, Vec<String>);

/// One right-hand-side alternative of a variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    /// The symbols replacing the variable; empty for the null production
    symbols: Vec<SymbolId>,
    is_null: bool,
}

impl Production {
    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }

    /// True when the production derives the empty string directly
    pub fn is_null(&self) -> bool {
        self.is_null
    }

    pub fn render(&self, symbols: &SymbolTable) -> String {
        if self.is_null {
            symbols.name(symbols.null_symbol()).to_string()
        } else {
            symbols.render(&self.symbols)
        }
    }
}

/// Productions of a single variable plus the flags derived from them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    variable: SymbolId,
    name: String,
    productions: Vec<Production>,
    can_be_null: bool,
    can_self_recurse: bool,
}

impl RuleEntry {
    pub fn variable(&self) -> SymbolId {
        self.variable
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Whether one of the productions is the null production
    pub fn can_be_null(&self) -> bool {
        self.can_be_null
    }

    /// Whether the variable occurs in one of its own productions
    pub fn can_self_recurse(&self) -> bool {
        self.can_self_recurse
    }
}

/// Productions of every variable that has at least one, keyed by variable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleIndex {
    entries: BTreeMap<SymbolId, RuleEntry>,
}

impl RuleIndex {
    /// Tokenize every production against `symbols` and index it under its
    /// variable. Building twice from the same input gives equal indexes.
    pub fn build(symbols: &SymbolTable, rules: &[RuleDecl]) -> Result<Self> {
        let mut entries: BTreeMap<SymbolId, RuleEntry> = BTreeMap::new();
        let null = symbols.null_symbol();

        for (variable, productions) in rules {
            let id = symbols
                .lookup(variable)
                .filter(|&id| symbols.is_variable_id(id))
                .ok_or_else(|| GrammarError::RuleForUnknownVariable(variable.clone()))?;

            let entry = entries.entry(id).or_insert_with(|| RuleEntry {
                variable: id,
                name: variable.clone(),
                productions: Vec::new(),
                can_be_null: false,
                can_self_recurse: false,
            });

            for raw in productions {
                if raw.is_empty() {
                    return Err(GrammarError::EmptyProduction(variable.clone()));
                }

                let tokens = symbols.tokenize(raw)?;
                let production = if tokens.contains(&null) {
                    if tokens.len() > 1 {
                        return Err(GrammarError::MixedNullProduction {
                            variable: variable.clone(),
                            production: raw.clone(),
                        });
                    }
                    Production {
                        symbols: Vec::new(),
                        is_null: true,
                    }
                } else {
                    Production {
                        symbols: tokens,
                        is_null: false,
                    }
                };

                if entry.productions.contains(&production) {
                    log::debug!("Skipping repeated production {} -> {}", variable, raw);
                    continue;
                }

                entry.can_be_null |= production.is_null;
                entry.can_self_recurse |= production.symbols.contains(&id);
                entry.productions.push(production);
            }
        }

        for entry in entries.values().filter(|e| e.can_self_recurse) {
            log::debug!("Variable '{}' is self-recursive", entry.name);
        }
        log::debug!(
            "Indexed {} productions across {} variables",
            entries.values().map(|e| e.productions.len()).sum::<usize>(),
            entries.len()
        );

        Ok(RuleIndex { entries })
    }

    /// Entry for a variable id, `None` when it has no productions
    pub fn get(&self, variable: SymbolId) -> Option<&RuleEntry> {
        self.entries.get(&variable)
    }

    /// Like [`RuleIndex::get`], looked up by name
    pub fn entry(&self, name: &str) -> Option<&RuleEntry> {
        self.entries.values().find(|e| e.name == name)
    }

    /// Entries in variable declaration order
    pub fn entries(&self) -> impl Iterator<Item = &RuleEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A validated context-free grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    symbols: SymbolTable,
    rules: Vec<RuleDecl>,
    index: RuleIndex,
}

impl Grammar {
    /// Validate the declarations and build the rule index.
    ///
    /// Every variable and terminal must be declared up front; the null
    /// symbol must be one of the terminals.
    pub fn new<V, T, R, K, P>(
        variables: V,
        terminals: T,
        rules: R,
        start: &str,
        null_symbol: &str,
    ) -> Result<Self>
    where
        V: IntoIterator,
        V::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
        R: IntoIterator<Item = (K, P)>,
        K: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let symbols = SymbolTable::new(variables, terminals, start, null_symbol)?;
        let rules: Vec<RuleDecl> = rules
            .into_iter()
            .map(|(variable, productions)| {
                (
                    variable.as_ref().to_string(),
                    productions
                        .into_iter()
                        .map(|p| p.as_ref().to_string())
                        .collect(),
                )
            })
            .collect();
        let index = RuleIndex::build(&symbols, &rules)?;

        Ok(Grammar {
            symbols,
            rules,
            index,
        })
    }

    /// Rebuild the rule index from the stored declarations
    pub fn rebuild_index(&mut self) -> Result<()> {
        self.index = RuleIndex::build(&self.symbols, &self.rules)?;
        Ok(())
    }

    /// The validated symbol table
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn index(&self) -> &RuleIndex {
        &self.index
    }

    /// The rule declarations the grammar was built from
    pub fn rules(&self) -> &[RuleDecl] {
        &self.rules
    }

    /// Name of the start variable
    pub fn start_symbol(&self) -> &str {
        self.symbols.name(self.symbols.start())
    }

    pub fn null_symbol(&self) -> &str {
        self.symbols.name(self.symbols.null_symbol())
    }

    /// Check if the grammar declares a specific variable
    pub fn has_variable(&self, name: &str) -> bool {
        self.symbols.is_variable(name)
    }

    /// Productions of `variable`, failing for a variable that was declared
    /// but never given a rule
    pub fn productions(&self, variable: SymbolId) -> Result<&[Production]> {
        self.index
            .get(variable)
            .map(RuleEntry::productions)
            .ok_or_else(|| GrammarError::UndefinedVariable(self.symbols.name(variable).to_string()))
    }

    /// Whether the start variable has the null production itself
    pub fn accepts_null(&self) -> bool {
        self.index
            .get(self.symbols.start())
            .is_some_and(RuleEntry::can_be_null)
    }

    /// Declared variables without any production
    pub fn undefined_variables(&self) -> Vec<&str> {
        self.symbols
            .variables()
            .map(|v| v.name())
            .filter(|name| self.index.entry(name).is_none())
            .collect()
    }
}

/// Human-readable rule listing, start variable first, then the others by name
pub fn render_grammar(grammar: &Grammar) -> String {
    render_rules(grammar, "").join("\n")
}

fn render_rules(grammar: &Grammar, prepend: &str) -> Vec<String> {
    let start = grammar.symbols.start();
    let mut entries: Vec<&RuleEntry> = grammar.index.entries().collect();
    entries.sort_by(|a, b| {
        (a.variable != start)
            .cmp(&(b.variable != start))
            .then_with(|| a.name.cmp(&b.name))
    });

    entries
        .into_iter()
        .map(|entry| {
            let alternatives: Vec<String> = entry
                .productions
                .iter()
                .map(|p| p.render(&grammar.symbols))
                .collect();
            format!("{}{} -> {}", prepend, entry.name, alternatives.join(" | "))
        })
        .collect()
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut variables: Vec<&str> = self.symbols.variables().map(|s| s.name()).collect();
        let mut terminals: Vec<&str> = self.symbols.terminals().map(|s| s.name()).collect();
        variables.sort_unstable();
        terminals.sort_unstable();

        writeln!(f, "Variables (V): {{{}}}", variables.join(", "))?;
        writeln!(f, "Terminals (Σ): {{{}}}", terminals.join(", "))?;
        writeln!(f, "Null character: {}", self.null_symbol())?;
        writeln!(f, "Start variable (S): {}", self.start_symbol())?;
        write!(f, "Rules (R):")?;
        for line in render_rules(self, "\t") {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}

/// Builder for constructing Grammar instances.
///
/// Left-hand sides of added rules are declared as variables and the null
/// symbol (default `λ`) is declared as a terminal automatically.
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    variables: Vec<String>,
    terminals: Vec<String>,
    rules: Vec<RuleDecl>,
    /// Names used by pre-tokenized productions, checked in `build`
    sequence_names: Vec<String>,
    start: String,
    null_symbol: String,
}

impl GrammarBuilder {
    /// Create a new grammar builder with the given start variable
    pub fn new(start: &str) -> Self {
        GrammarBuilder {
            variables: vec![start.to_string()],
            terminals: Vec::new(),
            rules: Vec::new(),
            sequence_names: Vec::new(),
            start: start.to_string(),
            null_symbol: "λ".to_string(),
        }
    }

    pub fn variables(mut self, names: &[&str]) -> Self {
        self.variables.extend(names.iter().map(|s| s.to_string()));
        self
    }

    pub fn terminals(mut self, names: &[&str]) -> Self {
        self.terminals.extend(names.iter().map(|s| s.to_string()));
        self
    }

    pub fn null_symbol(mut self, name: &str) -> Self {
        self.null_symbol = name.to_string();
        self
    }

    /// Add productions for a variable
    pub fn add_rule(mut self, variable: &str, productions: &[&str]) -> Self {
        self.variables.push(variable.to_string());
        self.rules.push((
            variable.to_string(),
            productions.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Add productions given as symbol-name sequences rather than strings.
    ///
    /// Every name must be declared by the time the grammar is built. Because
    /// no declared name contains another, the concatenated names tokenize back
    /// to exactly this sequence.
    pub fn add_symbol_rule(mut self, variable: &str, productions: &[&[&str]]) -> Self {
        self.variables.push(variable.to_string());
        for production in productions {
            self.sequence_names
                .extend(production.iter().map(|s| s.to_string()));
        }
        self.rules.push((
            variable.to_string(),
            productions.iter().map(|p| p.concat()).collect(),
        ));
        self
    }

    /// Build the grammar
    pub fn build(self) -> Result<Grammar> {
        let declared = |name: &String| {
            *name == self.null_symbol
                || self.variables.contains(name)
                || self.terminals.contains(name)
        };
        if let Some(name) = self.sequence_names.iter().find(|name| !declared(name)) {
            return Err(GrammarError::Tokenization {
                input: name.clone(),
                position: 0,
            });
        }

        let mut terminals = self.terminals;
        terminals.push(self.null_symbol.clone());
        Grammar::new(
            self.variables,
            terminals,
            self.rules,
            &self.start,
            &self.null_symbol,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn balanced() -> Grammar {
        GrammarBuilder::new("S")
            .terminals(&["0", "1"])
            .add_rule("S", &["0S1", "λ"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_index_flags() {
        let grammar = Grammar::new(
            ["S", "A"],
            ["a", "b", "λ"],
            vec![("S", vec!["aSb", "A"]), ("A", vec!["a", "λ"])],
            "S",
            "λ",
        )
        .unwrap();

        let s = grammar.index().entry("S").unwrap();
        assert!(s.can_self_recurse());
        assert!(!s.can_be_null());
        assert_eq!(s.productions().len(), 2);

        let a = grammar.index().entry("A").unwrap();
        assert!(!a.can_self_recurse());
        assert!(a.can_be_null());
        assert!(a.productions()[1].is_null());
        assert!(a.productions()[1].symbols().is_empty());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut grammar = balanced();
        let before = grammar.index().clone();
        grammar.rebuild_index().unwrap();
        grammar.rebuild_index().unwrap();
        assert_eq!(grammar.index(), &before);

        let rebuilt = RuleIndex::build(grammar.symbols(), grammar.rules()).unwrap();
        assert_eq!(rebuilt, before);
    }

    #[test]
    fn test_productions_keep_declaration_order() {
        let grammar = GrammarBuilder::new("S")
            .terminals(&["0", "1"])
            .add_rule("S", &["1", "0S"])
            .add_rule("S", &["0", "1S"])
            .build()
            .unwrap();

        let rendered: Vec<String> = grammar
            .index()
            .entry("S")
            .unwrap()
            .productions()
            .iter()
            .map(|p| p.render(grammar.symbols()))
            .collect();
        assert_eq!(rendered, vec!["1", "0S", "0", "1S"]);
    }

    #[test]
    fn test_symbol_sequences_match_string_rules() {
        let from_strings = GrammarBuilder::new("Expr")
            .terminals(&["num", "+"])
            .add_rule("Expr", &["Expr+num", "num"])
            .build()
            .unwrap();
        let from_sequences = GrammarBuilder::new("Expr")
            .terminals(&["num", "+"])
            .add_symbol_rule("Expr", &[&["Expr", "+", "num"], &["num"]])
            .build()
            .unwrap();
        assert_eq!(from_sequences.index(), from_strings.index());

        let err = GrammarBuilder::new("Expr")
            .terminals(&["num"])
            .add_symbol_rule("Expr", &[&["Expr", "-", "num"]])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            GrammarError::Tokenization {
                input: "-".to_string(),
                position: 0,
            }
        );
    }

    #[test]
    fn test_repeated_productions_collapse() {
        let grammar = GrammarBuilder::new("S")
            .terminals(&["a"])
            .add_rule("S", &["a", "aS", "a"])
            .build()
            .unwrap();
        assert_eq!(grammar.index().entry("S").unwrap().productions().len(), 2);
    }

    #[test]
    fn test_rejects_bad_rules() {
        let mixed = GrammarBuilder::new("S")
            .terminals(&["a"])
            .add_rule("S", &["aλ"])
            .build()
            .unwrap_err();
        assert_eq!(
            mixed,
            GrammarError::MixedNullProduction {
                variable: "S".to_string(),
                production: "aλ".to_string(),
            }
        );

        let unknown = GrammarBuilder::new("S")
            .terminals(&["a"])
            .add_rule("S", &["ab"])
            .build()
            .unwrap_err();
        assert_eq!(
            unknown,
            GrammarError::Tokenization {
                input: "ab".to_string(),
                position: 1,
            }
        );

        let empty = GrammarBuilder::new("S")
            .terminals(&["a"])
            .add_rule("S", &[""])
            .build()
            .unwrap_err();
        assert_eq!(empty, GrammarError::EmptyProduction("S".to_string()));

        let lhs = Grammar::new(["S"], ["a", "λ"], vec![("a", vec!["S"])], "S", "λ").unwrap_err();
        assert_eq!(lhs, GrammarError::RuleForUnknownVariable("a".to_string()));
    }

    #[test]
    fn test_undefined_variables_and_null() {
        let grammar = GrammarBuilder::new("S")
            .variables(&["B"])
            .terminals(&["a"])
            .add_rule("S", &["aB", "λ"])
            .build()
            .unwrap();
        assert!(grammar.accepts_null());
        assert_eq!(grammar.undefined_variables(), vec!["B"]);

        let b = grammar.symbols().lookup("B").unwrap();
        assert_eq!(
            grammar.productions(b).unwrap_err(),
            GrammarError::UndefinedVariable("B".to_string())
        );
    }

    #[test]
    fn test_render_grammar() {
        let grammar = GrammarBuilder::new("S")
            .terminals(&["a", "b"])
            .add_rule("B", &["b"])
            .add_rule("A", &["a", "λ"])
            .add_rule("S", &["AB", "ASB"])
            .build()
            .unwrap();
        assert_eq!(
            render_grammar(&grammar),
            "S -> AB | ASB\nA -> a | λ\nB -> b"
        );
    }

    #[test]
    fn test_display() {
        let text = balanced().to_string();
        assert_eq!(
            text,
            "Variables (V): {S}\n\
             Terminals (Σ): {0, 1, λ}\n\
             Null character: λ\n\
             Start variable (S): S\n\
             Rules (R):\n\
             \tS -> 0S1 | λ"
        );
    }
}
