//! Arrow notation for grammars typed by hand.
//!
//! Each line holds one rule, `LHS -> alt | alt`. Left-hand sides start with an
//! uppercase letter and become variables. Right-hand sides are matched against
//! the declared variables first; every other character is a one-character
//! terminal, and an uppercase character nobody defined is declared as a
//! variable without productions. `λ` and `ε` are recognised as null symbols.

use regex::Regex;

use crate::grammar::{Grammar, RuleDecl};
use crate::utils::{GrammarError, OptionExt, Result};

/// Null symbol used when the rules mention none
pub const DEFAULT_NULL_SYMBOL: &str = "λ";

const NULL_SYMBOLS: [&str; 2] = ["λ", "ε"];

/// Structured declarations recovered from arrow notation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGrammar {
    pub variables: Vec<String>,
    pub terminals: Vec<String>,
    pub rules: Vec<RuleDecl>,
    pub start: String,
    pub null_symbol: String,
}

impl ParsedGrammar {
    /// Validate the declarations and build the grammar
    pub fn into_grammar(self) -> Result<Grammar> {
        Grammar::new(
            self.variables,
            self.terminals,
            self.rules,
            &self.start,
            &self.null_symbol,
        )
    }
}

/// Parse rule lines. Blank lines and lines starting with `#` are skipped.
///
/// `start` defaults to the first left-hand side. `null_symbol` defaults to
/// the first of `λ`/`ε` found in the rules, or `λ`.
pub fn parse_grammar<I, S>(
    lines: I,
    start: Option<&str>,
    null_symbol: Option<&str>,
) -> Result<ParsedGrammar>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if let Some(null) = null_symbol {
        if null.is_empty() || null.chars().any(char::is_whitespace) {
            return Err(GrammarError::Parse(format!(
                "Null symbol must be a non-empty name without whitespace: {:?}",
                null
            )));
        }
    }

    let rule_regex = Regex::new(r"^\s*(\S+?)\s*->\s*(.*?)\s*$")
        .map_err(|e| GrammarError::Parse(e.to_string()))?;

    let mut rules: Vec<RuleDecl> = Vec::new();
    let mut variables: Vec<String> = Vec::new();

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let captures = rule_regex
            .captures(line)
            .ok_or_parse_err(|| format!("Invalid rule format: {}", line))?;
        let left = &captures[1];
        let right = &captures[2];

        if !left.chars().next().is_some_and(char::is_uppercase) {
            return Err(GrammarError::Parse(format!(
                "Left side must start with an uppercase letter: {}",
                line
            )));
        }
        if right.is_empty() {
            return Err(GrammarError::Parse(format!(
                "Both sides must not be empty: {}",
                line
            )));
        }

        let productions: Vec<String> = right
            .split('|')
            .map(|alt| alt.split_whitespace().collect::<String>())
            .collect();
        if productions.iter().any(String::is_empty) {
            return Err(GrammarError::Parse(format!(
                "All productions must be non-empty: {}",
                line
            )));
        }

        if !variables.iter().any(|v| v == left) {
            variables.push(left.to_string());
        }
        rules.push((left.to_string(), productions));
    }

    let start = match start {
        Some(start) => start.to_string(),
        None => variables
            .first()
            .cloned()
            .ok_or_parse_err(|| "No rules given".to_string())?,
    };

    let null_symbol = match null_symbol {
        Some(null) => null.to_string(),
        None => rules
            .iter()
            .flat_map(|(_, productions)| productions.iter())
            .find_map(|p| NULL_SYMBOLS.into_iter().find(|null| p.contains(null)))
            .unwrap_or(DEFAULT_NULL_SYMBOL)
            .to_string(),
    };

    let mut terminals: Vec<String> = Vec::new();
    for (_, productions) in &rules {
        for production in productions {
            collect_symbols(production, &null_symbol, &mut variables, &mut terminals);
        }
    }
    if !terminals.contains(&null_symbol) {
        terminals.push(null_symbol.clone());
    }

    Ok(ParsedGrammar {
        variables,
        terminals,
        rules,
        start,
        null_symbol,
    })
}

/// Split one production into known variables, the null symbol and single
/// characters, recording any new names
fn collect_symbols(
    production: &str,
    null_symbol: &str,
    variables: &mut Vec<String>,
    terminals: &mut Vec<String>,
) {
    let mut rest = production;
    while let Some(first) = rest.chars().next() {
        let known = variables
            .iter()
            .filter(|v| rest.starts_with(v.as_str()))
            .map(String::len)
            .max();
        if let Some(len) = known {
            rest = &rest[len..];
            continue;
        }
        if rest.starts_with(null_symbol) {
            rest = &rest[null_symbol.len()..];
            continue;
        }

        let name = first.to_string();
        if first.is_uppercase() {
            log::warn!("'{}' is used but never defined; declaring it without productions", name);
            variables.push(name);
        } else if !terminals.contains(&name) {
            terminals.push(name);
        }
        rest = &rest[first.len_utf8()..];
    }
}
