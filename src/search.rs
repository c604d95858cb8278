use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::derivation::{DerivationArena, DerivationTrail, NodeId, SententialForm};
use crate::grammar::Grammar;
use crate::utils::{GrammarError, Result};

/// Order in which the rewrite graph is explored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    BreadthFirst,
    DepthFirst,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::BreadthFirst, Strategy::DepthFirst];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::BreadthFirst => "breadth-first",
            Strategy::DepthFirst => "depth-first",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bounds applied to a membership search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Forms longer than the target by more than this many symbols are pruned
    pub length_slack: usize,
    /// Maximum number of forms examined before giving up
    pub max_nodes: Option<usize>,
    /// Maximum number of rewrite steps along one derivation
    pub max_depth: Option<usize>,
    /// Discard forms whose terminals before the leftmost variable disagree
    /// with the target
    pub prefix_pruning: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            length_slack: 2,
            max_nodes: None,
            max_depth: None,
            prefix_pruning: true,
        }
    }
}

/// Outcome of a membership query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// A derivation of the target was found
    Accepted,
    /// The bounded search space was explored without a match
    Exhausted,
    /// A node or depth budget stopped the search before it finished
    BudgetExceeded,
    /// The target contains text not covered by any terminal
    Untokenizable,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        *self == Verdict::Accepted
    }
}

/// Counters collected while searching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Forms taken off the frontier or entered by recursion
    pub explored: usize,
    /// Forms discarded by the length or prefix bound
    pub pruned: usize,
    /// Successors skipped because they were seen earlier in the query
    pub revisits: usize,
    /// Largest breadth-first frontier observed
    pub peak_frontier: usize,
    /// Longest derivation examined
    pub deepest: usize,
}

/// Result of testing one string against a grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    target: String,
    strategy: Strategy,
    verdict: Verdict,
    trail: Option<DerivationTrail>,
    stats: SearchStats,
}

impl Membership {
    pub fn accepted(&self) -> bool {
        self.verdict.is_accepted()
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// The derivation found, present only for accepted strings
    pub fn trail(&self) -> Option<&DerivationTrail> {
        self.trail.as_ref()
    }

    /// Search counters, all zero when the search never started
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Owned, serializable summary with the trail rendered as strings
    pub fn report(&self) -> MembershipReport {
        MembershipReport {
            target: self.target.clone(),
            strategy: self.strategy,
            verdict: self.verdict,
            accepted: self.accepted(),
            trail: self
                .trail
                .as_ref()
                .map(|t| t.rendered().to_vec())
                .unwrap_or_default(),
            stats: self.stats,
        }
    }
}

/// Serializable summary of a [`Membership`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipReport {
    pub target: String,
    pub strategy: Strategy,
    pub verdict: Verdict,
    pub accepted: bool,
    pub trail: Vec<String>,
    pub stats: SearchStats,
}

/// Test `target` against `grammar` with the default bounds
pub fn test_membership(grammar: &Grammar, target: &str, strategy: Strategy) -> Result<Membership> {
    test_membership_with(grammar, target, strategy, &SearchConfig::default())
}

/// Test `target` against `grammar`.
///
/// A target that cannot be tokenized is a rejection, not an error. The only
/// error is [`GrammarError::UndefinedVariable`], raised when the search has
/// to rewrite a variable that has no productions.
pub fn test_membership_with(
    grammar: &Grammar,
    target: &str,
    strategy: Strategy,
    config: &SearchConfig,
) -> Result<Membership> {
    let symbols = grammar.symbols();
    let tokens = match symbols.tokenize_terminals(target) {
        Ok(tokens) => tokens,
        Err(GrammarError::Tokenization { position, .. }) => {
            log::debug!("'{}' is not tokenizable at byte {}", target, position);
            return Ok(Membership {
                target: target.to_string(),
                strategy,
                verdict: Verdict::Untokenizable,
                trail: None,
                stats: SearchStats::default(),
            });
        }
        Err(err) => return Err(err),
    };

    // Null productions erase their variable, so no form ever holds the null symbol
    if tokens.contains(&symbols.null_symbol()) {
        log::debug!("'{}' contains the null symbol and cannot be derived", target);
        return Ok(Membership {
            target: target.to_string(),
            strategy,
            verdict: Verdict::Exhausted,
            trail: None,
            stats: SearchStats::default(),
        });
    }

    let mut search = Search::new(grammar, SententialForm::new(tokens), config);
    let root = search.arena.push(SententialForm::start(symbols), None);
    search.visited.insert(search.arena.form(root).clone(), 0);

    let found = match strategy {
        Strategy::BreadthFirst => search.breadth_first(root)?,
        Strategy::DepthFirst => search.depth_first(root, 0)?,
    };

    let verdict = match found {
        Some(_) => Verdict::Accepted,
        None if search.truncated => Verdict::BudgetExceeded,
        None => Verdict::Exhausted,
    };
    log::debug!(
        "{} search for '{}' finished: {:?} ({} explored, {} pruned, {} revisits)",
        strategy,
        target,
        verdict,
        search.stats.explored,
        search.stats.pruned,
        search.stats.revisits
    );

    Ok(Membership {
        target: target.to_string(),
        strategy,
        verdict,
        trail: found.map(|leaf| search.arena.trail(leaf, symbols)),
        stats: search.stats,
    })
}

/// What to do with a form taken from the frontier
enum Step {
    Matched,
    Pruned,
    /// Terminal form that is not the target
    Dead,
    /// Rewrite the variable at this position
    Expand(usize),
}

/// State of one in-flight query
struct Search<'g> {
    grammar: &'g Grammar,
    config: &'g SearchConfig,
    target: SententialForm,
    arena: DerivationArena,
    /// Shallowest depth at which each form was reached
    visited: HashMap<SententialForm, usize>,
    stats: SearchStats,
    truncated: bool,
}

impl<'g> Search<'g> {
    fn new(grammar: &'g Grammar, target: SententialForm, config: &'g SearchConfig) -> Self {
        Search {
            grammar,
            config,
            target,
            arena: DerivationArena::new(),
            visited: HashMap::new(),
            stats: SearchStats::default(),
            truncated: false,
        }
    }

    fn classify(&self, form: &SententialForm) -> Step {
        if *form == self.target {
            return Step::Matched;
        }
        if form.len() > self.target.len().saturating_add(self.config.length_slack) {
            return Step::Pruned;
        }

        match form.leftmost_variable(self.grammar.symbols()) {
            None => Step::Dead,
            Some(at) if self.config.prefix_pruning => {
                let target = self.target.symbols();
                if at <= target.len() && form.symbols()[..at] == target[..at] {
                    Step::Expand(at)
                } else {
                    Step::Pruned
                }
            }
            Some(at) => Step::Expand(at),
        }
    }

    /// Every one-step leftmost rewrite of the node's form
    fn successors(&self, id: NodeId, at: usize) -> Result<Vec<SententialForm>> {
        let form = self.arena.form(id);
        let productions = self.grammar.productions(form.symbols()[at])?;
        Ok(productions
            .iter()
            .map(|p| form.rewrite(at, p.symbols()))
            .collect())
    }

    fn budget_spent(&self) -> bool {
        self.config
            .max_nodes
            .is_some_and(|max| self.stats.explored >= max)
    }

    /// Record `form` as reached at `depth`. Under a depth cap a form reached
    /// again closer to the root is explored again, since the earlier visit may
    /// have been cut off by the cap.
    fn first_visit(&mut self, form: &SententialForm, depth: usize) -> bool {
        match self.visited.entry(form.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(depth);
                true
            }
            Entry::Occupied(mut seen) => {
                if self.config.max_depth.is_some() && depth < *seen.get() {
                    seen.insert(depth);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn depth_exceeded(&self, depth: usize) -> bool {
        self.config.max_depth.is_some_and(|max| depth >= max)
    }

    fn breadth_first(&mut self, root: NodeId) -> Result<Option<NodeId>> {
        let mut frontier: VecDeque<(NodeId, usize)> = VecDeque::new();
        frontier.push_back((root, 0));

        while let Some((id, depth)) = frontier.pop_front() {
            if self.budget_spent() {
                self.truncated = true;
                break;
            }
            self.stats.explored += 1;
            self.stats.deepest = self.stats.deepest.max(depth);
            log::trace!(
                "bfs: {}",
                self.arena.form(id).render(self.grammar.symbols())
            );

            let at = match self.classify(self.arena.form(id)) {
                Step::Matched => return Ok(Some(id)),
                Step::Pruned => {
                    self.stats.pruned += 1;
                    continue;
                }
                Step::Dead => continue,
                Step::Expand(at) => at,
            };
            if self.depth_exceeded(depth) {
                self.truncated = true;
                continue;
            }

            for next in self.successors(id, at)? {
                if !self.first_visit(&next, depth + 1) {
                    self.stats.revisits += 1;
                    continue;
                }
                let child = self.arena.push(next, Some(id));
                frontier.push_back((child, depth + 1));
            }
            self.stats.peak_frontier = self.stats.peak_frontier.max(frontier.len());
        }

        Ok(None)
    }

    fn depth_first(&mut self, id: NodeId, depth: usize) -> Result<Option<NodeId>> {
        if self.budget_spent() {
            self.truncated = true;
            return Ok(None);
        }
        self.stats.explored += 1;
        self.stats.deepest = self.stats.deepest.max(depth);
        log::trace!(
            "dfs: {}",
            self.arena.form(id).render(self.grammar.symbols())
        );

        let at = match self.classify(self.arena.form(id)) {
            Step::Matched => return Ok(Some(id)),
            Step::Pruned => {
                self.stats.pruned += 1;
                return Ok(None);
            }
            Step::Dead => return Ok(None),
            Step::Expand(at) => at,
        };
        if self.depth_exceeded(depth) {
            self.truncated = true;
            return Ok(None);
        }

        for next in self.successors(id, at)? {
            if !self.first_visit(&next, depth + 1) {
                self.stats.revisits += 1;
                continue;
            }
            let child = self.arena.push(next, Some(id));
            if let Some(found) = self.depth_first(child, depth + 1)? {
                return Ok(Some(found));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;

    fn binary() -> Grammar {
        GrammarBuilder::new("S")
            .terminals(&["0", "1"])
            .add_rule("S", &["0S", "1S", "0", "1"])
            .build()
            .unwrap()
    }

    fn balanced() -> Grammar {
        GrammarBuilder::new("S")
            .terminals(&["0", "1"])
            .add_rule("S", &["0S1", "λ"])
            .build()
            .unwrap()
    }

    fn accepts(grammar: &Grammar, target: &str, strategy: Strategy) -> bool {
        test_membership(grammar, target, strategy).unwrap().accepted()
    }

    #[test]
    fn test_binary_strings() {
        let grammar = binary();
        for strategy in Strategy::ALL {
            for target in ["0", "1", "01", "101100"] {
                assert!(accepts(&grammar, target, strategy), "{} {}", strategy, target);
            }
            assert!(!accepts(&grammar, "", strategy));
        }
    }

    #[test]
    fn test_untokenizable_target() {
        let grammar = binary();
        for strategy in Strategy::ALL {
            let result = test_membership(&grammar, "2", strategy).unwrap();
            assert_eq!(result.verdict(), Verdict::Untokenizable);
            assert!(result.trail().is_none());
        }

        // Variable names are not part of the target alphabet
        let result = test_membership(&grammar, "S", Strategy::BreadthFirst).unwrap();
        assert_eq!(result.verdict(), Verdict::Untokenizable);
    }

    #[test]
    fn test_balanced_strings() {
        let grammar = balanced();
        for strategy in Strategy::ALL {
            for target in ["", "01", "0011"] {
                assert!(accepts(&grammar, target, strategy), "{} {:?}", strategy, target);
            }
            for target in ["0", "010"] {
                let result = test_membership(&grammar, target, strategy).unwrap();
                assert_eq!(result.verdict(), Verdict::Exhausted, "{} {:?}", strategy, target);
            }
        }
    }

    #[test]
    fn test_null_symbol_in_target_is_rejected() {
        let grammar = balanced();
        for strategy in Strategy::ALL {
            for target in ["λ", "0λ1", "01λ"] {
                let result = test_membership(&grammar, target, strategy).unwrap();
                assert_eq!(result.verdict(), Verdict::Exhausted, "{} {:?}", strategy, target);
                assert!(result.trail().is_none());
            }
        }
    }

    #[test]
    fn test_huge_slack_does_not_overflow() {
        let grammar = balanced();
        let config = SearchConfig {
            length_slack: usize::MAX,
            ..SearchConfig::default()
        };

        for strategy in Strategy::ALL {
            let result = test_membership_with(&grammar, "01", strategy, &config).unwrap();
            assert!(result.accepted());
            let result = test_membership_with(&grammar, "0", strategy, &config).unwrap();
            assert_eq!(result.verdict(), Verdict::Exhausted);
        }
    }

    #[test]
    fn test_depth_cap_revisits_shallower_forms() {
        // bC is first reached through A at the cap, then directly from S
        let grammar = GrammarBuilder::new("S")
            .variables(&["A", "C"])
            .terminals(&["b", "0"])
            .add_rule("S", &["A", "bC"])
            .add_rule("A", &["bC"])
            .add_rule("C", &["0"])
            .build()
            .unwrap();
        let config = SearchConfig {
            max_depth: Some(2),
            ..SearchConfig::default()
        };

        for strategy in Strategy::ALL {
            let result = test_membership_with(&grammar, "b0", strategy, &config).unwrap();
            assert!(result.accepted(), "{}", strategy);
            assert_eq!(result.trail().unwrap().rendered(), ["S", "bC", "b0"]);
        }
    }

    #[test]
    fn test_breadth_first_finds_shortest_derivation() {
        let grammar = GrammarBuilder::new("S")
            .variables(&["A"])
            .terminals(&["a"])
            .add_rule("S", &["A", "a"])
            .add_rule("A", &["a"])
            .build()
            .unwrap();

        let bfs = test_membership(&grammar, "a", Strategy::BreadthFirst).unwrap();
        assert_eq!(bfs.trail().unwrap().rendered(), ["S", "a"]);

        // Depth-first follows declaration order
        let dfs = test_membership(&grammar, "a", Strategy::DepthFirst).unwrap();
        assert_eq!(dfs.trail().unwrap().rendered(), ["S", "A", "a"]);
    }

    #[test]
    fn test_self_production_terminates() {
        let grammar = GrammarBuilder::new("S")
            .variables(&["A"])
            .terminals(&["0"])
            .add_rule("S", &["A", "0"])
            .add_rule("A", &["A", "λ"])
            .build()
            .unwrap();

        for strategy in Strategy::ALL {
            assert!(accepts(&grammar, "", strategy));
            assert!(accepts(&grammar, "0", strategy));
            assert!(!accepts(&grammar, "00", strategy));
        }
    }

    #[test]
    fn test_undefined_variable_is_an_error() {
        let grammar = GrammarBuilder::new("S")
            .variables(&["B"])
            .terminals(&["a"])
            .add_rule("S", &["B", "a"])
            .build()
            .unwrap();

        for strategy in Strategy::ALL {
            assert_eq!(
                test_membership(&grammar, "a", strategy).unwrap_err(),
                GrammarError::UndefinedVariable("B".to_string())
            );
        }
    }

    #[test]
    fn test_node_budget() {
        let grammar = balanced();
        let config = SearchConfig {
            max_nodes: Some(2),
            ..SearchConfig::default()
        };

        for strategy in Strategy::ALL {
            let result = test_membership_with(&grammar, "000111", strategy, &config).unwrap();
            assert_eq!(result.verdict(), Verdict::BudgetExceeded);
            assert!(!result.accepted());
            assert_eq!(result.stats().explored, 2);
        }
    }

    #[test]
    fn test_depth_budget() {
        let grammar = balanced();
        let config = SearchConfig {
            max_depth: Some(1),
            ..SearchConfig::default()
        };

        for strategy in Strategy::ALL {
            let result = test_membership_with(&grammar, "0011", strategy, &config).unwrap();
            assert_eq!(result.verdict(), Verdict::BudgetExceeded);

            // Short enough to fit under the cap
            let result = test_membership_with(&grammar, "", strategy, &config).unwrap();
            assert!(result.accepted());
        }
    }

    #[test]
    fn test_prefix_pruning_keeps_outcomes() {
        let grammar = binary();
        let unpruned = SearchConfig {
            prefix_pruning: false,
            ..SearchConfig::default()
        };

        for strategy in Strategy::ALL {
            for target in ["", "1", "0110", "2"] {
                let pruned = test_membership(&grammar, target, strategy).unwrap();
                let plain = test_membership_with(&grammar, target, strategy, &unpruned).unwrap();
                assert_eq!(pruned.verdict(), plain.verdict());
                assert!(pruned.stats().explored <= plain.stats().explored);
            }
        }
    }

    #[test]
    fn test_report() {
        let grammar = balanced();
        let report = test_membership(&grammar, "01", Strategy::BreadthFirst)
            .unwrap()
            .report();
        assert!(report.accepted);
        assert_eq!(report.verdict, Verdict::Accepted);
        assert_eq!(report.trail, vec!["S", "0S1", "01"]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["strategy"], "breadth_first");
        assert_eq!(json["verdict"], "accepted");
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: SearchConfig = serde_json::from_str(r#"{"max_nodes": 10}"#).unwrap();
        assert_eq!(config.length_slack, 2);
        assert_eq!(config.max_nodes, Some(10));
        assert!(config.prefix_pruning);
    }
}
