use cfg_membership::notation::parse_grammar;
use cfg_membership::{
    Membership, SearchConfig, Strategy, Verdict, render_grammar, render_trail,
    test_membership_with,
};
use clap::{Parser, ValueEnum};

/// Test strings for membership in a context-free grammar
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Grammar rule in arrow notation, e.g. "S -> 0S1 | λ" (repeatable)
    #[arg(short, long = "rule", value_name = "RULE", required = true)]
    rules: Vec<String>,

    /// Start variable (default: left side of the first rule)
    #[arg(short, long, value_name = "VARIABLE")]
    start: Option<String>,

    /// Null symbol (default: λ or ε, whichever the rules use)
    #[arg(short, long = "null", value_name = "SYMBOL")]
    null_symbol: Option<String>,

    /// Search strategy
    #[arg(long, value_enum, default_value_t = StrategyArg::Both)]
    strategy: StrategyArg,

    /// Prune forms longer than the target by more than this many symbols
    #[arg(long, default_value_t = 2)]
    slack: usize,

    /// Give up after examining this many forms
    #[arg(long)]
    max_nodes: Option<usize>,

    /// Give up on derivations longer than this many steps
    #[arg(long)]
    max_depth: Option<usize>,

    /// Keep forms whose terminal prefix disagrees with the target
    #[arg(long)]
    no_prefix_pruning: bool,

    /// Print the grammar before testing
    #[arg(long)]
    show_grammar: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Strings to test
    #[arg(value_name = "STRING")]
    strings: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Bfs,
    Dfs,
    Both,
}

impl StrategyArg {
    fn strategies(self) -> &'static [Strategy] {
        match self {
            StrategyArg::Bfs => &[Strategy::BreadthFirst],
            StrategyArg::Dfs => &[Strategy::DepthFirst],
            StrategyArg::Both => &Strategy::ALL,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let parsed = parse_grammar(&cli.rules, cli.start.as_deref(), cli.null_symbol.as_deref())?;
    let grammar = parsed.into_grammar()?;
    for variable in grammar.undefined_variables() {
        log::warn!("Variable '{}' has no productions", variable);
    }

    let config = SearchConfig {
        length_slack: cli.slack,
        max_nodes: cli.max_nodes,
        max_depth: cli.max_depth,
        prefix_pruning: !cli.no_prefix_pruning,
    };

    if cli.show_grammar && !cli.json {
        println!("{}\n", grammar);
    }

    let mut reports = Vec::new();
    for target in &cli.strings {
        for &strategy in cli.strategy.strategies() {
            let membership = test_membership_with(&grammar, target, strategy, &config)?;
            if cli.json {
                reports.push(membership.report());
            } else {
                print_membership(&membership);
            }
        }
    }

    if cli.json {
        let output = serde_json::json!({
            "grammar": render_grammar(&grammar).lines().collect::<Vec<_>>(),
            "results": reports,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}

fn print_membership(membership: &Membership) {
    let target = membership.target();
    let strategy = membership.strategy();
    let explored = membership.stats().explored;

    match (membership.verdict(), membership.trail()) {
        (Verdict::Accepted, Some(trail)) => {
            println!(
                "String '{}' is accepted by the grammar ({}, {} forms explored)",
                target, strategy, explored
            );
            println!("Leftmost derivation path:");
            println!("{}\n", render_trail(trail));
        }
        (Verdict::Untokenizable, _) => {
            println!(
                "String '{}' is NOT accepted by the grammar ({}: not made of terminals)",
                target, strategy
            );
        }
        (Verdict::BudgetExceeded, _) => {
            println!(
                "String '{}' is NOT accepted by the grammar ({}: budget spent after {} forms)",
                target, strategy, explored
            );
        }
        _ => {
            println!(
                "String '{}' is NOT accepted by the grammar ({}: search exhausted after {} forms)",
                target, strategy, explored
            );
        }
    }
}
