use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::bet_size::BetSizeOptions;
use crate::cards::parse_board;
use crate::display::{
    board_display, frequency_lines, print_error, range_grid, strategy_table, styled_action,
};
use crate::error::{SolverError, SolverResult};
use crate::game::{PostflopGame, SpotConfig};
use crate::range::parse_range;
use crate::solver::{solve_with_options, SolutionSummary, SolveOptions};
use crate::tree::{GameTree, TreeConfig};

#[derive(Parser)]
#[command(
    name = "flopcfr",
    version = "1.0.0",
    about = "Heads-up postflop CFR+ solver — ranges, action trees, equilibrium strategies."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a postflop spot and print the root strategy
    Solve {
        /// Out-of-position range, e.g. "AA,KK,AKs"
        #[arg(long)]
        oop: String,
        /// In-position range
        #[arg(long)]
        ip: String,
        /// Board cards, three to five, e.g. 2c7d9h or 2c7d9hAs
        #[arg(long)]
        board: String,
        /// Starting pot in chips
        #[arg(long, default_value = "100")]
        pot: i32,
        /// Effective stack behind in chips
        #[arg(long, default_value = "400")]
        stack: i32,
        /// Bet sizing spec: percent of pot and/or "a" for all-in
        #[arg(long, default_value = "50%,a")]
        bet: String,
        /// Raise sizing spec: multiples of the last bet and/or "a"
        #[arg(long, default_value = "3x")]
        raise: String,
        /// Iteration cap
        #[arg(long, default_value = "1000")]
        iterations: u32,
        /// Target exploitability in chips
        #[arg(long, default_value = "0.5")]
        target: f64,
        /// Hands shown in the strategy table
        #[arg(long, default_value = "20")]
        rows: usize,
        /// Emit a JSON summary instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Parse a range and show it on the 13x13 grid
    Range {
        /// Range string, e.g. "22+,ATs+,KQo"
        range_str: String,
    },
    /// Build the action tree for a spot and print its shape
    Tree {
        /// Board cards, three to five
        #[arg(long)]
        board: String,
        #[arg(long, default_value = "100")]
        pot: i32,
        #[arg(long, default_value = "400")]
        stack: i32,
        #[arg(long, default_value = "50%,a")]
        bet: String,
        #[arg(long, default_value = "3x")]
        raise: String,
    },
}

pub fn run() {
    dispatch(Cli::parse());
}

pub fn run_with_args(args: Vec<String>) {
    dispatch(Cli::parse_from(args));
}

fn dispatch(cli: Cli) {
    match cli.command {
        Commands::Solve {
            oop,
            ip,
            board,
            pot,
            stack,
            bet,
            raise,
            iterations,
            target,
            rows,
            json,
        } => cmd_solve(
            oop, ip, board, pot, stack, bet, raise, iterations, target, rows, json,
        ),
        Commands::Range { range_str } => cmd_range(range_str),
        Commands::Tree {
            board,
            pot,
            stack,
            bet,
            raise,
        } => cmd_tree(board, pot, stack, bet, raise),
    }
}

fn spot_config(
    oop: &str,
    ip: &str,
    board: &str,
    pot: i32,
    stack: i32,
    bet: &str,
    raise: &str,
) -> SolverResult<SpotConfig> {
    let cards = parse_board(board)?;
    if !(3..=5).contains(&cards.len()) {
        return Err(SolverError::InvalidCardSyntax(format!(
            "board needs 3 to 5 cards, got {}",
            cards.len()
        )));
    }
    Ok(SpotConfig {
        oop_range: oop.into(),
        ip_range: ip.into(),
        flop: cards[..3].iter().map(|c| c.to_string()).collect(),
        turn: cards.get(3).map(|c| c.to_string()),
        river: cards.get(4).map(|c| c.to_string()),
        starting_pot: pot,
        effective_stack: stack,
        bet_sizes: bet.into(),
        raise_sizes: raise.into(),
    })
}

#[allow(clippy::too_many_arguments)]
fn cmd_solve(
    oop: String,
    ip: String,
    board: String,
    pot: i32,
    stack: i32,
    bet: String,
    raise: String,
    iterations: u32,
    target: f64,
    rows: usize,
    json: bool,
) {
    let config = match spot_config(&oop, &ip, &board, pot, stack, &bet, &raise) {
        Ok(c) => c,
        Err(e) => {
            print_error(&e.to_string());
            return;
        }
    };
    let mut game = match PostflopGame::new(config) {
        Ok(g) => g,
        Err(e) => {
            print_error(&e.to_string());
            return;
        }
    };

    if !json {
        println!();
        println!(
            "  Solving {}: pot={}, stack={}, up to {} iterations, target {:.2}...",
            board_display(game.board()),
            pot,
            stack,
            iterations,
            target
        );
    }

    let options = SolveOptions {
        max_iterations: iterations,
        target_exploitability: target,
        ..SolveOptions::default()
    };
    let stats = solve_with_options(&mut game, &options);

    if let Err(e) = game.cache_normalized_weights() {
        print_error(&e.to_string());
        return;
    }
    let frequencies = match game.action_frequencies() {
        Ok(f) => f,
        Err(e) => {
            print_error(&e.to_string());
            return;
        }
    };
    let strategy = match game.strategy() {
        Ok(s) => s,
        Err(e) => {
            print_error(&e.to_string());
            return;
        }
    };
    let player = match game.current_player() {
        Some(p) => p,
        None => {
            print_error("no decision node at the tree root");
            return;
        }
    };

    if json {
        let summary = SolutionSummary {
            board,
            oop_range: oop,
            ip_range: ip,
            starting_pot: pot,
            effective_stack: stack,
            iterations: stats.iterations,
            exploitability: stats.exploitability,
            target_exploitability: target,
            root_actions: game
                .available_actions()
                .iter()
                .map(|a| a.to_string())
                .collect(),
            root_frequencies: frequencies,
        };
        match summary.to_json() {
            Ok(text) => println!("{}", text),
            Err(e) => print_error(&e.to_string()),
        }
        return;
    }

    let weights = match game.normalized_weights(player) {
        Ok(w) => w.to_vec(),
        Err(e) => {
            print_error(&e.to_string());
            return;
        }
    };

    println!(
        "  Exploitability {:.3} chips ({:.2}% of pot) after {} iterations",
        stats.exploitability,
        stats.exploitability / f64::from(pot) * 100.0,
        stats.iterations
    );

    println!("\n{}", format!("{} action frequencies", player).cyan().bold());
    print!("{}", frequency_lines(game.available_actions(), &frequencies));

    println!("\n{}", format!("{} strategy by hand", player).cyan().bold());
    println!(
        "{}",
        strategy_table(
            game.private_cards(player),
            game.available_actions(),
            &strategy,
            &weights,
            rows,
        )
    );
}

fn cmd_range(range_str: String) {
    let range = match parse_range(&range_str) {
        Ok(r) => r,
        Err(e) => {
            print_error(&e.to_string());
            return;
        }
    };

    println!();
    println!("{}", range_grid(&range, &format!("Range: {}", range_str)));
    let combos: f64 = range.entries().iter().map(|(_, w)| w).sum();
    println!("\n  {} hands, {:.1} combos", range.len(), combos);
}

fn cmd_tree(board: String, pot: i32, stack: i32, bet: String, raise: String) {
    if pot <= 0 || stack <= 0 {
        print_error("pot and stack must be positive");
        return;
    }
    let cards = match parse_board(&board) {
        Ok(c) => c,
        Err(e) => {
            print_error(&e.to_string());
            return;
        }
    };
    if !(3..=5).contains(&cards.len()) {
        print_error(&format!("board needs 3 to 5 cards, got {}", cards.len()));
        return;
    }
    let sizes = match BetSizeOptions::try_from_specs(&bet, &raise) {
        Ok(s) => s,
        Err(e) => {
            print_error(&e.to_string());
            return;
        }
    };

    let tree = GameTree::build(TreeConfig {
        flop: [cards[0], cards[1], cards[2]],
        turn: cards.get(3).copied(),
        river: cards.get(4).copied(),
        starting_pot: pot,
        effective_stack: stack,
        sizes,
    });
    let stats = tree.stats();

    println!();
    println!("  Board: {}", board_display(&cards));
    println!("  Nodes: {}", tree.node_count());
    println!(
        "  Decisions: {}, chance: {}, folds: {}, showdowns: {}",
        stats.decision_nodes, stats.chance_nodes, stats.fold_terminals, stats.showdown_terminals
    );
    println!("\n{}", "Root actions".cyan().bold());
    for action in tree.root().actions() {
        println!("  {}", styled_action(action));
    }
}
