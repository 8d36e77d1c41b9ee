//! Heads-up postflop CFR+ equilibrium solver.
//!
//! Builds an abstracted betting tree for one flop/turn/river spot,
//! runs vectorized CFR+ over both players' ranges and exposes the
//! converged strategy through a navigable cursor: per-hand action
//! probabilities, normalized reach weights, aggregate frequencies,
//! equities and expected values.

pub mod bet_size;
pub mod cards;
mod cfr;
pub mod cli;
pub mod display;
pub mod error;
pub mod game;
pub mod hand_eval;
pub mod range;
pub mod solver;
pub mod tree;

pub use bet_size::{BetSize, BetSizeOptions};
pub use error::{SolverError, SolverResult};
pub use game::{PostflopGame, SpotConfig};
pub use range::{parse_range, Range, StartingHand};
pub use solver::{
    compute_exploitability, solve, solve_converged, solve_with_options, SolutionSummary,
    SolveOptions, SolveStats,
};
pub use tree::{Action, GameTree, Player, Street, TreeConfig, TreeStats};
