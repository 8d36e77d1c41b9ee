//! CFR+ solving engine.
//!
//! Each iteration runs one vectorized traversal per player. The
//! traverser carries two vectors down the tree: its own per-hand reach
//! (feeds the average-strategy sum) and the opponent's counterfactual
//! reach (feeds the values). Regrets floor at zero after every update
//! and the strategy sum uses linear weighting, so late iterations
//! dominate the average.
//!
//! Chance branches run in parallel: each dealt card's subtree owns a
//! disjoint, contiguous slice of the traverser's tables, carved out
//! with `split_at_mut` and handed to rayon.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::cfr::{self, FlatTables};
use crate::error::{SolverError, SolverResult};
use crate::game::{PostflopGame, Spot};
use crate::tree::{GameTree, NodeKind, Player};

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SolveOptions {
    pub max_iterations: u32,
    /// Stop once exploitability drops to this many chips.
    pub target_exploitability: f64,
    /// Exploitability is measured every this many iterations.
    pub check_interval: u32,
    /// Checked between iterations; set from another thread to stop a
    /// long solve early.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SolveOptions {
    fn default() -> SolveOptions {
        SolveOptions {
            max_iterations: 1000,
            target_exploitability: 0.0,
            check_interval: 10,
            cancel: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SolveStats {
    pub iterations: u32,
    pub exploitability: f64,
}

/// Runs CFR+ until exploitability reaches the target or the iteration
/// cap is hit, whichever comes first, and returns the exploitability
/// achieved. Never fails: a partially converged strategy is usable.
pub fn solve(game: &mut PostflopGame, max_iterations: u32, target_exploitability: f64) -> f64 {
    let options = SolveOptions {
        max_iterations,
        target_exploitability,
        ..SolveOptions::default()
    };
    solve_with_options(game, &options).exploitability
}

/// Like [`solve`], but fails with `DidNotConverge` when the iteration
/// cap is hit with exploitability still above the target.
pub fn solve_converged(
    game: &mut PostflopGame,
    max_iterations: u32,
    target_exploitability: f64,
) -> SolverResult<f64> {
    let options = SolveOptions {
        max_iterations,
        target_exploitability,
        ..SolveOptions::default()
    };
    let stats = solve_with_options(game, &options);
    if stats.exploitability <= target_exploitability {
        Ok(stats.exploitability)
    } else {
        Err(SolverError::DidNotConverge {
            exploitability: stats.exploitability,
            target: target_exploitability,
        })
    }
}

pub fn solve_with_options(game: &mut PostflopGame, options: &SolveOptions) -> SolveStats {
    let interval = options.check_interval.max(1);
    let mut exploitability = f64::INFINITY;
    let mut iterations = 0;
    let mut measured = false;

    for t in 0..options.max_iterations {
        if let Some(flag) = &options.cancel {
            if flag.load(Ordering::Relaxed) {
                log::info!("solve cancelled after {} iterations", iterations);
                break;
            }
        }
        run_iteration(game, f64::from(t + 1));
        iterations = t + 1;
        measured = false;

        if iterations % interval == 0 {
            exploitability = compute_exploitability(game);
            measured = true;
            log::debug!(
                "iteration {}: exploitability {:.4}",
                iterations,
                exploitability
            );
            if exploitability <= options.target_exploitability {
                break;
            }
        }
    }
    if !measured {
        exploitability = compute_exploitability(game);
    }
    game.mark_solved();
    log::info!(
        "solved in {} iterations, exploitability {:.4}",
        iterations,
        exploitability
    );
    SolveStats {
        iterations,
        exploitability,
    }
}

/// Sum over both players of best-response value minus average-strategy
/// value at the root, in chips. Zero at an exact equilibrium.
pub fn compute_exploitability(game: &PostflopGame) -> f64 {
    let view = SolveView {
        tree: game.tree(),
        spot: game.spot(),
    };
    let tables = game.tables();
    let mut total = 0.0;
    for player in [Player::Oop, Player::Ip] {
        let own = &view.spot.initial_weights[player.index()];
        let opp = &view.spot.initial_weights[player.opponent().index()];
        let br = best_response_values(&view, 0, player, tables, opp);
        let avg = average_values(&view, 0, player, tables, opp);
        let br_total: f64 = own.iter().zip(&br).map(|(w, v)| w * v).sum();
        let avg_total: f64 = own.iter().zip(&avg).map(|(w, v)| w * v).sum();
        total += (br_total - avg_total) / view.spot.num_combinations;
    }
    total
}

// ---------------------------------------------------------------------------
// CFR+ traversal
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub(crate) struct SolveView<'a> {
    pub tree: &'a GameTree,
    pub spot: &'a Spot,
}

fn run_iteration(game: &mut PostflopGame, weight: f64) {
    let (tables, tree, spot) = game.solve_parts_mut();
    let view = SolveView { tree, spot };
    let [oop, ip] = tables;

    {
        let own = spot.initial_weights[Player::Oop.index()].clone();
        let cf = spot.initial_weights[Player::Ip.index()].clone();
        let (reg, cum, offsets) = oop.parts_mut();
        solve_node(
            &view,
            0,
            Player::Oop,
            reg,
            cum,
            offsets,
            0,
            ip,
            &own,
            &cf,
            weight,
        );
    }
    {
        let own = spot.initial_weights[Player::Ip.index()].clone();
        let cf = spot.initial_weights[Player::Oop.index()].clone();
        let (reg, cum, offsets) = ip.parts_mut();
        solve_node(
            &view,
            0,
            Player::Ip,
            reg,
            cum,
            offsets,
            0,
            oop,
            &own,
            &cf,
            weight,
        );
    }
}

/// One CFR+ pass below `node_id` for `traverser`, returning that
/// player's per-hand counterfactual values. `reg` and `cum` are the
/// traverser's table slices starting at absolute offset `base`.
#[allow(clippy::too_many_arguments)]
fn solve_node(
    view: &SolveView,
    node_id: u32,
    traverser: Player,
    reg: &mut [f32],
    cum: &mut [f32],
    offsets: &[u32],
    base: usize,
    opp: &FlatTables,
    own_reach: &[f64],
    cfreach: &[f64],
    weight: f64,
) -> Vec<f64> {
    let num_hands = own_reach.len();
    // A subtree nobody reaches contributes nothing to values, regrets
    // or the strategy sum.
    if own_reach.iter().all(|&x| x == 0.0) && cfreach.iter().all(|&x| x == 0.0) {
        return vec![0.0; num_hands];
    }

    let node = view.tree.node(node_id);
    match &node.kind {
        NodeKind::TerminalFold { .. } | NodeKind::TerminalShowdown => {
            view.spot.terminal_values(node, traverser, cfreach)
        }

        NodeKind::Chance { cards, children } => {
            let scale = 1.0 / node.street.chance_factor();
            let own_hands = &view.spot.hands[traverser.index()];
            let opp_hands = &view.spot.hands[traverser.opponent().index()];

            // Carve each card subtree's contiguous table rows off the
            // front of the remaining slices.
            let mut jobs = Vec::with_capacity(children.len());
            let mut rest_reg = reg;
            let mut rest_cum = cum;
            let mut consumed = base;
            for (i, &child) in children.iter().enumerate() {
                let start = offsets[child as usize] as usize;
                let end = offsets[view.tree.node(child).subtree_end as usize] as usize;
                let (_, tail) = std::mem::take(&mut rest_reg).split_at_mut(start - consumed);
                let (child_reg, tail) = tail.split_at_mut(end - start);
                rest_reg = tail;
                let (_, tail) = std::mem::take(&mut rest_cum).split_at_mut(start - consumed);
                let (child_cum, tail) = tail.split_at_mut(end - start);
                rest_cum = tail;
                consumed = end;
                jobs.push((child, cards[i], child_reg, child_cum, start));
            }

            let per_card: Vec<(u64, Vec<f64>)> = jobs
                .into_par_iter()
                .map(|(child, card, child_reg, child_cum, start)| {
                    let mask = card.mask();
                    let own: Vec<f64> = own_reach
                        .iter()
                        .zip(own_hands)
                        .map(|(&r, hand)| if hand.conflicts_with(mask) { 0.0 } else { r })
                        .collect();
                    let cf: Vec<f64> = cfreach
                        .iter()
                        .zip(opp_hands)
                        .map(|(&c, hand)| {
                            if hand.conflicts_with(mask) {
                                0.0
                            } else {
                                c * scale
                            }
                        })
                        .collect();
                    let vals = solve_node(
                        view, child, traverser, child_reg, child_cum, offsets, start, opp, &own,
                        &cf, weight,
                    );
                    (mask, vals)
                })
                .collect();

            let mut node_values = vec![0.0; num_hands];
            for (mask, vals) in per_card {
                for (h, hand) in own_hands.iter().enumerate() {
                    if !hand.conflicts_with(mask) {
                        node_values[h] += vals[h];
                    }
                }
            }
            node_values
        }

        NodeKind::Decision {
            player,
            actions,
            children,
        } if *player == traverser => {
            let na = actions.len();
            let width = na * num_hands;
            let start = offsets[node_id as usize] as usize - base;
            let sigma = cfr::matched_strategy(&reg[start..start + width], na, num_hands);

            let mut action_values = vec![0.0; width];
            for (a, &child) in children.iter().enumerate() {
                let row = &sigma[a * num_hands..(a + 1) * num_hands];
                let next_reach: Vec<f64> =
                    own_reach.iter().zip(row).map(|(&r, &s)| r * s).collect();
                let vals = solve_node(
                    view,
                    child,
                    traverser,
                    reg,
                    cum,
                    offsets,
                    base,
                    opp,
                    &next_reach,
                    cfreach,
                    weight,
                );
                action_values[a * num_hands..(a + 1) * num_hands].copy_from_slice(&vals);
            }

            let mut node_values = vec![0.0; num_hands];
            for a in 0..na {
                let row = a * num_hands;
                for h in 0..num_hands {
                    node_values[h] += sigma[row + h] * action_values[row + h];
                }
            }
            cfr::apply_update(
                &mut reg[start..start + width],
                &mut cum[start..start + width],
                &sigma,
                &action_values,
                &node_values,
                own_reach,
                weight,
                na,
                num_hands,
            );
            node_values
        }

        NodeKind::Decision {
            actions, children, ..
        } => {
            // Opponent node: their regret-matched strategy reweights the
            // counterfactual reach, values sum across actions.
            let na = actions.len();
            let opp_hands = cfreach.len();
            let sigma = opp.current_strategy(node_id, na);

            let mut node_values = vec![0.0; num_hands];
            for (a, &child) in children.iter().enumerate() {
                let row = &sigma[a * opp_hands..(a + 1) * opp_hands];
                let next_cf: Vec<f64> = cfreach.iter().zip(row).map(|(&c, &s)| c * s).collect();
                let vals = solve_node(
                    view, child, traverser, reg, cum, offsets, base, opp, own_reach, &next_cf,
                    weight,
                );
                for h in 0..num_hands {
                    node_values[h] += vals[h];
                }
            }
            node_values
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation traversals (read-only)
// ---------------------------------------------------------------------------

/// Per-hand value for `player` when they best-respond and the opponent
/// plays the running average strategy.
fn best_response_values(
    view: &SolveView,
    node_id: u32,
    player: Player,
    tables: &[FlatTables; 2],
    cfreach: &[f64],
) -> Vec<f64> {
    let num_hands = view.spot.hands[player.index()].len();
    if cfreach.iter().all(|&x| x == 0.0) {
        return vec![0.0; num_hands];
    }

    let node = view.tree.node(node_id);
    match &node.kind {
        NodeKind::TerminalFold { .. } | NodeKind::TerminalShowdown => {
            view.spot.terminal_values(node, player, cfreach)
        }

        NodeKind::Chance { cards, children } => chance_values(
            view,
            cards,
            children,
            player,
            node.street.chance_factor(),
            cfreach,
            |child, cf| best_response_values(view, child, player, tables, cf),
        ),

        NodeKind::Decision {
            player: actor,
            children,
            ..
        } if *actor == player => {
            let mut best = vec![f64::NEG_INFINITY; num_hands];
            for &child in children {
                let vals = best_response_values(view, child, player, tables, cfreach);
                for h in 0..num_hands {
                    best[h] = best[h].max(vals[h]);
                }
            }
            best
        }

        NodeKind::Decision {
            player: actor,
            actions,
            children,
        } => {
            let na = actions.len();
            let opp_hands = cfreach.len();
            let sigma = tables[actor.index()].average_strategy(node_id, na);
            let mut node_values = vec![0.0; num_hands];
            for (a, &child) in children.iter().enumerate() {
                let row = &sigma[a * opp_hands..(a + 1) * opp_hands];
                let next_cf: Vec<f64> = cfreach.iter().zip(row).map(|(&c, &s)| c * s).collect();
                let vals = best_response_values(view, child, player, tables, &next_cf);
                for h in 0..num_hands {
                    node_values[h] += vals[h];
                }
            }
            node_values
        }
    }
}

/// Per-hand value for `player` when both sides play the running
/// average strategy.
pub(crate) fn average_values(
    view: &SolveView,
    node_id: u32,
    player: Player,
    tables: &[FlatTables; 2],
    cfreach: &[f64],
) -> Vec<f64> {
    let num_hands = view.spot.hands[player.index()].len();
    if cfreach.iter().all(|&x| x == 0.0) {
        return vec![0.0; num_hands];
    }

    let node = view.tree.node(node_id);
    match &node.kind {
        NodeKind::TerminalFold { .. } | NodeKind::TerminalShowdown => {
            view.spot.terminal_values(node, player, cfreach)
        }

        NodeKind::Chance { cards, children } => chance_values(
            view,
            cards,
            children,
            player,
            node.street.chance_factor(),
            cfreach,
            |child, cf| average_values(view, child, player, tables, cf),
        ),

        NodeKind::Decision {
            player: actor,
            actions,
            children,
        } if *actor == player => {
            let na = actions.len();
            let sigma = tables[player.index()].average_strategy(node_id, na);
            let mut node_values = vec![0.0; num_hands];
            for (a, &child) in children.iter().enumerate() {
                let vals = average_values(view, child, player, tables, cfreach);
                let row = a * num_hands;
                for h in 0..num_hands {
                    node_values[h] += sigma[row + h] * vals[h];
                }
            }
            node_values
        }

        NodeKind::Decision {
            player: actor,
            actions,
            children,
        } => {
            let na = actions.len();
            let opp_hands = cfreach.len();
            let sigma = tables[actor.index()].average_strategy(node_id, na);
            let mut node_values = vec![0.0; num_hands];
            for (a, &child) in children.iter().enumerate() {
                let row = &sigma[a * opp_hands..(a + 1) * opp_hands];
                let next_cf: Vec<f64> = cfreach.iter().zip(row).map(|(&c, &s)| c * s).collect();
                let vals = average_values(view, child, player, tables, &next_cf);
                for h in 0..num_hands {
                    node_values[h] += vals[h];
                }
            }
            node_values
        }
    }
}

/// Shared chance-node logic for the read-only traversals: recurse per
/// card in parallel with masked, rescaled reach, then sum each hand's
/// values over the cards it can coexist with.
fn chance_values<F>(
    view: &SolveView,
    cards: &[Card],
    children: &[u32],
    player: Player,
    chance_factor: f64,
    cfreach: &[f64],
    recurse: F,
) -> Vec<f64>
where
    F: Fn(u32, &[f64]) -> Vec<f64> + Sync,
{
    let scale = 1.0 / chance_factor;
    let own_hands = &view.spot.hands[player.index()];
    let opp_hands = &view.spot.hands[player.opponent().index()];

    let per_card: Vec<(u64, Vec<f64>)> = (0..children.len())
        .into_par_iter()
        .map(|i| {
            let mask = cards[i].mask();
            let cf: Vec<f64> = cfreach
                .iter()
                .zip(opp_hands)
                .map(|(&c, hand)| {
                    if hand.conflicts_with(mask) {
                        0.0
                    } else {
                        c * scale
                    }
                })
                .collect();
            (mask, recurse(children[i], &cf))
        })
        .collect();

    let mut node_values = vec![0.0; own_hands.len()];
    for (mask, vals) in per_card {
        for (h, hand) in own_hands.iter().enumerate() {
            if !hand.conflicts_with(mask) {
                node_values[h] += vals[h];
            }
        }
    }
    node_values
}

// ---------------------------------------------------------------------------
// Solution summary
// ---------------------------------------------------------------------------

/// Everything the CLI reports about a finished solve, serializable for
/// `--json` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSummary {
    pub board: String,
    pub oop_range: String,
    pub ip_range: String,
    pub starting_pot: i32,
    pub effective_stack: i32,
    pub iterations: u32,
    pub exploitability: f64,
    pub target_exploitability: f64,
    pub root_actions: Vec<String>,
    pub root_frequencies: Vec<f64>,
}

impl SolutionSummary {
    pub fn to_json(&self) -> SolverResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::SpotConfig;

    fn river_game() -> PostflopGame {
        PostflopGame::new(SpotConfig {
            oop_range: "AA,KK".into(),
            ip_range: "QQ,JJ".into(),
            flop: "2c7d9h".into(),
            turn: Some("As".into()),
            river: Some("Kd".into()),
            starting_pot: 100,
            effective_stack: 400,
            bet_sizes: "50%".into(),
            raise_sizes: "3x".into(),
        })
        .unwrap()
    }

    #[test]
    fn river_solve_approaches_equilibrium() {
        let mut game = river_game();
        let initial = compute_exploitability(&game);
        let achieved = solve(&mut game, 300, 0.0);
        assert!(
            achieved < initial,
            "exploitability should drop from {} (got {})",
            initial,
            achieved
        );
        assert!(achieved < 1.0, "river spot should solve tightly: {}", achieved);
    }

    #[test]
    fn average_values_conserve_the_pot() {
        let mut game = river_game();
        solve(&mut game, 100, 0.0);

        let view = SolveView {
            tree: game.tree(),
            spot: game.spot(),
        };
        let tables = game.tables();
        let mut aggregate = 0.0;
        for player in [Player::Oop, Player::Ip] {
            let own = &view.spot.initial_weights[player.index()];
            let opp = &view.spot.initial_weights[player.opponent().index()];
            let vals = average_values(&view, 0, player, tables, opp);
            let total: f64 = own.iter().zip(&vals).map(|(w, v)| w * v).sum();
            aggregate += total / view.spot.num_combinations;
        }
        let pot = f64::from(game.tree().config.starting_pot);
        assert!(
            (aggregate - pot).abs() < 1e-6,
            "players' average values must split the pot: {} vs {}",
            aggregate,
            pot
        );
    }

    #[test]
    fn cancelled_solve_stops_immediately() {
        let mut game = river_game();
        let flag = Arc::new(AtomicBool::new(true));
        let options = SolveOptions {
            max_iterations: 1000,
            cancel: Some(Arc::clone(&flag)),
            ..SolveOptions::default()
        };
        let stats = solve_with_options(&mut game, &options);
        assert_eq!(stats.iterations, 0);
        assert!(stats.exploitability.is_finite());
    }

    #[test]
    fn solve_converged_reports_a_missed_target() {
        let mut game = river_game();
        let err = solve_converged(&mut game, 1, 1e-9).unwrap_err();
        match err {
            SolverError::DidNotConverge { exploitability, target } => {
                assert!(exploitability > target);
            }
            other => panic!("expected DidNotConverge, got {:?}", other),
        }
    }
}
