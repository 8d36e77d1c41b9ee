//! Flat CFR+ tables.
//!
//! One `FlatTables` per player holds cumulative regrets and the
//! weighted strategy sum for every decision node that player acts at,
//! in two parallel `f32` arrays. Rows are laid out action-major per
//! node, `index = offset(node) + action * num_hands + hand`, and nodes
//! appear in tree order, so a subtree's rows form one contiguous range.

use crate::tree::{GameTree, Player};

#[derive(Debug)]
pub struct FlatTables {
    regrets: Vec<f32>,
    cum_strategy: Vec<f32>,
    /// Row start per node id, with one trailing entry for the total
    /// size. Nodes the player does not act at occupy zero width.
    offsets: Vec<u32>,
    num_hands: usize,
}

impl FlatTables {
    pub fn new(tree: &GameTree, player: Player, num_hands: usize) -> FlatTables {
        let mut offsets = Vec::with_capacity(tree.node_count() + 1);
        let mut total = 0u32;
        for node in tree.nodes() {
            offsets.push(total);
            if node.player() == Some(player) {
                total += (node.actions().len() * num_hands) as u32;
            }
        }
        offsets.push(total);
        FlatTables {
            regrets: vec![0.0; total as usize],
            cum_strategy: vec![0.0; total as usize],
            offsets,
            num_hands,
        }
    }

    pub fn num_hands(&self) -> usize {
        self.num_hands
    }

    pub fn offset(&self, node: u32) -> usize {
        self.offsets[node as usize] as usize
    }

    pub fn entries(&self) -> usize {
        self.regrets.len()
    }

    pub fn memory_bytes(&self) -> usize {
        (self.regrets.len() + self.cum_strategy.len() + self.offsets.len())
            * std::mem::size_of::<f32>()
    }

    /// Regret-matched strategy at a node, action-major over all hands.
    pub fn current_strategy(&self, node: u32, num_actions: usize) -> Vec<f64> {
        let start = self.offset(node);
        matched_strategy(
            &self.regrets[start..start + num_actions * self.num_hands],
            num_actions,
            self.num_hands,
        )
    }

    /// Normalized average strategy at a node, uniform where a hand has
    /// accumulated no weight.
    pub fn average_strategy(&self, node: u32, num_actions: usize) -> Vec<f64> {
        let start = self.offset(node);
        let rows = &self.cum_strategy[start..start + num_actions * self.num_hands];
        let mut strategy: Vec<f64> = rows.iter().map(|&x| f64::from(x)).collect();
        normalize_rows(&mut strategy, num_actions, self.num_hands);
        strategy
    }

    /// Splits the tables for a solve pass: mutable regret and strategy
    /// arrays plus the shared offset index into them.
    pub(crate) fn parts_mut(&mut self) -> (&mut [f32], &mut [f32], &[u32]) {
        (&mut self.regrets, &mut self.cum_strategy, &self.offsets)
    }
}

/// Regret matching over a node's raw regret rows: positive parts
/// normalized per hand, uniform where no action has positive regret.
pub(crate) fn matched_strategy(regrets: &[f32], num_actions: usize, num_hands: usize) -> Vec<f64> {
    debug_assert_eq!(regrets.len(), num_actions * num_hands);
    let mut strategy: Vec<f64> = regrets
        .iter()
        .map(|&r| f64::from(r.max(0.0)))
        .collect();
    normalize_rows(&mut strategy, num_actions, num_hands);
    strategy
}

fn normalize_rows(strategy: &mut [f64], num_actions: usize, num_hands: usize) {
    let uniform = 1.0 / num_actions as f64;
    for h in 0..num_hands {
        let mut total = 0.0;
        for a in 0..num_actions {
            total += strategy[a * num_hands + h];
        }
        if total > 0.0 {
            for a in 0..num_actions {
                strategy[a * num_hands + h] /= total;
            }
        } else {
            for a in 0..num_actions {
                strategy[a * num_hands + h] = uniform;
            }
        }
    }
}

/// CFR+ update for one node's rows inside the traverser's table slices.
///
/// Regrets accumulate `action_value - node_value` and floor at zero;
/// the strategy sum accumulates the played mix weighted by the hand's
/// own reach and the linear iteration weight.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_update(
    reg: &mut [f32],
    cum: &mut [f32],
    sigma: &[f64],
    action_values: &[f64],
    node_values: &[f64],
    own_reach: &[f64],
    weight: f64,
    num_actions: usize,
    num_hands: usize,
) {
    debug_assert_eq!(reg.len(), num_actions * num_hands);
    for a in 0..num_actions {
        let row = a * num_hands;
        for h in 0..num_hands {
            let i = row + h;
            let regret = f64::from(reg[i]) + action_values[i] - node_values[h];
            reg[i] = regret.max(0.0) as f32;
            cum[i] += (weight * own_reach[h] * sigma[i]) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bet_size::BetSizeOptions;
    use crate::cards::parse_board;
    use crate::tree::TreeConfig;
    use approx::assert_relative_eq;

    fn small_tree() -> GameTree {
        let cards = parse_board("2c7d9hAsKd").unwrap();
        GameTree::build(TreeConfig {
            flop: [cards[0], cards[1], cards[2]],
            turn: Some(cards[3]),
            river: Some(cards[4]),
            starting_pot: 100,
            effective_stack: 400,
            sizes: BetSizeOptions::try_from_specs("50%", "3x").unwrap(),
        })
    }

    #[test]
    fn offsets_partition_by_player() {
        let tree = small_tree();
        let oop = FlatTables::new(&tree, Player::Oop, 3);
        let ip = FlatTables::new(&tree, Player::Ip, 5);

        for (id, node) in tree.nodes().iter().enumerate() {
            let id = id as u32;
            let oop_width = oop.offset(id + 1) - oop.offset(id);
            let ip_width = ip.offset(id + 1) - ip.offset(id);
            match node.player() {
                Some(Player::Oop) => {
                    assert_eq!(oop_width, node.actions().len() * 3);
                    assert_eq!(ip_width, 0);
                }
                Some(Player::Ip) => {
                    assert_eq!(oop_width, 0);
                    assert_eq!(ip_width, node.actions().len() * 5);
                }
                None => {
                    assert_eq!(oop_width, 0);
                    assert_eq!(ip_width, 0);
                }
            }
        }
        assert_eq!(oop.offset(tree.node_count() as u32), oop.entries());
        assert_eq!(ip.offset(tree.node_count() as u32), ip.entries());
    }

    #[test]
    fn fresh_tables_give_uniform_strategy() {
        let tree = small_tree();
        let tables = FlatTables::new(&tree, Player::Oop, 4);
        let actions = tree.root().actions().len();
        let strategy = tables.current_strategy(0, actions);
        for &p in &strategy {
            assert_relative_eq!(p, 1.0 / actions as f64, epsilon = 1e-12);
        }
        let average = tables.average_strategy(0, actions);
        for &p in &average {
            assert_relative_eq!(p, 1.0 / actions as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn matched_strategy_ignores_negative_regret() {
        // Two actions, two hands: hand 0 prefers action 1, hand 1 has
        // no positive regret anywhere.
        let regrets = [-3.0f32, -1.0, 6.0, -2.0];
        let sigma = matched_strategy(&regrets, 2, 2);
        assert_relative_eq!(sigma[0], 0.0, epsilon = 1e-12); // a0 h0
        assert_relative_eq!(sigma[2], 1.0, epsilon = 1e-12); // a1 h0
        assert_relative_eq!(sigma[1], 0.5, epsilon = 1e-12); // a0 h1
        assert_relative_eq!(sigma[3], 0.5, epsilon = 1e-12); // a1 h1
    }

    #[test]
    fn matched_strategy_mixes_proportionally() {
        let regrets = [1.0f32, 0.0, 3.0, 0.0];
        let sigma = matched_strategy(&regrets, 2, 2);
        assert_relative_eq!(sigma[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(sigma[2], 0.75, epsilon = 1e-12);
    }

    #[test]
    fn apply_update_floors_regrets_at_zero() {
        let mut reg = vec![0.5f32, 0.0];
        let mut cum = vec![0.0f32, 0.0];
        let sigma = [1.0, 0.0];
        // Action 0 underperforms the node value for hand 0.
        let action_values = [-2.0, 1.0];
        let node_values = [0.0];

        apply_update(
            &mut reg,
            &mut cum,
            &sigma,
            &action_values,
            &node_values,
            &[1.0],
            1.0,
            2,
            1,
        );
        assert_eq!(reg[0], 0.0, "0.5 - 2.0 floors at zero");
        assert_eq!(reg[1], 1.0);
        assert_relative_eq!(f64::from(cum[0]), 1.0, epsilon = 1e-6);
        assert_relative_eq!(f64::from(cum[1]), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn strategy_sum_weights_by_reach_and_iteration() {
        let mut reg = vec![0.0f32; 2];
        let mut cum = vec![0.0f32; 2];
        let sigma = [0.25, 0.75];
        apply_update(
            &mut reg,
            &mut cum,
            &sigma,
            &[0.0, 0.0],
            &[0.0],
            &[0.5],
            8.0,
            2,
            1,
        );
        assert_relative_eq!(f64::from(cum[0]), 8.0 * 0.5 * 0.25, epsilon = 1e-6);
        assert_relative_eq!(f64::from(cum[1]), 8.0 * 0.5 * 0.75, epsilon = 1e-6);
    }
}
