//! Heads-up postflop game tree.
//!
//! Nodes live in a single arena `Vec` in depth-first order with `u32`
//! child indices, so every subtree is a contiguous index range. That
//! contiguity is what lets the solver hand disjoint strategy-table
//! slices to parallel workers.

use std::fmt;

use crate::bet_size::{BetSize, BetSizeOptions};
use crate::cards::Card;
use crate::error::SolverError;

/// The two seats. OOP acts first on every street.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Player {
    Oop,
    Ip,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::Oop => Player::Ip,
            Player::Ip => Player::Oop,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Player::Oop => 0,
            Player::Ip => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Oop => write!(f, "OOP"),
            Player::Ip => write!(f, "IP"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Street {
    Flop,
    Turn,
    River,
}

impl Street {
    pub fn next(self) -> Street {
        match self {
            Street::Flop => Street::Turn,
            Street::Turn => Street::River,
            Street::River => Street::River,
        }
    }

    /// Cards the next deal is drawn from once both hole-card pairs are
    /// fixed: 52 minus the board minus four hole cards. 45 when a flop
    /// street deals the turn, 44 when a turn street deals the river.
    pub fn chance_factor(self) -> f64 {
        match self {
            Street::Flop => 45.0,
            Street::Turn => 44.0,
            Street::River => 1.0,
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Street::Flop => write!(f, "flop"),
            Street::Turn => write!(f, "turn"),
            Street::River => write!(f, "river"),
        }
    }
}

/// A legal move at a decision node. Bet/raise amounts are street
/// bet-to totals in chips, not deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fold,
    Check,
    Call,
    Bet(i32),
    Raise(i32),
    AllIn(i32),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Fold => write!(f, "Fold"),
            Action::Check => write!(f, "Check"),
            Action::Call => write!(f, "Call"),
            Action::Bet(amount) => write!(f, "Bet {}", amount),
            Action::Raise(amount) => write!(f, "Raise {}", amount),
            Action::AllIn(amount) => write!(f, "All-in {}", amount),
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Decision {
        player: Player,
        actions: Vec<Action>,
        children: Vec<u32>,
    },
    Chance {
        cards: Vec<Card>,
        children: Vec<u32>,
    },
    TerminalFold {
        folder: Player,
    },
    /// Showdown with whatever the node's board state is. If the turn or
    /// river is still undealt here (both players all-in), the evaluator
    /// averages over the remaining runouts.
    TerminalShowdown,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub street: Street,
    /// Chips each player has committed since the tree root.
    pub invested: [i32; 2],
    pub turn: Option<Card>,
    pub river: Option<Card>,
    /// One past the last arena index of this node's subtree.
    pub subtree_end: u32,
}

impl Node {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::TerminalFold { .. } | NodeKind::TerminalShowdown
        )
    }

    pub fn is_chance(&self) -> bool {
        matches!(self.kind, NodeKind::Chance { .. })
    }

    pub fn player(&self) -> Option<Player> {
        match self.kind {
            NodeKind::Decision { player, .. } => Some(player),
            _ => None,
        }
    }

    pub fn actions(&self) -> &[Action] {
        match &self.kind {
            NodeKind::Decision { actions, .. } => actions,
            _ => &[],
        }
    }

    pub fn children(&self) -> &[u32] {
        match &self.kind {
            NodeKind::Decision { children, .. } | NodeKind::Chance { children, .. } => children,
            _ => &[],
        }
    }

    pub fn chance_cards(&self) -> &[Card] {
        match &self.kind {
            NodeKind::Chance { cards, .. } => cards,
            _ => &[],
        }
    }
}

/// Everything the builder needs to lay out a tree. Board cards beyond
/// the flop shrink the tree to later streets.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub flop: [Card; 3],
    pub turn: Option<Card>,
    pub river: Option<Card>,
    pub starting_pot: i32,
    pub effective_stack: i32,
    pub sizes: BetSizeOptions,
}

/// Node counts by kind, for reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeStats {
    pub decision_nodes: usize,
    pub chance_nodes: usize,
    pub fold_terminals: usize,
    pub showdown_terminals: usize,
}

#[derive(Debug)]
pub struct GameTree {
    pub config: TreeConfig,
    nodes: Vec<Node>,
}

impl GameTree {
    pub fn build(config: TreeConfig) -> GameTree {
        let street = if config.river.is_some() {
            Street::River
        } else if config.turn.is_some() {
            Street::Turn
        } else {
            Street::Flop
        };
        let state = BuildState {
            street,
            to_act: Player::Oop,
            invested: [0, 0],
            street_bets: [0, 0],
            last_raise: 0,
            opener_checked: false,
            turn: config.turn,
            river: config.river,
        };
        let nodes = {
            let mut builder = TreeBuilder {
                config: &config,
                nodes: Vec::new(),
            };
            builder.build_decision(state);
            builder.nodes
        };
        GameTree { config, nodes }
    }

    pub fn node(&self, id: u32) -> &Node {
        &self.nodes[id as usize]
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Live pot at a node: starting pot plus both players' commitments.
    pub fn pot(&self, node: &Node) -> i32 {
        self.config.starting_pot + node.invested[0] + node.invested[1]
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        for node in &self.nodes {
            match node.kind {
                NodeKind::Decision { .. } => stats.decision_nodes += 1,
                NodeKind::Chance { .. } => stats.chance_nodes += 1,
                NodeKind::TerminalFold { .. } => stats.fold_terminals += 1,
                NodeKind::TerminalShowdown => stats.showdown_terminals += 1,
            }
        }
        stats
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Betting state threaded through the recursive build. `street_bets`
/// are the bet-to totals of the current street; `last_raise` is the
/// size of the latest raise increment, which sets the min-raise floor.
#[derive(Debug, Clone, Copy)]
struct BuildState {
    street: Street,
    to_act: Player,
    invested: [i32; 2],
    street_bets: [i32; 2],
    last_raise: i32,
    opener_checked: bool,
    turn: Option<Card>,
    river: Option<Card>,
}

struct TreeBuilder<'a> {
    config: &'a TreeConfig,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build_decision(&mut self, st: BuildState) -> u32 {
        let id = self.push_leaf(&st, NodeKind::TerminalShowdown); // placeholder
        let actions = self.compute_actions(&st);
        let mut children = Vec::with_capacity(actions.len());
        for &action in &actions {
            children.push(self.apply_action(&st, action));
        }
        let end = self.nodes.len() as u32;
        self.nodes[id as usize] = Node {
            kind: NodeKind::Decision {
                player: st.to_act,
                actions,
                children,
            },
            street: st.street,
            invested: st.invested,
            turn: st.turn,
            river: st.river,
            subtree_end: end,
        };
        id
    }

    fn apply_action(&mut self, st: &BuildState, action: Action) -> u32 {
        let p = st.to_act.index();
        let opp = st.to_act.opponent().index();
        match action {
            Action::Fold => self.push_leaf(st, NodeKind::TerminalFold { folder: st.to_act }),
            Action::Check => {
                if st.opener_checked {
                    self.close_street(st)
                } else {
                    let mut next = *st;
                    next.opener_checked = true;
                    next.to_act = st.to_act.opponent();
                    self.build_decision(next)
                }
            }
            Action::Call => {
                let to_call = st.street_bets[opp] - st.street_bets[p];
                let mut next = *st;
                next.invested[p] += to_call;
                next.street_bets[p] += to_call;
                self.close_street(&next)
            }
            Action::Bet(to) | Action::Raise(to) | Action::AllIn(to) => {
                let mut next = *st;
                next.invested[p] += to - st.street_bets[p];
                next.last_raise = to - st.street_bets[opp];
                next.street_bets[p] = to;
                next.to_act = st.to_act.opponent();
                self.build_decision(next)
            }
        }
    }

    /// A closed betting round ends the game at showdown on the river,
    /// skips straight to a runout showdown when both stacks are in, and
    /// otherwise deals the next street.
    fn close_street(&mut self, st: &BuildState) -> u32 {
        if st.street == Street::River {
            return self.push_leaf(st, NodeKind::TerminalShowdown);
        }
        let stack = self.config.effective_stack;
        if st.invested[0] >= stack && st.invested[1] >= stack {
            return self.push_leaf(st, NodeKind::TerminalShowdown);
        }
        self.build_chance(st)
    }

    fn build_chance(&mut self, st: &BuildState) -> u32 {
        let id = self.push_leaf(st, NodeKind::TerminalShowdown); // placeholder
        let dealt = self.board_mask(st);
        let cards: Vec<Card> = (0..52)
            .filter(|&i| dealt & (1u64 << i) == 0)
            .map(Card::from_index)
            .collect();
        let next_street = st.street.next();
        let mut children = Vec::with_capacity(cards.len());
        for &card in &cards {
            let mut next = *st;
            next.street = next_street;
            next.to_act = Player::Oop;
            next.street_bets = [0, 0];
            next.last_raise = 0;
            next.opener_checked = false;
            match next_street {
                Street::Turn => next.turn = Some(card),
                _ => next.river = Some(card),
            }
            children.push(self.build_decision(next));
        }
        let end = self.nodes.len() as u32;
        self.nodes[id as usize] = Node {
            kind: NodeKind::Chance { cards, children },
            street: st.street,
            invested: st.invested,
            turn: st.turn,
            river: st.river,
            subtree_end: end,
        };
        id
    }

    fn push_leaf(&mut self, st: &BuildState, kind: NodeKind) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(Node {
            kind,
            street: st.street,
            invested: st.invested,
            turn: st.turn,
            river: st.river,
            subtree_end: id + 1,
        });
        id
    }

    fn board_mask(&self, st: &BuildState) -> u64 {
        let mut mask = 0u64;
        for card in self.config.flop {
            mask |= card.mask();
        }
        if let Some(card) = st.turn {
            mask |= card.mask();
        }
        if let Some(card) = st.river {
            mask |= card.mask();
        }
        mask
    }

    /// Legal actions in a fixed order: the parity action first, then
    /// bets or raises ascending by bet-to amount, all-in last. Amounts
    /// are deduplicated after rounding; anything at or past the
    /// remaining stack becomes all-in.
    fn compute_actions(&self, st: &BuildState) -> Vec<Action> {
        let p = st.to_act.index();
        let opp = st.to_act.opponent().index();
        let to_call = st.street_bets[opp] - st.street_bets[p];
        let remaining = self.config.effective_stack - st.invested[p];
        let pot = self.config.starting_pot + st.invested[0] + st.invested[1];
        debug_assert!(to_call >= 0 && remaining >= to_call);

        let mut actions = Vec::new();
        let mut amounts: Vec<i32> = Vec::new();
        let all_in_to = st.street_bets[p] + remaining;

        if to_call == 0 {
            actions.push(Action::Check);
            if remaining > 0 {
                for &size in &self.config.sizes.bet {
                    let to = match size {
                        BetSize::PotPercent(pct) => (f64::from(pot) * pct).round() as i32,
                        BetSize::AllIn => all_in_to,
                        // No bet to multiply in an unopened pot.
                        BetSize::LastBetMultiple(_) => continue,
                    };
                    amounts.push(clamp_to_all_in(to.max(1), all_in_to));
                }
            }
        } else {
            actions.push(Action::Fold);
            actions.push(Action::Call);
            if remaining > to_call {
                let pot_after_call = pot + to_call;
                let min_raise_to = st.street_bets[opp] + st.last_raise.max(1);
                for &size in &self.config.sizes.raise {
                    let to = match size {
                        BetSize::PotPercent(pct) => {
                            st.street_bets[opp] + (f64::from(pot_after_call) * pct).round() as i32
                        }
                        BetSize::LastBetMultiple(mult) => {
                            (f64::from(st.street_bets[opp]) * mult).round() as i32
                        }
                        BetSize::AllIn => all_in_to,
                    };
                    amounts.push(clamp_to_all_in(to.max(min_raise_to), all_in_to));
                }
            }
        }

        amounts.sort_unstable();
        amounts.dedup();
        for &to in &amounts {
            let action = if to == all_in_to {
                Action::AllIn(to)
            } else if to_call == 0 {
                Action::Bet(to)
            } else {
                Action::Raise(to)
            };
            actions.push(action);
        }
        actions
    }
}

fn clamp_to_all_in(to: i32, all_in_to: i32) -> i32 {
    if to > all_in_to {
        log::warn!(
            "{}",
            SolverError::StackExhausted {
                requested: to,
                stack: all_in_to,
            }
        );
        all_in_to
    } else {
        to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_board;

    fn config(
        board: &str,
        pot: i32,
        stack: i32,
        bet: &str,
        raise: &str,
    ) -> TreeConfig {
        let cards = parse_board(board).unwrap();
        TreeConfig {
            flop: [cards[0], cards[1], cards[2]],
            turn: cards.get(3).copied(),
            river: cards.get(4).copied(),
            starting_pot: pot,
            effective_stack: stack,
            sizes: BetSizeOptions::try_from_specs(bet, raise).unwrap(),
        }
    }

    fn child_by_action(tree: &GameTree, id: u32, wanted: Action) -> u32 {
        let node = tree.node(id);
        let pos = node
            .actions()
            .iter()
            .position(|&a| a == wanted)
            .unwrap_or_else(|| panic!("action {:?} not at node {}", wanted, id));
        node.children()[pos]
    }

    #[test]
    fn root_actions_for_flop_spot() {
        let tree = GameTree::build(config("2c7d9h", 100, 400, "50%, a", "3x"));
        assert_eq!(
            tree.root().actions(),
            &[Action::Check, Action::Bet(50), Action::AllIn(400)]
        );
        assert_eq!(tree.root().player(), Some(Player::Oop));
    }

    #[test]
    fn raise_ladder_clamps_to_all_in() {
        let tree = GameTree::build(config("2c7d9h", 100, 400, "50%, a", "3x"));
        // OOP bets 50, IP raises to 150, OOP's 3x re-raise would be 450.
        let bet = child_by_action(&tree, 0, Action::Bet(50));
        assert_eq!(
            tree.node(bet).actions(),
            &[Action::Fold, Action::Call, Action::Raise(150)]
        );
        let raise = child_by_action(&tree, bet, Action::Raise(150));
        assert_eq!(
            tree.node(raise).actions(),
            &[Action::Fold, Action::Call, Action::AllIn(400)],
            "3x of 150 exceeds the 400 stack and must clamp to all-in"
        );
        // Facing the all-in, calling is the only aggressive option left.
        let shove = child_by_action(&tree, raise, Action::AllIn(400));
        assert_eq!(tree.node(shove).actions(), &[Action::Fold, Action::Call]);
    }

    #[test]
    fn all_in_call_collapses_runouts() {
        let tree = GameTree::build(config("2c7d9h", 100, 400, "a", ""));
        let shove = child_by_action(&tree, 0, Action::AllIn(400));
        let call = child_by_action(&tree, shove, Action::Call);
        let node = tree.node(call);
        assert!(matches!(node.kind, NodeKind::TerminalShowdown));
        assert_eq!(node.street, Street::Flop);
        assert_eq!(node.invested, [400, 400]);
        assert!(node.turn.is_none() && node.river.is_none());
    }

    #[test]
    fn oversized_bet_becomes_all_in_and_dedupes() {
        let tree = GameTree::build(config("2c7d9h", 100, 120, "150%, a", ""));
        // 150% of 100 is 150, past the 120 stack: merges with the shove.
        assert_eq!(
            tree.root().actions(),
            &[Action::Check, Action::AllIn(120)]
        );
    }

    #[test]
    fn min_raise_floor_applies() {
        // Tiny pot-percent raise gets bumped to the min-raise amount.
        let tree = GameTree::build(config("2c7d9h", 100, 400, "100%", "10%"));
        let bet = child_by_action(&tree, 0, Action::Bet(100));
        // Facing a 100 bet, 10% of the 300 called pot raises by 30 to
        // 130, below the min-raise floor of 200.
        assert_eq!(
            tree.node(bet).actions(),
            &[Action::Fold, Action::Call, Action::Raise(200)]
        );
    }

    #[test]
    fn check_check_reaches_chance_with_49_cards() {
        let tree = GameTree::build(config("2c7d9h", 100, 400, "", ""));
        assert_eq!(tree.root().actions(), &[Action::Check]);
        let ip = child_by_action(&tree, 0, Action::Check);
        assert_eq!(tree.node(ip).actions(), &[Action::Check]);
        let chance = child_by_action(&tree, ip, Action::Check);
        let node = tree.node(chance);
        match &node.kind {
            NodeKind::Chance { cards, children } => {
                assert_eq!(cards.len(), 49);
                assert_eq!(children.len(), 49);
                let flop = parse_board("2c7d9h").unwrap();
                assert!(cards.iter().all(|c| !flop.contains(c)));
            }
            other => panic!("expected chance node, got {:?}", other),
        }
        // Turn chance nodes deal from 45 unseen cards, rivers from 44.
        assert_eq!(node.street.chance_factor(), 45.0);
    }

    #[test]
    fn river_start_has_no_chance_nodes() {
        let tree = GameTree::build(config("2c7d9hAsKd", 100, 400, "50%", "3x"));
        assert_eq!(tree.root().street, Street::River);
        let stats = tree.stats();
        assert_eq!(stats.chance_nodes, 0);
        assert!(stats.showdown_terminals > 0);
    }

    #[test]
    fn fold_terminal_records_folder_and_invested() {
        let tree = GameTree::build(config("2c7d9hAsKd", 100, 400, "50%", ""));
        let bet = child_by_action(&tree, 0, Action::Bet(50));
        let fold = child_by_action(&tree, bet, Action::Fold);
        let node = tree.node(fold);
        match node.kind {
            NodeKind::TerminalFold { folder } => assert_eq!(folder, Player::Ip),
            ref other => panic!("expected fold terminal, got {:?}", other),
        }
        assert_eq!(node.invested, [50, 0]);
        assert_eq!(tree.pot(node), 150);
    }

    #[test]
    fn bet_rounding_keeps_min_chip() {
        // 10% of a 3-chip pot rounds to 0; the bet floors at one chip.
        let tree = GameTree::build(config("2c7d9hAsKd", 3, 400, "10%", ""));
        assert_eq!(
            tree.root().actions(),
            &[Action::Check, Action::Bet(1)]
        );
    }

    #[test]
    fn subtree_ranges_nest() {
        let tree = GameTree::build(config("2c7d9hAs", 100, 150, "50%, a", "3x, a"));
        assert_eq!(tree.root().subtree_end as usize, tree.node_count());
        for (id, node) in tree.nodes().iter().enumerate() {
            let id = id as u32;
            assert!(node.subtree_end > id);
            let mut cursor = id + 1;
            for &child in node.children() {
                assert_eq!(child, cursor, "children are laid out depth-first");
                cursor = tree.node(child).subtree_end;
            }
            if !node.children().is_empty() {
                assert_eq!(cursor, node.subtree_end);
            }
        }
    }

    #[test]
    fn turn_start_deals_only_river() {
        let tree = GameTree::build(config("2c7d9hAs", 100, 400, "", ""));
        assert_eq!(tree.root().street, Street::Turn);
        let ip = child_by_action(&tree, 0, Action::Check);
        let chance = child_by_action(&tree, ip, Action::Check);
        match &tree.node(chance).kind {
            NodeKind::Chance { cards, .. } => assert_eq!(cards.len(), 48),
            other => panic!("expected chance node, got {:?}", other),
        }
        assert!(tree
            .node(chance)
            .children()
            .iter()
            .all(|&c| tree.node(c).street == Street::River));
        // The dealt card lands in the node's river slot.
        let deal = tree.node(chance).children()[0];
        assert!(tree.node(deal).river.is_some());
    }
}
