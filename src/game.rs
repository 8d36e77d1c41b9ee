//! Postflop spot construction, terminal evaluation and the query API.
//!
//! `PostflopGame` owns everything a solve needs: the validated ranges,
//! the action tree, per-player CFR tables and a navigable cursor over
//! the tree. Terminal payoffs never enumerate hand-vs-hand matchups
//! directly; showdowns are scored once per runout into sorted strength
//! tables, and evaluation walks them with an inclusion-exclusion trick
//! so each call costs O(hands + 52) instead of O(hands²).

use rayon::prelude::*;

use crate::bet_size::BetSizeOptions;
use crate::cards::{board_mask, parse_board, parse_card, Card};
use crate::cfr::FlatTables;
use crate::error::{SolverError, SolverResult};
use crate::hand_eval::score_hand;
use crate::range::{parse_range, Range, StartingHand};
use crate::solver::{self, SolveView};
use crate::tree::{Action, GameTree, Node, NodeKind, Player, TreeConfig};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Raw inputs for one heads-up postflop spot. Everything arrives as
/// strings so the CLI and any embedding layer share one validation
/// path in [`PostflopGame::new`].
#[derive(Debug, Clone, Default)]
pub struct SpotConfig {
    pub oop_range: String,
    pub ip_range: String,
    /// Exactly three cards, e.g. `"2c7d9h"`.
    pub flop: String,
    pub turn: Option<String>,
    pub river: Option<String>,
    pub starting_pot: i32,
    pub effective_stack: i32,
    /// Comma-separated sizing spec for bets, e.g. `"50%,a"`.
    pub bet_sizes: String,
    /// Comma-separated sizing spec for raises, e.g. `"3x,a"`.
    pub raise_sizes: String,
}

// ---------------------------------------------------------------------------
// Precomputed spot data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct StrengthItem {
    score: u32,
    hand: u16,
}

/// Both players' range hands scored against one full five-card board,
/// sorted ascending by strength.
#[derive(Debug)]
struct ShowdownTable {
    sorted: [Vec<StrengthItem>; 2],
}

/// Everything about the spot that never changes during solving.
#[derive(Debug)]
pub(crate) struct Spot {
    pub hands: [Vec<StartingHand>; 2],
    pub initial_weights: [Vec<f64>; 2],
    /// Card indices of each hand, for per-card mass accumulation.
    hole_cards: [Vec<(u8, u8)>; 2],
    /// Index of the identical combo in the opponent's list, or
    /// `u16::MAX` when the opponent's range lacks it.
    same_hand_index: [Vec<u16>; 2],
    /// Cards on the board at the tree root (three to five).
    pub board: Vec<Card>,
    pub board_mask: u64,
    pub starting_pot: i32,
    /// Sum of `w_oop[i] * w_ip[j]` over card-disjoint hand pairs;
    /// normalizes aggregate values to per-deal chips.
    pub num_combinations: f64,
    showdowns: Vec<ShowdownTable>,
    /// `(min card index, max card index)` pair -> showdown table id.
    runout_index: Vec<u32>,
}

impl Spot {
    fn new(board: Vec<Card>, oop: Range, ip: Range, starting_pot: i32) -> SolverResult<Spot> {
        let mut hands: [Vec<StartingHand>; 2] = [Vec::new(), Vec::new()];
        let mut initial_weights: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
        let mut hole_cards: [Vec<(u8, u8)>; 2] = [Vec::new(), Vec::new()];
        for (p, range) in [oop, ip].iter().enumerate() {
            for &(hand, weight) in range.entries() {
                hands[p].push(hand);
                initial_weights[p].push(weight);
                hole_cards[p].push((hand.0.index() as u8, hand.1.index() as u8));
            }
        }

        let mut same_hand_index = [
            vec![u16::MAX; hands[0].len()],
            vec![u16::MAX; hands[1].len()],
        ];
        for (i, a) in hands[0].iter().enumerate() {
            for (j, b) in hands[1].iter().enumerate() {
                if a.mask() == b.mask() {
                    same_hand_index[0][i] = j as u16;
                    same_hand_index[1][j] = i as u16;
                }
            }
        }

        let mut num_combinations = 0.0;
        for (i, a) in hands[0].iter().enumerate() {
            for (j, b) in hands[1].iter().enumerate() {
                if a.mask() & b.mask() == 0 {
                    num_combinations += initial_weights[0][i] * initial_weights[1][j];
                }
            }
        }
        if num_combinations <= 0.0 {
            return Err(SolverError::InvalidConfig(
                "ranges have no card-disjoint hand combinations".into(),
            ));
        }

        let bmask = board_mask(&board);
        let mut runouts: Vec<(Card, Card)> = Vec::new();
        match board.len() {
            5 => runouts.push((board[3], board[4])),
            4 => {
                for idx in 0..52 {
                    let river = Card::from_index(idx);
                    if river.mask() & bmask == 0 {
                        runouts.push((board[3], river));
                    }
                }
            }
            _ => {
                for a in 0..52 {
                    let turn = Card::from_index(a);
                    if turn.mask() & bmask != 0 {
                        continue;
                    }
                    for b in a + 1..52 {
                        let river = Card::from_index(b);
                        if river.mask() & bmask == 0 {
                            runouts.push((turn, river));
                        }
                    }
                }
            }
        }

        let flop = [board[0], board[1], board[2]];
        let showdowns: Vec<ShowdownTable> = runouts
            .par_iter()
            .map(|&(turn, river)| Spot::score_runout(&hands, flop, turn, river))
            .collect();
        let mut runout_index = vec![u32::MAX; 52 * 52];
        for (id, &(turn, river)) in runouts.iter().enumerate() {
            let a = turn.index().min(river.index());
            let b = turn.index().max(river.index());
            runout_index[a * 52 + b] = id as u32;
        }

        Ok(Spot {
            hands,
            initial_weights,
            hole_cards,
            same_hand_index,
            board_mask: bmask,
            board,
            starting_pot,
            num_combinations,
            showdowns,
            runout_index,
        })
    }

    fn score_runout(
        hands: &[Vec<StartingHand>; 2],
        flop: [Card; 3],
        turn: Card,
        river: Card,
    ) -> ShowdownTable {
        let board = [flop[0], flop[1], flop[2], turn, river];
        let mask = board_mask(&board);
        let sorted = [0, 1].map(|p| {
            let mut items: Vec<StrengthItem> = hands[p]
                .iter()
                .enumerate()
                .filter(|(_, hand)| !hand.conflicts_with(mask))
                .map(|(i, hand)| StrengthItem {
                    score: score_hand(hand.0, hand.1, &board),
                    hand: i as u16,
                })
                .collect();
            items.sort_unstable_by_key(|item| item.score);
            items
        });
        ShowdownTable { sorted }
    }

    fn table_for(&self, turn: Card, river: Card) -> &ShowdownTable {
        let a = turn.index().min(river.index());
        let b = turn.index().max(river.index());
        &self.showdowns[self.runout_index[a * 52 + b] as usize]
    }

    fn same_mass(&self, player: usize, hand: usize, cfreach: &[f64]) -> f64 {
        let idx = self.same_hand_index[player][hand];
        if idx == u16::MAX {
            0.0
        } else {
            cfreach[idx as usize]
        }
    }

    /// Opponent mass compatible with each of `player`'s hands:
    /// total − mass sharing card 1 − mass sharing card 2, plus the
    /// identical combo added back once (it was subtracted twice).
    pub(crate) fn compatibility_mass(&self, player: usize, cfreach: &[f64]) -> Vec<f64> {
        let opp = player ^ 1;
        let mut total = 0.0;
        let mut card_total = [0.0f64; 52];
        for (j, &w) in cfreach.iter().enumerate() {
            if w != 0.0 {
                let (c1, c2) = self.hole_cards[opp][j];
                total += w;
                card_total[c1 as usize] += w;
                card_total[c2 as usize] += w;
            }
        }
        self.hole_cards[player]
            .iter()
            .enumerate()
            .map(|(h, &(c1, c2))| {
                total - card_total[c1 as usize] - card_total[c2 as usize]
                    + self.same_mass(player, h, cfreach)
            })
            .collect()
    }

    /// Per-hand counterfactual payoff for `player` at a terminal node,
    /// aggregated against the opponent's reach vector.
    pub(crate) fn terminal_values(&self, node: &Node, player: Player, cfreach: &[f64]) -> Vec<f64> {
        let p = player.index();
        let mut values = vec![0.0; self.hands[p].len()];
        let inv = f64::from(node.invested[p]);
        let pot = f64::from(self.starting_pot + node.invested[0] + node.invested[1]);

        match node.kind {
            NodeKind::TerminalFold { folder } => {
                let payoff = if folder == player { -inv } else { pot - inv };
                for (value, compat) in values.iter_mut().zip(self.compatibility_mass(p, cfreach)) {
                    *value = payoff * compat;
                }
            }
            NodeKind::TerminalShowdown => {
                let half = pot / 2.0;
                let turn = self.board.get(3).copied().or(node.turn);
                let river = self.board.get(4).copied().or(node.river);
                if let (Some(t), Some(r)) = (turn, river) {
                    self.showdown_into(self.table_for(t, r), p, cfreach, half, inv, 1.0, &mut values);
                } else if let Some(t) = turn {
                    // All-in before the river: each live river card is
                    // equally likely once four hole cards are fixed.
                    let dead = self.board_mask | t.mask();
                    for idx in 0..52 {
                        let river = Card::from_index(idx);
                        if river.mask() & dead != 0 {
                            continue;
                        }
                        self.showdown_into(
                            self.table_for(t, river),
                            p,
                            cfreach,
                            half,
                            inv,
                            1.0 / 44.0,
                            &mut values,
                        );
                    }
                } else {
                    // All-in on the flop: 45 * 44 ordered runouts per
                    // matchup, visited as unordered pairs.
                    for a in 0..52 {
                        let turn = Card::from_index(a);
                        if turn.mask() & self.board_mask != 0 {
                            continue;
                        }
                        for b in a + 1..52 {
                            let river = Card::from_index(b);
                            if river.mask() & self.board_mask != 0 {
                                continue;
                            }
                            self.showdown_into(
                                self.table_for(turn, river),
                                p,
                                cfreach,
                                half,
                                inv,
                                2.0 / (45.0 * 44.0),
                                &mut values,
                            );
                        }
                    }
                }
            }
            NodeKind::Decision { .. } | NodeKind::Chance { .. } => {
                unreachable!("terminal_values called on a non-terminal node")
            }
        }
        values
    }

    /// Adds `scale` times the showdown payoff on one runout into
    /// `values`. Ascending pass collects the strictly-weaker opponent
    /// mass per hand, descending pass the strictly-stronger mass; ties
    /// fall out as the remainder of the compatible total. Hands that
    /// collide with the runout are absent from the table on both sides.
    #[allow(clippy::too_many_arguments)]
    fn showdown_into(
        &self,
        table: &ShowdownTable,
        player: usize,
        cfreach: &[f64],
        half_pot: f64,
        inv: f64,
        scale: f64,
        values: &mut [f64],
    ) {
        let opp = player ^ 1;
        let own_sorted = &table.sorted[player];
        let opp_sorted = &table.sorted[opp];

        let mut total = 0.0;
        let mut card_total = [0.0f64; 52];
        for item in opp_sorted {
            let w = cfreach[item.hand as usize];
            if w != 0.0 {
                let (c1, c2) = self.hole_cards[opp][item.hand as usize];
                total += w;
                card_total[c1 as usize] += w;
                card_total[c2 as usize] += w;
            }
        }
        if total == 0.0 {
            return;
        }

        let mut weaker = vec![0.0; own_sorted.len()];
        {
            let mut acc = 0.0;
            let mut card_acc = [0.0f64; 52];
            let mut j = 0;
            for (i, item) in own_sorted.iter().enumerate() {
                while j < opp_sorted.len() && opp_sorted[j].score < item.score {
                    let w = cfreach[opp_sorted[j].hand as usize];
                    let (c1, c2) = self.hole_cards[opp][opp_sorted[j].hand as usize];
                    acc += w;
                    card_acc[c1 as usize] += w;
                    card_acc[c2 as usize] += w;
                    j += 1;
                }
                let (c1, c2) = self.hole_cards[player][item.hand as usize];
                weaker[i] = acc - card_acc[c1 as usize] - card_acc[c2 as usize];
            }
        }

        let mut acc = 0.0;
        let mut card_acc = [0.0f64; 52];
        let mut j = opp_sorted.len();
        for (i, item) in own_sorted.iter().enumerate().rev() {
            while j > 0 && opp_sorted[j - 1].score > item.score {
                j -= 1;
                let w = cfreach[opp_sorted[j].hand as usize];
                let (c1, c2) = self.hole_cards[opp][opp_sorted[j].hand as usize];
                acc += w;
                card_acc[c1 as usize] += w;
                card_acc[c2 as usize] += w;
            }
            let h = item.hand as usize;
            let (c1, c2) = self.hole_cards[player][h];
            let stronger = acc - card_acc[c1 as usize] - card_acc[c2 as usize];
            let compat = total - card_total[c1 as usize] - card_total[c2 as usize]
                + self.same_mass(player, h, cfreach);
            values[h] += scale * (half_pot * (weaker[i] - stronger) + (half_pot - inv) * compat);
        }
    }

    /// Like `showdown_into` but accumulates equity numerators and
    /// denominators: wins plus half of ties over the compatible mass.
    fn equity_into(
        &self,
        table: &ShowdownTable,
        player: usize,
        cfreach: &[f64],
        num: &mut [f64],
        den: &mut [f64],
    ) {
        let opp = player ^ 1;
        let own_sorted = &table.sorted[player];
        let opp_sorted = &table.sorted[opp];

        let mut total = 0.0;
        let mut card_total = [0.0f64; 52];
        for item in opp_sorted {
            let w = cfreach[item.hand as usize];
            if w != 0.0 {
                let (c1, c2) = self.hole_cards[opp][item.hand as usize];
                total += w;
                card_total[c1 as usize] += w;
                card_total[c2 as usize] += w;
            }
        }
        if total == 0.0 {
            return;
        }

        let mut weaker = vec![0.0; own_sorted.len()];
        {
            let mut acc = 0.0;
            let mut card_acc = [0.0f64; 52];
            let mut j = 0;
            for (i, item) in own_sorted.iter().enumerate() {
                while j < opp_sorted.len() && opp_sorted[j].score < item.score {
                    let w = cfreach[opp_sorted[j].hand as usize];
                    let (c1, c2) = self.hole_cards[opp][opp_sorted[j].hand as usize];
                    acc += w;
                    card_acc[c1 as usize] += w;
                    card_acc[c2 as usize] += w;
                    j += 1;
                }
                let (c1, c2) = self.hole_cards[player][item.hand as usize];
                weaker[i] = acc - card_acc[c1 as usize] - card_acc[c2 as usize];
            }
        }

        let mut acc = 0.0;
        let mut card_acc = [0.0f64; 52];
        let mut j = opp_sorted.len();
        for (i, item) in own_sorted.iter().enumerate().rev() {
            while j > 0 && opp_sorted[j - 1].score > item.score {
                j -= 1;
                let w = cfreach[opp_sorted[j].hand as usize];
                let (c1, c2) = self.hole_cards[opp][opp_sorted[j].hand as usize];
                acc += w;
                card_acc[c1 as usize] += w;
                card_acc[c2 as usize] += w;
            }
            let h = item.hand as usize;
            let (c1, c2) = self.hole_cards[player][h];
            let stronger = acc - card_acc[c1 as usize] - card_acc[c2 as usize];
            let compat = total - card_total[c1 as usize] - card_total[c2 as usize]
                + self.same_mass(player, h, cfreach);
            num[h] += 0.5 * (compat + weaker[i] - stronger);
            den[h] += compat;
        }
    }
}

// ---------------------------------------------------------------------------
// Game: construction, cursor, queries
// ---------------------------------------------------------------------------

/// A solvable heads-up postflop spot with a cursor over its tree.
#[derive(Debug)]
pub struct PostflopGame {
    config: SpotConfig,
    tree: GameTree,
    spot: Spot,
    tables: [FlatTables; 2],
    solved: bool,
    node: u32,
    history: Vec<usize>,
    /// Per-player cursor weights: range weight times own average
    /// strategy along the path, zeroed by dealt cards.
    weights: [Vec<f64>; 2],
    normalized: Option<[Vec<f64>; 2]>,
}

impl PostflopGame {
    pub fn new(config: SpotConfig) -> SolverResult<PostflopGame> {
        let oop = parse_range(&config.oop_range)?;
        let ip = parse_range(&config.ip_range)?;

        let flop_cards = parse_board(&config.flop)?;
        if flop_cards.len() != 3 {
            return Err(SolverError::InvalidCardSyntax(format!(
                "expected exactly 3 flop cards in {:?}",
                config.flop
            )));
        }
        let turn = config.turn.as_deref().map(parse_card).transpose()?;
        let river = config.river.as_deref().map(parse_card).transpose()?;
        if river.is_some() && turn.is_none() {
            return Err(SolverError::InvalidConfig(
                "a river card requires a turn card".into(),
            ));
        }
        let mut board = flop_cards;
        let mut seen = board_mask(&board);
        for card in [turn, river].into_iter().flatten() {
            if card.mask() & seen != 0 {
                return Err(SolverError::InvalidCardSyntax(format!(
                    "duplicate card {}",
                    card
                )));
            }
            seen |= card.mask();
            board.push(card);
        }

        let sizes = BetSizeOptions::try_from_specs(&config.bet_sizes, &config.raise_sizes)?;

        if config.starting_pot <= 0 {
            return Err(SolverError::InvalidConfig(
                "starting pot must be positive".into(),
            ));
        }
        if config.effective_stack <= 0 {
            return Err(SolverError::InvalidConfig(
                "effective stack must be positive".into(),
            ));
        }

        let bmask = board_mask(&board);
        let oop = oop.without_board(bmask);
        let ip = ip.without_board(bmask);
        if oop.is_empty() {
            return Err(SolverError::InvalidRangeSyntax {
                input: config.oop_range.clone(),
                reason: "every combination conflicts with the board".into(),
            });
        }
        if ip.is_empty() {
            return Err(SolverError::InvalidRangeSyntax {
                input: config.ip_range.clone(),
                reason: "every combination conflicts with the board".into(),
            });
        }

        let spot = Spot::new(board.clone(), oop, ip, config.starting_pot)?;
        let tree = GameTree::build(TreeConfig {
            flop: [board[0], board[1], board[2]],
            turn,
            river,
            starting_pot: config.starting_pot,
            effective_stack: config.effective_stack,
            sizes,
        });
        let tables = [
            FlatTables::new(&tree, Player::Oop, spot.hands[0].len()),
            FlatTables::new(&tree, Player::Ip, spot.hands[1].len()),
        ];
        let weights = [
            spot.initial_weights[0].clone(),
            spot.initial_weights[1].clone(),
        ];
        log::debug!(
            "spot built: {} nodes, {} + {} hands, {:.1} MB of tables",
            tree.node_count(),
            spot.hands[0].len(),
            spot.hands[1].len(),
            (tables[0].memory_bytes() + tables[1].memory_bytes()) as f64 / (1024.0 * 1024.0),
        );

        Ok(PostflopGame {
            config,
            tree,
            spot,
            tables,
            solved: false,
            node: 0,
            history: Vec::new(),
            weights,
            normalized: None,
        })
    }

    pub fn config(&self) -> &SpotConfig {
        &self.config
    }

    pub fn tree(&self) -> &GameTree {
        &self.tree
    }

    /// Board cards present at the tree root.
    pub fn board(&self) -> &[Card] {
        &self.spot.board
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn memory_bytes(&self) -> usize {
        self.tables[0].memory_bytes() + self.tables[1].memory_bytes()
    }

    pub(crate) fn spot(&self) -> &Spot {
        &self.spot
    }

    pub(crate) fn tables(&self) -> &[FlatTables; 2] {
        &self.tables
    }

    pub(crate) fn solve_parts_mut(&mut self) -> (&mut [FlatTables; 2], &GameTree, &Spot) {
        (&mut self.tables, &self.tree, &self.spot)
    }

    pub(crate) fn mark_solved(&mut self) {
        self.solved = true;
    }

    // -- cursor ------------------------------------------------------------

    pub fn current_player(&self) -> Option<Player> {
        self.tree.node(self.node).player()
    }

    pub fn is_chance_node(&self) -> bool {
        self.tree.node(self.node).is_chance()
    }

    pub fn is_terminal_node(&self) -> bool {
        self.tree.node(self.node).is_terminal()
    }

    /// Actions at the cursor, empty at chance and terminal nodes.
    pub fn available_actions(&self) -> &[Action] {
        self.tree.node(self.node).actions()
    }

    /// Dealable cards at a chance cursor; `play` indexes into this.
    pub fn chance_cards(&self) -> &[Card] {
        self.tree.node(self.node).chance_cards()
    }

    pub fn private_cards(&self, player: Player) -> &[StartingHand] {
        &self.spot.hands[player.index()]
    }

    pub fn history(&self) -> &[usize] {
        &self.history
    }

    /// Replays a history from the root, restoring the cursor even when
    /// a prefix succeeds and a later index fails.
    pub fn apply_history(&mut self, history: &[usize]) -> SolverResult<()> {
        self.back_to_root();
        for &index in history {
            if let Err(err) = self.play(index) {
                self.back_to_root();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Advances the cursor along child `index`. At a decision node the
    /// actor's weights pick up their average-strategy row; at a chance
    /// node both players lose the hands conflicting with the card.
    pub fn play(&mut self, index: usize) -> SolverResult<()> {
        let node = self.tree.node(self.node);
        if node.is_terminal() {
            return Err(SolverError::AtTerminalNode);
        }
        let children = node.children();
        if index >= children.len() {
            return Err(SolverError::InvalidActionIndex {
                index,
                limit: children.len(),
            });
        }

        if node.is_chance() {
            let mask = node.chance_cards()[index].mask();
            for p in 0..2 {
                for (w, hand) in self.weights[p].iter_mut().zip(&self.spot.hands[p]) {
                    if hand.conflicts_with(mask) {
                        *w = 0.0;
                    }
                }
            }
        } else if let Some(player) = node.player() {
            let p = player.index();
            let num_hands = self.spot.hands[p].len();
            let sigma = self.tables[p].average_strategy(self.node, node.actions().len());
            let row = &sigma[index * num_hands..(index + 1) * num_hands];
            for (w, &s) in self.weights[p].iter_mut().zip(row) {
                *w *= s;
            }
        }

        self.node = children[index];
        self.history.push(index);
        self.normalized = None;
        Ok(())
    }

    pub fn back_to_root(&mut self) {
        self.node = 0;
        self.history.clear();
        self.weights = [
            self.spot.initial_weights[0].clone(),
            self.spot.initial_weights[1].clone(),
        ];
        self.normalized = None;
    }

    // -- queries -----------------------------------------------------------

    /// Average strategy at the cursor, row-major by action then hand.
    /// Each hand's column sums to 1.
    pub fn strategy(&self) -> SolverResult<Vec<f64>> {
        if !self.solved {
            return Err(SolverError::NotSolved);
        }
        let node = self.tree.node(self.node);
        let player = node.player().ok_or(SolverError::AtTerminalNode)?;
        Ok(self.tables[player.index()].average_strategy(self.node, node.actions().len()))
    }

    /// Caches, per player, each hand's cursor weight scaled by the
    /// opponent mass it can coexist with, normalized to sum 1.
    pub fn cache_normalized_weights(&mut self) -> SolverResult<()> {
        if !self.solved {
            return Err(SolverError::NotSolved);
        }
        let normalized = [0, 1].map(|p| {
            let compat = self.spot.compatibility_mass(p, &self.weights[p ^ 1]);
            let mut out: Vec<f64> = self.weights[p]
                .iter()
                .zip(compat)
                .map(|(&w, c)| w * c)
                .collect();
            let total: f64 = out.iter().sum();
            if total > 0.0 {
                for w in &mut out {
                    *w /= total;
                }
            }
            out
        });
        self.normalized = Some(normalized);
        Ok(())
    }

    pub fn normalized_weights(&self, player: Player) -> SolverResult<&[f64]> {
        match &self.normalized {
            Some(normalized) => Ok(&normalized[player.index()]),
            None => Err(SolverError::WeightsNotCached),
        }
    }

    /// One probability per action at the cursor: strategy rows blended
    /// with the acting player's normalized weights.
    pub fn action_frequencies(&self) -> SolverResult<Vec<f64>> {
        let normalized = self
            .normalized
            .as_ref()
            .ok_or(SolverError::WeightsNotCached)?;
        let node = self.tree.node(self.node);
        let player = node.player().ok_or(SolverError::AtTerminalNode)?;
        let p = player.index();
        let num_actions = node.actions().len();
        let strategy = self.tables[p].average_strategy(self.node, num_actions);
        let weights = &normalized[p];
        let num_hands = weights.len();

        let mut frequencies = vec![0.0; num_actions];
        for (a, frequency) in frequencies.iter_mut().enumerate() {
            *frequency = strategy[a * num_hands..(a + 1) * num_hands]
                .iter()
                .zip(weights)
                .map(|(&s, &w)| s * w)
                .sum();
        }
        let total: f64 = frequencies.iter().sum();
        if total > 0.0 {
            for frequency in &mut frequencies {
                *frequency /= total;
            }
        }
        Ok(frequencies)
    }

    /// Per-hand expected chips for `player` from the cursor onward,
    /// assuming both sides play the average strategy. Hands dead at
    /// the cursor report zero.
    pub fn expected_values(&self, player: Player) -> SolverResult<Vec<f64>> {
        if !self.solved {
            return Err(SolverError::NotSolved);
        }
        let p = player.index();
        let view = SolveView {
            tree: &self.tree,
            spot: &self.spot,
        };
        let raw = solver::average_values(&view, self.node, player, &self.tables, &self.weights[p ^ 1]);
        let compat = self.spot.compatibility_mass(p, &self.weights[p ^ 1]);
        let inv = f64::from(self.tree.node(self.node).invested[p]);
        Ok(raw
            .iter()
            .zip(compat)
            .zip(&self.weights[p])
            .map(|((&v, c), &w)| if w == 0.0 || c == 0.0 { 0.0 } else { v / c + inv })
            .collect())
    }

    /// Per-hand equity for `player` against the opponent's cursor
    /// weights, averaging uniformly over the remaining runouts. Hands
    /// dead at the cursor report zero.
    pub fn equity(&self, player: Player) -> Vec<f64> {
        let p = player.index();
        let node = self.tree.node(self.node);
        let turn = self.spot.board.get(3).copied().or(node.turn);
        let river = self.spot.board.get(4).copied().or(node.river);
        let cfreach = &self.weights[p ^ 1];
        let num_hands = self.spot.hands[p].len();
        let mut num = vec![0.0; num_hands];
        let mut den = vec![0.0; num_hands];

        if let (Some(t), Some(r)) = (turn, river) {
            self.spot
                .equity_into(self.spot.table_for(t, r), p, cfreach, &mut num, &mut den);
        } else if let Some(t) = turn {
            let dead = self.spot.board_mask | t.mask();
            for idx in 0..52 {
                let river = Card::from_index(idx);
                if river.mask() & dead != 0 {
                    continue;
                }
                self.spot
                    .equity_into(self.spot.table_for(t, river), p, cfreach, &mut num, &mut den);
            }
        } else {
            for a in 0..52 {
                let turn = Card::from_index(a);
                if turn.mask() & self.spot.board_mask != 0 {
                    continue;
                }
                for b in a + 1..52 {
                    let river = Card::from_index(b);
                    if river.mask() & self.spot.board_mask != 0 {
                        continue;
                    }
                    self.spot.equity_into(
                        self.spot.table_for(turn, river),
                        p,
                        cfreach,
                        &mut num,
                        &mut den,
                    );
                }
            }
        }

        num.iter()
            .zip(den)
            .zip(&self.weights[p])
            .map(|((&n, d), &w)| if w == 0.0 || d == 0.0 { 0.0 } else { n / d })
            .collect()
    }
}
