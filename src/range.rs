//! Range shorthand parsing: `"AA,KQs,QQ-22,ATs+,AhKh,A2o:0.5"` into a
//! deduplicated, index-stable list of weighted two-card starting hands.

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;

use crate::cards::{parse_card, Card, Rank, ALL_SUITS, RANKS_STR};
use crate::error::{SolverError, SolverResult};

/// Unordered pair of distinct cards, stored with the lower card index first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StartingHand(pub Card, pub Card);

impl StartingHand {
    pub fn new(a: Card, b: Card) -> StartingHand {
        debug_assert_ne!(a, b);
        if a.index() < b.index() {
            StartingHand(a, b)
        } else {
            StartingHand(b, a)
        }
    }

    pub fn mask(&self) -> u64 {
        self.0.mask() | self.1.mask()
    }

    pub fn conflicts_with(&self, mask: u64) -> bool {
        self.mask() & mask != 0
    }

    /// Stable sort key: lexicographic by card index.
    pub fn order_key(&self) -> (usize, usize) {
        (self.0.index(), self.1.index())
    }
}

impl fmt::Display for StartingHand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Higher rank first, e.g. "AsKh".
        let (hi, lo) = if self.0.rank >= self.1.rank {
            (self.0, self.1)
        } else {
            (self.1, self.0)
        };
        write!(f, "{}{}", hi, lo)
    }
}

/// A parsed range: weighted starting hands in a deterministic order.
#[derive(Debug, Clone, Default)]
pub struct Range {
    entries: Vec<(StartingHand, f64)>,
}

impl Range {
    pub fn hands(&self) -> impl Iterator<Item = StartingHand> + '_ {
        self.entries.iter().map(|&(h, _)| h)
    }

    pub fn entries(&self) -> &[(StartingHand, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every hand that shares a card with `board_mask`. Surviving
    /// hands keep their relative order, so downstream indices stay dense.
    pub fn without_board(&self, board_mask: u64) -> Range {
        Range {
            entries: self
                .entries
                .iter()
                .filter(|(h, _)| !h.conflicts_with(board_mask))
                .copied()
                .collect(),
        }
    }
}

fn syntax_error(input: &str, reason: impl Into<String>) -> SolverError {
    SolverError::InvalidRangeSyntax {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn rank_pos(c: char) -> Option<usize> {
    RANKS_STR.find(c.to_ascii_uppercase())
}

fn rank_at(pos: usize) -> Rank {
    Rank::from_char(RANKS_STR.as_bytes()[pos] as char).unwrap()
}

/// Shape of one shorthand token before suit expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Pair(usize),
    Suited(usize, usize),
    Offsuit(usize, usize),
    /// Bare "AK": suited and offsuit combined.
    Any(usize, usize),
}

impl Shape {
    fn parse(token: &str, original: &str) -> SolverResult<Shape> {
        let chars: Vec<char> = token.chars().collect();
        match chars.len() {
            2 => {
                let hi = rank_pos(chars[0])
                    .ok_or_else(|| syntax_error(original, format!("unknown rank '{}'", chars[0])))?;
                let lo = rank_pos(chars[1])
                    .ok_or_else(|| syntax_error(original, format!("unknown rank '{}'", chars[1])))?;
                if hi == lo {
                    Ok(Shape::Pair(hi))
                } else {
                    Ok(Shape::Any(hi.max(lo), hi.min(lo)))
                }
            }
            3 => {
                let hi = rank_pos(chars[0])
                    .ok_or_else(|| syntax_error(original, format!("unknown rank '{}'", chars[0])))?;
                let lo = rank_pos(chars[1])
                    .ok_or_else(|| syntax_error(original, format!("unknown rank '{}'", chars[1])))?;
                if hi == lo {
                    return Err(syntax_error(original, "a pair cannot be suited or offsuit"));
                }
                let (hi, lo) = (hi.max(lo), hi.min(lo));
                match chars[2].to_ascii_lowercase() {
                    's' => Ok(Shape::Suited(hi, lo)),
                    'o' => Ok(Shape::Offsuit(hi, lo)),
                    other => Err(syntax_error(
                        original,
                        format!("expected 's' or 'o', found '{}'", other),
                    )),
                }
            }
            _ => Err(syntax_error(original, "unrecognized hand shorthand")),
        }
    }

    fn expand(self, out: &mut Vec<StartingHand>) {
        match self {
            Shape::Pair(r) => {
                let rank = rank_at(r);
                for (s1, s2) in ALL_SUITS.iter().tuple_combinations() {
                    out.push(StartingHand::new(Card::new(rank, *s1), Card::new(rank, *s2)));
                }
            }
            Shape::Suited(hi, lo) => {
                let (hi, lo) = (rank_at(hi), rank_at(lo));
                for &s in &ALL_SUITS {
                    out.push(StartingHand::new(Card::new(hi, s), Card::new(lo, s)));
                }
            }
            Shape::Offsuit(hi, lo) => {
                let (hi, lo) = (rank_at(hi), rank_at(lo));
                for (&s1, &s2) in ALL_SUITS.iter().cartesian_product(&ALL_SUITS) {
                    if s1 != s2 {
                        out.push(StartingHand::new(Card::new(hi, s1), Card::new(lo, s2)));
                    }
                }
            }
            Shape::Any(hi, lo) => {
                Shape::Suited(hi, lo).expand(out);
                Shape::Offsuit(hi, lo).expand(out);
            }
        }
    }
}

/// `"ATs+"`: same shape, second rank stepped up to one below the first.
/// `"66+"`: pairs stepped up to aces.
fn expand_plus(base: &str, original: &str, out: &mut Vec<StartingHand>) -> SolverResult<()> {
    match Shape::parse(base, original)? {
        Shape::Pair(r) => {
            for p in r..RANKS_STR.len() {
                Shape::Pair(p).expand(out);
            }
        }
        Shape::Suited(hi, lo) => {
            for p in lo..hi {
                Shape::Suited(hi, p).expand(out);
            }
        }
        Shape::Offsuit(hi, lo) => {
            for p in lo..hi {
                Shape::Offsuit(hi, p).expand(out);
            }
        }
        Shape::Any(hi, lo) => {
            for p in lo..hi {
                Shape::Any(hi, p).expand(out);
            }
        }
    }
    Ok(())
}

/// `"QQ-22"` or `"AJs-A8s"`: the inclusive run between two same-shape hands.
fn expand_dash(lhs: &str, rhs: &str, original: &str, out: &mut Vec<StartingHand>) -> SolverResult<()> {
    let a = Shape::parse(lhs, original)?;
    let b = Shape::parse(rhs, original)?;
    match (a, b) {
        (Shape::Pair(x), Shape::Pair(y)) => {
            for p in x.min(y)..=x.max(y) {
                Shape::Pair(p).expand(out);
            }
        }
        (Shape::Suited(h1, l1), Shape::Suited(h2, l2)) if h1 == h2 => {
            for p in l1.min(l2)..=l1.max(l2) {
                Shape::Suited(h1, p).expand(out);
            }
        }
        (Shape::Offsuit(h1, l1), Shape::Offsuit(h2, l2)) if h1 == h2 => {
            for p in l1.min(l2)..=l1.max(l2) {
                Shape::Offsuit(h1, p).expand(out);
            }
        }
        (Shape::Any(h1, l1), Shape::Any(h2, l2)) if h1 == h2 => {
            for p in l1.min(l2)..=l1.max(l2) {
                Shape::Any(h1, p).expand(out);
            }
        }
        _ => {
            return Err(syntax_error(
                original,
                "interval endpoints must share the same shape",
            ))
        }
    }
    Ok(())
}

/// Parses a full range string. Duplicate hands across tokens are collapsed,
/// keeping the weight of the last token naming them.
pub fn parse_range(input: &str) -> SolverResult<Range> {
    let cleaned = input.replace(' ', "");
    if cleaned.is_empty() {
        return Err(syntax_error(input, "empty range"));
    }

    let mut weights: HashMap<StartingHand, f64> = HashMap::new();
    for token in cleaned.split(',') {
        if token.is_empty() {
            return Err(syntax_error(input, "empty token"));
        }

        let (body, weight) = match token.split_once(':') {
            Some((body, w)) => {
                let weight: f64 = w
                    .parse()
                    .map_err(|_| syntax_error(token, format!("bad weight '{}'", w)))?;
                if !(0.0..=1.0).contains(&weight) {
                    return Err(syntax_error(token, "weight must be within [0, 1]"));
                }
                (body, weight)
            }
            None => (token, 1.0),
        };

        let mut expanded = Vec::new();
        if let Some(base) = body.strip_suffix('+') {
            expand_plus(base, token, &mut expanded)?;
        } else if body.len() >= 5 && body.contains('-') {
            let (lhs, rhs) = body.split_once('-').unwrap();
            expand_dash(lhs, rhs, token, &mut expanded)?;
        } else if body.len() == 4 {
            // Explicit combo, e.g. "AhKh".
            let c1 = parse_card(&body[..2]).map_err(|_| syntax_error(token, "bad combo"))?;
            let c2 = parse_card(&body[2..]).map_err(|_| syntax_error(token, "bad combo"))?;
            if c1 == c2 {
                return Err(syntax_error(token, "combo repeats a card"));
            }
            expanded.push(StartingHand::new(c1, c2));
        } else {
            Shape::parse(body, token)?.expand(&mut expanded);
        }

        for hand in expanded {
            weights.insert(hand, weight);
        }
    }

    let mut entries: Vec<(StartingHand, f64)> = weights.into_iter().collect();
    entries.sort_by_key(|(h, _)| h.order_key());
    Ok(Range { entries })
}
