//! Showdown hand scoring. Scores are plain `u32`s ordered so that a higher
//! score always beats a lower one: hand category in the high bits, tie-break
//! kickers nibble-packed below.

use std::fmt;

use crate::cards::Card;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
    RoyalFlush = 9,
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandCategory::HighCard => "High Card",
            HandCategory::OnePair => "One Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::ThreeOfAKind => "Three of a Kind",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full House",
            HandCategory::FourOfAKind => "Four of a Kind",
            HandCategory::StraightFlush => "Straight Flush",
            HandCategory::RoyalFlush => "Royal Flush",
        };
        write!(f, "{}", name)
    }
}

pub fn category_of(score: u32) -> HandCategory {
    match score >> 20 {
        0 => HandCategory::HighCard,
        1 => HandCategory::OnePair,
        2 => HandCategory::TwoPair,
        3 => HandCategory::ThreeOfAKind,
        4 => HandCategory::Straight,
        5 => HandCategory::Flush,
        6 => HandCategory::FullHouse,
        7 => HandCategory::FourOfAKind,
        8 => HandCategory::StraightFlush,
        _ => HandCategory::RoyalFlush,
    }
}

fn encode(category: HandCategory, kickers: &[u8]) -> u32 {
    debug_assert!(kickers.len() <= 5);
    let mut score = (category as u32) << 20;
    for (i, &k) in kickers.iter().enumerate() {
        score |= (k as u32) << (16 - i * 4);
    }
    score
}

/// Highest straight in a rank bitmask (bit r set = rank value r present),
/// including the wheel via the ace doubling as a one.
fn straight_high(bits: u16) -> Option<u8> {
    let ext = bits | ((bits >> 14) & 1) << 1;
    for high in (5..=14u8).rev() {
        let window = 0b11111u16 << (high - 4);
        if ext & window == window {
            return Some(high);
        }
    }
    None
}

/// Take the `n` highest set bits of a rank bitmask, descending.
fn top_ranks(bits: u16, n: usize, out: &mut [u8]) {
    let mut filled = 0;
    for r in (2..=14u8).rev() {
        if filled == n {
            break;
        }
        if bits & (1 << r) != 0 {
            out[filled] = r;
            filled += 1;
        }
    }
}

/// Score a 7-card hand (two hole cards plus a full board).
pub fn score7(cards: &[Card; 7]) -> u32 {
    let mut rank_counts = [0u8; 15];
    let mut suit_counts = [0u8; 4];
    let mut suit_bits = [0u16; 4];
    let mut rank_bits = 0u16;

    for c in cards {
        let r = c.value() as usize;
        let s = c.suit as usize;
        rank_counts[r] += 1;
        suit_counts[s] += 1;
        suit_bits[s] |= 1 << r;
        rank_bits |= 1 << r;
    }

    let flush_suit = suit_counts.iter().position(|&n| n >= 5);

    if let Some(fs) = flush_suit {
        if let Some(high) = straight_high(suit_bits[fs]) {
            if high == 14 {
                return encode(HandCategory::RoyalFlush, &[14]);
            }
            return encode(HandCategory::StraightFlush, &[high]);
        }
    }

    // Group ranks by multiplicity, highest rank first within each group.
    let mut quad = 0u8;
    let mut trips = [0u8; 2];
    let mut ntrips = 0;
    let mut pairs = [0u8; 3];
    let mut npairs = 0;
    let mut single_bits = 0u16;
    for r in (2..=14u8).rev() {
        match rank_counts[r as usize] {
            4 => quad = r,
            3 if ntrips < 2 => {
                trips[ntrips] = r;
                ntrips += 1;
            }
            2 if npairs < 3 => {
                pairs[npairs] = r;
                npairs += 1;
            }
            1 => single_bits |= 1 << r,
            _ => {}
        }
    }

    if quad > 0 {
        let mut kicker = [0u8; 1];
        top_ranks(rank_bits & !(1 << quad), 1, &mut kicker);
        return encode(HandCategory::FourOfAKind, &[quad, kicker[0]]);
    }

    if ntrips == 2 {
        return encode(HandCategory::FullHouse, &[trips[0], trips[1]]);
    }
    if ntrips == 1 && npairs > 0 {
        return encode(HandCategory::FullHouse, &[trips[0], pairs[0]]);
    }

    if let Some(fs) = flush_suit {
        let mut ks = [0u8; 5];
        top_ranks(suit_bits[fs], 5, &mut ks);
        return encode(HandCategory::Flush, &ks);
    }

    if let Some(high) = straight_high(rank_bits) {
        return encode(HandCategory::Straight, &[high]);
    }

    if ntrips == 1 {
        let mut ks = [0u8; 2];
        top_ranks(rank_bits & !(1 << trips[0]), 2, &mut ks);
        return encode(HandCategory::ThreeOfAKind, &[trips[0], ks[0], ks[1]]);
    }

    if npairs >= 2 {
        let others = rank_bits & !(1 << pairs[0]) & !(1 << pairs[1]);
        let mut kicker = [0u8; 1];
        top_ranks(others, 1, &mut kicker);
        return encode(HandCategory::TwoPair, &[pairs[0], pairs[1], kicker[0]]);
    }

    if npairs == 1 {
        let mut ks = [0u8; 3];
        top_ranks(single_bits, 3, &mut ks);
        return encode(HandCategory::OnePair, &[pairs[0], ks[0], ks[1], ks[2]]);
    }

    let mut ks = [0u8; 5];
    top_ranks(single_bits, 5, &mut ks);
    encode(HandCategory::HighCard, &ks)
}

/// Score two hole cards against a full five-card board.
pub fn score_hand(c1: Card, c2: Card, board: &[Card]) -> u32 {
    debug_assert_eq!(board.len(), 5);
    score7(&[c1, c2, board[0], board[1], board[2], board[3], board[4]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_board;

    fn score(s: &str) -> u32 {
        let cards = parse_board(s).unwrap();
        score7(&[
            cards[0], cards[1], cards[2], cards[3], cards[4], cards[5], cards[6],
        ])
    }

    #[test]
    fn categories() {
        assert_eq!(category_of(score("AcKcQcJcTc4d2h")), HandCategory::RoyalFlush);
        assert_eq!(category_of(score("9c8c7c6c5cAdAh")), HandCategory::StraightFlush);
        assert_eq!(category_of(score("AcAdAhAsKc4d2h")), HandCategory::FourOfAKind);
        assert_eq!(category_of(score("AcAdAhKsKc4d2h")), HandCategory::FullHouse);
        assert_eq!(category_of(score("Ac9c7c5c2cKdKh")), HandCategory::Flush);
        assert_eq!(category_of(score("9c8d7h6s5cAdKh")), HandCategory::Straight);
        assert_eq!(category_of(score("AcAdAh9s8c4d2h")), HandCategory::ThreeOfAKind);
        assert_eq!(category_of(score("AcAdKhKs8c4d2h")), HandCategory::TwoPair);
        assert_eq!(category_of(score("AcAdKhQs8c4d2h")), HandCategory::OnePair);
        assert_eq!(category_of(score("AcKdQh9s8c4d2h")), HandCategory::HighCard);
    }

    #[test]
    fn wheel_straight() {
        let s = score("Ac2d3h4s5c9dKh");
        assert_eq!(category_of(s), HandCategory::Straight);
        // Wheel is the lowest straight: six-high beats it.
        assert!(s < score("2d3h4s5c6cKdQh"));
    }

    #[test]
    fn steel_wheel() {
        assert_eq!(category_of(score("Ac2c3c4c5c9dKh")), HandCategory::StraightFlush);
    }

    #[test]
    fn full_house_beats_flush() {
        assert!(score("AcAdAhKsKc4d2h") > score("Ac9c7c5c2cKdKh"));
    }

    #[test]
    fn kickers_break_ties() {
        // AK beats AQ on a paired-ace board.
        let ak = score("AcKdAh9s8c4d2h");
        let aq = score("AcQdAh9s8c4d2h");
        assert!(ak > aq, "ace-king kicker should outrank ace-queen");
    }

    #[test]
    fn two_pair_uses_best_two() {
        // Three pairs on board+hand: best two plus top kicker.
        let s = score("AcAdKhKs8c8dQh");
        assert_eq!(category_of(s), HandCategory::TwoPair);
        let weaker = score("AcAdKhKs8c8d2h");
        // Queen kicker beats the eight kicker after AA+KK are taken.
        assert!(s > weaker);
    }

    #[test]
    fn board_plays() {
        // Both hole cards irrelevant: identical scores.
        let a = score("2c3d9h9s9dAcKc");
        let b = score("2h3s9h9s9dAcKc");
        assert_eq!(category_of(a), HandCategory::ThreeOfAKind);
        assert_eq!(a, b);
    }
}
