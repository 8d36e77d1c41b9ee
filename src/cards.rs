use std::fmt;

use crate::error::{SolverError, SolverResult};

pub const RANKS_STR: &str = "23456789TJQKA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
    Ace = 14,
}

impl Rank {
    pub fn from_char(c: char) -> SolverResult<Rank> {
        match c.to_ascii_uppercase() {
            '2' => Ok(Rank::Two),
            '3' => Ok(Rank::Three),
            '4' => Ok(Rank::Four),
            '5' => Ok(Rank::Five),
            '6' => Ok(Rank::Six),
            '7' => Ok(Rank::Seven),
            '8' => Ok(Rank::Eight),
            '9' => Ok(Rank::Nine),
            'T' => Ok(Rank::Ten),
            'J' => Ok(Rank::Jack),
            'Q' => Ok(Rank::Queen),
            'K' => Ok(Rank::King),
            'A' => Ok(Rank::Ace),
            _ => Err(SolverError::InvalidCardSyntax(c.to_string())),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

pub const ALL_RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Spades = 0,
    Hearts = 1,
    Diamonds = 2,
    Clubs = 3,
}

impl Suit {
    pub fn from_char(c: char) -> SolverResult<Suit> {
        match c.to_ascii_lowercase() {
            's' => Ok(Suit::Spades),
            'h' => Ok(Suit::Hearts),
            'd' => Ok(Suit::Diamonds),
            'c' => Ok(Suit::Clubs),
            _ => Err(SolverError::InvalidCardSyntax(c.to_string())),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Suit::Spades => 's',
            Suit::Hearts => 'h',
            Suit::Diamonds => 'd',
            Suit::Clubs => 'c',
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Suit::Spades => "\u{2660}",
            Suit::Hearts => "\u{2665}",
            Suit::Diamonds => "\u{2666}",
            Suit::Clubs => "\u{2663}",
        }
    }
}

pub const ALL_SUITS: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    pub fn value(&self) -> u8 {
        self.rank.value()
    }

    /// Dense id in 0..52: `(rank - 2) * 4 + suit`.
    pub fn index(&self) -> usize {
        (self.rank.value() as usize - 2) * 4 + self.suit as usize
    }

    /// Single-bit mask over the 52-card deck, for conflict tests.
    pub fn mask(&self) -> u64 {
        1u64 << self.index()
    }

    pub fn from_index(index: usize) -> Card {
        debug_assert!(index < 52);
        Card {
            rank: ALL_RANKS[index / 4],
            suit: ALL_SUITS[index % 4],
        }
    }

    pub fn pretty(&self) -> String {
        format!("{}{}", self.rank.to_char(), self.suit.symbol())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.to_char(), self.suit.to_char())
    }
}

pub fn parse_card(notation: &str) -> SolverResult<Card> {
    let notation = notation.trim();
    let chars: Vec<char> = notation.chars().collect();
    if chars.len() != 2 {
        return Err(SolverError::InvalidCardSyntax(notation.to_string()));
    }
    let rank = Rank::from_char(chars[0])?;
    let suit = Suit::from_char(chars[1])?;
    Ok(Card::new(rank, suit))
}

/// Parses a board string such as `"2c7d9h"`, `"2c 7d 9h"` or `"2c,7d,9h"`.
/// Duplicate cards are rejected.
pub fn parse_board(notation: &str) -> SolverResult<Vec<Card>> {
    let cleaned = notation.trim().replace([' ', ','], "");
    let chars: Vec<char> = cleaned.chars().collect();
    if chars.is_empty() || chars.len() % 2 != 0 {
        return Err(SolverError::InvalidCardSyntax(notation.to_string()));
    }
    let mut cards = Vec::with_capacity(chars.len() / 2);
    let mut seen = 0u64;
    for pair in chars.chunks(2) {
        let s: String = pair.iter().collect();
        let card = parse_card(&s)?;
        if seen & card.mask() != 0 {
            return Err(SolverError::InvalidCardSyntax(format!(
                "duplicate card {} in {}",
                card, notation
            )));
        }
        seen |= card.mask();
        cards.push(card);
    }
    Ok(cards)
}

pub fn board_mask(cards: &[Card]) -> u64 {
    cards.iter().fold(0u64, |m, c| m | c.mask())
}

/// `"AQs"` / `"AQo"` / `"QQ"` label for a two-card hand.
pub fn simplify_hand(c1: Card, c2: Card) -> String {
    let (hi, lo) = if c1.rank >= c2.rank { (c1, c2) } else { (c2, c1) };
    if hi.rank == lo.rank {
        format!("{}{}", hi.rank.to_char(), lo.rank.to_char())
    } else if hi.suit == lo.suit {
        format!("{}{}s", hi.rank.to_char(), lo.rank.to_char())
    } else {
        format!("{}{}o", hi.rank.to_char(), lo.rank.to_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_roundtrip() {
        for idx in 0..52 {
            let card = Card::from_index(idx);
            assert_eq!(card.index(), idx);
            assert_eq!(parse_card(&card.to_string()).unwrap(), card);
        }
    }

    #[test]
    fn parse_card_rejects_garbage() {
        assert!(parse_card("Xx").is_err());
        assert!(parse_card("A").is_err());
        assert!(parse_card("Asd").is_err());
        assert!(parse_card("1h").is_err());
    }

    #[test]
    fn parse_board_formats() {
        let compact = parse_board("2c7d9h").unwrap();
        let spaced = parse_board("2c 7d 9h").unwrap();
        let commas = parse_board("2c,7d,9h").unwrap();
        assert_eq!(compact, spaced);
        assert_eq!(compact, commas);
        assert_eq!(compact.len(), 3);
        assert_eq!(compact[2], parse_card("9h").unwrap());
    }

    #[test]
    fn parse_board_rejects_duplicates() {
        assert!(matches!(
            parse_board("2c7d2c"),
            Err(SolverError::InvalidCardSyntax(_))
        ));
    }

    #[test]
    fn parse_board_rejects_odd_length() {
        assert!(parse_board("2c7").is_err());
        assert!(parse_board("").is_err());
    }

    #[test]
    fn hand_labels() {
        let ah = parse_card("Ah").unwrap();
        let as_ = parse_card("As").unwrap();
        let kh = parse_card("Kh").unwrap();
        let kc = parse_card("Kc").unwrap();
        assert_eq!(simplify_hand(ah, as_), "AA");
        assert_eq!(simplify_hand(kh, ah), "AKs");
        assert_eq!(simplify_hand(kc, ah), "AKo");
    }
}
