//! Bet and raise size specifications.
//!
//! Sizes are comma-separated tokens: `50%` is a percentage of the pot,
//! `3x` raises to a multiple of the last bet (raise spots only), and `a`
//! is all-in. Amounts are resolved against the live pot when the game
//! tree is built.

use std::cmp::Ordering;

use crate::error::{SolverError, SolverResult};

/// A single configured bet or raise size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BetSize {
    /// Percentage of the pot: `50%` bets half pot.
    PotPercent(f64),

    /// Multiple of the outstanding bet-to amount: `3x` raises to three
    /// times the last bet. Only valid when facing a bet.
    LastBetMultiple(f64),

    /// Push the remaining effective stack.
    AllIn,
}

/// Sizes offered when opening the betting and sizes offered when facing
/// a bet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BetSizeOptions {
    pub bet: Vec<BetSize>,
    pub raise: Vec<BetSize>,
}

impl BetSizeOptions {
    /// Parses bet and raise size lists from comma-separated specs.
    ///
    /// An empty spec yields an empty list, which restricts that spot to
    /// its passive actions.
    pub fn try_from_specs(bet: &str, raise: &str) -> SolverResult<Self> {
        Ok(BetSizeOptions {
            bet: parse_size_list(bet, false)?,
            raise: parse_size_list(raise, true)?,
        })
    }
}

/// Parses one size token. `facing_bet` permits last-bet multiples, which
/// have no referent in an unopened pot.
pub fn parse_size(token: &str, facing_bet: bool) -> SolverResult<BetSize> {
    let tok = token.trim().to_lowercase();

    if tok == "a" {
        return Ok(BetSize::AllIn);
    }

    if let Some(num) = tok.strip_suffix('%') {
        let pct: u32 = num
            .parse()
            .map_err(|_| SolverError::InvalidSizeSyntax(token.trim().to_string()))?;
        if pct == 0 {
            return Err(SolverError::InvalidSizeSyntax(format!(
                "{}: percentage must be positive",
                token.trim()
            )));
        }
        return Ok(BetSize::PotPercent(f64::from(pct) / 100.0));
    }

    if let Some(num) = tok.strip_suffix('x') {
        if !facing_bet {
            return Err(SolverError::InvalidSizeSyntax(format!(
                "{}: last-bet multiples are raise sizes only",
                token.trim()
            )));
        }
        let mult: f64 = num
            .parse()
            .map_err(|_| SolverError::InvalidSizeSyntax(token.trim().to_string()))?;
        if !mult.is_finite() || mult <= 1.0 {
            return Err(SolverError::InvalidSizeSyntax(format!(
                "{}: multiple must exceed 1",
                token.trim()
            )));
        }
        return Ok(BetSize::LastBetMultiple(mult));
    }

    Err(SolverError::InvalidSizeSyntax(token.trim().to_string()))
}

fn parse_size_list(spec: &str, facing_bet: bool) -> SolverResult<Vec<BetSize>> {
    let mut sizes = spec
        .split(',')
        .map(str::trim)
        .filter(|tok| !tok.is_empty())
        .map(|tok| parse_size(tok, facing_bet))
        .collect::<SolverResult<Vec<_>>>()?;

    sizes.sort_by(|a, b| {
        size_order(a)
            .partial_cmp(&size_order(b))
            .unwrap_or(Ordering::Equal)
    });
    sizes.dedup();
    Ok(sizes)
}

fn size_order(size: &BetSize) -> (u8, f64) {
    match size {
        BetSize::PotPercent(pct) => (0, *pct),
        BetSize::LastBetMultiple(mult) => (1, *mult),
        BetSize::AllIn => (2, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pot_percent() {
        assert_eq!(parse_size("50%", false).unwrap(), BetSize::PotPercent(0.5));
        assert_eq!(parse_size("100%", false).unwrap(), BetSize::PotPercent(1.0));
        assert_eq!(parse_size("150%", true).unwrap(), BetSize::PotPercent(1.5));
        assert_eq!(parse_size(" 25% ", false).unwrap(), BetSize::PotPercent(0.25));
    }

    #[test]
    fn test_parse_multiple() {
        assert_eq!(
            parse_size("3x", true).unwrap(),
            BetSize::LastBetMultiple(3.0)
        );
        assert_eq!(
            parse_size("2.5x", true).unwrap(),
            BetSize::LastBetMultiple(2.5)
        );
        assert_eq!(
            parse_size("3X", true).unwrap(),
            BetSize::LastBetMultiple(3.0)
        );
    }

    #[test]
    fn test_parse_all_in() {
        assert_eq!(parse_size("a", false).unwrap(), BetSize::AllIn);
        assert_eq!(parse_size("A", true).unwrap(), BetSize::AllIn);
    }

    #[test]
    fn test_multiple_rejected_for_bets() {
        let err = parse_size("3x", false).unwrap_err();
        assert!(matches!(err, SolverError::InvalidSizeSyntax(_)));
    }

    #[test]
    fn test_invalid_tokens() {
        assert!(parse_size("", false).is_err());
        assert!(parse_size("50", false).is_err());
        assert!(parse_size("0%", false).is_err());
        assert!(parse_size("-50%", false).is_err());
        assert!(parse_size("abc%", false).is_err());
        assert!(parse_size("50.5%", false).is_err(), "percent must be an integer");
        assert!(parse_size("1x", true).is_err(), "1x is just a call");
        assert!(parse_size("0.5x", true).is_err());
        assert!(parse_size("allin", false).is_err());
    }

    #[test]
    fn test_options_from_specs() {
        let opts = BetSizeOptions::try_from_specs("50%, 100%, a", "3x, a").unwrap();
        assert_eq!(
            opts.bet,
            vec![
                BetSize::PotPercent(0.5),
                BetSize::PotPercent(1.0),
                BetSize::AllIn
            ]
        );
        assert_eq!(
            opts.raise,
            vec![BetSize::LastBetMultiple(3.0), BetSize::AllIn]
        );
    }

    #[test]
    fn test_options_sorted_and_deduped() {
        let opts = BetSizeOptions::try_from_specs("a, 100%, 50%, 50%", "").unwrap();
        assert_eq!(
            opts.bet,
            vec![
                BetSize::PotPercent(0.5),
                BetSize::PotPercent(1.0),
                BetSize::AllIn
            ]
        );
        assert!(opts.raise.is_empty());
    }

    #[test]
    fn test_empty_specs_allowed() {
        let opts = BetSizeOptions::try_from_specs("", "  ").unwrap();
        assert!(opts.bet.is_empty());
        assert!(opts.raise.is_empty());
    }

    #[test]
    fn test_multiple_in_raise_list_only() {
        assert!(BetSizeOptions::try_from_specs("3x", "3x").is_err());
        assert!(BetSizeOptions::try_from_specs("50%", "3x").is_ok());
    }
}
