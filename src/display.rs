use std::cmp::Ordering;
use std::collections::HashSet;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::cards::{simplify_hand, Card, Suit};
use crate::range::{Range, StartingHand};
use crate::tree::Action;

const RANGE_GRID_RANKS: [char; 13] = [
    'A', 'K', 'Q', 'J', 'T', '9', '8', '7', '6', '5', '4', '3', '2',
];

/// 13x13 grid with the range's hand classes highlighted.
pub fn range_grid(range: &Range, title: &str) -> String {
    let in_range: HashSet<String> = range.hands().map(|h| simplify_hand(h.0, h.1)).collect();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("")];
    for &r in &RANGE_GRID_RANKS {
        header.push(Cell::new(r).set_alignment(CellAlignment::Center));
    }
    table.set_header(header);

    for (i, &r1) in RANGE_GRID_RANKS.iter().enumerate() {
        let mut row = vec![Cell::new(format!("{}", r1).bold().to_string())];
        for (j, &r2) in RANGE_GRID_RANKS.iter().enumerate() {
            let hand = if i == j {
                format!("{}{}", r1, r2)
            } else if i < j {
                format!("{}{}s", r1, r2)
            } else {
                format!("{}{}o", r2, r1)
            };

            let cell = if in_range.contains(hand.as_str()) {
                Cell::new(hand.green().bold().to_string())
            } else {
                Cell::new(hand.dimmed().to_string())
            };
            row.push(cell.set_alignment(CellAlignment::Center));
        }
        table.add_row(row);
    }

    format!("  {}\n{}", title.bold(), table)
}

pub fn board_display(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|card| {
            let text = format!("{}{}", card.rank.to_char(), card.suit.symbol());
            match card.suit {
                Suit::Spades => text.white().to_string(),
                Suit::Hearts => text.red().to_string(),
                Suit::Diamonds => text.blue().to_string(),
                Suit::Clubs => text.green().to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn styled_action(action: &Action) -> String {
    let label = action.to_string();
    match action {
        Action::Fold => label.dimmed().bold().to_string(),
        Action::Check => label.yellow().bold().to_string(),
        Action::Call => label.green().bold().to_string(),
        Action::Bet(_) | Action::Raise(_) | Action::AllIn(_) => label.red().bold().to_string(),
    }
}

pub fn frequency_bar(fraction: f64, width: usize) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * width as f64) as usize;
    let bar: String = "\u{2588}".repeat(filled) + &"\u{2591}".repeat(width - filled);
    let pct = format!("{:.1}%", fraction * 100.0);

    if fraction >= 0.6 {
        format!("{} {}", bar.green(), pct)
    } else if fraction >= 0.4 {
        format!("{} {}", bar.yellow(), pct)
    } else {
        format!("{} {}", bar.red(), pct)
    }
}

/// One line per action with its aggregate frequency bar.
pub fn frequency_lines(actions: &[Action], frequencies: &[f64]) -> String {
    let mut out = String::new();
    for (action, &freq) in actions.iter().zip(frequencies) {
        // Pad before styling so the ANSI escapes don't skew the column.
        let label = format!("{:<12}", action.to_string());
        let label = match action {
            Action::Fold => label.dimmed().bold().to_string(),
            Action::Check => label.yellow().bold().to_string(),
            Action::Call => label.green().bold().to_string(),
            _ => label.red().bold().to_string(),
        };
        out.push_str(&format!("  {} {}\n", label, frequency_bar(freq, 24)));
    }
    out
}

/// Per-hand strategy at a node: one row per hand sorted by weight,
/// one column per action, probabilities in percent.
pub fn strategy_table(
    hands: &[StartingHand],
    actions: &[Action],
    strategy: &[f64],
    weights: &[f64],
    max_rows: usize,
) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![
        Cell::new("Hand"),
        Cell::new("Weight").set_alignment(CellAlignment::Right),
    ];
    for action in actions {
        header.push(Cell::new(styled_action(action)).set_alignment(CellAlignment::Center));
    }
    table.set_header(header);

    let num_hands = hands.len();
    let mut order: Vec<usize> = (0..num_hands).collect();
    order.sort_by(|&a, &b| weights[b].partial_cmp(&weights[a]).unwrap_or(Ordering::Equal));

    for &h in order.iter().take(max_rows) {
        if weights[h] == 0.0 {
            continue;
        }
        let mut row = vec![
            Cell::new(hands[h].to_string().bold().to_string()),
            Cell::new(format!("{:.2}%", weights[h] * 100.0)).set_alignment(CellAlignment::Right),
        ];
        for a in 0..actions.len() {
            let p = strategy[a * num_hands + h];
            row.push(Cell::new(format!("{:.1}%", p * 100.0)).set_alignment(CellAlignment::Right));
        }
        table.add_row(row);
    }
    table.to_string()
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("  {}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{}", msg.green().bold());
}
