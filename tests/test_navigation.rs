//! Cursor navigation over the built tree: playing actions, dealing
//! chance cards, history replay, and the misuse error paths.

use flopcfr::cards::parse_card;
use flopcfr::{Action, Player, PostflopGame, SolverError, SpotConfig};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn flop_game() -> PostflopGame {
    PostflopGame::new(SpotConfig {
        oop_range: "AA,KK".to_string(),
        ip_range: "QQ,JJ".to_string(),
        flop: "2c7d9h".to_string(),
        turn: None,
        river: None,
        starting_pot: 100,
        effective_stack: 400,
        bet_sizes: "50%,a".to_string(),
        raise_sizes: "3x".to_string(),
    })
    .unwrap()
}

// ---------------------------------------------------------------------------
// Basic movement
// ---------------------------------------------------------------------------

#[test]
fn root_presents_oop_to_act() {
    let game = flop_game();
    assert_eq!(game.current_player(), Some(Player::Oop));
    assert!(!game.is_chance_node());
    assert!(!game.is_terminal_node());
    assert!(game.history().is_empty());
    assert_eq!(
        game.available_actions(),
        &[Action::Check, Action::Bet(50), Action::AllIn(400)],
    );
}

#[test]
fn checking_through_reaches_the_turn_deal() {
    let mut game = flop_game();
    game.play(0).unwrap();
    game.play(0).unwrap();

    assert!(game.is_chance_node());
    assert_eq!(game.current_player(), None);
    assert!(game.available_actions().is_empty());
    assert_eq!(
        game.chance_cards().len(),
        49,
        "a three-card board leaves 49 turn cards",
    );

    game.play(10).unwrap();
    assert_eq!(game.current_player(), Some(Player::Oop));
    assert_eq!(game.history(), &[0, 0, 10]);
}

#[test]
fn bet_fold_ends_the_hand() {
    let mut game = flop_game();
    game.play(1).unwrap();
    assert_eq!(game.current_player(), Some(Player::Ip));
    assert_eq!(
        game.available_actions(),
        &[Action::Fold, Action::Call, Action::Raise(150)],
        "facing a half-pot bet IP should see fold, call, and the 3x raise",
    );

    game.play(0).unwrap();
    assert!(game.is_terminal_node());
    assert!(game.available_actions().is_empty());
    assert!(matches!(game.play(0), Err(SolverError::AtTerminalNode)));
}

#[test]
fn out_of_range_action_is_rejected() {
    let mut game = flop_game();
    match game.play(7) {
        Err(SolverError::InvalidActionIndex { index, limit }) => {
            assert_eq!(index, 7);
            assert_eq!(limit, 3);
        }
        other => panic!("expected InvalidActionIndex, got {:?}", other),
    }
    assert!(game.history().is_empty(), "a rejected play must not move the cursor");
}

// ---------------------------------------------------------------------------
// Reset and replay
// ---------------------------------------------------------------------------

#[test]
fn back_to_root_restores_the_root_actions() {
    let mut game = flop_game();
    let root_actions = game.available_actions().to_vec();

    game.play(1).unwrap();
    game.play(1).unwrap();
    assert_ne!(game.available_actions(), root_actions.as_slice());

    game.back_to_root();
    assert_eq!(game.available_actions(), root_actions.as_slice());
    assert!(game.history().is_empty());
    assert_eq!(game.current_player(), Some(Player::Oop));
}

#[test]
fn apply_history_replays_and_rolls_back_on_error() {
    let mut game = flop_game();
    game.apply_history(&[0, 0, 5]).unwrap();
    assert_eq!(game.history(), &[0, 0, 5]);

    let err = game.apply_history(&[0, 99]).unwrap_err();
    assert!(matches!(err, SolverError::InvalidActionIndex { .. }));
    assert!(
        game.history().is_empty(),
        "a failed replay must leave the cursor at the root",
    );
    assert_eq!(
        game.available_actions(),
        &[Action::Check, Action::Bet(50), Action::AllIn(400)],
    );
}

// ---------------------------------------------------------------------------
// Chance deals and hand liveness
// ---------------------------------------------------------------------------

#[test]
fn dealt_card_kills_colliding_hands() {
    let mut game = flop_game();
    game.play(0).unwrap();
    game.play(0).unwrap();

    let ace = parse_card("As").unwrap();
    let index = game
        .chance_cards()
        .iter()
        .position(|&c| c == ace)
        .expect("the ace of spades is still in the deck");
    game.play(index).unwrap();

    let equities = game.equity(Player::Oop);
    for (hand, &eq) in game.private_cards(Player::Oop).iter().zip(&equities) {
        if hand.0 == ace || hand.1 == ace {
            assert_eq!(eq, 0.0, "{} collides with the dealt turn card", hand);
        } else {
            assert!(eq > 0.0, "{} is live and should have equity", hand);
        }
    }
}
