//! Cross-module board behavior: legality, draw bookkeeping, and the
//! invariants that make/unmake must preserve over whole games.

use mailbox::board::{Board, Color, Move, MoveList};
use rand::prelude::*;

fn play_random_game(seed: u64, max_plies: usize) -> (Board, Vec<Move>) {
    let mut board = Board::startpos();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut played = Vec::new();
    for _ in 0..max_plies {
        let side = board.side_to_move();
        let mut list = MoveList::new();
        if board.gen_legal_moves(side, &mut list) == 0 {
            break;
        }
        let mv = list[rng.gen_range(0..list.len())];
        board.push_status();
        board.make_move(mv);
        played.push(mv);
    }
    (board, played)
}

#[test]
fn test_random_games_roundtrip_to_startpos() {
    for seed in 0..20 {
        let reference = Board::startpos();
        let (mut board, played) = play_random_game(seed, 60);

        for _ in 0..played.len() {
            board.retract_last_move();
            board.pop_status();
        }

        assert_eq!(board.pos_hash(), reference.pos_hash(), "seed {seed}");
        assert_eq!(board.pawn_hash(), reference.pawn_hash(), "seed {seed}");
        assert_eq!(board.material(), reference.material(), "seed {seed}");
        assert_eq!(board.to_fen(), reference.to_fen(), "seed {seed}");
    }
}

#[test]
fn test_incremental_hash_always_matches_scratch() {
    for seed in 0..10 {
        let (board, _) = play_random_game(seed + 1000, 80);
        assert_eq!(board.pos_hash(), board.hash_from_scratch(), "seed {seed}");
    }
}

#[test]
fn test_legal_moves_never_leave_check() {
    for seed in 0..10 {
        let (mut board, _) = play_random_game(seed + 2000, 40);
        let side = board.side_to_move();
        let mut list = MoveList::new();
        board.gen_legal_moves(side, &mut list);
        for i in 0..list.len() {
            let mv = list[i];
            board.push_status();
            board.make_move(mv);
            assert!(!board.in_check(side), "{} leaves check", mv.to_uci());
            board.retract_last_move();
            board.pop_status();
        }
    }
}

#[test]
fn test_generated_moves_pass_legality_check() {
    for seed in 0..10 {
        let (mut board, _) = play_random_game(seed + 3000, 50);
        let side = board.side_to_move();
        let mut list = MoveList::new();
        board.gen_legal_moves(side, &mut list);
        for m in list.iter() {
            assert!(board.check_move_legality(*m, side), "{}", m.to_uci());
        }
    }
}

#[test]
fn test_repetition_counting() {
    let mut board = Board::startpos();
    let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
    for _ in 0..2 {
        for mv_str in shuffle {
            let mv = find_move(&mut board, mv_str);
            board.update_fifty_for(mv);
            board.push_status();
            board.make_move(mv);
        }
    }
    // startpos occurred three times with white to move
    assert_eq!(board.repetitions(), 3);
    assert!(board.check_for_draw(board.mv_stack_p));
}

#[test]
fn test_fifty_move_counter_resets() {
    let mut board = Board::startpos();
    for mv_str in ["g1f3", "g8f6", "f3g1", "f6g8"] {
        let mv = find_move(&mut board, mv_str);
        board.update_fifty_for(mv);
        board.push_status();
        board.make_move(mv);
    }
    assert_eq!(board.fifty_moves(), 4);
    let pawn_push = find_move(&mut board, "e2e4");
    board.update_fifty_for(pawn_push);
    board.push_status();
    board.make_move(pawn_push);
    assert_eq!(board.fifty_moves(), 0);
}

#[test]
fn test_castling_rights_forfeit_by_rook_moves() {
    let mut board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    for mv_str in ["a1b1", "a8b8", "h1g1", "h8g8"] {
        let mv = find_move(&mut board, mv_str);
        board.push_status();
        board.make_move(mv);
    }
    // both rooks moved on both sides: castling is gone for good
    let mut list = MoveList::new();
    board.gen_legal_moves(Color::White, &mut list);
    assert!(list
        .iter()
        .all(|m| !(m.from_sq() == 25 && (m.to_sq() == 27 || m.to_sq() == 23))));
}

#[test]
fn test_en_passant_only_immediately() {
    let mut board =
        Board::from_fen("rnbqkbnr/ppp1pppp/8/8/3p4/8/PPPPPPPP/RNBQKBNR w KQkq - 0 3").unwrap();
    let double = find_move(&mut board, "c2c4");
    board.push_status();
    board.make_move(double);
    // the capture is available now
    let mut list = MoveList::new();
    board.gen_legal_moves(Color::Black, &mut list);
    assert!(list.iter().any(|m| m.to_uci() == "d4c3"));
    // ... but not after a waiting move pair
    let wait_b = find_move(&mut board, "g8f6");
    board.push_status();
    board.make_move(wait_b);
    let wait_w = find_move(&mut board, "g1f3");
    board.push_status();
    board.make_move(wait_w);
    board.gen_legal_moves(Color::Black, &mut list);
    assert!(!list.iter().any(|m| m.to_uci() == "d4c3"));
}

fn find_move(board: &mut Board, uci: &str) -> Move {
    let side = board.side_to_move();
    let mut list = MoveList::new();
    board.gen_legal_moves(side, &mut list);
    *list
        .iter()
        .find(|m| m.to_uci() == uci)
        .unwrap_or_else(|| panic!("move {uci} not legal"))
}
