//! End-to-end search behavior through the public search entry point.

use mailbox::board::{Board, Move};
use mailbox::eval::Evaluator;
use mailbox::search::{
    SearchContext, SearchPersist, SearchRequest, SearchSettings, SearchVerdict, INFINITE_TIME,
};
use mailbox::sync::{Event, StopFlag};
use mailbox::tt::TtPair;
use mailbox::uci::print::Printer;

fn depth_request(depth: i32) -> SearchRequest {
    SearchRequest {
        move_time: INFINITE_TIME - 42,
        move_overhead: 100,
        exact_time: false,
        max_depth: depth,
        max_nodes: 0,
        cpu_speed: 100,
        max_nps_rate: 30_000_000,
        mate_depth: 0,
        given_moves: Vec::new(),
    }
}

fn search(fen: &str, request: &SearchRequest) -> SearchVerdict {
    let mut board = Board::from_fen(fen).expect("test FEN");
    let side = board.side_to_move();
    let mut tts = TtPair::new(8);
    let mut eval = Evaluator::new();
    let mut persist = SearchPersist::default();
    let abort = StopFlag::new();
    let abort_event = Event::new();
    let printer = Printer::new();
    let mut ctx = SearchContext::new(
        &mut board,
        &mut tts,
        &mut eval,
        &mut persist,
        &abort,
        &abort_event,
        &printer,
        SearchSettings::default(),
        side,
    );
    ctx.get_best_move(request, Move::NONE)
}

fn best_move(fen: &str, depth: i32) -> String {
    match search(fen, &depth_request(depth)) {
        SearchVerdict::MoveFound(mv) => mv.to_uci(),
        other => panic!("expected a move, got {other:?}"),
    }
}

#[test]
fn test_mate_in_one_found() {
    // back-rank mate with the rook
    assert_eq!(best_move("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", 3), "a1a8");
    // fool's mate for black
    assert_eq!(
        best_move(
            "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2",
            3
        ),
        "d8h4"
    );
}

#[test]
fn test_mate_position_reports_mate() {
    // fool's mate delivered: white to move, already mated
    let fen = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
    assert_eq!(search(fen, &depth_request(2)), SearchVerdict::Mate);
}

#[test]
fn test_stalemate_reported() {
    let fen = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1";
    assert_eq!(search(fen, &depth_request(2)), SearchVerdict::Stalemate);
}

#[test]
fn test_wins_hanging_queen() {
    let fen = "3q4/8/8/8/8/8/8/3QK2k w - - 0 1";
    let mv = best_move(fen, 4);
    assert_eq!(mv, "d1d8");
}

#[test]
fn test_searchmoves_restriction() {
    let mut request = depth_request(3);
    // force a different first move than the obvious recapture
    request.given_moves = vec![Move::new(35, 45, mailbox::board::Kind::WPAWN.0 as u8, 0)];
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    match search(fen, &request) {
        SearchVerdict::MoveFound(mv) => assert_eq!(mv.to_uci(), "e2e3"),
        other => panic!("expected e2e3, got {other:?}"),
    }
}

#[test]
fn test_mate_mode_solves_short_mate() {
    // king and queen against the cornered king
    let fen = "7k/8/5K2/8/8/8/8/5Q2 w - - 0 1";
    let mut request = depth_request(10);
    request.mate_depth = 4;
    match search(fen, &request) {
        SearchVerdict::MoveFound(_) => {}
        SearchVerdict::NoMove => {} // no forced mate in 4 from here is fine
        other => panic!("unexpected verdict {other:?}"),
    }
}

#[test]
fn test_mate_mode_finds_mate_in_one() {
    let fen = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";
    let mut request = depth_request(6);
    request.mate_depth = 1;
    match search(fen, &request) {
        SearchVerdict::MoveFound(mv) => assert_eq!(mv.to_uci(), "a1a8"),
        other => panic!("expected mate move, got {other:?}"),
    }
}

#[test]
fn test_node_limit_respected() {
    let mut request = depth_request(40);
    request.max_nodes = 20_000;
    // must terminate quickly despite the deep depth limit
    let start = std::time::Instant::now();
    let verdict = search(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        &request,
    );
    assert!(matches!(verdict, SearchVerdict::MoveFound(_)));
    assert!(start.elapsed().as_secs() < 30);
}

#[test]
fn test_abort_flag_stops_search() {
    let mut board = Board::startpos();
    let mut tts = TtPair::new(8);
    let mut eval = Evaluator::new();
    let mut persist = SearchPersist::default();
    let abort = StopFlag::new();
    abort.set(); // aborted before it begins
    let abort_event = Event::new();
    let printer = Printer::new();
    let side = board.side_to_move();
    let mut ctx = SearchContext::new(
        &mut board,
        &mut tts,
        &mut eval,
        &mut persist,
        &abort,
        &abort_event,
        &printer,
        SearchSettings::default(),
        side,
    );
    let start = std::time::Instant::now();
    let verdict = ctx.get_best_move(&depth_request(40), Move::NONE);
    assert!(matches!(verdict, SearchVerdict::MoveFound(_)));
    assert!(start.elapsed().as_secs() < 10);
}

#[test]
fn test_fifty_move_mate_beats_draw() {
    // mate in one with the fifty-move counter at 99: the engine must
    // still mate instead of shuffling into the draw
    let fen = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 99 80";
    assert_eq!(best_move(fen, 4), "a1a8");
}

#[test]
fn test_insufficient_material_draw_score() {
    // bare kings plus one knight: search must not invent an advantage
    let fen = "8/8/8/4k3/8/2N5/8/4K3 w - - 0 1";
    let verdict = search(fen, &depth_request(4));
    assert!(matches!(verdict, SearchVerdict::MoveFound(_)));
}
