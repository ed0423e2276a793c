//! UCI command parsing.
//!
//! Commands arrive from the ring buffer already lowercased (FEN bodies
//! excepted). Parsing is defensive throughout: garbage tokens are skipped
//! or turn the whole command into `Unknown` rather than anything louder.

use crate::board::geometry::sq_from_str;
use crate::board::{Board, Kind, Move, MoveList, Promotions, FLAG_PIECE};
use crate::time::GoClocks;

/// A `go` command's payload.
#[derive(Clone, Debug, Default)]
pub struct GoParams {
    pub clocks: GoClocks,
    pub depth: Option<i32>,
    pub movetime: Option<i64>,
    pub nodes: Option<u64>,
    pub mate: Option<i32>,
    pub infinite: bool,
    pub ponder_move: Option<String>,
    pub searchmoves: Vec<String>,
}

#[derive(Clone, Debug)]
pub enum UciCommand {
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    Go(GoParams),
    Stop,
    Quit,
    UciNewGame,
    SetOption {
        name: String,
        value: Option<String>,
    },
    Perft(i32),
    PonderHit,
    Unknown(String),
}

/// Parse one line from the ring buffer.
#[must_use]
pub fn parse_command(line: &str) -> UciCommand {
    let trimmed = line.trim();
    let mut tokens = trimmed.split_whitespace();
    match tokens.next() {
        Some("position") => parse_position(trimmed),
        Some("go") => {
            let rest: Vec<&str> = tokens.collect();
            // "go perft N" is accepted as an alias of the perft command
            if rest.first() == Some(&"perft") {
                let depth = rest
                    .get(1)
                    .and_then(|t| t.parse::<i32>().ok())
                    .unwrap_or(1)
                    .clamp(1, 10);
                UciCommand::Perft(depth)
            } else {
                UciCommand::Go(parse_go(rest.into_iter()))
            }
        }
        Some("stop") => UciCommand::Stop,
        Some("quit") => UciCommand::Quit,
        Some("ucinewgame") => UciCommand::UciNewGame,
        Some("setoption") => parse_setoption(trimmed),
        Some("ponderhit") => UciCommand::PonderHit,
        Some("perft") => {
            let depth = tokens
                .next()
                .and_then(|t| t.parse::<i32>().ok())
                .unwrap_or(1)
                .clamp(1, 10);
            UciCommand::Perft(depth)
        }
        _ => UciCommand::Unknown(trimmed.to_string()),
    }
}

fn parse_position(line: &str) -> UciCommand {
    let rest = line["position".len()..].trim_start();
    if rest.is_empty() {
        return UciCommand::Unknown(line.to_string());
    }

    let (fen, moves_part) = if let Some(stripped) = rest.strip_prefix("startpos") {
        (None, stripped)
    } else if let Some(stripped) = rest.strip_prefix("fen") {
        let stripped = stripped.trim_start();
        match stripped.find(" moves ") {
            Some(idx) => (Some(stripped[..idx].trim().to_string()), &stripped[idx..]),
            None => {
                let fen = stripped
                    .strip_suffix("moves")
                    .unwrap_or(stripped)
                    .trim()
                    .to_string();
                (Some(fen), "")
            }
        }
    } else {
        return UciCommand::Unknown(line.to_string());
    };

    let moves = moves_part
        .trim_start()
        .strip_prefix("moves")
        .map(|m| m.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    UciCommand::Position { fen, moves }
}

fn parse_go<'a, I: Iterator<Item = &'a str>>(mut tokens: I) -> GoParams {
    let mut params = GoParams::default();
    while let Some(token) = tokens.next() {
        match token {
            "infinite" => params.infinite = true,
            "depth" => params.depth = next_i64(&mut tokens).map(|v| v as i32),
            "mate" => params.mate = next_i64(&mut tokens).map(|v| v as i32),
            "nodes" => params.nodes = next_i64(&mut tokens).map(|v| v.max(0) as u64),
            "movetime" => params.movetime = next_i64(&mut tokens),
            "wtime" => params.clocks.wtime = next_i64(&mut tokens),
            "btime" => params.clocks.btime = next_i64(&mut tokens),
            "winc" => params.clocks.winc = next_i64(&mut tokens).unwrap_or(0),
            "binc" => params.clocks.binc = next_i64(&mut tokens).unwrap_or(0),
            "movestogo" => params.clocks.moves_to_go = next_i64(&mut tokens).unwrap_or(0),
            "ponder" => {
                // a pondering GUI names the expected move; remember it so
                // a later ponderhit can treat it as a forced prefix
                if let Some(mv) = tokens.next() {
                    if looks_like_move(mv) {
                        params.ponder_move = Some(mv.to_string());
                    }
                }
            }
            "searchmoves" => {
                for mv in tokens.by_ref() {
                    if looks_like_move(mv) {
                        params.searchmoves.push(mv.to_string());
                    } else {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    params
}

fn next_i64<'a, I: Iterator<Item = &'a str>>(tokens: &mut I) -> Option<i64> {
    tokens.next().and_then(|t| t.parse::<i64>().ok())
}

fn looks_like_move(s: &str) -> bool {
    let b = s.as_bytes();
    (4..=5).contains(&b.len())
        && sq_from_str(&b[..2]).is_some()
        && sq_from_str(&b[2..4]).is_some()
}

fn parse_setoption(line: &str) -> UciCommand {
    // setoption name <name tokens> [value <value tokens>]
    let rest = line["setoption".len()..].trim_start();
    let Some(rest) = rest.strip_prefix("name") else {
        return UciCommand::Unknown(line.to_string());
    };
    let rest = rest.trim_start();
    match rest.find(" value ") {
        Some(idx) => UciCommand::SetOption {
            name: rest[..idx].trim().to_string(),
            value: Some(rest[idx + 7..].trim().to_string()),
        },
        None => UciCommand::SetOption {
            name: rest.trim().to_string(),
            value: None,
        },
    }
}

/// Build a move from wire notation ("e2e4", "e7e8q") against the current
/// board, with only format and piece-ownership checks. For input that was
/// already validated in an earlier replay of the same command.
#[must_use]
pub fn parse_move_trusted(board: &Board, s: &str) -> Option<Move> {
    let bytes = s.as_bytes();
    if !looks_like_move(s) {
        return None;
    }
    let from = sq_from_str(&bytes[..2])?;
    let to = sq_from_str(&bytes[2..4])?;

    let color = board.side_to_move();
    let mover = board.kind_at(from);
    if !mover.is_piece_of(color) {
        return None;
    }

    let flag = if mover.is_pawn() {
        if bytes.len() == 5 {
            let promo = Kind::from_char(bytes[4].to_ascii_lowercase() as char)?;
            if promo.is_pawn() || promo.is_king() {
                return None;
            }
            promo.recolor(color).0 as u8
        } else {
            mover.0 as u8
        }
    } else {
        if bytes.len() == 5 {
            return None;
        }
        FLAG_PIECE
    };

    Some(Move::new(from, to, flag, 0))
}

/// Turn a wire move into a board move, including the full legality test:
/// the move must be playable without leaving the own king in check.
#[must_use]
pub fn parse_move(board: &mut Board, s: &str) -> Option<Move> {
    let mv = parse_move_trusted(board, s)?;
    let color = board.side_to_move();
    if !board.check_move_legality(mv, color) {
        return None;
    }
    board.push_status();
    board.make_move(mv);
    let legal = !board.in_check(color);
    board.retract_last_move();
    board.pop_status();
    if legal {
        Some(mv)
    } else {
        None
    }
}

/// Find the generated counterpart of a wire move, keeping the generator's
/// flag and ordering. Used where the exact list entry matters.
#[must_use]
pub fn find_generated_move(board: &mut Board, s: &str) -> Option<Move> {
    let mv = parse_move(board, s)?;
    let color = board.side_to_move();
    let mut list = MoveList::new();
    board.gen_moves_for_square(color, mv.from_sq(), &mut list, Promotions::Full);
    list.iter().find(|m| **m == mv).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_go_clocks() {
        let cmd = parse_command("go wtime 30000 btime 29000 winc 500 binc 500 movestogo 12");
        let UciCommand::Go(params) = cmd else {
            panic!("not a go");
        };
        assert_eq!(params.clocks.wtime, Some(30000));
        assert_eq!(params.clocks.btime, Some(29000));
        assert_eq!(params.clocks.winc, 500);
        assert_eq!(params.clocks.moves_to_go, 12);
        assert!(!params.infinite);
    }

    #[test]
    fn test_parse_go_searchmoves_and_ponder() {
        let cmd = parse_command("go ponder e2e4 movetime 100");
        let UciCommand::Go(params) = cmd else {
            panic!("not a go");
        };
        assert_eq!(params.ponder_move.as_deref(), Some("e2e4"));
        assert_eq!(params.movetime, Some(100));

        let cmd = parse_command("go depth 5 searchmoves e2e4 d2d4");
        let UciCommand::Go(params) = cmd else {
            panic!("not a go");
        };
        assert_eq!(params.searchmoves, vec!["e2e4", "d2d4"]);
        assert_eq!(params.depth, Some(5));
    }

    #[test]
    fn test_parse_position_variants() {
        let UciCommand::Position { fen, moves } = parse_command("position startpos moves e2e4 e7e5")
        else {
            panic!("not a position");
        };
        assert!(fen.is_none());
        assert_eq!(moves, vec!["e2e4", "e7e5"]);

        let UciCommand::Position { fen, moves } =
            parse_command("position fen 4k3/8/8/8/8/8/8/4K3 w - - 0 1")
        else {
            panic!("not a position");
        };
        assert_eq!(fen.as_deref(), Some("4k3/8/8/8/8/8/8/4K3 w - - 0 1"));
        assert!(moves.is_empty());
    }

    #[test]
    fn test_parse_setoption() {
        let UciCommand::SetOption { name, value } =
            parse_command("setoption name hash value 128")
        else {
            panic!("not a setoption");
        };
        assert_eq!(name, "hash");
        assert_eq!(value.as_deref(), Some("128"));

        let UciCommand::SetOption { name, value } = parse_command("setoption name clear hash")
        else {
            panic!("not a setoption");
        };
        assert_eq!(name, "clear hash");
        assert!(value.is_none());
    }

    #[test]
    fn test_parse_move_rejects_garbage() {
        let mut board = Board::startpos();
        assert!(parse_move(&mut board, "e2e4").is_some());
        assert!(parse_move(&mut board, "e2e5").is_none()); // too far
        assert!(parse_move(&mut board, "e7e5").is_none()); // not our piece
        assert!(parse_move(&mut board, "zz99").is_none());
        assert!(parse_move(&mut board, "e1g1").is_none()); // can't castle yet
    }

    #[test]
    fn test_parse_move_promotion() {
        let mut board = Board::from_fen("8/P7/8/8/8/8/8/K1k5 w - - 0 1").unwrap();
        let mv = parse_move(&mut board, "a7a8q").unwrap();
        assert_eq!(mv.promotion(), Some(Kind::WQUEEN));
        assert!(parse_move(&mut board, "a7a8k").is_none());
    }

    #[test]
    fn test_parse_move_refuses_self_check() {
        // the e2 rook is pinned against the king by the e8 rook
        let mut board = Board::from_fen("4r2k/8/8/8/8/8/4R3/4K3 w - - 0 1").unwrap();
        assert!(parse_move(&mut board, "e2d2").is_none());
        assert!(parse_move(&mut board, "e2e5").is_some());
    }
}
