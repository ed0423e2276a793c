//! The worker thread: consumes command frames from the ring buffer,
//! drives the search, and prints the results.
//!
//! All search state is owned here. The input thread only touches the
//! ring, the abort flag and the events, so the `stop`/`go` ordering
//! guarantees reduce to the abort/abort-confirm handshake.

use rand::prelude::*;

use crate::board::{
    compress_move, decompress_move, Board, Color, Move, MoveList, MAX_DEPTH, MAX_PLIES, MAXMV,
};
use crate::book;
use crate::eval::Evaluator;
use crate::perft::PerftRun;
use crate::search::{
    SearchContext, SearchPersist, SearchRequest, SearchVerdict, INFINITE_TIME,
};
use crate::time::allot_move_time;
use crate::tt::TtPair;
use crate::uci::command::{parse_command, parse_move, parse_move_trusted, GoParams, UciCommand};
use crate::uci::options::{EngineOptions, OptionAction};
use crate::uci::EngineIo;

pub struct Worker {
    io: std::sync::Arc<EngineIo>,
    board: Board,
    tts: TtPair,
    eval: Evaluator,
    persist: SearchPersist,
    options: EngineOptions,
    side: Color,
    pos_illegal: bool,
    ponder_mode: bool,
    last_go: GoParams,
    old_pos_hash: u64,
    cont_pos_hashes: Vec<u64>,
    cont_pos_pv: Option<usize>,
    /// The already-validated prefix of the last `position` command, so a
    /// growing move list is only legality-checked in its new tail.
    valid_pos_cmd: String,
    rng: StdRng,
}

impl Worker {
    #[must_use]
    pub fn new(io: std::sync::Arc<EngineIo>) -> Worker {
        let options = EngineOptions::new();
        let tts = TtPair::new(options.hash_mb);
        Worker {
            io,
            board: Board::startpos(),
            tts,
            eval: Evaluator::new(),
            persist: SearchPersist::default(),
            options,
            side: Color::White,
            pos_illegal: false,
            ponder_mode: false,
            last_go: GoParams::default(),
            old_pos_hash: 0,
            cont_pos_hashes: Vec::new(),
            cont_pos_pv: None,
            valid_pos_cmd: String::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Main loop; returns on `quit`.
    pub fn run(&mut self) {
        loop {
            let line = loop {
                if let Some(line) = self.io.ring.read_cmd() {
                    break line;
                }
                // idle: sleep until the input thread enqueues something
                self.io.uci_event.wait_reset(60_000);
            };

            match parse_command(&line) {
                UciCommand::Go(params) => self.handle_go(params, false),
                UciCommand::PonderHit => {
                    if self.ponder_mode {
                        let params = self.last_go.clone();
                        self.handle_go(params, true);
                    }
                }
                UciCommand::Position { fen, moves } => self.handle_position(&line, fen, &moves),
                UciCommand::Stop => {
                    self.io.abort_event.wait_reset(0);
                    self.io.abort.reset();
                    self.io.abort_conf_event.set();
                }
                UciCommand::Quit => {
                    self.io.abort_event.wait_reset(0);
                    self.io.abort.reset();
                    self.io.abort_conf_event.set();
                    return;
                }
                UciCommand::UciNewGame => {
                    self.handle_newgame();
                    self.io.cmd_work_event.set();
                }
                UciCommand::SetOption { name, value } => {
                    self.handle_setoption(&name, value.as_deref());
                }
                UciCommand::Perft(depth) => self.handle_perft(depth),
                UciCommand::Unknown(cmd) => {
                    log::debug!("ignoring unknown command '{cmd}'");
                }
            }
        }
    }

    fn handle_newgame(&mut self) {
        self.pos_illegal = false;
        self.ponder_mode = false;
        self.old_pos_hash = 0;
        self.cont_pos_hashes.clear();
        self.cont_pos_pv = None;
        self.valid_pos_cmd.clear();
        self.side = Color::White;
        self.board = Board::startpos();
        self.reset_position_status();
    }

    /// Clear everything derived from the previous game: hash tables, the
    /// pawn cache, the PV and the stored evaluation.
    fn reset_position_status(&mut self) {
        self.tts.clear();
        self.tts.clear_counter = 0;
        self.eval.clear_cache();
        self.persist.global_pv.clear();
        self.persist.game_info = Default::default();
    }

    fn handle_setoption(&mut self, name: &str, value: Option<&str>) {
        match self.options.apply(name, value) {
            OptionAction::None => {}
            OptionAction::ClearHash => {
                self.tts.clear();
            }
            OptionAction::ResizeHash(mut mb) => {
                // free the old tables first, then retry at half size down
                // to the minimum if the allocation fails
                self.tts = TtPair::new(1);
                loop {
                    match TtPair::try_new(mb) {
                        Ok(tts) => {
                            self.tts = tts;
                            break;
                        }
                        Err(()) if mb > 1 => {
                            log::warn!("hash allocation of {mb} MiB failed, halving");
                            mb /= 2;
                        }
                        Err(()) => {
                            self.io
                                .printer
                                .line("info string error (hash allocation failed)");
                            break;
                        }
                    }
                }
                self.io.cmd_work_event.set();
            }
            OptionAction::ShowBookMoves => {
                let moves = book::line_string(&mut self.board);
                self.io.printer.line(&format!("info string book: {moves}"));
            }
        }
    }

    fn handle_position(&mut self, raw_line: &str, fen: Option<String>, moves: &[String]) {
        self.pos_illegal = false;
        self.ponder_mode = false;

        let parsed = match fen {
            Some(fen_str) => Board::from_fen(&fen_str),
            None => Ok(Board::startpos()),
        };
        let board = match parsed {
            Ok(board) => board,
            Err(err) => {
                self.io
                    .printer
                    .line(&format!("info string error (illegal position: {err})"));
                self.valid_pos_cmd.clear();
                self.pos_illegal = true;
                return;
            }
        };
        self.board = board;
        self.side = self.board.side_to_move();

        // a growing move list from the same game only needs its new tail
        // legality-checked
        let already_valid = !self.valid_pos_cmd.is_empty()
            && raw_line.starts_with(&self.valid_pos_cmd);
        let valid_moves = if already_valid && self.valid_pos_cmd.contains(" moves") {
            self.valid_pos_cmd
                .split_whitespace()
                .rev()
                .take_while(|t| *t != "moves")
                .count()
        } else {
            0
        };

        for (idx, mv_str) in moves.iter().enumerate() {
            let parsed = if idx < valid_moves {
                // replay of a validated prefix: skip the legality re-check
                parse_move_trusted(&self.board, mv_str)
            } else {
                parse_move(&mut self.board, mv_str)
            };
            let Some(mv) = parsed else {
                self.io
                    .printer
                    .line(&format!("info string error (illegal move: {mv_str})"));
                self.valid_pos_cmd.clear();
                self.pos_illegal = true;
                return;
            };
            self.board.update_fifty_for(mv);
            self.board.push_status();
            self.board.make_move(mv);
            self.side = self.side.opp();

            if self.board.mv_stack_p >= MAX_PLIES {
                self.io.printer.line(&format!(
                    "info string error (move list longer than {} plies)",
                    MAX_PLIES - 1
                ));
                self.valid_pos_cmd.clear();
                self.pos_illegal = true;
                return;
            }
        }
        self.valid_pos_cmd = raw_line.to_string();
    }

    /// `go`, and `ponderhit` continuing a `go ponder`.
    fn handle_go(&mut self, params: GoParams, is_ponderhit: bool) {
        if self.pos_illegal || self.board.in_check(self.side.opp()) {
            self.io
                .printer
                .lines(&["info string error (illegal position)", "bestmove 0000"]);
            return;
        }

        if !is_ponderhit {
            if self.ponder_mode {
                // a new go while pondering: retract the speculative move
                self.board.retract_last_move();
                self.board.pop_status();
                self.side = self.side.opp();
                self.ponder_mode = false;
            }

            if let Some(ponder_str) = params.ponder_move.clone() {
                // the ponder move is treated as a forced prefix: play it
                // and wait for ponderhit or a new position
                let Some(mv) = parse_move(&mut self.board, &ponder_str) else {
                    self.pos_illegal = true;
                    return;
                };
                self.board.update_fifty_for(mv);
                self.board.push_status();
                self.board.make_move(mv);
                self.side = self.side.opp();
                self.ponder_mode = true;
                self.last_go = params;
                self.last_go.ponder_move = None;
                return;
            }
            self.last_go = params.clone();
        }
        self.ponder_mode = false;

        // for a ponderhit the caller passes the stored go parameters
        let request = self.build_request(&params);

        // decide whether the hash tables still apply: same position,
        // a continuation of the game, or something entirely new
        let debug = self.io.debug.load(std::sync::atomic::Ordering::Relaxed);
        let mut player_move = Move::NONE;
        if self.options.keep_hash {
            let current_hash = self.board.pos_hash();
            if self.old_pos_hash == current_hash {
                // same position as last time: tables and history apply,
                // the PV does not
                if debug {
                    self.io
                        .printer
                        .line("info string debug: keeping hash tables, same position");
                }
            } else if !self.cont_pos_hashes.is_empty() {
                let found = self
                    .cont_pos_hashes
                    .iter()
                    .position(|&h| h == current_hash);
                if let Some(idx) = found {
                    if Some(idx) == self.cont_pos_pv && self.persist.global_pv.len >= 3 {
                        player_move = decompress_move(self.persist.global_pv.cmoves[1]);
                    }
                    self.tts.bump_age();
                    if debug {
                        self.io.printer.line(
                            "info string debug: keeping hash tables, continued position",
                        );
                    }
                } else {
                    self.reset_position_status();
                    if debug {
                        self.io
                            .printer
                            .line("info string debug: resetting hash tables");
                    }
                }
            } else if self.old_pos_hash != 0 {
                self.reset_position_status();
            }
        } else {
            self.reset_position_status();
        }

        // book probe: only in normal play, not for analysis or restricted
        // searches
        if self.options.own_book
            && request.move_time < INFINITE_TIME
            && request.given_moves.is_empty()
            && request.mate_depth == 0
        {
            let candidates = book::candidates(&mut self.board);
            if !candidates.is_empty() {
                let pick = candidates[self.rng.gen_range(0..candidates.len())];
                self.persist.global_pv.clear();
                self.persist.global_pv.cmoves[0] = compress_move(pick);
                self.persist.global_pv.len = 1;
                self.io.printer.lines(&[
                    &format!("info depth 1 score cp 1 nodes 1 pv {}", pick.to_uci()),
                    &format!("bestmove {}", pick.to_uci()),
                ]);
                self.old_pos_hash = self.board.pos_hash();
                self.gather_continuations(pick);
                return;
            }
        }

        let verdict = {
            let settings = self.options.search_settings();
            let mut ctx = SearchContext::new(
                &mut self.board,
                &mut self.tts,
                &mut self.eval,
                &mut self.persist,
                &self.io.abort,
                &self.io.abort_event,
                &self.io.printer,
                settings,
                self.side,
            );
            ctx.get_best_move(&request, player_move)
        };

        if self.persist.game_info.valid {
            self.persist.game_info.last_valid_eval = Some(self.persist.game_info.eval);
        }
        self.old_pos_hash = self.board.pos_hash();

        match verdict {
            SearchVerdict::MoveFound(mv) => {
                self.io.printer.line(&format!("bestmove {}", mv.to_uci()));
                self.gather_continuations(mv);
            }
            other => {
                self.cont_pos_hashes.clear();
                self.cont_pos_pv = None;
                let info = match other {
                    SearchVerdict::Mate => "info score mate 0 pv 0000",
                    SearchVerdict::Stalemate => "info score cp 0 pv 0000",
                    _ => {
                        if request.mate_depth > 0 {
                            "info string error (no mate found)"
                        } else if !request.given_moves.is_empty() {
                            "info string error (no legal search move)"
                        } else {
                            "info string error (no move available)"
                        }
                    }
                };
                self.io.printer.lines(&[info, "bestmove 0000"]);
            }
        }
    }

    fn build_request(&mut self, params: &GoParams) -> SearchRequest {
        let move_number =
            i64::from(self.board.start_moves + self.board.mv_stack_p as i32) / 2 + 1;

        let (move_time, exact_time) = if params.infinite {
            (INFINITE_TIME, true)
        } else if let Some(mt) = params.movetime {
            (mt, true)
        } else if params.clocks.wtime.is_some() || params.clocks.btime.is_some() {
            let (w, b) = allot_move_time(&params.clocks, move_number);
            let own = match self.side {
                Color::White => w,
                Color::Black => b,
            };
            (own, false)
        } else {
            // depth-, node- or mate-limited searches: no clock, but also
            // no analysis wait once the limit is reached
            (INFINITE_TIME - 42, false)
        };

        let mut given_moves = Vec::new();
        for mv_str in &params.searchmoves {
            if let Some(mv) = parse_move(&mut self.board, mv_str) {
                given_moves.push(mv);
            }
        }
        if !params.searchmoves.is_empty() && given_moves.is_empty() {
            // all given moves were illegal: keep one dummy so the search
            // reports "no legal search move" instead of ignoring the list
            given_moves.push(Move::NONE);
        }

        SearchRequest {
            move_time,
            move_overhead: self.options.move_overhead,
            exact_time,
            max_depth: params.depth.unwrap_or(MAX_DEPTH - 1).clamp(1, MAX_DEPTH - 1),
            max_nodes: params.nodes.unwrap_or(0),
            cpu_speed: self.options.cpu_speed,
            max_nps_rate: self.options.effective_nps(),
            mate_depth: params
                .mate
                .map(|m| m.clamp(1, (MAX_DEPTH - 1) / 2))
                .unwrap_or(0),
            given_moves,
        }
    }

    /// After answering, record the positions the opponent can reach and
    /// which of them follows our PV. GUIs that restart the move list from
    /// the last irreversible move (instead of `startpos`) still get
    /// recognized as a continued game this way.
    fn gather_continuations(&mut self, our_move: Move) {
        self.cont_pos_hashes.clear();
        self.cont_pos_pv = None;

        if !self.board.stack_headroom() {
            return;
        }
        self.board.push_status();
        self.board.make_move(our_move);

        let opp = self.side.opp();
        let mut list = MoveList::new();
        let count = self.board.gen_legal_moves(opp, &mut list).min(MAXMV);
        let pv_reply = if self.persist.global_pv.len >= 2 {
            self.persist.global_pv.cmoves[1]
        } else {
            crate::board::CMove::NONE
        };
        for i in 0..count {
            let mv = list[i];
            self.board.push_status();
            self.board.make_move(mv);
            self.cont_pos_hashes.push(self.board.pos_hash());
            if !pv_reply.is_none() && compress_move(mv) == pv_reply {
                self.cont_pos_pv = Some(i);
            }
            self.board.retract_last_move();
            self.board.pop_status();
        }

        self.board.retract_last_move();
        self.board.pop_status();
    }

    fn handle_perft(&mut self, depth: i32) {
        let start = std::time::Instant::now();
        let mut total = 0u64;
        {
            let mut run = PerftRun::new(&mut self.board, Some(&self.io.abort));
            let breakdown = run.divide(depth);
            if run.aborted() {
                self.io.printer.line("info string perft aborted");
            } else {
                for (mv, nodes) in &breakdown {
                    self.io.printer.line(&format!("info string {mv}: {nodes}"));
                    total += nodes;
                }
            }
        }
        let elapsed = start.elapsed().as_millis().max(1) as u64;
        self.io.printer.line(&format!(
            "info depth {} time {} nodes {} nps {}",
            depth,
            elapsed,
            total,
            total * 1000 / elapsed
        ));
        // a stop during perft leaves the abort flag set; clear it so the
        // next go is not stillborn
        self.io.abort.reset();
    }
}
