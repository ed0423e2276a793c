//! The root of a move computation: time setup, root move list, the
//! depth-1 pre-search, easy-move detection, PV continuation across moves,
//! and the iterative deepening loop with its aspiration window.

use crate::board::{
    compress_move, decompress_move, Color, Move, MoveList, INFINITY_SCORE, INF_MATE_1,
    MATE_CUTOFF, MAX_DEPTH, MVV_LVA_MATE_1,
};

use super::control::{StopReason, INFINITE_TIME, MAX_THROTTLE_NPS};
use super::{
    find_put_to_top, find_put_to_top_root, sort_moves, Line, SearchContext, SearchRequest,
    EASY_DEPTH, EASY_MARGIN_DOWN, EASY_MARGIN_UP, EASY_THRESHOLD, ID_WINDOW_DEPTH, ID_WINDOW_SIZE,
    PRE_DEPTH, START_DEPTH,
};

/// What a move request produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchVerdict {
    MoveFound(Move),
    /// The side to move is checkmated.
    Mate,
    /// The side to move is stalemated.
    Stalemate,
    /// No move: failed mate search or empty searchmoves list.
    NoMove,
}

impl SearchContext<'_> {
    /// Emit the per-iteration `info` line.
    fn print_move_output(&mut self, depth: i32, score: i32) {
        let time_passed = self.timer.now_ms();
        let nps = if time_passed > 0 {
            self.g_nodes * 1000 / time_passed as u64
        } else {
            0
        };
        let score_field = if score > MATE_CUTOFF {
            format!("mate {}", (INFINITY_SCORE - score + 1) / 2)
        } else if score < -MATE_CUTOFF {
            format!("mate {}", -(INFINITY_SCORE + score + 1) / 2)
        } else {
            format!("cp {score}")
        };
        let hashfull = if self.normal_time {
            format!(" hashfull {}", self.tts.usage_permill())
        } else {
            // bullet time: skip the table scan
            String::new()
        };
        let pv = self.format_pv(&self.persist.global_pv);
        let line = format!(
            "info depth {} seldepth {} score {} time {} nodes {} nps {}{} tbhits {} pv {}",
            depth,
            self.seldepth.max(depth),
            score_field,
            time_passed,
            self.g_nodes,
            nps,
            hashfull,
            self.eval.tb_hits,
            pv,
        );
        self.printer.line(&line);
    }

    /// Minimum thinking time in milliseconds, by game phase; in-check
    /// positions get half since there is little to choose from.
    fn min_thinking_time(&self) -> i64 {
        if !self.board.game_started_from_0 {
            return 10;
        }
        let move_number = (self.board.start_moves + self.board.mv_stack_p as i32) / 2 + 1;
        match move_number {
            ..=9 => 10,
            10..=35 => 20,
            36..=40 => 15,
            41..=60 => 10,
            61..=80 => 7,
            _ => 5,
        }
    }

    /// Compute the best move for the current position. The worker has
    /// already run the book probe and the position vetting.
    pub fn get_best_move(&mut self, request: &SearchRequest, mut player_move: Move) -> SearchVerdict {
        let color = self.board.side_to_move();
        let mut full_move_time = request.move_time;
        let exact_time = request.exact_time;

        // throttling only kicks in after the pre-search
        self.timer.throttle_time = INFINITE_TIME;
        self.timer.effective_max_nps_rate = MAX_THROTTLE_NPS;
        self.timer.effective_cpu_speed = 100;

        let mut easy_depth = EASY_DEPTH;
        if request.cpu_speed <= 5 || request.max_nps_rate <= 50_000 {
            easy_depth = EASY_DEPTH - 2;
        } else if request.cpu_speed <= 20 || request.max_nps_rate <= 200_000 {
            easy_depth = EASY_DEPTH - 1;
        }

        let min_time = self.min_thinking_time();
        self.timer.stop_time = full_move_time - request.move_overhead;
        if self.timer.stop_time < min_time {
            if !exact_time {
                self.timer.stop_time = min_time;
            }
            self.normal_time = false;
            if easy_depth == EASY_DEPTH {
                easy_depth = EASY_DEPTH - 2;
            }
        } else {
            self.normal_time = true;
        }

        self.time_is_up = None;
        self.g_nodes = 1;
        self.g_max_nodes = request.max_nodes;
        self.seldepth = 0;
        self.curr_move = Move::NONE;
        self.curr_move_number = 0;
        self.eval.tb_hits = 0;
        self.tables.reset();
        self.starting_mv = self.board.mv_stack_p;

        let is_analysis = exact_time && full_move_time == INFINITE_TIME;

        let mut movelist = MoveList::new();
        let (in_check, mut move_cnt) = self.root_move_list(&mut movelist, color);

        if move_cnt == 0 {
            return if in_check > 0 {
                SearchVerdict::Mate
            } else {
                SearchVerdict::Stalemate
            };
        }

        // searchmoves: keep only the given moves, in their given order
        if !request.given_moves.is_empty() {
            let mut actual = 0usize;
            for given in &request.given_moves {
                if actual >= move_cnt {
                    break;
                }
                find_put_to_top(&mut movelist.as_mut_slice()[actual..], *given);
                if movelist[actual] == *given {
                    actual += 1;
                }
            }
            if actual == 0 {
                return SearchVerdict::NoMove;
            }
            move_cnt = actual;
            sort_moves(&mut movelist.as_mut_slice()[..move_cnt]);
        }

        let mate_in_1 = movelist[0].order == MVV_LVA_MATE_1;

        // dedicated mate searcher
        if request.mate_depth > 0 {
            return self.run_mate_mode(request, &mut movelist, move_cnt, mate_in_1, in_check > 0, color, is_analysis);
        }

        let no_threat_move = Move::NONE;
        self.sort_50_moves(&mut player_move, &mut movelist, move_cnt, color);

        // age out the oldest hash generation, unless under extreme time
        // pressure where even the sweep is too expensive
        if full_move_time >= request.move_overhead * 10 {
            self.tts.cut_tables();
        }
        self.timer.start_time_nps = self.timer.now_ms();

        let reduced_move_time;
        if !exact_time {
            let half_min_time = (min_time + 1) / 2;
            if in_check > 0 {
                full_move_time /= 2;
                self.timer.stop_time = full_move_time - request.move_overhead;
                if self.timer.stop_time < half_min_time {
                    self.timer.stop_time = half_min_time;
                }
            }
            reduced_move_time = (self.timer.stop_time * 55 + 50) / 100;
        } else {
            reduced_move_time = full_move_time;
        }

        let mut pv_hit = false;
        let mut score_drop;
        let mut pos_score;
        let failsafe_cmove;

        if mate_in_1 {
            self.persist.global_pv.cmoves[0] = compress_move(movelist[0]);
            self.persist.global_pv.len = 1;
            pos_score = if self.board.fifty_moves < 100 {
                INF_MATE_1
            } else {
                0
            };
            self.persist.game_info.valid = true;
            self.persist.game_info.eval = pos_score;
            self.persist.game_info.depth = 1;
            player_move = Move::NONE;
            score_drop = 2 * EASY_THRESHOLD;
            failsafe_cmove = self.persist.global_pv.cmoves[0];
        } else {
            // depth check only: fish the root hash move out of the table
            let (_, hash_best) = self.tts.probe(
                true,
                self.board,
                color,
                INFINITY_SCORE,
                -INFINITY_SCORE,
                PRE_DEPTH,
                self.board.pos_hash(),
            );

            if !player_move.is_none()
                && self.persist.global_pv.len >= 3
                && self.persist.global_pv.cmoves[1] == compress_move(player_move)
            {
                // the opponent followed the PV: shift it down two plies
                let pv = &mut self.persist.global_pv;
                for i in 0..pv.len - 2 {
                    pv.cmoves[i] = pv.cmoves[i + 2];
                }
                pv.len -= 2;
                if pv.len as i32 > PRE_DEPTH {
                    pv_hit = true;
                }
                let first = decompress_move(self.persist.global_pv.cmoves[0]);
                find_put_to_top(&mut movelist.as_mut_slice()[..move_cnt], first);
            } else {
                self.persist.global_pv.clear();
            }

            let (sort_max, drop) =
                self.play_and_sort_moves(&mut movelist, move_cnt, color.opp());
            score_drop = drop;

            self.persist.game_info.valid = true;
            if !pv_hit {
                self.persist.global_pv.cmoves[0] = compress_move(movelist[0]);
                self.persist.global_pv.len = 1;
                pos_score = sort_max;
                self.persist.game_info.eval = sort_max;
                self.persist.game_info.depth = PRE_DEPTH;
            } else {
                // trust last move's evaluation, adjusting mate distances
                pos_score = match self.persist.game_info.last_valid_eval {
                    Some(last) if last > MATE_CUTOFF => last + 2,
                    Some(last) if last < -MATE_CUTOFF => last - 2,
                    Some(last) => last,
                    None => sort_max,
                };
                self.persist.game_info.eval = pos_score;
                self.persist.game_info.depth = self.persist.global_pv.len as i32;

                if move_cnt < 2 && !exact_time {
                    // forced move with a PV in hand: just play it
                    self.print_move_output(self.persist.game_info.depth, pos_score);
                    return SearchVerdict::MoveFound(decompress_move(
                        self.persist.global_pv.cmoves[0],
                    ));
                }
            }
            failsafe_cmove = compress_move(movelist[0]);

            if !hash_best.is_none() {
                find_put_to_top(&mut movelist.as_mut_slice()[..move_cnt], hash_best);
            }
            if pv_hit {
                let first = decompress_move(self.persist.global_pv.cmoves[0]);
                find_put_to_top(&mut movelist.as_mut_slice()[..move_cnt], first);
            }
        }

        // the easy-move shortcut needs more than a big score drop: the
        // pre-search must agree with what we already believed
        let last_eval = self.persist.game_info.last_valid_eval;
        let easy_plausible = (pv_hit && failsafe_cmove == self.persist.global_pv.cmoves[0])
            || mate_in_1
            || matches!(last_eval, Some(last) if {
                let delta = pos_score - last;
                delta < EASY_MARGIN_UP && delta > EASY_MARGIN_DOWN
            });
        if !easy_plausible || exact_time || !request.given_moves.is_empty() {
            score_drop = 0;
        }

        self.opp_move_cache = [crate::board::CMove::NONE; crate::board::MAXMV];

        // now the pre-search is done: arm the throttle
        self.timer.effective_max_nps_rate = request.max_nps_rate;
        self.timer.effective_cpu_speed = request.cpu_speed;
        self.timer.calc_throttle(self.timer.now_ms());
        if self.timer.effective_cpu_speed < 100 {
            self.timer.throttle_time =
                self.timer.now_ms() + i64::from(self.timer.effective_cpu_speed) * 10;
        }

        let mut nscore = pos_score;
        let mut printed_nodes = 0u64;
        let max_depth = request.max_depth.min(MAX_DEPTH - 1);

        let mut d = START_DEPTH;
        while d < MAX_DEPTH
            && d <= max_depth
            && (self.g_max_nodes == 0 || self.g_nodes < self.g_max_nodes)
        {
            let (mut alpha, mut beta) = if d >= ID_WINDOW_DEPTH {
                (
                    (nscore - ID_WINDOW_SIZE).max(-INFINITY_SCORE),
                    (nscore + ID_WINDOW_SIZE).min(INFINITY_SCORE),
                )
            } else {
                (-INFINITY_SCORE, INFINITY_SCORE)
            };

            let mut line = Line::EMPTY;
            let mut ret_idx;
            loop {
                let (score, idx) = self.negascout(
                    false,
                    1,
                    &mut line,
                    &mut movelist,
                    move_cnt,
                    d,
                    alpha,
                    beta,
                    color,
                    true,
                    in_check > 0,
                    no_threat_move,
                    true,
                );
                nscore = score;
                ret_idx = idx;

                if alpha == -INFINITY_SCORE && beta == INFINITY_SCORE {
                    break;
                }
                if self.time_is_up.is_some() {
                    break;
                }
                if self.g_max_nodes != 0 && self.g_nodes >= self.g_max_nodes {
                    break;
                }

                if nscore <= alpha {
                    // fail low: the return index is empty, open the window
                    alpha = -INFINITY_SCORE;
                } else if nscore >= beta {
                    beta = INFINITY_SCORE;
                    if let Some(idx) = ret_idx {
                        if idx > 1 {
                            // keep the refuting move near the top for the
                            // re-search without adopting it as PV yet
                            let ret_move = movelist[idx];
                            let cache = &mut self.opp_move_cache;
                            find_put_to_top_root(
                                &mut movelist.as_mut_slice()[1..move_cnt],
                                &mut cache[1..move_cnt],
                                ret_move,
                            );
                        }
                    }
                } else {
                    break;
                }
            }

            if let Some(idx) = ret_idx {
                // retain the old PV when the new line is a shorter prefix
                // of it; the ordering benefits, especially on PV hits
                let new_first = compress_move(movelist[idx]);
                let mut copy_line_pv = self.persist.global_pv.cmoves[0] != new_first
                    || self.persist.global_pv.len <= line.len + 1;
                if !copy_line_pv {
                    for i in 0..line.len {
                        if self.persist.global_pv.cmoves[i + 1] != line.cmoves[i] {
                            copy_line_pv = true;
                            break;
                        }
                    }
                }

                if copy_line_pv {
                    self.persist.game_info.valid = true;
                    self.persist.game_info.eval = nscore;
                    self.persist.game_info.depth = d;
                    pos_score = nscore;
                    let decomp = movelist[idx];
                    self.persist.global_pv.assign(new_first, &line);
                    let cache = &mut self.opp_move_cache;
                    find_put_to_top_root(
                        &mut movelist.as_mut_slice()[..move_cnt],
                        &mut cache[..move_cnt],
                        decomp,
                    );
                }

                self.print_move_output(d, pos_score);
                printed_nodes = self.g_nodes;

                if ((pos_score > MATE_CUTOFF || pos_score < -MATE_CUTOFF || move_cnt < 2)
                    && !exact_time)
                    || self.time_is_up.is_some()
                {
                    break;
                }
            }

            // outstanding pre-search move still leading: play it early
            if score_drop >= EASY_THRESHOLD
                && d >= easy_depth
                && failsafe_cmove == self.persist.global_pv.cmoves[0]
            {
                break;
            }

            if self.timer.now_ms() > reduced_move_time {
                // more than 55% of the budget gone: the next iteration
                // would not finish anyway
                self.time_is_up = Some(StopReason::Timeout);
                break;
            }
            d += 1;
        }

        if printed_nodes < self.g_nodes {
            self.print_move_output(self.persist.game_info.depth, self.persist.game_info.eval);
        }

        let answer = decompress_move(self.persist.global_pv.cmoves[0]);
        if is_analysis && self.time_is_up != Some(StopReason::Abort) {
            self.wait_for_abort();
            self.print_move_output(self.persist.game_info.depth, self.persist.game_info.eval);
        }
        SearchVerdict::MoveFound(answer)
    }

    /// `go mate N` handling at the root.
    #[allow(clippy::too_many_arguments)]
    fn run_mate_mode(
        &mut self,
        request: &SearchRequest,
        movelist: &mut MoveList,
        move_cnt: usize,
        mate_in_1: bool,
        in_check: bool,
        color: Color,
        is_analysis: bool,
    ) -> SearchVerdict {
        // no pre-search in mate mode: arm the throttle right away
        self.timer.effective_max_nps_rate = request.max_nps_rate;
        self.timer.effective_cpu_speed = request.cpu_speed;
        self.timer.calc_throttle(self.timer.now_ms());
        if self.timer.effective_cpu_speed < 100 {
            self.timer.throttle_time =
                self.timer.now_ms() + i64::from(self.timer.effective_cpu_speed) * 10;
        }

        let mut line = Line::EMPTY;
        let found = if mate_in_1 {
            line.cmoves[0] = compress_move(movelist[0]);
            line.len = 1;
            true
        } else {
            self.mate_solution(
                request.mate_depth,
                movelist,
                move_cnt,
                &mut line,
                color,
                in_check,
            )
        };

        if found {
            self.persist.global_pv = line;
            self.persist.game_info.valid = true;
            self.persist.game_info.depth = line.len as i32;
            self.persist.game_info.eval = INFINITY_SCORE - line.len as i32;
            self.print_move_output(line.len as i32, INFINITY_SCORE - line.len as i32);
            let answer = decompress_move(line.cmoves[0]);
            if is_analysis && self.time_is_up != Some(StopReason::Abort) {
                self.wait_for_abort();
                self.print_move_output(line.len as i32, INFINITY_SCORE - line.len as i32);
            }
            SearchVerdict::MoveFound(answer)
        } else {
            self.persist.global_pv.clear();
            self.print_move_output(request.mate_depth * 2 - 1, 0);
            if is_analysis && self.time_is_up != Some(StopReason::Abort) {
                self.wait_for_abort();
            }
            SearchVerdict::NoMove
        }
    }
}
