//! The NegaScout interior node.
//!
//! Odd levels are the engine's turns and use the first transposition
//! table, even levels the opponent's. A node's returned line is the
//! continuation *after* its best move; the caller prepends the move it
//! played, which is why the best-move index travels back separately.

use crate::board::geometry::FILE_MASK;
use crate::board::{
    compress_move, decompress_move, Board, CheckList, Color, Kind, Move, MoveList, Promotions,
    EXCHANGE_VALUE, MVV_LVA_HASH, MVV_LVA_PV, MVV_LVA_TACTICAL, MVV_LVA_THREAT, NIL, PAWN_V,
};
use crate::eval::{EG_PIECES, NULL_PIECES};
use crate::tt::Bound;

use super::{
    sort_moves, swap_best_to_top, CurrMoveMode, SearchContext, FUTILITY_MARGINS, FUTIL_DEPTH,
    HIGH_EVAL_NOISE, IID_DEPTH, LMR_DEPTH_LIMIT, LMR_MOVES, NULL_START_DEPTH, PV_ADD_DEPTH,
};
use super::Line;
use crate::board::MAX_DEPTH;

impl SearchContext<'_> {
    /// Tag the PV, hash and null-threat moves in a fresh move list with
    /// their ordering scores. Returns false when IID is pointless because
    /// a PV or hash move already leads the list.
    fn adjust_priorities(
        moves: &mut [Move],
        pv_move: Move,
        hash_move: Move,
        threat_move: Move,
    ) -> bool {
        let mut should_iid = true;
        let want_pv = !pv_move.is_none();
        let want_hash = !hash_move.is_none() && hash_move != pv_move;
        let want_threat =
            !threat_move.is_none() && threat_move != pv_move && threat_move != hash_move;
        if !want_pv && !want_hash && !want_threat {
            return should_iid;
        }
        for m in moves.iter_mut() {
            if want_pv && *m == pv_move {
                m.order = MVV_LVA_PV;
                should_iid = false;
            } else if want_hash && *m == hash_move {
                m.order = MVV_LVA_HASH;
                should_iid = false;
            } else if want_threat && *m == threat_move {
                m.order = MVV_LVA_THREAT;
            }
        }
        should_iid
    }

    /// Reductions are unsound near promotion or in basic endgames where
    /// zugzwang rules.
    fn endgame_reduct_ok(board: &Board) -> bool {
        if board.lone_king(Color::White)
            || board.lone_king(Color::Black)
            || board.at_most_one_piece(Color::White)
            || board.at_most_one_piece(Color::Black)
        {
            return false;
        }
        for file in 1..=8usize {
            if board.kind_at(30 + file) == Kind::BPAWN || board.kind_at(80 + file) == Kind::WPAWN {
                return false;
            }
        }
        true
    }

    /// One NegaScout node. Returns the score and the index of the best
    /// move in `moves` (None for terminal or fail-low nodes).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn negascout(
        &mut self,
        can_null: bool,
        level: i32,
        pline: &mut Line,
        moves: &mut MoveList,
        n_given: usize,
        depth: i32,
        alpha: i32,
        beta: i32,
        color: Color,
        is_pv_node: bool,
        being_in_check: bool,
        threat_move: Move,
        following_pv: bool,
    ) -> (i32, Option<usize>) {
        let mate_score = self.mate_score_here();
        pline.clear();

        if alpha >= mate_score {
            return (alpha, None);
        }
        if beta <= -mate_score {
            return (beta, None);
        }

        if depth <= 0 {
            let do_checks = self.settings.eval_noise < HIGH_EVAL_NOISE;
            return (self.quiescence(alpha, beta, color, do_checks, 0), None);
        }

        self.g_nodes += 1;

        if self.root_distance() >= MAX_DEPTH - 1 {
            return (self.quiescence(alpha, beta, color, true, 0), None);
        }

        let our_side = level & 1 == 1;
        let hash = self.board.pos_hash();
        let mut hash_best = Move::NONE;

        if !is_pv_node {
            let (value, mv) = self
                .tts
                .probe(our_side, self.board, color, alpha, beta, depth, hash);
            if !mv.is_none() {
                hash_best = mv;
            }
            if let Some(t) = value {
                if !hash_best.is_none() {
                    pline.cmoves[0] = compress_move(hash_best);
                    pline.len = 1;
                }
                return (t, None);
            }
        } else if level > 1 {
            // PV nodes never take the hash value, only the move hint;
            // a value cutoff would truncate the variation
            let (_, mv) = self.tts.probe_pv(our_side, self.board, color, depth, hash);
            if !mv.is_none() {
                hash_best = mv;
            }
        }

        // level 2 keeps a per-root-move reply cache across iterations
        if level == 2 && hash_best.is_none() {
            hash_best = decompress_move(self.opp_move_cache[self.root_move_index]);
        }

        let eval = self.flattened_eval(color);
        if eval.material_enough == 0 {
            // dead material cannot come back to life further down
            self.tts
                .store(our_side, depth, 0, Bound::Exact, hash, Move::NONE);
            return (0, None);
        }
        let e = eval.score;
        let next_color = color.opp();

        let mut null_best = Move::NONE;
        if !is_pv_node && !being_in_check {
            // reverse futility: a quiet position far above beta stands
            let last_quiet =
                self.board.mv_stack[self.board.mv_stack_p].mv.order < MVV_LVA_TACTICAL;
            if last_quiet
                && depth < FUTIL_DEPTH
                && e - FUTILITY_MARGINS[depth as usize] >= beta
                && (eval.material_enough >= EG_PIECES || Self::endgame_reduct_ok(self.board))
            {
                return (e, None);
            }

            if can_null && depth >= NULL_START_DEPTH && eval.material_enough >= NULL_PIECES {
                let next_depth = depth - (3 + depth / 4) - i32::from(e >= beta + PAWN_V);
                let mut line = Line::EMPTY;
                let mut child_moves = MoveList::new();
                let (t, iret) = self.negascout(
                    false,
                    level + 1,
                    &mut line,
                    &mut child_moves,
                    0,
                    next_depth,
                    -beta,
                    -beta + 1,
                    next_color,
                    false,
                    false,
                    Move::NONE,
                    false,
                );
                let t = -t;
                if t >= beta {
                    return (t, None);
                }
                if let Some(idx) = iret {
                    // what the opponent does after a pass is a threat
                    null_best = child_moves[idx];
                }
            }
        }

        let mut n = n_given;
        let mut hash_move_mode = false;
        let mut should_iid = true;
        if n == 0 {
            if hash_best.is_none() || following_pv {
                n = self.board.gen_all_moves(
                    color,
                    moves,
                    &self.tables,
                    level - 1,
                    Promotions::Full,
                );
                let pv_move = if following_pv && self.persist.global_pv.len as i32 > level - 1 {
                    decompress_move(self.persist.global_pv.cmoves[(level - 1) as usize])
                } else {
                    Move::NONE
                };
                should_iid =
                    Self::adjust_priorities(moves.as_mut_slice(), pv_move, hash_best, null_best);
            } else {
                // try the hash move alone first; it usually cuts, and the
                // full generation can wait until it fails
                hash_move_mode = true;
                should_iid = false;
                moves.clear();
                moves.push(hash_best);
                n = 2;
            }
        }

        if should_iid && depth > IID_DEPTH && level > 1 {
            // internal iterative deepening stands in for a missing hash
            // move; the root is pre-sorted and never needs it
            let mut line = Line::EMPTY;
            let (_, iret) = self.negascout(
                can_null,
                level,
                &mut line,
                moves,
                n,
                depth / 3,
                alpha,
                beta,
                color,
                is_pv_node,
                being_in_check,
                threat_move,
                following_pv,
            );
            if let Some(idx) = iret {
                moves[idx].order = MVV_LVA_HASH;
            }
        }

        let mut a = alpha;
        let mut best_index: Option<usize> = None;
        let mut node_moves = 0usize;
        let mut node_pruned_moves = false;

        if level > 1 {
            let top = n.min(moves.len());
            swap_best_to_top(&mut moves.as_mut_slice()[..top]);
        }

        self.poll_time();

        let mut i = 0;
        while i < n {
            if level > 1 && i == 1 {
                if hash_move_mode {
                    // the hash move failed to cut: now build the real list
                    n = self.board.gen_all_moves(
                        color,
                        moves,
                        &self.tables,
                        level - 1,
                        Promotions::Full,
                    );
                    if n <= 1 {
                        // the hash move was the only pseudo-legal move
                        break;
                    }
                    Self::adjust_priorities(
                        moves.as_mut_slice(),
                        Move::NONE,
                        hash_best,
                        null_best,
                    );
                    sort_moves(moves.as_mut_slice());
                } else {
                    sort_moves(&mut moves.as_mut_slice()[1..n]);
                }
            } else if level == 1 {
                self.curr_move = moves[i];
                self.curr_move_number = i;
                self.root_move_index = i;
                if self.settings.show_currmove == CurrMoveMode::Continuously
                    && self.time_is_up.is_none()
                    && self.timer.output_time >= 1500
                {
                    let line = format!(
                        "info currmove {} currmovenumber {}",
                        moves[i].to_uci(),
                        i + 1
                    );
                    self.printer.line(&line);
                }
            }

            let mv = moves[i];
            self.board.push_status();
            self.board.make_move(mv);
            if self.board.in_check(color) {
                self.board.retract_last_move();
                self.board.pop_status();
                i += 1;
                continue;
            }

            let mut threat_best = Move::NONE;
            let mut child_moves = MoveList::new();
            let mut line = Line::EMPTY;
            let t;
            if self.board.check_for_draw(self.starting_mv) {
                t = self.draw_score(color);
            } else {
                let mut checks = CheckList::new();
                let n_checks = self.board.in_check_info(next_color, &mut checks);
                let mut x2len = 0usize;
                let mut can_reduct = false;
                let mut next_depth;
                if n_checks > 0 {
                    // the move gives check: keep the depth at shallow
                    // levels so short mates stay inside the horizon
                    next_depth = if depth <= 4 && self.settings.eval_noise < HIGH_EVAL_NOISE {
                        depth
                    } else {
                        depth - 1
                    };
                    x2len = self.board.gen_evasions(
                        next_color,
                        &mut child_moves,
                        &self.tables,
                        &checks,
                        Promotions::Full,
                    );
                } else {
                    can_reduct = !being_in_check
                        && mv.order < MVV_LVA_TACTICAL
                        && (eval.material_enough >= EG_PIECES
                            || Self::endgame_reduct_ok(self.board));
                    if can_reduct
                        && !is_pv_node
                        && depth < FUTIL_DEPTH
                        && e + FUTILITY_MARGINS[depth as usize] < a
                    {
                        // futility-pruned, but it was still a legal move:
                        // remember that for the stalemate check below
                        self.board.retract_last_move();
                        self.board.pop_status();
                        node_pruned_moves = true;
                        i += 1;
                        continue;
                    }
                    next_depth = depth - 1;
                    if self.time_is_up.is_none() {
                        let pawn_flag = Kind::WPAWN.recolor(color).0 as u8;
                        let own_passed = match color {
                            Color::White => eval.w_passed,
                            Color::Black => eval.b_passed,
                        };
                        if eval.is_endgame
                            && depth <= 2
                            && mv.flag == pawn_flag
                            && own_passed & FILE_MASK[mv.to_sq()] != 0
                            && self.settings.eval_noise < HIGH_EVAL_NOISE
                        {
                            // mutual passed-pawn races decide endgames one
                            // tempo apart; don't let the horizon eat them
                            next_depth = depth;
                        } else if is_pv_node
                            && depth <= PV_ADD_DEPTH
                            && self.settings.eval_noise < HIGH_EVAL_NOISE
                        {
                            let sp = self.board.mv_stack_p;
                            let cap1 = self.board.mv_stack[sp].captured;
                            if cap1 != NIL && sp > 0 {
                                let cap2 = self.board.mv_stack[sp - 1].captured;
                                if cap2 != NIL {
                                    let v1 = EXCHANGE_VALUE
                                        [self.board.arena[cap1 as usize].kind.0 as usize];
                                    let v2 = EXCHANGE_VALUE
                                        [self.board.arena[cap2 as usize].kind.0 as usize];
                                    if v1 == v2 {
                                        // equal exchanges delay the horizon
                                        next_depth = depth;
                                    }
                                }
                            }
                        }
                    }
                }

                let follows_pv = following_pv
                    && self.persist.global_pv.len as i32 > level - 1
                    && compress_move(mv) == self.persist.global_pv.cmoves[(level - 1) as usize];

                let mut score;
                let mut iret;
                if node_moves == 0 {
                    let child_pv = beta > a + 1;
                    let (s, r) = self.negascout(
                        true,
                        level + 1,
                        &mut line,
                        &mut child_moves,
                        x2len,
                        next_depth,
                        -beta,
                        -a,
                        next_color,
                        child_pv,
                        n_checks > 0,
                        null_best,
                        follows_pv,
                    );
                    score = -s;
                    iret = r;
                } else {
                    if can_reduct && node_moves >= LMR_MOVES && depth >= LMR_DEPTH_LIMIT {
                        // late quiet moves run reduced with a null window;
                        // depth 3 keeps one full ply so the child still
                        // sees check evasions before quiescence
                        let reduced = if node_moves < 2 * LMR_MOVES || depth <= 3 {
                            depth - 2
                        } else {
                            depth - 3
                        };
                        let (s, r) = self.negascout(
                            true,
                            level + 1,
                            &mut line,
                            &mut child_moves,
                            x2len,
                            reduced,
                            -a - 1,
                            -a,
                            next_color,
                            false,
                            n_checks > 0,
                            null_best,
                            follows_pv,
                        );
                        score = -s;
                        iret = r;
                    } else {
                        score = a + 1; // force the scout search
                        iret = None;
                    }
                    if score > a {
                        let (s, r) = self.negascout(
                            true,
                            level + 1,
                            &mut line,
                            &mut child_moves,
                            x2len,
                            next_depth,
                            -a - 1,
                            -a,
                            next_color,
                            false,
                            n_checks > 0,
                            null_best,
                            follows_pv,
                        );
                        score = -s;
                        iret = r;
                        if score > a && score < beta {
                            let (s, r) = self.negascout(
                                true,
                                level + 1,
                                &mut line,
                                &mut child_moves,
                                x2len,
                                next_depth,
                                -beta,
                                -a,
                                next_color,
                                true,
                                n_checks > 0,
                                null_best,
                                follows_pv,
                            );
                            score = -s;
                            iret = r;
                        }
                    }
                }
                if let Some(idx) = iret {
                    threat_best = child_moves[idx];
                }
                t = score;
            }

            let was_capture = self.board.mv_stack[self.board.mv_stack_p].captured != NIL;
            let moved_kind = self.board.kind_at(mv.to_sq());
            self.board.retract_last_move();
            self.board.pop_status();

            if self.time_is_up.is_some() {
                return (a, best_index);
            }

            if level == 1 && !threat_best.is_none() {
                self.opp_move_cache[i] = compress_move(threat_best);
            }

            if t > a {
                a = t;
                best_index = Some(i);
                // the returned line is the continuation after this move:
                // the child's best reply plus the child's own line
                if !threat_best.is_none() {
                    pline.assign(compress_move(threat_best), &line);
                } else {
                    pline.len = 0;
                }
                if a >= beta {
                    if !was_capture && !moved_kind.is_king() {
                        self.tables
                            .note_killer(color, (level - 1) as usize, compress_move(mv));
                    }
                    self.tts
                        .store(our_side, depth, a, Bound::CheckBeta, hash, mv);
                    return (a, best_index);
                }
                if !was_capture {
                    self.tables
                        .note_history(color, moved_kind, mv.to_sq(), depth);
                }
            }
            node_moves += 1;
            i += 1;
        }

        if node_moves == 0 {
            if !node_pruned_moves {
                if being_in_check {
                    let dist = self.root_distance();
                    if self.settings.eval_noise <= 0 || self.mate_noise_sees(dist) {
                        a = -mate_score;
                    } else {
                        a = e; // mate overlooked under noise
                    }
                } else {
                    a = 0; // stalemate
                }
            }
            // all moves futility-pruned: alpha stands as is
            best_index = None;
        }

        if a > alpha {
            let best = best_index.map_or(Move::NONE, |idx| moves[idx]);
            self.tts.store(our_side, depth, a, Bound::Exact, hash, best);
        } else {
            self.tts
                .store(our_side, depth, a, Bound::CheckAlpha, hash, Move::NONE);
        }
        (a, best_index)
    }
}
