//! The dedicated mating solver behind `go mate N`.
//!
//! The trick is the tightening `check_depth`: in most composed problems
//! the final attacking moves are all checks, so the first pass only
//! allows check-giving moves for the attacker below that threshold. If no
//! mate falls out, the threshold loosens by one attacking move at a time
//! until the full tree is allowed. The defender always gets every move.

use crate::board::{
    compress_move, CheckList, Color, Move, MoveList, Promotions, INFINITY_SCORE, MATE_CUTOFF,
    MAX_DEPTH, MVV_LVA_CHECK, MVV_LVA_ILLEGAL, FLAG_NONE,
};
use crate::tt::Bound;

use super::{sort_moves, swap_best_to_top, CurrMoveMode, Line, SearchContext};

impl SearchContext<'_> {
    /// Pure mate search: full width for the defender, checks-only for the
    /// attacker once `depth` drops to `check_depth`. Returns a mate score
    /// or 0.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn negamate(
        &mut self,
        depth: i32,
        alpha: i32,
        beta: i32,
        color: Color,
        moves: &mut MoveList,
        move_cnt_given: usize,
        check_depth: i32,
        pline: &mut Line,
        in_check: bool,
    ) -> i32 {
        self.g_nodes += 1;
        pline.clear();

        if self.root_distance() >= MAX_DEPTH - 1 {
            return 0;
        }
        if self.board.check_for_draw(self.starting_mv) {
            return 0;
        }

        let our_side = color == self.computer_side;
        let hash = self.board.pos_hash();
        {
            let (value, _) = self
                .tts
                .probe(our_side, self.board, color, alpha, beta, depth, hash);
            if let Some(t) = value {
                return t;
            }
        }

        let root_node = move_cnt_given != 0;
        let mut move_cnt = move_cnt_given;
        if move_cnt == 0 {
            if in_check {
                let mut checks = CheckList::new();
                let _ = self.board.in_check_info(color, &mut checks);
                // underpromotion may be the point of the puzzle
                move_cnt = self.board.gen_evasions(
                    color,
                    moves,
                    &self.tables,
                    &checks,
                    Promotions::Full,
                );
            } else {
                move_cnt =
                    self.board
                        .gen_all_moves(color, moves, &self.tables, depth, Promotions::Full);
            }
        }

        let next_color = color.opp();

        // first phase: legality-check everything, tag check-giving moves,
        // and catch the terminal positions
        let mut actual_move_cnt = 0usize;
        let mut checking = 0usize;
        for i in 0..move_cnt {
            let mv = moves[i];
            self.board.push_status();
            self.board.make_move(mv);
            if self.board.in_check(color) {
                moves[i].flag = FLAG_NONE;
                moves[i].order = MVV_LVA_ILLEGAL;
            } else {
                if depth == 0 {
                    // a legal move at depth zero means no mate here
                    self.board.retract_last_move();
                    self.board.pop_status();
                    return 0;
                }
                actual_move_cnt += 1;
                if self.board.in_check(next_color) {
                    checking += 1;
                    moves[i].order = MVV_LVA_CHECK;
                }
            }
            self.board.retract_last_move();
            self.board.pop_status();
        }

        if depth == 0 {
            return -INFINITY_SCORE + self.root_distance();
        }
        if actual_move_cnt == 0 {
            return if in_check {
                -INFINITY_SCORE + self.root_distance()
            } else {
                0
            };
        }

        // odd plies below the threshold are the attacker's: checks only
        if depth <= check_depth && depth & 1 == 1 {
            if checking == 0 {
                return 0;
            }
            actual_move_cnt = checking;
        }

        swap_best_to_top(&mut moves.as_mut_slice()[..move_cnt]);

        self.poll_time();
        if self.time_is_up.is_some() {
            return 0;
        }

        let mut line = Line::EMPTY;
        let mut a = alpha;
        for i in 0..actual_move_cnt {
            if i == 1 {
                sort_moves(&mut moves.as_mut_slice()[1..move_cnt]);
            }
            let mv = moves[i];

            self.board.push_status();
            self.board.make_move(mv);

            if root_node {
                self.curr_move = mv;
                self.curr_move_number = i;
                if self.settings.show_currmove == CurrMoveMode::Continuously
                    && self.time_is_up.is_none()
                    && self.timer.output_time >= 1500
                {
                    let out = format!("info currmove {} currmovenumber {}", mv.to_uci(), i + 1);
                    self.printer.line(&out);
                }
            }

            let giving_check = mv.order == MVV_LVA_CHECK;
            let mut child_moves = MoveList::new();
            let score = -self.negamate(
                depth - 1,
                -beta,
                -a,
                next_color,
                &mut child_moves,
                0,
                check_depth,
                &mut line,
                giving_check,
            );
            self.board.retract_last_move();
            self.board.pop_status();

            if score > a {
                a = score;
                pline.assign(compress_move(mv), &line);

                if root_node && score > MATE_CUTOFF {
                    return score;
                }
                if score >= beta {
                    // the stored move only widens entry validation
                    self.tts
                        .store(our_side, depth, score, Bound::CheckBeta, hash, moves[0]);
                    let was_capture =
                        self.board.kind_at(mv.to_sq()) != crate::board::Kind::NONE;
                    let mover = self.board.kind_at(mv.from_sq());
                    if !was_capture && !mover.is_king() {
                        // the history here is indexed by depth, which
                        // works because negamate never extends
                        self.tables
                            .note_killer(color, depth as usize, compress_move(mv));
                    }
                    return score;
                }
            }
        }

        let bound = if a > alpha { Bound::Exact } else { Bound::CheckAlpha };
        self.tts.store(our_side, depth, a, bound, hash, moves[0]);
        a
    }

    /// Driver for `go mate N`: tighten `check_depth` from the full depth
    /// down by two until a mate appears or every scheme is exhausted.
    /// Returns true when a mate was found; `pline` holds the line.
    pub(crate) fn mate_solution(
        &mut self,
        mate_depth_moves: i32,
        moves: &mut MoveList,
        move_cnt: usize,
        pline: &mut Line,
        color: Color,
        in_check: bool,
    ) -> bool {
        pline.clear();
        let max_d = mate_depth_moves * 2 - 1;
        let mut res = 0;

        let mut check_depth = max_d;
        while check_depth > 0 && res <= MATE_CUTOFF && self.time_is_up.is_none() {
            self.tables.reset();
            self.tts.clear();
            res = self.negamate(
                max_d,
                0,
                INFINITY_SCORE,
                color,
                moves,
                move_cnt,
                check_depth,
                pline,
                in_check,
            );
            check_depth -= 2;
        }

        self.tables.reset();
        self.tts.clear();
        res > MATE_CUTOFF && self.time_is_up.is_none()
    }
}
