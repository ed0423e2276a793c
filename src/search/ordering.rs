//! Root move list preparation: legality filtering, mate-in-1 tagging,
//! the depth-1 pre-search that seeds the sort, and the fifty-move-rule
//! resort.

use crate::board::{
    CheckList, Color, Move, MoveList, Promotions, FLAG_NONE, INFINITY_SCORE, MVV_LVA_50_NOK,
    MVV_LVA_50_OK, MVV_LVA_ILLEGAL, MVV_LVA_MATE_1,
};

use super::{sort_move_list, sort_moves_by_values, SearchContext, SORT_THRESHOLD};

impl SearchContext<'_> {
    /// Generate the root moves: evasions when in check, everything
    /// otherwise. Illegal moves are disarmed and sorted to the tail;
    /// immediate mates are ranked on top. Returns (checkers, legal count).
    pub(crate) fn root_move_list(&mut self, moves: &mut MoveList, color: Color) -> (usize, usize) {
        let mut checks = CheckList::new();
        let n_checks = self.board.in_check_info(color, &mut checks);
        if n_checks > 0 {
            self.board
                .gen_evasions(color, moves, &self.tables, &checks, Promotions::Full);
        } else {
            self.board
                .gen_all_moves(color, moves, &self.tables, -1, Promotions::Full);
        }

        let next_color = color.opp();
        let mut legal = 0;
        for i in 0..moves.len() {
            let mv = moves[i];
            self.board.push_status();
            self.board.make_move(mv);
            if self.board.in_check(color) {
                moves[i].flag = FLAG_NONE;
                moves[i].order = MVV_LVA_ILLEGAL;
            } else {
                // rank mate in 1 on top; this keeps pathological
                // many-queens test positions instant
                if self.board.in_check(next_color) && self.board.is_checkmate_now() {
                    moves[i].order = MVV_LVA_MATE_1;
                }
                legal += 1;
            }
            self.board.retract_last_move();
            self.board.pop_status();
        }
        sort_move_list(moves);
        (n_checks, legal)
    }

    /// Depth-1 pre-search: play every root move and quiesce it with a
    /// full window; the scores become the sort keys. Returns the best
    /// score and the drop from best to second best (easy-move signal).
    pub(crate) fn play_and_sort_moves(
        &mut self,
        moves: &mut MoveList,
        len: usize,
        next_color: Color,
    ) -> (i32, i32) {
        let mut values = [0i32; crate::board::MAXMV];
        values[0] = -INFINITY_SCORE;

        for i in 0..len {
            let mv = moves[i];
            values[i] = if mv.flag == FLAG_NONE {
                -INFINITY_SCORE
            } else {
                self.board.push_status();
                self.board.make_move(mv);
                let score = if self.board.check_for_draw(self.starting_mv) {
                    self.draw_score(next_color.opp())
                } else {
                    -self.quiescence(-INFINITY_SCORE, INFINITY_SCORE, next_color, false, 0)
                };
                self.board.retract_last_move();
                self.board.pop_status();
                score
            };
        }

        if len > 1 {
            sort_moves_by_values(&mut moves.as_mut_slice()[..len], &mut values[..len]);
            (values[0], values[0] - values[1])
        } else {
            (values[0], SORT_THRESHOLD)
        }
    }

    /// Near the fifty-move draw, prefer quiet non-pawn moves the opponent
    /// cannot answer with a capture of the moved piece: any of them holds
    /// the draw without handing the GUI an adjudication puzzle. Trashes
    /// the PV because the normal ordering no longer applies.
    pub(crate) fn sort_50_moves(
        &mut self,
        player_move: &mut Move,
        moves: &mut MoveList,
        move_cnt: usize,
        color: Color,
    ) {
        if self.board.fifty_moves < 99 {
            return;
        }
        let next_color = color.opp();

        for i in 0..move_cnt {
            let mv = moves[i];
            if mv.order == MVV_LVA_MATE_1 {
                continue;
            }
            let moving_piece = self.board.kind_at(mv.from_sq());
            let target = self.board.kind_at(mv.to_sq());

            if moving_piece.is_pawn() || !target.is_empty() {
                moves[i].order = MVV_LVA_50_NOK;
                continue;
            }

            self.board.push_status();
            self.board.make_move(mv);

            let is_checking = i8::from(self.board.in_check(next_color));

            // can the opponent legally capture anything, in particular
            // the piece we just moved?
            let mut captures = MoveList::new();
            self.board.gen_captures_and_promotions(
                next_color,
                &mut captures,
                &self.tables,
                Promotions::QueenOnly,
            );
            let mut legal_captures = false;
            let mut takes_mover = i8::from(false);
            for k in 0..captures.len() {
                let cap = captures[k];
                self.board.push_status();
                self.board.make_move(cap);
                if !self.board.in_check(next_color) {
                    legal_captures = true;
                    if cap.to_sq() == mv.to_sq() {
                        takes_mover = 1;
                    }
                }
                self.board.retract_last_move();
                self.board.pop_status();
            }

            moves[i].order = if !legal_captures {
                // a check that cannot be answered by a capture may even
                // be mate, which outranks the fifty-move draw
                MVV_LVA_50_OK + is_checking
            } else {
                MVV_LVA_50_NOK - is_checking - takes_mover
            };

            self.board.retract_last_move();
            self.board.pop_status();
        }
        sort_move_list(moves);
        *player_move = Move::NONE;
    }
}
