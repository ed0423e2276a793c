//! Perft: exhaustive legal move counting, the ground-truth oracle for
//! the move generator. Abortable, since deep counts take a while.

use crate::board::{Board, Color, MoveList};
use crate::sync::StopFlag;

/// Nodes between abort checks.
const PERFT_CHECK_NODES: u64 = 100_000;

pub struct PerftRun<'a> {
    board: &'a mut Board,
    abort: Option<&'a StopFlag>,
    nodes_until_check: u64,
    aborted: bool,
}

impl<'a> PerftRun<'a> {
    pub fn new(board: &'a mut Board, abort: Option<&'a StopFlag>) -> PerftRun<'a> {
        PerftRun {
            board,
            abort,
            nodes_until_check: PERFT_CHECK_NODES,
            aborted: false,
        }
    }

    #[must_use]
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    /// Count leaf nodes to `depth`; 0 when aborted midway.
    pub fn perft(&mut self, depth: i32) -> u64 {
        let color = self.board.side_to_move();
        self.walk(depth, color)
    }

    fn walk(&mut self, depth: i32, color: Color) -> u64 {
        if self.aborted {
            return 0;
        }
        self.nodes_until_check = self.nodes_until_check.saturating_sub(1);
        if self.nodes_until_check == 0 {
            self.nodes_until_check = PERFT_CHECK_NODES;
            if self.abort.is_some_and(StopFlag::is_set) {
                self.aborted = true;
                return 0;
            }
        }
        if depth == 0 {
            return 1;
        }

        let mut list = MoveList::new();
        let count = self.board.gen_legal_moves(color, &mut list);
        if depth == 1 {
            return count as u64;
        }

        let mut nodes = 0;
        for i in 0..list.len() {
            let mv = list[i];
            self.board.push_status();
            self.board.make_move(mv);
            nodes += self.walk(depth - 1, color.opp());
            self.board.retract_last_move();
            self.board.pop_status();
        }
        nodes
    }

    /// Per-root-move breakdown, for debugging generator discrepancies.
    pub fn divide(&mut self, depth: i32) -> Vec<(String, u64)> {
        let color = self.board.side_to_move();
        let mut list = MoveList::new();
        self.board.gen_legal_moves(color, &mut list);

        let mut out = Vec::with_capacity(list.len());
        for i in 0..list.len() {
            let mv = list[i];
            self.board.push_status();
            self.board.make_move(mv);
            let nodes = self.walk(depth - 1, color.opp());
            self.board.retract_last_move();
            self.board.pop_status();
            out.push((mv.to_uci(), nodes));
            if self.aborted {
                break;
            }
        }
        out
    }
}
