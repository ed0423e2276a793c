//! Pseudo-legal move generation.
//!
//! Entry points per side: all moves, captures plus promotions (quiescence),
//! evasions from a precomputed checker list, and the moves of a single
//! piece. Every generated move carries its ordering score; captures use
//! MVV-LVA, quiet moves killer/history information or, failing that, the
//! distance to the enemy king. Legality (own king left in check) is the
//! caller's business via make/retract.

use super::attacks::CheckList;
use super::geometry::{
    rank_of, Sq, A1, A8, B1, B8, BISHOP_OFFSETS, C1, C8, D1, D8, E1, E8, F1, F8, G1, G8, H1, H8,
    KING_OFFSETS, KNIGHT_OFFSETS, ROOK_OFFSETS, SQ_NONE,
};
use super::state::{
    Board, BKMOVED, BRA8MOVED, BRH8MOVED, MAX_DEPTH, NIL, WKMOVED, WRA1MOVED, WRH1MOVED,
};
use super::types::{compress_move, CMove, Color, Kind, Move, MoveList, FLAG_PIECE};

pub const MAX_DEPTH_US: usize = MAX_DEPTH as usize;

/// Ordering scores. The exact values matter: the search recognizes move
/// classes by them (PV/hash/threat tagging, killer slots, the mate-in-1
/// marker at the root, the fifty-move resort).
pub const MVV_LVA_MATE_1: i8 = 127;
pub const MVV_LVA_PV: i8 = 126;
pub const MVV_LVA_HASH: i8 = 125;
pub const MVV_LVA_THREAT: i8 = 110;
pub const MVV_LVA_CSTL_SHORT: i8 = 91;
pub const MVV_LVA_CSTL_LONG: i8 = 85;
pub const MVV_LVA_KILLER_0: i8 = 2;
pub const MVV_LVA_KILLER_1: i8 = 1;
pub const MVV_LVA_TACTICAL: i8 = 0;
pub const MVV_LVA_ILLEGAL: i8 = -126;
pub const MVV_LVA_CHECK: i8 = 126;
pub const MVV_LVA_50_OK: i8 = 125;
pub const MVV_LVA_50_NOK: i8 = -124;

/// Generation without killer context.
pub const NO_LEVEL: i32 = -1;

/// Promotion policy: quiescence queens only, everything else generates
/// underpromotions as well.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Promotions {
    QueenOnly,
    Full,
}

/// Killer and history tables consulted while scoring quiet moves.
pub struct OrderingTables {
    /// killers[color][slot][level]
    pub killers: [[[CMove; MAX_DEPTH_US]; 2]; 2],
    /// history[color][kind base - 2][square]
    pub history: [[[i8; 120]; 6]; 2],
}

impl OrderingTables {
    #[must_use]
    pub fn new() -> OrderingTables {
        OrderingTables {
            killers: [[[CMove::NONE; MAX_DEPTH_US]; 2]; 2],
            history: [[[0; 120]; 6]; 2],
        }
    }

    pub fn reset(&mut self) {
        self.killers = [[[CMove::NONE; MAX_DEPTH_US]; 2]; 2];
        self.history = [[[0; 120]; 6]; 2];
    }

    /// Quiet-move score from killers (when a level is given) or history.
    #[inline]
    #[must_use]
    fn quiet_score(&self, color: Color, level: i32, mv: Move, kind: Kind) -> i8 {
        let c = color.index();
        if level >= 0 && (level as usize) < MAX_DEPTH_US {
            let cmove = compress_move(mv);
            if self.killers[c][0][level as usize] == cmove {
                return MVV_LVA_KILLER_0;
            }
            if self.killers[c][1][level as usize] == cmove {
                return MVV_LVA_KILLER_1;
            }
        }
        self.history[c][(kind.base() - 2) as usize][mv.to_sq()]
    }

    /// Record a quiet move that caused a beta cutoff.
    pub fn note_killer(&mut self, color: Color, level: usize, cmove: CMove) {
        if level < MAX_DEPTH_US && self.killers[color.index()][0][level] != cmove {
            self.killers[color.index()][1][level] = self.killers[color.index()][0][level];
            self.killers[color.index()][0][level] = cmove;
        }
    }

    /// Bump history for a quiet move that raised alpha. Values are
    /// negative: fresh entries start at -MAX_DEPTH, gain `depth` per hit,
    /// and saturate at -1 so that real killers still rank above them.
    pub fn note_history(&mut self, color: Color, kind: Kind, to: Sq, depth: i32) {
        let slot = &mut self.history[color.index()][(kind.base() - 2) as usize][to];
        if *slot == 0 {
            *slot = -(MAX_DEPTH as i8);
        }
        let bumped = i32::from(*slot) + depth;
        *slot = if bumped >= 0 { -1 } else { bumped as i8 };
    }

    pub fn reset_history(&mut self) {
        self.reset();
    }
}

impl Default for OrderingTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Context for one generation run.
struct Gen<'a> {
    tables: &'a OrderingTables,
    level: i32,
    color: Color,
    enemy_king: Sq,
}

impl Gen<'_> {
    #[inline]
    fn push(&self, board: &Board, list: &mut MoveList, from: Sq, to: Sq, flag: u8, score: i8) {
        let mut order = score;
        if score == MVV_LVA_TACTICAL {
            let kind = board.squares[from];
            let hist = self
                .tables
                .quiet_score(self.color, self.level, Move::new(from, to, flag, 0), kind);
            order = if hist != 0 {
                hist
            } else {
                // quiet fallback: prefer moves closer to the enemy king
                -((to as isize - self.enemy_king as isize).unsigned_abs() as i8)
            };
        }
        list.push(Move::new(from, to, flag, order));
    }
}

#[inline]
fn capture_score(victim: Kind, attacker: Kind) -> i8 {
    (((victim.base() as i32) << 4) - attacker.base() as i32) as i8
}

impl Board {
    fn for_each_piece<F: FnMut(&mut Board, u8, Kind, Sq)>(&mut self, color: Color, mut f: F) {
        let mut idx = Board::head(color);
        while idx != NIL {
            let slot = &self.arena[idx as usize];
            let (kind, sq) = (slot.kind, slot.sq as Sq);
            let next = slot.next;
            f(self, idx, kind, sq);
            idx = next;
        }
    }

    /// All pseudo-legal moves for `color`, castling included.
    pub fn gen_all_moves(
        &mut self,
        color: Color,
        list: &mut MoveList,
        tables: &OrderingTables,
        level: i32,
        promo: Promotions,
    ) -> usize {
        list.clear();
        let gen = Gen {
            tables,
            level,
            color,
            enemy_king: self.king_sq(color.opp()),
        };
        self.for_each_piece(color, |board, idx, kind, sq| {
            match kind.base() {
                2 => {
                    board.pawn_captures_and_promotions(&gen, list, sq, promo);
                    board.pawn_pushes(&gen, list, sq);
                }
                3 => board.leaper_moves(&gen, list, idx, sq, &KNIGHT_OFFSETS, 4),
                4 => board.slider_moves(&gen, list, idx, sq, &BISHOP_OFFSETS, 6),
                5 => board.slider_moves(&gen, list, idx, sq, &ROOK_OFFSETS, 7),
                6 => {
                    board.slider_moves(&gen, list, idx, sq, &ROOK_OFFSETS, 13);
                    board.slider_moves(&gen, list, idx, sq, &BISHOP_OFFSETS, 0);
                }
                _ => {
                    board.king_steps(&gen, list, sq);
                    board.castling_moves(&gen, list, sq);
                }
            }
        });
        list.len()
    }

    /// Captures and promotions only, for quiescence.
    pub fn gen_captures_and_promotions(
        &mut self,
        color: Color,
        list: &mut MoveList,
        tables: &OrderingTables,
        promo: Promotions,
    ) -> usize {
        list.clear();
        let gen = Gen {
            tables,
            level: NO_LEVEL,
            color,
            enemy_king: self.king_sq(color.opp()),
        };
        self.for_each_piece(color, |board, _idx, kind, sq| match kind.base() {
            2 => board.pawn_captures_and_promotions(&gen, list, sq, promo),
            3 => board.leaper_captures(&gen, list, sq, &KNIGHT_OFFSETS),
            4 => board.slider_captures(&gen, list, sq, &BISHOP_OFFSETS),
            5 => board.slider_captures(&gen, list, sq, &ROOK_OFFSETS),
            6 => {
                board.slider_captures(&gen, list, sq, &ROOK_OFFSETS);
                board.slider_captures(&gen, list, sq, &BISHOP_OFFSETS);
            }
            _ => board.leaper_captures(&gen, list, sq, &KING_OFFSETS),
        });
        list.len()
    }

    /// Evasions given the checker list from `in_check_info`. For a single
    /// checker the non-king targets are restricted to the checking ray and
    /// the checker itself; a double check allows king moves only.
    pub fn gen_evasions(
        &mut self,
        color: Color,
        list: &mut MoveList,
        tables: &OrderingTables,
        checks: &CheckList,
        promo: Promotions,
    ) -> usize {
        list.clear();
        let gen = Gen {
            tables,
            level: NO_LEVEL,
            color,
            enemy_king: self.king_sq(color.opp()),
        };

        let king_sq = self.king_sq(color);
        self.king_evasion_steps(&gen, list, king_sq, checks);
        if checks.pieces > 1 {
            return list.len();
        }

        self.for_each_piece(color, |board, idx, kind, sq| {
            board.arena[idx as usize].mobility = 0;
            match kind.base() {
                2 => {
                    let reachable = checks.squares[..checks.len].iter().any(|&att| {
                        let diff = att as isize - sq as isize;
                        let fwd = match color {
                            Color::White => diff,
                            Color::Black => -diff,
                        };
                        fwd == 9
                            || fwd == 10
                            || fwd == 11
                            || (fwd == 20 && rank_of(sq) == pawn_home_rank(color))
                            || (diff.abs() == 1 && rank_of(sq) == ep_rank(color))
                    });
                    if reachable {
                        board.pawn_captures_and_promotions(&gen, list, sq, promo);
                        board.pawn_pushes(&gen, list, sq);
                    }
                }
                3 => {
                    let reachable = checks.squares[..checks.len].iter().any(|&att| {
                        let d = (att as isize - sq as isize).abs();
                        d == 8 || d == 12 || d == 19 || d == 21
                    });
                    if reachable {
                        board.leaper_evasions(&gen, list, sq, &KNIGHT_OFFSETS, checks);
                        board.arena[idx as usize].mobility = -4;
                    }
                }
                4 => {
                    let reachable = checks.squares[..checks.len].iter().any(|&att| {
                        let d = (att as isize - sq as isize).abs();
                        d % 9 == 0 || d % 11 == 0
                    });
                    if reachable {
                        board.slider_evasions(&gen, list, sq, &BISHOP_OFFSETS, checks);
                        board.arena[idx as usize].mobility = -6;
                    }
                }
                5 => {
                    board.slider_evasions(&gen, list, sq, &ROOK_OFFSETS, checks);
                    board.arena[idx as usize].mobility = -7;
                }
                6 => {
                    board.slider_evasions(&gen, list, sq, &ROOK_OFFSETS, checks);
                    board.slider_evasions(&gen, list, sq, &BISHOP_OFFSETS, checks);
                    board.arena[idx as usize].mobility = -13;
                }
                _ => {} // king already handled
            }
        });
        list.len()
    }

    /// Moves of the single piece on `from`; empty list if the square does
    /// not hold a piece of `color`.
    pub fn gen_moves_for_square(
        &mut self,
        color: Color,
        from: Sq,
        list: &mut MoveList,
        promo: Promotions,
    ) -> usize {
        list.clear();
        let kind = self.squares[from];
        if !kind.is_piece_of(color) {
            return 0;
        }
        let tables = OrderingTables::new();
        let gen = Gen {
            tables: &tables,
            level: NO_LEVEL,
            color,
            enemy_king: self.king_sq(color.opp()),
        };
        let idx = self.index_at[from];
        match kind.base() {
            2 => {
                self.pawn_captures_and_promotions(&gen, list, from, promo);
                self.pawn_pushes(&gen, list, from);
            }
            3 => self.leaper_moves(&gen, list, idx, from, &KNIGHT_OFFSETS, 4),
            4 => self.slider_moves(&gen, list, idx, from, &BISHOP_OFFSETS, 6),
            5 => self.slider_moves(&gen, list, idx, from, &ROOK_OFFSETS, 7),
            6 => {
                self.slider_moves(&gen, list, idx, from, &ROOK_OFFSETS, 13);
                self.slider_moves(&gen, list, idx, from, &BISHOP_OFFSETS, 0);
            }
            _ => {
                self.king_steps(&gen, list, from);
                self.castling_moves(&gen, list, from);
            }
        }
        list.len()
    }

    /// Plain king steps, for the quiescence stalemate probe on a lone king.
    pub fn gen_king_steps(&mut self, color: Color, list: &mut MoveList) -> usize {
        list.clear();
        let tables = OrderingTables::new();
        let gen = Gen {
            tables: &tables,
            level: NO_LEVEL,
            color,
            enemy_king: self.king_sq(color.opp()),
        };
        let king_sq = self.king_sq(color);
        self.king_steps(&gen, list, king_sq);
        list.len()
    }

    // ---- per-piece helpers ----

    fn pawn_pushes(&mut self, gen: &Gen, list: &mut MoveList, from: Sq) {
        let (dir, home, last) = match gen.color {
            Color::White => (10isize, 2usize, 7usize),
            Color::Black => (-10isize, 7usize, 2usize),
        };
        let flag = Kind::WPAWN.recolor(gen.color).0 as u8;
        let one = (from as isize + dir) as usize;
        if self.squares[one].is_empty() {
            if rank_of(from) != last {
                // pushes reaching the sixth rank score as light tactics
                let advanced = match gen.color {
                    Color::White => rank_of(one) >= 6,
                    Color::Black => rank_of(one) <= 3,
                };
                gen.push(self, list, from, one, flag, i8::from(advanced));
            }
            if rank_of(from) == home {
                let two = (one as isize + dir) as usize;
                if self.squares[two].is_empty() {
                    gen.push(self, list, from, two, flag, MVV_LVA_TACTICAL);
                }
            }
        }
    }

    fn pawn_captures_and_promotions(
        &mut self,
        gen: &Gen,
        list: &mut MoveList,
        from: Sq,
        promo: Promotions,
    ) {
        let color = gen.color;
        let (dir, promo_rank) = match color {
            Color::White => (10isize, 7usize),
            Color::Black => (-10isize, 2usize),
        };
        let pawn = Kind::WPAWN.recolor(color);
        let promo_kinds: &[Kind] = match promo {
            Promotions::QueenOnly => &[Kind::WQUEEN],
            Promotions::Full => &[Kind::WQUEEN, Kind::WKNIGHT, Kind::WROOK, Kind::WBISHOP],
        };

        if rank_of(from) == promo_rank {
            for off in [dir - 1, dir, dir + 1] {
                let to = (from as isize + off) as usize;
                let target = self.squares[to];
                let is_push = off == dir;
                let ok = if is_push {
                    target.is_empty()
                } else {
                    target.is_piece_of(color.opp())
                };
                if !ok {
                    continue;
                }
                for &pk in promo_kinds {
                    let promoted = pk.recolor(color);
                    let score = if is_push {
                        (((promoted.base() as i32) << 4) - 2) as i8
                    } else {
                        (((target.base() as i32 - 4 + promoted.base() as i32) << 4) - 2) as i8
                    };
                    gen.push(self, list, from, to, promoted.0 as u8, score);
                }
            }
        } else {
            for off in [dir - 1, dir + 1] {
                let to = (from as isize + off) as usize;
                let target = self.squares[to];
                if target.is_piece_of(color.opp()) {
                    gen.push(
                        self,
                        list,
                        from,
                        to,
                        pawn.0 as u8,
                        capture_score(target, pawn),
                    );
                } else if to == self.en_passant_sq && to != SQ_NONE {
                    gen.push(
                        self,
                        list,
                        from,
                        to,
                        pawn.0 as u8,
                        capture_score(pawn, pawn),
                    );
                }
            }
        }
    }

    fn leaper_moves(
        &mut self,
        gen: &Gen,
        list: &mut MoveList,
        idx: u8,
        from: Sq,
        offsets: &[isize; 8],
        mobility_base: i8,
    ) {
        let attacker = self.squares[from];
        let mut count = 0i8;
        for &off in offsets {
            let to = (from as isize + off) as usize;
            let target = self.squares[to];
            if target.is_empty() {
                gen.push(self, list, from, to, FLAG_PIECE, MVV_LVA_TACTICAL);
                count += 1;
            } else if target.is_piece_of(gen.color.opp()) {
                gen.push(self, list, from, to, FLAG_PIECE, capture_score(target, attacker));
                count += 1;
            }
        }
        self.arena[idx as usize].mobility = count - mobility_base;
    }

    fn leaper_captures(&mut self, gen: &Gen, list: &mut MoveList, from: Sq, offsets: &[isize; 8]) {
        let attacker = self.squares[from];
        for &off in offsets {
            let to = (from as isize + off) as usize;
            let target = self.squares[to];
            if target.is_piece_of(gen.color.opp()) {
                gen.push(self, list, from, to, FLAG_PIECE, capture_score(target, attacker));
            }
        }
    }

    fn slider_moves(
        &mut self,
        gen: &Gen,
        list: &mut MoveList,
        idx: u8,
        from: Sq,
        offsets: &[isize; 4],
        mobility_base: i8,
    ) {
        let attacker = self.squares[from];
        let mut count = 0i8;
        for &off in offsets {
            let mut to = (from as isize + off) as usize;
            loop {
                let target = self.squares[to];
                if target.is_empty() {
                    gen.push(self, list, from, to, FLAG_PIECE, MVV_LVA_TACTICAL);
                    count += 1;
                    to = (to as isize + off) as usize;
                    continue;
                }
                if target.is_piece_of(gen.color.opp()) {
                    gen.push(self, list, from, to, FLAG_PIECE, capture_score(target, attacker));
                    count += 1;
                }
                break;
            }
        }
        if mobility_base > 0 {
            self.arena[idx as usize].mobility = count - mobility_base;
        } else {
            // queen: second offset family adds to the first
            self.arena[idx as usize].mobility += count;
        }
    }

    fn slider_captures(&mut self, gen: &Gen, list: &mut MoveList, from: Sq, offsets: &[isize; 4]) {
        let attacker = self.squares[from];
        for &off in offsets {
            let mut to = (from as isize + off) as usize;
            loop {
                let target = self.squares[to];
                if target.is_empty() {
                    to = (to as isize + off) as usize;
                    continue;
                }
                if target.is_piece_of(gen.color.opp()) {
                    gen.push(self, list, from, to, FLAG_PIECE, capture_score(target, attacker));
                }
                break;
            }
        }
    }

    fn king_steps(&mut self, gen: &Gen, list: &mut MoveList, from: Sq) {
        let king = self.squares[from];
        for off in KING_OFFSETS {
            let to = (from as isize + off) as usize;
            let target = self.squares[to];
            if target.is_empty() {
                gen.push(self, list, from, to, FLAG_PIECE, MVV_LVA_TACTICAL);
            } else if target.is_piece_of(gen.color.opp()) {
                gen.push(self, list, from, to, FLAG_PIECE, capture_score(target, king));
            }
        }
    }

    fn king_evasion_steps(&mut self, gen: &Gen, list: &mut MoveList, from: Sq, checks: &CheckList) {
        let king = self.squares[from];
        for off in KING_OFFSETS {
            let to = (from as isize + off) as usize;
            let target = self.squares[to];
            if target.is_empty() {
                // staying on an attacked ray square cannot evade
                if !checks.contains(to) {
                    gen.push(self, list, from, to, FLAG_PIECE, MVV_LVA_TACTICAL);
                }
            } else if target.is_piece_of(gen.color.opp()) {
                gen.push(self, list, from, to, FLAG_PIECE, capture_score(target, king));
            }
        }
    }

    fn leaper_evasions(
        &mut self,
        gen: &Gen,
        list: &mut MoveList,
        from: Sq,
        offsets: &[isize; 8],
        checks: &CheckList,
    ) {
        let attacker = self.squares[from];
        for &off in offsets {
            let to = (from as isize + off) as usize;
            if !checks.contains(to) {
                continue;
            }
            let target = self.squares[to];
            if target.is_empty() {
                gen.push(self, list, from, to, FLAG_PIECE, MVV_LVA_TACTICAL);
            } else if target.is_piece_of(gen.color.opp()) {
                gen.push(self, list, from, to, FLAG_PIECE, capture_score(target, attacker));
            }
        }
    }

    fn slider_evasions(
        &mut self,
        gen: &Gen,
        list: &mut MoveList,
        from: Sq,
        offsets: &[isize; 4],
        checks: &CheckList,
    ) {
        let attacker = self.squares[from];
        for &off in offsets {
            let mut to = (from as isize + off) as usize;
            loop {
                let target = self.squares[to];
                if target.is_empty() {
                    if checks.contains(to) {
                        gen.push(self, list, from, to, FLAG_PIECE, MVV_LVA_TACTICAL);
                    }
                    to = (to as isize + off) as usize;
                    continue;
                }
                if target.is_piece_of(gen.color.opp()) && checks.contains(to) {
                    gen.push(self, list, from, to, FLAG_PIECE, capture_score(target, attacker));
                }
                break;
            }
        }
    }

    fn castling_moves(&mut self, gen: &Gen, list: &mut MoveList, from: Sq) {
        match gen.color {
            Color::White => {
                if self.gflags & WKMOVED != 0 || from != E1 {
                    return;
                }
                if self.gflags & WRH1MOVED == 0
                    && self.squares[H1] == Kind::WROOK
                    && self.squares[F1].is_empty()
                    && self.squares[G1].is_empty()
                    && !self.in_check(Color::White)
                    && !self.square_attacked_by(F1, Color::Black)
                {
                    gen.push(self, list, E1, G1, FLAG_PIECE, MVV_LVA_CSTL_SHORT);
                }
                if self.gflags & WRA1MOVED == 0
                    && self.squares[A1] == Kind::WROOK
                    && self.squares[D1].is_empty()
                    && self.squares[C1].is_empty()
                    && self.squares[B1].is_empty()
                    && !self.in_check(Color::White)
                    && !self.square_attacked_by(D1, Color::Black)
                {
                    gen.push(self, list, E1, C1, FLAG_PIECE, MVV_LVA_CSTL_LONG);
                }
            }
            Color::Black => {
                if self.gflags & BKMOVED != 0 || from != E8 {
                    return;
                }
                if self.gflags & BRH8MOVED == 0
                    && self.squares[H8] == Kind::BROOK
                    && self.squares[F8].is_empty()
                    && self.squares[G8].is_empty()
                    && !self.in_check(Color::Black)
                    && !self.square_attacked_by(F8, Color::White)
                {
                    gen.push(self, list, E8, G8, FLAG_PIECE, MVV_LVA_CSTL_SHORT);
                }
                if self.gflags & BRA8MOVED == 0
                    && self.squares[A8] == Kind::BROOK
                    && self.squares[D8].is_empty()
                    && self.squares[C8].is_empty()
                    && self.squares[B8].is_empty()
                    && !self.in_check(Color::Black)
                    && !self.square_attacked_by(D8, Color::White)
                {
                    gen.push(self, list, E8, C8, FLAG_PIECE, MVV_LVA_CSTL_LONG);
                }
            }
        }
    }

    /// All legal moves of the side to move, the pseudo-legal list filtered
    /// by make/retract. Used at the root, in perft, and by move parsing.
    pub fn gen_legal_moves(&mut self, color: Color, list: &mut MoveList) -> usize {
        let tables = OrderingTables::new();
        let mut checks = CheckList::new();
        if self.in_check_info(color, &mut checks) > 0 {
            self.gen_evasions(color, list, &tables, &checks, Promotions::Full);
        } else {
            self.gen_all_moves(color, list, &tables, NO_LEVEL, Promotions::Full);
        }
        let mut kept = 0;
        for i in 0..list.len() {
            let mv = list[i];
            self.push_status();
            self.make_move(mv);
            let legal = !self.in_check(color);
            self.retract_last_move();
            self.pop_status();
            if legal {
                list[kept] = mv;
                kept += 1;
            }
        }
        list.truncate(kept);
        kept
    }

    /// Is the side to move checkmated right now? Used by the fifty-move
    /// corner case, where mate on the hundredth ply outranks the draw.
    #[must_use]
    pub(crate) fn is_checkmate_now(&mut self) -> bool {
        let side = self.side_to_move();
        if !self.in_check(side) {
            return false;
        }
        let mut checks = CheckList::new();
        let mut list = MoveList::new();
        let tables = OrderingTables::new();
        let _ = self.in_check_info(side, &mut checks);
        self.gen_evasions(side, &mut list, &tables, &checks, Promotions::Full);
        for i in 0..list.len() {
            let mv = list[i];
            self.push_status();
            self.make_move(mv);
            let escapes = !self.in_check(side);
            self.retract_last_move();
            self.pop_status();
            if escapes {
                return false;
            }
        }
        true
    }
}

/// Second rank for the pawn double step, per color.
fn pawn_home_rank(color: Color) -> usize {
    match color {
        Color::White => 2,
        Color::Black => 7,
    }
}

/// Rank where an en passant capture can originate.
fn ep_rank(color: Color) -> usize {
    match color {
        Color::White => 5,
        Color::Black => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legal_count(fen: &str) -> usize {
        let mut board = Board::from_fen(fen).unwrap();
        let side = board.side_to_move();
        let mut list = MoveList::new();
        board.gen_legal_moves(side, &mut list)
    }

    #[test]
    fn test_startpos_has_twenty_moves() {
        assert_eq!(
            legal_count("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            20
        );
    }

    #[test]
    fn test_castling_generated_when_legal() {
        let mut board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let tables = OrderingTables::new();
        let mut list = MoveList::new();
        board.gen_all_moves(Color::White, &mut list, &tables, NO_LEVEL, Promotions::Full);
        let castles: Vec<_> = list
            .iter()
            .filter(|m| m.order == MVV_LVA_CSTL_SHORT || m.order == MVV_LVA_CSTL_LONG)
            .collect();
        assert_eq!(castles.len(), 2);
    }

    #[test]
    fn test_castling_blocked_through_check() {
        // black rook on f8 attacks f1: no short castling
        let mut board = Board::from_fen("5r1k/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let tables = OrderingTables::new();
        let mut list = MoveList::new();
        board.gen_all_moves(Color::White, &mut list, &tables, NO_LEVEL, Promotions::Full);
        assert!(!list.iter().any(|m| m.order == MVV_LVA_CSTL_SHORT));
        assert!(list.iter().any(|m| m.order == MVV_LVA_CSTL_LONG));
    }

    #[test]
    fn test_underpromotions_follow_policy() {
        let mut board = Board::from_fen("8/P7/8/8/8/8/8/K1k5 w - - 0 1").unwrap();
        let tables = OrderingTables::new();
        let mut list = MoveList::new();
        board.gen_all_moves(Color::White, &mut list, &tables, NO_LEVEL, Promotions::QueenOnly);
        let promos = list.iter().filter(|m| m.promotion().is_some()).count();
        assert_eq!(promos, 1);
        board.gen_all_moves(Color::White, &mut list, &tables, NO_LEVEL, Promotions::Full);
        let promos = list.iter().filter(|m| m.promotion().is_some()).count();
        assert_eq!(promos, 4);
    }

    #[test]
    fn test_evasions_double_check_king_only() {
        // knight on f3 and rook on e8 both check e1
        let mut board = Board::from_fen("4r2k/8/8/8/8/5n2/8/4K3 w - - 0 1").unwrap();
        let mut checks = crate::board::attacks::CheckList::new();
        let n = board.in_check_info(Color::White, &mut checks);
        assert_eq!(n, 2);
        let mut list = MoveList::new();
        let tables = OrderingTables::new();
        board.gen_evasions(Color::White, &mut list, &tables, &checks, Promotions::Full);
        assert!(list.iter().all(|m| m.from_sq() == board.king_sq(Color::White)));
    }

    #[test]
    fn test_evasion_allows_block_and_capture() {
        // rook on e8 checks e1; rook on a4 can block on e4, knight on d6 can
        // capture on e8
        let mut board = Board::from_fen("4r2k/8/3N4/8/R7/8/8/4K3 w - - 0 1").unwrap();
        let mut checks = crate::board::attacks::CheckList::new();
        let _ = board.in_check_info(Color::White, &mut checks);
        let mut list = MoveList::new();
        let tables = OrderingTables::new();
        board.gen_evasions(Color::White, &mut list, &tables, &checks, Promotions::Full);
        let block = list
            .iter()
            .any(|m| m.from_sq() == 51 && m.to_sq() == 55); // a4e4
        let capture = list
            .iter()
            .any(|m| m.from_sq() == 74 && m.to_sq() == crate::board::geometry::E8);
        assert!(block);
        assert!(capture);
    }

    #[test]
    fn test_quiet_scores_negative_without_history() {
        let mut board = Board::startpos();
        let tables = OrderingTables::new();
        let mut list = MoveList::new();
        board.gen_all_moves(Color::White, &mut list, &tables, NO_LEVEL, Promotions::Full);
        // no captures available: everything ranks at or below light tactics
        assert!(list.iter().all(|m| m.order <= 1));
    }

    #[test]
    fn test_history_clamps_below_zero() {
        let mut tables = OrderingTables::new();
        for _ in 0..100 {
            tables.note_history(Color::White, Kind::WKNIGHT, 45, MAX_DEPTH);
        }
        assert_eq!(tables.history[0][1][45], -1);
    }

    #[test]
    fn test_killer_slots_shift() {
        let mut tables = OrderingTables::new();
        let a = CMove(100);
        let b = CMove(200);
        tables.note_killer(Color::Black, 3, a);
        tables.note_killer(Color::Black, 3, b);
        assert_eq!(tables.killers[1][0][3], b);
        assert_eq!(tables.killers[1][1][3], a);
        // re-noting the same killer keeps both slots
        tables.note_killer(Color::Black, 3, b);
        assert_eq!(tables.killers[1][1][3], a);
    }
}
