//! Perft benchmark: raw make/unmake and move generation throughput.

use criterion::{criterion_group, criterion_main, Criterion};

use mailbox::board::Board;
use mailbox::perft::PerftRun;

fn perft_startpos(c: &mut Criterion) {
    c.bench_function("perft 4 startpos", |b| {
        let mut board = Board::startpos();
        b.iter(|| {
            let nodes = PerftRun::new(&mut board, None).perft(4);
            assert_eq!(nodes, 197_281);
        });
    });
}

fn perft_kiwipete(c: &mut Criterion) {
    c.bench_function("perft 3 kiwipete", |b| {
        let mut board = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        b.iter(|| {
            let nodes = PerftRun::new(&mut board, None).perft(3);
            assert_eq!(nodes, 97_862);
        });
    });
}

criterion_group!(benches, perft_startpos, perft_kiwipete);
criterion_main!(benches);
