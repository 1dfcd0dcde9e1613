use criterion::{criterion_group, criterion_main, Criterion};

use edax_core::board::Board;
use edax_core::perft::perft;

fn bench_perft(c: &mut Criterion) {
    let board = Board::new();
    c.bench_function("perft 6", |b| b.iter(|| perft(&board, 6)));
    c.bench_function("perft 7", |b| b.iter(|| perft(&board, 7)));
}

criterion_group!(benches, bench_perft);
criterion_main!(benches);
