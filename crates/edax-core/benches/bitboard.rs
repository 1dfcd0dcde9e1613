use criterion::{black_box, criterion_group, criterion_main, Criterion};

use edax_core::bitboard::Bitboard;
use edax_core::board::Board;
use edax_core::count_last_flip::count_last_flip;
use edax_core::flip;
use edax_core::square::Square;

fn bench_get_moves(c: &mut Criterion) {
    let board = Board::new().make_move(Square::D3).make_move(Square::C3);
    c.bench_function("get_moves", |b| {
        b.iter(|| black_box(board.player).get_moves(black_box(board.opponent)))
    });
}

fn bench_flip(c: &mut Criterion) {
    let board = Board::new();
    c.bench_function("flip", |b| {
        b.iter(|| flip::flip(black_box(Square::D3), board.player, board.opponent))
    });
}

fn bench_count_last_flip(c: &mut Criterion) {
    let player = Bitboard::new(0x0101010101010100 | 0x80);
    c.bench_function("count_last_flip", |b| {
        b.iter(|| count_last_flip(black_box(player), Square::A1))
    });
}

criterion_group!(benches, bench_get_moves, bench_flip, bench_count_last_flip);
criterion_main!(benches);
