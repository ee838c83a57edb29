//! Benchmarks for the placement game engine.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use polyfit::generator::PuzzleGenerator;
use polyfit::placement::{find_nearest_fit, PieceIdentity};
use polyfit::{canonical_key, Cell, GameConfig, Grid, Orientation, PieceType, Puzzle, Tier};

/// Benchmark canonicalizing a chiral 14-cell board.
fn bench_canonical_key(c: &mut Criterion) {
    let grid = Grid::from_rows(&[
        [1u8, 1, 0, 0, 0, 0],
        [0, 1, 1, 1, 0, 0],
        [0, 0, 1, 0, 1, 1],
        [0, 1, 1, 1, 1, 0],
        [0, 0, 0, 1, 0, 0],
    ]);

    c.bench_function("canonical_key", |b| b.iter(|| canonical_key(black_box(&grid))));
}

/// Benchmark snapping a pentomino onto a generated board with one piece placed.
fn bench_find_nearest_fit(c: &mut Criterion) {
    let mut generator = PuzzleGenerator::new(11);
    let config = GameConfig::default();
    let mut puzzle: Puzzle = generator.generate(Tier::Two, &config);
    puzzle.required_piece = None;
    let identity = PieceIdentity::new(PieceType::Domino, Orientation::IDENTITY);
    if let Some(fit) = find_nearest_fit(&puzzle, &identity.shape(), Cell::new(0, 0), None, Some(&identity)) {
        puzzle.placed_pieces.push(identity.at(fit.anchor));
    }

    let pento = PieceIdentity::new(PieceType::PentoP, Orientation::new(1, true));
    let shape = pento.shape();
    let target = Cell::new(puzzle.grid.height() as i32 / 2, puzzle.grid.width() as i32 / 2);

    c.bench_function("find_nearest_fit", |b| {
        b.iter(|| find_nearest_fit(black_box(&puzzle), &shape, target, None, Some(&pento)))
    });
}

/// Benchmark generating full tier 2 puzzles, including dedup bookkeeping.
fn bench_generate(c: &mut Criterion) {
    let config = GameConfig::advanced();
    let mut group = c.benchmark_group("generate");
    group.sample_size(20);
    group.bench_function("tier2", |b| {
        let mut generator = PuzzleGenerator::new(42);
        b.iter(|| generator.generate(black_box(Tier::Two), &config))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_canonical_key,
    bench_find_nearest_fit,
    bench_generate
);
criterion_main!(benches);
