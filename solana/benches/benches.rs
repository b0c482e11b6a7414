use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use solana::sim::{clmm::tick_math, cp, dlmm};

fn bench_cp_quote(c: &mut Criterion) {
    c.bench_function("cp_get_amount_out", |b| {
        b.iter(|| {
            cp::get_amount_out(
                black_box(1_000_000_000_000),
                black_box(500_000_000_000),
                black_box(250_000_000),
                black_box(25),
            )
        })
    });
}

fn bench_tick_math(c: &mut Criterion) {
    c.bench_function("sqrt_price_at_tick", |b| {
        b.iter(|| tick_math::get_sqrt_price_at_tick(black_box(-287_654)))
    });
}

fn bench_bin_price(c: &mut Criterion) {
    c.bench_function("dlmm_price_from_id", |b| {
        b.iter(|| dlmm::get_price_from_id(black_box(-3_456), black_box(25)))
    });
}

criterion_group!(benches, bench_cp_quote, bench_tick_math, bench_bin_price);
criterion_main!(benches);
