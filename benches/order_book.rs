//! benches/order_book.rs
//! Run with:  cargo bench --bench order_book
//! HTML:      target/criterion/report/index.html

use cloud_market::{
    AssignmentId, Commodity, Direction, IdGenerator, Order, OrderBook, OrderRequest,
};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use std::sync::Arc;

// ────────────────────────────────────────────────────────────────────────────
//  Parameter grids
// ────────────────────────────────────────────────────────────────────────────
const BOOK_SIZES: &[usize] = &[10_000, 50_000, 100_000];
const SWEEP_VOLUMES: &[u64] = &[1_000, 25_000, 100_000];

fn order(ids: &IdGenerator, owner: usize, direction: Direction, price: f64, volume: u64, t: u64) -> Order {
    Order::new(
        ids.next_order_id(),
        OrderRequest {
            owner,
            assignment: AssignmentId(0),
            commodity: Commodity::new("small"),
            direction,
            price,
            volume,
            timestamp: t,
        },
    )
    .expect("valid bench order")
}

/// Build a fresh book with `n_orders` resting sells.
/// Prices cycle over ten levels 1.00..1.09; volumes random 1–256.
fn setup_book(n_orders: usize) -> (OrderBook, Arc<IdGenerator>) {
    let mut rng = StdRng::seed_from_u64(42);
    let ids = Arc::new(IdGenerator::new());
    let mut book = OrderBook::new(Commodity::new("small"), ids.clone());

    for i in 0..n_orders as u64 {
        let price = 1.0 + (i % 10) as f64 / 100.0;
        let volume = rng.gen_range(1..=256);
        book.add_order(order(&ids, (i % 10) as usize, Direction::Sell, price, volume, i));
    }
    book.drain_events();

    (book, ids)
}

pub fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_matching_scaling");

    for &n in BOOK_SIZES {
        group.throughput(Throughput::Elements(n as u64));

        for &sweep in SWEEP_VOLUMES {
            let id = BenchmarkId::from_parameter(format!("book_{}_sweep_{}", n, sweep));
            group.bench_function(id, |b| {
                b.iter_batched(
                    || setup_book(n),
                    |(mut book, ids)| {
                        // a buy priced through every level
                        let taker = order(&ids, 999, Direction::Buy, 2.0, sweep, u64::MAX);
                        let trades = book.add_order(black_box(taker));
                        black_box(trades);
                    },
                    BatchSize::LargeInput,
                )
            });
        }
    }

    group.finish();
}

/// Random two-sided flow around a mid price, as produced by a busy market.
pub fn bench_mixed_flow(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_flow");
    for &n in &[1_000usize, 10_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || {
                    let ids = Arc::new(IdGenerator::new());
                    let mut rng = StdRng::seed_from_u64(7);
                    let orders: Vec<Order> = (0..n as u64)
                        .map(|t| {
                            let direction = if rng.gen_bool(0.5) { Direction::Buy } else { Direction::Sell };
                            let price = rng.gen_range(0.05..0.15);
                            order(&ids, (t % 20) as usize, direction, price, rng.gen_range(1..=5), t)
                        })
                        .collect();
                    (OrderBook::new(Commodity::new("small"), ids), orders)
                },
                |(mut book, orders)| {
                    for o in orders {
                        black_box(book.add_order(o));
                    }
                    black_box(book.drain_events());
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sweep, bench_mixed_flow);
criterion_main!(benches);
