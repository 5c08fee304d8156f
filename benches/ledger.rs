// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Benchmarks for split resolution, balance aggregation and the couple registry.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Split resolution per split kind
//! - Balance recomputation over growing histories
//! - Multi-threaded writes to one couple and to many couples

use chrono::{NaiveDate, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use splitmint::{
    CoupleId, CoupleRegistry, ExpenseId, Partner, Settlement, SettlementId, SharedExpense, Split,
    UserId, compute_balance, evaluate_threshold, resolve_split,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

// =============================================================================
// Helper Functions
// =============================================================================

fn make_expense(id: u32, amount: i64) -> SharedExpense {
    let payer = if id % 2 == 0 { Partner::A } else { Partner::B };
    let split = match id % 3 {
        0 => Split::Equal,
        1 => Split::Percentage {
            a: dec!(60),
            b: dec!(40),
        },
        _ => Split::custom_from_first(Decimal::new(amount, 2), Decimal::new(amount / 3, 2)),
    };
    SharedExpense::new(
        ExpenseId(id),
        payer,
        Decimal::new(amount, 2),
        split,
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        "Bench",
    )
}

fn make_history(count: u32) -> (Vec<SharedExpense>, Vec<Settlement>) {
    let expenses = (0..count).map(|i| make_expense(i, 10_000 + i as i64)).collect();
    let settlements = (0..count / 10)
        .map(|i| {
            let paid_by = if i % 2 == 0 { Partner::A } else { Partner::B };
            Settlement::new(SettlementId(i), paid_by, paid_by.other(), dec!(5), Utc::now())
        })
        .collect();
    (expenses, settlements)
}

fn registry_with_couples(count: u32) -> (Arc<CoupleRegistry>, Vec<CoupleId>) {
    let registry = Arc::new(CoupleRegistry::new());
    let ids = (1..=count)
        .map(|n| {
            let id = registry.invite(UserId(2 * n - 1), UserId(2 * n)).unwrap();
            registry.accept(id, UserId(2 * n)).unwrap();
            id
        })
        .collect();
    (registry, ids)
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_resolve_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_split");
    let splits = [
        ("equal", Split::Equal),
        (
            "percentage",
            Split::Percentage {
                a: dec!(70),
                b: dec!(30),
            },
        ),
        (
            "custom",
            Split::Custom {
                a: dec!(333.33),
                b: dec!(666.67),
            },
        ),
    ];

    for (name, split) in splits.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), split, |b, split| {
            b.iter(|| resolve_split(black_box(dec!(1000)), black_box(split)))
        });
    }

    group.finish();
}

fn bench_compute_balance(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_balance");

    for count in [100u32, 1_000, 10_000].iter() {
        let (expenses, settlements) = make_history(*count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| compute_balance(black_box(&expenses), black_box(&settlements)))
        });
    }

    group.finish();
}

fn bench_evaluate_threshold(c: &mut Criterion) {
    c.bench_function("evaluate_threshold", |b| {
        b.iter(|| evaluate_threshold(black_box(dec!(812.40)), black_box(dec!(1000))))
    });
}

fn bench_add_expense_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_expense_sequential");

    for count in [100u32, 1_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let (registry, ids) = registry_with_couples(1);
                let couple = registry.get(&ids[0]).unwrap();
                for i in 0..count {
                    couple.add_expense(make_expense(i, 2_500)).unwrap();
                }
            })
        });
    }

    group.finish();
}

// =============================================================================
// Multi-Threaded Benchmarks
// =============================================================================

fn bench_parallel_expenses_same_couple(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_expenses_same_couple");

    for count in [1_000u32, 5_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let (registry, ids) = registry_with_couples(1);
                let couple_id = ids[0];
                (0..count).into_par_iter().for_each(|i| {
                    let couple = registry.get(&couple_id).unwrap();
                    couple.add_expense(make_expense(i, 2_500)).unwrap();
                });
            })
        });
    }

    group.finish();
}

fn bench_parallel_expenses_many_couples(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_expenses_many_couples");

    for num_couples in [10u32, 100].iter() {
        let total = 10_000u32;
        group.throughput(Throughput::Elements(total as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_couples),
            num_couples,
            |b, &num_couples| {
                b.iter(|| {
                    let (registry, ids) = registry_with_couples(num_couples);
                    let record_counter = AtomicU32::new(0);
                    (0..total).into_par_iter().for_each(|i| {
                        let couple_id = ids[(i % num_couples) as usize];
                        let record_id = record_counter.fetch_add(1, Ordering::Relaxed);
                        let couple = registry.get(&couple_id).unwrap();
                        couple.add_expense(make_expense(record_id, 2_500)).unwrap();
                    });
                })
            },
        );
    }

    group.finish();
}

fn bench_parallel_balance_reads(c: &mut Criterion) {
    let (registry, ids) = registry_with_couples(50);
    for (n, id) in ids.iter().enumerate() {
        let couple = registry.get(id).unwrap();
        for i in 0..100 {
            couple
                .add_expense(make_expense(n as u32 * 1_000 + i, 4_000))
                .unwrap();
        }
    }

    c.bench_function("parallel_balance_reads", |b| {
        b.iter(|| {
            ids.par_iter().for_each(|id| {
                let couple = registry.get(id).unwrap();
                black_box(couple.balance().unwrap());
            });
        })
    });
}

fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_scaling");
    let total = 10_000u32;

    for num_threads in [1usize, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(total as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                // Configure rayon thread pool for this benchmark
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .unwrap();

                b.iter(|| {
                    let (registry, ids) = registry_with_couples(64);
                    pool.install(|| {
                        (0..total).into_par_iter().for_each(|i| {
                            let couple = registry.get(&ids[(i % 64) as usize]).unwrap();
                            couple.add_expense(make_expense(i, 1_000)).unwrap();
                        });
                    });
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    single_threaded,
    bench_resolve_split,
    bench_compute_balance,
    bench_evaluate_threshold,
    bench_add_expense_sequential,
);

criterion_group!(
    multi_threaded,
    bench_parallel_expenses_same_couple,
    bench_parallel_expenses_many_couples,
    bench_parallel_balance_reads,
);

criterion_group!(scaling, bench_thread_scaling,);

criterion_main!(single_threaded, multi_threaded, scaling);
