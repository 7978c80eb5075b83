// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Benchmarks the per-pass timer-advance hot path: every node controller
//! pass calls `Timers::advance` once, so its cost sets a floor under the
//! 20ms cadence budget.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rptr_core::timers::Timers;

fn bench_timers_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("timers_advance");

    group.bench_function("all_idle", |b| {
        let mut timers = Timers::new();
        b.iter(|| timers.advance(black_box(20)));
    });

    group.bench_function("all_running", |b| {
        let mut timers = Timers::new();
        timers.hang.start(60_000);
        timers.tot.start(180_000);
        timers.id.start(600_000);
        timers.tail.start(10_000);
        timers.scheduler.start(60_000);
        timers.parrot.start(5_000);
        timers.tail_message.start(10_000);
        timers.link_post.start(1_000);
        timers.key_post.start(1_000);
        timers.dtmf_interdigit.start(3_000);
        timers.local_dtmf.start(3_000);
        timers.macro_.start(100);
        timers.vox_timeout.start(2_000);
        b.iter(|| timers.advance(black_box(20)));
    });

    group.finish();
}

criterion_group!(benches, bench_timers_advance);
criterion_main!(benches);
