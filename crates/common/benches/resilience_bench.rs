//! Resilience benchmarks
//!
//! Hot paths: backoff calculation, circuit breaker admission in each state,
//! and the retry executor's success path.
//!
//! Run with: `cargo bench --bench resilience_bench -p dotclaude-common
//! --features runtime`

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dotclaude_common::error::CommonError;
use dotclaude_common::resilience::{
    Backoff, CircuitBreakerConfig, MockClock, ResilienceError, RetryConfig, RetryExecutor,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::runtime::Builder as RuntimeBuilder;

// ============================================================================
// Backoff Benchmarks
// ============================================================================

fn bench_backoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("backoff");
    let plain = Backoff::exponential(Duration::from_millis(100), Duration::from_secs(30), 2.0);
    let jittered = plain.with_jitter(0.2);

    for attempt in [1u32, 5, 20] {
        group.bench_with_input(BenchmarkId::new("plain", attempt), &attempt, |b, &attempt| {
            b.iter(|| black_box(plain.base_delay_for(black_box(attempt))));
        });

        group.bench_with_input(BenchmarkId::new("jittered", attempt), &attempt, |b, &attempt| {
            let mut rng = StdRng::seed_from_u64(7);
            b.iter(|| black_box(jittered.delay_with(black_box(attempt), &mut rng)));
        });
    }

    group.finish();
}

// ============================================================================
// Circuit Breaker Benchmarks
// ============================================================================

fn bench_circuit_breaker(c: &mut Criterion) {
    let runtime = RuntimeBuilder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime for benchmarks");
    let mut group = c.benchmark_group("circuit_breaker");

    group.bench_function("closed_success", |b| {
        let breaker = CircuitBreakerConfig::builder()
            .clock(MockClock::new())
            .build()
            .expect("valid breaker config");
        b.to_async(&runtime).iter(|| async {
            let result: Result<u32, ResilienceError<std::io::Error>> =
                breaker.execute(|| async { Ok(1) }).await;
            black_box(result)
        });
    });

    group.bench_function("open_rejection", |b| {
        let breaker = CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .reset_timeout(Duration::from_secs(3600))
            .clock(MockClock::new())
            .build()
            .expect("valid breaker config");
        runtime.block_on(async {
            let _ = breaker
                .execute(|| async { Err::<(), _>(std::io::Error::other("open it")) })
                .await;
        });
        b.to_async(&runtime).iter(|| async {
            let result: Result<(), ResilienceError<std::io::Error>> =
                breaker.execute(|| async { Ok(()) }).await;
            black_box(result)
        });
    });

    group.finish();
}

// ============================================================================
// Retry Executor Benchmarks
// ============================================================================

fn bench_retry_success_path(c: &mut Criterion) {
    let runtime = RuntimeBuilder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime for benchmarks");
    let executor = RetryExecutor::new(RetryConfig::default());

    c.bench_function("retry_first_attempt_success", |b| {
        b.to_async(&runtime).iter(|| async {
            let result = executor.execute(|attempt| async move { Ok::<_, CommonError>(attempt) }).await;
            black_box(result)
        });
    });
}

criterion_group!(benches, bench_backoff, bench_circuit_breaker, bench_retry_success_path);
criterion_main!(benches);
