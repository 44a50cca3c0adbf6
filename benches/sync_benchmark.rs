/*!
 * Synchronization Primitives Benchmarks
 *
 * Uncontended fast paths through the handle runtime, and a contended
 * semaphore handoff between two threads
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use posix_compat::{MutexAttr, PosixMutex, Runtime};
use std::sync::Arc;
use std::thread;

fn bench_mutex_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutex_uncontended");

    for (name, attr) in [("normal", MutexAttr::new()), ("recursive", MutexAttr::recursive())] {
        // Direct primitive, no handle lookup
        let mutex = PosixMutex::new(&attr);
        group.bench_function(BenchmarkId::new("direct", name), |b| {
            b.iter(|| {
                mutex.lock().unwrap();
                mutex.unlock().unwrap();
            });
        });

        let rt = Runtime::builder().build();
        let handle = rt.mutex_init(&attr);
        group.bench_function(BenchmarkId::new("runtime", name), |b| {
            b.iter(|| {
                rt.mutex_lock(black_box(handle)).unwrap();
                rt.mutex_unlock(black_box(handle)).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_semaphore_fast_path(c: &mut Criterion) {
    let rt = Runtime::builder().build();
    let sem = rt.sem_init(0).unwrap();

    c.bench_function("sem_post_trywait", |b| {
        b.iter(|| {
            rt.sem_post(black_box(sem)).unwrap();
            rt.sem_try_wait(black_box(sem)).unwrap();
        });
    });
}

fn bench_semaphore_ping_pong(c: &mut Criterion) {
    let mut group = c.benchmark_group("sem_ping_pong");
    group.sample_size(20);

    for rounds in [100u32, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(rounds), &rounds, |b, &rounds| {
            let rt = Arc::new(Runtime::builder().build());
            let ping = rt.sem_init(0).unwrap();
            let pong = rt.sem_init(0).unwrap();

            b.iter(|| {
                let peer = rt.clone();
                let echo = thread::spawn(move || {
                    for _ in 0..rounds {
                        peer.sem_wait(ping).unwrap();
                        peer.sem_post(pong).unwrap();
                    }
                });

                for _ in 0..rounds {
                    rt.sem_post(ping).unwrap();
                    rt.sem_wait(pong).unwrap();
                }
                echo.join().unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_mutex_uncontended,
    bench_semaphore_fast_path,
    bench_semaphore_ping_pong
);
criterion_main!(benches);
