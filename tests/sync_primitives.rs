/*!
 * Synchronization Primitives Integration Tests
 *
 * Mutex ownership, condvar wakeup semantics, semaphore counting, once
 * exclusivity and deadline behavior, driven through the runtime's handles.
 */

use posix_compat::{Handle, MutexAttr, PosixError, Runtime, Timespec, WakeResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const DEADLINE: Duration = Duration::from_millis(100);

fn runtime() -> Arc<Runtime> {
    Arc::new(Runtime::builder().build())
}

/// Spin until `cond` holds, failing the test after a generous bound
fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let start = Instant::now();
    while !cond() {
        assert!(start.elapsed() < Duration::from_secs(10), "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(2));
    }
}

// ============================================================================
// Mutex
// ============================================================================

#[test]
fn test_recursive_mutex_released_after_nth_unlock() {
    let rt = runtime();
    let m = rt.mutex_init(&MutexAttr::recursive());
    const DEPTH: usize = 5;

    for _ in 0..DEPTH {
        rt.mutex_lock(m).unwrap();
    }

    let acquired = Arc::new(AtomicBool::new(false));
    let (rt2, acquired2) = (rt.clone(), acquired.clone());
    let contender = thread::spawn(move || {
        rt2.mutex_lock(m).unwrap();
        acquired2.store(true, Ordering::SeqCst);
        rt2.mutex_unlock(m).unwrap();
    });

    for _ in 0..DEPTH - 1 {
        rt.mutex_unlock(m).unwrap();
        thread::sleep(Duration::from_millis(10));
        assert!(!acquired.load(Ordering::SeqCst), "contender got in before the last unlock");
    }
    rt.mutex_unlock(m).unwrap();

    contender.join().unwrap();
    assert!(acquired.load(Ordering::SeqCst));
}

#[test]
fn test_normal_mutex_handoff() {
    let rt = runtime();
    let m = rt.mutex_init(&MutexAttr::new());
    rt.mutex_lock(m).unwrap();

    let (rt2, done) = (rt.clone(), Arc::new(AtomicBool::new(false)));
    let done2 = done.clone();
    let b = thread::spawn(move || {
        rt2.mutex_lock(m).unwrap();
        done2.store(true, Ordering::SeqCst);
        // B is now the owner: A may no longer unlock
        thread::sleep(Duration::from_millis(20));
        rt2.mutex_unlock(m).unwrap();
    });

    thread::sleep(Duration::from_millis(30));
    assert!(!done.load(Ordering::SeqCst), "B acquired a held mutex");

    rt.mutex_unlock(m).unwrap();
    wait_for("B to acquire", || done.load(Ordering::SeqCst));
    assert!(matches!(rt.mutex_unlock(m), Err(PosixError::InvalidArgument(_))));
    b.join().unwrap();
}

#[test]
fn test_try_lock_never_blocks() {
    let rt = runtime();
    let normal = rt.mutex_init(&MutexAttr::new());
    let recursive = rt.mutex_init(&MutexAttr::recursive());
    rt.mutex_lock(normal).unwrap();
    rt.mutex_lock(recursive).unwrap();

    let rt2 = rt.clone();
    let results = thread::spawn(move || {
        let start = Instant::now();
        let r = (rt2.mutex_try_lock(normal), rt2.mutex_try_lock(recursive));
        (r, start.elapsed())
    })
    .join()
    .unwrap();

    assert_eq!(results.0, (Err(PosixError::Busy), Err(PosixError::Busy)));
    assert!(results.1 < Duration::from_millis(50));
}

#[test]
fn test_timed_lock_not_early() {
    let rt = runtime();
    let m = rt.mutex_init(&MutexAttr::new());
    rt.mutex_lock(m).unwrap();

    let rt2 = rt.clone();
    let (result, elapsed) = thread::spawn(move || {
        let start = Instant::now();
        let r = rt2.mutex_timed_lock(m, &Timespec::from_now(DEADLINE));
        (r, start.elapsed())
    })
    .join()
    .unwrap();

    assert_eq!(result, Err(PosixError::TimedOut));
    assert!(elapsed >= DEADLINE, "timed out early after {:?}", elapsed);
    assert!(elapsed < DEADLINE + Duration::from_millis(500));
    // Timing out does not grant ownership
    assert!(rt.mutex_unlock(m).is_ok());
}

// ============================================================================
// Condition variable
// ============================================================================

#[test]
fn test_signal_before_wait_is_lost() {
    let rt = runtime();
    let m = rt.mutex_init(&MutexAttr::new());
    let c = rt.cond_init();

    assert_eq!(rt.cond_signal(c).unwrap(), WakeResult::NoWaiters);

    let rt2 = rt.clone();
    let waiter = thread::spawn(move || {
        rt2.mutex_lock(m).unwrap();
        let start = Instant::now();
        let result = rt2.cond_wait(c, m);
        let elapsed = start.elapsed();
        rt2.mutex_unlock(m).unwrap();
        (result, elapsed)
    });

    // The waiter must still be blocked well after the early signal
    thread::sleep(Duration::from_millis(80));
    assert!(!waiter.is_finished());

    rt.mutex_lock(m).unwrap();
    assert_eq!(rt.cond_signal(c).unwrap(), WakeResult::Woken(1));
    rt.mutex_unlock(m).unwrap();

    let (result, elapsed) = waiter.join().unwrap();
    assert!(result.is_ok());
    assert!(elapsed >= Duration::from_millis(80));
}

#[test]
fn test_broadcast_fans_out_with_exclusion() {
    const WAITERS: usize = 6;
    let rt = runtime();
    let m = rt.mutex_init(&MutexAttr::new());
    let c = rt.cond_init();

    let inside = Arc::new(AtomicUsize::new(0));
    let woken = Arc::new(AtomicUsize::new(0));
    let ready = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = (0..WAITERS)
        .map(|_| {
            let (rt, inside, woken, ready) = (rt.clone(), inside.clone(), woken.clone(), ready.clone());
            thread::spawn(move || {
                rt.mutex_lock(m).unwrap();
                while !ready.load(Ordering::SeqCst) {
                    rt.cond_wait(c, m).unwrap();
                }
                // Exactly one thread may be inside the critical section
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                thread::sleep(Duration::from_millis(5));
                inside.fetch_sub(1, Ordering::SeqCst);
                woken.fetch_add(1, Ordering::SeqCst);
                rt.mutex_unlock(m).unwrap();
            })
        })
        .collect();

    wait_for("all waiters to queue", || queued(&rt, c) == WAITERS);

    rt.mutex_lock(m).unwrap();
    ready.store(true, Ordering::SeqCst);
    assert_eq!(rt.cond_broadcast(c).unwrap(), WakeResult::Woken(WAITERS));
    rt.mutex_unlock(m).unwrap();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(woken.load(Ordering::SeqCst), WAITERS);
}

/// Number of threads parked on condvar `c`
fn queued(rt: &Runtime, c: Handle) -> usize {
    rt.cond_waiters(c).unwrap_or(0)
}

#[test]
fn test_cond_timed_wait_reacquires() {
    let rt = runtime();
    let m = rt.mutex_init(&MutexAttr::new());
    let c = rt.cond_init();

    rt.mutex_lock(m).unwrap();
    let start = Instant::now();
    let result = rt.cond_timed_wait(c, m, &Timespec::from_now(DEADLINE));
    let elapsed = start.elapsed();

    assert_eq!(result, Err(PosixError::TimedOut));
    assert!(elapsed >= DEADLINE, "timed out early after {:?}", elapsed);
    // The mutex is held again: another thread cannot take it
    let rt2 = rt.clone();
    assert_eq!(thread::spawn(move || rt2.mutex_try_lock(m)).join().unwrap(), Err(PosixError::Busy));
    rt.mutex_unlock(m).unwrap();
}

// ============================================================================
// Semaphore
// ============================================================================

#[test]
fn test_semaphore_k_posts_k_waits() {
    const K: usize = 10;
    let rt = runtime();
    let s = rt.sem_init(0).unwrap();

    for _ in 0..K {
        rt.sem_post(s).unwrap();
    }
    let start = Instant::now();
    for _ in 0..K {
        rt.sem_wait(s).unwrap();
    }
    assert!(start.elapsed() < Duration::from_millis(100));

    let rt2 = rt.clone();
    let extra = thread::spawn(move || rt2.sem_wait(s));
    thread::sleep(Duration::from_millis(50));
    assert!(!extra.is_finished(), "the (K+1)th wait did not block");

    rt.sem_post(s).unwrap();
    extra.join().unwrap().unwrap();
    assert_eq!(rt.sem_get_value(s).unwrap(), 0);
}

#[test]
fn test_semaphore_count_three_scenario() {
    let rt = runtime();
    let s = rt.sem_init(3).unwrap();

    for _ in 0..3 {
        rt.sem_try_wait(s).unwrap();
    }
    assert_eq!(rt.sem_try_wait(s), Err(PosixError::WouldBlock));

    let rt2 = rt.clone();
    let waiter = thread::spawn(move || {
        let deadline = Timespec::from_now(Duration::from_secs(5));
        let start = Instant::now();
        (rt2.sem_timed_wait(s, &deadline), start.elapsed())
    });

    thread::sleep(Duration::from_millis(30));
    rt.sem_post(s).unwrap();

    let (result, elapsed) = waiter.join().unwrap();
    assert!(result.is_ok());
    assert!(elapsed < Duration::from_secs(5));
}

#[test]
fn test_sem_timed_wait_not_early() {
    let rt = runtime();
    let s = rt.sem_init(0).unwrap();

    let start = Instant::now();
    let result = rt.sem_timed_wait(s, &Timespec::from_now(DEADLINE));
    let elapsed = start.elapsed();

    assert_eq!(result, Err(PosixError::TimedOut));
    assert!(elapsed >= DEADLINE, "timed out early after {:?}", elapsed);
    assert!(elapsed < DEADLINE + Duration::from_millis(500));
}

#[test]
fn test_semaphore_never_negative_under_contention() {
    const THREADS: usize = 8;
    const POSTS: usize = 200;
    let rt = runtime();
    let s = rt.sem_init(0).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS * 2));

    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let (rt_post, barrier_post) = (rt.clone(), barrier.clone());
        handles.push(thread::spawn(move || {
            barrier_post.wait();
            for _ in 0..POSTS {
                rt_post.sem_post(s).unwrap();
            }
        }));
        let (rt, barrier) = (rt.clone(), barrier.clone());
        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..POSTS {
                rt.sem_wait(s).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(rt.sem_get_value(s).unwrap(), 0);
}

// ============================================================================
// Once
// ============================================================================

#[test]
fn test_once_with_eight_callers() {
    const CALLERS: usize = 8;
    let rt = runtime();
    let o = rt.once_init();

    let runs = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let (rt, runs, finished, barrier) = (rt.clone(), runs.clone(), finished.clone(), barrier.clone());
            thread::spawn(move || {
                barrier.wait();
                rt.once(o, || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    finished.store(true, Ordering::SeqCst);
                })
                .unwrap();
                // Nobody returns before the single execution completed
                finished.load(Ordering::SeqCst)
            })
        })
        .collect();

    for h in handles {
        assert!(h.join().unwrap());
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Handle reuse
// ============================================================================

/// Create semaphores until `stop`, returning every handle obtained
fn churn_semaphores(rt: &Runtime, stop: &AtomicBool) -> Vec<Handle> {
    let mut made = Vec::new();
    while !stop.load(Ordering::SeqCst) && made.len() < 64 {
        made.push(rt.sem_init(0).unwrap());
        thread::yield_now();
    }
    made
}

#[test]
fn test_racing_destroys_never_remove_a_reused_handle() {
    let rt = runtime();

    for _ in 0..200 {
        let m = rt.mutex_init(&MutexAttr::new());
        let barrier = Arc::new(Barrier::new(3));
        let stop = Arc::new(AtomicBool::new(false));

        let destroyers: Vec<_> = (0..2)
            .map(|_| {
                let (rt, barrier) = (rt.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    rt.mutex_destroy(m)
                })
            })
            .collect();
        let creator = {
            let (rt, barrier, stop) = (rt.clone(), barrier.clone(), stop.clone());
            thread::spawn(move || {
                barrier.wait();
                churn_semaphores(&rt, &stop)
            })
        };

        let outcomes: Vec<_> = destroyers.into_iter().map(|d| d.join().unwrap()).collect();
        stop.store(true, Ordering::SeqCst);
        let fresh = creator.join().unwrap();

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1, "{:?}", outcomes);
        for s in fresh {
            assert_eq!(rt.sem_get_value(s), Ok(0), "semaphore {} was removed", s);
            rt.sem_destroy(s).unwrap();
        }
    }
}

#[test]
fn test_racing_joins_never_remove_a_reused_handle() {
    let rt = runtime();

    for _ in 0..20 {
        let t = rt
            .thread_create(|| {
                thread::sleep(Duration::from_millis(10));
                7
            })
            .unwrap();
        let barrier = Arc::new(Barrier::new(3));
        let stop = Arc::new(AtomicBool::new(false));

        let joiners: Vec<_> = (0..2)
            .map(|_| {
                let (rt, barrier) = (rt.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    rt.thread_join(t)
                })
            })
            .collect();
        let creator = {
            let (rt, barrier, stop) = (rt.clone(), barrier.clone(), stop.clone());
            thread::spawn(move || {
                barrier.wait();
                churn_semaphores(&rt, &stop)
            })
        };

        let outcomes: Vec<_> = joiners.into_iter().map(|j| j.join().unwrap()).collect();
        stop.store(true, Ordering::SeqCst);
        let fresh = creator.join().unwrap();

        assert_eq!(outcomes.iter().filter(|r| **r == Ok(7)).count(), 1, "{:?}", outcomes);
        for s in fresh {
            assert_eq!(rt.sem_get_value(s), Ok(0), "semaphore {} was removed", s);
            rt.sem_destroy(s).unwrap();
        }
    }
}

#[test]
fn test_destroy_of_locked_mutex_is_busy_and_keeps_handle() {
    let rt = runtime();
    let m = rt.mutex_init(&MutexAttr::new());
    rt.mutex_lock(m).unwrap();

    assert_eq!(rt.mutex_destroy(m), Err(PosixError::Busy));
    rt.mutex_unlock(m).unwrap();
    rt.mutex_destroy(m).unwrap();
    assert_eq!(rt.mutex_lock(m), Err(PosixError::AlreadyClosed(m)));
}
