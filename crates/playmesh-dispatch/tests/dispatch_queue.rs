//! Integration tests for the game-thread queue and frame driver.
//!
//! The frame driver tests run on a paused Tokio clock so frames advance
//! deterministically.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use playmesh_dispatch::{
    DispatchConfig, FrameDriver, FrameDriverConfig, GameThreadQueue,
};
use tokio::sync::watch;

// =========================================================================
// Helpers
// =========================================================================

/// A shared log that jobs append to, so tests can check order.
fn recorder() -> Arc<Mutex<Vec<u32>>> {
    Arc::new(Mutex::new(Vec::new()))
}

// =========================================================================
// Ordering and batching
// =========================================================================

#[test]
fn test_run_pending_preserves_submission_order() {
    let queue = GameThreadQueue::default();
    let handle = queue.handle();
    let log = recorder();

    for i in 0..5 {
        let log = Arc::clone(&log);
        handle.run_on_game_thread(move || log.lock().push(i));
    }

    // Nothing runs until the game thread drains.
    assert!(log.lock().is_empty());

    let report = queue.run_pending();
    assert_eq!(report.ran, 5);
    assert_eq!(report.remaining, 0);
    assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_run_pending_defers_jobs_submitted_during_drain() {
    let queue = GameThreadQueue::default();
    let handle = queue.handle();
    let log = recorder();

    {
        let log = Arc::clone(&log);
        let inner_handle = handle.clone();
        handle.run_on_game_thread(move || {
            log.lock().push(1);
            let log = Arc::clone(&log);
            inner_handle.run_on_game_thread(move || log.lock().push(2));
        });
    }

    let first = queue.run_pending();
    assert_eq!(first.ran, 1);
    assert_eq!(first.remaining, 1);
    assert_eq!(*log.lock(), vec![1]);

    queue.run_pending();
    assert_eq!(*log.lock(), vec![1, 2]);
}

#[test]
fn test_run_pending_respects_per_tick_cap() {
    let queue = GameThreadQueue::new(DispatchConfig {
        max_jobs_per_tick: Some(2),
        ..DispatchConfig::default()
    });
    let handle = queue.handle();
    let log = recorder();

    for i in 0..5 {
        let log = Arc::clone(&log);
        handle.run_on_game_thread(move || log.lock().push(i));
    }

    assert_eq!(queue.run_pending().ran, 2);
    assert_eq!(queue.run_pending().ran, 2);
    assert_eq!(queue.run_pending().ran, 1);
    assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_zero_cap_is_raised_to_one() {
    let config = DispatchConfig {
        max_jobs_per_tick: Some(0),
        ..DispatchConfig::default()
    }
    .validated();
    assert_eq!(config.max_jobs_per_tick, Some(1));
}

#[test]
fn test_run_pending_on_empty_queue_counts_tick() {
    let queue = GameThreadQueue::default();
    let report = queue.run_pending();
    assert_eq!(report.ran, 0);
    assert_eq!(queue.metrics().total_ticks, 1);
}

// =========================================================================
// Panics
// =========================================================================

#[test]
fn test_panicking_job_does_not_stop_batch() {
    let queue = GameThreadQueue::default();
    let handle = queue.handle();
    let log = recorder();

    handle.run_on_game_thread(|| panic!("listener blew up"));
    {
        let log = Arc::clone(&log);
        handle.run_on_game_thread(move || log.lock().push(7));
    }

    let report = queue.run_pending();
    assert_eq!(report.ran, 2);
    assert_eq!(report.panicked, 1);
    assert_eq!(*log.lock(), vec![7]);

    let metrics = queue.metrics();
    assert_eq!(metrics.total_panics, 1);
    assert_eq!(metrics.total_jobs_run, 2);
}

// =========================================================================
// Cross-thread submission
// =========================================================================

#[test]
fn test_submissions_from_many_threads_all_run() {
    let queue = GameThreadQueue::default();
    let count = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let handle = queue.handle();
            let count = Arc::clone(&count);
            thread::spawn(move || {
                for _ in 0..25 {
                    let count = Arc::clone(&count);
                    handle.run_on_game_thread(move || {
                        count.fetch_add(1, Ordering::SeqCst);
                    });
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    queue.run_pending();
    assert_eq!(count.load(Ordering::SeqCst), 100);
}

#[test]
fn test_per_thread_order_is_kept() {
    let queue = GameThreadQueue::default();
    let log = Arc::new(Mutex::new(Vec::new()));

    let workers: Vec<_> = (0..3u32)
        .map(|t| {
            let handle = queue.handle();
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for i in 0..10u32 {
                    let log = Arc::clone(&log);
                    handle.run_on_game_thread(move || log.lock().push((t, i)));
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    queue.run_pending();

    let log = log.lock();
    for t in 0..3u32 {
        let seq: Vec<u32> = log.iter().filter(|(th, _)| *th == t).map(|(_, i)| *i).collect();
        assert_eq!(seq, (0..10).collect::<Vec<_>>());
    }
}

// =========================================================================
// Closing
// =========================================================================

#[test]
fn test_close_discards_and_drops_new_jobs() {
    let queue = GameThreadQueue::default();
    let handle = queue.handle();
    let log = recorder();

    {
        let log = Arc::clone(&log);
        handle.run_on_game_thread(move || log.lock().push(1));
    }
    queue.close();
    {
        let log = Arc::clone(&log);
        handle.run_on_game_thread(move || log.lock().push(2));
    }

    assert!(handle.is_closed());
    assert_eq!(queue.run_pending().ran, 0);
    assert!(log.lock().is_empty());
    assert_eq!(queue.metrics().total_dropped, 2);
}

#[test]
fn test_jobs_posted_after_close_from_many_threads_are_all_counted() {
    let queue = GameThreadQueue::default();
    queue.close();

    std::thread::scope(|s| {
        for _ in 0..4 {
            let handle = queue.handle();
            s.spawn(move || {
                for _ in 0..25 {
                    handle.run_on_game_thread(|| {});
                }
            });
        }
    });

    assert_eq!(queue.run_pending().ran, 0);
    assert_eq!(queue.metrics().total_dropped, 100);
}

// =========================================================================
// FrameDriver
// =========================================================================

#[test]
fn test_frame_driver_config_clamps_rate() {
    assert_eq!(FrameDriverConfig::with_rate(0).validated().frame_rate_hz, 1);
    assert_eq!(
        FrameDriverConfig::with_rate(10_000).validated().frame_rate_hz,
        FrameDriverConfig::MAX_FRAME_RATE_HZ
    );
    assert_eq!(
        FrameDriverConfig::with_rate(20).frame_duration(),
        Duration::from_millis(50)
    );
}

#[tokio::test(start_paused = true)]
async fn test_frame_driver_runs_jobs_each_frame() {
    let queue = Arc::new(GameThreadQueue::default());
    let handle = queue.handle();
    let log = recorder();
    let (stop_tx, stop_rx) = watch::channel(false);

    let driver = FrameDriver::new(Arc::clone(&queue), FrameDriverConfig::with_rate(20));
    let task = tokio::spawn(driver.run(stop_rx));

    {
        let log = Arc::clone(&log);
        handle.run_on_game_thread(move || log.lock().push(1));
    }
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(*log.lock(), vec![1]);

    stop_tx.send(true).unwrap();
    let frames = task.await.unwrap();
    assert!(frames >= 2, "expected several frames, got {frames}");
}

#[tokio::test(start_paused = true)]
async fn test_frame_driver_final_drain_on_stop() {
    let queue = Arc::new(GameThreadQueue::default());
    let handle = queue.handle();
    let log = recorder();
    let (stop_tx, stop_rx) = watch::channel(false);

    let driver = FrameDriver::new(Arc::clone(&queue), FrameDriverConfig::with_rate(1));
    let task = tokio::spawn(driver.run(stop_rx));

    // Let the first (immediate) frame pass, then queue and stop before the
    // next one is due.
    tokio::time::sleep(Duration::from_millis(10)).await;
    {
        let log = Arc::clone(&log);
        handle.run_on_game_thread(move || log.lock().push(9));
    }
    drop(stop_tx);
    task.await.unwrap();

    assert_eq!(*log.lock(), vec![9]);
}
