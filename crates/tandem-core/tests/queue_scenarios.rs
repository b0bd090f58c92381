use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tandem_core::{AsyncQueue, QueueEvent, QueueOptions, TaskError};
use tokio::sync::mpsc;

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

#[tokio::test]
async fn settles_in_submission_order_with_accurate_length() {
    let queue = AsyncQueue::<usize>::builder().start_stopped().build().unwrap();
    let observed = Arc::new(Mutex::new(Vec::new()));

    let record = observed.clone();
    queue.on_dequeue(move |_, q| record.lock().unwrap().push(q.len()));

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let handle = queue.enqueue(move || async move { Ok(i) });
            assert_eq!(queue.len(), i + 1);
            handle
        })
        .collect();

    queue.start();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(results, vec![0, 1, 2, 3, 4]);
    assert_eq!(*observed.lock().unwrap(), vec![4, 3, 2, 1, 0]);
    assert_eq!(queue.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn nothing_runs_while_stopped() {
    let queue = AsyncQueue::<()>::new().unwrap();
    let stops = counter();
    let starts = counter();
    let runs = counter();

    let s = stops.clone();
    queue.on_stop(move |q| {
        assert!(q.is_stopped());
        s.fetch_add(1, Ordering::SeqCst);
    });
    let s = starts.clone();
    queue.on_start(move |q| {
        assert!(!q.is_stopped());
        s.fetch_add(1, Ordering::SeqCst);
    });

    queue.stop();
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let runs = runs.clone();
            queue.enqueue(move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(queue.len(), 3);
    assert!(!queue.is_busy());

    queue.start();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert_eq!(starts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn timed_out_task_does_not_block_the_next_one() {
    let queue = AsyncQueue::<&'static str>::with_options(QueueOptions::new(Duration::from_millis(1)))
        .unwrap();

    let slow = queue.enqueue(|| async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok("slow")
    });
    let fast = queue.enqueue(|| async { Ok("fast") });

    let err = slow.await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(fast.await.unwrap(), "fast");

    // still usable afterwards
    let later = queue.enqueue(|| async { Ok("later") });
    assert_eq!(later.await.unwrap(), "later");
    assert_eq!(queue.stats().timed_out, 1);
    assert_eq!(queue.stats().succeeded, 2);
}

#[tokio::test(start_paused = true)]
async fn timeout_change_applies_to_next_task() {
    let queue = AsyncQueue::<u8>::builder()
        .timeout(Duration::from_millis(500))
        .start_stopped()
        .build()
        .unwrap();

    let first = queue.enqueue(|| async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(1)
    });
    let second = queue.enqueue(|| async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(2)
    });

    let q = queue.clone();
    queue.on_dequeue(move |_, _| {
        // shorten the timeout once the first task has been taken
        q.set_timeout(Duration::from_millis(10)).unwrap();
    });
    queue.start();

    assert_eq!(first.await.unwrap(), 1);
    assert!(matches!(second.await, Err(TaskError::Timeout(d)) if d == Duration::from_millis(10)));
}

#[tokio::test]
async fn empty_fires_once_per_drain_and_after_refill() {
    let queue = AsyncQueue::<usize>::new().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let refills = counter();

    let q = queue.clone();
    let r = refills.clone();
    queue.on_empty(move || {
        assert_eq!(q.len(), 0);
        tx.send(()).unwrap();
        if r.fetch_add(1, Ordering::SeqCst) < 3 {
            for i in 0..10 {
                let _ = q.enqueue(move || async move { Ok(i) });
            }
        }
    });

    for i in 0..10 {
        let _ = queue.enqueue(move || async move { Ok(i) });
    }

    for _ in 0..4 {
        rx.recv().await.unwrap();
    }
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());
    assert_eq!(queue.stats().succeeded, 40);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn no_empty_event_without_a_completed_task() {
    let queue = AsyncQueue::<()>::new().unwrap();
    let empties = counter();
    let e = empties.clone();
    queue.on_empty(move || {
        e.fetch_add(1, Ordering::SeqCst);
    });

    queue.start();
    queue.stop();
    queue.start();
    tokio::task::yield_now().await;
    assert_eq!(empties.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ten_thousand_tasks_in_exact_order() {
    const N: usize = 10_000;
    let queue = AsyncQueue::<usize>::builder().start_stopped().build().unwrap();
    let executed = Arc::new(Mutex::new(Vec::with_capacity(N)));

    let handles: Vec<_> = (0..N)
        .map(|i| {
            let executed = executed.clone();
            queue.enqueue(move || async move {
                executed.lock().unwrap().push(i);
                Ok(i)
            })
        })
        .collect();
    assert_eq!(queue.len(), N);

    queue.start();
    let mut results = Vec::with_capacity(N);
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    let expected: Vec<usize> = (0..N).collect();
    assert_eq!(results, expected);
    assert_eq!(*executed.lock().unwrap(), expected);
    assert_eq!(queue.stats().succeeded, N);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_never_overlap_tasks() {
    let queue = AsyncQueue::<(usize, usize)>::new().unwrap();
    let in_flight = counter();
    let max_seen = counter();

    let mut producers = Vec::new();
    for producer in 0..4 {
        let queue = queue.clone();
        let in_flight = in_flight.clone();
        let max_seen = max_seen.clone();
        producers.push(tokio::spawn(async move {
            let mut handles = Vec::new();
            for seq in 0..25 {
                let in_flight = in_flight.clone();
                let max_seen = max_seen.clone();
                handles.push(queue.enqueue(move || async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_micros(200)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok((producer, seq))
                }));
            }
            let mut results = Vec::new();
            for handle in handles {
                results.push(handle.await.unwrap());
            }
            results
        }));
    }

    for (producer, join) in producers.into_iter().enumerate() {
        let results = join.await.unwrap();
        let expected: Vec<_> = (0..25).map(|seq| (producer, seq)).collect();
        assert_eq!(results, expected);
    }
    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_lets_the_running_task_finish() {
    let queue = AsyncQueue::<u8>::new().unwrap();
    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let running = queue.enqueue(|| async move {
        let _ = started_tx.send(());
        let _ = release_rx.await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(1)
    });
    let waiting = queue.enqueue(|| async { Ok(2) });

    started_rx.await.unwrap();
    queue.stop();
    release_tx.send(()).unwrap();

    assert_eq!(running.await.unwrap(), 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.peek(0).map(|t| t.id()), Some(waiting.id()));
    assert!(!queue.is_busy());

    queue.start();
    assert_eq!(waiting.await.unwrap(), 2);
}

#[tokio::test]
async fn event_names_round_trip() {
    let queue = AsyncQueue::<()>::new().unwrap();
    queue.on_empty(|| {});
    let event: QueueEvent = "empty".parse().unwrap();
    assert!(queue.has_listener(event));
    assert!(!queue.has_listener("dequeue".parse().unwrap()));
}
