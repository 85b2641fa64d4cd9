use std::io;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

/// Runs `work` over every item on at most `workers` threads and blocks until
/// all of them are done.
///
/// Items are queued in input order and pulled by whichever worker is free, so
/// completion order is unspecified. Results come back in input order.
pub fn run<T, R, F>(items: Vec<T>, workers: usize, work: F) -> io::Result<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    run_with_builder(items, workers, worker_builder, work)
}

fn worker_builder(thread_index: usize) -> thread::Builder {
    thread::Builder::new().name(format!("asset-worker-{thread_index}"))
}

/// Workers that fail to start are skipped; the queue drains on the ones
/// that did. Only a pool with no running worker is an error.
fn run_with_builder<T, R, F, B>(items: Vec<T>, workers: usize, builder: B, work: F) -> io::Result<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
    B: Fn(usize) -> thread::Builder,
{
    let total = items.len();
    let thread_count = workers.max(1).min(total);

    let (request_tx, request_rx) = crossbeam_channel::unbounded::<(usize, T)>();
    let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded::<(usize, R)>();

    for (index, item) in items.into_iter().enumerate() {
        // request_rx is alive, so the queue cannot be disconnected here.
        let _ = request_tx.send((index, item));
    }
    // Workers stop once the queue drains.
    drop(request_tx);

    let mut started = 0usize;
    let mut last_err: Option<io::Error> = None;

    thread::scope(|s| {
        for thread_index in 0..thread_count {
            let request_rx = request_rx.clone();
            let outcome_tx = outcome_tx.clone();
            let work = &work;

            match builder(thread_index).spawn_scoped(s, move || worker_loop(request_rx, outcome_tx, work)) {
                Ok(_) => started += 1,
                Err(e) => {
                    tracing::warn!(thread_index, error = %e, "Failed to start worker thread");
                    last_err = Some(e);
                }
            }
        }
    });
    drop(outcome_tx);

    if started == 0 {
        if let Some(e) = last_err {
            return Err(e);
        }
    }

    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
    for (index, result) in outcome_rx.iter() {
        slots[index] = Some(result);
    }

    Ok(slots.into_iter().flatten().collect())
}

fn worker_loop<T, R, F>(request_rx: Receiver<(usize, T)>, outcome_tx: Sender<(usize, R)>, work: &F)
where
    F: Fn(T) -> R,
{
    for (index, item) in request_rx.iter() {
        let result = work(item);
        if outcome_tx.send((index, result)).is_err() {
            return;
        }
    }
}
