//! Fixed-size worker collection driving parallel search.
//!
//! Workers are OS threads parked on a `Condvar` between searches. `start_all`
//! hands each one a fresh position and wakes it; the main worker (id 0) is
//! the only one that emits `info`/`bestmove` lines, the rest search silently
//! and contribute node counts. `stop_all` raises one shared flag that every
//! worker's `TimeManager` observes on its next node-count check. Grounded in
//! the teacher's `Thread`/`ThreadPool` split (one thread per worker, a
//! shared stop flag, a shared TT) from `thread.hpp`/`thread_pool.hpp`.

use crate::board::Board;
use crate::moves::magic::MagicTables;
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::search::search_with;
use crate::search::tt::TranspositionTable;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Wraps a [`TranspositionTable`] so every worker can take a raw `&mut`
/// into the same backing storage without a lock per probe/store. A losing
/// race between two workers only costs a clobbered entry, never unsoundness
/// — `TranspositionTable::probe` re-validates the full key on every read, so
/// a torn write just looks like a miss.
pub struct SharedTT {
    inner: UnsafeCell<TranspositionTable>,
}

// SAFETY: every access goes through `get`, which hands out a raw `&mut`.
// Concurrent callers may race on individual entries; `TranspositionTable`
// tolerates this by design (see module doc above).
unsafe impl Sync for SharedTT {}

impl SharedTT {
    pub fn new(size_mb: usize) -> Self {
        Self {
            inner: UnsafeCell::new(TranspositionTable::new(size_mb)),
        }
    }

    /// Hands out a raw `&mut TranspositionTable`. Callers must not hold it
    /// across a `yield`/park point shared with another worker; each worker
    /// takes it once per search and drops it when `search_with` returns.
    #[allow(clippy::mut_from_ref)]
    pub fn get(&self) -> &mut TranspositionTable {
        unsafe { &mut *self.inner.get() }
    }

    pub fn resize(&self, size_mb: usize) {
        *self.get() = TranspositionTable::new(size_mb);
    }

    pub fn clear(&self) {
        self.get().clear();
    }
}

/// A position and search limits handed to every worker for one `go`.
struct Job {
    board: Board,
    max_depth: i32,
    time_limit: Option<Duration>,
    generation: u64,
}

/// The mutex-guarded handoff point between the pool and one worker: a
/// pending job (if any) and the generation number of the job last
/// completed. Both `start_all` and `wait_all` operate purely in terms of
/// generation numbers so a worker can never be mistaken for idle when it
/// simply hasn't picked up the newest job yet.
struct WorkerSlot {
    job: Option<Job>,
    completed_generation: u64,
}

struct WorkerShared {
    slot: Mutex<WorkerSlot>,
    has_job: Condvar,
    job_done: Condvar,
    exit: AtomicBool,
    nodes: AtomicU64,
    /// Populated only by worker 0 — the result the pool reports to the
    /// protocol layer once `wait_all` returns.
    result: Mutex<Option<(i32, Option<Move>)>>,
}

struct Worker {
    shared: Arc<WorkerShared>,
    handle: Option<JoinHandle<()>>,
}

/// Owns the worker threads and the state shared between them: the search
/// tables, the transposition table, and the stop flag. One instance lives
/// for the process's lifetime; `resize` rebuilds the worker set when
/// `setoption name Threads value <n>` changes the configured count.
pub struct ThreadPool {
    workers: Vec<Worker>,
    tables: Arc<MagicTables>,
    tt: Arc<SharedTT>,
    stop: Arc<AtomicBool>,
    generation: u64,
}

/// The result reported back after a `go` completes: the best move found by
/// the main worker and the total nodes searched across the whole pool.
pub struct SearchReport {
    pub best_move: Option<Move>,
    pub score: i32,
    pub total_nodes: u64,
}

impl ThreadPool {
    pub fn new(thread_count: usize, tables: Arc<MagicTables>, hash_mb: usize) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let tt = Arc::new(SharedTT::new(hash_mb));
        let mut pool = Self {
            workers: Vec::new(),
            tables,
            tt,
            stop,
            generation: 0,
        };
        pool.resize(thread_count.max(1));
        pool
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Tears down the current worker set and spawns `thread_count` fresh
    /// ones. Used at startup and by `setoption name Threads`.
    pub fn resize(&mut self, thread_count: usize) {
        self.shutdown_all();
        self.workers.clear();

        for id in 0..thread_count.max(1) {
            let shared = Arc::new(WorkerShared {
                slot: Mutex::new(WorkerSlot {
                    job: None,
                    completed_generation: 0,
                }),
                has_job: Condvar::new(),
                job_done: Condvar::new(),
                exit: AtomicBool::new(false),
                nodes: AtomicU64::new(0),
                result: Mutex::new(None),
            });

            let worker_shared = Arc::clone(&shared);
            let tables = Arc::clone(&self.tables);
            let tt = Arc::clone(&self.tt);
            let stop = Arc::clone(&self.stop);

            let handle = std::thread::Builder::new()
                .name(format!("search-worker-{id}"))
                .spawn(move || worker_loop(id, worker_shared, tables, tt, stop))
                .expect("failed to spawn search worker thread");

            self.workers.push(Worker {
                shared,
                handle: Some(handle),
            });
        }
    }

    pub fn resize_hash(&self, size_mb: usize) {
        self.tt.resize(size_mb);
    }

    /// Wakes every worker with a fresh position and search limits. Returns
    /// immediately; call [`Self::wait_all`] to block for completion.
    pub fn start_all(&mut self, board: &Board, max_depth: i32, time_limit: Option<Duration>) {
        self.stop.store(false, Ordering::Release);
        self.generation += 1;
        self.tt.get().new_search();

        for worker in &self.workers {
            let mut slot = worker.shared.slot.lock().unwrap();
            slot.job = Some(Job {
                board: board.clone(),
                max_depth,
                time_limit,
                generation: self.generation,
            });
            worker.shared.nodes.store(0, Ordering::Relaxed);
            drop(slot);
            worker.shared.has_job.notify_one();
        }
    }

    /// Raises the shared stop flag; every worker observes it on its next
    /// node-count check inside `search_with`/`alpha_beta`.
    pub fn halt_all(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Blocks until every worker has consumed the current generation's job
    /// (i.e. finished or been halted).
    pub fn wait_all(&self) {
        for worker in &self.workers {
            let slot = worker.shared.slot.lock().unwrap();
            let _ = worker
                .shared
                .job_done
                .wait_while(slot, |s| s.completed_generation < self.generation)
                .unwrap();
        }
    }

    /// Sums `field` across all workers — e.g. total nodes searched this
    /// `go`, mirroring the teacher's `ThreadPool::accumulate`.
    pub fn accumulate_nodes(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.shared.nodes.load(Ordering::Relaxed))
            .sum()
    }

    /// The main worker's (id 0) last completed `(score, best_move)` — the
    /// line the protocol layer reports as `bestmove` once `wait_all`
    /// returns. `None` before any `go` has completed.
    pub fn main_result(&self) -> Option<(i32, Option<Move>)> {
        self.workers.first()?.shared.result.lock().unwrap().clone()
    }

    /// Bundles the main worker's result with the pool-wide node count —
    /// the shape the protocol layer hands back to its caller after a `go`.
    pub fn report(&self) -> SearchReport {
        let (score, best_move) = self.main_result().unwrap_or((0, None));
        SearchReport {
            best_move,
            score,
            total_nodes: self.accumulate_nodes(),
        }
    }

    /// Returns a handle to the shared stop flag so the protocol layer can
    /// raise it from a different thread than the one that called
    /// `start_all` (e.g. in response to a `stop` command read from stdin
    /// while a `go` is in flight on a worker thread).
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn shutdown_all(&mut self) {
        for worker in &mut self.workers {
            worker.shared.exit.store(true, Ordering::Release);
            worker.shared.has_job.notify_one();
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

fn worker_loop(
    id: usize,
    shared: Arc<WorkerShared>,
    tables: Arc<MagicTables>,
    tt: Arc<SharedTT>,
    stop: Arc<AtomicBool>,
) {
    loop {
        let mut guard = shared.slot.lock().unwrap();
        while guard.job.is_none() && !shared.exit.load(Ordering::Acquire) {
            guard = shared.has_job.wait(guard).unwrap();
        }

        if shared.exit.load(Ordering::Acquire) {
            return;
        }

        let job = guard.job.take().expect("worker woken without a job");
        drop(guard);

        let mut board = job.board;
        let mut ctx = SearchContext::new();
        let mut nodes = 0u64;
        let emit_output = id == 0;

        let outcome = search_with(
            &mut board,
            &tables,
            tt.get(),
            &mut ctx,
            job.max_depth,
            job.time_limit,
            Some(stop.as_ref()),
            emit_output,
            &mut nodes,
        );

        if id == 0 {
            *shared.result.lock().unwrap() = Some(outcome);
        }

        shared.nodes.store(nodes, Ordering::Relaxed);

        let mut guard = shared.slot.lock().unwrap();
        guard.completed_generation = job.generation;
        drop(guard);
        shared.job_done.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::magic::loader::load_magic_tables;
    use std::time::Duration;

    #[test]
    fn pool_reports_a_move_from_startpos() {
        let tables = Arc::new(load_magic_tables());
        let mut pool = ThreadPool::new(2, tables, 1);
        let board = Board::new();

        pool.start_all(&board, 4, Some(Duration::from_millis(200)));
        pool.wait_all();

        assert!(pool.accumulate_nodes() > 0);
    }

    #[test]
    fn resize_changes_worker_count() {
        let tables = Arc::new(load_magic_tables());
        let mut pool = ThreadPool::new(1, tables, 1);
        assert_eq!(pool.size(), 1);
        pool.resize(3);
        assert_eq!(pool.size(), 3);
    }
}
