//! Bounded-concurrency task queue for translation requests
//!
//! Runs queued futures on a fixed pool of workers, highest priority
//! first and FIFO within a priority. Tasks are labeled with an id:
//! adding a task whose id is already queued does not enqueue a second
//! copy, the new caller just shares the eventual result. Subscribers
//! can ask to be notified each time the queue drains back to idle.
//!
//! The queue must be created inside a tokio runtime, because workers
//! are spawned at construction.
//!
//! # Example
//!
//! ```ignore
//! use i18n_keyless::TaskQueue;
//!
//! let queue = TaskQueue::new(10);
//! let handle = queue.add("greeting", 1, async { fetch_greeting().await });
//! if let Some(response) = handle.wait().await {
//!     println!("{:?}", response);
//! }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::{Semaphore, mpsc, oneshot};

/// Worker count used when the caller does not configure one
pub const DEFAULT_CONCURRENCY: usize = 10;

type BoxedTask<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type Waiters<T> = Arc<Mutex<Vec<oneshot::Sender<T>>>>;

struct QueuedTask<T> {
    id: String,
    priority: i32,
    seq: u64,
    fut: BoxedTask<T>,
    waiters: Waiters<T>,
}

struct QueueState<T> {
    queued: Vec<QueuedTask<T>>,
    waiting: HashMap<String, Waiters<T>>,
    next_seq: u64,
    pending: usize,
    empty_subscribers: Vec<mpsc::UnboundedSender<()>>,
    closed: bool,
}

struct QueueInner<T> {
    state: Mutex<QueueState<T>>,
    available: Semaphore,
}

/// Handle to a queued task
///
/// Resolves with the task result, or `None` if the task panicked or the
/// queue was closed before it ran.
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> TaskHandle<T> {
    pub async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }
}

/// Fixed-worker priority queue over spawned futures
pub struct TaskQueue<T: Clone + Send + 'static> {
    inner: Arc<QueueInner<T>>,
}

impl<T: Clone + Send + 'static> TaskQueue<T> {
    /// Starts a queue with the given number of workers (at least one)
    pub fn new(concurrency: usize) -> Self {
        let inner = Arc::new(QueueInner {
            state: Mutex::new(QueueState {
                queued: Vec::new(),
                waiting: HashMap::new(),
                next_seq: 0,
                pending: 0,
                empty_subscribers: Vec::new(),
                closed: false,
            }),
            available: Semaphore::new(0),
        });
        for _ in 0..concurrency.max(1) {
            tokio::spawn(Self::worker_loop(Arc::clone(&inner)));
        }
        Self { inner }
    }

    /// Enqueues a task under an id
    ///
    /// If a task with the same id is already queued, no new entry is
    /// created; the returned handle resolves with that task's result. A
    /// task that has already started running is past joining, so a later
    /// add with its id queues a fresh task.
    pub fn add<F>(&self, id: &str, priority: i32, fut: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let handle = TaskHandle { rx };

        let mut state = self.inner.state.lock().expect("lock poisoned");
        if state.closed {
            return handle;
        }
        if let Some(waiters) = state.waiting.get(id) {
            waiters.lock().expect("lock poisoned").push(tx);
            return handle;
        }

        let waiters: Waiters<T> = Arc::new(Mutex::new(vec![tx]));
        state.waiting.insert(id.to_string(), Arc::clone(&waiters));
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queued.push(QueuedTask {
            id: id.to_string(),
            priority,
            seq,
            fut: Box::pin(fut),
            waiters,
        });
        drop(state);

        self.inner.available.add_permits(1);
        handle
    }

    /// Number of tasks waiting for a worker
    pub fn queued(&self) -> usize {
        self.inner.state.lock().expect("lock poisoned").queued.len()
    }

    /// Number of tasks currently running
    pub fn pending(&self) -> usize {
        self.inner.state.lock().expect("lock poisoned").pending
    }

    /// True when nothing is queued or running
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock().expect("lock poisoned");
        state.queued.is_empty() && state.pending == 0
    }

    /// Subscribes to drain notifications
    ///
    /// The receiver gets one message each time the last outstanding task
    /// finishes and nothing else is queued.
    pub fn on_empty(&self) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .state
            .lock()
            .expect("lock poisoned")
            .empty_subscribers
            .push(tx);
        rx
    }

    /// Stops the workers and drops every queued task
    ///
    /// Outstanding handles resolve with `None`. Adding after close
    /// returns dead handles.
    pub fn close(&self) {
        {
            let mut state = self.inner.state.lock().expect("lock poisoned");
            state.closed = true;
            state.queued.clear();
            state.waiting.clear();
        }
        self.inner.available.close();
    }

    async fn worker_loop(inner: Arc<QueueInner<T>>) {
        loop {
            let permit = match inner.available.acquire().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            permit.forget();

            let task = {
                let mut state = inner.state.lock().expect("lock poisoned");
                let Some(index) = state
                    .queued
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, task)| (task.priority, std::cmp::Reverse(task.seq)))
                    .map(|(index, _)| index)
                else {
                    continue;
                };
                let task = state.queued.swap_remove(index);
                state.waiting.remove(&task.id);
                state.pending += 1;
                task
            };

            // The future runs in its own tokio task so a panic unwinds
            // there instead of tearing down this worker.
            let result = match tokio::spawn(task.fut).await {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!("i18n-keyless: queued task {} failed: {}", task.id, e);
                    None
                }
            };

            if let Some(value) = result {
                let senders = std::mem::take(&mut *task.waiters.lock().expect("lock poisoned"));
                for tx in senders {
                    let _ = tx.send(value.clone());
                }
            }

            let mut state = inner.state.lock().expect("lock poisoned");
            state.pending -= 1;
            if state.pending == 0 && state.queued.is_empty() {
                state.empty_subscribers.retain(|tx| tx.send(()).is_ok());
            }
        }
    }
}

impl<T: Clone + Send + 'static> Drop for TaskQueue<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // ========== Scheduling Tests ==========

    #[tokio::test]
    async fn test_add_runs_task_and_delivers_result() {
        let queue = TaskQueue::new(2);
        let handle = queue.add("a", 0, async { 7 });
        assert_eq!(handle.wait().await, Some(7));
    }

    #[tokio::test]
    async fn test_concurrency_limit_is_respected() {
        let queue = TaskQueue::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(queue.add(&format!("task-{}", i), 0, async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                i
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.wait().await, Some(i));
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_higher_priority_runs_first() {
        let queue = TaskQueue::new(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let order = Arc::new(Mutex::new(Vec::new()));

        // Occupy the single worker so the later adds pile up in the queue.
        let blocker = queue.add("blocker", 100, async move {
            let _ = release_rx.await;
            0
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut handles = Vec::new();
        for priority in [1, 9, 5] {
            let order = Arc::clone(&order);
            handles.push(queue.add(&format!("p{}", priority), priority, async move {
                order.lock().expect("lock poisoned").push(priority);
                priority
            }));
        }
        release_tx.send(()).unwrap();

        assert_eq!(blocker.wait().await, Some(0));
        for handle in handles {
            handle.wait().await;
        }
        assert_eq!(*order.lock().expect("lock poisoned"), vec![9, 5, 1]);
    }

    #[tokio::test]
    async fn test_fifo_among_equal_priorities() {
        let queue = TaskQueue::new(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let order = Arc::new(Mutex::new(Vec::new()));

        let blocker = queue.add("blocker", 0, async move {
            let _ = release_rx.await;
            0
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut handles = Vec::new();
        for i in 1..=3 {
            let order = Arc::clone(&order);
            handles.push(queue.add(&format!("task-{}", i), 0, async move {
                order.lock().expect("lock poisoned").push(i);
                i
            }));
        }
        release_tx.send(()).unwrap();

        blocker.wait().await;
        for handle in handles {
            handle.wait().await;
        }
        assert_eq!(*order.lock().expect("lock poisoned"), vec![1, 2, 3]);
    }

    // ========== Duplicate Id Tests ==========

    #[tokio::test]
    async fn test_duplicate_id_joins_queued_task() {
        let queue = TaskQueue::new(1);
        let calls = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let blocker = queue.add("blocker", 0, async move {
            let _ = release_rx.await;
            0
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let first_calls = Arc::clone(&calls);
        let first = queue.add("greeting", 0, async move {
            first_calls.fetch_add(1, Ordering::SeqCst);
            7
        });
        let second_calls = Arc::clone(&calls);
        let second = queue.add("greeting", 0, async move {
            second_calls.fetch_add(1, Ordering::SeqCst);
            99
        });
        assert_eq!(queue.queued(), 1);
        release_tx.send(()).unwrap();

        assert_eq!(first.wait().await, Some(7));
        assert_eq!(second.wait().await, Some(7));
        blocker.wait().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_running_task_does_not_absorb_new_adds() {
        let queue = TaskQueue::new(2);
        let calls = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let first_calls = Arc::clone(&calls);
        let first = queue.add("greeting", 0, async move {
            first_calls.fetch_add(1, Ordering::SeqCst);
            let _ = started_tx.send(());
            let _ = release_rx.await;
            1
        });
        started_rx.await.unwrap();

        let second_calls = Arc::clone(&calls);
        let second = queue.add("greeting", 0, async move {
            second_calls.fetch_add(1, Ordering::SeqCst);
            2
        });
        release_tx.send(()).unwrap();

        assert_eq!(first.wait().await, Some(1));
        assert_eq!(second.wait().await, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    // ========== Drain Notification Tests ==========

    #[tokio::test]
    async fn test_empty_fires_once_per_drain() {
        let queue = TaskQueue::new(2);
        let mut empty = queue.on_empty();

        for i in 0..3 {
            queue.add(&format!("task-{}", i), 0, async move { i });
        }
        empty.recv().await.unwrap();
        assert!(matches!(
            empty.try_recv(),
            Err(mpsc::error::TryRecvError::Empty)
        ));

        queue.add("late", 0, async { 9 }).wait().await;
        empty.recv().await.unwrap();
        assert!(matches!(
            empty.try_recv(),
            Err(mpsc::error::TryRecvError::Empty)
        ));
    }

    // ========== Failure Tests ==========

    #[tokio::test]
    async fn test_panicking_task_does_not_kill_worker() {
        let queue = TaskQueue::new(1);

        let bad = queue.add("bad", 0, async {
            if true {
                panic!("boom");
            }
            0
        });
        assert_eq!(bad.wait().await, None);

        let good = queue.add("good", 0, async { 5 });
        assert_eq!(good.wait().await, Some(5));
    }

    #[tokio::test]
    async fn test_add_after_close_returns_dead_handle() {
        let queue = TaskQueue::new(1);
        queue.close();
        let handle = queue.add("late", 0, async { 1 });
        assert_eq!(handle.wait().await, None);
    }

    #[tokio::test]
    async fn test_is_idle_reflects_outstanding_work() {
        let queue = TaskQueue::new(1);
        assert!(queue.is_idle());

        let (release_tx, release_rx) = oneshot::channel::<()>();
        let handle = queue.add("task", 0, async move {
            let _ = release_rx.await;
            1
        });
        assert!(!queue.is_idle());

        release_tx.send(()).unwrap();
        handle.wait().await;
        assert!(queue.is_idle());
    }
}
