//! Single-assignment outcome cell for one attempt.
//!
//! Every event source of an attempt (exchange, connection driver, timer)
//! reports through `Settlement::settle`. The first report wins and aborts
//! every tracked task; later reports return `false` and are dropped.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tokio::task::AbortHandle;

struct State<T> {
    tx: Option<oneshot::Sender<T>>,
    tasks: Vec<AbortHandle>,
}

pub struct Settlement<T> {
    state: Mutex<State<T>>,
}

impl<T> Settlement<T> {
    /// Create the cell and the receiver that observes its single value.
    pub fn new() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let settlement = Arc::new(Self {
            state: Mutex::new(State {
                tx: Some(tx),
                tasks: Vec::new(),
            }),
        });
        (settlement, rx)
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Settle with `value` if nothing has settled yet.
    ///
    /// Returns `false` when the cell was already settled.
    pub fn settle(&self, value: T) -> bool {
        let mut state = self.lock();
        let Some(tx) = state.tx.take() else {
            return false;
        };
        let _ = tx.send(value);
        for task in state.tasks.drain(..) {
            task.abort();
        }
        true
    }

    /// Register a task to abort on settlement. Aborted immediately if
    /// the cell already settled.
    pub fn track(&self, task: AbortHandle) {
        let mut state = self.lock();
        if state.tx.is_none() {
            task.abort();
        } else {
            state.tasks.push(task);
        }
    }

    /// Abort every tracked task without settling.
    pub fn abort_all(&self) {
        for task in self.lock().tasks.drain(..) {
            task.abort();
        }
    }
}

/// Aborts an attempt's tasks when the awaiting side goes away.
pub struct AbortOnDrop<T>(pub Arc<Settlement<T>>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort_all();
    }
}
