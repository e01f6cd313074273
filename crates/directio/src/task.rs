//! Task lifecycle and the exactly-once completion guard.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use directio_sys::{DirectIoError, DirectIoResult, Fd, Operation};
use tracing::warn;

/// Lifecycle of one asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TaskState {
    Created = 0,
    /// Handed to the runtime, not yet picked up by a worker.
    Queued = 1,
    /// The platform call is running on a blocking worker.
    Executing = 2,
    /// The callback has returned (or was abandoned by a panic).
    Completed = 3,
}

impl TaskState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Queued,
            2 => Self::Executing,
            _ => Self::Completed,
        }
    }
}

/// Shared, lock-free task state.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(TaskState::Created as u8))
    }

    pub fn get(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: TaskState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Caller-side view of a submitted task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    operation: Operation,
    fd: Fd,
    state: Arc<StateCell>,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn fd(&self) -> Fd {
        self.fd
    }

    pub fn state(&self) -> TaskState {
        self.state.get()
    }

    pub fn is_completed(&self) -> bool {
        self.state() == TaskState::Completed
    }
}

type Callback<T> = Box<dyn FnOnce(DirectIoResult<T>) + Send>;

/// Owns the callback of one in-flight operation.
///
/// The callback fires exactly once: through [`Task::complete`], or with
/// [`DirectIoError::Cancelled`] when the task is dropped before completing.
/// The state becomes `Completed` when the task is released.
pub(crate) struct Task<T> {
    id: u64,
    operation: Operation,
    state: Arc<StateCell>,
    callback: Option<Callback<T>>,
}

impl<T> Task<T> {
    pub fn new<F>(id: u64, operation: Operation, fd: Fd, callback: F) -> (Self, TaskHandle)
    where
        F: FnOnce(DirectIoResult<T>) + Send + 'static,
    {
        let state = Arc::new(StateCell::new());
        let handle = TaskHandle {
            id,
            operation,
            fd,
            state: Arc::clone(&state),
        };
        let task = Self {
            id,
            operation,
            state,
            callback: Some(Box::new(callback)),
        };
        (task, handle)
    }

    pub fn set_state(&self, state: TaskState) {
        self.state.set(state);
    }

    /// Delivers `result` and releases the task.
    pub fn complete(mut self, result: DirectIoResult<T>) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            warn!(
                task_id = self.id,
                operation = %self.operation,
                "task dropped before completion"
            );
            callback(Err(DirectIoError::Cancelled));
        }
        self.state.set(TaskState::Completed);
    }
}
