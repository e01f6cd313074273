//! Asynchronous task bridge.
//!
//! Each operation is validated synchronously, then its blocking platform call
//! runs on the runtime's blocking pool while the caller carries on. The
//! callback receives the outcome exactly once: the result of the call, or
//! [`DirectIoError::Cancelled`] if the work was dropped before it started or
//! the call panicked.
//!
//! The capability check comes first, so an operation the platform lacks is
//! rejected before its arguments are looked at.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use directio_sys::{
    DeviceInfo, DirectIoError, DirectIoResult, Fd, NativePlatform, Operation, Platform,
};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::args::Request;
use crate::task::{Task, TaskHandle, TaskState};

/// Payload delivered by [`Bridge::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Result of a geometry inquiry.
    Device(DeviceInfo),
    /// A toggle operation finished.
    Done,
}

type BoxedCallback<T> = Box<dyn FnOnce(DirectIoResult<T>) + Send>;

/// Dispatches device operations onto a tokio runtime.
///
/// Cloning is cheap; clones share the platform and the task-id counter.
#[derive(Debug, Clone)]
pub struct Bridge {
    handle: Handle,
    platform: Arc<dyn Platform>,
    next_id: Arc<AtomicU64>,
}

impl Bridge {
    /// Creates a bridge for the native platform on the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self::with_platform(handle, Arc::new(NativePlatform::default()))
    }

    /// Creates a bridge that dispatches to `platform`.
    pub fn with_platform(handle: Handle, platform: Arc<dyn Platform>) -> Self {
        Self {
            handle,
            platform,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    /// Queries sector sizes, total size and serial number of a device.
    pub fn query_block_device<F>(&self, fd: i32, callback: F) -> DirectIoResult<TaskHandle>
    where
        F: FnOnce(DirectIoResult<DeviceInfo>) + Send + 'static,
    {
        self.dispatch(
            Operation::QueryBlockDevice,
            fd,
            |platform, fd| platform.query_block_device(fd),
            callback,
        )
    }

    /// Turns the unified buffer cache off (`true`) or on (`false`).
    pub fn set_cache_bypass<F>(
        &self,
        fd: i32,
        enabled: bool,
        callback: F,
    ) -> DirectIoResult<TaskHandle>
    where
        F: FnOnce(DirectIoResult<()>) + Send + 'static,
    {
        self.dispatch(
            Operation::SetCacheBypass,
            fd,
            move |platform, fd| platform.set_cache_bypass(fd, enabled),
            callback,
        )
    }

    /// Takes (`true`) or releases (`false`) an exclusive advisory lock.
    pub fn set_advisory_lock<F>(
        &self,
        fd: i32,
        enabled: bool,
        callback: F,
    ) -> DirectIoResult<TaskHandle>
    where
        F: FnOnce(DirectIoResult<()>) + Send + 'static,
    {
        self.dispatch(
            Operation::SetAdvisoryLock,
            fd,
            move |platform, fd| platform.set_advisory_lock(fd, enabled),
            callback,
        )
    }

    /// Locks (`true`) or unlocks (`false`) the volume behind the descriptor.
    pub fn set_volume_lock<F>(
        &self,
        fd: i32,
        enabled: bool,
        callback: F,
    ) -> DirectIoResult<TaskHandle>
    where
        F: FnOnce(DirectIoResult<()>) + Send + 'static,
    {
        self.dispatch(
            Operation::SetVolumeLock,
            fd,
            move |platform, fd| platform.set_volume_lock(fd, enabled),
            callback,
        )
    }

    /// Runs `op` with dynamically typed arguments: `(fd)` for a query,
    /// `(fd, 0|1)` for the toggles.
    pub fn submit<F>(&self, op: Operation, args: &[Value], callback: F) -> DirectIoResult<TaskHandle>
    where
        F: FnOnce(DirectIoResult<Completion>) + Send + 'static,
    {
        self.platform.ensure_supported(op)?;
        let Request { fd, enabled } = Request::parse(op, args)?;
        match op {
            Operation::QueryBlockDevice => {
                self.query_block_device(fd, move |result| callback(result.map(Completion::Device)))
            }
            Operation::SetCacheBypass => self.set_cache_bypass(fd, enabled, done(callback)),
            Operation::SetAdvisoryLock => self.set_advisory_lock(fd, enabled, done(callback)),
            Operation::SetVolumeLock => self.set_volume_lock(fd, enabled, done(callback)),
        }
    }

    /// Awaitable form of [`Bridge::query_block_device`].
    pub async fn query(&self, fd: i32) -> DirectIoResult<DeviceInfo> {
        completion(|callback| self.query_block_device(fd, callback)).await
    }

    /// Awaitable form of [`Bridge::set_cache_bypass`].
    pub async fn cache_bypass(&self, fd: i32, enabled: bool) -> DirectIoResult<()> {
        completion(|callback| self.set_cache_bypass(fd, enabled, callback)).await
    }

    /// Awaitable form of [`Bridge::set_advisory_lock`].
    pub async fn advisory_lock(&self, fd: i32, enabled: bool) -> DirectIoResult<()> {
        completion(|callback| self.set_advisory_lock(fd, enabled, callback)).await
    }

    /// Awaitable form of [`Bridge::set_volume_lock`].
    pub async fn volume_lock(&self, fd: i32, enabled: bool) -> DirectIoResult<()> {
        completion(|callback| self.set_volume_lock(fd, enabled, callback)).await
    }

    fn dispatch<T, W, F>(
        &self,
        op: Operation,
        fd: i32,
        work: W,
        callback: F,
    ) -> DirectIoResult<TaskHandle>
    where
        T: Send + 'static,
        W: FnOnce(&dyn Platform, Fd) -> DirectIoResult<T> + Send + 'static,
        F: FnOnce(DirectIoResult<T>) + Send + 'static,
    {
        self.platform.ensure_supported(op)?;
        let fd = Fd::new(fd).ok_or(DirectIoError::BadArguments(op.bad_arguments()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (task, handle) = Task::new(id, op, fd, callback);
        let platform = Arc::clone(&self.platform);

        task.set_state(TaskState::Queued);
        debug!(task_id = id, operation = %op, fd = fd.raw(), "queued");

        // The task moves into the blocking closure. A started call always
        // delivers its own outcome; only unstarted work reaches `Task::drop`.
        self.handle.spawn(async move {
            tokio::task::spawn_blocking(move || {
                task.set_state(TaskState::Executing);
                let result = panic::catch_unwind(AssertUnwindSafe(|| work(platform.as_ref(), fd)))
                    .unwrap_or_else(|_| {
                        error!(task_id = id, operation = %op, "device call panicked");
                        Err(DirectIoError::Cancelled)
                    });

                debug!(task_id = id, operation = %op, ok = result.is_ok(), "completed");
                task.complete(result);
            });
        });

        Ok(handle)
    }
}

/// Adapts a [`Completion`] callback to a toggle operation.
fn done<F>(callback: F) -> impl FnOnce(DirectIoResult<()>) + Send + 'static
where
    F: FnOnce(DirectIoResult<Completion>) + Send + 'static,
{
    move |result| callback(result.map(|()| Completion::Done))
}

/// Submits through `submit` and awaits the callback's result.
async fn completion<T, S>(submit: S) -> DirectIoResult<T>
where
    T: Send + 'static,
    S: FnOnce(BoxedCallback<T>) -> DirectIoResult<TaskHandle>,
{
    let (tx, rx) = oneshot::channel();
    submit(Box::new(move |result| {
        _ = tx.send(result);
    }))?;
    rx.await.unwrap_or(Err(DirectIoError::Cancelled))
}
