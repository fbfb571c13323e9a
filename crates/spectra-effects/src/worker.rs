//! Threads that help the audio thread run lanes.

use crate::state::LaneShared;
use crate::Result;
use spectra_core::{ScopedLock, WaitMechanism};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thread_priority::ThreadPriority;

/// Fixed set of lane workers. Workers park between blocks and are joined
/// on drop.
pub(crate) struct WorkerPool {
    shared: Arc<LaneShared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn spawn(shared: Arc<LaneShared>, count: usize) -> Result<Self> {
        let mut pool = Self {
            shared,
            handles: Vec::with_capacity(count),
        };
        for index in 0..count {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("spectra-lane-{index}"))
                .spawn(move || {
                    let _ = thread_priority::set_current_thread_priority(ThreadPriority::Max);
                    worker_loop(&shared);
                })?;
            pool.handles.push(handle);
        }
        if count > 0 {
            tracing::debug!(workers = count, "lane workers started");
        }
        Ok(pool)
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }
}

fn worker_loop(shared: &LaneShared) {
    let mut seen = shared.wake.load(Ordering::Acquire);
    loop {
        // Workers always park: the audio thread notifies every wake-up.
        WaitMechanism::Wait.wait_while(shared.wake_key(), || {
            shared.wake.load(Ordering::Acquire) == seen && !shared.shutdown.load(Ordering::Acquire)
        });
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        seen = shared.wake.load(Ordering::Acquire);

        // An edit in progress means there is no block to help with.
        if let Some(_topology) = ScopedLock::try_new(&shared.topology, false, shared.mechanism) {
            // SAFETY: shared topology hold.
            let lanes = unsafe { shared.lanes() };
            shared.distribute_work(lanes);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        WaitMechanism::WaitNotify.notify(self.shared.wake_key());
        let count = self.handles.len();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        if count > 0 {
            tracing::debug!(workers = count, "lane workers stopped");
        }
    }
}
