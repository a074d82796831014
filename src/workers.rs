use crate::error::DistgenError;
use log::warn;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Barrier;
use std::thread;

/// Fan-out/join helper: one named OS thread per thread id, joined in spawn order
pub struct WorkerSet<T> {
    handles: Vec<(usize, thread::JoinHandle<T>)>,
}

impl<T: Send + 'static> WorkerSet<T> {
    pub fn new() -> Self {
        WorkerSet {
            handles: Vec::new(),
        }
    }

    /// Spawn worker `tid`, optionally pinned to CPU core `tid`
    pub fn spawn<F>(
        &mut self,
        name: String,
        tid: usize,
        pin: bool,
        work: F,
    ) -> Result<(), DistgenError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                if pin {
                    pin_current(tid);
                }
                work()
            })
            .map_err(|source| DistgenError::Spawn { name, source })?;
        self.handles.push((tid, handle));
        Ok(())
    }

    /// Block until every worker finishes. Results come back in spawn order;
    /// the first panicked worker turns the whole set into an error.
    pub fn wait(self) -> Result<Vec<T>, DistgenError> {
        let mut results = Vec::with_capacity(self.handles.len());
        let mut failed = None;
        for (tid, handle) in self.handles {
            match handle.join() {
                Ok(value) => results.push(value),
                Err(_) => {
                    failed.get_or_insert(tid);
                }
            }
        }
        match failed {
            Some(tid) => Err(DistgenError::WorkerPanicked { tid }),
            None => Ok(results),
        }
    }
}

impl<T: Send + 'static> Default for WorkerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `prepare`, then meet the other participants at `start` even when
/// `prepare` panicked, so one failed worker cannot leave the rest blocked on
/// the barrier. The panic is resumed after the barrier and reaches the joiner.
pub fn prepare_then_wait<R>(start: &Barrier, prepare: impl FnOnce() -> R) -> R {
    let prepared = panic::catch_unwind(AssertUnwindSafe(prepare));
    start.wait();
    prepared.unwrap_or_else(|payload| panic::resume_unwind(payload))
}

fn pin_current(tid: usize) {
    let core = core_affinity::CoreId { id: tid };
    if !core_affinity::set_for_current(core) {
        warn!("Couldn't pin worker {} to CPU core {} (NOTE: this is expected on macOS)", tid, tid);
    }
}
