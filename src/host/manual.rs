//! Queue-backed host adapters for headless runs and tests.
//!
//! Nothing happens until the owner drives it: [`ManualScripts::complete`]
//! finishes an injection, [`ManualIdle::run_all`] drains scheduled work, and
//! the owner calls `Runtime::notify_visible` for nodes [`ManualViewport`]
//! reports as observed.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use super::{IdleScheduler, LoadCallback, ScriptInjector, Task, Viewport};
use crate::dom::NodeRef;
use crate::error::LoadError;

// =============================================================================
// Scripts
// =============================================================================

/// Records injections and completes them on request.
#[derive(Default)]
pub struct ManualScripts {
    injected: RefCell<Vec<String>>,
    pending: RefCell<Vec<(String, LoadCallback)>>,
}

impl ManualScripts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every URL injected so far, in order, duplicates included.
    pub fn injected(&self) -> Vec<String> {
        self.injected.borrow().clone()
    }

    /// Number of times `src` was injected.
    pub fn injection_count(&self, src: &str) -> usize {
        self.injected.borrow().iter().filter(|url| *url == src).count()
    }

    /// Injections not completed yet.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Finish the oldest pending injection of `src`. Returns false when none
    /// is pending.
    pub fn complete(&self, src: &str, result: Result<(), LoadError>) -> bool {
        let done = {
            let mut pending = self.pending.borrow_mut();
            let Some(position) = pending.iter().position(|(url, _)| url == src) else {
                return false;
            };
            pending.remove(position).1
        };
        done(result);
        true
    }

    /// Finish the oldest pending injection of `src` with a failure.
    pub fn fail(&self, src: &str, reason: &str) -> bool {
        self.complete(src, Err(LoadError::failed(src, reason)))
    }
}

impl ScriptInjector for ManualScripts {
    fn inject(&self, src: &str, done: LoadCallback) {
        self.injected.borrow_mut().push(src.to_string());
        self.pending.borrow_mut().push((src.to_string(), done));
    }
}

// =============================================================================
// Viewport
// =============================================================================

/// Records which nodes are being watched.
pub struct ManualViewport<N> {
    observed: RefCell<Vec<N>>,
}

impl<N> Default for ManualViewport<N> {
    fn default() -> Self {
        Self {
            observed: RefCell::new(Vec::new()),
        }
    }
}

impl<N: NodeRef> ManualViewport<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observed(&self) -> Vec<N> {
        self.observed.borrow().clone()
    }

    pub fn is_observed(&self, node: &N) -> bool {
        self.observed.borrow().contains(node)
    }
}

impl<N: NodeRef> Viewport<N> for ManualViewport<N> {
    fn observe(&self, node: &N) {
        let mut observed = self.observed.borrow_mut();
        if !observed.contains(node) {
            observed.push(node.clone());
        }
    }

    fn unobserve(&self, node: &N) {
        self.observed.borrow_mut().retain(|existing| existing != node);
    }
}

// =============================================================================
// Idle
// =============================================================================

/// Queues idle and deferred tasks until drained.
pub struct ManualIdle {
    idle_supported: Cell<bool>,
    idle: RefCell<VecDeque<Task>>,
    deferred: RefCell<VecDeque<Task>>,
}

impl Default for ManualIdle {
    fn default() -> Self {
        Self {
            idle_supported: Cell::new(true),
            idle: RefCell::new(VecDeque::new()),
            deferred: RefCell::new(VecDeque::new()),
        }
    }
}

impl ManualIdle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host with no idle primitive: every request falls back to `defer`.
    pub fn without_idle() -> Self {
        let idle = Self::default();
        idle.idle_supported.set(false);
        idle
    }

    pub fn set_idle_supported(&self, supported: bool) {
        self.idle_supported.set(supported);
    }

    pub fn idle_count(&self) -> usize {
        self.idle.borrow().len()
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.borrow().len()
    }

    /// Run queued idle tasks, including ones queued while running. Returns
    /// how many ran.
    pub fn run_idle(&self) -> usize {
        Self::drain(&self.idle)
    }

    /// Run queued deferred tasks. Returns how many ran.
    pub fn run_deferred(&self) -> usize {
        Self::drain(&self.deferred)
    }

    /// Run everything until both queues are empty.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let batch = self.run_deferred() + self.run_idle();
            if batch == 0 {
                return ran;
            }
            ran += batch;
        }
    }

    fn drain(queue: &RefCell<VecDeque<Task>>) -> usize {
        let mut ran = 0;
        loop {
            // The borrow ends before the task runs; tasks may schedule more.
            let next = queue.borrow_mut().pop_front();
            let Some(task) = next else {
                return ran;
            };
            task();
            ran += 1;
        }
    }
}

impl IdleScheduler for ManualIdle {
    fn request_idle(&self, task: Task) -> Result<(), Task> {
        if !self.idle_supported.get() {
            return Err(task);
        }
        self.idle.borrow_mut().push_back(task);
        Ok(())
    }

    fn defer(&self, task: Task) {
        self.deferred.borrow_mut().push_back(task);
    }
}
