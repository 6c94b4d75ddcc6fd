//! Host collaborators.
//!
//! The runtime reaches the outside world through three traits besides
//! [`Dom`](crate::dom::Dom):
//!
//! - [`ScriptInjector`] - fetch and execute a behavior script by URL
//! - [`Viewport`] - watch elements for first intersection
//! - [`IdleScheduler`] - run work when the host is idle
//!
//! The [`manual`] adapters implement all three by queueing work until a test
//! (or a headless host) drives it explicitly.

pub mod manual;

use crate::error::LoadError;

pub use manual::{ManualIdle, ManualScripts, ManualViewport};

/// Completion callback for a script injection.
pub type LoadCallback = Box<dyn FnOnce(Result<(), LoadError>)>;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Loads and executes behavior scripts.
///
/// Executing a script is expected to call
/// [`Runtime::register`](crate::Runtime::register) before `done` is called.
pub trait ScriptInjector {
    /// Start loading `src`. `done` is called exactly once, possibly
    /// synchronously.
    fn inject(&self, src: &str, done: LoadCallback);
}

/// Shared intersection watcher.
///
/// The host reports intersections back through
/// [`Runtime::notify_visible`](crate::Runtime::notify_visible).
pub trait Viewport<N> {
    fn observe(&self, node: &N);

    fn unobserve(&self, node: &N);
}

/// Idle-time scheduling.
pub trait IdleScheduler {
    /// Run `task` when the host is idle. Hosts without an idle primitive hand
    /// the task back as `Err`.
    fn request_idle(&self, task: Task) -> Result<(), Task>;

    /// Run `task` after the current turn of the event loop.
    fn defer(&self, task: Task);
}
