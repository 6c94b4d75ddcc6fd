//! Script Loader - deduplicated behavior-script loading by URL.
//!
//! - First request for a URL injects it and records a pending load
//! - Requests while pending join the waiter list (no second injection)
//! - Success keeps the entry, so later requests resolve immediately
//! - Failure removes the entry, so a later request injects again
//!
//! Waiters run in request order once the host reports completion, and on
//! success before the status signal reports `Loaded`.
//!
//! Each URL also has a `Signal<LoadStatus>` so host code can derive UI from
//! loading progress.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use spark_signals::{signal, Signal};
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::host::{LoadCallback, ScriptInjector};
use crate::types::LoadStatus;

enum LoadState {
    Pending(Vec<LoadCallback>),
    Loaded,
}

type Loads = Rc<RefCell<HashMap<String, LoadState>>>;
type Statuses = Rc<RefCell<HashMap<String, Signal<LoadStatus>>>>;

/// Loads behavior scripts through a [`ScriptInjector`], at most one in-flight
/// injection per URL.
pub struct ScriptLoader {
    injector: Rc<dyn ScriptInjector>,
    loads: Loads,
    statuses: Statuses,
}

impl ScriptLoader {
    pub fn new(injector: Rc<dyn ScriptInjector>) -> Self {
        Self {
            injector,
            loads: Rc::new(RefCell::new(HashMap::new())),
            statuses: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Load `src`, calling `done` once it has executed or failed.
    pub fn load(&self, src: &str, done: LoadCallback) {
        let loaded = self
            .loads
            .borrow()
            .get(src)
            .map(|state| matches!(state, LoadState::Loaded));

        match loaded {
            Some(true) => done(Ok(())),
            Some(false) => {
                debug!(src, "joining in-flight load");
                if let Some(LoadState::Pending(waiters)) = self.loads.borrow_mut().get_mut(src) {
                    waiters.push(done);
                }
            }
            None => {
                self.loads
                    .borrow_mut()
                    .insert(src.to_string(), LoadState::Pending(vec![done]));
                self.begin(src);
            }
        }
    }

    /// Whether `src` has an in-flight injection.
    pub fn is_pending(&self, src: &str) -> bool {
        matches!(self.loads.borrow().get(src), Some(LoadState::Pending(_)))
    }

    /// Whether `src` has executed successfully.
    pub fn is_loaded(&self, src: &str) -> bool {
        matches!(self.loads.borrow().get(src), Some(LoadState::Loaded))
    }

    pub fn status(&self, src: &str) -> LoadStatus {
        self.statuses
            .borrow()
            .get(src)
            .map_or(LoadStatus::Idle, |status| status.get())
    }

    /// Status signal for `src`, created in the `Idle` state on first use.
    pub fn status_signal(&self, src: &str) -> Signal<LoadStatus> {
        status_signal(&self.statuses, src)
    }

    fn begin(&self, src: &str) {
        debug!(src, "injecting script");
        status_signal(&self.statuses, src).set(LoadStatus::Loading);

        let loads = Rc::clone(&self.loads);
        let statuses = Rc::clone(&self.statuses);
        let url = src.to_string();
        self.injector.inject(
            src,
            Box::new(move |result: Result<(), LoadError>| {
                finish(&loads, &statuses, &url, result)
            }),
        );
    }
}

fn status_signal(statuses: &Statuses, src: &str) -> Signal<LoadStatus> {
    statuses
        .borrow_mut()
        .entry(src.to_string())
        .or_insert_with(|| signal(LoadStatus::Idle))
        .clone()
}

fn finish(loads: &Loads, statuses: &Statuses, src: &str, result: Result<(), LoadError>) {
    let waiters = {
        let mut loads = loads.borrow_mut();
        let previous = match &result {
            Ok(()) => loads.insert(src.to_string(), LoadState::Loaded),
            Err(_) => loads.remove(src),
        };
        match previous {
            Some(LoadState::Pending(waiters)) => waiters,
            _ => Vec::new(),
        }
    };

    // Waiters replay buffered interactions; the status signal flips to
    // `Loaded` only once they are done.
    match &result {
        Ok(()) => {
            debug!(src, waiters = waiters.len(), "script loaded");
            for waiter in waiters {
                waiter(Ok(()));
            }
            status_signal(statuses, src).set(LoadStatus::Loaded);
        }
        Err(err) => {
            warn!(src, error = %err, "script failed to load");
            status_signal(statuses, src).set(LoadStatus::Failed);
            for waiter in waiters {
                waiter(result.clone());
            }
        }
    }
}
