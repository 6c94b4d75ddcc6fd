//! Core types for spark-islands.
//!
//! These flow between the host, the dispatch engine and the binding engine.

use serde_json::{Map, Value};

// =============================================================================
// State
// =============================================================================

/// Per-instance component state: string keys to JSON values.
pub type State = Map<String, Value>;

// =============================================================================
// Interaction
// =============================================================================

/// A raw interaction delivered by the host: an event type and the element it
/// originated on.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction<N> {
    /// Event type, e.g. "click" or "input".
    pub event_type: String,
    /// Originating element.
    pub target: N,
    /// Host payload (input value, key, coordinates...). `Null` when absent.
    pub detail: Value,
}

impl<N> Interaction<N> {
    /// Create an interaction with no payload.
    pub fn new(event_type: impl Into<String>, target: N) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            detail: Value::Null,
        }
    }

    /// Attach a host payload.
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }
}

// =============================================================================
// Loading
// =============================================================================

/// When a component's behavior script is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStrategy {
    /// During the scan pass.
    #[default]
    Eager,
    /// On the first action that targets the component.
    Interaction,
    /// When the element first intersects the viewport.
    Visible,
    /// When the host is idle.
    Idle,
}

impl LoadStrategy {
    /// Parse an attribute value. `None` for unrecognised values.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "eager" => Some(Self::Eager),
            "interaction" => Some(Self::Interaction),
            "visible" => Some(Self::Visible),
            "idle" => Some(Self::Idle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eager => "eager",
            Self::Interaction => "interaction",
            Self::Visible => "visible",
            Self::Idle => "idle",
        }
    }
}

/// Progress of a behavior script load, per source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    /// Never requested.
    #[default]
    Idle,
    /// Injected, waiting for the host.
    Loading,
    /// Executed successfully. Later requests resolve immediately.
    Loaded,
    /// Last attempt failed. A later request retries.
    Failed,
}
