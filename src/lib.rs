//! # spark-islands
//!
//! On-demand activation runtime for server-rendered markup.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for the
//! reactive surface (load status per script, registered component names).
//!
//! ## Architecture
//!
//! There is no virtual tree and no diffing. Markup stays the source of truth;
//! the runtime attaches behavior to it lazily:
//!
//! ```text
//! document listener → dispatch → (load script → buffer → replay)
//!                              → handler → set_state → bindings re-render
//! ```
//!
//! - One capture listener per event type, installed on the document
//! - Component behavior is loaded eagerly, on first interaction, on
//!   visibility, or on idle, as each element asks
//! - Instance state is hydrated from existing markup on activation
//! - Text, list and conditional bindings re-render only the keys that changed
//!
//! ## Modules
//!
//! - [`types`] - Core types (State, Interaction, LoadStrategy, LoadStatus)
//! - [`config`] - Attribute names and default subscriptions, TOML-loadable
//! - [`dom`] - Node-tree adapter trait and the in-memory document
//! - [`host`] - Script, viewport and idle collaborators
//! - [`bindings`] - Text, list-repeat and conditional bindings
//! - [`engine`] - Registry, instances, dispatch, scheduler, runtime

pub mod bindings;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod host;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::{Attributes, RuntimeConfig};

pub use dom::{Dom, ElementTable, MemoryDom, MemoryNode, NodeRef};

pub use engine::{
    ActionContext, BufferedEvent, ComponentDefinition, DispatchOutcome, InstanceHandle, Runtime,
    RuntimeBuilder,
};

pub use error::{ConfigError, LoadError, MarkupError};

pub use host::{IdleScheduler, ManualIdle, ManualScripts, ManualViewport, ScriptInjector, Viewport};

pub use bindings::BindingKinds;
