//! Activation Engine - registry, instances, dispatch and lazy loading.
//!
//! The engine manages:
//! - Registry: component name → behavior definition
//! - Instances: per-element state, hydrated from and rendered to markup
//! - Dispatch: one document listener per event type, resolving interactions
//!   by walking the tree
//! - Scheduler + Loader: when and how behavior scripts are fetched
//!
//! # Architecture
//!
//! Everything hangs off one [`Runtime`]. Components are not objects; they are
//! markup elements plus a registered definition:
//!
//! ```text
//! host event → dispatch ─┬─ registered   → activate → handler → set_state → render
//!                        └─ unregistered → buffer → scheduler → loader
//!                                                               │
//!                             register ← script executes ←──────┘
//!                             replay buffered interactions
//! ```

mod dispatch;
mod instance;
mod loader;
mod registry;
mod runtime;
mod scheduler;

pub use dispatch::{BufferedEvent, DispatchOutcome};
pub use instance::InstanceHandle;
pub use loader::ScriptLoader;
pub use registry::{
    ActionContext, ActionHandler, ComponentDefinition, ComponentRegistry, LifecycleHook,
    UpdateHook,
};
pub use runtime::{Runtime, RuntimeBuilder};
