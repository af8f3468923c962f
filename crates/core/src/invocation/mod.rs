//! Per-request invocation of the external interpreter.
//!
//! [`orchestrator::invoke`] is the entry point. The submodules split the work:
//! command construction ([`target`]), the deadline scope ([`deadline`]),
//! process supervision ([`subprocess`]) and result types ([`outcome`]).

pub mod deadline;
pub mod orchestrator;
pub mod outcome;
pub mod subprocess;
pub mod target;

pub use orchestrator::{invoke, is_json};
pub use outcome::{FailureReason, InvocationError, InvocationOutcome, InvocationOutput};
pub use target::{InvocationConfig, InvocationTarget, Runtime, SamTarget, ScriptSource, ScriptTarget};
