//! SLUICE Operation Gate
//!
//! Static operation descriptors, declarative validation rules and the gate
//! that interprets them. Every invocation passes through [`Gate::check`]
//! before it reaches a collaborator, and every check produces a logged
//! [`Decision`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decision;
pub mod descriptor;
pub mod gate;
pub mod redact;
pub mod rule;
pub mod sql_guard;

pub use decision::{Decision, Verdict};
pub use descriptor::{DefaultValue, OperationSpec, ParamSpec, ParamType};
pub use gate::{enforce_schema, Gate};
pub use redact::Redactor;
pub use rule::{PathKind, Rule, SQL_PRIVILEGES};
pub use sql_guard::check_read_only;
