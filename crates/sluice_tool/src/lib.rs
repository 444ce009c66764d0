//! SLUICE Tool System
//!
//! Tool families, the operation registry and the dispatcher that routes
//! every invocation through the gate before a collaborator sees it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod args;
pub mod dispatch;
pub mod normalize;
pub mod registry;
pub mod schema;
pub mod testing;
pub mod trait_;
pub mod validate;

pub use args::Args;
pub use dispatch::{Dispatcher, InvocationRequest};
pub use normalize::normalize;
pub use registry::{RegistryError, ToolEntry, ToolRegistry};
pub use schema::{input_schema, ToolDescription};
pub use trait_::{unknown_operation, ToolSet};
pub use validate::{validate_spec, CatalogError};
