//! Tool family trait

use async_trait::async_trait;
use sluice_core::{Payload, ToolError, ToolResult};
use sluice_policy::OperationSpec;

use crate::args::Args;

/// A family of operations sharing one collaborator.
///
/// The dispatcher only calls [`ToolSet::invoke`] after the gate has accepted
/// the arguments, so implementations can trust declared types and rules.
#[async_trait]
pub trait ToolSet: Send + Sync {
    /// Family name (notes, fs, git, pg)
    fn family(&self) -> &'static str;

    /// Static descriptor table
    fn operations(&self) -> &'static [OperationSpec];

    /// Run one operation against the collaborator
    async fn invoke(&self, operation: &str, args: Args) -> ToolResult<Payload>;
}

/// Error for an operation name a family does not handle
#[must_use]
pub fn unknown_operation(family: &str, operation: &str) -> ToolError {
    ToolError::not_found("operation", format!("{}/{}", family, operation))
}
