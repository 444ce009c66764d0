//! Typed access to gate-normalized arguments.
//!
//! By the time a handler sees [`Args`] the gate has already checked types,
//! filled defaults and applied rules, so lookups here only fail when a
//! handler asks for something its descriptor never declared.

use serde_json::{Map, Value};
use sluice_core::{ToolError, ToolResult};

/// Normalized arguments of one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Map<String, Value>,
}

impl Args {
    /// Wrap a normalized argument map
    #[must_use]
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Build from a JSON object; anything else yields empty arguments
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(values) => Self { values },
            _ => Self::default(),
        }
    }

    fn missing(name: &str) -> ToolError {
        ToolError::validation(name, "is required")
    }

    /// Raw value, if supplied or defaulted
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Whether the argument is present
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Required string
    ///
    /// # Errors
    ///
    /// Returns a validation error if absent or not a string.
    pub fn str(&self, name: &str) -> ToolResult<&str> {
        self.opt_str(name).ok_or_else(|| Self::missing(name))
    }

    /// Optional string
    #[must_use]
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Required integer
    ///
    /// # Errors
    ///
    /// Returns a validation error if absent or not an integer.
    pub fn int(&self, name: &str) -> ToolResult<i64> {
        self.opt_int(name).ok_or_else(|| Self::missing(name))
    }

    /// Optional integer
    #[must_use]
    pub fn opt_int(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    /// Non-negative integer as a count or size
    ///
    /// # Errors
    ///
    /// Returns a validation error if absent or negative.
    pub fn count(&self, name: &str) -> ToolResult<usize> {
        let n = self.int(name)?;
        usize::try_from(n).map_err(|_| ToolError::validation(name, "must not be negative"))
    }

    /// Boolean flag; absent means `false`
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.opt_bool(name).unwrap_or(false)
    }

    /// Optional boolean, distinguishing absent from `false`
    #[must_use]
    pub fn opt_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    /// Identifier list or array of strings
    ///
    /// # Errors
    ///
    /// Returns a validation error if absent or not a list of strings.
    pub fn strings(&self, name: &str) -> ToolResult<Vec<String>> {
        let items = self
            .values
            .get(name)
            .and_then(Value::as_array)
            .ok_or_else(|| Self::missing(name))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ToolError::validation(name, "expected an array of strings"))
            })
            .collect()
    }

    /// Required array
    ///
    /// # Errors
    ///
    /// Returns a validation error if absent or not an array.
    pub fn array(&self, name: &str) -> ToolResult<&Vec<Value>> {
        self.values
            .get(name)
            .and_then(Value::as_array)
            .ok_or_else(|| Self::missing(name))
    }

    /// Required object
    ///
    /// # Errors
    ///
    /// Returns a validation error if absent or not an object.
    pub fn object(&self, name: &str) -> ToolResult<&Map<String, Value>> {
        self.values
            .get(name)
            .and_then(Value::as_object)
            .ok_or_else(|| Self::missing(name))
    }

    /// Underlying map
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

impl From<Map<String, Value>> for Args {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}
