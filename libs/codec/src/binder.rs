//! Invocation binding.
//!
//! The codec cannot know the parameter types of application hub methods,
//! so argument materialization is deferred to an `InvocationBinder`: a pure
//! lookup from method name to an ordered parameter-type list. A lookup miss
//! is not an error — the codec falls back to raw, untyped argument
//! passthrough and lets the caller decide whether to drop or reject.

use serde_json::Value;
use std::collections::HashMap;

/// Coarse type descriptor for one invocation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    Bool,
    Int,
    Float,
    String,
    /// Any JSON object or array.
    Object,
    /// Accepts any value, including null.
    Raw,
}

impl ParameterType {
    /// Whether a decoded wire value is acceptable for this parameter.
    pub fn matches_value(&self, value: &Value) -> bool {
        match self {
            ParameterType::Bool => value.is_boolean(),
            ParameterType::Int => value.is_i64() || value.is_u64(),
            ParameterType::Float => value.is_number(),
            ParameterType::String => value.is_string(),
            ParameterType::Object => value.is_object() || value.is_array(),
            ParameterType::Raw => true,
        }
    }
}

/// Pure lookup from method names to expected parameter types.
///
/// Implementations must tolerate unknown or overloaded names by returning
/// `None` rather than failing; no I/O, no mutation.
pub trait InvocationBinder: Send + Sync {
    /// Expected parameter types of `target`, or `None` if unknown.
    fn parameter_types(&self, target: &str) -> Option<&[ParameterType]>;

    /// Expected result type of the invocation with `invocation_id`, or
    /// `None` if no such call is outstanding.
    fn return_type(&self, invocation_id: &str) -> Option<ParameterType>;
}

/// Binder over a fixed method table, for servers whose hub methods are
/// known up front.
#[derive(Debug, Default)]
pub struct StaticBinder {
    methods: HashMap<String, Vec<ParameterType>>,
    returns: HashMap<String, ParameterType>,
}

impl StaticBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, target: impl Into<String>, params: Vec<ParameterType>) -> Self {
        self.methods.insert(target.into(), params);
        self
    }

    /// Register the expected result type for an outstanding invocation.
    pub fn with_return(mut self, invocation_id: impl Into<String>, ty: ParameterType) -> Self {
        self.returns.insert(invocation_id.into(), ty);
        self
    }
}

impl InvocationBinder for StaticBinder {
    fn parameter_types(&self, target: &str) -> Option<&[ParameterType]> {
        self.methods.get(target).map(Vec::as_slice)
    }

    fn return_type(&self, invocation_id: &str) -> Option<ParameterType> {
        self.returns.get(invocation_id).copied()
    }
}

/// Binder that knows nothing: every lookup misses, so all arguments pass
/// through as raw values.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBinder;

impl InvocationBinder for NullBinder {
    fn parameter_types(&self, _target: &str) -> Option<&[ParameterType]> {
        None
    }

    fn return_type(&self, _invocation_id: &str) -> Option<ParameterType> {
        None
    }
}
