//! Procedure trait, parameter accessors, and the procedure table.
//!
//! A procedure is a named group of related JSON-RPC methods; the router
//! resolves `"procedure.method"` strings against the table built here.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};

/// Parameters passed to a procedure method.
///
/// JSON-RPC allows `params` to be an object or an array, so arguments are
/// resolvable by key with a positional fallback.
#[derive(Debug, Clone, Default)]
pub struct Params(Option<Value>);

impl Params {
    pub fn new(value: Option<Value>) -> Self {
        Self(value)
    }

    /// Raw params value, if any.
    pub fn raw(&self) -> Option<&Value> {
        self.0.as_ref()
    }

    /// Look up an argument by key, falling back to array position.
    pub fn get(&self, key: &str, position: usize) -> Option<&Value> {
        match self.0.as_ref() {
            Some(Value::Object(map)) => map.get(key),
            Some(Value::Array(items)) => items.get(position),
            _ => None,
        }
    }

    /// Required string argument.
    pub fn str_arg(&self, key: &str, position: usize) -> Result<String> {
        self.get(key, position)
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| Error::InvalidParams(format!("Missing required argument: {}", key)))
    }

    /// Optional string argument.
    pub fn opt_str_arg(&self, key: &str, position: usize) -> Option<String> {
        self.get(key, position)
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    /// Optional object argument, defaulting to an empty map.
    pub fn map_arg(&self, key: &str, position: usize) -> serde_json::Map<String, Value> {
        self.get(key, position)
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default()
    }

    /// The whole params payload as an object, defaulting to empty.
    pub fn as_map(&self) -> serde_json::Map<String, Value> {
        self.0
            .as_ref()
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default()
    }
}

/// A registered capability handler exposing named methods.
#[async_trait]
pub trait Procedure: Send + Sync {
    /// The procedure name used for RPC resolution.
    fn name(&self) -> &str;

    /// Invoke a named method on this procedure.
    ///
    /// Implementations return [`Error::MethodNotFound`] for methods they
    /// do not expose; every other failure is a handler error.
    async fn call(&self, method: &str, params: Params) -> Result<Value>;
}

/// The set of registered procedures, built once at startup.
#[derive(Default)]
pub struct ProcedureTable {
    procedures: HashMap<String, Arc<dyn Procedure>>,
}

impl ProcedureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a procedure under its declared name.
    ///
    /// Last registration wins: a later entry under the same name replaces
    /// the earlier one. This is deliberate policy, letting applications
    /// override a built-in procedure wholesale.
    pub fn register(&mut self, procedure: Arc<dyn Procedure>) {
        let name = procedure.name().to_string();
        if self.procedures.insert(name.clone(), procedure).is_some() {
            debug!(procedure = %name, "procedure registration replaced an earlier entry");
        }
    }

    /// Resolve a procedure by name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Procedure>> {
        self.procedures.get(name).cloned()
    }

    /// Names of all registered procedures.
    pub fn names(&self) -> Vec<String> {
        self.procedures.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}
