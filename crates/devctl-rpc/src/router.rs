//! Method table for bus objects.
//!
//! A [`Router`] maps `"<object>.<method>"` names onto plain function
//! pointers taking a shared context. It is built once at startup and is
//! immutable afterwards.
//!
//! # Examples
//!
//! ```
//! use devctl_rpc::{Router, RpcError};
//! use serde_json::{Value, json};
//!
//! struct Counter(u32);
//!
//! let router = Router::new("demo")
//!     .method("get", |counter: &Counter, _params: &Value| Ok(json!(counter.0)));
//!
//! assert_eq!(router.call(&Counter(3), "demo.get", &json!({})), Ok(json!(3)));
//! assert!(matches!(
//!     router.call(&Counter(3), "demo.set", &json!({})),
//!     Err(RpcError::MethodNotFound(_))
//! ));
//! ```

use crate::error::RpcError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Method implementation: context and params object in, result value out.
pub type Handler<C> = fn(&C, &Value) -> Result<Value, RpcError>;

/// Method table of one bus object.
pub struct Router<C> {
    object: String,
    methods: BTreeMap<String, Handler<C>>,
}

impl<C> Router<C> {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            methods: BTreeMap::new(),
        }
    }

    /// Register `handler` under `name`, replacing any previous entry.
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, handler: Handler<C>) -> Self {
        self.methods.insert(name.into(), handler);
        self
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    /// Fully qualified method names, sorted.
    pub fn methods(&self) -> impl Iterator<Item = String> + '_ {
        self.methods
            .keys()
            .map(move |name| format!("{}.{name}", self.object))
    }

    /// Invoke the method addressed by `qualified` (`"<object>.<method>"`).
    ///
    /// # Errors
    /// `RpcError::MethodNotFound` for an unknown object or method; otherwise
    /// whatever the handler returns.
    pub fn call(&self, context: &C, qualified: &str, params: &Value) -> Result<Value, RpcError> {
        let handler = qualified
            .split_once('.')
            .filter(|(object, _)| *object == self.object)
            .and_then(|(_, method)| self.methods.get(method))
            .ok_or_else(|| RpcError::MethodNotFound(qualified.to_string()))?;

        handler(context, params)
    }
}

impl<C> fmt::Debug for Router<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("object", &self.object)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo(_: &(), params: &Value) -> Result<Value, RpcError> {
        Ok(params.clone())
    }

    fn reject(_: &(), _: &Value) -> Result<Value, RpcError> {
        Err(RpcError::InvalidParams("always".into()))
    }

    fn router() -> Router<()> {
        Router::new("devctl").method("echo", echo).method("reject", reject)
    }

    #[test]
    fn test_dispatches_by_method() {
        let params = json!({"pin": 5});
        assert_eq!(router().call(&(), "devctl.echo", &params), Ok(params));
        assert_eq!(
            router().call(&(), "devctl.reject", &json!({})),
            Err(RpcError::InvalidParams("always".into()))
        );
    }

    #[test]
    fn test_unknown_object_or_method() {
        for name in ["other.echo", "devctl.missing", "echo", "devctl.", ".echo", ""] {
            assert_eq!(
                router().call(&(), name, &json!({})),
                Err(RpcError::MethodNotFound(name.to_string())),
                "{name}"
            );
        }
    }

    #[test]
    fn test_method_listing() {
        let names: Vec<String> = router().methods().collect();
        assert_eq!(names, vec!["devctl.echo", "devctl.reject"]);
    }
}
