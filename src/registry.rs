//! Method table consulted by the dispatcher
//!
//! Built once before the server starts accepting and shared read-only afterwards.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

use crate::{errors::RpcError, rpc::request::Params};

#[async_trait]
pub trait RpcMethod: Send + Sync {
    async fn call(&self, params: Params) -> Result<Value, RpcError>;
}

/// Adapter so plain closures can be registered as methods.
struct FnMethod<F>(F);

#[async_trait]
impl<F> RpcMethod for FnMethod<F>
where
    F: Fn(Params) -> Result<Value, RpcError> + Send + Sync,
{
    async fn call(&self, params: Params) -> Result<Value, RpcError> {
        (self.0)(params)
    }
}

#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Arc<dyn RpcMethod>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `method` to `name`, replacing any previous binding.
    pub fn register(mut self, name: impl Into<String>, method: impl RpcMethod + 'static) -> Self {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    pub fn register_fn<F>(self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Params) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        self.register(name, FnMethod(method))
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn RpcMethod>> {
        self.methods.get(name).cloned()
    }

    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl std::fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.method_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn resolves_registered_closure() {
        let registry = MethodRegistry::new().register_fn("ping", |_| Ok(json!("pong")));

        let method = registry.resolve("ping").expect("ping should be registered");
        let result = method.call(Params::default()).await.expect("ping succeeds");
        assert_eq!(result, json!("pong"));
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let registry = MethodRegistry::new().register_fn("suma", |_| Ok(Value::Null));

        assert!(registry.resolve("suma").is_some());
        assert!(registry.resolve("Suma").is_none());
        assert!(registry.resolve("suma ").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[tokio::test]
    async fn register_replaces_existing_binding() {
        let registry = MethodRegistry::new()
            .register_fn("version", |_| Ok(json!(1)))
            .register_fn("version", |_| Ok(json!(2)));

        assert_eq!(registry.len(), 1);
        let method = registry.resolve("version").expect("version registered");
        assert_eq!(
            method.call(Params::default()).await.expect("call succeeds"),
            json!(2)
        );
    }

    #[test]
    fn method_names_are_sorted() {
        let registry = MethodRegistry::new()
            .register_fn("b", |_| Ok(Value::Null))
            .register_fn("a", |_| Ok(Value::Null));

        assert_eq!(registry.method_names(), vec!["a", "b"]);
        assert!(!registry.is_empty());
        assert!(MethodRegistry::new().is_empty());
    }
}
