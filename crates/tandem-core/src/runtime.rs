use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;

/// A handler for a named task type.
///
/// Receives the arguments bound at `enqueue_named` time.
#[async_trait]
pub trait TaskHandler<T>: Send + Sync {
    async fn call(&self, args: Vec<serde_json::Value>) -> Result<T, TaskError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("handler for task type '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// Registry of handlers (task_type -> handler).
///
/// Design:
/// - Built while the queue is being constructed (mutable).
/// - Read-only once the queue exists, so lookups need no lock.
pub struct HandlerRegistry<T> {
    handlers: HashMap<String, Arc<dyn TaskHandler<T>>>,
}

impl<T> HandlerRegistry<T> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a task type. Duplicates are rejected.
    pub fn register(
        &mut self,
        task_type: impl Into<String>,
        handler: Arc<dyn TaskHandler<T>>,
    ) -> Result<(), RegistryError> {
        let task_type = task_type.into();
        if self.handlers.contains_key(&task_type) {
            return Err(RegistryError::AlreadyRegistered(task_type));
        }
        self.handlers.insert(task_type, handler);
        Ok(())
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskHandler<T>>> {
        self.handlers.get(task_type).cloned()
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T> Default for HandlerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl TaskHandler<serde_json::Value> for EchoHandler {
        async fn call(&self, args: Vec<serde_json::Value>) -> Result<serde_json::Value, TaskError> {
            Ok(serde_json::Value::Array(args))
        }
    }

    #[tokio::test]
    async fn registered_handler_is_callable() {
        let mut reg = HandlerRegistry::new();
        reg.register("echo", Arc::new(EchoHandler)).unwrap();

        let handler = reg.get("echo").unwrap();
        let out = handler.call(vec![json!(1), json!("two")]).await.unwrap();
        assert_eq!(out, json!([1, "two"]));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut reg = HandlerRegistry::new();
        reg.register("echo", Arc::new(EchoHandler)).unwrap();
        let err = reg.register("echo", Arc::new(EchoHandler)).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(ref name) if name == "echo"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn missing_handler_is_none() {
        let reg: HandlerRegistry<serde_json::Value> = HandlerRegistry::new();
        assert!(reg.get("missing").is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn registered_types_are_sorted() {
        let mut reg = HandlerRegistry::new();
        reg.register("zeta", Arc::new(EchoHandler)).unwrap();
        reg.register("alpha", Arc::new(EchoHandler)).unwrap();
        assert_eq!(reg.registered_types(), vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
