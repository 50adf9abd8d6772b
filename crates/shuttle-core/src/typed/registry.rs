//! InstructionRouter - `type` タグで payload をハンドラに振り分ける

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::handler::{Handler, HandlerResult, InstructionHandler, TypedHandler};
use super::instruction::{Instruction, instruction_type};

/// 命令タイプをキーにした登録済みハンドラ
///
/// # Example
/// ```ignore
/// let mut router = InstructionRouter::new();
/// router.register::<Move, _>(MoveHandler)?;
/// let queue = InstructionQueue::new(config, HandlerProcessor::new(router))?;
/// ```
#[derive(Default)]
pub struct InstructionRouter {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for instruction type '{0}' is already registered")]
    AlreadyRegistered(String),
}

impl InstructionRouter {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<T: Instruction, H: InstructionHandler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        self.register_raw(T::TYPE, TypedHandler::<T, H>::new(handler))
    }

    /// 型なしハンドラを `instruction_type` で登録
    pub fn register_raw(
        &mut self,
        instruction_type: &str,
        handler: impl Handler,
    ) -> Result<(), RegistryError> {
        if self.handlers.contains_key(instruction_type) {
            return Err(RegistryError::AlreadyRegistered(
                instruction_type.to_string(),
            ));
        }
        self.handlers
            .insert(instruction_type.to_string(), Arc::new(handler));
        Ok(())
    }

    pub fn get(&self, instruction_type: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(instruction_type).cloned()
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}

#[async_trait]
impl Handler for InstructionRouter {
    async fn handle(&self, payload: serde_json::Value) -> HandlerResult {
        let Some(kind) = instruction_type(&payload) else {
            return Err("payload has no instruction type".to_string());
        };
        let Some(handler) = self.get(kind) else {
            return Err(format!("no handler registered for instruction type '{kind}'"));
        };
        handler.handle(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::instruction::fixtures::{Add, Echo};

    struct EchoHandler;

    #[async_trait]
    impl InstructionHandler<Echo> for EchoHandler {
        async fn handle(&self, echo: Echo) -> HandlerResult {
            Ok(Some(serde_json::json!(echo.text)))
        }
    }

    struct AddHandler;

    #[async_trait]
    impl InstructionHandler<Add> for AddHandler {
        async fn handle(&self, add: Add) -> HandlerResult {
            Ok(Some(serde_json::json!(add.a + add.b)))
        }
    }

    fn router() -> InstructionRouter {
        let mut router = InstructionRouter::new();
        router.register::<Echo, _>(EchoHandler).unwrap();
        router.register::<Add, _>(AddHandler).unwrap();
        router
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut router = router();
        let result = router.register::<Echo, _>(EchoHandler);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(t)) if t == Echo::TYPE));
        assert_eq!(
            router.registered_types(),
            vec![Add::TYPE.to_string(), Echo::TYPE.to_string()]
        );
    }

    #[tokio::test]
    async fn routes_on_type_tag() {
        let router = router();
        let echoed = router
            .handle(Echo { text: "hi".into() }.to_payload().unwrap())
            .await;
        assert_eq!(echoed, Ok(Some(serde_json::json!("hi"))));

        let sum = router.handle(Add { a: 1, b: 2 }.to_payload().unwrap()).await;
        assert_eq!(sum, Ok(Some(serde_json::json!(3))));
    }

    #[tokio::test]
    async fn unroutable_payloads_fail() {
        let router = router();
        let err = router
            .handle(serde_json::json!({"type": "nope"}))
            .await
            .unwrap_err();
        assert_eq!(err, "no handler registered for instruction type 'nope'");

        let err = router.handle(serde_json::json!({})).await.unwrap_err();
        assert_eq!(err, "payload has no instruction type");
    }
}
