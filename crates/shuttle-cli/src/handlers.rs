//! Built-in instructions for the runner.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shuttle_core::typed::{HandlerResult, Instruction, InstructionHandler, InstructionRouter};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct Say {
    pub text: String,
}

impl Instruction for Say {
    const TYPE: &'static str = "say";
}

/// Fails `failures` times per `text`, then succeeds.
#[derive(Debug, Serialize, Deserialize)]
pub struct Flaky {
    pub text: String,
    #[serde(default)]
    pub failures: u32,
}

impl Instruction for Flaky {
    const TYPE: &'static str = "flaky";
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Sleep {
    pub ms: u64,
}

impl Instruction for Sleep {
    const TYPE: &'static str = "sleep";
}

struct SayHandler;

#[async_trait]
impl InstructionHandler<Say> for SayHandler {
    async fn handle(&self, say: Say) -> HandlerResult {
        info!(text = %say.text, "say");
        Ok(Some(json!({ "said": say.text })))
    }
}

#[derive(Default)]
struct FlakyHandler {
    attempts: Mutex<HashMap<String, u32>>,
}

#[async_trait]
impl InstructionHandler<Flaky> for FlakyHandler {
    async fn handle(&self, flaky: Flaky) -> HandlerResult {
        let attempt = {
            let mut attempts = self
                .attempts
                .lock()
                .map_err(|_| "flaky state poisoned".to_string())?;
            let seen = attempts.entry(flaky.text.clone()).or_insert(0);
            *seen += 1;
            *seen
        };
        if attempt <= flaky.failures {
            return Err(format!(
                "intentional failure {attempt}/{} for '{}'",
                flaky.failures, flaky.text
            ));
        }
        info!(text = %flaky.text, attempt, "flaky succeeded");
        Ok(Some(json!({ "text": flaky.text, "attempts": attempt })))
    }
}

struct SleepHandler;

#[async_trait]
impl InstructionHandler<Sleep> for SleepHandler {
    async fn handle(&self, sleep: Sleep) -> HandlerResult {
        tokio::time::sleep(Duration::from_millis(sleep.ms)).await;
        Ok(Some(json!({ "slept_ms": sleep.ms })))
    }
}

pub fn router() -> anyhow::Result<InstructionRouter> {
    let mut router = InstructionRouter::new();
    router.register::<Say, _>(SayHandler)?;
    router.register::<Flaky, _>(FlakyHandler::default())?;
    router.register::<Sleep, _>(SleepHandler)?;
    Ok(router)
}
