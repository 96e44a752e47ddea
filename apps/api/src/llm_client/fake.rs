//! In-process `CompletionClient` for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionClient, CompletionError};

/// Returns a canned reply (or error) and records every prompt it receives.
pub struct FakeCompletionClient {
    reply: Result<String, (u16, String)>,
    prompts: Mutex<Vec<String>>,
}

impl FakeCompletionClient {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, message: impl Into<String>) -> Self {
        Self {
            reply: Err((status, message.into())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionClient for FakeCompletionClient {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err((status, message)) => Err(CompletionError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}
