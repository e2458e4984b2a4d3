//! Scripted [`TextGenerator`] for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::generate::{GenerateError, TextGenerator};

pub(crate) enum Reply {
    Text(String),
    RateLimited,
    Fail,
    Hang,
}

impl Reply {
    pub(crate) fn text(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

#[derive(Default)]
pub(crate) struct ScriptedGenerator {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    always: Option<String>,
    calls: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer every call, on any model, with `text`.
    pub(crate) fn always(text: &str) -> Self {
        Self {
            always: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn script(self, model: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(model.to_string(), replies.into());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerateError> {
        self.calls.lock().unwrap().push(model.to_string());
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(text) = &self.always {
            return Ok(text.clone());
        }

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(model)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::RateLimited) => Err(GenerateError::RateLimited {
                retry_after: Some(Duration::from_secs(1)),
                message: "RESOURCE_EXHAUSTED".into(),
            }),
            Some(Reply::Fail) => Err(GenerateError::Status {
                status: 500,
                body: "internal".into(),
            }),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(GenerateError::Request(format!("no scripted reply for {model}"))),
        }
    }
}
