//! Scripted language model for unit tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::credential::ApiKey;
use crate::llm_client::{CompletionRequest, LanguageModel, ModelError};

type Script = dyn Fn(&CompletionRequest) -> Result<String, ModelError> + Send + Sync;

/// Answers every call through a closure and records the requests it saw.
pub struct ScriptedModel {
    script: Box<Script>,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(&CompletionRequest) -> Result<String, ModelError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            script: Box::new(script),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        _credential: &ApiKey,
        request: CompletionRequest,
    ) -> Result<String, ModelError> {
        self.seen.lock().unwrap().push(request.clone());
        (self.script)(&request)
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// True when the request is a scoring call.
pub fn is_scoring(request: &CompletionRequest) -> bool {
    request.user.contains("SHOULD_CONTACT")
}

pub fn score_reply(score: i64, should_contact: u8) -> String {
    format!(
        r#"{{"SCORE": {}, "RESPONSE": "Scored by script.", "SHOULD_CONTACT": {}}}"#,
        score, should_contact
    )
}

pub fn message_reply(subject: &str, message: &str) -> String {
    serde_json::json!({ "SUBJECT": subject, "MESSAGE": message }).to_string()
}
