//! Test doubles for the pipeline: a scripted model and the bundled template.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::latex::TemplateLoader;
use crate::llm_client::{LlmError, ModelTier, TextModel};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::pipeline::prompts::{
    CRITIQUE_SYSTEM, LATEX_SYSTEM, OPTIMIZER_SYSTEM, PARSER_SYSTEM,
};
use crate::session::models::{Session, SessionPhase};
use crate::session::store::{SessionStore, SessionStoreError};

/// Answers each stage with canned output chosen by system prompt.
pub struct ScriptedModel {
    critique: Option<String>,
    delay: Duration,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub fn new(critique: &str) -> Self {
        Self {
            critique: Some(critique.to_string()),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every call fails with a non-retryable API error.
    pub fn failing() -> Self {
        Self {
            critique: None,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn was_called_with(&self, system: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|(s, _)| s == system)
    }

    pub fn last_prompt_containing(&self, marker: &str) -> String {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, p)| p.contains(marker))
            .map(|(_, p)| p.clone())
            .unwrap_or_else(|| panic!("no prompt containing {marker:?}"))
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    async fn complete(
        &self,
        _tier: ModelTier,
        prompt: &str,
        system: &str,
    ) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let Some(critique) = &self.critique else {
            return Err(LlmError::Api {
                status: 400,
                message: "scripted failure".to_string(),
            });
        };

        let answer = if system == PARSER_SYSTEM && prompt.contains("resume parsing specialist") {
            r#"{"full_name": "Ada Lovelace", "experience": [{"company": "Analytical Engines", "title": "Analyst"}]}"#
                .to_string()
        } else if system == PARSER_SYSTEM {
            r#"{"role_title": "Senior Rust Engineer", "must_have_skills": ["Rust"]}"#.to_string()
        } else if system == JSON_ONLY_SYSTEM {
            r#"{"company_overview": {"mission": "Build things"}, "role_alignment": {"critical_skills": ["Rust"]}}"#
                .to_string()
        } else if system == OPTIMIZER_SYSTEM {
            "```json\n{\"full_name\": \"Ada Lovelace\", \"projects\": [{\"name\": \"Project X\"}]}\n```"
                .to_string()
        } else if system == CRITIQUE_SYSTEM {
            critique.clone()
        } else if system == LATEX_SYSTEM {
            "```latex\n\\documentclass[letterpaper,11pt]{article}\n\\begin{document}\nAda Lovelace\n```"
                .to_string()
        } else {
            return Err(LlmError::EmptyContent);
        };
        Ok(answer)
    }
}

pub fn bundled_templates() -> TemplateLoader {
    TemplateLoader::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/resume.tex"))
}

/// Wraps a store and records the phase of every saved session.
pub struct RecordingStore<S> {
    inner: S,
    saves: Mutex<Vec<(Uuid, SessionPhase)>>,
}

impl<S> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn phases_saved(&self, id: Uuid) -> Vec<SessionPhase> {
        self.saves
            .lock()
            .unwrap()
            .iter()
            .filter(|(saved, _)| *saved == id)
            .map(|(_, phase)| *phase)
            .collect()
    }
}

#[async_trait]
impl<S: SessionStore> SessionStore for RecordingStore<S> {
    async fn get(&self, id: Uuid) -> Result<Option<Session>, SessionStoreError> {
        self.inner.get(id).await
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        self.saves.lock().unwrap().push((session.id, session.phase));
        self.inner.save(session).await
    }

    async fn try_claim(&self, id: Uuid) -> Result<bool, SessionStoreError> {
        self.inner.try_claim(id).await
    }

    async fn release(&self, id: Uuid) -> Result<(), SessionStoreError> {
        self.inner.release(id).await
    }
}
