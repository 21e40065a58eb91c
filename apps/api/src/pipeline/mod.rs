// Tailoring pipeline: stage prompts, stage runner, orchestrator and HTTP handlers.
// All model calls go through llm_client::TextModel; no direct API calls here.

pub mod handlers;
pub mod intake;
pub mod orchestrator;
pub mod prompts;
pub mod stages;
#[cfg(test)]
pub mod testing;

use serde::Deserialize;

use crate::errors::AppError;
use crate::session::models::Session;
use crate::session::state::{keys, SessionState};

pub use orchestrator::Pipeline;

/// The three things a run needs before anything is sent to the model.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInput {
    pub resume: String,
    pub job_description: String,
    pub company_name: String,
}

impl SessionInput {
    /// Validates the inputs and seeds a new session's state with them.
    pub fn into_session(self) -> Result<Session, AppError> {
        let fields = [
            (keys::RESUME, self.resume),
            (keys::JOB_DESCRIPTION, self.job_description),
            (keys::COMPANY_NAME, self.company_name),
        ];

        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "A resume, a job description and a company name are all required; missing: {}",
                missing.join(", ")
            )));
        }

        let mut state = SessionState::new();
        for (key, value) in fields {
            state.set(key, value.trim().to_string());
        }
        Ok(Session::new(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_session_seeds_inputs() {
        let session = SessionInput {
            resume: " Ada ".into(),
            job_description: "Rust".into(),
            company_name: "Acme".into(),
        }
        .into_session()
        .unwrap();

        assert_eq!(session.state.get_text(keys::RESUME).as_deref(), Some("Ada"));
        assert_eq!(session.state.get_text(keys::COMPANY_NAME).as_deref(), Some("Acme"));
        assert!(session.state.get(keys::JOB_DESCRIPTION).is_some());
    }

    #[test]
    fn test_into_session_lists_every_missing_input() {
        let err = SessionInput {
            resume: "Ada".into(),
            job_description: "  ".into(),
            company_name: String::new(),
        }
        .into_session()
        .unwrap_err();

        let AppError::Validation(message) = err else {
            panic!("expected validation error");
        };
        assert!(message.contains("job_description"));
        assert!(message.contains("company_name"));
        assert!(!message.contains("missing: resume"));
    }
}
