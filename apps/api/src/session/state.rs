//! Session state: the key/value context shared by every stage of one run.
//!
//! Append/overwrite only; there is no `remove`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known state keys. Each stage documents which of these it reads and writes.
pub mod keys {
    pub const RESUME: &str = "resume";
    pub const JOB_DESCRIPTION: &str = "job_description";
    pub const COMPANY_NAME: &str = "company_name";
    pub const RESUME_STRUCTURED: &str = "resume_structured";
    pub const JD_STRUCTURED: &str = "jd_structured";
    pub const JOB_PROFILE: &str = "job_profile";
    pub const OPTIMIZED_RESUME: &str = "optimized_resume";
    pub const CRITIQUE: &str = "critique";
    pub const USER_INPUT: &str = "user_input";
    pub const LATEX_TEMPLATE: &str = "latex_template";
    pub const FILLED_LATEX: &str = "filled_latex";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionState {
    values: BTreeMap<String, Value>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns the value as text. Strings come back verbatim, anything else as compact JSON.
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Writes `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }
}
