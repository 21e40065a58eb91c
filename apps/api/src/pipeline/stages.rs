//! Pipeline stages: opaque text-in/text-out model calls.
//!
//! A stage renders its prompt from session state, calls the model and writes
//! the answer back under its output key. Which keys a stage reads is exactly
//! the set of `{placeholders}` in its template.

use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::prompts::{CONTENT_RULES, FACTUAL_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{call_json, LlmError, ModelTier, TextModel};
use crate::pipeline::prompts::*;
use crate::session::state::{keys, SessionState};

/// Extra attempts for JSON stages whose answer does not parse.
const MAX_PARSE_RETRIES: u32 = 1;

/// Prompt fragments shared across stages. Resolved before session state.
const FRAGMENTS: [(&str, &str); 2] = [
    ("factual_instruction", FACTUAL_INSTRUCTION),
    ("content_rules", CONTENT_RULES),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Parsed as JSON and stored as a structured value.
    Json,
    /// Stored as trimmed text.
    Text,
}

#[derive(Debug, Clone, Copy)]
pub struct LlmStage {
    pub name: &'static str,
    pub tier: ModelTier,
    pub system: &'static str,
    pub template: &'static str,
    pub output_key: &'static str,
    pub output: OutputKind,
}

pub const RESUME_PARSER: LlmStage = LlmStage {
    name: "ResumeParser",
    tier: ModelTier::Standard,
    system: PARSER_SYSTEM,
    template: RESUME_PARSE_PROMPT,
    output_key: keys::RESUME_STRUCTURED,
    output: OutputKind::Json,
};

pub const JOB_DESCRIPTION_PARSER: LlmStage = LlmStage {
    name: "JobDescriptionParser",
    tier: ModelTier::Standard,
    system: PARSER_SYSTEM,
    template: JD_PARSE_PROMPT,
    output_key: keys::JD_STRUCTURED,
    output: OutputKind::Json,
};

pub const COMPANY_RESEARCHER: LlmStage = LlmStage {
    name: "CompanyResearcher",
    tier: ModelTier::Standard,
    system: JSON_ONLY_SYSTEM,
    template: COMPANY_RESEARCH_PROMPT,
    output_key: keys::JOB_PROFILE,
    output: OutputKind::Json,
};

pub const INITIAL_OPTIMIZER: LlmStage = LlmStage {
    name: "InitialOptimizer",
    tier: ModelTier::Standard,
    system: OPTIMIZER_SYSTEM,
    template: OPTIMIZE_PROMPT,
    output_key: keys::OPTIMIZED_RESUME,
    output: OutputKind::Json,
};

pub const CRITIC: LlmStage = LlmStage {
    name: "Critique",
    tier: ModelTier::Lite,
    system: CRITIQUE_SYSTEM,
    template: CRITIQUE_PROMPT,
    output_key: keys::CRITIQUE,
    output: OutputKind::Text,
};

pub const GAP_FILLER: LlmStage = LlmStage {
    name: "GapFiller",
    tier: ModelTier::Standard,
    system: OPTIMIZER_SYSTEM,
    template: GAP_FILL_PROMPT,
    output_key: keys::OPTIMIZED_RESUME,
    output: OutputKind::Json,
};

pub const LATEX_FILLER: LlmStage = LlmStage {
    name: "LatexFiller",
    tier: ModelTier::Standard,
    system: LATEX_SYSTEM,
    template: LATEX_PROMPT,
    output_key: keys::FILLED_LATEX,
    output: OutputKind::Text,
};

impl LlmStage {
    /// Fills the template from fragments and session state.
    pub fn render(&self, state: &SessionState) -> Result<String, AppError> {
        render_prompt(self.template, state).map_err(|missing| {
            AppError::Validation(format!(
                "Stage {} needs '{missing}' in session state, but it is not set",
                self.name
            ))
        })
    }

    /// Calls the model with an already rendered prompt.
    pub async fn execute(&self, model: &dyn TextModel, prompt: &str) -> Result<Value, AppError> {
        info!(stage = self.name, "stage started");
        let value = match self.output {
            OutputKind::Text => {
                let text = model
                    .complete(self.tier, prompt, self.system)
                    .await
                    .map_err(|e| self.llm_error(e))?;
                Value::String(text.trim().to_string())
            }
            OutputKind::Json => self.execute_json(model, prompt).await?,
        };
        info!(stage = self.name, "stage finished");
        Ok(value)
    }

    async fn execute_json(&self, model: &dyn TextModel, prompt: &str) -> Result<Value, AppError> {
        let mut attempt = 0;
        loop {
            match call_json::<Value>(model, self.tier, prompt, self.system).await {
                Ok(value) => return Ok(value),
                Err(LlmError::Parse(e)) if attempt < MAX_PARSE_RETRIES => {
                    attempt += 1;
                    warn!(
                        stage = self.name,
                        "stage returned invalid JSON ({e}), retrying {attempt}/{MAX_PARSE_RETRIES}"
                    );
                }
                Err(e) => return Err(self.llm_error(e)),
            }
        }
    }

    /// Render, execute and store the result under `output_key`.
    pub async fn run(&self, model: &dyn TextModel, state: &mut SessionState) -> Result<(), AppError> {
        let prompt = self.render(state)?;
        let value = self.execute(model, &prompt).await?;
        state.set(self.output_key, value);
        Ok(())
    }

    fn llm_error(&self, e: LlmError) -> AppError {
        AppError::Llm(format!("{} stage failed: {e}", self.name))
    }
}

/// Replaces each `{key}` (lowercase letters and underscores) with a shared
/// fragment or the session value of that name. Substituted text is not
/// rescanned, so braces inside values are safe. Other braces pass through.
///
/// Returns the first key that has no value.
pub fn render_prompt(template: &str, state: &SessionState) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let name_len = after
            .find(|c: char| !(c.is_ascii_lowercase() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..name_len];

        if name.is_empty() || !after[name_len..].starts_with('}') {
            out.push('{');
            rest = after;
            continue;
        }

        if let Some((_, fragment)) = FRAGMENTS.iter().find(|(key, _)| *key == name) {
            out.push_str(fragment);
        } else {
            let value = state.get(name).ok_or_else(|| name.to_string())?;
            match value {
                Value::String(s) => out.push_str(s),
                other => out.push_str(
                    &serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
                ),
            }
        }
        rest = &after[name_len + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
