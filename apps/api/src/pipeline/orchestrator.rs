//! Orchestrator: runs a session through the stages and pauses for the user.
//!
//! Flow:
//!   start:  [ResumeParser ‖ JobDescriptionParser ‖ CompanyResearcher]
//!           → InitialOptimizer → Critique → gap asker (call 1) → suspend
//!   resume: gap asker (call 2) → GapFiller → template → LatexFiller → save artifact
//!
//! Suspension is just persistence: `start` returns with the session in
//! `AwaitingUserInput` and the pending request stored on it. The caller saves
//! the session and hands the hint to the user.

use bytes::Bytes;
use tracing::{error, info, warn};

use crate::artifacts::{ArtifactError, ArtifactWriter, LATEX_CONTENT_TYPE};
use crate::errors::AppError;
use crate::latex::{finalize_latex, TemplateError, TemplateLoader};
use crate::llm_client::TextModel;
use crate::pipeline::stages::{
    COMPANY_RESEARCHER, CRITIC, GAP_FILLER, INITIAL_OPTIMIZER, JOB_DESCRIPTION_PARSER,
    LATEX_FILLER, RESUME_PARSER,
};
use crate::session::confirmation::{ConfirmationReply, ToolContext};
use crate::session::gap_asker::{ask_for_gaps, GapAskResult, SKIP_EXPLANATION};
use crate::session::models::{ArtifactRef, Session, SessionPhase};
use crate::session::state::keys;

pub const RESUME_ARTIFACT_NAME: &str = "generated_resume_latex.tex";
/// Critique text meaning "nothing to add".
const APPROVED: &str = "APPROVED";

pub struct Pipeline<'a> {
    model: &'a dyn TextModel,
    templates: &'a TemplateLoader,
    artifacts: &'a ArtifactWriter,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        model: &'a dyn TextModel,
        templates: &'a TemplateLoader,
        artifacts: &'a ArtifactWriter,
    ) -> Self {
        Self {
            model,
            templates,
            artifacts,
        }
    }

    /// Runs a fresh session up to the first question (or to the end when the
    /// critique approves the draft).
    pub async fn start(&self, session: &mut Session) -> Result<(), AppError> {
        info!(session_id = %session.id, "pipeline started");
        let outcome = self.run_until_ask(session).await;
        settle(session, outcome)
    }

    /// Delivers the user's reply and, unless it was malformed, finishes the run.
    pub async fn resume(
        &self,
        session: &mut Session,
        reply: ConfirmationReply,
    ) -> Result<(), AppError> {
        if session.phase != SessionPhase::AwaitingUserInput {
            return Err(AppError::Conflict(format!(
                "Session {} is not waiting for input",
                session.id
            )));
        }

        let result = {
            let mut ctx = ToolContext::new(&mut session.state, &mut session.pending, Some(reply));
            ask_for_gaps(&mut ctx)
        };

        if let GapAskResult::Error { message } = result.clone() {
            warn!(session_id = %session.id, "gap asker reply rejected: {message}; asking again");
            session.notice = Some(message);
            self.ask(session);
            session.last_gap_result = Some(result);
            session.touch();
            return Ok(());
        }

        info!(session_id = %session.id, status = result.status(), "gap asker resolved");
        session.last_gap_result = Some(result);
        session.notice = None;
        session.phase = SessionPhase::Running;
        let outcome = self.finish(session).await;
        settle(session, outcome)
    }

    async fn run_until_ask(&self, session: &mut Session) -> Result<(), AppError> {
        let state = &mut session.state;

        let resume_prompt = RESUME_PARSER.render(state)?;
        let jd_prompt = JOB_DESCRIPTION_PARSER.render(state)?;
        let company_prompt = COMPANY_RESEARCHER.render(state)?;
        let (resume, jd, profile) = tokio::try_join!(
            RESUME_PARSER.execute(self.model, &resume_prompt),
            JOB_DESCRIPTION_PARSER.execute(self.model, &jd_prompt),
            COMPANY_RESEARCHER.execute(self.model, &company_prompt),
        )?;
        state.set(RESUME_PARSER.output_key, resume);
        state.set(JOB_DESCRIPTION_PARSER.output_key, jd);
        state.set(COMPANY_RESEARCHER.output_key, profile);

        INITIAL_OPTIMIZER.run(self.model, state).await?;
        CRITIC.run(self.model, state).await?;

        if is_approved(&state.get_text(keys::CRITIQUE).unwrap_or_default()) {
            info!(session_id = %session.id, "critique approved the draft; no questions");
            state.set(keys::USER_INPUT, SKIP_EXPLANATION);
            return self.finish(session).await;
        }

        self.ask(session);
        Ok(())
    }

    /// Opens a new question from the current critique.
    fn ask(&self, session: &mut Session) {
        let result = {
            let mut ctx = ToolContext::new(&mut session.state, &mut session.pending, None);
            ask_for_gaps(&mut ctx)
        };
        session.last_gap_result = Some(result);
        session.phase = SessionPhase::AwaitingUserInput;
    }

    async fn finish(&self, session: &mut Session) -> Result<(), AppError> {
        let state = &mut session.state;

        GAP_FILLER.run(self.model, state).await?;

        let template = self.templates.load().await?;
        state.set(keys::LATEX_TEMPLATE, template.clone());
        LATEX_FILLER.run(self.model, state).await?;

        let latex = finalize_latex(
            &state.get_text(keys::FILLED_LATEX).unwrap_or_default(),
            &template,
        );
        state.set(keys::FILLED_LATEX, latex.clone());

        match self
            .artifacts
            .save(
                session.id,
                RESUME_ARTIFACT_NAME,
                LATEX_CONTENT_TYPE,
                Bytes::from(latex.into_bytes()),
            )
            .await
        {
            Ok(version) => {
                session.artifact = Some(ArtifactRef {
                    filename: RESUME_ARTIFACT_NAME.to_string(),
                    version,
                });
                session.notice = Some(format!(
                    "File '{RESUME_ARTIFACT_NAME}' (version {version}) has been created and is now available for download."
                ));
            }
            Err(ArtifactError::NotConfigured) => {
                warn!(session_id = %session.id, "artifact storage not configured; LaTeX kept in session only");
                session.notice = Some(
                    "The resume was generated but artifact storage is not configured on this server. \
                     The LaTeX source is included in this response instead."
                        .to_string(),
                );
            }
            Err(e) => return Err(e.into()),
        }

        session.phase = SessionPhase::Completed;
        info!(session_id = %session.id, "pipeline completed");
        Ok(())
    }
}

fn is_approved(critique: &str) -> bool {
    critique
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.')
        == APPROVED
}

/// Marks the session failed on error and stamps it either way.
fn settle(session: &mut Session, outcome: Result<(), AppError>) -> Result<(), AppError> {
    if let Err(e) = &outcome {
        error!(session_id = %session.id, "pipeline failed: {e}");
        session.phase = SessionPhase::Failed;
        session.pending = None;
        session.notice = Some(failure_notice(e));
    }
    session.touch();
    outcome
}

/// What the user is told when a run fails. Internal details stay in the logs.
fn failure_notice(e: &AppError) -> String {
    match e {
        AppError::Validation(msg) | AppError::Conflict(msg) => msg.clone(),
        AppError::Llm(_) => "An AI processing step failed. Please start a new session.".to_string(),
        AppError::Template(TemplateError::NotFound { .. }) => {
            "The LaTeX template is missing on the server.".to_string()
        }
        _ => "An internal error interrupted the run.".to_string(),
    }
}
