use std::sync::Arc;

use crate::artifacts::ArtifactWriter;
use crate::latex::TemplateLoader;
use crate::llm_client::TextModel;
use crate::pipeline::Pipeline;
use crate::session::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable model backend. Production: `LlmClient`.
    pub llm: Arc<dyn TextModel>,
    /// Pluggable session store. Memory or Redis via SESSION_BACKEND.
    pub sessions: Arc<dyn SessionStore>,
    pub templates: TemplateLoader,
    /// Unconfigured when ARTIFACT_BACKEND=none.
    pub artifacts: ArtifactWriter,
}

impl AppState {
    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(self.llm.as_ref(), &self.templates, &self.artifacts)
    }
}
