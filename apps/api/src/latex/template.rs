use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("LaTeX template not found at: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Error reading LaTeX template at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads the LaTeX résumé template from disk on every call, so edits apply without a restart.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    path: PathBuf,
}

impl TemplateLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<String, TemplateError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                debug!(path = %self.path.display(), bytes = content.len(), "template loaded");
                Ok(content)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TemplateError::NotFound {
                path: self.path.clone(),
            }),
            Err(source) => Err(TemplateError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
