//! File-backed knowledge base
//!
//! The whole file is inlined into the system prompt on every generation, so
//! edits made through the admin endpoint apply to the next turn.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    path: PathBuf,
}

impl KnowledgeBase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file, surfacing I/O errors
    pub async fn read(&self) -> io::Result<String> {
        tokio::fs::read_to_string(&self.path).await
    }

    /// Read the file for prompting. A missing or unreadable file yields an
    /// empty knowledge base.
    pub async fn load(&self) -> String {
        match self.read().await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Error loading knowledge base");
                String::new()
            }
        }
    }

    /// Replace the file contents
    pub async fn save(&self, content: &str) -> io::Result<()> {
        tokio::fs::write(&self.path, content).await?;
        tracing::info!(
            path = %self.path.display(),
            content_length = content.chars().count(),
            "Knowledge base updated"
        );
        Ok(())
    }
}
