//! Seam between the statement pipeline and whichever hosted model generates text.

use anyhow::Result;
use async_trait::async_trait;

/// A text-in, text-out generative model
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send a single prompt and return the model's full text reply
    async fn generate(&self, prompt: &str) -> Result<String>;
}
