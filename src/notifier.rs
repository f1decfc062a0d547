use anyhow::Result;
use async_trait::async_trait;

use crate::domain::ChatId;

/// Delivers progress text to whoever requested a run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, destination: ChatId, text: &str) -> Result<()>;
}
