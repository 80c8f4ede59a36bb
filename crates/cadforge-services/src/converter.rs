//! Mock conversion service

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use cadforge_core::{
    ConversionService, ConvertedArtifact, EntryId, ForgeConfig, Result, TargetFormat,
};

/// Simulated converter: always succeeds after a fixed latency with a
/// synthetic artifact location. Format validation happens upstream against
/// the [`TargetFormat`] enumeration.
pub struct MockConverter {
    latency: Duration,
}

impl MockConverter {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn from_config(config: &ForgeConfig) -> Self {
        Self::new(config.convert_latency())
    }
}

#[async_trait]
impl ConversionService for MockConverter {
    async fn convert(&self, id: &EntryId, format: TargetFormat) -> Result<ConvertedArtifact> {
        tokio::time::sleep(self.latency).await;
        let location = format!("converted/{}.{}", id, format);
        debug!("Converted {} -> {}", id, location);
        Ok(ConvertedArtifact { location })
    }
}
