//! Mock security scanner

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use cadforge_core::{ContentRef, ForgeConfig, Result, ScanVerdict, SecurityScanner};

/// Simulated scanner with the documented mock policy: content passes iff
/// it is smaller than the safety threshold, after a fixed latency. A real
/// deployment swaps in another [`SecurityScanner`] behind the same trait.
pub struct MockScanner {
    latency: Duration,
    safe_below_bytes: u64,
}

impl MockScanner {
    pub fn new(latency: Duration, safe_below_bytes: u64) -> Self {
        Self {
            latency,
            safe_below_bytes,
        }
    }

    pub fn from_config(config: &ForgeConfig) -> Self {
        Self::new(config.scan_latency(), config.scan_safe_below_bytes)
    }
}

#[async_trait]
impl SecurityScanner for MockScanner {
    async fn scan(&self, _content: &ContentRef, size_bytes: u64) -> Result<ScanVerdict> {
        tokio::time::sleep(self.latency).await;
        let verdict = if size_bytes < self.safe_below_bytes {
            ScanVerdict::Accepted
        } else {
            ScanVerdict::Rejected
        };
        debug!("Scan verdict for {} bytes: {:?}", size_bytes, verdict);
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn scanner() -> MockScanner {
        MockScanner::new(Duration::from_millis(1), 10 * MIB)
    }

    #[tokio::test]
    async fn accepts_below_threshold() {
        let content = ContentRef::from_bytes(vec![0u8; 16]);
        let verdict = scanner().scan(&content, 5 * MIB).await.unwrap();
        assert_eq!(verdict, ScanVerdict::Accepted);
    }

    #[tokio::test]
    async fn rejects_at_and_above_threshold() {
        let content = ContentRef::from_bytes(vec![0u8; 16]);
        let scanner = scanner();
        // Strict inequality: exactly 10 MiB is already unsafe
        assert_eq!(
            scanner.scan(&content, 10 * MIB).await.unwrap(),
            ScanVerdict::Rejected
        );
        assert_eq!(
            scanner.scan(&content, 15 * MIB).await.unwrap(),
            ScanVerdict::Rejected
        );
    }
}
