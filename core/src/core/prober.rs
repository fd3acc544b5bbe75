use std::sync::Arc;

use log::debug;

use crate::core::{ProbeOutcome, Target};
use crate::http::Transport;
use crate::utils::detector::FlawDetector;

/// Fetches one target and turns whatever happens into a `ProbeOutcome`.
///
/// Nothing escapes this boundary as an error: transport failures become
/// `ProbeStatus::Error` rows and only status 200 bodies are scanned.
pub struct UrlProber {
    transport: Arc<dyn Transport>,
    detector: FlawDetector,
}

impl UrlProber {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            detector: FlawDetector::new(),
        }
    }

    pub async fn probe(&self, target: Target) -> ProbeOutcome {
        let url = target.into_inner();

        match self.transport.get(&url).await {
            Ok(response) if response.status == 200 => {
                let flaws = self.detector.detect(&response.body);
                debug!("{} scanned, {} flaw(s)", url, flaws.len());
                ProbeOutcome::scanned(url, flaws)
            }
            Ok(response) => {
                debug!("{} returned {}, not scanned", url, response.status);
                ProbeOutcome::http(url, response.status)
            }
            Err(e) => {
                debug!("{} unreachable: {}", url, e);
                ProbeOutcome::error(url, e.description())
            }
        }
    }
}
