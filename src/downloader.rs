use crate::constants::*;
use crate::errors::AppError;
use crate::fetcher::Fetcher;
use crate::persist::{write_json, InFlightSlot};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Which remote document ended up on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Detailed,
    Base,
}

#[derive(Debug)]
pub enum DownloadOutcome {
    Success {
        variant: Variant,
        /// Set when the detailed document was wanted but the base one was saved.
        fell_back: bool,
    },
    Failed(AppError),
}

/// Fetches `{code}_full.json` when asked, falls back to `{code}.json`,
/// and persists whichever succeeds.
#[derive(Clone)]
pub struct VariantDownloader {
    fetcher: Fetcher,
    slot: InFlightSlot,
    post_download_delay: Duration,
}

impl VariantDownloader {
    pub fn new(fetcher: Fetcher, slot: InFlightSlot, post_download_delay: Duration) -> Self {
        Self {
            fetcher,
            slot,
            post_download_delay,
        }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn slot(&self) -> &InFlightSlot {
        &self.slot
    }

    pub async fn download(&self, code: &str, local_path: &Path, wants_detailed: bool) -> DownloadOutcome {
        if wants_detailed {
            let detailed = format!("{}{}", code, DETAILED_SUFFIX);
            match self.fetch_and_persist(&detailed, local_path).await {
                Ok(()) => {
                    debug!(code, path = %local_path.display(), "saved detailed variant");
                    return DownloadOutcome::Success {
                        variant: Variant::Detailed,
                        fell_back: false,
                    };
                }
                Err(e) => {
                    warn!(code, error = %e, "detailed variant unavailable, falling back to base");
                }
            }
        }

        match self.fetch_and_persist(code, local_path).await {
            Ok(()) => {
                if !self.post_download_delay.is_zero() {
                    sleep(self.post_download_delay).await;
                }
                DownloadOutcome::Success {
                    variant: Variant::Base,
                    fell_back: wants_detailed,
                }
            }
            Err(e) => DownloadOutcome::Failed(e),
        }
    }

    async fn fetch_and_persist(&self, resource: &str, local_path: &Path) -> Result<(), AppError> {
        let data = self.fetcher.fetch_resource(resource).await?;
        write_json(&self.slot, local_path, &data).await
    }
}
