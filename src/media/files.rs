use super::{
    bridge::{BridgeResponse, PickerBridge, PickerRequest, PickerSource},
    cache::AssetCache,
    probe::{classify, AssetProbe},
};
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

/// Serves a list of files chosen ahead of time, as a browser file input
/// would after the user confirmed the dialog.
pub struct FileListBridge {
    files: Vec<PathBuf>,
    cache: AssetCache,
    probe: AssetProbe,
}

impl FileListBridge {
    pub fn new(files: Vec<PathBuf>, cache: AssetCache, probe: AssetProbe) -> Self {
        Self {
            files,
            cache,
            probe,
        }
    }
}

#[async_trait]
impl PickerBridge for FileListBridge {
    fn name(&self) -> &'static str {
        "file-list"
    }

    fn supports(&self, source: PickerSource) -> bool {
        matches!(
            source,
            PickerSource::Library | PickerSource::FileBrowser { capture: false }
        )
    }

    async fn present(&self, request: &PickerRequest) -> Result<BridgeResponse> {
        let filter = request.options.media_types;
        let mut matching: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|path| match classify(path) {
                Some(kind) if filter.accepts(kind) => true,
                _ => {
                    debug!("Skipping {} for filter {:?}", path.display(), filter);
                    false
                }
            })
            .cloned()
            .collect();

        if !request.options.allows_multiple_selection {
            matching.truncate(1);
        }

        if matching.is_empty() {
            info!("No supplied file matches {:?}, treating as dismissed", filter);
            return Ok(BridgeResponse::Dismissed);
        }

        let staged = self.cache.stage_all(&matching).await?;
        let assets = self
            .probe
            .describe_staged(&self.cache, &staged, &request.options)
            .await?;

        Ok(BridgeResponse::Picked(assets))
    }
}
