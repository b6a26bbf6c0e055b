use super::options::SelectionOptions;
use super::types::AssetDescriptor;
use anyhow::Result;
use async_trait::async_trait;

/// The environment cannot show this bridge's UI, e.g. no terminal is
/// attached. Surfaces to callers as `PickerError::PlatformUnavailable`.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BridgeUnavailable(pub String);

/// Where the user is asked to pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerSource {
    Library,
    Camera,
    FileBrowser { capture: bool },
}

/// Validated request handed to a bridge.
#[derive(Debug, Clone)]
pub struct PickerRequest {
    pub source: PickerSource,
    pub options: SelectionOptions,
}

/// What the platform handed back, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeResponse {
    Dismissed,
    Picked(Vec<AssetDescriptor>),
}

#[async_trait]
pub trait PickerBridge: Send + Sync {
    /// Human-readable name of the bridge
    fn name(&self) -> &'static str;

    /// Whether this bridge can serve the given source at all
    fn supports(&self, source: PickerSource) -> bool;

    /// Show the picker and suspend until the user resolves it
    async fn present(&self, request: &PickerRequest) -> Result<BridgeResponse>;
}
