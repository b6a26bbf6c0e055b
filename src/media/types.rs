use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Which asset categories the picker surfaces to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaTypeFilter {
    All,
    Videos,
    #[default]
    Images,
}

impl MediaTypeFilter {
    pub fn accepts(&self, kind: AssetKind) -> bool {
        match self {
            MediaTypeFilter::All => true,
            MediaTypeFilter::Images => kind == AssetKind::Image,
            MediaTypeFilter::Videos => kind == AssetKind::Video,
        }
    }
}

impl std::str::FromStr for MediaTypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(MediaTypeFilter::All),
            "videos" | "video" => Ok(MediaTypeFilter::Videos),
            "images" | "image" => Ok(MediaTypeFilter::Images),
            other => Err(format!("unknown media type filter: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Image => write!(f, "image"),
            AssetKind::Video => write!(f, "video"),
        }
    }
}

/// One selected media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Locator the caller can open, usually a `file://` URL into the cache
    pub uri: String,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AssetKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exif: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

impl AssetDescriptor {
    pub fn new(uri: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            uri: uri.into(),
            width,
            height,
            kind: None,
            exif: None,
            base64: None,
        }
    }

    pub fn with_kind(mut self, kind: AssetKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Outcome of a picker request.
///
/// Serializes to the `{"cancelled": bool, ...}` record existing callers
/// expect, with asset fields flattened next to the flag and multi-selection
/// carried under `assets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireResult", try_from = "WireResult")]
pub enum SelectionResult {
    Cancelled,
    Completed(AssetDescriptor),
    CompletedMultiple(Vec<AssetDescriptor>),
}

impl SelectionResult {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SelectionResult::Cancelled)
    }

    /// All selected assets, empty when cancelled.
    pub fn assets(&self) -> &[AssetDescriptor] {
        match self {
            SelectionResult::Cancelled => &[],
            SelectionResult::Completed(asset) => std::slice::from_ref(asset),
            SelectionResult::CompletedMultiple(assets) => assets,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireResult {
    cancelled: bool,
    #[serde(flatten)]
    asset: Option<AssetDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    assets: Option<Vec<AssetDescriptor>>,
}

impl From<SelectionResult> for WireResult {
    fn from(result: SelectionResult) -> Self {
        match result {
            SelectionResult::Cancelled => WireResult {
                cancelled: true,
                asset: None,
                assets: None,
            },
            SelectionResult::Completed(asset) => WireResult {
                cancelled: false,
                asset: Some(asset),
                assets: None,
            },
            SelectionResult::CompletedMultiple(assets) => WireResult {
                cancelled: false,
                asset: None,
                assets: Some(assets),
            },
        }
    }
}

impl TryFrom<WireResult> for SelectionResult {
    type Error = String;

    fn try_from(wire: WireResult) -> Result<Self, Self::Error> {
        match (wire.cancelled, wire.asset, wire.assets) {
            (true, None, None) => Ok(SelectionResult::Cancelled),
            (true, _, _) => Err("cancelled result must not carry asset data".to_string()),
            (false, None, Some(assets)) => Ok(SelectionResult::CompletedMultiple(assets)),
            (false, Some(asset), None) => Ok(SelectionResult::Completed(asset)),
            (false, Some(_), Some(_)) => {
                Err("completed result carries both a single asset and an asset list".to_string())
            }
            (false, None, None) => Err("completed result is missing its asset".to_string()),
        }
    }
}
