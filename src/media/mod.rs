mod bridge;
mod cache;
mod error;
mod files;
mod options;
mod permissions;
mod probe;
mod terminal;
mod types;

pub use bridge::{BridgeResponse, BridgeUnavailable, PickerBridge, PickerRequest, PickerSource};
pub use cache::{uri_for, AssetCache};
pub use error::{PickerError, Result};
pub use files::FileListBridge;
pub use options::{OpenFileBrowserOptions, SelectionOptions};
pub use permissions::{
    ConfigPermissions, PermissionKind, PermissionProvider, PermissionResponse, PermissionStatus,
};
pub use probe::{classify, AssetProbe};
pub use terminal::{list_library, CaptureSettings, TerminalBridge};
pub use types::{AssetDescriptor, AssetKind, MediaTypeFilter, SelectionResult};

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Lifecycle of a single request, reported in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    AwaitingPermission,
    AwaitingUserChoice,
    Resolved,
    Failed,
}

/// Entry point for picking media: validates options, negotiates
/// permission, presents the bridge and normalizes what comes back.
pub struct MediaPicker {
    bridge: Box<dyn PickerBridge>,
    permissions: Arc<dyn PermissionProvider>,
    // The platform UI is exclusive; holding this means a picker is on screen
    presenting: Mutex<()>,
}

impl MediaPicker {
    pub fn new(bridge: Box<dyn PickerBridge>, permissions: Arc<dyn PermissionProvider>) -> Self {
        info!("Media picker initialized with {} bridge", bridge.name());
        Self {
            bridge,
            permissions,
            presenting: Mutex::new(()),
        }
    }

    /// Lets the user choose from their media library.
    pub async fn launch_image_library(&self, options: SelectionOptions) -> Result<SelectionResult> {
        self.run(PickerSource::Library, Some(PermissionKind::MediaLibrary), options)
            .await
    }

    /// Lets the user take a new photo or video.
    pub async fn launch_camera(&self, options: SelectionOptions) -> Result<SelectionResult> {
        self.run(PickerSource::Camera, Some(PermissionKind::Camera), options)
            .await
    }

    /// File-input style picker. No permission is negotiated and EXIF or
    /// inline content are never returned.
    pub async fn open_file_browser(
        &self,
        options: OpenFileBrowserOptions,
    ) -> Result<SelectionResult> {
        let source = PickerSource::FileBrowser {
            capture: options.capture,
        };
        self.run(source, None, options.to_selection()).await
    }

    pub async fn get_permissions(&self, kind: PermissionKind) -> Result<PermissionResponse> {
        Ok(self.permissions.get_permission(kind).await?)
    }

    pub async fn request_permissions(&self, kind: PermissionKind) -> Result<PermissionResponse> {
        Ok(self.permissions.request_permission(kind).await?)
    }

    async fn run(
        &self,
        source: PickerSource,
        permission: Option<PermissionKind>,
        options: SelectionOptions,
    ) -> Result<SelectionResult> {
        info!("Picker request from {:?}: {:?}", source, options);

        let outcome = self.resolve(source, permission, options).await;
        match &outcome {
            Ok(result) => {
                debug!(state = ?RequestState::Resolved, "Picker request finished");
                info!(
                    "Picker resolved: {}",
                    if result.is_cancelled() {
                        "cancelled".to_string()
                    } else {
                        format!("{} asset(s)", result.assets().len())
                    }
                );
            }
            Err(e) => {
                debug!(state = ?RequestState::Failed, "Picker request finished");
                warn!("Picker request failed: {}", e);
            }
        }
        outcome
    }

    async fn resolve(
        &self,
        source: PickerSource,
        permission: Option<PermissionKind>,
        options: SelectionOptions,
    ) -> Result<SelectionResult> {
        debug!(state = ?RequestState::Idle, "Validating picker options");
        options.validate()?;

        let _presenting = self.presenting.try_lock().map_err(|_| {
            PickerError::PlatformUnavailable("a picker is already being presented".to_string())
        })?;

        if !self.bridge.supports(source) {
            return Err(PickerError::PlatformUnavailable(format!(
                "{} bridge cannot serve {:?}",
                self.bridge.name(),
                source
            )));
        }

        if let Some(kind) = permission {
            debug!(state = ?RequestState::AwaitingPermission, "Checking {} permission", kind);
            self.ensure_permission(kind).await?;
        }

        debug!(state = ?RequestState::AwaitingUserChoice, "Presenting {} picker", self.bridge.name());
        let request = PickerRequest { source, options };
        let response = self
            .bridge
            .present(&request)
            .await
            .map_err(|e| match e.downcast::<BridgeUnavailable>() {
                Ok(unavailable) => PickerError::PlatformUnavailable(unavailable.0),
                Err(e) => PickerError::Bridge(e),
            })?;

        Ok(normalize(response, &request.options))
    }

    async fn ensure_permission(&self, kind: PermissionKind) -> Result<()> {
        let mut response = self.permissions.get_permission(kind).await?;
        if response.status == PermissionStatus::Undetermined {
            response = self.permissions.request_permission(kind).await?;
        }

        if response.granted {
            Ok(())
        } else {
            Err(PickerError::PermissionDenied(kind))
        }
    }
}

/// Shapes a raw bridge response into the caller-facing result.
pub fn normalize(response: BridgeResponse, options: &SelectionOptions) -> SelectionResult {
    let picked = match response {
        BridgeResponse::Dismissed => return SelectionResult::Cancelled,
        BridgeResponse::Picked(assets) => assets,
    };

    let mut assets: Vec<AssetDescriptor> = picked
        .into_iter()
        .filter(|asset| match asset.kind {
            Some(kind) if !options.media_types.accepts(kind) => {
                warn!("Dropping {} asset {} outside {:?}", kind, asset.uri, options.media_types);
                false
            }
            _ => true,
        })
        .map(|mut asset| {
            if !options.exif {
                asset.exif = None;
            }
            if !options.base64 || asset.base64.as_deref() == Some("") {
                asset.base64 = None;
            }
            asset
        })
        .collect();

    if assets.len() > 1 && !options.allows_multiple_selection {
        warn!(
            "Bridge returned {} assets for a single selection, keeping the first",
            assets.len()
        );
        assets.truncate(1);
    }

    if options.allows_multiple_selection && !assets.is_empty() {
        return SelectionResult::CompletedMultiple(assets);
    }

    match assets.pop() {
        Some(asset) => SelectionResult::Completed(asset),
        None => SelectionResult::Cancelled,
    }
}
