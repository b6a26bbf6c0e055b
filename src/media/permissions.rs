use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionKind {
    MediaLibrary,
    Camera,
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKind::MediaLibrary => write!(f, "Media library"),
            PermissionKind::Camera => write!(f, "Camera"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    #[default]
    Undetermined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionExpiration {
    Never(NeverExpires),
    At(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeverExpires {
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub status: PermissionStatus,
    pub granted: bool,
    pub can_ask_again: bool,
    pub expires: PermissionExpiration,
}

impl PermissionResponse {
    pub fn from_status(status: PermissionStatus) -> Self {
        Self {
            status,
            granted: status == PermissionStatus::Granted,
            can_ask_again: status != PermissionStatus::Denied,
            expires: PermissionExpiration::Never(NeverExpires::Never),
        }
    }
}

/// Runtime permission negotiation consulted before the picker is shown.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current status without prompting
    async fn get_permission(&self, kind: PermissionKind) -> Result<PermissionResponse>;

    /// May prompt the user when the status is still undetermined
    async fn request_permission(&self, kind: PermissionKind) -> Result<PermissionResponse>;
}

/// Permission state seeded from configuration.
///
/// Undetermined kinds are asked about on a terminal prompt when
/// `interactive` is set and a terminal is attached; the answer is kept for
/// the life of the process. Without a prompt they stay undetermined.
pub struct ConfigPermissions {
    statuses: Mutex<HashMap<PermissionKind, PermissionStatus>>,
    interactive: bool,
    attached: bool,
}

impl ConfigPermissions {
    pub fn new(media_library: PermissionStatus, camera: PermissionStatus, interactive: bool) -> Self {
        let statuses = HashMap::from([
            (PermissionKind::MediaLibrary, media_library),
            (PermissionKind::Camera, camera),
        ]);

        Self {
            statuses: Mutex::new(statuses),
            interactive,
            attached: console::Term::stderr().is_term(),
        }
    }

    /// Overrides terminal detection.
    pub fn with_terminal(mut self, attached: bool) -> Self {
        self.attached = attached;
        self
    }

    fn status(&self, kind: PermissionKind) -> PermissionStatus {
        self.statuses
            .lock()
            .map(|statuses| statuses.get(&kind).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    fn remember(&self, kind: PermissionKind, status: PermissionStatus) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.insert(kind, status);
        }
    }
}

#[async_trait]
impl PermissionProvider for ConfigPermissions {
    async fn get_permission(&self, kind: PermissionKind) -> Result<PermissionResponse> {
        Ok(PermissionResponse::from_status(self.status(kind)))
    }

    async fn request_permission(&self, kind: PermissionKind) -> Result<PermissionResponse> {
        let current = self.status(kind);
        if current != PermissionStatus::Undetermined || !self.interactive || !self.attached {
            debug!("Permission request for {} resolved without prompt: {:?}", kind, current);
            return Ok(PermissionResponse::from_status(current));
        }

        let prompt = format!("Allow access to {}?", kind.to_string().to_lowercase());
        let answer = match tokio::task::spawn_blocking(move || {
            dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact_opt()
        })
        .await
        .context("Permission prompt task failed")?
        {
            Ok(answer) => answer,
            Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::NotConnected => {
                debug!("No terminal for {} permission prompt", kind);
                None
            }
            Err(e) => return Err(e).context("Failed to show permission prompt"),
        };

        // An interrupted prompt leaves the decision open
        let status = match answer {
            Some(true) => PermissionStatus::Granted,
            Some(false) => PermissionStatus::Denied,
            None => PermissionStatus::Undetermined,
        };

        info!("{} permission answered: {:?}", kind, status);
        if status != PermissionStatus::Undetermined {
            self.remember(kind, status);
        }

        Ok(PermissionResponse::from_status(status))
    }
}
