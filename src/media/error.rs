use super::permissions::PermissionKind;
use thiserror::Error;

/// Terminal failures of a picker request. A user dismissing the picker is
/// not one of these; it resolves as `SelectionResult::Cancelled`.
#[derive(Debug, Error)]
pub enum PickerError {
    #[error("{0} permission was not granted")]
    PermissionDenied(PermissionKind),

    #[error("Invalid picker option: {0}")]
    InvalidOption(String),

    #[error("Picker unavailable: {0}")]
    PlatformUnavailable(String),

    /// The bridge itself failed (I/O, crashed helper tool)
    #[error("Picker bridge failed: {0:#}")]
    Bridge(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PickerError>;
