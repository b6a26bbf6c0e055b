use crate::media::PermissionStatus;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub picker: PickerConfig,
    pub permissions: PermissionsConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PickerConfig {
    /// Directory browsed as the media library
    pub library_dir: Option<PathBuf>,
    /// Where selected assets are staged; defaults to the user cache dir
    pub cache_dir: Option<PathBuf>,
    /// ffmpeg input used for camera capture, e.g. `/dev/video0`
    pub capture_device: Option<String>,
    /// ffmpeg input format for the capture device
    pub capture_format: String,
    pub capture_seconds: u32,
    pub interactive_permissions: bool,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            library_dir: None,
            cache_dir: None,
            capture_device: None,
            capture_format: "v4l2".to_string(),
            capture_seconds: 5,
            interactive_permissions: true,
        }
    }
}

impl PickerConfig {
    pub fn library_dir(&self) -> PathBuf {
        self.library_dir
            .clone()
            .or_else(dirs::picture_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PermissionsConfig {
    pub media_library: PermissionStatus,
    pub camera: PermissionStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub exiftool: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            exiftool: "exiftool".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config")
    }

    pub fn get_logging_format(&self) -> &str {
        &self.logging.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.get_logging_format(), "pretty");
        assert_eq!(config.permissions.media_library, PermissionStatus::Undetermined);
        assert_eq!(config.picker.capture_seconds, 5);
        assert!(config.picker.interactive_permissions);
        assert_eq!(config.tools.ffprobe, "ffprobe");
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [logging]
            format = "json"

            [picker]
            library_dir = "/srv/photos"
            capture_device = "/dev/video2"
            capture_seconds = 3
            interactive_permissions = false

            [permissions]
            media_library = "granted"
            camera = "denied"

            [tools]
            exiftool = "/opt/bin/exiftool"
            "#,
        )
        .unwrap();

        assert_eq!(config.get_logging_format(), "json");
        assert_eq!(config.picker.library_dir(), PathBuf::from("/srv/photos"));
        assert_eq!(config.picker.capture_device.as_deref(), Some("/dev/video2"));
        assert_eq!(config.picker.capture_format, "v4l2");
        assert_eq!(config.permissions.camera, PermissionStatus::Denied);
        assert_eq!(config.tools.exiftool, "/opt/bin/exiftool");
        assert_eq!(config.tools.ffmpeg, "ffmpeg");
    }

    #[test]
    fn test_rejects_unknown_permission_status() {
        let result = Config::parse(
            r#"
            [permissions]
            camera = "maybe"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nformat = \"json\"\n").unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.get_logging_format(), "json");
    }
}
