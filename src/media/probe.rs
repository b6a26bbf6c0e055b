use super::cache::{uri_for, AssetCache};
use super::options::SelectionOptions;
use super::types::{AssetDescriptor, AssetKind};
use crate::config::ToolsConfig;
use crate::utils::run_json_tool;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Guesses whether a file is an image or a video from its name.
pub fn classify(path: &Path) -> Option<AssetKind> {
    let mime = mime_guess::from_path(path).first()?;
    if mime.type_() == mime_guess::mime::IMAGE {
        Some(AssetKind::Image)
    } else if mime.type_() == mime_guess::mime::VIDEO {
        Some(AssetKind::Video)
    } else {
        None
    }
}

/// Reads dimensions and the optional extras for files on local disk.
#[derive(Debug, Clone, Default)]
pub struct AssetProbe {
    tools: ToolsConfig,
}

impl AssetProbe {
    pub fn new(tools: ToolsConfig) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolsConfig {
        &self.tools
    }

    /// Builds the descriptor for `path`, published under `uri`.
    ///
    /// EXIF and base64 are only gathered when requested, and only for
    /// images. A failed EXIF read leaves the field empty.
    pub async fn describe(
        &self,
        path: &Path,
        uri: String,
        options: &SelectionOptions,
    ) -> Result<AssetDescriptor> {
        let kind = classify(path)
            .ok_or_else(|| anyhow::anyhow!("{} is not an image or video", path.display()))?;

        let (width, height) = match kind {
            AssetKind::Image => image_dimensions(path.to_path_buf()).await?,
            AssetKind::Video => self.video_dimensions(path).await?,
        };
        debug!("Probed {} as {} {}x{}", path.display(), kind, width, height);

        let exif = if options.exif && kind == AssetKind::Image {
            match self.read_exif(path).await {
                Ok(exif) => exif,
                Err(e) => {
                    warn!("EXIF unavailable for {}: {:#}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        let base64 = if options.base64 && kind == AssetKind::Image {
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            (!data.is_empty()).then(|| STANDARD.encode(&data))
        } else {
            None
        };

        Ok(AssetDescriptor {
            uri,
            width,
            height,
            kind: Some(kind),
            exif,
            base64,
        })
    }

    /// Describes files already staged in `cache`. If any of them cannot be
    /// described, all of them are removed from the cache again.
    pub async fn describe_staged(
        &self,
        cache: &AssetCache,
        staged: &[PathBuf],
        options: &SelectionOptions,
    ) -> Result<Vec<AssetDescriptor>> {
        let mut assets = Vec::with_capacity(staged.len());
        for path in staged {
            let described = match uri_for(path) {
                Ok(uri) => self.describe(path, uri, options).await,
                Err(e) => Err(e),
            };
            match described {
                Ok(asset) => assets.push(asset),
                Err(e) => {
                    cache.discard(staged).await;
                    return Err(e);
                }
            }
        }
        Ok(assets)
    }

    async fn video_dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        let path_str = path.to_string_lossy();
        let json = run_json_tool(
            &self.tools.ffprobe,
            &["-v", "quiet", "-print_format", "json", "-show_streams", &*path_str],
            TOOL_TIMEOUT,
        )
        .await
        .context("Failed to probe video")?;

        dimensions_from_ffprobe(&json)
            .ok_or_else(|| anyhow::anyhow!("No video stream in {}", path.display()))
    }

    async fn read_exif(&self, path: &Path) -> Result<Option<Map<String, Value>>> {
        let path_str = path.to_string_lossy();
        let json = run_json_tool(&self.tools.exiftool, &["-json", "-n", &*path_str], TOOL_TIMEOUT)
            .await?;
        Ok(exif_from_exiftool(json))
    }
}

async fn image_dimensions(path: PathBuf) -> Result<(u32, u32)> {
    tokio::task::spawn_blocking(move || {
        image::image_dimensions(&path)
            .with_context(|| format!("Failed to read image header of {}", path.display()))
    })
    .await
    .context("Image probe task failed")?
}

fn dimensions_from_ffprobe(json: &Value) -> Option<(u32, u32)> {
    json["streams"]
        .as_array()?
        .iter()
        .find(|stream| stream["codec_type"].as_str() == Some("video"))
        .and_then(|stream| {
            let width = u32::try_from(stream["width"].as_u64()?).ok()?;
            let height = u32::try_from(stream["height"].as_u64()?).ok()?;
            Some((width, height))
        })
}

// exiftool prints one object per file, tagged with the path it read
fn exif_from_exiftool(json: Value) -> Option<Map<String, Value>> {
    let mut tags = match json {
        Value::Array(mut files) if !files.is_empty() => match files.swap_remove(0) {
            Value::Object(tags) => tags,
            _ => return None,
        },
        _ => return None,
    };

    tags.remove("SourceFile");
    (!tags.is_empty()).then_some(tags)
}
