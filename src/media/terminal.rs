use super::{
    bridge::{BridgeResponse, BridgeUnavailable, PickerBridge, PickerRequest, PickerSource},
    cache::AssetCache,
    options::SelectionOptions,
    probe::{classify, AssetProbe},
    types::MediaTypeFilter,
};
use crate::utils::tool_available;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// ffmpeg input used when the user picks the camera.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub device: String,
    pub format: String,
    pub seconds: u32,
}

/// Interactive picker drawn on the controlling terminal.
///
/// Library browsing needs stderr to be a terminal; without one the bridge
/// reports those sources as unsupported. Camera capture runs unattended.
pub struct TerminalBridge {
    library_dir: PathBuf,
    capture: Option<CaptureSettings>,
    cache: AssetCache,
    probe: AssetProbe,
    attached: bool,
}

impl TerminalBridge {
    pub fn new(
        library_dir: PathBuf,
        capture: Option<CaptureSettings>,
        cache: AssetCache,
        probe: AssetProbe,
    ) -> Self {
        Self {
            library_dir,
            capture,
            cache,
            probe,
            attached: console::Term::stderr().is_term(),
        }
    }

    /// Overrides terminal detection.
    pub fn with_terminal(mut self, attached: bool) -> Self {
        self.attached = attached;
        self
    }

    pub async fn test_availability(&self) -> bool {
        let ffprobe_available = tool_available(&self.probe.tools().ffprobe, "-version").await;
        if self.capture.is_some() {
            let ffmpeg_available = tool_available(&self.probe.tools().ffmpeg, "-version").await;
            if !ffmpeg_available {
                warn!("⚠️  Camera capture will fail without ffmpeg");
            }
        }
        if !ffprobe_available {
            warn!("⚠️  Videos cannot be described without ffprobe");
        }
        ffprobe_available
    }

    async fn pick_from_library(&self, request: &PickerRequest) -> Result<Option<Vec<PathBuf>>> {
        let candidates = list_library(&self.library_dir, request.options.media_types).await?;
        if candidates.is_empty() {
            info!(
                "No {:?} found in {}",
                request.options.media_types,
                self.library_dir.display()
            );
            return Ok(None);
        }

        let labels: Vec<String> = candidates
            .iter()
            .map(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            })
            .collect();

        let multiple = request.options.allows_multiple_selection;
        let chosen = tokio::task::spawn_blocking(move || prompt_selection(&labels, multiple))
            .await
            .context("Picker prompt task failed")??;

        Ok(chosen.map(|indices| {
            indices
                .into_iter()
                .filter_map(|index| candidates.get(index).cloned())
                .collect()
        }))
    }

    async fn capture(&self, request: &PickerRequest) -> Result<Option<Vec<PathBuf>>> {
        let settings = self
            .capture
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No capture device configured"))?;

        let record_video = records_video(&request.options);
        let suffix = if record_video { ".mp4" } else { ".jpg" };
        let output_file = NamedTempFile::with_suffix(suffix)?;
        let output_path = output_file.path();

        let mut command = tokio::process::Command::new(&self.probe.tools().ffmpeg);
        command
            .args(capture_args(settings, &request.options, output_path))
            .kill_on_drop(true);

        info!(
            "Capturing {} from {}",
            if record_video { "video" } else { "photo" },
            settings.device
        );

        let output = tokio::time::timeout(
            Duration::from_secs(u64::from(settings.seconds) + 30),
            command.output(),
        )
        .await
        .context("Camera capture timed out")?
        .context("Failed to run ffmpeg")?;

        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "Camera capture failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let staged = self.cache.stage(output_path).await?;
        Ok(Some(vec![staged]))
    }
}

#[async_trait]
impl PickerBridge for TerminalBridge {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn supports(&self, source: PickerSource) -> bool {
        match source {
            PickerSource::Library | PickerSource::FileBrowser { capture: false } => self.attached,
            PickerSource::Camera | PickerSource::FileBrowser { capture: true } => {
                self.capture.is_some()
            }
        }
    }

    async fn present(&self, request: &PickerRequest) -> Result<BridgeResponse> {
        if request.options.allows_editing {
            match request.options.effective_aspect() {
                Some((x, y)) => debug!(
                    "Terminal picker has no editing step, returning originals instead of {}:{} crops",
                    x, y
                ),
                None => debug!("Terminal picker has no editing step, returning originals"),
            }
        }

        let chosen = match request.source {
            PickerSource::Library | PickerSource::FileBrowser { capture: false } => {
                match self.pick_from_library(request).await? {
                    Some(paths) => Some(self.cache.stage_all(&paths).await?),
                    None => None,
                }
            }
            PickerSource::Camera | PickerSource::FileBrowser { capture: true } => {
                self.capture(request).await?
            }
        };

        let paths = match chosen {
            Some(paths) if !paths.is_empty() => paths,
            _ => return Ok(BridgeResponse::Dismissed),
        };

        let assets = self
            .probe
            .describe_staged(&self.cache, &paths, &request.options)
            .await?;

        Ok(BridgeResponse::Picked(assets))
    }
}

/// Media files directly inside `dir` that pass `filter`, sorted by name.
pub async fn list_library(dir: &Path, filter: MediaTypeFilter) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to open library {}", dir.display()))?;

    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        if let Some(kind) = classify(&path) {
            if filter.accepts(kind) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

// Returns None when the user backs out of the prompt
fn prompt_selection(labels: &[String], multiple: bool) -> Result<Option<Vec<usize>>> {
    let answer = if multiple {
        dialoguer::MultiSelect::new()
            .with_prompt("Select media (space to toggle, enter to confirm)")
            .items(labels)
            .interact_opt()
    } else {
        dialoguer::Select::new()
            .with_prompt("Select media")
            .items(labels)
            .default(0)
            .interact_opt()
            .map(|choice| choice.map(|index| vec![index]))
    };

    match answer {
        Ok(choice) => Ok(choice),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => {
            debug!("Picker prompt interrupted");
            Ok(None)
        }
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::NotConnected => {
            Err(BridgeUnavailable("no terminal attached".to_string()).into())
        }
        Err(e) => Err(e).context("Failed to show picker prompt"),
    }
}

fn records_video(options: &SelectionOptions) -> bool {
    options.media_types == MediaTypeFilter::Videos
}

/// ffmpeg arguments for one capture into `output`: a single JPEG frame, or
/// `settings.seconds` of video when only videos are wanted.
fn capture_args(
    settings: &CaptureSettings,
    options: &SelectionOptions,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-loglevel",
        "error",
        "-f",
        settings.format.as_str(),
        "-i",
        settings.device.as_str(),
    ]
    .into_iter()
    .map(OsString::from)
    .collect();

    if records_video(options) {
        args.push("-t".into());
        args.push(settings.seconds.to_string().into());
    } else {
        args.push("-frames:v".into());
        args.push("1".into());
        if let Some(quality) = options.quality {
            args.push("-q:v".into());
            args.push(jpeg_qscale(quality).to_string().into());
        }
    }

    args.push("-y".into());
    args.push(output.into());
    args
}

/// Maps a `[0, 1]` quality hint onto ffmpeg's JPEG scale, where 2 is best
/// and 31 is worst.
fn jpeg_qscale(quality: f64) -> u32 {
    let quality = quality.clamp(0.0, 1.0);
    2 + ((1.0 - quality) * 29.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{ConfigPermissions, MediaPicker, PermissionStatus, PickerError};
    use std::sync::Arc;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    fn bridge(capture: Option<CaptureSettings>) -> TerminalBridge {
        TerminalBridge::new(
            PathBuf::from("."),
            capture,
            AssetCache::new(std::env::temp_dir()),
            AssetProbe::default(),
        )
        .with_terminal(true)
    }

    fn camera(format: &str, device: &str, seconds: u32) -> CaptureSettings {
        CaptureSettings {
            device: device.to_string(),
            format: format.to_string(),
            seconds,
        }
    }

    fn args_of(settings: &CaptureSettings, options: &SelectionOptions) -> Vec<String> {
        capture_args(settings, options, Path::new("/tmp/out.jpg"))
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_list_library_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.jpg");
        touch(dir.path(), "a.png");
        touch(dir.path(), "clip.mp4");
        touch(dir.path(), "notes.txt");
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let images = list_library(dir.path(), MediaTypeFilter::Images).await.unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.png", "b.jpg"]);

        let videos = list_library(dir.path(), MediaTypeFilter::Videos).await.unwrap();
        assert_eq!(videos.len(), 1);

        let all = list_library(dir.path(), MediaTypeFilter::All).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_list_library_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = list_library(&dir.path().join("gone"), MediaTypeFilter::All).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_library_is_dismissed() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = TerminalBridge::new(
            dir.path().to_path_buf(),
            None,
            AssetCache::new(dir.path().join("cache")),
            AssetProbe::default(),
        );
        let request = PickerRequest {
            source: PickerSource::Library,
            options: Default::default(),
        };
        assert_eq!(
            bridge.present(&request).await.unwrap(),
            BridgeResponse::Dismissed
        );
    }

    #[test]
    fn test_camera_support_depends_on_device() {
        assert!(!bridge(None).supports(PickerSource::Camera));
        assert!(bridge(None).supports(PickerSource::Library));

        let with_device = bridge(Some(CaptureSettings {
            device: "/dev/video0".to_string(),
            format: "v4l2".to_string(),
            seconds: 3,
        }));
        assert!(with_device.supports(PickerSource::Camera));
        assert!(with_device.supports(PickerSource::FileBrowser { capture: true }));
    }

    #[test]
    fn test_library_needs_terminal() {
        let detached = bridge(Some(camera("v4l2", "/dev/video0", 3))).with_terminal(false);
        assert!(!detached.supports(PickerSource::Library));
        assert!(!detached.supports(PickerSource::FileBrowser { capture: false }));
        assert!(detached.supports(PickerSource::Camera));
    }

    #[tokio::test]
    async fn test_detached_library_is_platform_unavailable() {
        let library = tempfile::tempdir().unwrap();
        image::RgbImage::new(2, 2)
            .save(library.path().join("a.png"))
            .unwrap();

        let bridge = TerminalBridge::new(
            library.path().to_path_buf(),
            None,
            AssetCache::new(library.path().join("cache")),
            AssetProbe::default(),
        )
        .with_terminal(false);
        let picker = MediaPicker::new(
            Box::new(bridge),
            Arc::new(ConfigPermissions::new(
                PermissionStatus::Granted,
                PermissionStatus::Granted,
                true,
            )),
        );

        let result = picker.launch_image_library(SelectionOptions::default()).await;
        assert!(matches!(result, Err(PickerError::PlatformUnavailable(_))));
    }

    #[test]
    fn test_capture_args_photo() {
        let args = args_of(&camera("v4l2", "/dev/video0", 5), &SelectionOptions::default());
        assert_eq!(
            args,
            vec![
                "-loglevel", "error", "-f", "v4l2", "-i", "/dev/video0", "-frames:v", "1", "-y",
                "/tmp/out.jpg"
            ]
        );
    }

    #[test]
    fn test_capture_args_photo_quality() {
        let options = SelectionOptions {
            quality: Some(0.5),
            ..SelectionOptions::default()
        };
        let args = args_of(&camera("v4l2", "/dev/video0", 5), &options);
        let position = args.iter().position(|arg| arg == "-q:v").unwrap();
        assert_eq!(args[position + 1], "17");
    }

    #[test]
    fn test_capture_args_video() {
        let options = SelectionOptions {
            quality: Some(0.5),
            ..SelectionOptions::new(MediaTypeFilter::Videos)
        };
        let args = args_of(&camera("avfoundation", "0", 7), &options);
        assert!(args.windows(2).any(|pair| pair == ["-t", "7"]));
        assert!(!args.iter().any(|arg| arg == "-frames:v" || arg == "-q:v"));
    }

    #[tokio::test]
    #[ignore = "Requires ffmpeg installed"]
    async fn test_capture_photo_from_test_source() {
        let cache_dir = tempfile::tempdir().unwrap();
        let bridge = TerminalBridge::new(
            PathBuf::from("."),
            Some(camera("lavfi", "testsrc=size=320x240:rate=5", 1)),
            AssetCache::new(cache_dir.path()),
            AssetProbe::default(),
        );
        let request = PickerRequest {
            source: PickerSource::Camera,
            options: SelectionOptions::default(),
        };

        match bridge.present(&request).await.unwrap() {
            BridgeResponse::Picked(assets) => {
                assert_eq!(assets.len(), 1);
                assert_eq!((assets[0].width, assets[0].height), (320, 240));
            }
            other => panic!("unexpected response: {other:?}"),
        }
        assert_eq!(std::fs::read_dir(cache_dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    #[ignore = "Requires ffmpeg installed"]
    async fn test_capture_video_from_test_source() {
        let cache_dir = tempfile::tempdir().unwrap();
        let bridge = TerminalBridge::new(
            PathBuf::from("."),
            Some(camera("lavfi", "testsrc=size=320x240:rate=5", 1)),
            AssetCache::new(cache_dir.path()),
            AssetProbe::default(),
        );
        let request = PickerRequest {
            source: PickerSource::Camera,
            options: SelectionOptions::new(MediaTypeFilter::Videos),
        };

        match bridge.present(&request).await.unwrap() {
            BridgeResponse::Picked(assets) => {
                assert_eq!(assets[0].kind, Some(crate::media::AssetKind::Video));
                assert_eq!((assets[0].width, assets[0].height), (320, 240));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_jpeg_qscale() {
        assert_eq!(jpeg_qscale(1.0), 2);
        assert_eq!(jpeg_qscale(0.0), 31);
        assert_eq!(jpeg_qscale(0.5), 17);
    }
}
