use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use media_picker::config::Config;
use media_picker::media::{
    AssetCache, AssetProbe, CaptureSettings, ConfigPermissions, FileListBridge, MediaPicker,
    MediaTypeFilter, OpenFileBrowserOptions, PermissionKind, PermissionProvider, PickerBridge,
    SelectionOptions, TerminalBridge,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pick from the media library
    Library(SelectionArgs),
    /// Take a new photo or video
    Camera(SelectionArgs),
    /// File-input style picker
    Browse(BrowseArgs),
    /// Show or request a permission
    Permissions {
        #[arg(value_enum)]
        kind: PermissionArg,
        /// Prompt if the permission is still undetermined
        #[arg(long)]
        request: bool,
    },
    /// Delete files staged by earlier picks
    ClearCache,
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// all, images or videos
    #[arg(long, default_value = "images")]
    media_types: MediaTypeFilter,
    #[arg(long)]
    allows_editing: bool,
    /// Crop aspect ratio as W:H
    #[arg(long, value_parser = parse_aspect)]
    aspect: Option<(f64, f64)>,
    /// Compression quality between 0 and 1
    #[arg(long)]
    quality: Option<f64>,
    #[arg(long)]
    multiple: bool,
    #[arg(long)]
    exif: bool,
    #[arg(long)]
    base64: bool,
    /// Pick these files instead of prompting
    #[arg(long = "file")]
    files: Vec<PathBuf>,
}

impl SelectionArgs {
    fn options(&self) -> SelectionOptions {
        SelectionOptions {
            allows_editing: self.allows_editing,
            aspect: self.aspect,
            quality: self.quality,
            allows_multiple_selection: self.multiple,
            media_types: self.media_types,
            exif: self.exif,
            base64: self.base64,
        }
    }
}

#[derive(Args, Debug)]
struct BrowseArgs {
    #[arg(long, default_value = "images")]
    media_types: MediaTypeFilter,
    /// Capture from the camera instead of browsing
    #[arg(long)]
    capture: bool,
    #[arg(long)]
    multiple: bool,
    #[arg(long = "file")]
    files: Vec<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PermissionArg {
    MediaLibrary,
    Camera,
}

impl From<PermissionArg> for PermissionKind {
    fn from(arg: PermissionArg) -> Self {
        match arg {
            PermissionArg::MediaLibrary => PermissionKind::MediaLibrary,
            PermissionArg::Camera => PermissionKind::Camera,
        }
    }
}

fn parse_aspect(value: &str) -> Result<(f64, f64), String> {
    let (width, height) = value
        .split_once(':')
        .ok_or_else(|| format!("expected W:H, got {value}"))?;
    let width = width.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let height = height.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    Ok((width, height))
}

fn get_config_path(cli: &Cli) -> Option<String> {
    if let Some(path) = &cli.config {
        return Some(path.clone());
    }

    if let Ok(path) = std::env::var("MEDIA_PICKER_CONFIG") {
        return Some(path);
    }

    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        let config_path = format!("{}/media-picker/config.toml", xdg_config_home);
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let config_path = format!("{}/.config/media-picker/config.toml", home.display());
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    None
}

fn asset_cache(config: &Config) -> AssetCache {
    AssetCache::new(
        config
            .picker
            .cache_dir
            .clone()
            .unwrap_or_else(AssetCache::default_dir),
    )
}

async fn build_picker(config: &Config, files: &[PathBuf]) -> MediaPicker {
    let cache = asset_cache(config);
    let probe = AssetProbe::new(config.tools.clone());

    let bridge: Box<dyn PickerBridge> = if files.is_empty() {
        let capture = config
            .picker
            .capture_device
            .clone()
            .map(|device| CaptureSettings {
                device,
                format: config.picker.capture_format.clone(),
                seconds: config.picker.capture_seconds,
            });
        let terminal = TerminalBridge::new(config.picker.library_dir(), capture, cache, probe);
        if !terminal.test_availability().await {
            warn!("Helper tools missing, some media cannot be described");
        }
        Box::new(terminal)
    } else {
        Box::new(FileListBridge::new(files.to_vec(), cache, probe))
    };

    MediaPicker::new(bridge, Arc::new(picker_permissions(config, files)))
}

// Files given up front mean scripted use, which never prompts
fn picker_permissions(config: &Config, files: &[PathBuf]) -> ConfigPermissions {
    ConfigPermissions::new(
        config.permissions.media_library,
        config.permissions.camera,
        config.picker.interactive_permissions && files.is_empty(),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match get_config_path(&cli) {
        Some(path) => {
            Config::from_file(&path).with_context(|| format!("Failed to load config from {}", path))?
        }
        None => Config::default(),
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    // stdout carries the result JSON
    if config.get_logging_format() == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("Starting media picker...");

    let output = match &cli.command {
        Command::Library(args) => {
            let picker = build_picker(&config, &args.files).await;
            serde_json::to_string_pretty(&picker.launch_image_library(args.options()).await?)?
        }
        Command::Camera(args) => {
            let picker = build_picker(&config, &args.files).await;
            serde_json::to_string_pretty(&picker.launch_camera(args.options()).await?)?
        }
        Command::Browse(args) => {
            let picker = build_picker(&config, &args.files).await;
            let options = OpenFileBrowserOptions {
                media_types: args.media_types,
                capture: args.capture,
                allows_multiple_selection: args.multiple,
            };
            serde_json::to_string_pretty(&picker.open_file_browser(options).await?)?
        }
        Command::Permissions { kind, request } => {
            let permissions = picker_permissions(&config, &[]);
            let response = if *request {
                permissions.request_permission((*kind).into()).await?
            } else {
                permissions.get_permission((*kind).into()).await?
            };
            serde_json::to_string_pretty(&response)?
        }
        Command::ClearCache => {
            let cache = asset_cache(&config);
            let removed = cache.clear().await?;
            info!("Removed {} staged files from {}", removed, cache.dir().display());
            serde_json::json!({ "removed": removed }).to_string()
        }
    };

    println!("{}", output);
    Ok(())
}
