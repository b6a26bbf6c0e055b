use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// Directory the picker copies selected files into, so returned URIs stay
/// valid even if the original is moved.
#[derive(Debug, Clone)]
pub struct AssetCache {
    dir: PathBuf,
}

impl AssetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("media-picker")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies `source` into the cache under a fresh name, keeping its extension.
    pub async fn stage(&self, source: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create cache dir {}", self.dir.display()))?;

        let mut name = uuid::Uuid::new_v4().to_string();
        if let Some(ext) = source.extension().and_then(|e| e.to_str()) {
            name = format!("{}.{}", name, ext.to_lowercase());
        }

        let target = self.dir.join(name);
        tokio::fs::copy(source, &target)
            .await
            .with_context(|| format!("Failed to stage {}", source.display()))?;

        debug!("Staged {} as {}", source.display(), target.display());
        Ok(target)
    }

    /// Stages every source in order. If one fails, the files already
    /// staged by this call are removed before the error is returned.
    pub async fn stage_all(&self, sources: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut staged = Vec::with_capacity(sources.len());
        for source in sources {
            match self.stage(source).await {
                Ok(path) => staged.push(path),
                Err(e) => {
                    self.discard(&staged).await;
                    return Err(e);
                }
            }
        }
        Ok(staged)
    }

    /// Best-effort removal of staged files that will not be handed out.
    pub async fn discard(&self, staged: &[PathBuf]) {
        for path in staged {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!("Discarded {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to discard {}: {}", path.display(), e),
            }
        }
    }

    /// Removes every staged file, returning how many were deleted.
    pub async fn clear(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e).context("Failed to read cache dir"),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

/// `file://` URL for a local path.
pub fn uri_for(path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    Url::from_file_path(&absolute)
        .map(|url| url.to_string())
        .map_err(|_| anyhow::anyhow!("Cannot build file URL for {}", absolute.display()))
}
