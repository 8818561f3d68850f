use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::{
    EMOTION_MODEL_NAME, EMOTION_MODEL_URL, FACE_MODEL_NAME, FACE_MODEL_URL,
};

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model identifier is empty")]
    EmptyName,
    #[error("'{name}' is not an existing file or a known model name")]
    UnknownModel { name: String },
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a model identifier to a file on disk.
///
/// Resolution order:
/// 1. The identifier itself, taken as a filesystem path
/// 2. User cache directory (platform-specific), for known model names
/// 3. Bundled path (for development / pre-packaged installs)
/// 4. Download from the known model's URL to cache
///
/// Identifiers that are neither an existing file nor a known model name
/// fail with [`ModelResolveError::UnknownModel`].
pub fn resolve(
    identifier: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if identifier.is_empty() {
        return Err(ModelResolveError::EmptyName);
    }

    let direct = Path::new(identifier);
    if direct.is_file() {
        return Ok(direct.to_path_buf());
    }

    let Some(url) = known_model_url(identifier) else {
        return Err(ModelResolveError::UnknownModel {
            name: identifier.to_string(),
        });
    };

    let cache_dir = model_cache_dir()?;
    let cached_path = cache_dir.join(identifier);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(dir) = bundled_dir {
        let bundled_path = dir.join(identifier);
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Download URL for the model names this crate knows how to fetch.
fn known_model_url(name: &str) -> Option<&'static str> {
    match name {
        n if n == FACE_MODEL_NAME => Some(FACE_MODEL_URL),
        n if n == EMOTION_MODEL_NAME => Some(EMOTION_MODEL_URL),
        _ => None,
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Emovision/models/`
/// - Linux: `$XDG_CACHE_HOME/Emovision/models/` or `~/.cache/Emovision/models/`
/// - Windows: `%LOCALAPPDATA%/Emovision/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Emovision").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Emovision").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    // Clean up .part file on any error
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let mut file = fs::File::create(temp_path).map_err(|e| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source: e,
    })?;

    // Stream in chunks instead of buffering the whole body in memory.
    let mut reader = response;
    let mut buf = vec![0u8; 1024 * 1024]; // 1MB buffer
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| ModelResolveError::Write {
                path: temp_path.to_path_buf(),
                source: e,
            })?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])
            .map_err(|e| ModelResolveError::Write {
                path: temp_path.to_path_buf(),
                source: e,
            })?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(|e| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source: e,
    })?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
