// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for delivered photos and clips

use crate::constants::{mime, storage};
use crate::errors::AppResult;
use crate::session::CapturedMedia;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Default photo directory: `<pictures>/<folder>`
pub fn photo_directory(folder: &str) -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(folder)
}

/// Default video directory: `<videos>/<folder>`
pub fn video_directory(folder: &str) -> PathBuf {
    dirs::video_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(folder)
}

/// Directory a piece of media goes to by default
pub fn default_directory(media: &CapturedMedia, folder: &str) -> PathBuf {
    if media.is_clip() {
        video_directory(folder)
    } else {
        photo_directory(folder)
    }
}

/// `IMG_20240101_120000.jpg` / `VID_20240101_120000.mjpeg`
pub fn file_name(media: &CapturedMedia) -> String {
    let prefix = if media.is_clip() {
        storage::VIDEO_PREFIX
    } else {
        storage::PHOTO_PREFIX
    };
    format!(
        "{}_{}.{}",
        prefix,
        media.captured_at.format("%Y%m%d_%H%M%S"),
        mime::extension(media.mime())
    )
}

/// Write media into a directory under its timestamped name
///
/// An existing file with the same name gets a numeric suffix instead of
/// being overwritten. The file is created exclusively, so concurrent saves
/// never clobber each other either.
pub async fn save_to_dir(media: &CapturedMedia, dir: &Path) -> AppResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let name = file_name(media);
    let (stem, ext) = name.rsplit_once('.').unwrap_or((name.as_str(), ""));
    let bytes = media.bytes();

    let mut path = dir.join(&name);
    let mut n = 1;
    let mut file = loop {
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => break file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "File exists, trying next name");
                path = dir.join(format!("{}_{}.{}", stem, n, ext));
                n += 1;
            }
            Err(e) => return Err(e.into()),
        }
    };

    debug!(path = %path.display(), size = bytes.len(), "Writing media");
    file.write_all(&bytes).await?;
    file.flush().await?;

    info!(id = %media.id, path = %path.display(), mime = media.mime(), "Media saved");
    Ok(path)
}

/// Write media to an exact path
pub async fn save_to_path(media: &CapturedMedia, path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = media.bytes();
    debug!(path = %path.display(), size = bytes.len(), "Writing media");
    tokio::fs::write(path, &bytes).await?;

    info!(id = %media.id, path = %path.display(), mime = media.mime(), "Media saved");
    Ok(())
}
