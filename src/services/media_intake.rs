// Media Intake
// Turns a picker selection into a MediaAsset; keeps track of which asset is
// active so a new selection can tell the workflow to reset

use crate::models::{AssetId, MediaAsset, MediaKind, MediaPayload};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use super::detection::split_data_url;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Selected file is empty")]
    Empty,
    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),
    #[error("Malformed data URL")]
    MalformedDataUrl,
}

/// Result of one selection. `reset` names the asset the new one replaced.
#[derive(Debug)]
pub struct Selection {
    pub asset: MediaAsset,
    pub reset: Option<AssetId>,
}

#[derive(Debug, Default)]
pub struct MediaIntake {
    active: Option<(AssetId, MediaKind)>,
}

impl MediaIntake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<AssetId> {
        self.active.map(|(id, _)| id)
    }

    pub async fn select_image(&mut self, path: &Path) -> Result<Selection, IntakeError> {
        self.select_file(MediaKind::Image, path).await
    }

    pub async fn select_video(&mut self, path: &Path) -> Result<Selection, IntakeError> {
        self.select_file(MediaKind::Video, path).await
    }

    /// Pick the kind from the file extension.
    pub async fn select_path(&mut self, path: &Path) -> Result<Selection, IntakeError> {
        let mime = mime_from_path(path)
            .ok_or_else(|| IntakeError::UnsupportedMedia(path.display().to_string()))?;
        let kind = kind_from_mime(mime).ok_or_else(|| IntakeError::UnsupportedMedia(mime.to_string()))?;
        self.select_file(kind, path).await
    }

    async fn select_file(&mut self, kind: MediaKind, path: &Path) -> Result<Selection, IntakeError> {
        // no size cap here; oversized payloads fail at the transport
        let bytes = tokio::fs::read(path).await.map_err(|source| IntakeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(IntakeError::Empty);
        }

        let mime = mime_from_path(path)
            .filter(|m| kind_from_mime(m) == Some(kind))
            .unwrap_or(match kind {
                MediaKind::Image => "image/*",
                MediaKind::Video => "video/*",
            });

        let mut asset = MediaAsset::new(kind, mime, MediaPayload::Binary(bytes));
        if let Some(name) = path.file_name() {
            asset = asset.with_file_name(name.to_string_lossy());
        }
        Ok(self.adopt(asset))
    }

    /// Accept a `data:` URL as produced by a browser file reader.
    pub fn select_data_url(&mut self, data_url: String) -> Result<Selection, IntakeError> {
        let (mime, _, body) = split_data_url(&data_url).ok_or(IntakeError::MalformedDataUrl)?;
        if body.trim().is_empty() {
            return Err(IntakeError::Empty);
        }
        let kind = kind_from_mime(mime).ok_or_else(|| IntakeError::UnsupportedMedia(mime.to_string()))?;
        let mime = mime.to_string();
        let asset = MediaAsset::new(kind, mime, MediaPayload::DataUrl(data_url));
        Ok(self.adopt(asset))
    }

    /// Make `asset` the active one. The later selection wins, whatever its kind.
    pub fn adopt(&mut self, asset: MediaAsset) -> Selection {
        let reset = self.active.replace((asset.id, asset.kind)).map(|(id, _)| id);
        info!(
            asset_id = %asset.id,
            kind = asset.kind.as_str(),
            replaced = ?reset,
            "intake.selected"
        );
        Selection { asset, reset }
    }

    /// Forget the active asset (removed or published).
    pub fn clear(&mut self) {
        self.active = None;
    }
}

pub fn kind_from_mime(mime: &str) -> Option<MediaKind> {
    let lower = mime.to_ascii_lowercase();
    if lower.starts_with("image/") {
        Some(MediaKind::Image)
    } else if lower.starts_with("video/") {
        Some(MediaKind::Video)
    } else {
        None
    }
}

pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_select_image_then_video_resets() {
        let dir = TempDir::new().unwrap();
        let img = dir.path().join("cat.png");
        let vid = dir.path().join("clip.mp4");
        std::fs::write(&img, [0x89, b'P', b'N', b'G']).unwrap();
        std::fs::write(&vid, [0u8, 0, 0, 0x20]).unwrap();

        let mut intake = MediaIntake::new();
        let first = intake.select_image(&img).await.unwrap();
        assert!(first.reset.is_none());
        assert_eq!(first.asset.kind, MediaKind::Image);
        assert_eq!(first.asset.mime, "image/png");
        assert_eq!(first.asset.file_name.as_deref(), Some("cat.png"));

        let second = intake.select_video(&vid).await.unwrap();
        assert_eq!(second.reset, Some(first.asset.id));
        assert_eq!(intake.active(), Some(second.asset.id));
    }

    #[tokio::test]
    async fn test_empty_and_unknown_files() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("blank.jpg");
        let doc = dir.path().join("notes.txt");
        std::fs::write(&empty, b"").unwrap();
        std::fs::write(&doc, b"hello").unwrap();

        let mut intake = MediaIntake::new();
        assert!(matches!(intake.select_path(&empty).await, Err(IntakeError::Empty)));
        assert!(matches!(
            intake.select_path(&doc).await,
            Err(IntakeError::UnsupportedMedia(_))
        ));
        assert!(intake.active().is_none());
    }

    #[test]
    fn test_select_data_url() {
        let mut intake = MediaIntake::new();
        let sel = intake
            .select_data_url("data:video/webm;base64,GkXfow==".to_string())
            .unwrap();
        assert_eq!(sel.asset.kind, MediaKind::Video);
        assert_eq!(sel.asset.mime, "video/webm");
        assert!(matches!(
            intake.select_data_url("not a data url".to_string()),
            Err(IntakeError::MalformedDataUrl)
        ));
    }
}
