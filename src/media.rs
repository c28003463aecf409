use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog;

/// Longest thumbnail side, in pixels.
pub const MAX_THUMB_EDGE: u32 = 512;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("item not found")]
    ItemNotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

/// Filesystem store for item images under `<root>/items/`, with thumbnails
/// under `<root>/items/_thumbs/`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

fn ext_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> MediaStore {
        MediaStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn abs(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// `items/_thumbs/{stem}_thumb{ext}` for a stored `items/{stem}{ext}`.
    pub fn thumb_rel(rel: &str) -> Option<String> {
        let path = Path::new(rel);
        let stem = path.file_stem()?.to_str()?;
        let ext = path.extension()?.to_str()?;
        Some(format!("items/_thumbs/{stem}_thumb.{ext}"))
    }

    /// Store an uploaded image for an item and record its path. Rejects
    /// unsupported content types before writing anything; replaces (and
    /// best-effort deletes) any previous image.
    pub fn attach_image(
        &self,
        conn: &Connection,
        item_id: i64,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let Some(ext) = ext_for_content_type(content_type) else {
            return Err(MediaError::UnsupportedType(content_type.to_string()));
        };
        let previous = match catalog::get_item(conn, item_id)? {
            Some(item) => item.image_path,
            None => return Err(MediaError::ItemNotFound),
        };

        // Random token keeps concurrent uploads from colliding on a name.
        let token = Uuid::new_v4().simple().to_string();
        let token = &token[..8];
        let rel = format!("items/{item_id}_{token}.{ext}");
        let abs = self.abs(&rel);
        std::fs::create_dir_all(abs.parent().expect("items dir has a parent"))?;
        std::fs::write(&abs, bytes)?;

        // Thumbnail generation is best-effort; the upload stands either way.
        if let Err(e) = self.write_thumbnail(&rel) {
            tracing::warn!(item_id, error = %e, "thumbnail generation failed");
        }

        if let Some(old) = previous {
            self.remove_files(&old);
        }

        conn.execute(
            "UPDATE items SET image_path = ? WHERE id = ?",
            rusqlite::params![rel, item_id],
        )?;
        Ok(rel)
    }

    fn write_thumbnail(&self, rel: &str) -> anyhow::Result<()> {
        let source = self.abs(rel);
        let thumb_rel = MediaStore::thumb_rel(rel)
            .ok_or_else(|| anyhow::anyhow!("unthumbnailable path: {rel}"))?;
        let target = self.abs(&thumb_rel);

        let img = image::ImageReader::open(&source)?
            .with_guessed_format()?
            .decode()?;
        // Shrink only; images already within bounds are stored as-is.
        let thumb = if img.width() > MAX_THUMB_EDGE || img.height() > MAX_THUMB_EDGE {
            img.thumbnail(MAX_THUMB_EDGE, MAX_THUMB_EDGE)
        } else {
            img
        };
        std::fs::create_dir_all(target.parent().expect("thumbs dir has a parent"))?;
        thumb.save(&target)?;
        Ok(())
    }

    /// Clear an item's image reference and delete its files best-effort.
    pub fn remove_image(&self, conn: &Connection, item_id: i64) -> Result<(), MediaError> {
        let previous = match catalog::get_item(conn, item_id)? {
            Some(item) => item.image_path,
            None => return Err(MediaError::ItemNotFound),
        };
        conn.execute(
            "UPDATE items SET image_path = NULL WHERE id = ?",
            [item_id],
        )?;
        if let Some(old) = previous {
            self.remove_files(&old);
        }
        Ok(())
    }

    /// Delete a stored image and its thumbnail. A missing file is the
    /// expected case (nothing was ever written, or a prior cleanup ran);
    /// other failures are logged and swallowed.
    pub fn remove_files(&self, rel: &str) {
        let mut paths = vec![self.abs(rel)];
        if let Some(thumb) = MediaStore::thumb_rel(rel) {
            paths.push(self.abs(&thumb));
        }
        for path in paths {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "stale media cleanup failed");
                }
            }
        }
    }
}
