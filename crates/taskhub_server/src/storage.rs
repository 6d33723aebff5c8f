//! Local filesystem storage for profile pictures.
//!
//! # Invariants
//! - References look like `profile_pictures/<uuid>.<ext>`.
//! - Only references of that shape are ever deleted; remote picture URLs
//!   from social login pass through untouched.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use log::{info, warn};
use taskhub_core::{CollaboratorError, ImageFormat, ImageStorage};
use uuid::Uuid;

const REFERENCE_PREFIX: &str = "profile_pictures/";

pub struct LocalImageStorage {
    root: PathBuf,
}

impl LocalImageStorage {
    /// Creates `root` if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CollaboratorError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| {
            CollaboratorError::Unavailable(format!("create {}: {err}", root.display()))
        })?;
        Ok(Self { root })
    }

    fn file_for(&self, reference: &str) -> Option<PathBuf> {
        let name = reference.strip_prefix(REFERENCE_PREFIX)?;
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
            && !name.starts_with('.');
        valid.then(|| self.root.join(name))
    }
}

impl ImageStorage for LocalImageStorage {
    fn store(&self, bytes: &[u8], format: ImageFormat) -> Result<String, CollaboratorError> {
        let name = format!("{}.{}", Uuid::new_v4(), format.extension());
        let path = self.root.join(&name);
        fs::write(&path, bytes).map_err(|err| {
            warn!(
                "event=image_store module=storage status=error path={} error={err}",
                path.display()
            );
            CollaboratorError::Unavailable(format!("write {name}: {err}"))
        })?;
        info!(
            "event=image_store module=storage status=ok bytes={}",
            bytes.len()
        );
        Ok(format!("{REFERENCE_PREFIX}{name}"))
    }

    fn delete(&self, reference: &str) -> Result<(), CollaboratorError> {
        let Some(path) = self.file_for(reference) else {
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CollaboratorError::Unavailable(format!(
                "remove {}: {err}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LocalImageStorage;
    use taskhub_core::{ImageFormat, ImageStorage};

    #[test]
    fn store_then_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalImageStorage::new(dir.path().join("pics")).unwrap();

        let reference = storage.store(b"\x89PNG\r\n\x1a\nrest", ImageFormat::Png).unwrap();
        assert!(reference.starts_with("profile_pictures/"));
        assert!(reference.ends_with(".png"));
        let file = storage.file_for(&reference).unwrap();
        assert!(file.exists());

        storage.delete(&reference).unwrap();
        assert!(!file.exists());
        storage.delete(&reference).unwrap();
    }

    #[test]
    fn foreign_references_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"keep").unwrap();
        let storage = LocalImageStorage::new(dir.path().join("pics")).unwrap();

        storage.delete("https://example.com/a.png").unwrap();
        storage.delete("profile_pictures/../keep.txt").unwrap();
        storage.delete("profile_pictures/").unwrap();
        assert!(outside.exists());
    }
}
