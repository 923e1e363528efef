use std::io::Write;
use std::path::Path;

use serde::{Serialize, Serializer};
use tempfile::NamedTempFile;

use crate::error::Result;

/// A raw image payload as selected by the user, before any processing.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, deriving the MIME type from its extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self { name, mime, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Owned handle to an on-disk preview of a selected image.
///
/// The backing file is deleted when the handle is dropped, so a slot can
/// never leak a preview after it is replaced or removed.
#[derive(Debug)]
pub struct PreviewHandle {
    file: NamedTempFile,
}

impl PreviewHandle {
    pub fn create(bytes: &[u8]) -> Result<Self> {
        let mut file = NamedTempFile::new()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// One logical image slot in the UI: the selected file plus its live preview.
///
/// Re-selecting replaces the slot wholesale; the previous preview is released
/// before the new one is created.
#[derive(Debug)]
pub struct ImageSlot {
    file: ImageFile,
    preview: Option<PreviewHandle>,
}

impl ImageSlot {
    pub fn new(file: ImageFile) -> Result<Self> {
        let preview = PreviewHandle::create(&file.bytes)?;
        Ok(Self {
            file,
            preview: Some(preview),
        })
    }

    pub fn replace(&mut self, file: ImageFile) -> Result<()> {
        // Drop the old preview before creating the next one.
        self.preview = None;
        self.preview = Some(PreviewHandle::create(&file.bytes)?);
        self.file = file;
        Ok(())
    }

    pub fn file(&self) -> &ImageFile {
        &self.file
    }

    pub fn preview_path(&self) -> Option<&Path> {
        self.preview.as_ref().map(|p| p.path())
    }
}

/// The reference handed to the generation service for one input image:
/// either a URL resolvable by the service or a self-contained data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Remote(String),
    DataUri(String),
}

impl ImageRef {
    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::Remote(url) => url,
            ImageRef::DataUri(uri) => uri,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ImageRef::Remote(_))
    }
}

// The wire format carries image references as plain strings.
impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_released_on_drop() {
        let handle = PreviewHandle::create(b"abc").unwrap();
        let path = handle.path().to_path_buf();
        assert!(path.exists());
        drop(handle);
        assert!(!path.exists());
    }

    #[test]
    fn replacing_a_slot_releases_the_old_preview() {
        let mut slot = ImageSlot::new(ImageFile::new("a.png", "image/png", vec![1, 2, 3])).unwrap();
        let old_path = slot.preview_path().unwrap().to_path_buf();

        slot.replace(ImageFile::new("b.png", "image/png", vec![4, 5, 6]))
            .unwrap();

        assert!(!old_path.exists());
        assert!(slot.preview_path().unwrap().exists());
        assert_eq!(slot.file().name, "b.png");
    }

    #[test]
    fn image_ref_serializes_as_plain_string() {
        let remote = ImageRef::Remote("https://example.com/a.jpg".to_string());
        assert_eq!(
            serde_json::to_string(&remote).unwrap(),
            "\"https://example.com/a.jpg\""
        );

        let inline = ImageRef::DataUri("data:image/jpeg;base64,AAAA".to_string());
        assert_eq!(
            serde_json::to_string(&inline).unwrap(),
            "\"data:image/jpeg;base64,AAAA\""
        );
    }

    #[test]
    fn mime_is_derived_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();

        let file = ImageFile::from_path(&path).unwrap();
        assert_eq!(file.mime, "image/jpeg");
        assert_eq!(file.name, "photo.jpg");
        assert_eq!(file.size(), 17);
    }
}
