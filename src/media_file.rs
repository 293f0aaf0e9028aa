use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::MediaError;
use crate::options::MediaKind;

/// A photo or video handed back by the picker
///
/// The file belongs to the caller from here on; dropping the handle does not
/// remove it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    path: PathBuf,
    album_path: Option<PathBuf>,
    kind: MediaKind,
}

impl MediaFile {
    pub fn new(path: PathBuf, album_path: Option<PathBuf>, kind: MediaKind) -> Self {
        Self {
            path,
            album_path,
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the public gallery copy ended up, if one was saved.
    pub fn album_path(&self) -> Option<&Path> {
        self.album_path.as_deref()
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Opens a fresh read stream on the file.
    pub fn open(&self) -> Result<File, MediaError> {
        File::open(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MediaError::NotFound(self.path.clone()),
            _ => MediaError::Io(e),
        })
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// Removes the working file. The album copy, if any, is left alone.
    pub fn delete(self) -> Result<(), MediaError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                log::debug!("Deleted {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_open_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"not really a video").unwrap();

        let file = MediaFile::new(path.clone(), None, MediaKind::Video);
        let mut content = String::new();
        file.open().unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "not really a video");

        file.clone().delete().unwrap();
        assert!(!path.exists());
        // deleting twice is fine
        file.clone().delete().unwrap();
        assert!(matches!(file.open(), Err(MediaError::NotFound(_))));
    }
}
