//! Local attachments: classification and the `file://` reference used as
//! display source. Nothing is uploaded.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Payload;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a regular file", .0.display())]
    NotAFile(PathBuf),

    #[error("Cannot build a file reference for {}", .0.display())]
    NoReference(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: Option<String>,
    pub mime: String,
    pub size: u64,
    pub url: String,
}

impl Attachment {
    pub fn from_path(path: &Path) -> Result<Self, AttachmentError> {
        let unreadable = |source: std::io::Error| AttachmentError::Unreadable {
            path: path.to_path_buf(),
            source,
        };
        let canonical = path.canonicalize().map_err(unreadable)?;
        let meta = std::fs::metadata(&canonical).map_err(unreadable)?;
        if !meta.is_file() {
            return Err(AttachmentError::NotAFile(path.to_path_buf()));
        }

        let url = url::Url::from_file_path(&canonical)
            .map_err(|_| AttachmentError::NoReference(path.to_path_buf()))?;
        let mime = mime_guess::from_path(&canonical)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty());

        Ok(Attachment {
            name,
            mime,
            size: meta.len(),
            url: url.to_string(),
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(crate::view::DEFAULT_FILE_NAME)
    }

    pub fn to_payload(&self) -> Payload {
        if self.is_image() {
            Payload::Image {
                url: self.url.clone(),
                name: self.name.clone(),
            }
        } else {
            Payload::File {
                url: self.url.clone(),
                name: self.name.clone(),
                size: Some(self.size),
            }
        }
    }
}

/// Split the attach dialog input (`a.png; b.pdf`) into paths
pub fn parse_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_image_is_classified_by_mime_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foto.png");
        std::fs::write(&path, [0u8; 16]).unwrap();

        let att = Attachment::from_path(&path).unwrap();
        assert!(att.is_image());
        assert_eq!(att.mime, "image/png");
        assert!(att.url.starts_with("file://"));
        assert!(matches!(att.to_payload(), Payload::Image { name: Some(ref n), .. } if n == "foto.png"));
    }

    #[test]
    fn test_generic_file_carries_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notas.pdf");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&vec![1u8; 2048]).unwrap();

        let att = Attachment::from_path(&path).unwrap();
        assert!(!att.is_image());
        assert_eq!(att.to_payload(), Payload::File {
            url: att.url.clone(),
            name: Some("notas.pdf".into()),
            size: Some(2048),
        });
    }

    #[test]
    fn test_missing_and_directory_paths_fail() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Attachment::from_path(&dir.path().join("nope.txt")),
            Err(AttachmentError::Unreadable { .. })
        ));
        assert!(matches!(Attachment::from_path(dir.path()), Err(AttachmentError::NotAFile(_))));
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!(
            parse_paths(" a.png ; ;b.pdf;"),
            vec![PathBuf::from("a.png"), PathBuf::from("b.pdf")]
        );
        assert!(parse_paths("  ").is_empty());
    }
}
