//! Input resolution: turn a user-supplied path or URL into a submission.
//!
//! A submission is either a local video file (uploaded as multipart) or a
//! remote source URL the service downloads itself. Validation happens here,
//! before any network call: a file must declare a `video/*` media type and a
//! URL must be non-empty after trimming.

use crate::error::Vid2DocError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A local video ready for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoFile {
    /// Filename sent in the multipart part.
    pub file_name: String,
    /// Declared media type, e.g. `video/mp4`.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for VideoFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFile")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

impl VideoFile {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_video(&self) -> bool {
        self.media_type.starts_with("video/")
    }
}

/// What the submitter sends to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionInput {
    File(VideoFile),
    Url(String),
}

impl SubmissionInput {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    /// Reject inputs the service would refuse anyway.
    pub fn validate(&self) -> Result<(), Vid2DocError> {
        match self {
            Self::File(video) if !video.is_video() => Err(Vid2DocError::validation(format!(
                "Please upload a video file ('{}' has media type '{}')",
                video.file_name, video.media_type
            ))),
            Self::Url(url) if url.trim().is_empty() => {
                Err(Vid2DocError::validation("Please enter a YouTube URL"))
            }
            _ => Ok(()),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    let input = input.trim_start();
    input.starts_with("http://") || input.starts_with("https://")
}

/// Media type for a video file extension, `application/octet-stream` if
/// the extension is not a supported container.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Resolve the input string to a submission.
///
/// URLs are passed through untouched (the submitter trims them). Anything
/// else is read as a local file whose media type comes from its extension.
pub async fn resolve_input(input: &str) -> Result<SubmissionInput, Vid2DocError> {
    if is_url(input) {
        Ok(SubmissionInput::Url(input.to_string()))
    } else {
        resolve_local(Path::new(input)).await.map(SubmissionInput::File)
    }
}

/// Read a local video file.
///
/// Existence, kind and extension are checked first, so a wrong path or a
/// non-video file is refused without reading its contents.
async fn resolve_local(path: &Path) -> Result<VideoFile, Vid2DocError> {
    let path_buf = PathBuf::from(path);
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| io_error(e, &path_buf))?;
    if metadata.is_dir() {
        return Err(Vid2DocError::validation(format!(
            "'{}' is a directory, not a video file",
            path.display()
        )));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let media_type = media_type_for(path);
    if !media_type.starts_with("video/") {
        return Err(Vid2DocError::validation(format!(
            "Please upload a video file ('{file_name}' is not MP4, MOV, AVI, MKV or WebM)"
        )));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_error(e, &path_buf))?;

    debug!(
        "Resolved local video: {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        media_type
    );
    Ok(VideoFile::new(file_name, media_type, bytes))
}

fn io_error(e: std::io::Error, path: &Path) -> Vid2DocError {
    match e.kind() {
        std::io::ErrorKind::NotFound => Vid2DocError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Vid2DocError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Vid2DocError::validation(format!("Cannot read '{}': {}", path.display(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_url("http://example.com/video.mp4"));
        assert!(!is_url("/tmp/video.mp4"));
        assert!(!is_url("video.mp4"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for(Path::new("a.MP4")), "video/mp4");
        assert_eq!(media_type_for(Path::new("a.mov")), "video/quicktime");
        assert_eq!(media_type_for(Path::new("a.webm")), "video/webm");
        assert_eq!(media_type_for(Path::new("a.pdf")), "application/octet-stream");
        assert_eq!(media_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn validate_rejects_non_video() {
        let input = SubmissionInput::File(VideoFile::new("doc.pdf", "application/pdf", vec![1]));
        assert!(input.validate().unwrap_err().is_validation());
    }

    #[test]
    fn validate_rejects_blank_url() {
        for url in ["", "   ", "\t\n"] {
            let err = SubmissionInput::url(url).validate().unwrap_err();
            assert!(err.is_validation(), "url={url:?}");
        }
    }

    #[test]
    fn validate_accepts_video_and_url() {
        let file = SubmissionInput::File(VideoFile::new("a.mp4", "video/mp4", vec![0; 4]));
        assert!(file.validate().is_ok());
        assert!(SubmissionInput::url(" https://youtu.be/x ").validate().is_ok());
    }

    #[tokio::test]
    async fn resolve_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mkv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"\x1a\x45\xdf\xa3").unwrap();

        let input = resolve_input(path.to_str().unwrap()).await.unwrap();
        match input {
            SubmissionInput::File(v) => {
                assert_eq!(v.file_name, "clip.mkv");
                assert_eq!(v.media_type, "video/x-matroska");
                assert_eq!(v.bytes.len(), 4);
            }
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn resolve_missing_file() {
        let err = resolve_input("/definitely/not/here.mp4").await.unwrap_err();
        assert!(matches!(err, Vid2DocError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn resolve_url_passthrough() {
        let input = resolve_input("https://youtu.be/abc").await.unwrap();
        assert_eq!(input, SubmissionInput::url("https://youtu.be/abc"));
    }

    #[tokio::test]
    async fn resolve_directory_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_input(dir.path().to_str().unwrap()).await.unwrap_err();
        assert!(err.is_validation(), "got {err:?}");
        assert!(err.to_string().contains("is a directory"));
    }

    #[tokio::test]
    async fn resolve_non_video_extension_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slides.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let err = resolve_input(path.to_str().unwrap()).await.unwrap_err();
        assert!(err.is_validation(), "got {err:?}");
        assert!(err.to_string().contains("slides.pdf"));
    }
}
