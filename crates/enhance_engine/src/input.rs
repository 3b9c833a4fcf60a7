use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input file not found: {0}")]
    NotFound(PathBuf),
    #[error("input is not a regular file: {0}")]
    NotAFile(PathBuf),
    #[error("sample {name} not found in {dir}")]
    UnknownSample { name: String, dir: PathBuf },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Audio ready to be sent as one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pub file_name: String,
    pub bytes: Bytes,
    pub mime: &'static str,
}

/// Name and size of a user-picked file.
pub fn describe_file(path: &Path) -> Result<(String, u64), InputError> {
    let meta = std::fs::metadata(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => InputError::NotFound(path.to_path_buf()),
        _ => InputError::Io(err),
    })?;
    if !meta.is_file() {
        return Err(InputError::NotAFile(path.to_path_buf()));
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    Ok((file_name, meta.len()))
}

/// Path of a bundled sample. Only plain file names are accepted.
pub fn resolve_sample(dir: &Path, name: &str) -> Result<PathBuf, InputError> {
    let unknown = || InputError::UnknownSample {
        name: name.to_string(),
        dir: dir.to_path_buf(),
    };
    if Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name) {
        return Err(unknown());
    }
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(unknown())
    }
}

pub async fn load_payload(path: &Path, file_name: &str) -> Result<UploadPayload, InputError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => InputError::NotFound(path.to_path_buf()),
        _ => InputError::Io(err),
    })?;
    Ok(UploadPayload {
        file_name: file_name.to_string(),
        bytes: Bytes::from(bytes),
        mime: audio_mime(file_name),
    })
}

pub fn audio_mime(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_follows_extension() {
        assert_eq!(audio_mime("a.WAV"), "audio/wav");
        assert_eq!(audio_mime("b.mp3"), "audio/mpeg");
        assert_eq!(audio_mime("noext"), "application/octet-stream");
    }

    #[test]
    fn sample_names_cannot_escape_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("sample.wav"), b"RIFF").unwrap();
        assert!(resolve_sample(temp.path(), "sample.wav").is_ok());
        assert!(matches!(
            resolve_sample(temp.path(), "../sample.wav"),
            Err(InputError::UnknownSample { .. })
        ));
        assert!(matches!(
            resolve_sample(temp.path(), "missing.wav"),
            Err(InputError::UnknownSample { .. })
        ));
    }

    #[test]
    fn describe_reports_name_and_size() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("clip.wav");
        std::fs::write(&path, vec![0u8; 1536]).unwrap();
        let (name, size) = describe_file(&path).unwrap();
        assert_eq!(name, "clip.wav");
        assert_eq!(size, 1536);
        assert!(matches!(
            describe_file(&temp.path().join("nope.wav")),
            Err(InputError::NotFound(_))
        ));
        assert!(matches!(describe_file(temp.path()), Err(InputError::NotAFile(_))));
    }
}
