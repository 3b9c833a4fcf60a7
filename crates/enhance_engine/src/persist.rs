use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Writable only if a temp file can be created here.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Reduces a server-chosen name to a single safe path component.
pub fn safe_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = last
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&[' ', '.'][..]);
    if cleaned.is_empty() {
        "enhanced.wav".to_string()
    } else {
        cleaned.to_string()
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}')
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(safe_file_name(filename));
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // Replace existing file if present to keep determinism.
        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Audio files the client wrote itself and therefore has to clean up.
#[derive(Debug)]
pub struct MediaStore {
    dir: PathBuf,
    owned: Mutex<HashSet<PathBuf>>,
}

impl MediaStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            owned: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self, job_id: u64, audio: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;
        let mut file = tempfile::Builder::new()
            .prefix(&format!("enhanced-{job_id}-"))
            .suffix(".wav")
            .tempfile_in(&self.dir)?;
        file.write_all(audio)?;
        file.flush()?;
        let (_, path) = file.keep().map_err(|e| PersistError::Io(e.error))?;
        self.owned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.clone());
        Ok(path)
    }

    /// Deletes `path` if this store created it. Returns whether it did.
    pub fn release(&self, path: &Path) -> Result<bool, PersistError> {
        let known = self
            .owned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
        if !known {
            return Ok(false);
        }
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(err) => Err(err.into()),
        }
    }

    pub fn owned_count(&self) -> usize {
        self.owned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for MediaStore {
    fn drop(&mut self) {
        let owned = self.owned.get_mut().unwrap_or_else(PoisonError::into_inner);
        for path in owned.drain() {
            let _ = fs::remove_file(path);
        }
    }
}
