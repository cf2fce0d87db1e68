//! File sink

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use crate::core::{Level, LoggerError, Result};
use crate::writers::Writer;

/// Buffered append-only file sink. Missing parent directories are created
/// on open; the buffer is flushed on close and on drop.
pub struct FileWriter {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
}

impl FileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(FileWriter {
            writer: Some(BufWriter::new(file)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Writer for FileWriter {
    fn write(&mut self, _level: Level, data: &[u8], _header_len: usize) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("file writer is closed"))?;
        writer.write_all(data)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_close() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("app.log");

        let mut w = FileWriter::new(&path).expect("open");
        w.write(Level::Info, b"[I] one\n", 4).expect("write");
        w.write(Level::Info, b"[I] two\n", 4).expect("write");
        w.close().expect("close");

        let body = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(body, "[I] one\n[I] two\n");

        // Closed writer rejects further records.
        assert!(w.write(Level::Info, b"[I] three\n", 4).is_err());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/deep/app.log");
        let w = FileWriter::new(&path).expect("open with missing parents");
        assert_eq!(w.path(), path);
        assert!(path.parent().map(Path::exists).unwrap_or(false));
    }
}
