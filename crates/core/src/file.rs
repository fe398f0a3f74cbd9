//! File handle storage (§3 "file", §4.7 file methods).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub struct FileData {
    pub path: String,
    pub mode: String,
    handle: Option<File>,
}

pub type HFile = Arc<Mutex<FileData>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError(pub String);

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FileData {
    pub fn open(path: String, mode: String) -> Result<Arc<Mutex<FileData>>, FileError> {
        let mut opts = std::fs::OpenOptions::new();
        match mode.as_str() {
            "r" => {
                opts.read(true);
            }
            "w" => {
                opts.write(true).create(true).truncate(true);
            }
            "a" => {
                opts.append(true).create(true);
            }
            "r+" => {
                opts.read(true).write(true);
            }
            other => return Err(FileError(format!("unknown file mode '{other}'"))),
        }
        let handle = opts.open(&path).map_err(|e| FileError(e.to_string()))?;
        Ok(Arc::new(Mutex::new(FileData {
            path,
            mode,
            handle: Some(handle),
        })))
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    fn handle_mut(&mut self) -> Result<&mut File, FileError> {
        self.handle
            .as_mut()
            .ok_or_else(|| FileError("operation on a closed file".to_string()))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, FileError> {
        let handle = self.handle_mut()?;
        let mut buf = vec![0u8; n];
        let read = handle.read(&mut buf).map_err(|e| FileError(e.to_string()))?;
        buf.truncate(read);
        Ok(buf)
    }

    pub fn read_text(&mut self, n: usize) -> Result<String, FileError> {
        let bytes = self.read_bytes(n)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn write(&mut self, data: &[u8]) -> Result<usize, FileError> {
        let handle = self.handle_mut()?;
        handle.write(data).map_err(|e| FileError(e.to_string()))
    }

    pub fn seek(&mut self, offset: i64) -> Result<u64, FileError> {
        let handle = self.handle_mut()?;
        handle
            .seek(SeekFrom::Start(offset.max(0) as u64))
            .map_err(|e| FileError(e.to_string()))
    }

    pub fn tell(&mut self) -> Result<u64, FileError> {
        let handle = self.handle_mut()?;
        handle
            .stream_position()
            .map_err(|e| FileError(e.to_string()))
    }

    pub fn close(&mut self) {
        self.handle = None;
    }
}
