use crate::error::SourceError;
use crate::source::LogSource;
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

#[derive(Debug, Clone)]
pub struct TailOptions {
    /// Sleep between reads while the file is idle.
    pub poll_interval: Duration,
    /// Sleep between existence checks while the file has not been created.
    pub wait_interval: Duration,
    /// Read the existing content instead of starting at the end.
    pub from_start: bool,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            wait_interval: Duration::from_secs(2),
            from_start: false,
        }
    }
}

/// Identity of an opened file, used to notice rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileId {
    dev: u64,
    ino: u64,
}

#[cfg(unix)]
fn file_id(meta: &std::fs::Metadata) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    Some(FileId {
        dev: meta.dev(),
        ino: meta.ino(),
    })
}

#[cfg(not(unix))]
fn file_id(_meta: &std::fs::Metadata) -> Option<FileId> {
    None
}

struct OpenFile {
    reader: BufReader<File>,
    pos: u64,
    id: Option<FileId>,
}

/// Follows a log file like `tail -F -n 0`.
///
/// Waits for the file to be created, starts at its end, and reopens it from
/// the beginning when it is truncated or replaced by log rotation.
pub struct FileTail {
    path: PathBuf,
    options: TailOptions,
    current: Option<OpenFile>,
    pending: Vec<u8>,
}

impl FileTail {
    /// Waits until `path` exists, then opens it.
    ///
    /// When the file already exists it is read from its current end (unless
    /// [`TailOptions::from_start`] is set); a file that had to be waited for
    /// is read from the beginning.
    pub async fn follow(path: impl AsRef<Path>, options: TailOptions) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let waited = wait_for_file(&path, options.wait_interval).await;
        tracing::info!(path = %path.display(), "Log file found, monitoring");

        let at_end = !options.from_start && !waited;
        let current = open_file(&path, at_end).await?;
        Ok(Self {
            path,
            options,
            current: Some(current),
            pending: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true when the followed file was replaced or truncated and the
    /// current handle was dropped.
    async fn detect_rotation(&mut self) -> Result<bool, SourceError> {
        let Some(current) = self.current.as_ref() else {
            return Ok(true);
        };

        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta,
            // Rotated away; keep the old handle until the new file appears.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(SourceError::io(&self.path, e)),
        };

        let id = file_id(&meta);
        if current.id.is_some() && id != current.id {
            tracing::info!(path = %self.path.display(), "Log file rotated, reopening");
        } else if meta.len() < current.pos {
            tracing::info!(
                path = %self.path.display(),
                size = meta.len(),
                position = current.pos,
                "Log file truncated, reopening"
            );
        } else {
            return Ok(false);
        }

        self.current = None;
        self.pending.clear();
        Ok(true)
    }
}

#[async_trait]
impl LogSource for FileTail {
    async fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        loop {
            if self.current.is_none() {
                self.current = Some(open_file(&self.path, false).await?);
            }
            let Some(current) = self.current.as_mut() else {
                continue;
            };

            // Bytes, not `read_line`: invalid UTF-8 must still advance `pos`.
            let read = current
                .reader
                .read_until(b'\n', &mut self.pending)
                .await
                .map_err(|e| SourceError::io(&self.path, e))?;
            current.pos += read as u64;

            if self.pending.last() == Some(&b'\n') {
                let raw = std::mem::take(&mut self.pending);
                let line = String::from_utf8_lossy(&raw);
                return Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()));
            }

            // At EOF, possibly holding a partial line until its newline lands.
            if !self.detect_rotation().await? {
                tokio::time::sleep(self.options.poll_interval).await;
            }
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

async fn wait_for_file(path: &Path, interval: Duration) -> bool {
    let mut waited = false;
    while !tokio::fs::try_exists(path).await.unwrap_or(false) {
        if waited {
            tracing::debug!(path = %path.display(), "Still waiting for log file");
        } else {
            tracing::info!(path = %path.display(), "Waiting for log file");
        }
        waited = true;
        tokio::time::sleep(interval).await;
    }
    waited
}

async fn open_file(path: &Path, at_end: bool) -> Result<OpenFile, SourceError> {
    let mut file = File::open(path)
        .await
        .map_err(|e| SourceError::io(path, e))?;
    let meta = file.metadata().await.map_err(|e| SourceError::io(path, e))?;
    let pos = if at_end {
        file.seek(SeekFrom::End(0))
            .await
            .map_err(|e| SourceError::io(path, e))?
    } else {
        0
    };
    Ok(OpenFile {
        reader: BufReader::new(file),
        pos,
        id: file_id(&meta),
    })
}
