//! Random-access reads of the bytes of a part.
use crate::error::{ErrorRepr, Result};
use crate::plan::Part;
use crate::request::PartBody;

use bytes::Bytes;
use std::fs::File;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A source of known size that parts can be read from in any order.
///
/// Reads of different parts may happen concurrently, so implementations must
/// not depend on a shared cursor.
pub trait ReadPart: Send + Sync + 'static {
    /// Total size of the source in bytes.
    fn size(&self) -> u64;

    /// Read exactly the bytes in the range of `part`.
    fn read_part(&self, part: &Part) -> impl Future<Output = Result<PartBody>> + Send;
}

/// A file on local disk.
///
/// The open file handle is shared by every reader, each of which reads its
/// part with a positional read on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    file: Arc<File>,
    size: u64,
}

impl SourceFile {
    /// Open the file at `path` for reading.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|source| ErrorRepr::Source {
                path: path.clone(),
                source,
            })?;
        let meta = file.metadata().await.map_err(|source| ErrorRepr::Source {
            path: path.clone(),
            source,
        })?;
        if !meta.is_file() {
            let source = std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file");
            return Err(ErrorRepr::Source { path, source })?;
        }

        Ok(Self {
            path,
            file: Arc::new(file.into_std().await),
            size: meta.len(),
        })
    }

    /// The path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadPart for SourceFile {
    fn size(&self) -> u64 {
        self.size
    }

    async fn read_part(&self, part: &Part) -> Result<PartBody> {
        check_bounds(part, self.size)?;
        let file = Arc::clone(&self.file);
        let (offset, len) = (part.offset, part.len as usize);

        let buf = tokio::task::spawn_blocking(move || {
            let mut buf = vec![0; len];
            read_exact_at(&file, &mut buf, offset).map(|_| buf)
        })
        .await
        .map_err(|_| ErrorRepr::TaskPanicked(part.part_number))??;

        Ok(PartBody::from(buf))
    }
}

impl ReadPart for Bytes {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    async fn read_part(&self, part: &Part) -> Result<PartBody> {
        check_bounds(part, self.size())?;
        let start = part.offset as usize;
        Ok(PartBody::new(self.slice(start..start + part.len as usize)))
    }
}

fn check_bounds(part: &Part, size: u64) -> Result<()> {
    if part.offset.checked_add(part.len).is_none_or(|end| end > size) {
        return Err(ErrorRepr::OutOfBounds {
            part: part.part_number,
            offset: part.offset,
            len: part.len,
            size,
        })?;
    }
    Ok(())
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt as _;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt as _;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(std::io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                let rest = buf;
                buf = &mut rest[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PartPlan;
    use std::io::Write as _;

    #[tokio::test]
    async fn reads_every_part_of_a_file() {
        let data: Vec<u8> = (0..10_000u32).map(|n| (n % 251) as u8).collect();
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&data).unwrap();

        let source = SourceFile::open(tmp.path()).await.unwrap();
        assert_eq!(source.size(), data.len() as u64);

        let plan = PartPlan::new(source.size(), 3000).unwrap();
        let mut read = Vec::new();
        for part in plan.iter().rev() {
            let body = source.read_part(part).await.unwrap();
            assert_eq!(body.size() as u64, part.len);
            read.push((part.offset, body));
        }
        read.sort_by_key(|(offset, _)| *offset);
        let joined: Vec<u8> = read.iter().flat_map(|(_, b)| b.to_vec()).collect();
        assert_eq!(joined, data);
    }

    #[tokio::test]
    async fn read_past_end_is_rejected() {
        let source = Bytes::from_static(b"0123456789");
        let part = Part {
            part_number: crate::request::PartNumber::new(2),
            offset: 8,
            len: 5,
        };
        let err = source.read_part(&part).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }

    #[tokio::test]
    async fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceFile::open(dir.path().join("nope")).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);

        let err = SourceFile::open(dir.path()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }
}
