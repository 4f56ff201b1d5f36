//! Atomic writer: staged temp file plus one-step install.
//!
//! Object and part bytes are never written in place. A [`TmpFile`] stages
//! them into a hidden, randomly named file inside the bucket's staging
//! directory (same filesystem as the destination, so installing never
//! copies across devices), and [`TmpFile::link`] installs the finished
//! file at its final path with `rename(2)`, atomically replacing any
//! previous file. Readers therefore observe either the old object or the
//! new one, never a partial write.
//!
//! Dropping an unlinked `TmpFile` removes the staged file, so no failure
//! path can leak temp garbage.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use tracing::warn;
use uuid::Uuid;

use crate::error::is_not_found;

/// Mode for staged object and part files.
const FILE_MODE: u32 = 0o644;

/// A staged write: bytes accumulate in a hidden temp file until
/// [`TmpFile::link`] installs them at the final path.
#[derive(Debug)]
pub struct TmpFile {
    file: File,
    tmp_path: PathBuf,
    final_path: PathBuf,
    size_hint: u64,
    written: u64,
    installed: bool,
}

impl TmpFile {
    /// Stage a new temp file in `tmp_dir`, destined for `final_path`.
    ///
    /// The staging directory is created if missing. A non-zero `size_hint`
    /// preallocates the file; [`TmpFile::link`] trims back to the actual
    /// byte count if the hint was high.
    ///
    /// # Errors
    ///
    /// Propagates staging-directory creation and file-creation errors.
    pub fn open(tmp_dir: &Path, final_path: &Path, size_hint: u64) -> io::Result<Self> {
        fs::create_dir_all(tmp_dir)?;

        let tmp_path = tmp_dir.join(format!(".tmp.{}", Uuid::new_v4().simple()));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(FILE_MODE)
            .open(&tmp_path)?;

        if size_hint > 0 {
            file.set_len(size_hint)?;
        }

        Ok(Self {
            file,
            tmp_path,
            final_path: final_path.to_owned(),
            size_hint,
            written: 0,
            installed: false,
        })
    }

    /// Bytes written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Install the staged file at its final path.
    ///
    /// Atomically replaces an existing file at the destination. Fails if
    /// the destination is a directory; callers translate that into the
    /// directory-conflict error for their operation.
    ///
    /// # Errors
    ///
    /// Propagates the rename error; the staged file is still cleaned up by
    /// drop in that case.
    pub fn link(mut self) -> io::Result<()> {
        if self.written != self.size_hint {
            self.file.set_len(self.written)?;
        }
        self.file.flush()?;

        fs::rename(&self.tmp_path, &self.final_path)?;
        self.installed = true;
        Ok(())
    }
}

impl Write for TmpFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for TmpFile {
    fn drop(&mut self) {
        if self.installed {
            return;
        }
        if let Err(err) = fs::remove_file(&self.tmp_path) {
            if !is_not_found(&err) {
                warn!(path = %self.tmp_path.display(), %err, "failed to remove staged temp file");
            }
        }
    }
}

/// Copy `reader` into `writer` while computing the MD5 of the stream.
///
/// Returns the byte count and the lowercase hex digest.
///
/// # Errors
///
/// Propagates read and write errors.
pub fn copy_with_md5(reader: &mut dyn Read, writer: &mut impl Write) -> io::Result<(u64, String)> {
    let mut hasher = Md5::new();
    let mut buf = [0u8; 64 * 1024];
    let mut total: u64 = 0;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }

    Ok((total, hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_install_staged_file_at_final_path() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let staging = tmp.path().join(".sgwtmp");
        let dest = tmp.path().join("obj");

        let mut f = TmpFile::open(&staging, &dest, 0).expect("open");
        f.write_all(b"hello").expect("write");
        f.link().expect("link");

        assert_eq!(fs::read(&dest).expect("read"), b"hello");
    }

    #[test]
    fn test_should_overwrite_existing_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let staging = tmp.path().join(".sgwtmp");
        let dest = tmp.path().join("obj");
        fs::write(&dest, b"old contents").expect("seed");

        let mut f = TmpFile::open(&staging, &dest, 0).expect("open");
        f.write_all(b"new").expect("write");
        f.link().expect("link");

        assert_eq!(fs::read(&dest).expect("read"), b"new");
    }

    #[test]
    fn test_should_fail_link_onto_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let staging = tmp.path().join(".sgwtmp");
        let dest = tmp.path().join("dir");
        fs::create_dir(&dest).expect("mkdir");

        let mut f = TmpFile::open(&staging, &dest, 0).expect("open");
        f.write_all(b"x").expect("write");
        assert!(f.link().is_err());
    }

    #[test]
    fn test_should_remove_temp_on_drop() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let staging = tmp.path().join(".sgwtmp");
        let dest = tmp.path().join("obj");

        {
            let mut f = TmpFile::open(&staging, &dest, 0).expect("open");
            f.write_all(b"abandoned").expect("write");
        }

        let leftovers: Vec<_> = fs::read_dir(&staging)
            .expect("readdir")
            .collect::<Result<_, _>>()
            .expect("entries");
        assert!(leftovers.is_empty());
        assert!(!dest.exists());
    }

    #[test]
    fn test_should_trim_overestimated_size_hint() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let staging = tmp.path().join(".sgwtmp");
        let dest = tmp.path().join("obj");

        let mut f = TmpFile::open(&staging, &dest, 1024).expect("open");
        f.write_all(b"short").expect("write");
        f.link().expect("link");

        assert_eq!(fs::read(&dest).expect("read"), b"short");
    }

    #[test]
    fn test_should_hash_copied_bytes() {
        let mut src: &[u8] = b"hello world";
        let mut dst = Vec::new();
        let (n, digest) = copy_with_md5(&mut src, &mut dst).expect("copy");
        assert_eq!(n, 11);
        assert_eq!(dst, b"hello world");
        assert_eq!(digest, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn test_should_hash_empty_stream_to_empty_md5() {
        let mut src: &[u8] = b"";
        let mut dst = Vec::new();
        let (n, digest) = copy_with_md5(&mut src, &mut dst).expect("copy");
        assert_eq!(n, 0);
        assert_eq!(digest, crate::meta::EMPTY_MD5);
    }
}
