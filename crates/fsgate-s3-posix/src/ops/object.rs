//! Object operation handlers.
//!
//! Implements `put_object`, `get_object`, `head_object`, `copy_object`,
//! `delete_object`, and `delete_objects`. All writes stage through the
//! atomic writer, so readers never observe a partially written object;
//! reads translate filesystem not-found into `NoSuchKey` and tolerate
//! partial metadata.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};

use anyhow::Context;
use fsgate_s3_model::input::{CopyObjectInput, GetObjectInput, PutObjectInput};
use fsgate_s3_model::output::{CopyObjectOutput, GetObjectOutput, HeadObjectOutput};
use tracing::{debug, warn};

use crate::backend::PosixBackend;
use crate::error::{
    is_dir_error, is_not_empty, is_not_found, BackendError, BackendResult,
};
use crate::meta;
use crate::namespace::{self, DIR_MODE};
use crate::tmpfile::{copy_with_md5, TmpFile};
use crate::utils::mtime_datetime;

/// Translate an install (`rename`) failure into the matching conflict
/// error: a directory at the destination, or a file along the parent
/// chain.
pub(crate) fn install_error(err: io::Error, key: &str) -> BackendError {
    if is_dir_error(&err) || is_not_empty(&err) {
        BackendError::ExistingObjectIsDirectory {
            key: key.to_owned(),
        }
    } else if err.raw_os_error() == Some(libc::ENOTDIR) {
        BackendError::ObjectParentIsFile {
            key: key.to_owned(),
        }
    } else {
        anyhow::Error::from(err)
            .context(format!("link object {key} in namespace"))
            .into()
    }
}

impl PosixBackend {
    /// Store an object, returning its ETag (hex MD5 of the body).
    ///
    /// A key ending in `/` creates a directory-key: the directory chain is
    /// created, caller metadata is applied, and the directory is stamped
    /// with the empty-body ETag so it lists as a committed object. Any
    /// other key streams through a staged temp file that is installed
    /// atomically, so a concurrent reader sees the old object or the new
    /// one, never a blend.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`, `ObjectParentIsFile` (a key component is a file),
    /// `ExistingObjectIsDirectory` (a directory occupies the object path).
    pub fn put_object(
        &self,
        input: PutObjectInput,
        body: &mut dyn Read,
    ) -> BackendResult<String> {
        self.stat_bucket(&input.bucket)?;

        if !namespace::is_clean_key_path(input.key.trim_end_matches('/')) {
            return Err(BackendError::invalid_request(format!(
                "invalid object key: {}",
                input.key
            )));
        }

        let name = self.object_path(&input.bucket, &input.key);

        if namespace::is_directory_key(&input.key) {
            namespace::mkdir_all(&name, DIR_MODE, &input.key)?;

            for (k, v) in &input.metadata {
                let attr = format!("{}{k}", meta::USER_PREFIX);
                if let Err(err) = meta::set_attr(&name, &attr, v.as_bytes()) {
                    warn!(key = %input.key, attr = %attr, %err, "failed to set user metadata");
                }
            }

            // The marker distinguishing an explicit directory-key from an
            // implicit parent.
            meta::set_attr(&name, meta::ETAG_KEY, meta::EMPTY_MD5.as_bytes())
                .with_context(|| format!("set etag on directory key {}", input.key))?;

            debug!(bucket = %input.bucket, key = %input.key, "put_object created directory key");
            return Ok(meta::EMPTY_MD5.to_owned());
        }

        let staging = namespace::staging_path(self.root(), &input.bucket);
        let mut tmp =
            TmpFile::open(&staging, &name, input.content_length).context("open temp file")?;

        let (size, etag) = copy_with_md5(body, &mut tmp).context("write object data")?;

        namespace::ensure_parent_dirs(&name, &input.key)?;
        tmp.link().map_err(|err| install_error(err, &input.key))?;

        for (k, v) in &input.metadata {
            let attr = format!("{}{k}", meta::USER_PREFIX);
            if let Err(err) = meta::set_attr(&name, &attr, v.as_bytes()) {
                warn!(key = %input.key, attr = %attr, %err, "failed to set user metadata");
            }
        }
        if let Some(content_type) = input.content_type.as_deref().filter(|s| !s.is_empty()) {
            let attr = format!("{}{}", meta::USER_PREFIX, meta::CONTENT_TYPE_HDR);
            if let Err(err) = meta::set_attr(&name, &attr, content_type.as_bytes()) {
                warn!(key = %input.key, %err, "failed to set content type");
            }
        }
        if let Some(encoding) = input.content_encoding.as_deref().filter(|s| !s.is_empty()) {
            let attr = format!("{}{}", meta::USER_PREFIX, meta::CONTENT_ENCODING_HDR);
            if let Err(err) = meta::set_attr(&name, &attr, encoding.as_bytes()) {
                warn!(key = %input.key, %err, "failed to set content encoding");
            }
        }

        // A file without the ETag marker is invisible to listings; do not
        // leave one behind on failure.
        if let Err(err) = meta::set_attr(&name, meta::ETAG_KEY, etag.as_bytes()) {
            let _ = fs::remove_file(&name);
            return Err(anyhow::Error::from(err)
                .context(format!("set etag on {}", input.key))
                .into());
        }

        debug!(bucket = %input.bucket, key = %input.key, size, %etag, "put_object completed");
        Ok(etag)
    }

    /// Stream an object (or the requested range of it) into `writer` and
    /// return its metadata.
    ///
    /// A committed directory-key yields an empty body with the stored
    /// ETag.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`, `NoSuchKey`, `InvalidRequest` for an unsatisfiable
    /// range.
    pub fn get_object(
        &self,
        input: GetObjectInput,
        writer: &mut dyn Write,
    ) -> BackendResult<GetObjectOutput> {
        self.stat_bucket(&input.bucket)?;

        let path = self.object_path(&input.bucket, &input.key);
        let stat = match fs::metadata(&path) {
            Ok(stat) => stat,
            Err(err) if is_not_found(&err) => {
                return Err(BackendError::NoSuchKey {
                    key: input.key.clone(),
                });
            }
            Err(err) => {
                return Err(anyhow::Error::from(err)
                    .context(format!("stat object {}", input.key))
                    .into())
            }
        };

        if stat.is_dir() {
            // Only an explicit directory-key is an object; an implicit
            // parent directory is not addressable.
            if !meta::has_etag(&path) {
                return Err(BackendError::NoSuchKey {
                    key: input.key.clone(),
                });
            }

            let (metadata, content_type, content_encoding) = meta::load_user_metadata(&path);
            let tags = self.xattr_tags(&input.bucket, &input.key)?;

            return Ok(GetObjectOutput {
                accept_ranges: input.range,
                content_length: 0,
                content_type,
                content_encoding,
                etag: meta::get_attr_string(&path, meta::ETAG_KEY),
                last_modified: mtime_datetime(stat.modified()),
                metadata,
                tag_count: tags.len(),
            });
        }

        let size = stat.len();
        let (start, length) = match input.range.as_deref().filter(|r| !r.is_empty()) {
            Some(range) => {
                let (start, end) = crate::utils::parse_range(range, size)?;
                (start, end - start + 1)
            }
            None => (0, size),
        };

        if length > 0 {
            let mut file = match File::open(&path) {
                Ok(file) => file,
                Err(err) if is_not_found(&err) => {
                    return Err(BackendError::NoSuchKey {
                        key: input.key.clone(),
                    });
                }
                Err(err) => {
                    return Err(anyhow::Error::from(err)
                        .context(format!("open object {}", input.key))
                        .into())
                }
            };
            if start > 0 {
                file.seek(SeekFrom::Start(start))
                    .context("seek to range start")?;
            }
            io::copy(&mut Read::by_ref(&mut file).take(length), writer).context("copy object data")?;
        }

        let (metadata, content_type, content_encoding) = meta::load_user_metadata(&path);
        let tags = self.xattr_tags(&input.bucket, &input.key)?;

        debug!(
            bucket = %input.bucket,
            key = %input.key,
            length,
            "get_object completed"
        );

        Ok(GetObjectOutput {
            accept_ranges: input.range,
            content_length: length,
            content_type,
            content_encoding,
            etag: meta::get_attr_string(&path, meta::ETAG_KEY),
            last_modified: mtime_datetime(stat.modified()),
            metadata,
            tag_count: tags.len(),
        })
    }

    /// Return an object's metadata without its body.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`, `NoSuchKey`.
    pub fn head_object(&self, bucket: &str, key: &str) -> BackendResult<HeadObjectOutput> {
        self.stat_bucket(bucket)?;

        let path = self.object_path(bucket, key);
        let stat = match fs::metadata(&path) {
            Ok(stat) => stat,
            Err(err) if is_not_found(&err) => {
                return Err(BackendError::NoSuchKey {
                    key: key.to_owned(),
                });
            }
            Err(err) => {
                return Err(anyhow::Error::from(err)
                    .context(format!("stat object {key}"))
                    .into())
            }
        };

        if stat.is_dir() && !meta::has_etag(&path) {
            return Err(BackendError::NoSuchKey {
                key: key.to_owned(),
            });
        }

        let (metadata, content_type, content_encoding) = meta::load_user_metadata(&path);

        Ok(HeadObjectOutput {
            content_length: if stat.is_dir() { 0 } else { stat.len() },
            content_type,
            content_encoding,
            etag: meta::get_attr_string(&path, meta::ETAG_KEY),
            last_modified: mtime_datetime(stat.modified()),
            metadata,
        })
    }

    /// Copy an object by streaming the source through `put_object`.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket` for either bucket, `NoSuchKey` for the source.
    pub fn copy_object(&self, input: CopyObjectInput) -> BackendResult<CopyObjectOutput> {
        self.stat_bucket(&input.src_bucket)?;
        self.stat_bucket(&input.dst_bucket)?;

        let src_path = self.object_path(&input.src_bucket, &input.src_key);
        let src_stat = match fs::metadata(&src_path) {
            Ok(stat) => stat,
            Err(err) if is_not_found(&err) => {
                return Err(BackendError::NoSuchKey {
                    key: input.src_key.clone(),
                });
            }
            Err(err) => {
                return Err(anyhow::Error::from(err)
                    .context(format!("stat object {}", input.src_key))
                    .into())
            }
        };

        let mut src = match File::open(&src_path) {
            Ok(file) => file,
            Err(err) if is_not_found(&err) => {
                return Err(BackendError::NoSuchKey {
                    key: input.src_key.clone(),
                });
            }
            Err(err) => {
                return Err(anyhow::Error::from(err)
                    .context(format!("open object {}", input.src_key))
                    .into())
            }
        };

        let etag = self.put_object(
            PutObjectInput {
                bucket: input.dst_bucket.clone(),
                key: input.dst_key.clone(),
                content_length: src_stat.len(),
                ..PutObjectInput::default()
            },
            &mut src,
        )?;

        let dst_stat = fs::metadata(self.object_path(&input.dst_bucket, &input.dst_key))
            .with_context(|| format!("stat dst object {}", input.dst_key))?;

        debug!(
            src = %format!("{}/{}", input.src_bucket, input.src_key),
            dst = %format!("{}/{}", input.dst_bucket, input.dst_key),
            "copy_object completed"
        );

        Ok(CopyObjectOutput {
            etag,
            last_modified: mtime_datetime(dst_stat.modified()),
        })
    }

    /// Delete an object and prune any implicit parent directories left
    /// empty by its removal.
    ///
    /// Deleting a missing key is a no-op. Deleting a directory-key whose
    /// directory still holds other entries leaves it in place.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`; transient removal failures are propagated.
    pub fn delete_object(&self, bucket: &str, key: &str) -> BackendResult<()> {
        self.stat_bucket(bucket)?;

        let path = self.object_path(bucket, key);
        let stat = match fs::symlink_metadata(&path) {
            Ok(stat) => stat,
            Err(err) if is_not_found(&err) => return Ok(()),
            Err(err) => {
                return Err(anyhow::Error::from(err)
                    .context(format!("stat object {key}"))
                    .into())
            }
        };

        if stat.is_dir() {
            // Best effort: a non-empty directory still holds live keys.
            let _ = fs::remove_dir(&path);
        } else {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if is_not_found(&err) => {}
                Err(err) => {
                    return Err(anyhow::Error::from(err)
                        .context(format!("delete object {key}"))
                        .into())
                }
            }
        }

        let bucket_path = self.bucket_path(bucket);
        namespace::remove_parents(&bucket_path, &path, meta::has_etag);

        debug!(bucket, key, "delete_object completed");
        Ok(())
    }

    /// Delete a batch of objects, failing on the first error.
    ///
    /// # Errors
    ///
    /// Propagates the first `delete_object` failure.
    pub fn delete_objects(&self, bucket: &str, keys: &[String]) -> BackendResult<()> {
        for key in keys {
            self.delete_object(bucket, key)?;
        }
        Ok(())
    }
}
