//! Multipart upload handlers.
//!
//! Implements `create_multipart_upload`, `put_object_part`,
//! `complete_multipart_upload`, `abort_multipart_upload`,
//! `list_multipart_uploads`, and `list_object_parts`.
//!
//! There is no in-memory upload state: an upload exists exactly while
//! `<bucket>/.sgwtmp/multipart/<sha256(key)>/<upload-id>/` exists. The
//! container directory is shared by all concurrent uploads for one key and
//! carries the original key in `user.objname` so listings can invert the
//! hash; each upload directory holds its numbered part files.

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use fsgate_s3_model::input::{
    CompleteMultipartUploadInput, CreateMultipartUploadInput, ListMultipartUploadsInput,
    ListObjectPartsInput, PutObjectPartInput,
};
use fsgate_s3_model::output::{
    CompleteMultipartUploadOutput, CreateMultipartUploadOutput, ListMultipartUploadsOutput,
    ListObjectPartsOutput,
};
use fsgate_s3_model::{Part, Upload};
use md5::{Digest, Md5};
use tracing::{debug, warn};
use uuid::Uuid;

use super::object::install_error;
use crate::backend::PosixBackend;
use crate::error::{is_not_found, BackendError, BackendResult};
use crate::meta;
use crate::namespace::{self, MULTIPART_DIR};
use crate::tmpfile::{copy_with_md5, TmpFile};
use crate::utils::{mtime_rfc3339, normalize_etag};

/// The S3 multipart ETag: hex MD5 of the concatenated binary part MD5s,
/// suffixed with the part count.
fn multipart_etag(part_etags: &[String]) -> String {
    let mut hasher = Md5::new();
    for etag in part_etags {
        if let Ok(bytes) = hex::decode(normalize_etag(etag)) {
            hasher.update(&bytes);
        }
    }
    format!("{}-{}", hex::encode(hasher.finalize()), part_etags.len())
}

impl PosixBackend {
    /// Resolve an upload's container and upload directories, verifying the
    /// upload exists.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NoSuchUpload`] when the upload directory is
    /// missing.
    fn check_upload_exists(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> BackendResult<(PathBuf, PathBuf)> {
        let container = namespace::multipart_container_path(self.root(), bucket, key);
        let upload_dir = container.join(upload_id);

        match fs::metadata(&upload_dir) {
            Ok(_) => Ok((container, upload_dir)),
            Err(err) if is_not_found(&err) => Err(BackendError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            }),
            Err(err) => Err(anyhow::Error::from(err)
                .context(format!("stat upload {upload_id}"))
                .into()),
        }
    }

    /// Start a multipart upload, returning a fresh upload ID.
    ///
    /// Concurrent creates for the same key each get their own upload ID
    /// inside the shared container.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`; staging-directory failures are wrapped with context.
    pub fn create_multipart_upload(
        &self,
        input: CreateMultipartUploadInput,
    ) -> BackendResult<CreateMultipartUploadOutput> {
        self.stat_bucket(&input.bucket)?;

        if !namespace::is_clean_key_path(input.key.trim_end_matches('/')) {
            return Err(BackendError::invalid_request(format!(
                "invalid object key: {}",
                input.key
            )));
        }

        let upload_id = Uuid::new_v4().to_string();
        let container = namespace::multipart_container_path(self.root(), &input.bucket, &input.key);
        let upload_dir = container.join(&upload_id);

        namespace::mkdir_all(&upload_dir, namespace::DIR_MODE, &input.key)?;

        // Record the original key so listings can invert the hashed
        // container name. On failure, tear down what we created, keeping
        // errors quiet since sibling uploads may still use the container.
        if let Err(err) = meta::set_attr(&container, meta::OBJNAME_KEY, input.key.as_bytes()) {
            let _ = fs::remove_dir_all(&upload_dir);
            let _ = fs::remove_dir(&container);
            return Err(anyhow::Error::from(err)
                .context("set name attr for upload")
                .into());
        }

        for (k, v) in &input.metadata {
            let attr = format!("{}{k}", meta::USER_PREFIX);
            if let Err(err) = meta::set_attr(&upload_dir, &attr, v.as_bytes()) {
                warn!(key = %input.key, attr = %attr, %err, "failed to set upload metadata");
            }
        }

        debug!(
            bucket = %input.bucket,
            key = %input.key,
            upload_id = %upload_id,
            "create_multipart_upload completed"
        );

        Ok(CreateMultipartUploadOutput {
            bucket: input.bucket,
            key: input.key,
            upload_id,
        })
    }

    /// Stage one part, returning its ETag (hex MD5 of the part body).
    ///
    /// Re-putting a part number atomically replaces the previous part.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`, `NoSuchUpload`.
    pub fn put_object_part(
        &self,
        input: PutObjectPartInput,
        body: &mut dyn io::Read,
    ) -> BackendResult<String> {
        self.stat_bucket(&input.bucket)?;
        let (_container, upload_dir) =
            self.check_upload_exists(&input.bucket, &input.key, &input.upload_id)?;

        let part_path = upload_dir.join(input.part_number.to_string());
        let staging = namespace::staging_path(self.root(), &input.bucket);

        let mut tmp = TmpFile::open(&staging, &part_path, input.content_length)
            .context("open temp file")?;
        let (size, etag) = copy_with_md5(body, &mut tmp).context("write part data")?;

        match tmp.link() {
            Ok(()) => {}
            // The upload directory can vanish under a concurrent abort.
            Err(err) if is_not_found(&err) => {
                return Err(BackendError::NoSuchUpload {
                    upload_id: input.upload_id.clone(),
                });
            }
            Err(err) => {
                return Err(anyhow::Error::from(err)
                    .context(format!("link part {} in namespace", input.part_number))
                    .into())
            }
        }

        if let Err(err) = meta::set_attr(&part_path, meta::ETAG_KEY, etag.as_bytes()) {
            warn!(part = input.part_number, %err, "failed to set part etag");
        }

        debug!(
            bucket = %input.bucket,
            key = %input.key,
            upload_id = %input.upload_id,
            part_number = input.part_number,
            size,
            "put_object_part completed"
        );
        Ok(etag)
    }

    /// Assemble the staged parts into the final object.
    ///
    /// Parts are concatenated in the caller-supplied order. Every part must
    /// exist; every part except the last must match the first part's size;
    /// a caller-supplied part ETag must match the stored one. The object
    /// is installed atomically, stamped with the multipart ETag, and the
    /// upload directory is removed. A failure after the object has been
    /// installed removes it again; a partial commit is worse than none.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`, `NoSuchUpload`, `InvalidPart`,
    /// `ObjectParentIsFile`, `ExistingObjectIsDirectory`.
    pub fn complete_multipart_upload(
        &self,
        input: CompleteMultipartUploadInput,
    ) -> BackendResult<CompleteMultipartUploadOutput> {
        self.stat_bucket(&input.bucket)?;
        let (container, upload_dir) =
            self.check_upload_exists(&input.bucket, &input.key, &input.upload_id)?;

        // Validate the part list against the staged files and collect the
        // stored ETags for the final multipart ETag.
        let last = input.parts.len().saturating_sub(1);
        let mut first_size = 0u64;
        let mut total_size = 0u64;
        let mut part_etags = Vec::with_capacity(input.parts.len());

        for (i, cp) in input.parts.iter().enumerate() {
            let part_path = upload_dir.join(cp.part_number.to_string());
            let Ok(stat) = fs::symlink_metadata(&part_path) else {
                return Err(BackendError::InvalidPart);
            };

            if i == 0 {
                first_size = stat.len();
            }
            total_size += stat.len();
            // All parts except the last must share the first part's size.
            if i < last && stat.len() != first_size {
                return Err(BackendError::InvalidPart);
            }

            let stored = meta::get_attr_string(&part_path, meta::ETAG_KEY);
            if let Some(client) = cp.etag.as_deref().filter(|e| !e.is_empty()) {
                if normalize_etag(client) != stored {
                    return Err(BackendError::InvalidPart);
                }
            }
            part_etags.push(stored);
        }

        let objname = self.object_path(&input.bucket, &input.key);
        let staging = namespace::staging_path(self.root(), &input.bucket);
        let mut tmp = TmpFile::open(&staging, &objname, total_size).context("open temp file")?;

        for cp in &input.parts {
            let part_path = upload_dir.join(cp.part_number.to_string());
            let mut part = File::open(&part_path)
                .with_context(|| format!("open part {}", cp.part_number))?;
            io::copy(&mut part, &mut tmp)
                .with_context(|| format!("copy part {}", cp.part_number))?;
        }

        let (user_meta, _, _) = meta::load_user_metadata(&upload_dir);

        namespace::ensure_parent_dirs(&objname, &input.key)?;
        tmp.link().map_err(|err| install_error(err, &input.key))?;

        for (k, v) in &user_meta {
            let attr = format!("{}{k}", meta::USER_PREFIX);
            if let Err(err) = meta::set_attr(&objname, &attr, v.as_bytes()) {
                let _ = fs::remove_file(&objname);
                return Err(anyhow::Error::from(err)
                    .context(format!("set user attr {k:?}"))
                    .into());
            }
        }

        let etag = multipart_etag(&part_etags);
        if let Err(err) = meta::set_attr(&objname, meta::ETAG_KEY, etag.as_bytes()) {
            let _ = fs::remove_file(&objname);
            return Err(anyhow::Error::from(err).context("set etag attr").into());
        }

        // Drop the upload; the container may still hold sibling uploads
        // for the same key, so its removal is best-effort and non-recursive.
        if let Err(err) = fs::remove_dir_all(&upload_dir) {
            warn!(upload_id = %input.upload_id, %err, "failed to remove upload dir");
        }
        let _ = fs::remove_dir(&container);

        debug!(
            bucket = %input.bucket,
            key = %input.key,
            upload_id = %input.upload_id,
            parts = input.parts.len(),
            %etag,
            "complete_multipart_upload completed"
        );

        Ok(CompleteMultipartUploadOutput {
            bucket: input.bucket,
            key: input.key,
            etag,
        })
    }

    /// Abort an upload, removing its staged parts.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`; aborting an upload that no longer exists (including
    /// a repeated abort) returns `NoSuchUpload`.
    pub fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> BackendResult<()> {
        self.stat_bucket(bucket)?;
        let (container, upload_dir) = self.check_upload_exists(bucket, key, upload_id)?;

        fs::remove_dir_all(&upload_dir).context("remove multipart upload")?;
        let _ = fs::remove_dir(&container);

        debug!(bucket, key, upload_id, "abort_multipart_upload completed");
        Ok(())
    }

    /// List in-progress uploads, ordered by `(key, upload_id)` with S3's
    /// composite marker: entries up to and including the marker pair are
    /// skipped.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`.
    pub fn list_multipart_uploads(
        &self,
        input: ListMultipartUploadsInput,
    ) -> BackendResult<ListMultipartUploadsOutput> {
        self.stat_bucket(&input.bucket)?;

        let prefix = input.prefix.clone().unwrap_or_default();
        let key_marker = input.key_marker.clone().unwrap_or_default();
        let upload_id_marker = input.upload_id_marker.clone().unwrap_or_default();

        let mut uploads = Vec::new();
        let multipart_dir = self.bucket_path(&input.bucket).join(MULTIPART_DIR);
        // A bucket that never staged an upload has no multipart dir.
        if let Ok(containers) = fs::read_dir(&multipart_dir) {
            for container in containers.filter_map(Result::ok) {
                let container_path = container.path();
                if !container.file_type().is_ok_and(|t| t.is_dir()) {
                    continue;
                }
                let Ok(Some(objname)) = meta::get_attr(&container_path, meta::OBJNAME_KEY) else {
                    continue;
                };
                let Ok(key) = String::from_utf8(objname) else {
                    continue;
                };
                if !key.starts_with(&prefix) {
                    continue;
                }

                let Ok(entries) = fs::read_dir(&container_path) else {
                    continue;
                };
                for entry in entries.filter_map(Result::ok) {
                    if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                        continue;
                    }
                    let Ok(upload_id) = entry.file_name().into_string() else {
                        continue;
                    };
                    let initiated = match entry.metadata() {
                        Ok(stat) => mtime_rfc3339(stat.modified()),
                        Err(_) => continue,
                    };
                    uploads.push(Upload {
                        key: key.clone(),
                        upload_id,
                        initiated,
                    });
                }
            }
        }

        uploads.sort_by(|a, b| {
            a.key
                .cmp(&b.key)
                .then_with(|| a.upload_id.cmp(&b.upload_id))
        });

        // Composite marker: skip up to and including (key, upload_id).
        let past_marker = |u: &Upload| {
            if key_marker.is_empty() {
                return true;
            }
            match u.key.as_str().cmp(key_marker.as_str()) {
                std::cmp::Ordering::Less => false,
                std::cmp::Ordering::Greater => true,
                std::cmp::Ordering::Equal => {
                    !upload_id_marker.is_empty() && u.upload_id > upload_id_marker
                }
            }
        };
        let mut remaining: Vec<Upload> = uploads.into_iter().filter(past_marker).collect();

        let max_uploads = input.max_uploads as usize;
        let is_truncated = max_uploads > 0 && remaining.len() > max_uploads;
        if is_truncated {
            remaining.truncate(max_uploads);
        }

        let (next_key_marker, next_upload_id_marker) = if is_truncated {
            remaining
                .last()
                .map(|u| (u.key.clone(), u.upload_id.clone()))
                .unwrap_or_default()
        } else {
            (String::new(), String::new())
        };

        debug!(
            bucket = %input.bucket,
            count = remaining.len(),
            is_truncated,
            "list_multipart_uploads completed"
        );

        Ok(ListMultipartUploadsOutput {
            bucket: input.bucket,
            delimiter: input.delimiter.unwrap_or_default(),
            prefix,
            key_marker,
            upload_id_marker,
            next_key_marker,
            next_upload_id_marker,
            max_uploads: input.max_uploads,
            is_truncated,
            uploads: remaining,
        })
    }

    /// List the staged parts of an upload, ordered by part number.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`, `NoSuchUpload`.
    pub fn list_object_parts(
        &self,
        input: ListObjectPartsInput,
    ) -> BackendResult<ListObjectPartsOutput> {
        self.stat_bucket(&input.bucket)?;
        let (_container, upload_dir) =
            self.check_upload_exists(&input.bucket, &input.key, &input.upload_id)?;

        let entries = match fs::read_dir(&upload_dir) {
            Ok(entries) => entries,
            Err(err) if is_not_found(&err) => {
                return Err(BackendError::NoSuchUpload {
                    upload_id: input.upload_id.clone(),
                });
            }
            Err(err) => {
                return Err(anyhow::Error::from(err).context("readdir upload").into())
            }
        };

        let mut parts = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let Ok(part_number) = name.parse::<u32>() else {
                continue;
            };
            if part_number <= input.part_number_marker {
                continue;
            }

            let part_path = upload_dir.join(&name);
            let etag = meta::get_attr_string(&part_path, meta::ETAG_KEY);
            let Ok(stat) = entry.metadata() else {
                continue;
            };

            parts.push(Part {
                part_number,
                etag,
                last_modified: mtime_rfc3339(stat.modified()),
                size: stat.len(),
            });
        }

        parts.sort_by_key(|p| p.part_number);

        let old_len = parts.len();
        if input.max_parts > 0 && parts.len() > input.max_parts as usize {
            parts.truncate(input.max_parts as usize);
        }
        let is_truncated = old_len != parts.len();
        let next_part_number_marker = parts.last().map_or(0, |p| p.part_number);

        Ok(ListObjectPartsOutput {
            bucket: input.bucket,
            key: input.key,
            upload_id: input.upload_id,
            part_number_marker: input.part_number_marker,
            next_part_number_marker,
            max_parts: input.max_parts,
            is_truncated,
            parts,
        })
    }
}
