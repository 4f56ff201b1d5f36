//! Object tagging handlers.
//!
//! Tags are a JSON `{key: value}` map in the object's `user.X-Amz-Tagging`
//! attribute. Setting a `None` tag set removes the attribute.

use std::collections::HashMap;

use anyhow::Context;
use tracing::debug;

use crate::backend::PosixBackend;
use crate::error::{is_no_attr, is_not_found, BackendError, BackendResult};
use crate::meta;

impl PosixBackend {
    /// Read an object's tag map. An object without the attribute has an
    /// empty tag set.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NoSuchBucket`] / [`BackendError::NoSuchKey`]
    /// when the bucket or object is missing.
    pub fn get_tags(&self, bucket: &str, key: &str) -> BackendResult<HashMap<String, String>> {
        self.stat_bucket(bucket)?;
        self.xattr_tags(bucket, key)
    }

    /// Replace or remove an object's tag map. `None` removes the
    /// attribute entirely.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NoSuchKey`] when the object is missing.
    pub fn set_tags(
        &self,
        bucket: &str,
        key: &str,
        tags: Option<HashMap<String, String>>,
    ) -> BackendResult<()> {
        self.stat_bucket(bucket)?;
        let path = self.object_path(bucket, key);

        let Some(tags) = tags else {
            match meta::remove_attr(&path, &format!("{}{}", meta::USER_PREFIX, meta::TAGGING_HDR)) {
                Ok(()) => {}
                // Removing a tag set that was never written is a no-op.
                Err(err) if is_no_attr(&err) => {}
                Err(err) if is_not_found(&err) => {
                    return Err(BackendError::NoSuchKey {
                        key: key.to_owned(),
                    });
                }
                Err(err) => {
                    return Err(anyhow::Error::from(err)
                        .context(format!("remove tags of {bucket}/{key}"))
                        .into())
                }
            }
            debug!(bucket, key, "set_tags removed tag set");
            return Ok(());
        };

        let encoded = meta::encode_tags(&tags).context("marshal tags")?;
        match meta::set_attr(
            &path,
            &format!("{}{}", meta::USER_PREFIX, meta::TAGGING_HDR),
            &encoded,
        ) {
            Ok(()) => {}
            Err(err) if is_not_found(&err) => {
                return Err(BackendError::NoSuchKey {
                    key: key.to_owned(),
                });
            }
            Err(err) => {
                return Err(anyhow::Error::from(err)
                    .context(format!("set tags of {bucket}/{key}"))
                    .into())
            }
        }

        debug!(bucket, key, count = tags.len(), "set_tags completed");
        Ok(())
    }

    /// Remove an object's tag set.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NoSuchKey`] when the object is missing.
    pub fn remove_tags(&self, bucket: &str, key: &str) -> BackendResult<()> {
        self.set_tags(bucket, key, None)
    }

    /// Tag map straight from the attribute, with the error translation the
    /// read paths share: missing object is `NoSuchKey`, missing attribute
    /// is an empty map.
    pub(crate) fn xattr_tags(
        &self,
        bucket: &str,
        key: &str,
    ) -> BackendResult<HashMap<String, String>> {
        let path = self.object_path(bucket, key);
        match meta::get_attr(&path, &format!("{}{}", meta::USER_PREFIX, meta::TAGGING_HDR)) {
            Ok(Some(bytes)) => Ok(meta::decode_tags(&bytes).context("unmarshal tags")?),
            Ok(None) => Ok(HashMap::new()),
            Err(err) if is_not_found(&err) => Err(BackendError::NoSuchKey {
                key: key.to_owned(),
            }),
            Err(err) => Err(anyhow::Error::from(err)
                .context(format!("get tags of {bucket}/{key}"))
                .into()),
        }
    }
}
