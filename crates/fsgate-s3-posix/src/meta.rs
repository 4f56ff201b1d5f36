//! Metadata store: the extended-attribute schema.
//!
//! All object and bucket metadata lives in `user.`-namespace extended
//! attributes on the files themselves. The `xattr` crate reports an absent
//! attribute as `Ok(None)`, which is exactly the "absent, not an error"
//! normalization the engine needs: only genuine I/O errors propagate.
//!
//! Schema:
//!
//! | Attribute | Holds |
//! |---|---|
//! | `user.etag` | hex MD5, or `<hex>-<count>` for multipart; marks a committed object |
//! | `user.acl` | opaque JSON ACL blob (buckets) |
//! | `user.X-Amz-Tagging` | JSON `{key: value}` tag map |
//! | `user.objname` | original key on a multipart container |
//! | `user.content-type` / `user.content-encoding` | content headers |
//! | `user.X-Amz-Meta-*`, `user.Expires` | user metadata |
//! | `user.iam` | IAM store, on the root directory only |

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use xattr::FileExt;

/// Attribute namespace prefix; everything the engine writes lives under it.
pub const USER_PREFIX: &str = "user.";

/// Committed-object marker and ETag value.
pub const ETAG_KEY: &str = "user.etag";

/// Opaque JSON ACL blob.
pub const ACL_KEY: &str = "user.acl";

/// IAM store attribute on the root directory.
pub const IAM_KEY: &str = "user.iam";

/// Original object key, set on a multipart container directory.
pub const OBJNAME_KEY: &str = "user.objname";

/// Tag map attribute (metadata key without the `user.` prefix).
pub const TAGGING_HDR: &str = "X-Amz-Tagging";

/// Content-type attribute (metadata key without the `user.` prefix).
pub const CONTENT_TYPE_HDR: &str = "content-type";

/// Content-encoding attribute (metadata key without the `user.` prefix).
pub const CONTENT_ENCODING_HDR: &str = "content-encoding";

/// Hex MD5 of the empty input; the ETag stamped on directory-keys.
pub const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

// ---------------------------------------------------------------------------
// Raw attribute access
// ---------------------------------------------------------------------------

/// Read a single attribute. `Ok(None)` means the attribute is absent.
///
/// # Errors
///
/// Propagates I/O errors other than attribute-absent.
pub fn get_attr(path: &Path, name: &str) -> io::Result<Option<Vec<u8>>> {
    xattr::get(path, name)
}

/// Write a single attribute, overwriting any previous value.
///
/// # Errors
///
/// Propagates the underlying I/O error.
pub fn set_attr(path: &Path, name: &str, value: &[u8]) -> io::Result<()> {
    xattr::set(path, name, value)
}

/// Remove a single attribute.
///
/// # Errors
///
/// Propagates the underlying I/O error (including attribute-absent).
pub fn remove_attr(path: &Path, name: &str) -> io::Result<()> {
    xattr::remove(path, name)
}

/// List attribute names carrying the given prefix.
///
/// # Errors
///
/// Propagates the underlying I/O error.
pub fn list_attrs(path: &Path, prefix: &str) -> io::Result<Vec<String>> {
    let names = xattr::list(path)?;
    Ok(names
        .filter_map(|n| n.into_string().ok())
        .filter(|n| n.starts_with(prefix))
        .collect())
}

/// Read a single attribute through an open file handle.
///
/// # Errors
///
/// Propagates I/O errors other than attribute-absent.
pub fn get_attr_fd(file: &File, name: &str) -> io::Result<Option<Vec<u8>>> {
    file.get_xattr(name)
}

/// Write a single attribute through an open file handle.
///
/// # Errors
///
/// Propagates the underlying I/O error.
pub fn set_attr_fd(file: &File, name: &str, value: &[u8]) -> io::Result<()> {
    file.set_xattr(name, value)
}

/// List attribute names carrying the given prefix, through an open file
/// handle.
///
/// # Errors
///
/// Propagates the underlying I/O error.
pub fn list_attrs_fd(file: &File, prefix: &str) -> io::Result<Vec<String>> {
    let names = file.list_xattr()?;
    Ok(names
        .filter_map(|n| n.into_string().ok())
        .filter(|n| n.starts_with(prefix))
        .collect())
}

/// Remove a single attribute through an open file handle.
///
/// # Errors
///
/// Propagates the underlying I/O error (including attribute-absent).
pub fn remove_attr_fd(file: &File, name: &str) -> io::Result<()> {
    file.remove_xattr(name)
}

/// Tolerant string read: absent attribute, non-UTF-8 value, or any error
/// yields an empty string. Used where listings must not fail on partial
/// metadata.
#[must_use]
pub fn get_attr_string(path: &Path, name: &str) -> String {
    match xattr::get(path, name) {
        Ok(Some(bytes)) => String::from_utf8(bytes).unwrap_or_default(),
        _ => String::new(),
    }
}

/// Whether the path carries the committed-object marker.
#[must_use]
pub fn has_etag(path: &Path) -> bool {
    matches!(xattr::get(path, ETAG_KEY), Ok(Some(_)))
}

// ---------------------------------------------------------------------------
// User metadata
// ---------------------------------------------------------------------------

/// Whether an attribute name is S3 user metadata.
fn is_valid_meta(name: &str) -> bool {
    if name.starts_with("user.X-Amz-Meta") {
        return true;
    }
    name.eq_ignore_ascii_case("user.Expires")
}

/// Load the user-metadata map plus content type and encoding from a path.
///
/// Collects every `user.X-Amz-Meta-*` attribute and `user.Expires` into the
/// map (keys without the `user.` prefix). An attribute that vanishes
/// between list and read contributes an empty value; any other per-attribute
/// error skips that attribute silently. Content type and encoding are read
/// separately, default to empty strings, and are mirrored into the map when
/// present.
#[must_use]
pub fn load_user_metadata(path: &Path) -> (HashMap<String, String>, String, String) {
    let mut meta = HashMap::new();

    if let Ok(names) = xattr::list(path) {
        for name in names.filter_map(|n| n.into_string().ok()) {
            if !is_valid_meta(&name) {
                continue;
            }
            match xattr::get(path, &name) {
                Ok(Some(value)) => {
                    let Ok(value) = String::from_utf8(value) else {
                        continue;
                    };
                    meta.insert(name.trim_start_matches(USER_PREFIX).to_owned(), value);
                }
                Ok(None) => {
                    meta.insert(name.trim_start_matches(USER_PREFIX).to_owned(), String::new());
                }
                Err(_) => {}
            }
        }
    }

    let content_type = get_attr_string(path, &format!("{USER_PREFIX}{CONTENT_TYPE_HDR}"));
    if !content_type.is_empty() {
        meta.insert(CONTENT_TYPE_HDR.to_owned(), content_type.clone());
    }

    let content_encoding = get_attr_string(path, &format!("{USER_PREFIX}{CONTENT_ENCODING_HDR}"));
    if !content_encoding.is_empty() {
        meta.insert(CONTENT_ENCODING_HDR.to_owned(), content_encoding.clone());
    }

    (meta, content_type, content_encoding)
}

// ---------------------------------------------------------------------------
// ACL and tag codecs
// ---------------------------------------------------------------------------

/// The ACL record stored on buckets. The grant list is carried opaquely;
/// this engine never evaluates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acl {
    /// Canned ACL name (`"private"` for new buckets).
    #[serde(rename = "ACL")]
    pub acl: String,
    /// Owner account identifier.
    #[serde(rename = "Owner")]
    pub owner: String,
    /// Grant entries, passed through without interpretation.
    #[serde(rename = "Grantees")]
    pub grantees: Vec<serde_json::Value>,
}

impl Acl {
    /// The private ACL written by bucket creation.
    #[must_use]
    pub fn private(owner: &str) -> Self {
        Self {
            acl: "private".to_owned(),
            owner: owner.to_owned(),
            grantees: Vec::new(),
        }
    }
}

/// Serialize a tag map to the stored JSON form.
///
/// # Errors
///
/// Propagates serialization failures.
pub fn encode_tags(tags: &HashMap<String, String>) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(tags)
}

/// Deserialize a stored tag map.
///
/// # Errors
///
/// Propagates deserialization failures.
pub fn decode_tags(bytes: &[u8]) -> serde_json::Result<HashMap<String, String>> {
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_roundtrip_attribute() {
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        set_attr(tmp.path(), ETAG_KEY, b"abc123").expect("set");
        let value = get_attr(tmp.path(), ETAG_KEY).expect("get");
        assert_eq!(value.as_deref(), Some(b"abc123".as_slice()));
    }

    #[test]
    fn test_should_report_absent_attribute_as_none() {
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        let value = get_attr(tmp.path(), "user.missing").expect("get");
        assert!(value.is_none());
        assert!(!has_etag(tmp.path()));
    }

    #[test]
    fn test_should_read_absent_attribute_as_empty_string() {
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        assert_eq!(get_attr_string(tmp.path(), ETAG_KEY), "");
    }

    #[test]
    fn test_should_list_attributes_by_prefix() {
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        set_attr(tmp.path(), "user.X-Amz-Meta-color", b"blue").expect("set");
        set_attr(tmp.path(), "user.etag", b"e").expect("set");

        let names = list_attrs(tmp.path(), "user.X-Amz-Meta-").expect("list");
        assert_eq!(names, vec!["user.X-Amz-Meta-color".to_owned()]);
    }

    #[test]
    fn test_should_load_user_metadata() {
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        set_attr(tmp.path(), "user.X-Amz-Meta-color", b"blue").expect("set");
        set_attr(tmp.path(), "user.Expires", b"soon").expect("set");
        set_attr(tmp.path(), "user.content-type", b"text/plain").expect("set");
        set_attr(tmp.path(), "user.etag", b"not-metadata").expect("set");

        let (meta, content_type, content_encoding) = load_user_metadata(tmp.path());
        assert_eq!(meta.get("X-Amz-Meta-color").map(String::as_str), Some("blue"));
        assert_eq!(meta.get("Expires").map(String::as_str), Some("soon"));
        assert_eq!(meta.get("content-type").map(String::as_str), Some("text/plain"));
        assert!(!meta.contains_key("etag"));
        assert_eq!(content_type, "text/plain");
        assert_eq!(content_encoding, "");
    }

    #[test]
    fn test_should_access_attributes_through_handle() {
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        let file = tmp.reopen().expect("reopen");
        set_attr_fd(&file, IAM_KEY, b"{}").expect("fset");
        assert_eq!(
            get_attr_fd(&file, IAM_KEY).expect("fget").as_deref(),
            Some(b"{}".as_slice())
        );

        assert_eq!(
            list_attrs_fd(&file, "user.").expect("flist"),
            vec![IAM_KEY.to_owned()]
        );
        remove_attr_fd(&file, IAM_KEY).expect("fremove");
        assert!(get_attr_fd(&file, IAM_KEY).expect("fget").is_none());
    }

    #[test]
    fn test_should_build_private_acl() {
        let acl = Acl::private("alice");
        let json = serde_json::to_vec(&acl).expect("serialize");
        let parsed: Acl = serde_json::from_slice(&json).expect("deserialize");
        assert_eq!(parsed.acl, "private");
        assert_eq!(parsed.owner, "alice");
        assert!(parsed.grantees.is_empty());
    }

    #[test]
    fn test_should_roundtrip_tags() {
        let mut tags = HashMap::new();
        tags.insert("env".to_owned(), "prod".to_owned());
        let bytes = encode_tags(&tags).expect("encode");
        assert_eq!(decode_tags(&bytes).expect("decode"), tags);
    }

    #[test]
    fn test_should_match_meta_names_case_style() {
        assert!(is_valid_meta("user.X-Amz-Meta-anything"));
        assert!(is_valid_meta("user.Expires"));
        assert!(is_valid_meta("user.expires"));
        assert!(!is_valid_meta("user.etag"));
        assert!(!is_valid_meta("user.content-type"));
    }
}
