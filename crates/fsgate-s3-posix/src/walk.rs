//! Generic bucket-tree walker with S3 listing semantics.
//!
//! Walks a bucket directory in lexicographic key order, producing object
//! entries and delimiter-collapsed common prefixes with marker and
//! max-keys pagination. Which entries count as objects is decided by a
//! caller-supplied predicate (the listing engine passes an ETag-attribute
//! check), keeping the traversal itself free of metadata knowledge.
//!
//! Key order: directory entries are sorted with a `/` appended to
//! directory names, so the traversal sequence equals the lexicographic
//! order of the keys it produces (`a.txt` sorts before `a/b` because `.`
//! precedes `/`).
//!
//! Marker rules: object keys are emitted strictly after the marker. A
//! common prefix is skipped when every key it covers precedes the marker;
//! when the marker falls inside the group, the subtree is descended so the
//! group reappears only if it still holds keys past the marker.

use std::fs;
use std::io;
use std::ops::ControlFlow;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::namespace::in_pruned_subtree;

/// An object entry produced by the walk.
#[derive(Debug, Clone)]
pub struct WalkedObject {
    /// Key relative to the walk root, `/`-separated; directory-keys keep
    /// their trailing `/`.
    pub key: String,
    /// ETag from the caller's callback.
    pub etag: String,
    /// File size in bytes; `0` for directory-keys.
    pub size: u64,
    /// File mtime.
    pub last_modified: DateTime<Utc>,
}

/// Results of one paginated walk.
#[derive(Debug, Clone, Default)]
pub struct WalkResults {
    /// Object entries, in key order.
    pub objects: Vec<WalkedObject>,
    /// Collapsed key groups, deduplicated, in key order.
    pub common_prefixes: Vec<String>,
    /// Whether the page filled before the tree was exhausted.
    pub truncated: bool,
    /// The last emitted key or common prefix; resume point when truncated.
    pub next_marker: String,
}

/// Walk the tree rooted at `root`.
///
/// `is_object` decides whether a path is a listable object; `get_etag`
/// supplies its ETag. `pruned` names subtrees (relative to `root`) that are
/// never descended or reported. `max_keys` caps objects plus common
/// prefixes; zero yields an empty, un-truncated page.
///
/// # Errors
///
/// Propagates directory-read errors and errors returned by the callbacks.
pub fn walk<P, E>(
    root: &Path,
    prefix: &str,
    delimiter: &str,
    marker: &str,
    max_keys: usize,
    is_object: P,
    get_etag: E,
    pruned: &[&str],
) -> io::Result<WalkResults>
where
    P: Fn(&Path) -> io::Result<bool>,
    E: Fn(&Path) -> io::Result<String>,
{
    let mut walker = Walker {
        prefix,
        delimiter,
        marker,
        max_keys,
        is_object,
        get_etag,
        pruned,
        results: WalkResults::default(),
        last_emitted: None,
    };

    if max_keys > 0 {
        let _flow = walker.walk_dir(root, "")?;
    }

    let mut results = walker.results;
    if results.truncated {
        results.next_marker = walker.last_emitted.unwrap_or_default();
    }
    Ok(results)
}

struct Walker<'a, P, E> {
    prefix: &'a str,
    delimiter: &'a str,
    marker: &'a str,
    max_keys: usize,
    is_object: P,
    get_etag: E,
    pruned: &'a [&'a str],
    results: WalkResults,
    last_emitted: Option<String>,
}

impl<P, E> Walker<'_, P, E>
where
    P: Fn(&Path) -> io::Result<bool>,
    E: Fn(&Path) -> io::Result<String>,
{
    fn emitted(&self) -> usize {
        self.results.objects.len() + self.results.common_prefixes.len()
    }

    /// Record an object entry, or stop the walk if the page is full.
    fn emit_object(&mut self, key: String, path: &Path) -> io::Result<ControlFlow<()>> {
        if self.emitted() == self.max_keys {
            self.results.truncated = true;
            return Ok(ControlFlow::Break(()));
        }

        let meta = fs::symlink_metadata(path)?;
        let etag = (self.get_etag)(path)?;
        let size = if meta.is_dir() { 0 } else { meta.len() };
        let last_modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_default();

        self.last_emitted = Some(key.clone());
        self.results.objects.push(WalkedObject {
            key,
            etag,
            size,
            last_modified,
        });
        Ok(ControlFlow::Continue(()))
    }

    /// Record a common prefix, or stop the walk if the page is full.
    /// Consecutive duplicates collapse silently.
    fn emit_common_prefix(&mut self, cp: String) -> ControlFlow<()> {
        if self.results.common_prefixes.last() == Some(&cp) {
            return ControlFlow::Continue(());
        }
        if self.emitted() == self.max_keys {
            self.results.truncated = true;
            return ControlFlow::Break(());
        }
        self.last_emitted = Some(cp.clone());
        self.results.common_prefixes.push(cp);
        ControlFlow::Continue(())
    }

    /// The common prefix for `key`, if the delimiter splits it beyond the
    /// request prefix.
    fn common_prefix_of(&self, key: &str) -> Option<String> {
        if self.delimiter.is_empty() {
            return None;
        }
        let suffix = &key[self.prefix.len()..];
        suffix
            .find(self.delimiter)
            .map(|idx| key[..self.prefix.len() + idx + self.delimiter.len()].to_owned())
    }

    fn walk_dir(&mut self, dir: &Path, rel_prefix: &str) -> io::Result<ControlFlow<()>> {
        // Sort with `/` appended to directory names so traversal order
        // matches the lexicographic order of produced keys.
        let mut entries: Vec<(String, String, bool)> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let is_dir = entry.file_type()?.is_dir();
            let effective = if is_dir {
                format!("{name}/")
            } else {
                name.clone()
            };
            entries.push((effective, name, is_dir));
        }
        entries.sort();

        for (effective, name, is_dir) in entries {
            let rel = format!("{rel_prefix}{name}");
            if in_pruned_subtree(&rel, self.pruned) {
                continue;
            }
            let path = dir.join(&name);

            let flow = if is_dir {
                let key = format!("{rel_prefix}{effective}");
                self.visit_dir(&path, &key)?
            } else {
                self.visit_file(&path, &rel)?
            };
            if flow.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Handle a directory entry whose key (with trailing `/`) is `key`.
    fn visit_dir(&mut self, path: &Path, key: &str) -> io::Result<ControlFlow<()>> {
        if key.starts_with(self.prefix) {
            if let Some(cp) = self.common_prefix_of(key) {
                if cp.as_str() > self.marker {
                    // The whole subtree collapses into this group.
                    return Ok(self.emit_common_prefix(cp));
                }
                if self.marker != cp && self.marker.starts_with(&cp) {
                    // The marker falls inside the group; descend so keys
                    // past it can resurface the group.
                    return self.walk_dir(path, key);
                }
                // Group already returned in full (marker == prefix) or
                // entirely before the marker.
                return Ok(ControlFlow::Continue(()));
            }

            // A directory-key put leaves an object marker on the directory
            // itself; it lists ahead of its children.
            if key > self.marker && (self.is_object)(path)? {
                if self.emit_object(key.to_owned(), path)?.is_break() {
                    return Ok(ControlFlow::Break(()));
                }
            }
            return self.walk_dir(path, key);
        }

        if self.prefix.starts_with(key) {
            // Ancestor of the prefix; only descend.
            return self.walk_dir(path, key);
        }

        Ok(ControlFlow::Continue(()))
    }

    /// Handle a regular-file entry whose key is `key`.
    fn visit_file(&mut self, path: &Path, key: &str) -> io::Result<ControlFlow<()>> {
        if !key.starts_with(self.prefix) || key <= self.marker {
            return Ok(ControlFlow::Continue(()));
        }

        if let Some(cp) = self.common_prefix_of(key) {
            if cp == self.marker {
                // Group already returned in full.
                return Ok(ControlFlow::Continue(()));
            }
            return Ok(self.emit_common_prefix(cp));
        }

        if (self.is_object)(path)? {
            return self.emit_object(key.to_owned(), path);
        }
        Ok(ControlFlow::Continue(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;

    /// Build a tree from `files` (regular files) and `dirs` (empty dirs).
    fn build_tree(root: &Path, files: &[&str], dirs: &[&str]) {
        for f in files {
            let path = root.join(f);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdirs");
            fs::write(&path, b"data").expect("write");
        }
        for d in dirs {
            fs::create_dir_all(root.join(d)).expect("mkdirs");
        }
    }

    /// Every regular file is an object; directories only when listed in
    /// `dir_objects` (relative paths).
    fn run_walk(
        root: &Path,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        max_keys: usize,
        dir_objects: &[&str],
    ) -> WalkResults {
        let dir_objs: HashSet<std::path::PathBuf> =
            dir_objects.iter().map(|d| root.join(d)).collect();
        walk(
            root,
            prefix,
            delimiter,
            marker,
            max_keys,
            |p| {
                let meta = fs::symlink_metadata(p)?;
                Ok(!meta.is_dir() || dir_objs.contains(p))
            },
            |_| Ok("etag".to_owned()),
            &[crate::namespace::STAGING_DIR],
        )
        .expect("walk")
    }

    fn keys(results: &WalkResults) -> Vec<&str> {
        results.objects.iter().map(|o| o.key.as_str()).collect()
    }

    #[test]
    fn test_should_list_keys_in_lexicographic_order() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["a.txt", "a/b", "b"], &[]);

        let results = run_walk(tmp.path(), "", "", "", 1000, &[]);
        assert_eq!(keys(&results), vec!["a.txt", "a/b", "b"]);
        assert!(!results.truncated);
    }

    #[test]
    fn test_should_filter_by_prefix() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["logs/a", "logs/b", "data/c"], &[]);

        let results = run_walk(tmp.path(), "logs/", "", "", 1000, &[]);
        assert_eq!(keys(&results), vec!["logs/a", "logs/b"]);
    }

    #[test]
    fn test_should_group_by_delimiter() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["a", "b/1", "b/2", "c"], &[]);

        let results = run_walk(tmp.path(), "", "/", "", 1000, &[]);
        assert_eq!(keys(&results), vec!["a", "c"]);
        assert_eq!(results.common_prefixes, vec!["b/"]);
    }

    #[test]
    fn test_should_truncate_at_max_keys() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["a", "b/1", "b/2", "c"], &[]);

        let results = run_walk(tmp.path(), "", "/", "", 1, &[]);
        assert_eq!(keys(&results), vec!["a"]);
        assert!(results.common_prefixes.is_empty());
        assert!(results.truncated);
        assert_eq!(results.next_marker, "a");
    }

    #[test]
    fn test_should_resume_after_marker() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["a", "b/1", "b/2", "c"], &[]);

        let results = run_walk(tmp.path(), "", "/", "a", 1000, &[]);
        assert_eq!(keys(&results), vec!["c"]);
        assert_eq!(results.common_prefixes, vec!["b/"]);
    }

    #[test]
    fn test_should_skip_group_fully_before_marker() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["a", "b/1", "b/2", "c"], &[]);

        let results = run_walk(tmp.path(), "", "/", "b/", 1000, &[]);
        assert_eq!(keys(&results), vec!["c"]);
        assert!(results.common_prefixes.is_empty());
    }

    #[test]
    fn test_should_resurface_group_when_marker_inside_it() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["a", "b/1", "b/3", "c"], &[]);

        let results = run_walk(tmp.path(), "", "/", "b/2", 1000, &[]);
        assert_eq!(keys(&results), vec!["c"]);
        assert_eq!(results.common_prefixes, vec!["b/"]);
    }

    #[test]
    fn test_should_count_prefixes_toward_max_keys() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["a", "b/1", "c"], &[]);

        let results = run_walk(tmp.path(), "", "/", "", 2, &[]);
        assert_eq!(keys(&results), vec!["a"]);
        assert_eq!(results.common_prefixes, vec!["b/"]);
        assert!(results.truncated);
        assert_eq!(results.next_marker, "b/");
    }

    #[test]
    fn test_should_return_empty_page_for_zero_max_keys() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["a"], &[]);

        let results = run_walk(tmp.path(), "", "", "", 0, &[]);
        assert!(results.objects.is_empty());
        assert!(!results.truncated);
    }

    #[test]
    fn test_should_prune_staging_subtree() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["a", ".sgwtmp/multipart/x/1", ".sgwtmp/t"], &[]);

        let results = run_walk(tmp.path(), "", "", "", 1000, &[]);
        assert_eq!(keys(&results), vec!["a"]);
    }

    #[test]
    fn test_should_hide_entries_failing_the_predicate() {
        let tmp = tempfile::tempdir().expect("tempdir");
        // `a/b` is a file but its parent `a` is an implicit directory: the
        // predicate rejects `a` (no marker), so only `a/b` lists.
        build_tree(tmp.path(), &["a/b"], &[]);

        let results = run_walk(tmp.path(), "", "", "", 1000, &[]);
        assert_eq!(keys(&results), vec!["a/b"]);
    }

    #[test]
    fn test_should_list_directory_key_objects() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["dir/child"], &[]);

        let results = run_walk(tmp.path(), "", "", "", 1000, &["dir"]);
        assert_eq!(keys(&results), vec!["dir/", "dir/child"]);
        assert_eq!(results.objects[0].size, 0);
    }

    #[test]
    fn test_should_group_directory_key_under_delimiter() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["dir/child"], &[]);

        let results = run_walk(tmp.path(), "", "/", "", 1000, &["dir"]);
        assert!(results.objects.is_empty());
        assert_eq!(results.common_prefixes, vec!["dir/"]);
    }

    #[test]
    fn test_should_list_under_prefix_inside_subdir() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["photos/2024/a.jpg", "photos/2025/b.jpg"], &[]);

        let results = run_walk(tmp.path(), "photos/2024/", "/", "", 1000, &[]);
        assert_eq!(keys(&results), vec!["photos/2024/a.jpg"]);
        assert!(results.common_prefixes.is_empty());
    }

    #[test]
    fn test_should_paginate_through_groups() {
        let tmp = tempfile::tempdir().expect("tempdir");
        build_tree(tmp.path(), &["a/1", "b/1", "c/1"], &[]);

        // Page 1.
        let page1 = run_walk(tmp.path(), "", "/", "", 2, &[]);
        assert_eq!(page1.common_prefixes, vec!["a/", "b/"]);
        assert!(page1.truncated);
        assert_eq!(page1.next_marker, "b/");

        // Page 2 resumes after the last group.
        let page2 = run_walk(tmp.path(), "", "/", &page1.next_marker, 2, &[]);
        assert_eq!(page2.common_prefixes, vec!["c/"]);
        assert!(!page2.truncated);
    }
}
