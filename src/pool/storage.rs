//! On-disk cache: file naming and construction-time loading.
//!
//! Loading never fails: a missing file is an empty state, a corrupt file
//! is skipped. Simple and detail files hold the upstream bytes verbatim;
//! only `hosts.json` is re-serialized (pretty) by us.

use std::path::Path;

use log::debug;

use crate::config::{DETAIL_FILE_SUFFIX, HOSTS_FILE};

use super::types::{DetailFile, DetailPool, DirectoryResponse, IpPool};

/// Maps a hostname to a safe file stem: every character outside
/// `[A-Za-z0-9_-]` becomes `_`. Deterministic and idempotent.
pub fn sanitize_host(host: &str) -> String {
    host.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// File name of a host's simple pool.
pub(crate) fn simple_file_name(host: &str) -> String {
    format!("{}.json", sanitize_host(host))
}

/// File name of a host's detail pool.
pub(crate) fn detail_file_name(host: &str) -> String {
    format!("{}{}.json", sanitize_host(host), DETAIL_FILE_SUFFIX)
}

pub(crate) fn load_hosts(data_dir: &Path) -> Option<DirectoryResponse> {
    let path = data_dir.join(HOSTS_FILE);
    let bytes = std::fs::read(&path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(directory) => Some(directory),
        Err(err) => {
            debug!("skipping corrupt {}: {err}", path.display());
            None
        }
    }
}

pub(crate) fn load_simple(data_dir: &Path, host: &str) -> Option<IpPool> {
    let path = data_dir.join(simple_file_name(host));
    let bytes = std::fs::read(&path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(pool) => Some(pool),
        Err(err) => {
            debug!("skipping corrupt {}: {err}", path.display());
            None
        }
    }
}

pub(crate) fn load_detail(data_dir: &Path, host: &str) -> Option<DetailPool> {
    let path = data_dir.join(detail_file_name(host));
    let bytes = std::fs::read(&path).ok()?;
    match serde_json::from_slice::<DetailFile>(&bytes) {
        Ok(file) => Some(file.into_pool()),
        Err(err) => {
            debug!("skipping corrupt {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_host() {
        assert_eq!(sanitize_host("kh.google.com"), "kh_google_com");
        assert_eq!(sanitize_host("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_host("host:8080"), "host_8080");
    }

    #[test]
    fn test_sanitize_host_keeps_allowed_chars() {
        assert_eq!(sanitize_host("ab-CD_09"), "ab-CD_09");
    }

    #[test]
    fn test_sanitize_host_idempotent() {
        for host in ["kh.google.com", "a/b\\c", "host:8080", "日本.example"] {
            let once = sanitize_host(host);
            assert_eq!(sanitize_host(&once), once);
        }
    }

    #[test]
    fn test_file_names() {
        assert_eq!(simple_file_name("kh.google.com"), "kh_google_com.json");
        assert_eq!(
            detail_file_name("kh.google.com"),
            "kh_google_com_detail.json"
        );
    }

    #[test]
    fn test_load_missing_files_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_hosts(dir.path()).is_none());
        assert!(load_simple(dir.path(), "kh.google.com").is_none());
        assert!(load_detail(dir.path(), "kh.google.com").is_none());
    }

    #[test]
    fn test_load_corrupt_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(HOSTS_FILE), b"{ not json").unwrap();
        assert!(load_hosts(dir.path()).is_none());
    }
}
