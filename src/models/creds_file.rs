//! Credentials-file model for bulk import and backup.
//!
//! JSON shape: `{"creds_list": [{"service", "username", "password"}]}`.

use crate::constants;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileCred {
    pub service: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredsFile {
    #[serde(default)]
    creds_list: Vec<FileCred>,
}

pub fn read_creds_file(path: &Path) -> Result<Vec<FileCred>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("read credentials file {}", path.display()))?;
    let file: CredsFile = serde_json::from_str(&content)
        .with_context(|| format!("parse credentials file {}", path.display()))?;
    Ok(file.creds_list)
}

/// Write a credentials file atomically with owner-only permissions; it
/// holds plaintext secrets.
pub fn write_creds_file(path: &Path, creds: &[FileCred]) -> Result<()> {
    let file = CredsFile {
        creds_list: creds.to_vec(),
    };
    let content = serde_json::to_string_pretty(&file).context("serialize credentials file")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let mut tmp = tempfile::NamedTempFile::new_in(
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new(".")),
    )
    .context("create temp credentials file")?;
    tmp.write_all(content.as_bytes())
        .context("write credentials file")?;
    tmp.flush().ok();

    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(constants::SECRET_FILE_MODE);
        tmp.as_file()
            .set_permissions(perm)
            .context("set permissions on temp credentials file")?;
    }

    tmp.persist(path)
        .map_err(|err| anyhow::anyhow!("persist credentials file: {}", err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Vec<FileCred> {
        vec![
            FileCred {
                service: "gmail".into(),
                username: "alice".into(),
                password: "pw1".into(),
            },
            FileCred {
                service: "slack".into(),
                username: "bob".into(),
                password: "pw2".into(),
            },
        ]
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        write_creds_file(&path, &sample()).unwrap();
        assert_eq!(read_creds_file(&path).unwrap(), sample());
    }

    #[test]
    fn test_reads_original_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        fs::write(
            &path,
            r#"{"creds_list": [{"service": "gmail", "username": "alice", "password": "pw1"}]}"#,
        )
        .unwrap();
        let creds = read_creds_file(&path).unwrap();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].service, "gmail");
    }

    #[test]
    fn test_empty_list_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        write_creds_file(&path, &[]).unwrap();
        assert!(read_creds_file(&path).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_file_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        fs::write(&path, "not json").unwrap();
        assert!(read_creds_file(&path).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_owner_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        write_creds_file(&path, &sample()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, constants::SECRET_FILE_MODE);
    }
}
