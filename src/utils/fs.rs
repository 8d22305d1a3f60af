use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

/// Writes `contents` next to `path` and renames it into place, so readers never observe a
/// partially written file and a failed write leaves the previous file untouched.
pub fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = staging_path(path);
    let result = (|| {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "clicktally".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn replaces_existing_file_without_leaving_staging_copy() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("regions.json");
        fs::write(&path, b"old").unwrap();

        write_atomically(&path, b"new").expect("write");

        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert!(!dir.path().join("regions.json.tmp").exists());
    }

    #[test]
    fn failed_write_keeps_previous_contents() {
        let dir = tempdir().expect("tempdir");
        // A directory sitting at the target path makes the final rename fail.
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep.txt"), b"kept").unwrap();

        assert!(write_atomically(&path, b"data").is_err());
        assert_eq!(fs::read(path.join("keep.txt")).unwrap(), b"kept");
        assert!(!dir.path().join("taken.tmp").exists());
    }
}
