use paperseek_common::Result;
use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sibling path used while a file is being written
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("index"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to a temp sibling, fsync, then rename over `path`
///
/// On failure the temp sibling is removed and `path` keeps its old content.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let written = File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| std::fs::rename(&tmp, path));

    if let Err(e) = written {
        // drop the partial sibling
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_path_keeps_full_name() {
        assert_eq!(
            temp_path(Path::new("/data/title.index")),
            PathBuf::from("/data/title.index.tmp")
        );
    }

    #[test]
    fn test_write_atomic_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.bin");
        write_atomic(&path, b"abc").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_write_atomic_failure_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory cannot be replaced by a file
        let path = dir.path().join("title.index");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        assert!(write_atomic(&path, b"abc").is_err());
        assert!(!temp_path(&path).exists());
        assert!(path.join("keep").exists());
    }
}
