use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes `bytes` to a temporary sibling and renames it over `path`, so a
/// reader never sees a half-written asset. An existing file is replaced.
/// The temporary file is removed on every failure.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = tmp_path(path);

    if let Some(parent) = tmp.parent() {
        fs::create_dir_all(parent)?;
    }

    let result = fs::write(&tmp, bytes).and_then(|_| replace(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn replace(tmp: &Path, path: &Path) -> io::Result<()> {
    match fs::rename(tmp, path) {
        Ok(()) => Ok(()),
        // rename does not replace on every platform
        Err(_) if path.is_file() => {
            fs::remove_file(path)?;
            fs::rename(tmp, path)
        }
        Err(e) => Err(e),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file_name = match path.file_name().and_then(|s| s.to_str()) {
        Some(n) => n.to_string(),
        None => "asset".to_string(),
    };
    p.set_file_name(format!(".{file_name}.tmp"));
    p
}
