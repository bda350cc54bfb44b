use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

fn parent_dir_or_dot(path: &Path) -> &Path {
    // `Path::parent` is `Some("")` for a bare file name.
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Write `bytes` to `dest` through a synced temp file in the same directory, then rename it
/// into place. On failure the destination is left untouched.
pub fn atomic_write_bytes(dest: impl AsRef<Path>, bytes: &[u8]) -> io::Result<()> {
    let dest = dest.as_ref();
    let dir = parent_dir_or_dot(dest);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.as_file_mut().write_all(bytes)?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;

    tmp.into_temp_path().persist(dest).map_err(|err| err.error)?;

    // The file is already in place; a failed directory sync is not a write failure.
    let _ = sync_parent_dir(dest);
    Ok(())
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    File::open(parent_dir_or_dot(path))?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
