// Local file helpers used by the CLI: whole-file reads and writes plus a few
// path helpers that understand both `/` and `\` separators, since remote
// paths are plain strings and may come from either platform.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read a whole local file.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).with_context(|| format!("Cannot open file: {}", path.display()))
}

/// Create or truncate a local file and write `data` to it.
pub fn write_file(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, data).with_context(|| format!("Cannot create file: {}", path.display()))
}

/// Last component of `path`.
pub fn file_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Join two path fragments, reusing the separator style of `base`.
pub fn combine_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        return name.to_string();
    }
    if base.ends_with(['/', '\\']) {
        return format!("{}{}", base, name);
    }
    let separator = if base.contains('\\') { '\\' } else { '/' };
    format!("{}{}{}", base, separator, name)
}

/// Where a download of `remote_path` lands: `local_path` itself, or the
/// remote file name inside it when `local_path` is an existing directory.
pub fn download_target(local_path: &str, remote_path: &str) -> String {
    if Path::new(local_path).is_dir() {
        combine_path(local_path, file_name(remote_path))
    } else {
        local_path.to_string()
    }
}
