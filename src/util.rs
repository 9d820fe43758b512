use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

pub fn looks_like_gzip<R: Read + Seek>(mut r: R) -> io::Result<bool> {
    let mut magic = [0u8; 2];
    let pos = r.stream_position()?;
    let n = r.read(&mut magic)?;
    r.seek(SeekFrom::Start(pos))?;
    Ok(n >= 2 && magic == [0x1F, 0x8B])
}

pub fn open_file(path: &Path) -> io::Result<File> {
    std::fs::File::open(path)
}

/// `{dir}/{prefix}_{index}.{ext}`; no extension when `ext` is empty.
pub fn artifact_path(dir: &Path, prefix: &str, index: usize, ext: &str) -> PathBuf {
    if ext.is_empty() {
        dir.join(format!("{prefix}_{index}"))
    } else {
        dir.join(format!("{prefix}_{index}.{ext}"))
    }
}

/// Strips a trailing `\n` and then a trailing `\r`.
#[inline]
pub fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
