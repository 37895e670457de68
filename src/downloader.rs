use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::api::MixBackend;
use crate::core::filename;

/// A download the controller decided to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    /// Absolute `/api/stream_download` URL, attachment disposition.
    pub url: String,
    pub title: String,
    /// Suggested file name, `"<title>.mp3"`.
    pub filename: String,
}

/// Streams `job` into `dir` and returns the written path.
///
/// A filename announced by the server wins over the suggested one. Existing
/// files are never overwritten; a ` (n)` suffix is added instead. An empty
/// body counts as a failed download and leaves no file behind.
pub fn run(backend: &dyn MixBackend, job: &DownloadJob, dir: &Path) -> Result<PathBuf> {
    let mut body = backend
        .open_stream(&job.url)
        .with_context(|| format!("could not start download of {:?}", job.title))?;

    let name = body
        .filename
        .as_deref()
        .and_then(filename::sanitize_filename)
        .unwrap_or_else(|| job.filename.clone());

    std::fs::create_dir_all(dir)
        .with_context(|| format!("could not create {}", dir.display()))?;
    let (path, mut file) = create_unique(dir, &name)
        .with_context(|| format!("could not create {} in {}", name, dir.display()))?;

    let copied = std::io::copy(&mut body.reader, &mut file);
    drop(file);
    match copied {
        Ok(0) => {
            let _ = std::fs::remove_file(&path);
            bail!("server sent an empty stream for {:?}", job.title)
        }
        Ok(bytes) => {
            log::info!("downloaded {} ({} bytes)", path.display(), bytes);
            Ok(path)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&path);
            Err(e).with_context(|| format!("download of {:?} was interrupted", job.title))
        }
    }
}

/// Creates `dir/name`, or `dir/stem (n).ext` for the first `n` nobody else
/// has claimed. The file is created atomically, so two downloads of the same
/// title never share a file.
pub fn create_unique(dir: &Path, name: &str) -> io::Result<(PathBuf, File)> {
    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let ext = as_path.extension().and_then(|e| e.to_str());

    for n in 0u32.. {
        let candidate = match (n, ext) {
            (0, _) => dir.join(name),
            (n, Some(ext)) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            (n, None) => dir.join(format!("{} ({})", stem, n)),
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {}", name),
    ))
}
