//! Saving merged PDFs to disk.

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Default download directory: the user's Downloads folder, else the current directory.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// First free path for `file_name` in `dir`: `name.pdf`, `name (1).pdf`, `name (2).pdf`, …
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
        _ => (file_name, String::new()),
    };
    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{stem} ({n}){ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// A `.part` file that is deleted on drop unless [`PartialFile::keep`] was called.
struct PartialFile {
    path: PathBuf,
    keep: bool,
}

impl PartialFile {
    fn for_target(target: &Path) -> Self {
        let mut path = target.to_path_buf().into_os_string();
        path.push(".part");
        Self {
            path: PathBuf::from(path),
            keep: false,
        }
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.keep {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "could not remove partial download");
                }
            }
        }
    }
}

/// Stream `body` into `dir/file_name` without overwriting anything.
///
/// Bytes land in a `.part` file that is renamed once the stream ends cleanly. Any failure
/// after the `.part` file is created removes it.
pub async fn save_stream<S, E>(dir: &Path, file_name: &str, mut body: S) -> Result<PathBuf>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("create download directory {}", dir.display()))?;

    let target = unique_path(dir, file_name);
    let partial = PartialFile::for_target(&target);
    let mut out = tokio::fs::File::create(&partial.path)
        .await
        .with_context(|| format!("create {}", partial.path.display()))?;

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("download interrupted")?;
        out.write_all(&chunk)
            .await
            .with_context(|| format!("write {}", partial.path.display()))?;
        written += chunk.len() as u64;
    }
    out.flush().await.context("flush download")?;
    drop(out);

    tokio::fs::rename(&partial.path, &target)
        .await
        .with_context(|| format!("move download into place at {}", target.display()))?;
    partial.keep();
    tracing::info!(path = %target.display(), bytes = written, "saved merged pdf");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_path_never_reuses_existing_names() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_path(dir.path(), "out.pdf"), dir.path().join("out.pdf"));

        std::fs::write(dir.path().join("out.pdf"), b"x").unwrap();
        assert_eq!(
            unique_path(dir.path(), "out.pdf"),
            dir.path().join("out (1).pdf")
        );

        std::fs::write(dir.path().join("out (1).pdf"), b"x").unwrap();
        assert_eq!(
            unique_path(dir.path(), "out.pdf"),
            dir.path().join("out (2).pdf")
        );
    }

    #[tokio::test]
    async fn stream_is_written_and_renamed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("merged.pdf"), b"old").unwrap();

        let chunks: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"%PDF-1.7\n")),
            Ok(Bytes::from_static(b"%%EOF")),
        ];
        let path = save_stream(dir.path(), "merged.pdf", futures::stream::iter(chunks))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("merged (1).pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7\n%%EOF");
        assert_eq!(std::fs::read(dir.path().join("merged.pdf")).unwrap(), b"old");
        assert!(!dir.path().join("merged (1).pdf.part").exists());
    }

    #[tokio::test]
    async fn failed_stream_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let chunks: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"%PDF")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let err = save_stream(dir.path(), "x.pdf", futures::stream::iter(chunks))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("download interrupted"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_rename_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        // Occupy the target name with a non-empty directory while the body streams.
        let blocker = dir.path().join("x.pdf").join("inner");
        let chunks: Vec<std::result::Result<Bytes, std::io::Error>> =
            vec![Ok(Bytes::from_static(b"%PDF-1.7"))];
        let body = futures::stream::iter(chunks).inspect(move |_| {
            std::fs::create_dir_all(&blocker).unwrap();
        });

        let err = save_stream(dir.path(), "x.pdf", body).await.unwrap_err();
        assert!(format!("{err:#}").contains("move download into place"));
        assert!(!dir.path().join("x.pdf.part").exists());
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, ["x.pdf"]);
    }

    #[test]
    fn partial_file_is_removed_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.pdf");

        let partial = PartialFile::for_target(&target);
        std::fs::write(&partial.path, b"%PDF").unwrap();
        assert_eq!(partial.path, dir.path().join("a.pdf.part"));
        drop(partial);
        assert!(!dir.path().join("a.pdf.part").exists());

        let partial = PartialFile::for_target(&target);
        std::fs::write(&partial.path, b"%PDF").unwrap();
        partial.keep();
        assert!(dir.path().join("a.pdf.part").exists());
    }
}
