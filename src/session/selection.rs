//! Candidate local files and batch validation.

use crate::format::format_size;
use crate::notify::Notice;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const PDF_MIME: &str = "application/pdf";
/// Per-file size ceiling (50 MiB).
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
/// Maximum number of files in one session.
pub const MAX_FILES: usize = 10;

/// A local file the user picked or dropped, before upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalFile {
    pub path: PathBuf,
    pub name: String,
    pub mime: String,
    pub size: u64,
}

impl LocalFile {
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            path: path.to_path_buf(),
            name,
            mime,
            size: meta.len(),
        })
    }
}

/// Turn user-supplied paths into candidates.
///
/// Directories contribute their `*.pdf` entries sorted by name; unreadable paths become
/// error notices and are skipped.
pub fn collect_candidates(paths: &[PathBuf]) -> (Vec<LocalFile>, Vec<Notice>) {
    let mut files = Vec::new();
    let mut notices = Vec::new();

    for path in paths {
        if path.is_dir() {
            match pdfs_in_dir(path) {
                Ok(entries) if entries.is_empty() => {
                    notices.push(Notice::warning(format!(
                        "{}: no PDF files in folder",
                        path.display()
                    )));
                }
                Ok(entries) => {
                    for entry in entries {
                        push_candidate(&entry, &mut files, &mut notices);
                    }
                }
                Err(e) => notices.push(Notice::error(format!("{}: {e}", path.display()))),
            }
        } else {
            push_candidate(path, &mut files, &mut notices);
        }
    }

    (files, notices)
}

fn push_candidate(path: &Path, files: &mut Vec<LocalFile>, notices: &mut Vec<Notice>) {
    match LocalFile::from_path(path) {
        Ok(f) => files.push(f),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read candidate");
            notices.push(Notice::error(format!("{}: {e}", path.display())));
        }
    }
}

fn pdfs_in_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if path.is_file() && is_pdf {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Outcome of validating one batch.
#[derive(Debug, Default)]
pub struct BatchValidation {
    pub accepted: Vec<LocalFile>,
    pub notices: Vec<Notice>,
}

/// Validate a batch against type, size and the session cap.
///
/// `existing` is the number of files the session already holds.
pub fn validate_batch(candidates: Vec<LocalFile>, existing: usize) -> BatchValidation {
    let mut out = BatchValidation::default();

    for file in candidates {
        if existing + out.accepted.len() >= MAX_FILES {
            out.notices.push(Notice::error(format!(
                "Maximum {MAX_FILES} files allowed; {} was not added",
                file.name
            )));
            break;
        }
        if file.mime != PDF_MIME {
            out.notices.push(Notice::error(format!(
                "{} is not a PDF file",
                file.name
            )));
            continue;
        }
        if file.size > MAX_FILE_SIZE {
            out.notices.push(Notice::error(format!(
                "{} is too large ({}); the limit is {}",
                file.name,
                format_size(file.size),
                format_size(MAX_FILE_SIZE)
            )));
            continue;
        }
        out.accepted.push(file);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoticeLevel;

    fn pdf(name: &str, size: u64) -> LocalFile {
        LocalFile {
            path: PathBuf::from(name),
            name: name.to_string(),
            mime: PDF_MIME.to_string(),
            size,
        }
    }

    #[test]
    fn wrong_type_is_rejected_and_batch_continues() {
        let png = LocalFile {
            mime: "image/png".into(),
            ..pdf("scan.png", 10)
        };
        let out = validate_batch(vec![png, pdf("a.pdf", 10)], 0);
        assert_eq!(out.accepted.len(), 1);
        assert_eq!(out.accepted[0].name, "a.pdf");
        assert_eq!(out.notices.len(), 1);
        assert_eq!(out.notices[0].level, NoticeLevel::Error);
        assert!(out.notices[0].message.contains("scan.png"));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let out = validate_batch(
            vec![pdf("big.pdf", MAX_FILE_SIZE + 1), pdf("edge.pdf", MAX_FILE_SIZE)],
            0,
        );
        assert_eq!(out.accepted.len(), 1);
        assert_eq!(out.accepted[0].name, "edge.pdf");
        assert!(out.notices[0].message.contains("too large"));
    }

    #[test]
    fn cap_stops_the_batch() {
        let batch: Vec<_> = (0..4).map(|i| pdf(&format!("{i}.pdf"), 1)).collect();
        let out = validate_batch(batch, 8);
        assert_eq!(out.accepted.len(), 2);
        assert_eq!(out.notices.len(), 1);
        assert!(out.notices[0].message.contains("Maximum 10"));
    }

    #[test]
    fn candidates_from_disk_and_folders() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("b.pdf");
        let b = dir.path().join("a.PDF");
        let txt = dir.path().join("notes.txt");
        std::fs::write(&a, b"%PDF-1.4").unwrap();
        std::fs::write(&b, b"%PDF-1.4").unwrap();
        std::fs::write(&txt, b"hello").unwrap();

        let (files, notices) = collect_candidates(&[dir.path().to_path_buf()]);
        assert!(notices.is_empty());
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
        assert!(files.iter().all(|f| f.mime == PDF_MIME));
        assert_eq!(files[0].size, 8);

        let (files, notices) =
            collect_candidates(&[txt.clone(), dir.path().join("missing.pdf")]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].mime, "text/plain");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }
}
