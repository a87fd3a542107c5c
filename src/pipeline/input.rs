//! Input validation: check each path is a readable PDF before decoding.
//!
//! pdfium reports a missing or non-PDF file as a generic load failure, so
//! the `%PDF` magic is checked up front to give a precise error instead.

use crate::error::CvError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Check `path` exists, is readable, and starts with `%PDF`.
pub fn validate_pdf(path: &Path) -> Result<(), CvError> {
    if !path.exists() {
        return Err(CvError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(CvError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(CvError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = [0u8; 4];
    let read = file.read(&mut magic).unwrap_or(0);
    if read < magic.len() || &magic != b"%PDF" {
        return Err(CvError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }

    debug!("Validated PDF: {}", path.display());
    Ok(())
}

/// Expand the user's arguments into an ordered list of PDF files.
///
/// Files are kept in argument order. A directory expands to the `*.pdf`
/// files directly inside it, sorted by name.
pub fn collect_inputs(args: &[PathBuf]) -> Result<Vec<PathBuf>, CvError> {
    let mut files = Vec::new();

    for arg in args {
        if arg.is_dir() {
            let entries = std::fs::read_dir(arg).map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => CvError::PermissionDenied {
                    path: arg.clone(),
                },
                _ => CvError::FileNotFound { path: arg.clone() },
            })?;
            let mut pdfs: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_pdf_extension(p))
                .collect();
            pdfs.sort();
            debug!("{}: {} PDFs", arg.display(), pdfs.len());
            files.extend(pdfs);
        } else {
            files.push(arg.clone());
        }
    }

    Ok(files)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
