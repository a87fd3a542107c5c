//! PDF text-layer decoding via pdfium.
//!
//! Decoding is CPU-bound and pdfium is not async-safe, so the pipeline calls
//! [`PageDecoder::decode`] inside `tokio::task::spawn_blocking`. The trait is
//! the seam that lets tests feed fragments without a pdfium library.

use crate::error::CvError;
use crate::pipeline::input::validate_pdf;
use crate::pipeline::text::TextFragment;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming a directory that holds the pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Turns a PDF file into per-page positioned text fragments.
pub trait PageDecoder: Send + Sync {
    /// One inner `Vec` per page, in page order.
    fn decode(&self, path: &Path) -> Result<Vec<Vec<TextFragment>>, CvError>;
}

/// The production decoder.
#[derive(Default)]
pub struct PdfiumDecoder {
    password: Option<String>,
    library_dir: Option<PathBuf>,
}

impl PdfiumDecoder {
    pub fn new(password: Option<String>) -> Self {
        Self {
            password,
            library_dir: std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from),
        }
    }

    /// Look for the pdfium library in `dir` instead of `PDFIUM_LIB_PATH`.
    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }

    fn bind(&self) -> Result<Pdfium, CvError> {
        let bindings = match &self.library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| CvError::PdfiumBindingFailed(format!("{e:?}")))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageDecoder for PdfiumDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<Vec<TextFragment>>, CvError> {
        validate_pdf(path)?;
        let pdfium = self.bind()?;
        let password = self.password.as_deref();

        let document = pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| load_error(path, password.is_some(), e))?;

        let pages = document.pages();
        info!("{}: {} pages", path.display(), pages.len());

        let mut out = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let text_layer_failed = |e: PdfiumError| CvError::TextLayerFailed {
                path: path.to_path_buf(),
                page: idx + 1,
                detail: format!("{e:?}"),
            };
            let text = page.text().map_err(text_layer_failed)?;

            let fragments: Vec<TextFragment> = text
                .segments()
                .iter()
                .map(|segment| TextFragment::new(segment.text(), segment.bounds().bottom().value))
                .collect();
            debug!("Page {}: {} text segments", idx + 1, fragments.len());
            out.push(fragments);
        }

        Ok(out)
    }
}

fn load_error(path: &Path, had_password: bool, e: PdfiumError) -> CvError {
    let detail = format!("{e:?}");
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            CvError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            CvError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        CvError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

/// Decode on the blocking pool.
pub async fn decode_blocking(
    decoder: std::sync::Arc<dyn PageDecoder>,
    path: PathBuf,
) -> Result<Vec<Vec<TextFragment>>, CvError> {
    tokio::task::spawn_blocking(move || decoder.decode(&path))
        .await
        .map_err(|e| CvError::Internal(format!("Decode task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Fixed;

    impl PageDecoder for Fixed {
        fn decode(&self, _path: &Path) -> Result<Vec<Vec<TextFragment>>, CvError> {
            Ok(vec![vec![TextFragment::new("Jane Doe", 700.0)]])
        }
    }

    #[test]
    fn password_errors_are_classified() {
        let p = Path::new("cv.pdf");
        let e = load_error(p, false, PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ));
        assert!(matches!(e, CvError::PasswordRequired { .. }));
        let e = load_error(p, true, PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ));
        assert!(matches!(e, CvError::WrongPassword { .. }));
        let e = load_error(p, false, PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::FormatError,
        ));
        assert!(matches!(e, CvError::CorruptPdf { .. }));
    }

    #[tokio::test]
    async fn decode_runs_on_blocking_pool() {
        let pages = decode_blocking(Arc::new(Fixed), PathBuf::from("x.pdf"))
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0][0].text, "Jane Doe");
    }
}
