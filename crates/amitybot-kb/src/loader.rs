//! Loads knowledge-base documents from the data directory.
//!
//! `.txt` and `.md` files are read as UTF-8 (lossily). A `.pdf` is parsed
//! directly unless the upload path already wrote a `<name>.pdf.txt`
//! sidecar next to it, in which case the sidecar is the document.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::Result;
use crate::extract::extract_pdf_text;
use crate::models::KbDocument;

/// Load every supported document under `data_dir`, recursively.
///
/// A missing directory yields no documents. Files that fail to load are
/// logged and skipped.
pub fn load_documents(data_dir: &Path) -> Result<Vec<KbDocument>> {
    if !data_dir.exists() {
        warn!(dir = %data_dir.display(), "Data directory not found");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    collect_files(data_dir, &mut files)?;
    files.sort();

    let mut docs = Vec::new();
    let (mut txt, mut pdf) = (0usize, 0usize);

    for path in files {
        let ext = extension_of(&path);
        let text = match ext.as_str() {
            "txt" | "md" => match std::fs::read(&path) {
                Ok(bytes) => {
                    txt += 1;
                    String::from_utf8_lossy(&bytes).into_owned()
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read text document");
                    continue;
                }
            },
            "pdf" => {
                if sidecar_path(&path).exists() {
                    continue;
                }
                match std::fs::read(&path).map_err(Into::into).and_then(|b| extract_pdf_text(&b)) {
                    Ok(text) => {
                        pdf += 1;
                        text
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to load PDF document");
                        continue;
                    }
                }
            }
            _ => continue,
        };

        let source = path
            .strip_prefix(data_dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        docs.push(KbDocument::new(source, text));
    }

    info!(txt, pdf, total = docs.len(), "Loaded knowledge base documents");
    Ok(docs)
}

/// `<file>.txt` next to `path`, where extracted text is kept.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".txt");
    PathBuf::from(s)
}

pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_text_and_markdown_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("about.txt"), "Amity University is in Noida.").unwrap();
        std::fs::create_dir(dir.path().join("faq")).unwrap();
        std::fs::write(dir.path().join("faq/fees.md"), "# Fees\nFees are due in July.").unwrap();
        std::fs::write(dir.path().join("logo.png"), [0u8, 1, 2]).unwrap();

        let docs = load_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source, "about.txt");
        assert_eq!(docs[1].source, "faq/fees.md");
        assert!(docs[1].text.contains("July"));
    }

    #[test]
    fn test_pdf_with_sidecar_is_not_parsed_twice() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("brochure.pdf");
        std::fs::write(&pdf, b"not really a pdf").unwrap();
        std::fs::write(sidecar_path(&pdf), "Extracted brochure text").unwrap();

        let docs = load_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "brochure.pdf.txt");
    }

    #[test]
    fn test_broken_pdf_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"garbage").unwrap();
        std::fs::write(dir.path().join("ok.txt"), "fine").unwrap();
        let docs = load_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let docs = load_documents(Path::new("/definitely/not/here")).unwrap();
        assert!(docs.is_empty());
    }
}
