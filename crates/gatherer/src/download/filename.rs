//! Mapping from paper titles to files in the PDF directory.

use super::*;

/// Directory name used when no PDF directory is configured.
pub const DEFAULT_PDF_DIR: &str = "pdfs";

/// Replaces every non-alphanumeric character of `title` with `_`.
///
/// ```
/// use gatherer::download::sanitize_title;
///
/// assert_eq!(sanitize_title("BERT: Pre-training"), "BERT__Pre_training");
/// ```
pub fn sanitize_title(title: &str) -> String {
  title.chars().map(|c| if c.is_alphanumeric() { c } else { '_' }).collect()
}

/// Location of the PDF for a paper titled `title` inside `dir`.
///
/// A title that sanitizes to nothing falls back to `fallback` (typically the entry URL) so
/// untitled papers do not all share one file.
pub fn pdf_path(dir: &Path, title: &str, fallback: &str) -> PathBuf {
  let name = if title.trim().is_empty() { sanitize_title(fallback) } else { sanitize_title(title) };
  let name = if name.is_empty() { "untitled".to_string() } else { name };
  dir.join(format!("{name}.pdf"))
}

/// Creates the PDF directory if needed and returns it. `None` means `./pdfs`.
pub fn ensure_pdf_dir(dir: Option<&Path>) -> Result<PathBuf> {
  let dir = match dir {
    Some(dir) => dir.to_path_buf(),
    None => std::env::current_dir()?.join(DEFAULT_PDF_DIR),
  };
  std::fs::create_dir_all(&dir)?;
  Ok(dir)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sanitize() {
    assert_eq!(sanitize_title("Attention Is All You Need"), "Attention_Is_All_You_Need");
    assert_eq!(sanitize_title("a/b\\c:d?.pdf"), "a_b_c_d__pdf");
    assert_eq!(sanitize_title("Über-Modèle"), "Über_Modèle");
  }

  #[test]
  fn test_pdf_path() {
    let dir = Path::new("/tmp/pdfs");
    assert_eq!(pdf_path(dir, "Deep Learning", "x"), dir.join("Deep_Learning.pdf"));
    assert_eq!(
      pdf_path(dir, "  ", "http://arxiv.org/abs/1"),
      dir.join("http___arxiv_org_abs_1.pdf")
    );
    assert_eq!(pdf_path(dir, "", ""), dir.join("untitled.pdf"));
  }

  #[test]
  fn test_ensure_pdf_dir_creates_nested() {
    let tmp = tempdir().unwrap();
    let target = tmp.path().join("a").join("b");
    assert_eq!(ensure_pdf_dir(Some(&target)).unwrap(), target);
    assert!(target.is_dir());
  }
}
