//! `gatherer titles`: look papers up by title.

use super::*;

/// Options for [`Commands::Titles`].
#[derive(Args, Clone, Debug)]
pub struct TitlesOptions {
  /// Paper titles
  #[arg(required_unless_present = "file")]
  pub titles: Vec<String>,

  /// Read titles from a file, one per line; blank lines and `#` comments are ignored
  #[arg(long, short)]
  pub file: Option<PathBuf>,

  /// Options shared by every command
  #[command(flatten)]
  pub common: CommonOptions,
}

impl TitlesOptions {
  /// Builds the title request from the arguments and the title file.
  pub fn request(&self) -> Result<Request> {
    let mut titles = self.titles.clone();
    if let Some(file) = &self.file {
      titles.extend(read_titles(&fs::read_to_string(file)?));
    }
    if titles.is_empty() {
      return Err(GathererdError::Usage("no titles given".into()));
    }
    Ok(Request::titles(titles))
  }
}

/// Non-empty, non-comment lines of a title list.
fn read_titles(content: &str) -> Vec<String> {
  content
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty() && !line.starts_with('#'))
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_read_titles() {
    let content = "# reading list\nAttention Is All You Need\n\n  BERT  \n";
    assert_eq!(read_titles(content), ["Attention Is All You Need", "BERT"]);
  }
}
