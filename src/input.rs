//! Target URL list loading.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// One row of the pages CSV. Extra columns are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PageEntry {
    pub url: String,
}

/// Read the target URL list from a CSV file with a `url` column.
///
/// Rows with an empty `url` cell are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a row is malformed.
pub fn read_pages(path: &Path) -> Result<Vec<PageEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open pages CSV: {}", path.display()))?;

    let mut pages = Vec::new();
    for row in reader.deserialize() {
        let entry: PageEntry =
            row.with_context(|| format!("Malformed row in {}", path.display()))?;
        if !entry.url.trim().is_empty() {
            pages.push(entry);
        }
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write csv");
        file
    }

    #[test]
    fn test_read_pages() {
        let file = write_csv("url\nhttps://example.com/\nhttps://example.org/about\n");
        let pages = read_pages(file.path()).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].url, "https://example.com/");
        assert_eq!(pages[1].url, "https://example.org/about");
    }

    #[test]
    fn test_extra_columns_ignored() {
        let file = write_csv("name,url\nhome,https://example.com/\n");
        let pages = read_pages(file.path()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].url, "https://example.com/");
    }

    #[test]
    fn test_blank_url_skipped() {
        let file = write_csv("url\nhttps://example.com/\n\"\"\n");
        let pages = read_pages(file.path()).unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(read_pages(Path::new("./no-such-file.csv")).is_err());
    }
}
