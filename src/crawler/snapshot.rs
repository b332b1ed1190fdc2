//! Raw markup and screenshot snapshots

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

/// File stem for a URL's snapshots (first 16 bytes of its SHA-256, hex)
pub fn snapshot_stem(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    hex::encode(&digest[..16])
}

/// Writes the page markup to `<dir>/<stem>.html`
pub async fn save_html(dir: &Path, url: &Url, html: &str) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.html", snapshot_stem(url)));
    tokio::fs::write(&path, html).await?;
    Ok(path)
}

/// Path a screenshot of `url` is written to; creates the directory
pub async fn screenshot_path(dir: &Path, url: &Url) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(dir.join(format!("{}.png", snapshot_stem(url))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stem_is_stable() {
        let url = Url::parse("https://example.com/a").unwrap();
        let stem = snapshot_stem(&url);
        assert_eq!(stem.len(), 32);
        assert_eq!(stem, snapshot_stem(&url));
        assert_ne!(
            stem,
            snapshot_stem(&Url::parse("https://example.com/b").unwrap())
        );
    }

    #[tokio::test]
    async fn test_save_html_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested/snapshots");
        let url = Url::parse("https://example.com/").unwrap();

        let path = save_html(&dir, &url, "<html></html>").await.unwrap();

        assert!(path.starts_with(&dir));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<html></html>");
    }
}
