use crate::error::{ImportError, Result};
use log::debug;
use reqwest::{Client, Url};
use std::path::PathBuf;

/// Local directory served under `/static` that images are re-hosted into.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
    public_url: String,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// URL this server serves `filename` under.
    pub fn public_url_for(&self, filename: &str) -> String {
        format!("{}/static/{}", self.public_url, filename)
    }

    /// Downloads `url` into the store, keyed by its original filename, and
    /// returns the URL it is served from. An existing file with the same name
    /// is overwritten.
    pub async fn rehost(&self, client: &Client, url: &Url) -> Result<String> {
        let filename = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ImportError::InvalidReference {
                source_name: "image",
                reference: url.to_string(),
            })?
            .to_string();

        let response = client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::UpstreamFetch {
                url: url.to_string(),
                status,
            });
        }
        let bytes = response.bytes().await?;

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(&filename);
        tokio::fs::write(&path, &bytes).await?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());

        Ok(self.public_url_for(&filename))
    }
}

/// Makes an image reference absolute. Protocol-relative references get
/// `https:`, site-relative ones are joined onto `site`.
pub fn resolve_image_url(image: &str, site: &str) -> Result<Url> {
    let image = image.trim();
    let invalid = || ImportError::InvalidReference {
        source_name: "image",
        reference: image.to_string(),
    };

    if let Some(rest) = image.strip_prefix("//") {
        return Url::parse(&format!("https://{}", rest)).map_err(|_| invalid());
    }
    if let Ok(url) = Url::parse(image) {
        return Ok(url);
    }
    Url::parse(site)
        .and_then(|base| base.join(image))
        .map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_protocol_relative() {
        let url = resolve_image_url("//images.mathem.se/recipes/pizza.jpg", "https://www.mathem.se")
            .unwrap();
        assert_eq!(url.as_str(), "https://images.mathem.se/recipes/pizza.jpg");
    }

    #[test]
    fn test_resolve_relative() {
        let url = resolve_image_url("/media/pizza.jpg", "https://www.mathem.se").unwrap();
        assert_eq!(url.as_str(), "https://www.mathem.se/media/pizza.jpg");
    }

    #[test]
    fn test_resolve_absolute_is_untouched() {
        let url = resolve_image_url("https://cdn.example.com/a.png", "https://www.mathem.se")
            .unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a.png");
    }

    #[test]
    fn test_public_url_for() {
        let store = AssetStore::new("static", "http://192.168.1.10:8000/");
        assert_eq!(
            store.public_url_for("pizza.jpg"),
            "http://192.168.1.10:8000/static/pizza.jpg"
        );
    }

    #[tokio::test]
    async fn test_rehost_writes_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/images/scones.jpg")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(b"jpeg-bytes".to_vec())
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path(), "http://localhost:8000");
        let url = Url::parse(&format!("{}/images/scones.jpg", server.url())).unwrap();

        let hosted = store.rehost(&Client::new(), &url).await.unwrap();
        assert_eq!(hosted, "http://localhost:8000/static/scones.jpg");
        assert_eq!(
            std::fs::read(dir.path().join("scones.jpg")).unwrap(),
            b"jpeg-bytes"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rehost_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.jpg")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path(), "http://localhost:8000");
        let url = Url::parse(&format!("{}/missing.jpg", server.url())).unwrap();

        let err = store.rehost(&Client::new(), &url).await.unwrap_err();
        assert!(matches!(err, ImportError::UpstreamFetch { status, .. } if status.as_u16() == 404));
        assert!(!dir.path().join("missing.jpg").exists());
    }
}
