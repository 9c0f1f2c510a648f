//! Local asset client
//!
//! The overlay addresses its sound effects with page-relative URLs such as
//! `sfx/weaponjam/jam1.wav`. On desktop those resolve against an asset
//! directory instead of a web origin.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Serves relative URLs from a directory, answering like a static file
/// server: 200 with the file body, 404 when missing, 403 for paths that
/// escape the root.
#[derive(Debug, Clone)]
pub struct LocalAssetClient {
    root: PathBuf,
}

impl LocalAssetClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a relative URL onto the asset root. `None` for absolute paths
    /// and parent-directory components.
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let relative = url.split(['?', '#']).next().unwrap_or_default();
        let relative = Path::new(relative.trim_start_matches("./"));

        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }
}

#[async_trait]
impl HttpClient for LocalAssetClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let Some(path) = self.resolve(&request.url) else {
            return Ok(HttpResponse::new(403, Bytes::new()));
        };

        debug!(url = %request.url, path = %path.display(), "Reading local asset");

        match tokio::fs::read(&path).await {
            Ok(contents) => {
                let body = match request.method {
                    HttpMethod::Get => Bytes::from(contents),
                    HttpMethod::Head => Bytes::new(),
                };
                Ok(HttpResponse::new(200, body))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HttpResponse::new(404, Bytes::new())),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Ok(HttpResponse::new(403, Bytes::new()))
            }
            Err(e) => Err(BridgeError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_files_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sfx/weaponjam")).unwrap();
        std::fs::write(dir.path().join("sfx/weaponjam/jam1.wav"), b"RIFF").unwrap();

        let client = LocalAssetClient::new(dir.path());
        let body = client.fetch_bytes("sfx/weaponjam/jam1.wav").await.unwrap();
        assert_eq!(body, Bytes::from_static(b"RIFF"));
    }

    #[tokio::test]
    async fn missing_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let client = LocalAssetClient::new(dir.path());
        let response = client
            .execute(HttpRequest::get("sfx/weaponjam/nope.wav"))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn parent_components_are_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let client = LocalAssetClient::new(dir.path());
        let response = client
            .execute(HttpRequest::get("../etc/passwd"))
            .await
            .unwrap();
        assert_eq!(response.status, 403);
    }

    #[test]
    fn query_string_is_ignored() {
        let client = LocalAssetClient::new("/assets");
        assert_eq!(
            client.resolve("sfx/a.wav?v=2"),
            Some(PathBuf::from("/assets/sfx/a.wav"))
        );
    }
}
