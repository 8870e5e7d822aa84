//! Blob storage for published artifacts
//!
//! Artifacts are addressed by object key (`{prefix}/{subject}/{file}`). In
//! production the keys live in a public bucket; locally (and in tests) a
//! mirror directory with the same layout stands in for it.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::{RunConfig, StoreTarget};
use crate::{DataError, Result};

#[allow(async_fn_in_trait)]
pub trait BlobStore {
    /// Write `body` under `key`, replacing any previous object.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()>;

    /// Read `key`; an absent object is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;
}

/// A directory laid out like the bucket.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty() && *part != "..")
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &body)?;
        debug!(key, path = %path.display(), bytes = body.len(), "stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        match fs::read(self.path_for(key)) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Uploads with `PUT {endpoint}/{bucket}/{key}`, reads from the public site.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: Client,
    endpoint: String,
    bucket: String,
    public_base_url: String,
    token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn upload_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

impl BlobStore for HttpBlobStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let mut request = self
            .client
            .put(self.upload_url(key))
            .header(CONTENT_TYPE, HeaderValue::from_str(content_type)?)
            .body(body);
        if let Some(token) = &self.token {
            let bearer = HeaderValue::from_str(&format!("Bearer {}", token))?;
            request = request.header(AUTHORIZATION, bearer);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Store {
                key: key.to_string(),
                message: format!("upload returned {}", status),
            });
        }
        debug!(key, "uploaded object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let response = self.client.get(self.public_url(key)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => Ok(Some(response.bytes().await?)),
            status => Err(DataError::Store {
                key: key.to_string(),
                message: format!("download returned {}", status),
            }),
        }
    }
}

/// The store selected by configuration.
#[derive(Debug, Clone)]
pub enum Store {
    Local(LocalBlobStore),
    Http(HttpBlobStore),
}

impl Store {
    pub fn from_config(config: &RunConfig, client: Client) -> Self {
        match &config.store {
            StoreTarget::Local { dir } => Store::Local(LocalBlobStore::new(dir.clone())),
            StoreTarget::Http { endpoint, token } => Store::Http(HttpBlobStore::new(
                client,
                endpoint.clone(),
                config.bucket.clone(),
                config.public_base_url.clone(),
                token.clone(),
            )),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Store::Local(s) => format!("local mirror {}", s.root().display()),
            Store::Http(s) => format!("bucket {} via {}", s.bucket, s.endpoint),
        }
    }
}

impl BlobStore for Store {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        match self {
            Store::Local(s) => s.put(key, body, content_type).await,
            Store::Http(s) => s.put(key, body, content_type).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        match self {
            Store::Local(s) => s.get(key).await,
            Store::Http(s) => s.get(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_local_put_then_get() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());

        store
            .put("dodgers/data/roster/x.json", Bytes::from_static(b"[]"), "application/json")
            .await
            .unwrap();

        assert!(dir.path().join("dodgers/data/roster/x.json").exists());
        let read = store.get("dodgers/data/roster/x.json").await.unwrap();
        assert_eq!(read, Some(Bytes::from_static(b"[]")));
    }

    #[tokio::test]
    async fn test_local_missing_object_is_none() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());
        assert_eq!(store.get("nope/missing.parquet").await.unwrap(), None);
    }

    #[test]
    fn test_local_path_ignores_parent_segments() {
        let store = LocalBlobStore::new("/mirror");
        assert_eq!(store.path_for("../a//b.csv"), PathBuf::from("/mirror/a/b.csv"));
    }

    #[tokio::test]
    async fn test_http_put_uses_bucket_path_and_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/stilesdata.com/dodgers/data/standings/x.csv"))
            .and(header("authorization", "Bearer s3cret"))
            .and(header("content-type", "text/csv"))
            .and(body_string("gm\n1\n"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpBlobStore::new(
            Client::new(),
            server.uri(),
            "stilesdata.com",
            server.uri(),
            Some("s3cret".to_string()),
        );
        store
            .put("dodgers/data/standings/x.csv", Bytes::from_static(b"gm\n1\n"), "text/csv")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_http_put_failure_is_store_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let store = HttpBlobStore::new(Client::new(), server.uri(), "b", server.uri(), None);
        let err = store
            .put("k.json", Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Store { .. }));
    }

    #[tokio::test]
    async fn test_http_get_reads_public_url_and_maps_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dodgers/data/tweets/posted_transactions.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dodgers/data/missing.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = HttpBlobStore::new(Client::new(), "http://unused", "b", server.uri(), None);
        let found = store
            .get("dodgers/data/tweets/posted_transactions.json")
            .await
            .unwrap();
        assert_eq!(found, Some(Bytes::from_static(b"{}")));
        assert_eq!(store.get("dodgers/data/missing.json").await.unwrap(), None);
    }

    #[test]
    fn test_store_from_config_defaults_to_local_mirror() {
        let config = RunConfig::default();
        let store = Store::from_config(&config, Client::new());
        assert!(matches!(store, Store::Local(_)));
    }
}
