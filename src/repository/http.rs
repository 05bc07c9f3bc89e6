use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url, header};
use serde::{Deserialize, de::DeserializeOwned};

use std::time::Duration;

use super::{AuthClient, BlobStorage, ClientError, NoteRepository};
use crate::{
    config::BackendConfig,
    models::{ImageFile, NewNote, Note, User},
};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    path: String,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    url: String,
}

/// REST client for the managed backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
    media_prefix: String,
    signed_url_ttl: Duration,
}

impl HttpBackend {
    pub fn new(cfg: &BackendConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(cfg.request_timeout).build()?;
        let base_url = Url::parse(&cfg.base_url).map_err(|e| {
            ClientError::Config(format!("invalid base url '{}': {e}", cfg.base_url))
        })?;

        Ok(Self {
            client,
            base_url,
            api_token: cfg.api_token.clone(),
            media_prefix: cfg.media_prefix.clone(),
            signed_url_ttl: cfg.signed_url_ttl,
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::Config(format!("base url '{}' cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn storage_url(&self, path: &str) -> Result<Url, ClientError> {
        self.url(std::iter::once("storage").chain(path.split('/')))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        tracing::debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthenticated),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(response.url().path().to_string())),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(ClientError::Status { status, body })
            }
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl NoteRepository for HttpBackend {
    async fn list(&self) -> Result<Vec<Note>, ClientError> {
        let url = self.url(["notes"])?;
        let response = self.request(reqwest::Method::GET, url).send().await?;
        Self::decode(response).await
    }

    async fn create(&self, note: NewNote) -> Result<Note, ClientError> {
        let url = self.url(["notes"])?;
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&note)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let url = self.url(["notes", id])?;
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        Self::check(response).await.map(|_| ())
    }
}

#[async_trait]
impl BlobStorage for HttpBackend {
    async fn upload(&self, key: &str, file: &ImageFile) -> Result<String, ClientError> {
        let user = self.current_user().await?;
        let url = self.url([
            "storage",
            self.media_prefix.as_str(),
            user.identifier.as_str(),
            key,
        ])?;

        let response = self
            .request(reqwest::Method::PUT, url)
            .header(header::CONTENT_TYPE, file.content_type.as_str())
            .body(file.bytes.clone())
            .send()
            .await?;

        Self::decode::<UploadResponse>(response)
            .await
            .map(|uploaded| uploaded.path)
    }

    async fn signed_url(&self, path: &str) -> Result<String, ClientError> {
        let mut url = self.storage_url(path)?;
        url.query_pairs_mut()
            .append_pair("signed", "true")
            .append_pair("expires_in", &self.signed_url_ttl.as_secs().to_string());

        let response = self.request(reqwest::Method::GET, url).send().await?;

        Self::decode::<SignedUrlResponse>(response)
            .await
            .map(|signed| signed.url)
    }

    async fn remove(&self, path: &str) -> Result<(), ClientError> {
        let url = self.storage_url(path)?;
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        Self::check(response).await.map(|_| ())
    }
}

#[async_trait]
impl AuthClient for HttpBackend {
    async fn current_user(&self) -> Result<User, ClientError> {
        let url = self.url(["auth", "user"])?;
        let response = self.request(reqwest::Method::GET, url).send().await?;
        Self::decode(response).await
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        let url = self.url(["auth", "sign-out"])?;
        let response = self.request(reqwest::Method::POST, url).send().await?;
        Self::check(response).await.map(|_| ())
    }
}
