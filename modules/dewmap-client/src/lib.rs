pub mod error;
pub mod types;
pub mod validate;

pub use error::{ClientError, Result};
pub use types::{LoginRequest, LoginResponse};
pub use validate::{validate_image, validate_new_find, validate_page_size, ValidationError};

use std::time::Duration;

use dewmap_common::{AdminProfile, Config, Find, FindId, FlavorList, NewFind};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use types::ErrorBody;

/// Client for the finds API. Admin endpoints authenticate with a session
/// cookie, so the underlying client keeps a cookie store.
#[derive(Clone)]
pub struct DewClient {
    client: reqwest::Client,
    base_url: Url,
}

impl DewClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ClientError::Network(format!("invalid base url {base_url}: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.api_base_url,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    /// Build `{base}/seg/seg/...`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Network(format!("base url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // --- Public endpoints ---

    /// `GET /api/finds`. Dropping the returned future cancels the request.
    pub async fn finds(&self) -> Result<Vec<Find>> {
        let resp = self.client.get(self.endpoint(&["api", "finds"])?).send().await?;
        let finds: Vec<Find> = decode(resp).await?;
        tracing::debug!(count = finds.len(), "Fetched finds");
        Ok(finds)
    }

    /// `GET /api/flavors`.
    pub async fn flavors(&self) -> Result<FlavorList> {
        let resp = self.client.get(self.endpoint(&["api", "flavors"])?).send().await?;
        decode(resp).await
    }

    /// `POST /api/finds` as multipart. Validation runs first; a rejected
    /// form never reaches the network.
    pub async fn submit_find(&self, new: &NewFind) -> Result<Find> {
        let clean = validate_new_find(new)?;

        let mut form = Form::new()
            .text("flavor", clean.flavor.clone())
            .text("size", clean.size.clone())
            .text("locationName", clean.location_name.clone())
            .text("address", clean.address.clone());
        if let Some(url) = clean.image_url {
            form = form.text("imageUrl", url);
        }
        if let Some(image) = clean.image {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.content_type)?;
            form = form.part("image_file", part);
        }

        tracing::info!(flavor = clean.flavor.as_str(), location = clean.location_name.as_str(), "Submitting find");
        let resp = self
            .client
            .post(self.endpoint(&["api", "finds"])?)
            .multipart(form)
            .send()
            .await?;
        decode(resp).await
    }

    // --- Admin endpoints ---

    /// `POST /api/admin/login`. On success the session cookie is retained
    /// for later admin calls.
    pub async fn admin_login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }
        let resp = self
            .client
            .post(self.endpoint(&["api", "admin", "login"])?)
            .json(&LoginRequest {
                username: username.trim(),
                password,
            })
            .send()
            .await?;
        decode(resp).await
    }

    /// `POST /api/admin/logout`.
    pub async fn admin_logout(&self) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint(&["api", "admin", "logout"])?)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// `GET /api/admin/me`. A missing or expired session is `Unauthorized`.
    pub async fn admin_profile(&self) -> Result<AdminProfile> {
        let resp = self
            .client
            .get(self.endpoint(&["api", "admin", "me"])?)
            .send()
            .await?;
        decode(resp).await
    }

    /// `GET /api/admin/finds?limit=N`. The server orders most recent first.
    pub async fn admin_finds(&self, limit: u32) -> Result<Vec<Find>> {
        let limit = validate_page_size(limit)?;
        let resp = self
            .client
            .get(self.endpoint(&["api", "admin", "finds"])?)
            .query(&[("limit", limit)])
            .send()
            .await?;
        let finds: Vec<Find> = decode(resp).await?;
        tracing::debug!(limit, count = finds.len(), "Fetched moderation page");
        Ok(finds)
    }

    /// `DELETE /api/admin/finds/{id}`.
    pub async fn admin_delete_find(&self, id: &FindId) -> Result<()> {
        let resp = self
            .client
            .delete(self.endpoint(&["api", "admin", "finds", id.as_str()])?)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.bytes().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let resp = check(resp).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Map a non-success response to an error, preferring the server's
/// `detail` string over the generic status message.
pub(crate) fn api_error(status: u16, body: &[u8]) -> ClientError {
    let detail = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .and_then(|d| d.as_str().map(str::to_string))
        .filter(|d| !d.trim().is_empty());

    let message = detail.unwrap_or_else(|| format!("request failed (status {status})"));

    if status == 401 {
        ClientError::Unauthorized(message)
    } else {
        ClientError::Api { status, message }
    }
}
