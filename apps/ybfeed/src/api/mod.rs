//! HTTP side of the feed API.
//!
//! Thin request/response wrapper: every call attaches the session secret as
//! the `Secret` cookie, non-2xx responses become typed [`ApiError`]s, and no
//! retries happen here. Retry policy belongs to callers.

use bytes::Bytes;
use reqwest::header;
use reqwest::{RequestBuilder, Response, StatusCode};
use url::Url;

use crate::protocol::Feed;

mod error;
pub use error::ApiError;

/// Response header carrying the server version on `GET /api`.
pub const VERSION_HEADER: &str = "Ybfeed-Version";

/// Client for the feed HTTP API. Cheap to clone; construct one per session
/// and pass it down rather than sharing a global.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// `base_url` must be an `http` or `https` URL; the config layer
    /// validates this before constructing a client.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn api_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .expect("base URL is hierarchical")
            .pop_if_empty()
            .push("api")
            .extend(segments);
        url
    }

    /// The channel endpoint for a feed, with the scheme swapped http→ws.
    pub fn ws_url(&self, feed: &str, secret: &str) -> Url {
        let mut url = self.base_url.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .expect("http(s) scheme swaps to ws(s)");
        url.path_segments_mut()
            .expect("base URL is hierarchical")
            .pop_if_empty()
            .push("ws")
            .push(feed);
        url.query_pairs_mut().append_pair("secret", secret);
        url
    }

    fn with_secret(req: RequestBuilder, secret: Option<&str>) -> RequestBuilder {
        match secret {
            Some(s) if !s.is_empty() => req.header(header::COOKIE, format!("Secret={s}")),
            _ => req,
        }
    }

    async fn send(req: RequestBuilder) -> Result<Response, ApiError> {
        let res = req.send().await.map_err(ApiError::Unavailable)?;
        let status = res.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            return Err(ApiError::Server { status, message });
        }
        Ok(res)
    }

    /// `GET /api`: liveness probe. Returns the advertised server version,
    /// if any. Display only.
    pub async fn ping(&self) -> Result<Option<String>, ApiError> {
        let url = self.api_url(&[]);
        let res = Self::send(self.http.get(url)).await?;
        let version = res
            .headers()
            .get(VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok(version)
    }

    /// Fetch the current state of a feed. Visiting a fresh name creates the
    /// feed server-side, so this can succeed without a secret exactly once.
    pub async fn get_feed(&self, feed: &str, secret: Option<&str>) -> Result<Feed, ApiError> {
        let url = self.api_url(&["feeds", feed]);
        let res = Self::send(Self::with_secret(self.http.get(url), secret)).await?;
        res.json::<Feed>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }

    /// Exchange a candidate secret (shared-link parameter or user-entered
    /// PIN) for a working session secret.
    pub async fn authenticate_feed(&self, feed: &str, candidate: &str) -> Result<String, ApiError> {
        let mut url = self.api_url(&["feeds", feed]);
        url.query_pairs_mut().append_pair("secret", candidate);
        let res = Self::send(self.http.get(url)).await?;
        let body = res
            .json::<Feed>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        body.session_secret()
            .map(str::to_owned)
            .ok_or_else(|| ApiError::Decode("exchange response carried no secret".into()))
    }

    /// Fetch one item's raw content.
    pub async fn get_item(
        &self,
        feed: &str,
        item: &str,
        secret: Option<&str>,
    ) -> Result<Bytes, ApiError> {
        let url = self.api_url(&["feeds", feed, "items", item]);
        let res = Self::send(Self::with_secret(self.http.get(url), secret)).await?;
        res.bytes()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }

    /// Add an item; the payload travels raw with its content type.
    pub async fn post_item(
        &self,
        feed: &str,
        content_type: &str,
        body: Vec<u8>,
        secret: Option<&str>,
    ) -> Result<(), ApiError> {
        let url = self.api_url(&["feeds", feed]);
        let req = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, content_type)
            .body(body);
        Self::send(Self::with_secret(req, secret)).await?;
        Ok(())
    }

    pub async fn delete_item(
        &self,
        feed: &str,
        item: &str,
        secret: Option<&str>,
    ) -> Result<(), ApiError> {
        let url = self.api_url(&["feeds", feed, "items", item]);
        Self::send(Self::with_secret(self.http.delete(url), secret)).await?;
        Ok(())
    }

    /// Remove every item from the feed.
    pub async fn empty_feed(&self, feed: &str, secret: Option<&str>) -> Result<(), ApiError> {
        let url = self.api_url(&["feeds", feed, "items"]);
        Self::send(Self::with_secret(self.http.delete(url), secret)).await?;
        Ok(())
    }

    /// Set a temporary numeric PIN on the feed. The server expires it after
    /// two minutes; the client only triggers the set.
    pub async fn set_pin(&self, feed: &str, pin: &str, secret: Option<&str>) -> Result<(), ApiError> {
        let url = self.api_url(&["feeds", feed]);
        let req = self.http.patch(url).body(pin.to_owned());
        Self::send(Self::with_secret(req, secret)).await?;
        Ok(())
    }

    /// Register a push subscription for this feed. The subscription document
    /// comes from whatever push machinery the caller runs; it is opaque here.
    pub async fn add_subscription(
        &self,
        feed: &str,
        subscription: &serde_json::Value,
        secret: Option<&str>,
    ) -> Result<(), ApiError> {
        let url = self.api_url(&["feeds", feed, "subscription"]);
        let req = self.http.post(url).json(subscription);
        Self::send(Self::with_secret(req, secret)).await?;
        Ok(())
    }

    pub async fn remove_subscription(
        &self,
        feed: &str,
        subscription: &serde_json::Value,
        secret: Option<&str>,
    ) -> Result<(), ApiError> {
        let url = self.api_url(&["feeds", feed, "subscription"]);
        let req = self.http.delete(url).json(subscription);
        Self::send(Self::with_secret(req, secret)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new(Url::parse("http://127.0.0.1:8080").unwrap())
    }

    #[test]
    fn api_urls_nest_under_api_prefix() {
        let c = client();
        assert_eq!(
            c.api_url(&["feeds", "demo"]).as_str(),
            "http://127.0.0.1:8080/api/feeds/demo"
        );
        assert_eq!(
            c.api_url(&["feeds", "demo", "items", "x.txt"]).as_str(),
            "http://127.0.0.1:8080/api/feeds/demo/items/x.txt"
        );
    }

    #[test]
    fn feed_names_are_percent_encoded() {
        let c = client();
        assert_eq!(
            c.api_url(&["feeds", "my feed"]).as_str(),
            "http://127.0.0.1:8080/api/feeds/my%20feed"
        );
    }

    #[test]
    fn ws_url_swaps_scheme_and_carries_secret() {
        let c = client();
        assert_eq!(
            c.ws_url("demo", "abc123").as_str(),
            "ws://127.0.0.1:8080/ws/demo?secret=abc123"
        );

        let tls = ApiClient::new(Url::parse("https://feed.example.com").unwrap());
        assert_eq!(
            tls.ws_url("demo", "abc123").as_str(),
            "wss://feed.example.com/ws/demo?secret=abc123"
        );
    }
}
