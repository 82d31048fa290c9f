//! Authorized JSON calls against a Google REST endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::GkupError;

/// Thin wrapper binding an HTTP client, a base URL and a bearer token.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
    token: SecretString,
    component: &'static str,
}

impl RestClient {
    pub fn new(
        base_url: &str,
        token: SecretString,
        request_timeout: Duration,
        component: &'static str,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("gkup/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            component,
        })
    }

    /// Join a relative API path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);
        self.send(self.http.get(&url), &url).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        debug!("POST {}", url);
        self.send(self.http.post(&url).json(body), &url).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        debug!("PUT {}", url);
        self.send(self.http.put(&url).json(body), &url).await
    }

    pub async fn post_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(path);
        debug!("POST {} {:?}", url, query);
        self.send(
            self.http
                .post(&url)
                .query(query)
                .header(reqwest::header::CONTENT_LENGTH, 0),
            &url,
        )
        .await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> Result<T> {
        let response = request
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GkupError::gcp(self.component, status.as_u16(), &body).into());
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

/// Last path segment of a resource URL (`.../instanceGroupManagers/gke-x-grp` → `gke-x-grp`).
pub fn short_name(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Echo {
        ok: bool,
    }

    fn client(base: &str) -> RestClient {
        RestClient::new(
            base,
            SecretString::from("test-token".to_string()),
            Duration::from_secs(5),
            "gcp::rest",
        )
        .unwrap()
    }

    #[test]
    fn test_url_join() {
        let c = client("https://container.googleapis.com/v1/");
        assert_eq!(
            c.url("/projects/p/zones/z/operations"),
            "https://container.googleapis.com/v1/projects/p/zones/z/operations"
        );
    }

    #[test]
    fn test_short_name() {
        assert_eq!(
            short_name("https://www.googleapis.com/compute/v1/projects/p/zones/z/instanceGroupManagers/gke-prod-pool-a-1234-grp"),
            "gke-prod-pool-a-1234-grp"
        );
        assert_eq!(short_name("plain"), "plain");
        assert_eq!(short_name("a/b/"), "b");
    }

    #[tokio::test]
    async fn test_get_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/thing"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok": true}"#))
            .mount(&server)
            .await;

        let c = client(&format!("{}/v1", server.uri()));
        let echo: Echo = c.get("thing").await.unwrap();
        assert!(echo.ok);
    }

    #[tokio::test]
    async fn test_post_query_passes_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/resize"))
            .and(query_param("size", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok": true}"#))
            .mount(&server)
            .await;

        let c = client(&server.uri());
        let echo: Echo = c
            .post_query("resize", &[("size", "4".to_string())])
            .await
            .unwrap();
        assert!(echo.ok);
    }

    #[tokio::test]
    async fn test_put_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/clusters/prod"))
            .and(body_json(serde_json::json!({"update": {"desiredMasterVersion": "latest"}})))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok": true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&format!("{}/v1", server.uri()));
        let body = serde_json::json!({"update": {"desiredMasterVersion": "latest"}});
        let echo: Echo = c.put("clusters/prod", &body).await.unwrap();
        assert!(echo.ok);
    }

    #[tokio::test]
    async fn test_error_status_maps_to_gkup_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"error": {"code": 404, "message": "cluster prod not found"}}"#,
            ))
            .mount(&server)
            .await;

        let c = client(&server.uri());
        let err = c.get::<Echo>("missing").await.unwrap_err();
        let gkup = err.downcast_ref::<GkupError>().unwrap();
        assert!(matches!(gkup, GkupError::Api { status: 404, .. }));
        assert!(err.to_string().contains("cluster prod not found"));
    }
}
