use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Non-success answer from PostgREST or GoTrue, with the provider's own message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SupabaseError {
    pub status: StatusCode,
    pub message: String,
}

impl SupabaseError {
    pub fn is_auth(&self) -> bool {
        matches!(self.status.as_u16(), 400 | 401 | 403 | 422)
    }
}

/// Pulls the human-readable message out of a GoTrue/PostgREST error body.
fn provider_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => ["error_description", "msg", "message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        Err(_) => body.to_string(),
    }
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_anon_key.clone(),
        }
    }

    /// Client for batch jobs that bypass row-level security.
    pub fn with_service_role(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_service_role_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Service-role calls authenticate with the key itself.
        let bearer = auth_token.unwrap_or(&self.api_key);
        if !bearer.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", bearer))?,
            );
        }

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(SupabaseError {
                status,
                message: provider_message(&error_text),
            }
            .into());
        }

        Ok(response)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None)
            .await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, auth_token, body, headers).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// For endpoints that answer with an empty body.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<()> {
        self.send(method, path, auth_token, body, None).await?;
        Ok(())
    }

    /// `Prefer: return=representation`, so inserts and updates answer with the stored rows.
    pub fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    // --------------------------------------------------------------------------
    // Auth (GoTrue)
    // --------------------------------------------------------------------------

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Value> {
        self.request(
            Method::POST,
            "/auth/v1/token?grant_type=password",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Value> {
        self.request(
            Method::POST,
            "/auth/v1/signup",
            None,
            Some(json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name }
            })),
        )
        .await
    }

    pub async fn sign_out(&self, auth_token: &str) -> Result<()> {
        self.execute(Method::POST, "/auth/v1/logout", Some(auth_token), None)
            .await
    }

    pub async fn get_user(&self, auth_token: &str) -> Result<Value> {
        self.request(Method::GET, "/auth/v1/user", Some(auth_token), None)
            .await
    }

    /// First row of a PostgREST select, or an error when the result set is empty.
    pub async fn select_single(&self, path: &str, auth_token: Option<&str>) -> Result<Value> {
        let rows: Vec<Value> = self.request(Method::GET, path, auth_token, None).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("Resource not found: {}", path))
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> AppConfig {
        AppConfig {
            supabase_url: server.uri(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: "service-key".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_provider_message_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(provider_message(body), "Invalid login credentials");
        assert_eq!(provider_message("plain failure"), "plain failure");
    }

    #[tokio::test]
    async fn test_sign_in_error_keeps_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server));
        let err = client
            .sign_in_with_password("a@b.com", "wrong")
            .await
            .unwrap_err();

        let supabase_err = err.downcast_ref::<SupabaseError>().unwrap();
        assert!(supabase_err.is_auth());
        assert_eq!(supabase_err.message, "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_service_role_uses_key_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .and(header("Authorization", "Bearer service-key"))
            .and(header("apikey", "service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = SupabaseClient::with_service_role(&config_for(&server));
        let rows: Vec<Value> = client
            .request(Method::GET, "/rest/v1/appointments", None, None)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server));
        assert!(client.sign_out("user-token").await.is_ok());
    }
}
