use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;

use crate::config::LoginRequestTemplate;

const LOGIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Decides whether a username/password pair is valid.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(&self, username: &str, password: &str) -> Result<bool, ValidatorError>;
}

/// Validates credentials by sending the configured login request.
///
/// Any 2xx response means the credentials are valid.
#[derive(Debug, Clone)]
pub struct HttpCredentialValidator {
    client: reqwest::Client,
    method: Method,
    template: LoginRequestTemplate,
}

impl HttpCredentialValidator {
    pub fn new(template: LoginRequestTemplate) -> Result<Self, ValidatorError> {
        let client = reqwest::Client::builder().timeout(LOGIN_TIMEOUT).build()?;
        Self::with_client(client, template)
    }

    pub fn with_client(client: reqwest::Client, template: LoginRequestTemplate) -> Result<Self, ValidatorError> {
        let method = Method::from_str(&template.method.to_ascii_uppercase())
            .map_err(|_| ValidatorError::InvalidMethod(template.method.clone()))?;
        Ok(Self { client, method, template })
    }

    fn render_body(&self, username: &str, password: &str) -> String {
        self.template
            .body_template
            .replace("{username}", username)
            .replace("{password}", password)
    }
}

#[async_trait]
impl CredentialValidator for HttpCredentialValidator {
    async fn validate(&self, username: &str, password: &str) -> Result<bool, ValidatorError> {
        let mut request = self
            .client
            .request(self.method.clone(), &self.template.url)
            .header(CONTENT_TYPE, &self.template.content_type)
            .body(self.render_body(username, password));
        for (name, value) in &self.template.headers {
            if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                debug!("ignoring Content-Type in login headers; contentType applies");
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(status = %status, url = %self.template.url, "login request completed");
        Ok(status.is_success())
    }
}

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("Invalid login request method '{0}'")]
    InvalidMethod(String),

    #[error("Login request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use indexmap::IndexMap;

    async fn spawn_login_server() -> String {
        async fn login(headers: HeaderMap, body: String) -> StatusCode {
            let api_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
            let content_types: Vec<_> = headers.get_all("content-type").iter().collect();
            let json = content_types.len() == 1 && content_types[0] == "application/json";
            if api_key == Some("k1") && json && body == r#"{"user":"alice","pass":"good"}"# {
                StatusCode::OK
            } else {
                StatusCode::UNAUTHORIZED
            }
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, Router::new().route("/login", post(login))).await;
        });
        format!("http://{address}/login")
    }

    fn template(url: String) -> LoginRequestTemplate {
        let mut headers = IndexMap::new();
        headers.insert("X-Api-Key".to_string(), "k1".to_string());
        LoginRequestTemplate {
            method: "post".into(),
            url,
            headers,
            body_template: r#"{"user":"{username}","pass":"{password}"}"#.into(),
            content_type: "application/json".into(),
        }
    }

    #[tokio::test]
    async fn success_status_means_valid() {
        let validator = HttpCredentialValidator::new(template(spawn_login_server().await)).unwrap();
        assert!(validator.validate("alice", "good").await.unwrap());
    }

    #[tokio::test]
    async fn non_success_status_means_invalid() {
        let validator = HttpCredentialValidator::new(template(spawn_login_server().await)).unwrap();
        assert!(!validator.validate("alice", "bad").await.unwrap());
    }

    #[tokio::test]
    async fn template_content_type_does_not_duplicate_the_header() {
        let mut template = template(spawn_login_server().await);
        template.headers.insert("content-type".into(), "text/plain".into());
        let validator = HttpCredentialValidator::new(template).unwrap();
        assert!(validator.validate("alice", "good").await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let validator = HttpCredentialValidator::new(template("http://127.0.0.1:1/login".into())).unwrap();
        assert!(matches!(validator.validate("a", "b").await, Err(ValidatorError::Http(_))));
    }

    #[test]
    fn bad_method_is_rejected() {
        let mut template = template("http://localhost/login".into());
        template.method = "NOT A METHOD".into();
        assert!(matches!(
            HttpCredentialValidator::new(template),
            Err(ValidatorError::InvalidMethod(_))
        ));
    }
}
