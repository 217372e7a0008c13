//! HTTP access to the Velvet API.

use std::sync::Arc;

use reqwest::{RequestBuilder, Response, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use velvet_core::{AuthResponse, LoginRequest, Product, ProductId, RegisterRequest, StatusMessage};

use crate::config::ClientConfig;
use crate::credential::BearerCredential;
use crate::error::ClientError;
use crate::session::{AUTH_TOKEN_KEY, SessionStateHolder};
use crate::storage::Storage;

/// Thin typed wrapper over the API's JSON endpoints.
///
/// Every request carries the shared [`BearerCredential`] when one is set.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    credential: Arc<BearerCredential>,
}

impl ApiClient {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_credential(config, Arc::new(BearerCredential::new()))
    }

    #[must_use]
    pub fn with_credential(config: ClientConfig, credential: Arc<BearerCredential>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            credential,
        }
    }

    /// The credential attached to outgoing requests.
    #[must_use]
    pub fn credential(&self) -> Arc<BearerCredential> {
        Arc::clone(&self.credential)
    }

    /// Fetch the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::TransportFailure` if the request fails and
    /// `ClientError::Rejected` for a non-success status.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ClientError> {
        let request = self.http.get(self.config.endpoint("api/products")?);
        json_body(self.send(request).await?).await
    }

    /// Fetch one product; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// As for [`Self::list_products`], except that 404 is `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, ClientError> {
        let url = self.config.endpoint(&format!("api/products/{id}"))?;
        let response = self.send(self.http.get(url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        json_body(response).await.map(Some)
    }

    /// Exchange credentials for a token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Rejected` with the server's message for 400/401.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let url = self.config.endpoint("api/auth/login")?;
        json_body(self.send(self.http.post(url).json(request)).await?).await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Rejected` carrying the response body on failure.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<StatusMessage, ClientError> {
        let url = self.config.endpoint("api/auth/register")?;
        json_body(self.send(self.http.post(url).json(request)).await?).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let request = match self.credential.header_value() {
            Some(value) => request.header(header::AUTHORIZATION, value),
            None => request,
        };
        Ok(request.send().await?)
    }
}

/// Decode a success body, or turn a failure status into `Rejected`.
async fn json_body<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let ErrorBody { message, errors } = parse_error_body(&body);
    Err(ClientError::Rejected {
        status,
        message,
        errors,
    })
}

/// Shape shared by `{message}` and status-envelope error bodies.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    errors: Vec<String>,
}

/// The `message` and `errors` of a JSON error body, or the raw body as the
/// message.
fn parse_error_body(body: &str) -> ErrorBody {
    serde_json::from_str(body).unwrap_or_else(|_| ErrorBody {
        message: body.to_owned(),
        errors: Vec::new(),
    })
}

/// Outcome of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterResult {
    pub successful: bool,
    pub errors: Vec<String>,
}

/// Client-side login, registration and logout.
///
/// Ties the API client to the stored token and the session holder.
pub struct AuthService<S> {
    api: ApiClient,
    session: Arc<SessionStateHolder<S>>,
    storage: Arc<S>,
}

impl<S: Storage> AuthService<S> {
    #[must_use]
    pub const fn new(api: ApiClient, session: Arc<SessionStateHolder<S>>, storage: Arc<S>) -> Self {
        Self {
            api,
            session,
            storage,
        }
    }

    /// Log in, store the token and switch the session to authenticated.
    ///
    /// # Errors
    ///
    /// Returns the `ClientError` from the login request. Nothing is retried.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let response = self.api.login(request).await?;

        if let Err(e) = self.storage.set_item(AUTH_TOKEN_KEY, &response.token).await {
            tracing::warn!(error = %e, "Could not store session token");
        }
        self.session.mark_authenticated(&response.token);

        tracing::info!(username = %request.username, "Logged in");
        Ok(response)
    }

    /// Register an account. Failures, including transport failures, come
    /// back as an unsuccessful result with a description.
    pub async fn register(&self, request: &RegisterRequest) -> RegisterResult {
        match self.api.register(request).await {
            Ok(_) => RegisterResult {
                successful: true,
                errors: Vec::new(),
            },
            Err(ClientError::Rejected {
                status,
                message,
                errors,
            }) => RegisterResult {
                successful: false,
                errors: std::iter::once(format!(
                    "Registration failed: {} - {message}",
                    status.canonical_reason().unwrap_or("Error")
                ))
                .chain(errors)
                .collect(),
            },
            Err(e) => RegisterResult {
                successful: false,
                errors: vec![format!("Registration failed: {e}")],
            },
        }
    }

    /// Erase the stored token and switch the session to anonymous.
    pub async fn logout(&self) {
        if let Err(e) = self.storage.remove_item(AUTH_TOKEN_KEY).await {
            tracing::warn!(error = %e, "Could not remove session token");
        }
        self.session.mark_logged_out();
        tracing::info!("Logged out");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_prefers_json_fields() {
        let body = parse_error_body(r#"{"message":"Invalid username or password."}"#);
        assert_eq!(body.message, "Invalid username or password.");
        assert!(body.errors.is_empty());

        let body = parse_error_body(
            r#"{"status":"Error","message":"User creation failed!","errors":["too short","no digit"]}"#,
        );
        assert_eq!(body.message, "User creation failed!");
        assert_eq!(body.errors, vec!["too short", "no digit"]);

        assert_eq!(parse_error_body("plain text").message, "plain text");
        assert_eq!(
            parse_error_body(r#"{"status":"Error"}"#).message,
            r#"{"status":"Error"}"#
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        // Port 1 on loopback refuses connections.
        let api = ApiClient::new(ClientConfig::new("http://127.0.0.1:1").unwrap());
        assert!(matches!(
            api.list_products().await,
            Err(ClientError::TransportFailure(_))
        ));
    }
}
