//! HTTP client for the Scalingo API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use super::error::ApiError;
use super::models::{Collaborator, Invoice};
use super::{ApiResult, ScalingoApi};
use crate::config::ProviderConfig;
use crate::pagination::{PaginationMeta, PaginationOpts};

/// Default endpoint of the regional API.
pub const DEFAULT_API_URL: &str = "https://api.scalingo.com/";

/// Default endpoint of the authentication service.
pub const DEFAULT_AUTH_URL: &str = "https://auth.scalingo.com/";

const USER_AGENT: &str = concat!("scalingo-provider/", env!("CARGO_PKG_VERSION"));

/// HTTP implementation of [`ScalingoApi`].
///
/// The API token is exchanged for a bearer token on first use; the bearer
/// token is then reused for every call made through this client and its
/// clones. A call rejected with 401 drops the cached bearer token and is
/// sent once more with a freshly exchanged one.
#[derive(Clone)]
pub struct ScalingoClient {
    http: Client,
    api_url: Arc<Url>,
    auth_url: Arc<Url>,
    api_token: String,
    bearer: Arc<Mutex<Option<String>>>,
}

impl std::fmt::Debug for ScalingoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalingoClient")
            .field("api_url", &self.api_url.as_str())
            .field("auth_url", &self.auth_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenExchange {
    token: String,
}

#[derive(Deserialize)]
struct InvoicesPage {
    invoices: Vec<Invoice>,
    #[serde(default)]
    meta: ListMeta,
}

#[derive(Deserialize, Default)]
struct ListMeta {
    #[serde(default)]
    pagination: PaginationMeta,
}

#[derive(Deserialize)]
struct CollaboratorsEnvelope {
    collaborators: Vec<Collaborator>,
}

#[derive(Serialize, Deserialize)]
struct CollaboratorEnvelope<T> {
    collaborator: T,
}

#[derive(Serialize)]
struct CollaboratorInvite<'a> {
    email: &'a str,
}

impl ScalingoClient {
    /// Build a client from a resolved provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(config: &ProviderConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            api_url: Arc::new(config.api_url.clone()),
            auth_url: Arc::new(config.auth_api_url.clone()),
            api_token: config.api_token.clone(),
            bearer: Arc::new(Mutex::new(None)),
        })
    }

    /// The regional API endpoint.
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// The authentication service endpoint.
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    async fn bearer_token(&self) -> ApiResult<String> {
        let mut cached = self.bearer.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        tracing::debug!("exchanging API token");
        let url = endpoint(&self.auth_url, &["v1", "tokens", "exchange"])?;
        let response = self
            .http
            .post(url)
            .basic_auth("", Some(&self.api_token))
            .send()
            .await?;
        let exchange: TokenExchange = decode(check_response(response).await?).await?;
        *cached = Some(exchange.token.clone());
        Ok(exchange.token)
    }

    /// Forget `rejected`, unless another call already replaced it.
    async fn forget_bearer_token(&self, rejected: &str) {
        let mut cached = self.bearer.lock().await;
        if cached.as_deref() == Some(rejected) {
            *cached = None;
        }
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let retry = request.try_clone();
        let token = self.bearer_token().await?;
        let response = request.bearer_auth(&token).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(retry) = retry {
                tracing::debug!("bearer token rejected, exchanging it again");
                self.forget_bearer_token(&token).await;
                let token = self.bearer_token().await?;
                let response = retry.bearer_auth(&token).send().await?;
                return check_response(response).await;
            }
        }

        check_response(response).await
    }
}

#[async_trait]
impl ScalingoApi for ScalingoClient {
    #[tracing::instrument(skip(self))]
    async fn invoices_list(
        &self,
        opts: PaginationOpts,
    ) -> ApiResult<(Vec<Invoice>, PaginationMeta)> {
        let url = endpoint(&self.auth_url, &["v1", "account", "invoices"])?;
        let response = self.send(self.http.get(url).query(&opts)).await?;
        let page: InvoicesPage = decode(response).await?;
        Ok((page.invoices, page.meta.pagination))
    }

    #[tracing::instrument(skip(self))]
    async fn collaborators_list(&self, app: &str) -> ApiResult<Vec<Collaborator>> {
        let url = endpoint(&self.api_url, &["v1", "apps", app, "collaborators"])?;
        let response = self.send(self.http.get(url)).await?;
        let envelope: CollaboratorsEnvelope = decode(response).await?;
        Ok(envelope.collaborators)
    }

    #[tracing::instrument(skip(self))]
    async fn collaborator_add(&self, app: &str, email: &str) -> ApiResult<Collaborator> {
        let url = endpoint(&self.api_url, &["v1", "apps", app, "collaborators"])?;
        let body = CollaboratorEnvelope {
            collaborator: CollaboratorInvite { email },
        };
        let response = self.send(self.http.post(url).json(&body)).await?;
        let envelope: CollaboratorEnvelope<Collaborator> = decode(response).await?;
        Ok(envelope.collaborator)
    }

    #[tracing::instrument(skip(self))]
    async fn collaborator_remove(&self, app: &str, collaborator_id: &str) -> ApiResult<()> {
        let url = endpoint(
            &self.api_url,
            &["v1", "apps", app, "collaborators", collaborator_id],
        )?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}

/// Append path segments to a base URL, escaping each of them.
fn endpoint(base: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Check response status and convert failures.
async fn check_response(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound {
            resource: response.url().path().to_string(),
        }),
        _ => {
            let message = extract_error_message(response, status).await;
            Err(ApiError::api(status.as_u16(), message))
        },
    }
}

/// Extract the error message from a failed response.
///
/// Scalingo answers either `{"error": "..."}` or, on validation failures,
/// `{"errors": {"field": ["reason", ...]}}`.
async fn extract_error_message(response: Response, status: StatusCode) -> String {
    let body = match response.text().await {
        Ok(b) if !b.is_empty() => b,
        _ => return format!("HTTP {status}"),
    };

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
        if let Some(msg) = json.get("error").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
        if let Some(msg) = json.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
        if let Some(errors) = json.get("errors").and_then(|e| e.as_object()) {
            let reasons: Vec<String> = errors
                .iter()
                .flat_map(|(field, reasons)| {
                    let reasons = reasons.as_array().cloned().unwrap_or_default();
                    reasons
                        .into_iter()
                        .filter_map(|r| r.as_str().map(|r| format!("{field} {r}")))
                        .collect::<Vec<_>>()
                })
                .collect();
            if !reasons.is_empty() {
                return reasons.join(", ");
            }
        }
    }

    body
}
