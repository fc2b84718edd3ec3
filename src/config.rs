//! Provider configuration.
//!
//! Each option comes from the provider block first, then from its
//! environment variable, then from its default:
//!
//! | Option         | Environment variable  | Default                      |
//! |----------------|-----------------------|------------------------------|
//! | `api_token`    | `SCALINGO_API_TOKEN`  | none, the option is required |
//! | `api_url`      | `SCALINGO_API_URL`    | `https://api.scalingo.com/`  |
//! | `auth_api_url` | `SCALINGO_AUTH_URL`   | `https://auth.scalingo.com/` |

use serde_json::Value;
use url::Url;

use crate::api::{DEFAULT_API_URL, DEFAULT_AUTH_URL};
use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable holding the API token.
pub const API_TOKEN_ENV: &str = "SCALINGO_API_TOKEN";
/// Environment variable overriding the API endpoint.
pub const API_URL_ENV: &str = "SCALINGO_API_URL";
/// Environment variable overriding the authentication endpoint.
pub const AUTH_URL_ENV: &str = "SCALINGO_AUTH_URL";

/// Resolved provider configuration.
///
/// Built once by `configure` and then only read.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Token used to authenticate against the platform.
    pub api_token: String,
    /// Regional API endpoint.
    pub api_url: Url,
    /// Authentication service endpoint.
    pub auth_api_url: Url,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_url", &self.api_url.as_str())
            .field("auth_api_url", &self.auth_api_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "api_token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!(
                        "Scalingo API token, defaults to ${}",
                        API_TOKEN_ENV
                    )),
            )
            .with_attribute(
                "api_url",
                Attribute::optional_string().with_description(format!(
                    "Scalingo API endpoint, defaults to ${} or {}",
                    API_URL_ENV, DEFAULT_API_URL
                )),
            )
            .with_attribute(
                "auth_api_url",
                Attribute::optional_string().with_description(format!(
                    "Scalingo authentication endpoint, defaults to ${} or {}",
                    AUTH_URL_ENV, DEFAULT_AUTH_URL
                )),
            )
    }

    /// Resolve the configuration from the provider block and the process environment.
    pub fn resolve(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Resolve the configuration with a custom environment lookup.
    ///
    /// Empty strings count as unset, both in the block and in the environment.
    pub fn resolve_with<F>(config: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str, var: &str| -> Option<String> {
            config
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .filter(|v| !v.is_empty())
                .or_else(|| env(var).filter(|v| !v.is_empty()))
        };

        let mut diagnostics = Vec::new();

        let api_token = lookup("api_token", API_TOKEN_ENV).unwrap_or_else(|| {
            diagnostics.push(
                Diagnostic::error("Missing API token")
                    .with_detail(format!(
                        "Set api_token in the provider block or the {} environment variable",
                        API_TOKEN_ENV
                    ))
                    .with_attribute("api_token"),
            );
            String::new()
        });

        let mut parse_url = |key: &str, var: &str, default: &str| -> Option<Url> {
            let raw = lookup(key, var).unwrap_or_else(|| default.to_string());
            match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(err) => {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid URL for {}", key))
                            .with_detail(format!("'{}': {}", raw, err))
                            .with_attribute(key),
                    );
                    None
                },
            }
        };

        let api_url = parse_url("api_url", API_URL_ENV, DEFAULT_API_URL);
        let auth_api_url = parse_url("auth_api_url", AUTH_URL_ENV, DEFAULT_AUTH_URL);

        match (api_url, auth_api_url) {
            (Some(api_url), Some(auth_api_url)) if diagnostics.is_empty() => Ok(Self {
                api_token,
                api_url,
                auth_api_url,
            }),
            _ => Err(diagnostics),
        }
    }
}
