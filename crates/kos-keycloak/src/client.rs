//! HTTP implementation of [`IdpAdmin`] over the Keycloak admin REST API.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::LOCATION;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, info};
use url::Url;

use crate::admin::IdpAdmin;
use crate::config::{KeycloakAuth, KeycloakConfig};
use crate::error::{KeycloakError, Result};
use crate::representation::{
    ClientRepresentation, GroupRepresentation, RoleRepresentation, TokenResponse,
};
use crate::token::TokenCache;

/// Client for the Keycloak admin REST API.
#[derive(Debug)]
pub struct KeycloakAdminClient {
    config: KeycloakConfig,
    http: reqwest::Client,
    tokens: TokenCache,
}

impl KeycloakAdminClient {
    /// Creates a new admin client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kos_keycloak::{KeycloakAdminClient, KeycloakAuth, KeycloakConfig};
    ///
    /// let config = KeycloakConfig::new("https://sso.example.com")
    ///     .with_auth(KeycloakAuth::client_credentials("kos-admin", "s3cret"));
    /// let client = KeycloakAdminClient::new(config)?;
    /// # Ok::<(), kos_keycloak::KeycloakError>(())
    /// ```
    pub fn new(config: KeycloakConfig) -> Result<Self> {
        let http = Self::build_http_client(&config)?;

        Ok(Self {
            config,
            http,
            tokens: TokenCache::new(),
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &KeycloakConfig {
        &self.config
    }

    /// Returns a usable admin access token, if the auth method needs one.
    ///
    /// Client-credentials tokens are cached and refreshed shortly before
    /// they expire.
    ///
    /// # Errors
    ///
    /// Returns [`KeycloakError::AuthenticationFailed`] if the token endpoint
    /// rejects the credentials.
    pub async fn access_token(&self) -> Result<Option<String>> {
        match &self.config.auth {
            KeycloakAuth::None => Ok(None),
            KeycloakAuth::Bearer { token } => Ok(Some(token.clone())),
            KeycloakAuth::ClientCredentials {
                client_id,
                client_secret,
            } => {
                if let Some(token) = self.tokens.get(Utc::now()) {
                    return Ok(Some(token));
                }
                self.fetch_token(client_id, client_secret).await.map(Some)
            }
        }
    }

    async fn fetch_token(&self, client_id: &str, client_secret: &str) -> Result<String> {
        let url = self.config.token_url()?;
        let response = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(KeycloakError::AuthenticationFailed {
                message: format!(
                    "token request returned {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        let token: TokenResponse = response.json().await?;
        self.tokens
            .store(token.access_token.clone(), token.expires_in, Utc::now());
        debug!(
            admin_realm = %self.config.admin_realm,
            expires_in = token.expires_in,
            "Obtained Keycloak admin token"
        );
        Ok(token.access_token)
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let builder = self.http.request(method, url);
        Ok(match self.access_token().await? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Sends a request and maps non-success statuses to typed errors.
    async fn execute(&self, request: RequestBuilder, resource: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => KeycloakError::NotFound {
                resource: resource.to_string(),
            },
            StatusCode::CONFLICT => KeycloakError::Conflict {
                resource: resource.to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                self.tokens.clear();
                KeycloakError::AuthenticationFailed {
                    message: format!("{status} on {resource}: {message}"),
                }
            }
            _ => KeycloakError::HttpError {
                status: status.as_u16(),
                message,
            },
        })
    }

    /// Extracts the id of a created resource from the `Location` header.
    fn created_id(response: &Response, resource: &str) -> Result<String> {
        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(ToString::to_string)
            .ok_or_else(|| KeycloakError::MissingLocation {
                resource: resource.to_string(),
            })
    }

    /// Builds the HTTP client with proper configuration.
    fn build_http_client(config: &KeycloakConfig) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);

        if let Some(ref tls) = config.tls {
            if tls.insecure_skip_verify {
                builder = builder.danger_accept_invalid_certs(true);
            }

            if let Some(ref ca_cert) = tls.ca_cert {
                let cert_pem = std::fs::read(ca_cert).map_err(|e| KeycloakError::IoError {
                    path: ca_cert.clone(),
                    source: e,
                })?;
                let cert = reqwest::Certificate::from_pem(&cert_pem).map_err(|e| {
                    KeycloakError::InvalidTls {
                        message: format!("Invalid CA certificate: {e}"),
                    }
                })?;
                builder = builder.add_root_certificate(cert);
            }
        }

        builder.build().map_err(|e| KeycloakError::ConnectionFailed {
            url: config.base_url.clone(),
            source: e,
        })
    }
}

#[async_trait]
impl IdpAdmin for KeycloakAdminClient {
    async fn create_client(&self, realm: &str, client: &ClientRepresentation) -> Result<String> {
        let resource = format!("client {} in realm {realm}", client.client_id);
        let url = self.config.admin_url(realm, &["clients"])?;
        let request = self.request(Method::POST, url).await?.json(client);
        let response = self.execute(request, &resource).await?;
        let id = Self::created_id(&response, &resource)?;

        info!(realm, client_id = %client.client_id, external_id = %id, "Created Keycloak client");
        Ok(id)
    }

    async fn update_client(
        &self,
        realm: &str,
        external_id: &str,
        client: &ClientRepresentation,
    ) -> Result<()> {
        let resource = format!("client {external_id} in realm {realm}");
        let url = self.config.admin_url(realm, &["clients", external_id])?;
        let request = self.request(Method::PUT, url).await?.json(client);
        self.execute(request, &resource).await?;

        info!(realm, external_id, "Updated Keycloak client");
        Ok(())
    }

    async fn delete_client(&self, realm: &str, external_id: &str) -> Result<()> {
        let resource = format!("client {external_id} in realm {realm}");
        let url = self.config.admin_url(realm, &["clients", external_id])?;
        let request = self.request(Method::DELETE, url).await?;
        self.execute(request, &resource).await?;

        info!(realm, external_id, "Deleted Keycloak client");
        Ok(())
    }

    async fn create_realm_role(&self, realm: &str, role: &RoleRepresentation) -> Result<()> {
        let resource = format!("realm role {} in realm {realm}", role.name);
        let url = self.config.admin_url(realm, &["roles"])?;
        let request = self.request(Method::POST, url).await?.json(role);
        self.execute(request, &resource).await?;

        info!(realm, role = %role.name, "Created Keycloak realm role");
        Ok(())
    }

    async fn get_realm_role(&self, realm: &str, name: &str) -> Result<RoleRepresentation> {
        let resource = format!("realm role {name} in realm {realm}");
        let url = self.config.admin_url(realm, &["roles", name])?;
        let request = self.request(Method::GET, url).await?;
        let response = self.execute(request, &resource).await?;
        response.json().await.map_err(Into::into)
    }

    async fn update_realm_role(
        &self,
        realm: &str,
        name: &str,
        role: &RoleRepresentation,
    ) -> Result<()> {
        let resource = format!("realm role {name} in realm {realm}");
        let url = self.config.admin_url(realm, &["roles", name])?;
        let request = self.request(Method::PUT, url).await?.json(role);
        self.execute(request, &resource).await?;

        info!(realm, role = name, new_name = %role.name, "Updated Keycloak realm role");
        Ok(())
    }

    async fn delete_realm_role(&self, realm: &str, name: &str) -> Result<()> {
        let resource = format!("realm role {name} in realm {realm}");
        let url = self.config.admin_url(realm, &["roles", name])?;
        let request = self.request(Method::DELETE, url).await?;
        self.execute(request, &resource).await?;

        info!(realm, role = name, "Deleted Keycloak realm role");
        Ok(())
    }

    async fn create_client_role(
        &self,
        realm: &str,
        client_external_id: &str,
        role: &RoleRepresentation,
    ) -> Result<()> {
        let resource = format!(
            "client role {} on client {client_external_id} in realm {realm}",
            role.name
        );
        let url = self
            .config
            .admin_url(realm, &["clients", client_external_id, "roles"])?;
        let request = self.request(Method::POST, url).await?.json(role);
        self.execute(request, &resource).await?;

        info!(realm, client = client_external_id, role = %role.name, "Created Keycloak client role");
        Ok(())
    }

    async fn delete_client_role(
        &self,
        realm: &str,
        client_external_id: &str,
        name: &str,
    ) -> Result<()> {
        let resource =
            format!("client role {name} on client {client_external_id} in realm {realm}");
        let url = self
            .config
            .admin_url(realm, &["clients", client_external_id, "roles", name])?;
        let request = self.request(Method::DELETE, url).await?;
        self.execute(request, &resource).await?;

        info!(realm, client = client_external_id, role = name, "Deleted Keycloak client role");
        Ok(())
    }

    async fn create_group(&self, realm: &str, group: &GroupRepresentation) -> Result<String> {
        let resource = format!("group {} in realm {realm}", group.name);
        let url = self.config.admin_url(realm, &["groups"])?;
        let request = self.request(Method::POST, url).await?.json(group);
        let response = self.execute(request, &resource).await?;
        let id = Self::created_id(&response, &resource)?;

        info!(realm, group = %group.name, external_id = %id, "Created Keycloak group");
        Ok(id)
    }

    async fn update_group(
        &self,
        realm: &str,
        external_id: &str,
        group: &GroupRepresentation,
    ) -> Result<()> {
        let resource = format!("group {external_id} in realm {realm}");
        let url = self.config.admin_url(realm, &["groups", external_id])?;
        let request = self.request(Method::PUT, url).await?.json(group);
        self.execute(request, &resource).await?;

        info!(realm, external_id, "Updated Keycloak group");
        Ok(())
    }

    async fn delete_group(&self, realm: &str, external_id: &str) -> Result<()> {
        let resource = format!("group {external_id} in realm {realm}");
        let url = self.config.admin_url(realm, &["groups", external_id])?;
        let request = self.request(Method::DELETE, url).await?;
        self.execute(request, &resource).await?;

        info!(realm, external_id, "Deleted Keycloak group");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = KeycloakConfig::new("https://sso.example.com");
        assert!(KeycloakAdminClient::new(config).is_ok());
    }

    #[test]
    fn test_missing_ca_cert_is_io_error() {
        let config = KeycloakConfig::new("https://sso.example.com").with_tls(
            crate::config::TlsConfig::new().with_ca_cert("/nonexistent/ca.pem"),
        );
        assert!(matches!(
            KeycloakAdminClient::new(config),
            Err(KeycloakError::IoError { .. })
        ));
    }

    #[tokio::test]
    async fn test_static_bearer_token() {
        let config = KeycloakConfig::new("https://sso.example.com")
            .with_auth(KeycloakAuth::bearer("static-token"));
        let client = KeycloakAdminClient::new(config).unwrap();
        assert_eq!(
            client.access_token().await.unwrap().as_deref(),
            Some("static-token")
        );
    }

    #[tokio::test]
    async fn test_no_auth_has_no_token() {
        let client = KeycloakAdminClient::new(KeycloakConfig::new("https://sso.example.com")).unwrap();
        assert!(client.access_token().await.unwrap().is_none());
    }
}
