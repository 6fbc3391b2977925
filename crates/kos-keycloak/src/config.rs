//! Configuration types for the Keycloak admin client.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{KeycloakError, Result};

/// Realm that holds the admin service account by default.
pub const DEFAULT_ADMIN_REALM: &str = "master";

/// Configuration for the Keycloak admin client.
#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    /// Keycloak base URL (e.g., "<https://sso.example.com>").
    pub base_url: String,

    /// Realm the admin credentials authenticate against.
    pub admin_realm: String,

    /// Authentication configuration.
    pub auth: KeycloakAuth,

    /// Request timeout.
    pub timeout: Duration,

    /// TLS configuration.
    pub tls: Option<TlsConfig>,

    /// User agent string.
    pub user_agent: String,
}

impl KeycloakConfig {
    /// Creates a configuration for the Keycloak server at `base_url`.
    ///
    /// # Examples
    ///
    /// ```
    /// use kos_keycloak::KeycloakConfig;
    ///
    /// let config = KeycloakConfig::new("https://sso.example.com/");
    /// assert_eq!(config.base_url, "https://sso.example.com");
    /// assert_eq!(config.admin_realm, "master");
    /// ```
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_realm: DEFAULT_ADMIN_REALM.to_string(),
            auth: KeycloakAuth::None,
            timeout: Duration::from_secs(30),
            tls: None,
            user_agent: format!("kos-keycloak/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the realm used to obtain admin tokens.
    #[must_use]
    pub fn with_admin_realm(mut self, realm: impl Into<String>) -> Self {
        self.admin_realm = realm.into();
        self
    }

    /// Sets the authentication method.
    #[must_use]
    pub fn with_auth(mut self, auth: KeycloakAuth) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the TLS configuration.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Returns the OpenID Connect token endpoint of the admin realm.
    ///
    /// # Errors
    ///
    /// Returns [`KeycloakError::InvalidUrl`] if the base URL cannot be parsed.
    pub fn token_url(&self) -> Result<Url> {
        self.url_with_segments(&[
            "realms",
            &self.admin_realm,
            "protocol",
            "openid-connect",
            "token",
        ])
    }

    /// Returns an admin REST URL below `/admin/realms/{realm}`.
    ///
    /// Each segment is percent-encoded, so role names containing spaces or
    /// slashes address a single path segment.
    ///
    /// # Errors
    ///
    /// Returns [`KeycloakError::InvalidUrl`] if the base URL cannot be parsed.
    ///
    /// # Examples
    ///
    /// ```
    /// use kos_keycloak::KeycloakConfig;
    ///
    /// let config = KeycloakConfig::new("https://sso.example.com");
    /// let url = config.admin_url("acme", &["roles", "power user"]).unwrap();
    /// assert_eq!(url.as_str(), "https://sso.example.com/admin/realms/acme/roles/power%20user");
    /// ```
    pub fn admin_url(&self, realm: &str, segments: &[&str]) -> Result<Url> {
        let mut all = Vec::with_capacity(segments.len() + 3);
        all.extend(["admin", "realms", realm]);
        all.extend_from_slice(segments);
        self.url_with_segments(&all)
    }

    fn url_with_segments(&self, segments: &[&str]) -> Result<Url> {
        let invalid = || KeycloakError::InvalidUrl {
            url: self.base_url.clone(),
        };

        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Authentication methods for the admin API.
#[derive(Debug, Clone)]
pub enum KeycloakAuth {
    /// No authentication (for local development).
    None,

    /// OAuth2 `client_credentials` grant against the admin realm.
    ClientCredentials {
        /// Service account client id.
        client_id: String,
        /// Service account client secret.
        client_secret: String,
    },

    /// A pre-issued bearer token.
    Bearer {
        /// Token value.
        token: String,
    },
}

impl KeycloakAuth {
    /// Creates client-credentials authentication.
    ///
    /// # Examples
    ///
    /// ```
    /// use kos_keycloak::KeycloakAuth;
    ///
    /// let auth = KeycloakAuth::client_credentials("kos-admin", "s3cret");
    /// ```
    #[must_use]
    pub fn client_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self::ClientCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Creates bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }
}

/// TLS configuration for connections to Keycloak.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Path to an additional CA certificate (PEM).
    pub ca_cert: Option<PathBuf>,

    /// Whether to skip certificate verification (NOT recommended for production).
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    /// Creates a TLS configuration with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ca_cert: None,
            insecure_skip_verify: false,
        }
    }

    /// Sets the CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    /// Disables certificate verification.
    #[must_use]
    pub const fn insecure(mut self) -> Self {
        self.insecure_skip_verify = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url() {
        let config = KeycloakConfig::new("https://sso.example.com").with_admin_realm("ops");
        assert_eq!(
            config.token_url().unwrap().as_str(),
            "https://sso.example.com/realms/ops/protocol/openid-connect/token"
        );
    }

    #[test]
    fn test_admin_url_keeps_base_path() {
        let config = KeycloakConfig::new("https://example.com/auth/");
        let url = config.admin_url("acme", &["clients", "abc-123"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/auth/admin/realms/acme/clients/abc-123"
        );
    }

    #[test]
    fn test_admin_url_encodes_segments() {
        let config = KeycloakConfig::new("https://example.com");
        let url = config.admin_url("acme", &["roles", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/admin/realms/acme/roles/a%2Fb");
    }

    #[test]
    fn test_invalid_base_url() {
        let config = KeycloakConfig::new("not a url");
        assert!(matches!(
            config.admin_url("acme", &[]),
            Err(KeycloakError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_builder_defaults() {
        let config = KeycloakConfig::new("https://example.com")
            .with_timeout(Duration::from_secs(5))
            .with_tls(TlsConfig::new().insecure());
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.tls.unwrap().insecure_skip_verify);
        assert!(config.user_agent.starts_with("kos-keycloak/"));
    }
}
