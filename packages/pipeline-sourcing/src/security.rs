//! Credential handling and URL validation.
//!
//! Uses the `secrecy` crate to prevent accidental logging of sensitive
//! values, and refuses obviously-internal fetch targets before any network
//! or rendering budget is spent.

use ipnet::{Ipv4Net, Ipv6Net};
use secrecy::{ExposeSecret, SecretBox};
use std::fmt;
use url::{Host, Url};

use crate::error::{SecurityError, SecurityResult};

/// A secret string that won't be logged or displayed.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    /// Create a new secret string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the secret value for use.
    ///
    /// Only call this when actually using the secret (e.g., in an API
    /// request header).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

const BLOCKED_V4: &[&str] = &[
    "127.0.0.0/8",
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "169.254.0.0/16",
];

const BLOCKED_V6: &[&str] = &["::1/128", "fc00::/7", "fe80::/10"];

/// Validates URLs before the fetcher spends network or rendering cost.
///
/// Company websites are the only legitimate targets; anything pointing at
/// loopback, private ranges or non-HTTP schemes is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlValidator {
    allow_private: bool,
}

impl UrlValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permit loopback and private hosts (local test servers).
    pub fn allowing_private_hosts() -> Self {
        Self {
            allow_private: true,
        }
    }

    /// Validate a URL string, returning the parsed URL on success.
    pub fn validate(&self, raw: &str) -> SecurityResult<Url> {
        let url = Url::parse(raw)?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(SecurityError::DisallowedScheme(scheme.to_string())),
        }

        let host = url.host().ok_or(SecurityError::NoHost)?;
        if self.allow_private {
            return Ok(url);
        }

        match host {
            Host::Domain(domain) => {
                let domain = domain.to_ascii_lowercase();
                if domain == "localhost" || domain.ends_with(".localhost") || domain.ends_with(".local")
                {
                    return Err(SecurityError::BlockedHost(domain));
                }
            }
            Host::Ipv4(ip) => {
                if BLOCKED_V4
                    .iter()
                    .filter_map(|cidr| cidr.parse::<Ipv4Net>().ok())
                    .any(|net| net.contains(&ip))
                {
                    return Err(SecurityError::BlockedHost(ip.to_string()));
                }
            }
            Host::Ipv6(ip) => {
                if BLOCKED_V6
                    .iter()
                    .filter_map(|cidr| cidr.parse::<Ipv6Net>().ok())
                    .any(|net| net.contains(&ip))
                {
                    return Err(SecurityError::BlockedHost(ip.to_string()));
                }
            }
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_string_redacts_debug_output() {
        let secret = SecretString::new("sk-sensitive");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(secret.expose(), "sk-sensitive");
    }

    #[test]
    fn accepts_public_http_urls() {
        let validator = UrlValidator::new();
        assert!(validator.validate("https://ablbio.com/pipeline").is_ok());
        assert!(validator.validate("http://example.com").is_ok());
    }

    #[test]
    fn rejects_non_http_schemes() {
        let validator = UrlValidator::new();
        assert!(matches!(
            validator.validate("file:///etc/passwd"),
            Err(SecurityError::DisallowedScheme(_))
        ));
        assert!(matches!(
            validator.validate("ftp://example.com"),
            Err(SecurityError::DisallowedScheme(_))
        ));
    }

    #[test]
    fn rejects_internal_hosts() {
        let validator = UrlValidator::new();
        assert!(validator.validate("http://localhost:8080/admin").is_err());
        assert!(validator.validate("http://127.0.0.1/").is_err());
        assert!(validator.validate("http://10.1.2.3/internal").is_err());
        assert!(validator.validate("http://192.168.0.10/").is_err());
    }

    #[test]
    fn private_hosts_allowed_when_configured() {
        let validator = UrlValidator::allowing_private_hosts();
        assert!(validator.validate("http://127.0.0.1:9999/test").is_ok());
    }

    #[test]
    fn rejects_garbage() {
        let validator = UrlValidator::new();
        assert!(validator.validate("not a url").is_err());
    }
}
