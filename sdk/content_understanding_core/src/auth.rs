use crate::error::{ContentUnderstandingError, ContentUnderstandingResult};
use secrecy::{ExposeSecret, SecretString};

/// Environment variable holding a Cognitive Services subscription key.
pub const API_KEY_ENV: &str = "AI_CONTENT_UNDERSTANDING_KEY";

/// Environment variable holding a pre-acquired Microsoft Entra ID access token.
pub const TOKEN_ENV: &str = "AI_CONTENT_UNDERSTANDING_TOKEN";

/// Header used by Cognitive Services for subscription keys.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Credential types supported by the Content Understanding client.
#[derive(Clone)]
pub enum ContentUnderstandingCredential {
    /// Subscription key sent in the `Ocp-Apim-Subscription-Key` header.
    ApiKey(SecretString),

    /// Microsoft Entra ID access token sent as `Authorization: Bearer <token>`.
    BearerToken(SecretString),
}

impl ContentUnderstandingCredential {
    /// Create a credential from the environment.
    ///
    /// Reads `AI_CONTENT_UNDERSTANDING_KEY` first and falls back to
    /// `AI_CONTENT_UNDERSTANDING_TOKEN`.
    pub fn from_env() -> ContentUnderstandingResult<Self> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => return Ok(Self::ApiKey(SecretString::from(key))),
            _ => {}
        }

        match std::env::var(TOKEN_ENV) {
            Ok(token) if !token.is_empty() => Ok(Self::BearerToken(SecretString::from(token))),
            _ => Err(ContentUnderstandingError::Auth(format!(
                "no credential configured. Set {API_KEY_ENV} or {TOKEN_ENV}."
            ))),
        }
    }

    /// Create an API key credential.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(SecretString::from(key.into()))
    }

    /// Create a bearer token credential.
    pub fn bearer_token(token: impl Into<String>) -> Self {
        Self::BearerToken(SecretString::from(token.into()))
    }

    /// Resolve the credential to a `(header name, header value)` pair.
    pub fn resolve(&self) -> ContentUnderstandingResult<(&'static str, String)> {
        match self {
            Self::ApiKey(key) if key.expose_secret().is_empty() => {
                Err(ContentUnderstandingError::Auth("API key is empty".into()))
            }
            Self::ApiKey(key) => Ok((SUBSCRIPTION_KEY_HEADER, key.expose_secret().to_string())),
            Self::BearerToken(token) if token.expose_secret().is_empty() => {
                Err(ContentUnderstandingError::Auth("bearer token is empty".into()))
            }
            Self::BearerToken(token) => Ok((
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            )),
        }
    }
}

impl std::fmt::Debug for ContentUnderstandingCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => write!(f, "ContentUnderstandingCredential::ApiKey(****)"),
            Self::BearerToken(_) => write!(f, "ContentUnderstandingCredential::BearerToken(****)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(TOKEN_ENV);
    }

    #[test]
    fn test_api_key_resolves_to_subscription_header() {
        let cred = ContentUnderstandingCredential::api_key("secret-key");
        let (name, value) = cred.resolve().expect("should resolve");
        assert_eq!(name, "Ocp-Apim-Subscription-Key");
        assert_eq!(value, "secret-key");
    }

    #[test]
    fn test_bearer_token_resolves_to_authorization_header() {
        let cred = ContentUnderstandingCredential::bearer_token("tok");
        let (name, value) = cred.resolve().expect("should resolve");
        assert_eq!(name, "Authorization");
        assert_eq!(value, "Bearer tok");
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        let cred = ContentUnderstandingCredential::api_key("");
        assert!(matches!(
            cred.resolve(),
            Err(ContentUnderstandingError::Auth(_))
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let cred = ContentUnderstandingCredential::api_key("super-secret");
        let debug = format!("{cred:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("****"));
    }

    #[test]
    #[serial]
    fn test_from_env_prefers_api_key() {
        clear_env();
        std::env::set_var(API_KEY_ENV, "env-key");
        std::env::set_var(TOKEN_ENV, "env-token");

        let cred = ContentUnderstandingCredential::from_env().expect("should read env");
        assert!(matches!(cred, ContentUnderstandingCredential::ApiKey(_)));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_falls_back_to_token() {
        clear_env();
        std::env::set_var(TOKEN_ENV, "env-token");

        let cred = ContentUnderstandingCredential::from_env().expect("should read env");
        assert!(matches!(cred, ContentUnderstandingCredential::BearerToken(_)));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_without_credentials_fails() {
        clear_env();
        let err = ContentUnderstandingCredential::from_env().expect_err("should fail");
        assert!(matches!(err, ContentUnderstandingError::Auth(_)));
    }
}
