use rand::{distr::Alphanumeric, Rng};
use secrecy::SecretString;

const DEFAULT_ISSUER: &str = "shoplist";
const DEFAULT_AUDIENCE: &str = "shoplist";
const DEFAULT_EXPIRATION_MINUTES: i64 = 60;
const GENERATED_SECRET_LENGTH: usize = 64;

/// Signing and validation parameters for issued tokens.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: SecretString,
    pub issuer: String,
    pub audience: String,
    pub expiration_minutes: i64,
}

impl TokenConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `JWT_SECRET`: HMAC signing secret. When unset a random secret is
    ///   generated, so tokens do not survive a restart.
    /// - `JWT_ISSUER`: `iss` claim (default: `shoplist`)
    /// - `JWT_AUDIENCE`: `aud` claim (default: `shoplist`)
    /// - `JWT_EXPIRATION_MINUTES`: token lifetime (default: 60)
    pub fn from_env() -> Self {
        let secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => SecretString::from(secret),
            _ => {
                tracing::warn!(
                    "JWT_SECRET is not set, using a random secret for this process"
                );
                generate_secret()
            }
        };

        let expiration_minutes = std::env::var("JWT_EXPIRATION_MINUTES")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_EXPIRATION_MINUTES);

        Self {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| DEFAULT_AUDIENCE.to_string()),
            expiration_minutes,
        }
    }

    /// Config with a fresh random secret and default claims.
    pub fn ephemeral() -> Self {
        Self {
            secret: generate_secret(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            expiration_minutes: DEFAULT_EXPIRATION_MINUTES,
        }
    }
}

fn generate_secret() -> SecretString {
    let secret: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LENGTH)
        .map(char::from)
        .collect();
    SecretString::from(secret)
}
