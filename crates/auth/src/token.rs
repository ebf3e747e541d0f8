use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use shoplist_core::entity::{User, DEFAULT_IMAGE_NAME};
use uuid::Uuid;

use crate::{AuthError, TokenConfig};

/// Claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub jti: String,
    pub name: String,
    pub id: String,
    /// Signed avatar URL, or the default image name.
    pub image: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates HS256 tokens.
#[derive(Debug, Clone)]
pub struct TokenService {
    config: TokenConfig,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Token for `user`. `image_url` is the resolved avatar URL, if any.
    pub fn generate(&self, user: &User, image_url: Option<String>) -> Result<String, AuthError> {
        self.generate_at(user, image_url, Utc::now())
    }

    fn generate_at(
        &self,
        user: &User,
        image_url: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user.id.to_string(),
            jti: Uuid::new_v4().to_string(),
            name: user.user_name.clone(),
            id: user.id.to_string(),
            image: image_url.unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string()),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.config.expiration_minutes)).timestamp(),
        };

        let key = EncodingKey::from_secret(self.config.secret.expose_secret().as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| AuthError::Token(e.to_string()))
    }

    /// Decodes `token`, checking signature, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let key = DecodingKey::from_secret(self.config.secret.expose_secret().as_bytes());
        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::Token(e.to_string()))
    }
}
