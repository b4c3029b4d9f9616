//! Manage json web tokens.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

/// Access token lifetime, in seconds. 15 minutes.
pub const ACCESS_EXPIRATION_TIME: u64 = 60 * 15;
/// Refresh token lifetime, in seconds. 15 days.
pub const REFRESH_EXPIRATION_TIME: u64 = 60 * 60 * 24 * 15;

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: u64,
    /// Identifies the time at which the JWT was issued.
    pub iat: u64,
    /// Identifies the organization that issued the JWT.
    pub iss: String,
    /// Unique token identifier. Two tokens minted for the same user in the
    /// same second must still differ.
    pub jti: String,
    /// User ID.
    pub sub: String,
}

/// Manage JWT tokens.
///
/// Access and refresh tokens carry the same claim set but are signed with
/// distinct secrets: a refresh token never verifies as an access token and
/// vice versa.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    name: String,
}

impl TokenManager {
    /// Create a new [`TokenManager`] instance.
    pub fn new(name: &str, access_secret: &str, refresh_secret: &str) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(
                refresh_secret.as_bytes(),
            ),
            refresh_decoding: DecodingKey::from_secret(
                refresh_secret.as_bytes(),
            ),
            name: name.to_owned(),
        }
    }

    fn sign(
        &self,
        key: &EncodingKey,
        user_id: &str,
        lifetime: u64,
    ) -> Result<String> {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| ServerError::Internal {
                details: "system clock before unix epoch".into(),
                source: Some(Box::new(err)),
            })?
            .as_secs();
        let mut bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut bytes);

        let header = Header::new(self.algorithm);
        let claims = Claims {
            exp: time + lifetime,
            iat: time,
            iss: self.name.clone(),
            jti: hex::encode(bytes),
            sub: user_id.to_owned(),
        };

        encode(&header, &claims, key).map_err(|err| ServerError::Internal {
            details: "cannot sign token".into(),
            source: Some(Box::new(err)),
        })
    }

    fn verify(&self, key: &DecodingKey, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[&self.name]);

        decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|_| ServerError::InvalidToken)
    }

    /// Create a new short-lived access token.
    pub fn create_access(&self, user_id: &str) -> Result<String> {
        self.sign(&self.access_encoding, user_id, ACCESS_EXPIRATION_TIME)
    }

    /// Create a new long-lived refresh token.
    pub fn create_refresh(&self, user_id: &str) -> Result<String> {
        self.sign(&self.refresh_encoding, user_id, REFRESH_EXPIRATION_TIME)
    }

    /// Decode and check an access token.
    pub fn decode_access(&self, token: &str) -> Result<Claims> {
        self.verify(&self.access_decoding, token)
    }

    /// Decode and check a refresh token.
    pub fn decode_refresh(&self, token: &str) -> Result<Claims> {
        self.verify(&self.refresh_decoding, token)
    }
}
