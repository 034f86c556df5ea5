use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::model::UserId;

/// Bearer token payload. Tokens are issued by the identity provider; this
/// service only verifies them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    pub sub: String,
    pub exp: usize,
    pub jti: String,
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
pub fn issue_token(user_id: UserId, token_type: TokenType, secret: &str, ttl: u64) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode, get_current_timestamp};

    let claims = Claims {
        user_id,
        sub: format!("user-{user_id}"),
        exp: (get_current_timestamp() + ttl) as usize,
        jti: uuid::Uuid::new_v4().to_string(),
        token_type,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
