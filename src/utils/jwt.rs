use jsonwebtoken::{DecodingKey, Validation, decode};

use crate::config::jwt::JwtConfig;
use crate::middleware::auth::Claims;
use crate::utils::errors::AppError;

/// Verify a bearer token issued by the external identity collaborator.
/// This service never issues tokens itself.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token".to_string()))
}
