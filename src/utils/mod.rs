use axum::Json;
use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

/// Stored hashes were produced with 10 rounds; changing this would
/// orphan every existing credential.
const BCRYPT_COST: u32 = 10;

/// Hash a password on the blocking pool. bcrypt is deliberately slow and
/// must not stall other in-flight requests.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash(password, BCRYPT_COST))
        .await
        .map_err(|e| {
            tracing::error!("hash task panicked: {e}");
            AppError::Internal
        })?
        .map_err(AppError::from)
}

/// Verify a password against a stored hash, also on the blocking pool.
pub async fn verify_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let hashed = hashed.to_owned();
    tokio::task::spawn_blocking(move || verify(password, &hashed))
        .await
        .map_err(|e| {
            tracing::error!("verify task panicked: {e}");
            AppError::Internal
        })?
        .map_err(AppError::from)
}

/// Closed role space. Parsing is the only way in, so an unrecognized role
/// string can never reach a dispatch site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Manager,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Manager => "manager",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "citizen" => Some(Role::Citizen),
            "manager" => Some(Role::Manager),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user id.
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issue a signed session token embedding the user's identity and role.
pub fn generate_token(
    user_id: Uuid,
    email: &str,
    name: &str,
    role: Role,
    config: &Config,
) -> Result<String, AppError> {
    let iat = Utc::now().timestamp();
    let exp = iat + config.jwt_expiration().as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        email: email.to_owned(),
        name: name.to_owned(),
        role,
        iat,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("failed to sign token: {e}");
        AppError::Internal
    })
}

/// Validate signature and expiry, yielding the embedded identity.
///
/// Expired, malformed and tampered tokens all surface as the same
/// rejection class; the distinction is only logged.
pub fn verify_token(token: &str, config: &Config) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("rejected token: {:?}", e.kind());
        AppError::InvalidToken("invalid or expired token".into())
    })
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn success_to_api_response<T: Serialize>(
    message: Option<&str>,
    data: T,
) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.map(str::to_owned),
        data: Some(data),
    })
}

/// Success envelope with a message and no payload.
pub fn message_to_api_response(message: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        message: Some(message.to_owned()),
        data: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/unused".into(),
            jwt_secret: "test-secret".into(),
            jwt_expiration_secs: 24 * 3600,
            admin_secret: "admin-secret".into(),
            server_host: "127.0.0.1".into(),
            server_port: 0,
            api_base_uri: "/api".into(),
        }
    }

    #[test]
    fn token_roundtrip_preserves_identity() {
        let config = test_config();
        let user_id = Uuid::new_v4();

        let token =
            generate_token(user_id, "ana@x.com", "Ana", Role::Citizen, &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "ana@x.com");
        assert_eq!(claims.name, "Ana");
        assert_eq!(claims.role, Role::Citizen);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "ana@x.com".into(),
            name: "Ana".into(),
            role: Role::Citizen,
            // Well past the default validation leeway.
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            verify_token(&token, &config),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let config = test_config();
        let mut other = test_config();
        other.jwt_secret = "some-other-secret".into();

        let token =
            generate_token(Uuid::new_v4(), "a@x.com", "A", Role::Manager, &other).unwrap();

        assert!(matches!(
            verify_token(&token, &config),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let config = test_config();
        assert!(matches!(
            verify_token("not-a-token", &config),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn token_with_unknown_role_is_rejected() {
        // A role outside the closed enum must fail verification, not leak
        // through as an unrecognized string.
        let config = test_config();
        let now = Utc::now().timestamp();
        let claims = serde_json::json!({
            "sub": Uuid::new_v4(),
            "email": "x@x.com",
            "name": "X",
            "role": "superuser",
            "iat": now,
            "exp": now + 3600,
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            verify_token(&token, &config),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn role_parsing_is_closed() {
        assert_eq!(Role::parse("citizen"), Some(Role::Citizen));
        assert_eq!(Role::parse("manager"), Some(Role::Manager));
        assert_eq!(Role::parse("gestor"), None);
        assert_eq!(Role::parse("Citizen"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[tokio::test]
    async fn password_hash_roundtrip() {
        let hashed = hash_password("senha123").await.unwrap();
        assert_ne!(hashed, "senha123");
        assert!(verify_password("senha123", &hashed).await.unwrap());
        assert!(!verify_password("senha124", &hashed).await.unwrap());
    }
}
