use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::utils::{Role, hash_password, verify_password};

/// Full user row. Never serialized directly; responses go through
/// `PublicUser` so the hash cannot leak.
#[derive(Debug, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    pub active: bool,
}

/// Identity fields safe to hand back to callers.
#[derive(Debug, Serialize, FromRow)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
}

/// A registration that passed validation: required fields present, role
/// inside the closed enum, birth date parsed.
#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeactivateRequest {
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// The mobile app submits birth dates as DD/MM/YYYY. Anything else is
/// stored as absent rather than rejected.
pub(super) fn parse_birth_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%d/%m/%Y").ok()
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, AppError> {
        let name = non_blank(self.name);
        let email = non_blank(self.email);
        let password = non_blank(self.password);
        let role = non_blank(self.role);

        let (Some(name), Some(email), Some(password), Some(role)) =
            (name, email, password, role)
        else {
            return Err(AppError::Validation(
                "name, email, password and role are required".into(),
            ));
        };

        let role = Role::parse(&role).ok_or_else(|| {
            AppError::Validation("role must be \"citizen\" or \"manager\"".into())
        })?;

        Ok(Registration {
            name,
            email,
            password,
            role,
            birth_date: self.birth_date.as_deref().and_then(parse_birth_date),
            phone: non_blank(self.phone),
            tax_id: non_blank(self.tax_id),
        })
    }
}

impl LoginRequest {
    pub fn validate(self) -> Result<(String, String), AppError> {
        match (non_blank(self.email), non_blank(self.password)) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(AppError::Validation("email and password are required".into())),
        }
    }
}

impl UpdateProfileRequest {
    /// At least one of the two mutable profile fields must be supplied.
    pub fn validate(self) -> Result<(Option<String>, Option<String>), AppError> {
        let email = non_blank(self.email);
        let phone = non_blank(self.phone);
        if email.is_none() && phone.is_none() {
            return Err(AppError::Validation("no fields to update".into()));
        }
        Ok((email, phone))
    }
}

impl UpdatePasswordRequest {
    pub fn validate(self) -> Result<(String, String), AppError> {
        let (Some(current), Some(new)) =
            (non_blank(self.current_password), non_blank(self.new_password))
        else {
            return Err(AppError::Validation(
                "current password and new password are required".into(),
            ));
        };

        if new.len() < 6 {
            return Err(AppError::Validation(
                "new password must be at least 6 characters long".into(),
            ));
        }

        Ok((current, new))
    }
}

/// Map a duplicate-key failure onto the conflicting field where the
/// constraint name makes that determinable.
fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("users_email_key") => AppError::Conflict("email already in use".into()),
                Some("users_tax_id_key") => AppError::Conflict("tax id already in use".into()),
                _ => AppError::Conflict("email or tax id already in use".into()),
            };
        }
    }
    AppError::from(e)
}

impl User {
    pub async fn create(pool: &PgPool, reg: Registration) -> Result<PublicUser, AppError> {
        let password_hash = hash_password(&reg.password).await?;

        sqlx::query_as::<_, PublicUser>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, birth_date, phone, tax_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, email, role
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&reg.name)
        .bind(&reg.email)
        .bind(&password_hash)
        .bind(reg.role.as_str())
        .bind(reg.birth_date)
        .bind(&reg.phone)
        .bind(&reg.tax_id)
        .fetch_one(pool)
        .await
        .map_err(map_unique_violation)
    }

    /// Deactivated accounts are invisible here, so their logins fail the
    /// same way nonexistent ones do.
    pub async fn find_active_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, birth_date, phone, tax_id, active
            FROM users
            WHERE email = $1 AND active = TRUE
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)
    }

    pub fn parsed_role(&self) -> Result<Role, AppError> {
        Role::parse(&self.role).ok_or_else(|| {
            tracing::error!("user {} has unrecognized role {:?}", self.id, self.role);
            AppError::Internal
        })
    }

    pub fn into_public(self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
        }
    }

    /// Per-field update: an absent field keeps its stored value.
    pub async fn update_profile(
        pool: &PgPool,
        user_id: Uuid,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<PublicUser, AppError> {
        sqlx::query_as::<_, PublicUser>(
            r#"
            UPDATE users
            SET email = COALESCE($1, email), phone = COALESCE($2, phone)
            WHERE id = $3
            RETURNING id, name, email, role
            "#,
        )
        .bind(email)
        .bind(phone)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(map_unique_violation)
    }

    pub async fn change_password(
        pool: &PgPool,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let stored = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM users WHERE id = $1 AND active = TRUE",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        let Some(stored) = stored else {
            return Err(AppError::NotFound("user not found".into()));
        };

        if !verify_password(current_password, &stored).await? {
            return Err(AppError::Authentication("current password is incorrect".into()));
        }

        let new_hash = hash_password(new_password).await?;
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(new_hash)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Soft-delete: flips the active flag after re-verifying the
    /// password. Outstanding tokens stay valid until they expire.
    pub async fn deactivate(
        pool: &PgPool,
        user_id: Uuid,
        password: &str,
    ) -> Result<(), AppError> {
        let stored = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM users WHERE id = $1 AND active = TRUE",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        let Some(stored) = stored else {
            return Err(AppError::NotFound("user not found".into()));
        };

        if !verify_password(password, &stored).await? {
            return Err(AppError::Authentication("password is incorrect".into()));
        }

        sqlx::query("UPDATE users SET active = FALSE WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
