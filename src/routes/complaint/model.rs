use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::utils::Role;

/// Lifecycle states, mirroring the static `statuses` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Received,
    UnderReview,
    Resolved,
    Rejected,
}

impl Status {
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Status::Received),
            2 => Some(Status::UnderReview),
            3 => Some(Status::Resolved),
            4 => Some(Status::Rejected),
            _ => None,
        }
    }

    pub fn id(self) -> i32 {
        match self {
            Status::Received => 1,
            Status::UnderReview => 2,
            Status::Resolved => 3,
            Status::Rejected => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::Received => "Received",
            Status::UnderReview => "Under Review",
            Status::Resolved => "Resolved",
            Status::Rejected => "Rejected",
        }
    }

    /// A resolved complaint admits no further status changes.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Resolved)
    }
}

const COMPLAINT_COLUMNS: &str = "id, user_id, description, photo_url, latitude, longitude, \
     occurred_at, created_at, address, landmark, status_id, is_deleted, deletion_reason";

#[derive(Debug, FromRow)]
pub struct Complaint {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: Option<String>,
    pub photo_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub address: Option<String>,
    pub landmark: Option<String>,
    pub status_id: i32,
    pub is_deleted: bool,
    pub deletion_reason: Option<String>,
}

/// Wire form: adds the human-readable status name and drops the
/// soft-delete bookkeeping.
#[derive(Debug, Serialize)]
pub struct ComplaintInfo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: Option<String>,
    pub photo_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub address: Option<String>,
    pub landmark: Option<String>,
    pub status_id: i32,
    pub status: &'static str,
}

impl From<Complaint> for ComplaintInfo {
    fn from(c: Complaint) -> Self {
        ComplaintInfo {
            status: Status::from_id(c.status_id).map(Status::name).unwrap_or("Unknown"),
            id: c.id,
            user_id: c.user_id,
            description: c.description,
            photo_url: c.photo_url,
            latitude: c.latitude,
            longitude: c.longitude,
            occurred_at: c.occurred_at,
            created_at: c.created_at,
            address: c.address,
            landmark: c.landmark,
            status_id: c.status_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateComplaintRequest {
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub landmark: Option<String>,
}

impl CreateComplaintRequest {
    /// Photo and coordinates are the mandatory minimum. The error names
    /// every missing field.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut missing = Vec::new();
        if self.photo_url.as_deref().is_none_or(|s| s.trim().is_empty()) {
            missing.push("photo_url");
        }
        if self.latitude.is_none() {
            missing.push("latitude");
        }
        if self.longitude.is_none() {
            missing.push("longitude");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateComplaintRequest {
    pub description: Option<String>,
    pub address: Option<String>,
    pub landmark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status_id: Option<i32>,
}

impl ChangeStatusRequest {
    /// Membership in the closed status set is a domain rule, not
    /// something to delegate to the foreign-key constraint.
    pub fn validate(&self) -> Result<Status, AppError> {
        let id = self
            .status_id
            .ok_or_else(|| AppError::Validation("status_id is required".into()))?;
        Status::from_id(id)
            .ok_or_else(|| AppError::Validation(format!("unknown status id: {id}")))
    }
}

#[derive(Debug, Deserialize)]
pub struct SoftDeleteRequest {
    pub reason: Option<String>,
}

impl SoftDeleteRequest {
    pub fn validate(&self) -> Result<String, AppError> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| AppError::Validation("a deletion reason is required".into()))
    }
}

impl Complaint {
    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        req: CreateComplaintRequest,
    ) -> Result<Self, AppError> {
        req.validate()?;
        let occurred_at = req.occurred_at.unwrap_or_else(Utc::now);

        sqlx::query_as::<_, Complaint>(&format!(
            r#"
            INSERT INTO complaints
                (id, user_id, description, photo_url, latitude, longitude, occurred_at, address, landmark)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COMPLAINT_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&req.description)
        .bind(&req.photo_url)
        .bind(req.latitude)
        .bind(req.longitude)
        .bind(occurred_at)
        .bind(&req.address)
        .bind(&req.landmark)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)
    }

    /// Citizens see their own complaints, managers see everything.
    /// Soft-deleted rows are invisible to both, newest first.
    pub async fn list_for(
        pool: &PgPool,
        requester_id: Uuid,
        role: Role,
    ) -> Result<Vec<Self>, AppError> {
        let rows = match role {
            Role::Citizen => {
                sqlx::query_as::<_, Complaint>(&format!(
                    "SELECT {COMPLAINT_COLUMNS} FROM complaints \
                     WHERE is_deleted = FALSE AND user_id = $1 \
                     ORDER BY created_at DESC",
                ))
                .bind(requester_id)
                .fetch_all(pool)
                .await?
            }
            Role::Manager => {
                sqlx::query_as::<_, Complaint>(&format!(
                    "SELECT {COMPLAINT_COLUMNS} FROM complaints \
                     WHERE is_deleted = FALSE \
                     ORDER BY created_at DESC",
                ))
                .fetch_all(pool)
                .await?
            }
        };

        Ok(rows)
    }

    /// Owner-only edit of the three mutable text fields. An absent field
    /// keeps its stored value; photo and coordinates are never touched.
    ///
    /// The existence check runs first: a non-owner probing a missing or
    /// soft-deleted id sees not-found, never forbidden.
    pub async fn update_fields(
        pool: &PgPool,
        requester_id: Uuid,
        complaint_id: Uuid,
        req: UpdateComplaintRequest,
    ) -> Result<Self, AppError> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM complaints WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(complaint_id)
        .fetch_optional(pool)
        .await?;

        let Some(owner) = owner else {
            return Err(AppError::NotFound("complaint not found".into()));
        };
        if owner != requester_id {
            return Err(AppError::Forbidden("you do not own this complaint".into()));
        }

        sqlx::query_as::<_, Complaint>(&format!(
            r#"
            UPDATE complaints
            SET description = COALESCE($1, description),
                address = COALESCE($2, address),
                landmark = COALESCE($3, landmark)
            WHERE id = $4
            RETURNING {COMPLAINT_COLUMNS}
            "#,
        ))
        .bind(&req.description)
        .bind(&req.address)
        .bind(&req.landmark)
        .bind(complaint_id)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)
    }

    /// Manager-only status transition. The terminal-state guard and the
    /// update are one conditional statement, so two concurrent calls on
    /// the same row cannot both slip past the guard; a zero-row result
    /// is then told apart as missing vs already resolved.
    pub async fn change_status(
        pool: &PgPool,
        complaint_id: Uuid,
        new_status: Status,
    ) -> Result<Self, AppError> {
        let updated = sqlx::query_as::<_, Complaint>(&format!(
            "UPDATE complaints SET status_id = $1 \
             WHERE id = $2 AND status_id <> $3 \
             RETURNING {COMPLAINT_COLUMNS}",
        ))
        .bind(new_status.id())
        .bind(complaint_id)
        .bind(Status::Resolved.id())
        .fetch_optional(pool)
        .await?;

        match updated {
            Some(row) => Ok(row),
            None => {
                let exists =
                    sqlx::query_scalar::<_, i32>("SELECT status_id FROM complaints WHERE id = $1")
                        .bind(complaint_id)
                        .fetch_optional(pool)
                        .await?;
                match exists {
                    Some(_) => Err(AppError::Conflict(
                        "resolved complaints can no longer change status".into(),
                    )),
                    None => Err(AppError::NotFound("complaint not found".into())),
                }
            }
        }
    }

    /// Owner-only soft deletion. Status is left untouched; the row stays
    /// in storage with the reason for the audit trail.
    pub async fn soft_delete(
        pool: &PgPool,
        requester_id: Uuid,
        complaint_id: Uuid,
        reason: &str,
    ) -> Result<(), AppError> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM complaints WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(complaint_id)
        .fetch_optional(pool)
        .await?;

        let Some(owner) = owner else {
            return Err(AppError::NotFound("complaint not found".into()));
        };
        if owner != requester_id {
            return Err(AppError::Forbidden("you do not own this complaint".into()));
        }

        sqlx::query("UPDATE complaints SET is_deleted = TRUE, deletion_reason = $1 WHERE id = $2")
            .bind(reason)
            .bind(complaint_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ids_roundtrip() {
        for status in [
            Status::Received,
            Status::UnderReview,
            Status::Resolved,
            Status::Rejected,
        ] {
            assert_eq!(Status::from_id(status.id()), Some(status));
        }
    }

    #[test]
    fn unknown_status_ids_are_rejected() {
        assert_eq!(Status::from_id(0), None);
        assert_eq!(Status::from_id(5), None);
        assert_eq!(Status::from_id(-1), None);
    }

    #[test]
    fn only_resolved_is_terminal() {
        assert!(Status::Resolved.is_terminal());
        assert!(!Status::Received.is_terminal());
        assert!(!Status::UnderReview.is_terminal());
        assert!(!Status::Rejected.is_terminal());
    }

    #[test]
    fn new_complaints_start_received() {
        assert_eq!(Status::from_id(1), Some(Status::Received));
        assert!(!Status::Received.is_terminal());
    }

    #[test]
    fn create_validation_names_missing_fields() {
        let req = CreateComplaintRequest {
            description: Some("lixo acumulado".into()),
            photo_url: None,
            latitude: None,
            longitude: Some(-38.52),
            occurred_at: None,
            address: None,
            landmark: None,
        };

        let Err(AppError::Validation(msg)) = req.validate() else {
            panic!("expected validation error");
        };
        assert!(msg.contains("photo_url"));
        assert!(msg.contains("latitude"));
        assert!(!msg.contains("longitude"));
    }

    #[test]
    fn create_validation_accepts_minimum_fields() {
        let req = CreateComplaintRequest {
            description: None,
            photo_url: Some("http://storage/x.jpg".into()),
            latitude: Some(-3.74),
            longitude: Some(-38.52),
            occurred_at: None,
            address: None,
            landmark: None,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn status_change_requires_known_member() {
        assert!(matches!(
            ChangeStatusRequest { status_id: None }.validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ChangeStatusRequest { status_id: Some(99) }.validate(),
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            ChangeStatusRequest { status_id: Some(3) }.validate().unwrap(),
            Status::Resolved
        );
    }

    #[test]
    fn soft_delete_requires_nonblank_reason() {
        assert!(matches!(
            SoftDeleteRequest { reason: None }.validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            SoftDeleteRequest { reason: Some("   ".into()) }.validate(),
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            SoftDeleteRequest { reason: Some(" duplicada ".into()) }
                .validate()
                .unwrap(),
            "duplicada"
        );
    }
}
