use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use strum::{Display, EnumString};

use crate::checkin::{CheckinAttempt, CheckinError};
use crate::models::attendance_session;
use crate::models::user;
use crate::models::user_module_role::Role;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    /// Channel the check-in arrived through.
    pub method: CheckinMethod,
    /// True when the check-in was captured while disconnected and replayed.
    pub offline: bool,
    /// Server-side time the record was admitted.
    pub recorded_at: DateTime<Utc>,
    /// Device-side scan time; only present for offline replays.
    pub captured_at: Option<DateTime<Utc>>,
}

/// How a check-in reached the server.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "checkin_method")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CheckinMethod {
    #[sea_orm(string_value = "qr")]
    Qr,
    #[sea_orm(string_value = "pin")]
    Pin,
    #[sea_orm(string_value = "qr_offline_sync")]
    QrOfflineSync,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_session::Entity",
        from = "Column::SessionId",
        to = "super::attendance_session::Column::Id"
    )]
    Session,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Admits one check-in attempt against the authoritative store.
    ///
    /// Resolution follows the channel: QR resolves by (session id, token) in
    /// any state so an expired session is reported as expired rather than
    /// unknown, while PIN resolves among active sessions only. The insert
    /// itself arbitrates duplicates through the table's composite primary
    /// key. There is deliberately no existence check before the insert, so
    /// two concurrent attempts for the same (session, student) settle to one
    /// record and one `Duplicate` no matter how they interleave.
    pub async fn admit(
        db: &DatabaseConnection,
        attempt: CheckinAttempt,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Model, CheckinError> {
        let session = Self::resolve_session(db, &attempt).await?;

        let enrolled = user::Model::is_in_role(db, user_id, session.module_id, Role::Student).await?;
        if !enrolled {
            return Err(CheckinError::Forbidden);
        }

        if !session.usable_at(now) {
            return Err(CheckinError::Expired);
        }

        let (method, offline, captured_at) = match attempt {
            CheckinAttempt::Qr { .. } => (CheckinMethod::Qr, false, None),
            CheckinAttempt::QrOfflineSync { captured_at, .. } => {
                (CheckinMethod::QrOfflineSync, true, Some(captured_at))
            }
            CheckinAttempt::Pin { .. } => (CheckinMethod::Pin, false, None),
        };

        let record = ActiveModel {
            session_id: Set(session.id),
            user_id: Set(user_id),
            method: Set(method),
            offline: Set(offline),
            recorded_at: Set(now),
            captured_at: Set(captured_at),
        };
        match record.insert(db).await {
            Ok(model) => Ok(model),
            Err(err) => {
                let err = CheckinError::from_insert_error(err);
                if matches!(err, CheckinError::Duplicate) {
                    tracing::debug!(
                        session_id = session.id,
                        user_id,
                        "duplicate check-in settled by the records primary key"
                    );
                }
                Err(err)
            }
        }
    }

    /// Maps an attempt to its session, or to the channel's failure class.
    async fn resolve_session(
        db: &DatabaseConnection,
        attempt: &CheckinAttempt,
    ) -> Result<attendance_session::Model, CheckinError> {
        let found = match attempt {
            CheckinAttempt::Qr { session_id, qr_token }
            | CheckinAttempt::QrOfflineSync { session_id, qr_token, .. } => {
                if qr_token.is_empty() {
                    return Err(CheckinError::Validation(
                        "qr_token must not be empty".to_string(),
                    ));
                }
                attendance_session::Model::find_by_qr(db, *session_id, qr_token).await?
            }
            CheckinAttempt::Pin { code } => {
                let code = code.trim();
                if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(CheckinError::Validation(
                        "pin_code must be exactly 6 digits".to_string(),
                    ));
                }
                attendance_session::Model::find_active_by_pin(db, code).await?
            }
        };
        found.ok_or(CheckinError::NotFound)
    }

    /// All records for a session, newest first. This ordering is the
    /// contract of the attendee view.
    pub async fn for_session(
        db: &DatabaseConnection,
        session_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .order_by_desc(Column::RecordedAt)
            .all(db)
            .await
    }
}
