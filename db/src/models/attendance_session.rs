use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, RngCore};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::models::user_module_role::{Column as RoleColumn, Entity as RoleEntity, Role};

/// Number of random bytes in the unpredictable half of a QR token.
const QR_TOKEN_RANDOM_BYTES: usize = 16;
/// PINs are drawn uniformly from `0..PIN_SPACE` and zero-padded to six digits.
const PIN_SPACE: u32 = 1_000_000;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "attendance_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub module_id: i64,
    pub created_by: i64,
    pub title: String,
    /// Opaque per-session token embedded in the QR payload.
    #[serde(skip_serializing)]
    pub qr_token: String,
    /// Six-digit code for manual entry, unique among active sessions.
    pub pin_code: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::module::Entity",
        from = "Column::ModuleId",
        to = "super::module::Column::Id"
    )]
    Module,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::module::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Module.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Opens a new time-boxed session for a module.
    ///
    /// The QR token and PIN are generated here and never change for the
    /// lifetime of the session. `now` is passed in rather than read from the
    /// clock so callers control the window deterministically.
    pub async fn create(
        db: &DatabaseConnection,
        module_id: i64,
        created_by: i64,
        title: &str,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        let pin_code = Self::unused_active_pin(db).await?;
        let session = ActiveModel {
            module_id: Set(module_id),
            created_by: Set(created_by),
            title: Set(title.to_owned()),
            qr_token: Set(Self::generate_qr_token(now)),
            pin_code: Set(pin_code),
            active: Set(true),
            created_at: Set(now),
            expires_at: Set(now + duration),
            ended_at: Set(None),
            ..Default::default()
        };
        session.insert(db).await
    }

    /// Generates an opaque session token: creation time in milliseconds plus
    /// 16 bytes from the OS RNG, hex-encoded. The timestamp half makes tokens
    /// trivially unique across sessions; the random half makes them
    /// unguessable.
    fn generate_qr_token(now: DateTime<Utc>) -> String {
        let mut random = [0u8; QR_TOKEN_RANDOM_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut random);
        let millis = now.timestamp_millis().max(0) as u64;
        format!("{}{}", hex::encode(millis.to_be_bytes()), hex::encode(random))
    }

    fn generate_pin() -> String {
        let n: u32 = rand::rngs::OsRng.gen_range(0..PIN_SPACE);
        format!("{n:06}")
    }

    /// Draws a PIN no currently-active session holds.
    ///
    /// PIN uniqueness only matters among active sessions, so ended and
    /// expired sessions do not shrink the space. Collisions are resolved by
    /// redrawing a bounded number of times rather than by a table constraint.
    async fn unused_active_pin(db: &DatabaseConnection) -> Result<String, DbErr> {
        const ATTEMPTS: usize = 5;
        for _ in 0..ATTEMPTS {
            let candidate = Self::generate_pin();
            let taken = Entity::find()
                .filter(Column::Active.eq(true))
                .filter(Column::PinCode.eq(candidate.as_str()))
                .one(db)
                .await?
                .is_some();
            if !taken {
                return Ok(candidate);
            }
        }
        Err(DbErr::Custom(
            "Could not allocate an unused PIN for the new session".to_string(),
        ))
    }

    /// Whether the session admits check-ins at `now`: still active and not
    /// yet at its expiry instant. The expiry boundary itself is closed.
    pub fn usable_at(&self, now: DateTime<Utc>) -> bool {
        self.active && now < self.expires_at
    }

    /// Ends the session early. Ending is one-way and idempotent: an
    /// already-ended session is returned unchanged.
    pub async fn end(self, db: &DatabaseConnection, now: DateTime<Utc>) -> Result<Model, DbErr> {
        if !self.active {
            return Ok(self);
        }
        let mut session: ActiveModel = self.into();
        session.active = Set(false);
        session.ended_at = Set(Some(now));
        session.update(db).await
    }

    /// The opaque string rendered as this session's QR code.
    pub fn qr_payload(&self) -> String {
        util::qr::encode(&util::qr::QrPayload {
            session_id: self.id,
            qr_token: self.qr_token.clone(),
            expires_at: self.expires_at,
        })
    }

    /// Resolves a QR attempt by (session id, token), regardless of state.
    /// Callers distinguish "unknown" from "known but expired" themselves.
    pub async fn find_by_qr(
        db: &DatabaseConnection,
        session_id: i64,
        qr_token: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::Id.eq(session_id))
            .filter(Column::QrToken.eq(qr_token))
            .one(db)
            .await
    }

    /// Resolves a PIN among active sessions only; an ended session's PIN is
    /// indistinguishable from one that never existed.
    pub async fn find_active_by_pin(
        db: &DatabaseConnection,
        pin_code: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::Active.eq(true))
            .filter(Column::PinCode.eq(pin_code))
            .one(db)
            .await
    }

    pub async fn find_by_id_and_module(
        db: &DatabaseConnection,
        session_id: i64,
        module_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::Id.eq(session_id))
            .filter(Column::ModuleId.eq(module_id))
            .one(db)
            .await
    }

    /// Newest active session for a module, if any.
    pub async fn find_active_for_module(
        db: &DatabaseConnection,
        module_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::ModuleId.eq(module_id))
            .filter(Column::Active.eq(true))
            .order_by_desc(Column::CreatedAt)
            .one(db)
            .await
    }

    /// Number of students enrolled in the session's module, for turnout
    /// figures on session views.
    pub async fn student_count_for_module(
        db: &DatabaseConnection,
        module_id: i64,
    ) -> Result<i64, DbErr> {
        let n = RoleEntity::find()
            .filter(RoleColumn::ModuleId.eq(module_id))
            .filter(RoleColumn::Role.eq(Role::Student))
            .count(db)
            .await?;
        Ok(n as i64)
    }

    /// Number of recorded check-ins for a session.
    pub async fn attended_count(db: &DatabaseConnection, session_id: i64) -> Result<i64, DbErr> {
        let n = super::attendance_record::Entity::find()
            .filter(super::attendance_record::Column::SessionId.eq(session_id))
            .count(db)
            .await?;
        Ok(n as i64)
    }

    /// Check-in counts for a batch of sessions in one grouped query, keyed
    /// by session id. Sessions with no records are absent from the map.
    pub async fn attended_counts_for(
        db: &DatabaseConnection,
        session_ids: &[i64],
    ) -> Result<HashMap<i64, i64>, DbErr> {
        use super::attendance_record::{Column as RecordColumn, Entity as RecordEntity};

        if session_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(i64, i64)> = RecordEntity::find()
            .select_only()
            .column(RecordColumn::SessionId)
            .column_as(RecordColumn::UserId.count(), "n")
            .filter(RecordColumn::SessionId.is_in(session_ids.to_vec()))
            .group_by(RecordColumn::SessionId)
            .into_tuple()
            .all(db)
            .await?;
        Ok(rows.into_iter().collect())
    }
}
