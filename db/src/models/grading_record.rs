use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::DeriveActiveEnum;
use sea_orm::QueryFilter;
use sea_orm::QueryOrder;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "grading_status")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GradingStatus {
    /// First grading decision for a response.
    #[sea_orm(string_value = "graded")]
    Graded,

    /// A superseding decision; `regraded_from` points at the prior record.
    #[sea_orm(string_value = "regraded")]
    Regraded,
}

/// One manual grading decision for a response.
///
/// The ledger is append-only: a regrade appends a new record and flips
/// `superseded` on the prior one, it never rewrites or deletes history.
/// At most one record per response has `superseded = false`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "grading_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub response_id: i64,
    pub teacher_id: i64,

    pub marks_obtained: f64,
    pub feedback: Option<String>,
    pub comment: Option<String>,

    pub status: GradingStatus,
    /// Historical once a later record replaces this one.
    pub superseded: bool,
    /// Back-reference to the record this one replaced, for regrades.
    pub regraded_from: Option<i64>,
    pub regrade_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::response::Entity",
        from = "Column::ResponseId",
        to = "super::response::Column::Id"
    )]
    Response,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TeacherId",
        to = "super::user::Column::Id"
    )]
    Teacher,
}

impl Related<super::response::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Response.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields for appending a new record to the ledger.
#[derive(Debug, Clone)]
pub struct NewGradingRecord {
    pub response_id: i64,
    pub teacher_id: i64,
    pub marks_obtained: f64,
    pub feedback: Option<String>,
    pub comment: Option<String>,
    pub status: GradingStatus,
    pub regraded_from: Option<i64>,
    pub regrade_reason: Option<String>,
}

impl Model {
    pub async fn append<C>(db: &C, record: NewGradingRecord) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        let active_model = ActiveModel {
            response_id: Set(record.response_id),
            teacher_id: Set(record.teacher_id),
            marks_obtained: Set(record.marks_obtained),
            feedback: Set(record.feedback),
            comment: Set(record.comment),
            status: Set(record.status),
            superseded: Set(false),
            regraded_from: Set(record.regraded_from),
            regrade_reason: Set(record.regrade_reason),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    /// The record that currently stands for this response, if any.
    pub async fn current_for<C>(db: &C, response_id: i64) -> Result<Option<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::ResponseId.eq(response_id))
            .filter(Column::Superseded.eq(false))
            .one(db)
            .await
    }

    /// Full audit trail for a response, most recent first.
    pub async fn history_for<C>(db: &C, response_id: i64) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::ResponseId.eq(response_id))
            .order_by_desc(Column::Id)
            .all(db)
            .await
    }

    /// Mark the current record historical, returning it. No-op when the
    /// response has no current record.
    pub async fn supersede_current<C>(db: &C, response_id: i64) -> Result<Option<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        let Some(current) = Self::current_for(db, response_id).await? else {
            return Ok(None);
        };

        let mut active: ActiveModel = current.into();
        active.superseded = Set(true);
        active.updated_at = Set(Utc::now());
        let superseded = active.update(db).await?;
        Ok(Some(superseded))
    }
}
