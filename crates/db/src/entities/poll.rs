//! Event poll entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Who may see a poll's results.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ResultsVisibility {
    /// Everyone who can see the poll.
    #[default]
    #[sea_orm(string_value = "all")]
    All,
    /// Only users who have responded.
    #[sea_orm(string_value = "voters")]
    Voters,
    /// Only administrators.
    #[sea_orm(string_value = "admins")]
    Admins,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event_poll")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Start of the voting window
    #[sea_orm(indexed)]
    pub start_date: DateTimeWithTimeZone,

    /// End of the voting window (null for open-ended polls)
    #[sea_orm(nullable)]
    pub end_date: Option<DateTimeWithTimeZone>,

    /// Administrative flag, stored independently of the window
    #[sea_orm(indexed)]
    pub is_active: bool,

    pub max_responses_per_user: i32,

    pub allow_multiple_choices: bool,

    pub is_anonymous: bool,

    pub results_visible_to: ResultsVisibility,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::poll_option::Entity")]
    PollOption,

    #[sea_orm(has_many = "super::poll_response::Entity")]
    PollResponse,
}

impl Related<super::poll_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollOption.def()
    }
}

impl Related<super::poll_response::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollResponse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
