//! Numbering counter, see `legislative::nomenclature`

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sequencias")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub escopo: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub legislatura: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub ano: i32,

    /// Last number handed out
    pub valor: i64,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
