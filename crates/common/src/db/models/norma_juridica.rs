//! Enacted norm (law, resolution, legislative decree)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "normas_juridicas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub tipo: String,

    pub numero: i32,

    pub ano: i32,

    #[sea_orm(column_type = "Text")]
    pub ementa: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub texto: Option<String>,

    pub data_publicacao: Option<Date>,

    #[sea_orm(column_type = "Text")]
    pub situacao: String,

    /// Bill the norm originated from
    pub proposicao_id: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
