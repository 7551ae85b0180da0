//! Transparency publication

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "publicacoes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub categoria: String,

    #[sea_orm(column_type = "Text")]
    pub titulo: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub descricao: Option<String>,

    /// Fiscal year the document refers to
    pub ano: i32,

    #[sea_orm(column_type = "Text")]
    pub arquivo_url: String,

    pub publicada: bool,

    pub publicada_em: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
