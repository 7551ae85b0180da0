//! News article

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "noticias")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub titulo: String,

    /// URL slug, unique per tenant
    #[sea_orm(column_type = "Text")]
    pub slug: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub resumo: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub conteudo: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub imagem_url: Option<String>,

    pub publicada: bool,

    pub publicada_em: Option<DateTimeWithTimeZone>,

    pub autor_id: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
