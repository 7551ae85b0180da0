//! Member of the chamber (vereador)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parlamentares")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub nome: String,

    /// Name used in the chamber, unique per tenant
    #[sea_orm(column_type = "Text")]
    pub nome_parlamentar: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub partido: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub email: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub telefone: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub foto_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub biografia: Option<String>,

    /// Seat on the board (Presidente, 1º Secretário, ...)
    #[sea_orm(column_type = "Text", nullable)]
    pub cargo_mesa: Option<String>,

    pub ativo: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,

    #[sea_orm(has_many = "super::voto::Entity")]
    Votos,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::voto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votos.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
