//! Plenary session entity

use crate::legislative::{SessaoStatus, SessaoTipo};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessoes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub legislatura_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub tipo: String,

    /// Sequential number within (tipo, legislatura, ano)
    pub numero: i32,

    /// Title rendered from the tenant's nomenclature template
    #[sea_orm(column_type = "Text")]
    pub titulo: String,

    pub data: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text", nullable)]
    pub local: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub iniciada_em: Option<DateTimeWithTimeZone>,

    pub encerrada_em: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub observacoes: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn status(&self) -> crate::Result<SessaoStatus> {
        SessaoStatus::from_str(&self.status)
    }

    pub fn tipo(&self) -> crate::Result<SessaoTipo> {
        SessaoTipo::from_str(&self.tipo)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,

    #[sea_orm(
        belongs_to = "super::legislatura::Entity",
        from = "Column::LegislaturaId",
        to = "super::legislatura::Column::Id"
    )]
    Legislatura,

    #[sea_orm(has_many = "super::pauta_item::Entity")]
    PautaItens,

    #[sea_orm(has_many = "super::presenca::Entity")]
    Presencas,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::legislatura::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Legislatura.def()
    }
}

impl Related<super::pauta_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PautaItens.def()
    }
}

impl Related<super::presenca::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Presencas.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
