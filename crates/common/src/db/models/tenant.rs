//! Tenant entity: one municipal chamber

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub slug: String,

    #[sea_orm(column_type = "Text")]
    pub nome: String,

    /// Custom domain, e.g. `camaraourinhos.sp.gov.br`
    #[sea_orm(column_type = "Text", nullable, unique)]
    pub dominio: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub cidade: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub uf: Option<String>,

    pub ativo: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn resolved(&self) -> crate::tenancy::ResolvedTenant {
        crate::tenancy::ResolvedTenant {
            id: self.id,
            slug: self.slug.clone(),
            nome: self.nome.clone(),
            dominio: self.dominio.clone(),
            ativo: self.ativo,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::usuario::Entity")]
    Usuarios,

    #[sea_orm(has_many = "super::parlamentar::Entity")]
    Parlamentares,

    #[sea_orm(has_many = "super::sessao::Entity")]
    Sessoes,
}

impl Related<super::usuario::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usuarios.def()
    }
}

impl Related<super::parlamentar::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parlamentares.def()
    }
}

impl Related<super::sessao::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessoes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
