//! Committee entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comissoes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub nome: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub sigla: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub descricao: Option<String>,

    /// Standing committee, as opposed to a temporary one (CPI, special)
    pub permanente: bool,

    pub ativa: bool,

    pub data_criacao: Option<Date>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::membro_comissao::Entity")]
    Membros,

    #[sea_orm(has_many = "super::reuniao_comissao::Entity")]
    Reunioes,
}

impl Related<super::membro_comissao::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Membros.def()
    }
}

impl Related<super::reuniao_comissao::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reunioes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
