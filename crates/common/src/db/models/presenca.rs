//! Attendance record

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "presencas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub sessao_id: Uuid,

    pub parlamentar_id: Uuid,

    pub presente: bool,

    #[sea_orm(column_type = "Text", nullable)]
    pub justificativa: Option<String>,

    pub registrado_em: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sessao::Entity",
        from = "Column::SessaoId",
        to = "super::sessao::Column::Id"
    )]
    Sessao,
}

impl Related<super::sessao::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessao.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
