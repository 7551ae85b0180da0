//! Committee membership

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "membros_comissao")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub comissao_id: Uuid,

    pub parlamentar_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub cargo: String,

    pub data_inicio: Date,

    pub data_fim: Option<Date>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::comissao::Entity",
        from = "Column::ComissaoId",
        to = "super::comissao::Column::Id"
    )]
    Comissao,

    #[sea_orm(
        belongs_to = "super::parlamentar::Entity",
        from = "Column::ParlamentarId",
        to = "super::parlamentar::Column::Id"
    )]
    Parlamentar,
}

impl Related<super::comissao::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comissao.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
