//! Committee meeting

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reunioes_comissao")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub comissao_id: Uuid,

    pub data: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text", nullable)]
    pub local: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub pauta: Option<String>,

    /// Minutes, filled in once the meeting happened
    #[sea_orm(column_type = "Text", nullable)]
    pub ata: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::comissao::Entity",
        from = "Column::ComissaoId",
        to = "super::comissao::Column::Id"
    )]
    Comissao,
}

impl Related<super::comissao::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comissao.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
