//! Roll-call vote, one per (pauta item, parlamentar)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "votos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub pauta_item_id: Uuid,

    pub parlamentar_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub opcao: String,

    pub registrado_em: DateTimeWithTimeZone,

    /// Operator or integration that recorded the vote
    pub registrado_por: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pauta_item::Entity",
        from = "Column::PautaItemId",
        to = "super::pauta_item::Column::Id"
    )]
    PautaItem,

    #[sea_orm(
        belongs_to = "super::parlamentar::Entity",
        from = "Column::ParlamentarId",
        to = "super::parlamentar::Column::Id"
    )]
    Parlamentar,
}

impl Related<super::pauta_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PautaItem.def()
    }
}

impl Related<super::parlamentar::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parlamentar.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
