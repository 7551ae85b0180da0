//! Legislature: the four-year term of a chamber

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "legislaturas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub numero: i32,

    pub data_inicio: Date,

    pub data_fim: Date,

    /// Exactly one legislature per tenant is current
    pub atual: bool,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn reference(&self) -> crate::legislative::LegislaturaRef {
        use chrono::Datelike;
        crate::legislative::LegislaturaRef {
            numero: self.numero,
            ano_inicio: self.data_inicio.year(),
        }
    }

    pub fn contains(&self, date: Date) -> bool {
        self.data_inicio <= date && date <= self.data_fim
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sessao::Entity")]
    Sessoes,
}

impl Related<super::sessao::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessoes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
