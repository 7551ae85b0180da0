//! Bill or motion under consideration

use crate::legislative::{ProposicaoStatus, ProposicaoTipo};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proposicoes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub tipo: String,

    /// Unique per (tenant, tipo, ano)
    pub numero: i32,

    pub ano: i32,

    #[sea_orm(column_type = "Text")]
    pub ementa: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub texto: Option<String>,

    /// Authoring parlamentar
    pub autor_id: Option<Uuid>,

    /// Author outside the chamber (Executivo, popular initiative)
    #[sea_orm(column_type = "Text", nullable)]
    pub autor_externo: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub data_apresentacao: Date,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn status(&self) -> crate::Result<ProposicaoStatus> {
        ProposicaoStatus::from_str(&self.status)
    }

    /// "PL 12/2024"
    pub fn identificador(&self) -> String {
        match ProposicaoTipo::from_str(&self.tipo) {
            Ok(tipo) => tipo.identificador(self.numero, self.ano),
            Err(_) => format!("{} {}/{}", self.tipo, self.numero, self.ano),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::parlamentar::Entity",
        from = "Column::AutorId",
        to = "super::parlamentar::Column::Id"
    )]
    Autor,

    #[sea_orm(has_many = "super::pauta_item::Entity")]
    PautaItens,
}

impl Related<super::parlamentar::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Autor.def()
    }
}

impl Related<super::pauta_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PautaItens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
