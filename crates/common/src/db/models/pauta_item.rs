//! Agenda item of a session

use crate::legislative::{Apuracao, PautaStatus, QuorumTipo};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pauta_itens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub sessao_id: Uuid,

    pub proposicao_id: Option<Uuid>,

    /// Position in the agenda, 1-based
    pub ordem: i32,

    #[sea_orm(column_type = "Text")]
    pub descricao: String,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    #[sea_orm(column_type = "Text")]
    pub quorum: String,

    /// Stored tally once voting is closed
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub apuracao: Option<Json>,

    #[sea_orm(column_type = "Text", nullable)]
    pub resultado: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn status(&self) -> crate::Result<PautaStatus> {
        PautaStatus::from_str(&self.status)
    }

    pub fn quorum(&self) -> crate::Result<QuorumTipo> {
        QuorumTipo::from_str(&self.quorum)
    }

    pub fn apuracao(&self) -> Option<Apuracao> {
        self.apuracao
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sessao::Entity",
        from = "Column::SessaoId",
        to = "super::sessao::Column::Id"
    )]
    Sessao,

    #[sea_orm(
        belongs_to = "super::proposicao::Entity",
        from = "Column::ProposicaoId",
        to = "super::proposicao::Column::Id"
    )]
    Proposicao,

    #[sea_orm(has_many = "super::voto::Entity")]
    Votos,
}

impl Related<super::sessao::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessao.def()
    }
}

impl Related<super::proposicao::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proposicao.def()
    }
}

impl Related<super::voto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votos.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
