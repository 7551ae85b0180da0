//! Scheduled report definition

use crate::reports::{Frequencia, RelatorioTipo};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "relatorios_agendados")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub nome: String,

    #[sea_orm(column_type = "Text")]
    pub tipo: String,

    #[sea_orm(column_type = "Text")]
    pub frequencia: String,

    /// Report-specific filters
    #[sea_orm(column_type = "JsonBinary")]
    pub parametros: Json,

    /// JSON array of e-mail addresses
    #[sea_orm(column_type = "JsonBinary")]
    pub destinatarios: Json,

    pub ativo: bool,

    pub proximo_envio: DateTimeWithTimeZone,

    /// Day of month monthly runs are anchored to
    pub dia_envio: i16,

    pub ultimo_envio: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn tipo(&self) -> crate::Result<RelatorioTipo> {
        RelatorioTipo::from_str(&self.tipo)
    }

    pub fn frequencia(&self) -> crate::Result<Frequencia> {
        Frequencia::from_str(&self.frequencia)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::relatorio_execucao::Entity")]
    Execucoes,
}

impl Related<super::relatorio_execucao::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Execucoes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
