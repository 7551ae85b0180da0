//! One run of a scheduled report

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "relatorio_execucoes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub relatorio_id: Uuid,

    pub periodo_inicio: DateTimeWithTimeZone,

    pub periodo_fim: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub resultado: Option<Json>,

    #[sea_orm(column_type = "Text", nullable)]
    pub erro: Option<String>,

    pub executado_em: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::relatorio_agendado::Entity",
        from = "Column::RelatorioId",
        to = "super::relatorio_agendado::Column::Id"
    )]
    Relatorio,
}

impl Related<super::relatorio_agendado::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Relatorio.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
