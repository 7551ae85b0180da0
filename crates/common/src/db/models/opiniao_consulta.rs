//! Citizen opinion on a public consultation

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "opinioes_consulta")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub consulta_id: Uuid,

    #[sea_orm(column_type = "Text", nullable)]
    pub nome: Option<String>,

    /// One opinion per e-mail and consultation
    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text", nullable)]
    pub email: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub opiniao: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub comentario: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::consulta_publica::Entity",
        from = "Column::ConsultaId",
        to = "super::consulta_publica::Column::Id"
    )]
    Consulta,
}

impl Related<super::consulta_publica::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Consulta.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
