//! Public consultation

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "consultas_publicas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub titulo: String,

    #[sea_orm(column_type = "Text")]
    pub descricao: String,

    pub proposicao_id: Option<Uuid>,

    pub abertura: DateTimeWithTimeZone,

    pub encerramento: DateTimeWithTimeZone,

    pub ativa: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Accepting opinions at `now`
    pub fn is_open_at(&self, now: DateTimeWithTimeZone) -> bool {
        self.ativa && self.abertura <= now && now < self.encerramento
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::opiniao_consulta::Entity")]
    Opinioes,
}

impl Related<super::opiniao_consulta::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Opinioes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
