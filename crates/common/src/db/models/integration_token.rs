//! Integration token entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "integration_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub nome: String,

    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text", unique)]
    pub token_hash: String,

    /// First characters of the token, for display
    #[sea_orm(column_type = "Text")]
    pub prefixo: String,

    /// JSON array of permission strings
    #[sea_orm(column_type = "JsonBinary")]
    pub permissoes: Json,

    pub criado_por: Option<Uuid>,

    pub last_used_at: Option<DateTimeWithTimeZone>,

    pub expires_at: Option<DateTimeWithTimeZone>,

    pub revogado: bool,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn permissions(&self) -> Vec<String> {
        serde_json::from_value(self.permissoes.clone()).unwrap_or_default()
    }

    pub fn is_usable(&self) -> bool {
        let not_expired = self
            .expires_at
            .map(|exp| exp > chrono::Utc::now())
            .unwrap_or(true);
        !self.revogado && not_expired
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
