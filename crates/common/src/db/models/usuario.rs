//! Staff account of a chamber

use crate::auth::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usuarios")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub nome: String,

    /// Unique per tenant, stored lowercase
    #[sea_orm(column_type = "Text")]
    pub email: String,

    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text")]
    pub senha_hash: String,

    #[sea_orm(column_type = "Text")]
    pub role: String,

    pub ativo: bool,

    /// Base32 TOTP secret, set during 2FA setup
    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text", nullable)]
    pub totp_secret: Option<String>,

    pub totp_enabled: bool,

    /// Last TOTP time step accepted, so a code works once
    #[serde(skip_serializing)]
    pub totp_ultimo_passo: Option<i64>,

    /// Linked member account, for PARLAMENTAR users
    pub parlamentar_id: Option<Uuid>,

    pub ultimo_login_em: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Unknown role labels degrade to the least privileged role
    pub fn role(&self) -> Role {
        Role::from_str(&self.role).unwrap_or(Role::Parlamentar)
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
