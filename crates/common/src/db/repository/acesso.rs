//! Users and integration tokens

use super::Repository;
use crate::db::models::*;
use crate::errors::Result;
use crate::response::Pagination;
use sea_orm::{
    sea_query::Expr, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

impl Repository {
    // ========================================================================
    // Usuario Operations
    // ========================================================================

    /// Emails are stored lowercase
    pub async fn find_usuario_by_email(&self, tenant_id: Uuid, email: &str) -> Result<Option<Usuario>> {
        Self::scoped::<UsuarioEntity>(tenant_id)
            .filter(UsuarioColumn::Email.eq(email.trim().to_lowercase()))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_usuarios(
        &self,
        tenant_id: Uuid,
        pagination: &Pagination,
    ) -> Result<(Vec<Usuario>, u64)> {
        let query = Self::scoped::<UsuarioEntity>(tenant_id).order_by_asc(UsuarioColumn::Nome);
        self.paginate(query, pagination).await
    }

    /// Active users holding `role`
    pub async fn count_usuarios_with_role(&self, tenant_id: Uuid, role: &str) -> Result<u64> {
        Self::scoped::<UsuarioEntity>(tenant_id)
            .filter(UsuarioColumn::Role.eq(role))
            .filter(UsuarioColumn::Ativo.eq(true))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn touch_login(&self, usuario_id: Uuid) -> Result<()> {
        UsuarioEntity::update_many()
            .col_expr(UsuarioColumn::UltimoLoginEm, Expr::current_timestamp().into())
            .filter(UsuarioColumn::Id.eq(usuario_id))
            .exec(self.write_conn())
            .await?;
        Ok(())
    }

    /// Record a TOTP step as spent; false when it or a later one already was
    pub async fn claim_totp_step(&self, usuario_id: Uuid, step: u64) -> Result<bool> {
        let step = i64::try_from(step).unwrap_or(i64::MAX);
        let result = UsuarioEntity::update_many()
            .col_expr(UsuarioColumn::TotpUltimoPasso, Expr::value(step).into())
            .filter(UsuarioColumn::Id.eq(usuario_id))
            .filter(
                Condition::any()
                    .add(UsuarioColumn::TotpUltimoPasso.is_null())
                    .add(UsuarioColumn::TotpUltimoPasso.lt(step)),
            )
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected == 1)
    }

    // ========================================================================
    // Integration Token Operations
    // ========================================================================

    /// Lookup by digest. Tokens are global, the caller checks the tenant.
    pub async fn find_integration_token_by_hash(&self, hash: &str) -> Result<Option<IntegrationToken>> {
        IntegrationTokenEntity::find()
            .filter(IntegrationTokenColumn::TokenHash.eq(hash))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_integration_tokens(&self, tenant_id: Uuid) -> Result<Vec<IntegrationToken>> {
        Self::scoped::<IntegrationTokenEntity>(tenant_id)
            .order_by_desc(IntegrationTokenColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn touch_integration_token(&self, token_id: Uuid) -> Result<()> {
        IntegrationTokenEntity::update_many()
            .col_expr(IntegrationTokenColumn::LastUsedAt, Expr::current_timestamp().into())
            .filter(IntegrationTokenColumn::Id.eq(token_id))
            .exec(self.write_conn())
            .await?;
        Ok(())
    }

    /// Returns whether a live token was revoked
    pub async fn revoke_integration_token(&self, tenant_id: Uuid, token_id: Uuid) -> Result<bool> {
        let result = IntegrationTokenEntity::update_many()
            .col_expr(IntegrationTokenColumn::Revogado, Expr::value(true))
            .filter(IntegrationTokenColumn::TenantId.eq(tenant_id))
            .filter(IntegrationTokenColumn::Id.eq(token_id))
            .filter(IntegrationTokenColumn::Revogado.eq(false))
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected > 0)
    }
}
