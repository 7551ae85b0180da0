//! PostgreSQL-backed numbering counters
//!
//! Each allocation is a single upsert, so concurrent requests on different
//! gateway instances never receive the same number.

use crate::db::models::SequenciaEntity;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::legislative::{SequenceKey, SequenceStore};
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DbBackend, EntityTrait, Statement};

const NEXT_SQL: &str = r#"
    INSERT INTO sequencias (tenant_id, escopo, legislatura, ano, valor, updated_at)
    VALUES ($1, $2, $3, $4, 1, NOW())
    ON CONFLICT (tenant_id, escopo, legislatura, ano)
    DO UPDATE SET valor = sequencias.valor + 1, updated_at = NOW()
    RETURNING valor
"#;

const SET_SQL: &str = r#"
    INSERT INTO sequencias (tenant_id, escopo, legislatura, ano, valor, updated_at)
    VALUES ($1, $2, $3, $4, $5, NOW())
    ON CONFLICT (tenant_id, escopo, legislatura, ano)
    DO UPDATE SET valor = EXCLUDED.valor, updated_at = NOW()
"#;

#[derive(Clone)]
pub struct PgSequenceStore {
    pool: DbPool,
}

impl PgSequenceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn key_values(key: &SequenceKey) -> Vec<sea_orm::Value> {
    vec![
        key.tenant_id.into(),
        key.escopo.clone().into(),
        key.legislatura.into(),
        key.ano.into(),
    ]
}

#[async_trait]
impl SequenceStore for PgSequenceStore {
    async fn next(&self, key: &SequenceKey) -> Result<i64> {
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, NEXT_SQL, key_values(key));
        let row = self
            .pool
            .write()
            .query_one(stmt)
            .await?
            .ok_or_else(|| AppError::Internal {
                message: format!("sequence upsert returned no row for {}", key.escopo),
            })?;
        row.try_get::<i64>("", "valor").map_err(Into::into)
    }

    async fn peek(&self, key: &SequenceKey) -> Result<i64> {
        // primary, so a preview right after an allocation is not stale
        let current = SequenciaEntity::find_by_id((
            key.tenant_id,
            key.escopo.clone(),
            key.legislatura,
            key.ano,
        ))
        .one(self.pool.write())
        .await?;
        Ok(current.map(|s| s.valor).unwrap_or(0) + 1)
    }

    async fn set(&self, key: &SequenceKey, value: i64) -> Result<()> {
        if value < 0 {
            return Err(AppError::invalid_field("valor", "sequence value cannot be negative"));
        }
        let mut values = key_values(key);
        values.push(value.into());
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, SET_SQL, values);
        self.pool.write().execute(stmt).await?;
        tracing::info!(tenant_id = %key.tenant_id, escopo = %key.escopo, value, "Sequence reset");
        Ok(())
    }
}
