//! Transparency, news and citizen participation

use super::Repository;
use crate::db::models::*;
use crate::errors::Result;
use crate::response::Pagination;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait};
use std::collections::BTreeMap;
use uuid::Uuid;

impl Repository {
    // ========================================================================
    // Publicacao Operations
    // ========================================================================

    pub async fn list_publicacoes(
        &self,
        tenant_id: Uuid,
        categoria: Option<String>,
        ano: Option<i32>,
        somente_publicadas: bool,
        pagination: &Pagination,
    ) -> Result<(Vec<Publicacao>, u64)> {
        let query = Self::scoped::<PublicacaoEntity>(tenant_id)
            .apply_if(categoria, |q, v| q.filter(PublicacaoColumn::Categoria.eq(v)))
            .apply_if(ano, |q, v| q.filter(PublicacaoColumn::Ano.eq(v)))
            .apply_if(somente_publicadas.then_some(true), |q, v| {
                q.filter(PublicacaoColumn::Publicada.eq(v))
            })
            .order_by_desc(PublicacaoColumn::Ano)
            .order_by_desc(PublicacaoColumn::CreatedAt);
        self.paginate(query, pagination).await
    }

    // ========================================================================
    // Noticia Operations
    // ========================================================================

    pub async fn list_noticias(
        &self,
        tenant_id: Uuid,
        somente_publicadas: bool,
        pagination: &Pagination,
    ) -> Result<(Vec<Noticia>, u64)> {
        let query = Self::scoped::<NoticiaEntity>(tenant_id)
            .apply_if(somente_publicadas.then_some(true), |q, v| {
                q.filter(NoticiaColumn::Publicada.eq(v))
            })
            .order_by_desc(NoticiaColumn::PublicadaEm)
            .order_by_desc(NoticiaColumn::CreatedAt);
        self.paginate(query, pagination).await
    }

    // ========================================================================
    // Consulta Publica Operations
    // ========================================================================

    /// With `abertas_em`, only consultations accepting opinions at that instant
    pub async fn list_consultas(
        &self,
        tenant_id: Uuid,
        abertas_em: Option<DateTime<Utc>>,
        pagination: &Pagination,
    ) -> Result<(Vec<ConsultaPublica>, u64)> {
        let query = Self::scoped::<ConsultaPublicaEntity>(tenant_id)
            .apply_if(abertas_em, |q, now| {
                q.filter(ConsultaPublicaColumn::Ativa.eq(true))
                    .filter(ConsultaPublicaColumn::Abertura.lte(now))
                    .filter(ConsultaPublicaColumn::Encerramento.gt(now))
            })
            .order_by_desc(ConsultaPublicaColumn::Abertura);
        self.paginate(query, pagination).await
    }

    /// Opinion counts keyed by FAVORAVEL / CONTRARIA / NEUTRA
    pub async fn count_opinioes(
        &self,
        tenant_id: Uuid,
        consulta_id: Uuid,
    ) -> Result<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> = Self::scoped::<OpiniaoConsultaEntity>(tenant_id)
            .filter(OpiniaoConsultaColumn::ConsultaId.eq(consulta_id))
            .select_only()
            .column(OpiniaoConsultaColumn::Opiniao)
            .column_as(OpiniaoConsultaColumn::Id.count(), "total")
            .group_by(OpiniaoConsultaColumn::Opiniao)
            .into_tuple()
            .all(self.read_conn())
            .await?;
        Ok(rows.into_iter().collect())
    }

    // ========================================================================
    // Sugestao Operations
    // ========================================================================

    pub async fn list_sugestoes(
        &self,
        tenant_id: Uuid,
        status: Option<String>,
        pagination: &Pagination,
    ) -> Result<(Vec<Sugestao>, u64)> {
        let query = Self::scoped::<SugestaoEntity>(tenant_id)
            .apply_if(status, |q, v| q.filter(SugestaoColumn::Status.eq(v)))
            .order_by_desc(SugestaoColumn::CreatedAt);
        self.paginate(query, pagination).await
    }
}
