//! Members, legislatures, sessions, agenda, votes, bills, committees and norms

use super::Repository;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::legislative::{blocks_conclusion, Apuracao, PautaStatus, ProposicaoStatus, VotoOpcao};
use crate::response::Pagination;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::{extension::postgres::PgExpr, Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

/// Query filters for `GET /sessoes`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessaoFiltro {
    pub tipo: Option<String>,
    pub status: Option<String>,
    pub ano: Option<i32>,
    pub legislatura_id: Option<Uuid>,
}

/// Query filters for `GET /proposicoes`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProposicaoFiltro {
    pub tipo: Option<String>,
    pub status: Option<String>,
    pub ano: Option<i32>,
    pub autor_id: Option<Uuid>,
    /// Case-insensitive match on the ementa
    pub q: Option<String>,
}

/// An agenda item with the session it belongs to
#[derive(Debug, Clone)]
pub struct PautaComSessao {
    pub item: PautaItem,
    pub sessao: Sessao,
}

fn year_bounds(ano: i32) -> Option<(chrono::DateTime<Utc>, chrono::DateTime<Utc>)> {
    let inicio = NaiveDate::from_ymd_opt(ano, 1, 1)?.and_hms_opt(0, 0, 0)?.and_utc();
    let fim = NaiveDate::from_ymd_opt(ano + 1, 1, 1)?.and_hms_opt(0, 0, 0)?.and_utc();
    Some((inicio, fim))
}

impl Repository {
    // ========================================================================
    // Parlamentar Operations
    // ========================================================================

    pub async fn list_parlamentares(
        &self,
        tenant_id: Uuid,
        ativo: Option<bool>,
        partido: Option<String>,
        pagination: &Pagination,
    ) -> Result<(Vec<Parlamentar>, u64)> {
        let query = Self::scoped::<ParlamentarEntity>(tenant_id)
            .apply_if(ativo, |q, v| q.filter(ParlamentarColumn::Ativo.eq(v)))
            .apply_if(partido, |q, v| q.filter(ParlamentarColumn::Partido.eq(v)))
            .order_by_asc(ParlamentarColumn::NomeParlamentar);
        self.paginate(query, pagination).await
    }

    /// Members entitled to vote
    pub async fn active_parlamentares(&self, tenant_id: Uuid) -> Result<Vec<Parlamentar>> {
        Self::scoped::<ParlamentarEntity>(tenant_id)
            .filter(ParlamentarColumn::Ativo.eq(true))
            .order_by_asc(ParlamentarColumn::NomeParlamentar)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn count_active_parlamentares(&self, tenant_id: Uuid) -> Result<u64> {
        Self::scoped::<ParlamentarEntity>(tenant_id)
            .filter(ParlamentarColumn::Ativo.eq(true))
            .count(self.write_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Legislatura Operations
    // ========================================================================

    pub async fn list_legislaturas(
        &self,
        tenant_id: Uuid,
        pagination: &Pagination,
    ) -> Result<(Vec<Legislatura>, u64)> {
        let query = Self::scoped::<LegislaturaEntity>(tenant_id)
            .order_by_desc(LegislaturaColumn::Numero);
        self.paginate(query, pagination).await
    }

    pub async fn current_legislatura(&self, tenant_id: Uuid) -> Result<Option<Legislatura>> {
        Self::scoped::<LegislaturaEntity>(tenant_id)
            .filter(LegislaturaColumn::Atual.eq(true))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Legislature whose term contains `date`
    pub async fn legislatura_for_date(
        &self,
        tenant_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Legislatura>> {
        Self::scoped::<LegislaturaEntity>(tenant_id)
            .filter(LegislaturaColumn::DataInicio.lte(date))
            .filter(LegislaturaColumn::DataFim.gte(date))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Unmark every other legislature of the tenant as current
    pub async fn clear_current_legislatura(&self, tenant_id: Uuid, except: Uuid) -> Result<()> {
        LegislaturaEntity::update_many()
            .col_expr(LegislaturaColumn::Atual, Expr::value(false))
            .filter(LegislaturaColumn::TenantId.eq(tenant_id))
            .filter(LegislaturaColumn::Id.ne(except))
            .exec(self.write_conn())
            .await?;
        Ok(())
    }

    // ========================================================================
    // Sessao Operations
    // ========================================================================

    pub async fn list_sessoes(
        &self,
        tenant_id: Uuid,
        filtro: SessaoFiltro,
        pagination: &Pagination,
    ) -> Result<(Vec<Sessao>, u64)> {
        let query = Self::scoped::<SessaoEntity>(tenant_id)
            .apply_if(filtro.tipo, |q, v| q.filter(SessaoColumn::Tipo.eq(v)))
            .apply_if(filtro.status, |q, v| q.filter(SessaoColumn::Status.eq(v)))
            .apply_if(filtro.legislatura_id, |q, v| {
                q.filter(SessaoColumn::LegislaturaId.eq(v))
            })
            .apply_if(filtro.ano.and_then(year_bounds), |q, (inicio, fim)| {
                q.filter(SessaoColumn::Data.gte(inicio))
                    .filter(SessaoColumn::Data.lt(fim))
            })
            .order_by_desc(SessaoColumn::Data);
        self.paginate(query, pagination).await
    }

    // ========================================================================
    // Nomenclature configuration
    // ========================================================================

    pub async fn find_template(
        &self,
        tenant_id: Uuid,
        tipo_sessao: &str,
    ) -> Result<Option<ConfiguracaoNomenclatura>> {
        Self::scoped::<ConfiguracaoNomenclaturaEntity>(tenant_id)
            .filter(ConfiguracaoNomenclaturaColumn::TipoSessao.eq(tipo_sessao))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_templates(&self, tenant_id: Uuid) -> Result<Vec<ConfiguracaoNomenclatura>> {
        Self::scoped::<ConfiguracaoNomenclaturaEntity>(tenant_id)
            .order_by_asc(ConfiguracaoNomenclaturaColumn::TipoSessao)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn upsert_template(
        &self,
        tenant_id: Uuid,
        tipo_sessao: &str,
        template: &str,
    ) -> Result<ConfiguracaoNomenclatura> {
        let model = ConfiguracaoNomenclaturaActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            tipo_sessao: Set(tipo_sessao.to_string()),
            template: Set(template.to_string()),
            updated_at: Set(Utc::now().into()),
        };

        ConfiguracaoNomenclaturaEntity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    ConfiguracaoNomenclaturaColumn::TenantId,
                    ConfiguracaoNomenclaturaColumn::TipoSessao,
                ])
                .update_columns([
                    ConfiguracaoNomenclaturaColumn::Template,
                    ConfiguracaoNomenclaturaColumn::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_with_returning(self.write_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Pauta Operations
    // ========================================================================

    pub async fn list_pauta(&self, tenant_id: Uuid, sessao_id: Uuid) -> Result<Vec<PautaItem>> {
        Self::scoped::<PautaItemEntity>(tenant_id)
            .filter(PautaItemColumn::SessaoId.eq(sessao_id))
            .order_by_asc(PautaItemColumn::Ordem)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Position for an item appended to the agenda
    pub async fn next_pauta_ordem(&self, tenant_id: Uuid, sessao_id: Uuid) -> Result<i32> {
        let max: Option<Option<i32>> = Self::scoped::<PautaItemEntity>(tenant_id)
            .filter(PautaItemColumn::SessaoId.eq(sessao_id))
            .select_only()
            .column_as(PautaItemColumn::Ordem.max(), "max_ordem")
            .into_tuple()
            .one(self.write_conn())
            .await?;
        Ok(max.flatten().unwrap_or(0) + 1)
    }

    pub async fn get_pauta_com_sessao(&self, tenant_id: Uuid, pauta_id: Uuid) -> Result<PautaComSessao> {
        let (item, sessao) = Self::scoped::<PautaItemEntity>(tenant_id)
            .filter(PautaItemColumn::Id.eq(pauta_id))
            .find_also_related(SessaoEntity)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::not_found("PautaItem", pauta_id))?;

        let sessao = sessao.ok_or_else(|| AppError::Internal {
            message: format!("pauta item {} has no session", pauta_id),
        })?;
        Ok(PautaComSessao { item, sessao })
    }

    /// Items of the session still being discussed or voted
    pub async fn count_open_pauta(&self, tenant_id: Uuid, sessao_id: Uuid) -> Result<u64> {
        Self::scoped::<PautaItemEntity>(tenant_id)
            .filter(PautaItemColumn::SessaoId.eq(sessao_id))
            .filter(
                PautaItemColumn::Status.is_in(
                    PautaStatus::ALL
                        .iter()
                        .filter(|s| blocks_conclusion(**s))
                        .map(|s| s.as_str()),
                ),
            )
            .count(self.write_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Voting Operations
    // ========================================================================

    /// Record a vote, replacing the member's previous choice on the item
    pub async fn upsert_voto(
        &self,
        tenant_id: Uuid,
        pauta_item_id: Uuid,
        parlamentar_id: Uuid,
        opcao: VotoOpcao,
        registrado_por: Option<Uuid>,
    ) -> Result<Voto> {
        let model = VotoActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            pauta_item_id: Set(pauta_item_id),
            parlamentar_id: Set(parlamentar_id),
            opcao: Set(opcao.into()),
            registrado_em: Set(Utc::now().into()),
            registrado_por: Set(registrado_por),
        };

        VotoEntity::insert(model)
            .on_conflict(
                OnConflict::columns([VotoColumn::PautaItemId, VotoColumn::ParlamentarId])
                    .update_columns([
                        VotoColumn::Opcao,
                        VotoColumn::RegistradoEm,
                        VotoColumn::RegistradoPor,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(self.write_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_votos(&self, tenant_id: Uuid, pauta_item_id: Uuid) -> Result<Vec<Voto>> {
        Self::scoped::<VotoEntity>(tenant_id)
            .filter(VotoColumn::PautaItemId.eq(pauta_item_id))
            .order_by_asc(VotoColumn::RegistradoEm)
            .all(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Store the tally, conclude the item and settle the linked bill atomically
    pub async fn close_voting(
        &self,
        item: PautaItem,
        apuracao: &Apuracao,
        proposicao_status: Option<ProposicaoStatus>,
    ) -> Result<PautaItem> {
        let txn = self.write_conn().begin().await?;
        let now = Utc::now();

        let tenant_id = item.tenant_id;
        let proposicao_id = item.proposicao_id;

        let mut active: PautaItemActiveModel = item.into();
        active.status = Set(PautaStatus::Concluida.into());
        active.apuracao = Set(Some(serde_json::to_value(apuracao)?));
        active.resultado = Set(Some(apuracao.resultado.into()));
        active.updated_at = Set(now.into());
        let item = active.update(&txn).await?;

        if let (Some(proposicao_id), Some(status)) = (proposicao_id, proposicao_status) {
            ProposicaoEntity::update_many()
                .col_expr(ProposicaoColumn::Status, Expr::value(status.as_str()))
                .col_expr(ProposicaoColumn::UpdatedAt, Expr::current_timestamp().into())
                .filter(ProposicaoColumn::TenantId.eq(tenant_id))
                .filter(ProposicaoColumn::Id.eq(proposicao_id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(item)
    }

    // ========================================================================
    // Presenca Operations
    // ========================================================================

    pub async fn upsert_presenca(
        &self,
        tenant_id: Uuid,
        sessao_id: Uuid,
        parlamentar_id: Uuid,
        presente: bool,
        justificativa: Option<String>,
    ) -> Result<Presenca> {
        let model = PresencaActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            sessao_id: Set(sessao_id),
            parlamentar_id: Set(parlamentar_id),
            presente: Set(presente),
            justificativa: Set(justificativa),
            registrado_em: Set(Utc::now().into()),
        };

        PresencaEntity::insert(model)
            .on_conflict(
                OnConflict::columns([PresencaColumn::SessaoId, PresencaColumn::ParlamentarId])
                    .update_columns([
                        PresencaColumn::Presente,
                        PresencaColumn::Justificativa,
                        PresencaColumn::RegistradoEm,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(self.write_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_presencas(&self, tenant_id: Uuid, sessao_id: Uuid) -> Result<Vec<Presenca>> {
        Self::scoped::<PresencaEntity>(tenant_id)
            .filter(PresencaColumn::SessaoId.eq(sessao_id))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Proposicao Operations
    // ========================================================================

    pub async fn list_proposicoes(
        &self,
        tenant_id: Uuid,
        filtro: ProposicaoFiltro,
        pagination: &Pagination,
    ) -> Result<(Vec<Proposicao>, u64)> {
        let query = Self::scoped::<ProposicaoEntity>(tenant_id)
            .apply_if(filtro.tipo, |q, v| q.filter(ProposicaoColumn::Tipo.eq(v)))
            .apply_if(filtro.status, |q, v| q.filter(ProposicaoColumn::Status.eq(v)))
            .apply_if(filtro.ano, |q, v| q.filter(ProposicaoColumn::Ano.eq(v)))
            .apply_if(filtro.autor_id, |q, v| q.filter(ProposicaoColumn::AutorId.eq(v)))
            .apply_if(
                filtro.q.filter(|s| !s.trim().is_empty()),
                |q, text| {
                    q.filter(
                        Expr::col(ProposicaoColumn::Ementa)
                            .ilike(format!("%{}%", text.trim())),
                    )
                },
            )
            .order_by_desc(ProposicaoColumn::Ano)
            .order_by_desc(ProposicaoColumn::Numero);
        self.paginate(query, pagination).await
    }

    // ========================================================================
    // Comissao Operations
    // ========================================================================

    pub async fn list_comissoes(
        &self,
        tenant_id: Uuid,
        ativa: Option<bool>,
        pagination: &Pagination,
    ) -> Result<(Vec<Comissao>, u64)> {
        let query = Self::scoped::<ComissaoEntity>(tenant_id)
            .apply_if(ativa, |q, v| q.filter(ComissaoColumn::Ativa.eq(v)))
            .order_by_asc(ComissaoColumn::Nome);
        self.paginate(query, pagination).await
    }

    /// Current members, ended memberships excluded
    pub async fn list_membros(&self, tenant_id: Uuid, comissao_id: Uuid) -> Result<Vec<MembroComissao>> {
        let today = Utc::now().date_naive();
        Self::scoped::<MembroComissaoEntity>(tenant_id)
            .filter(MembroComissaoColumn::ComissaoId.eq(comissao_id))
            .filter(
                Condition::any()
                    .add(MembroComissaoColumn::DataFim.is_null())
                    .add(MembroComissaoColumn::DataFim.gte(today)),
            )
            .order_by_asc(MembroComissaoColumn::DataInicio)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_reunioes(&self, tenant_id: Uuid, comissao_id: Uuid) -> Result<Vec<ReuniaoComissao>> {
        Self::scoped::<ReuniaoComissaoEntity>(tenant_id)
            .filter(ReuniaoComissaoColumn::ComissaoId.eq(comissao_id))
            .order_by_desc(ReuniaoComissaoColumn::Data)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Norma Juridica Operations
    // ========================================================================

    pub async fn list_normas(
        &self,
        tenant_id: Uuid,
        tipo: Option<String>,
        ano: Option<i32>,
        situacao: Option<String>,
        pagination: &Pagination,
    ) -> Result<(Vec<NormaJuridica>, u64)> {
        let query = Self::scoped::<NormaJuridicaEntity>(tenant_id)
            .apply_if(tipo, |q, v| q.filter(NormaJuridicaColumn::Tipo.eq(v)))
            .apply_if(ano, |q, v| q.filter(NormaJuridicaColumn::Ano.eq(v)))
            .apply_if(situacao, |q, v| q.filter(NormaJuridicaColumn::Situacao.eq(v)))
            .order_by_desc(NormaJuridicaColumn::Ano)
            .order_by_desc(NormaJuridicaColumn::Numero);
        self.paginate(query, pagination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_bounds() {
        let (inicio, fim) = year_bounds(2026).unwrap();
        assert_eq!(inicio.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert_eq!(fim.to_rfc3339(), "2027-01-01T00:00:00+00:00");
    }
}
