//! Scheduled reports and the data they aggregate

use super::Repository;
use crate::db::models::*;
use crate::errors::Result;
use crate::legislative::{PautaStatus, SessaoStatus};
use crate::reports::{Periodo, RegistroPresenca, VotacaoResumo};
use crate::response::Pagination;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

impl Repository {
    // ========================================================================
    // Relatorio Agendado Operations
    // ========================================================================

    pub async fn list_relatorios(
        &self,
        tenant_id: Uuid,
        pagination: &Pagination,
    ) -> Result<(Vec<RelatorioAgendado>, u64)> {
        let query = Self::scoped::<RelatorioAgendadoEntity>(tenant_id)
            .order_by_asc(RelatorioAgendadoColumn::Nome);
        self.paginate(query, pagination).await
    }

    /// Active reports due at `now`, across all tenants, oldest first
    pub async fn due_relatorios(&self, now: DateTime<Utc>, limit: u64) -> Result<Vec<RelatorioAgendado>> {
        RelatorioAgendadoEntity::find()
            .filter(RelatorioAgendadoColumn::Ativo.eq(true))
            .filter(RelatorioAgendadoColumn::ProximoEnvio.lte(now))
            .order_by_asc(RelatorioAgendadoColumn::ProximoEnvio)
            .limit(limit)
            .all(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Store a run and move the report to its next slot in one transaction
    pub async fn finish_relatorio_run(
        &self,
        relatorio: RelatorioAgendado,
        execucao: RelatorioExecucaoActiveModel,
        proximo_envio: DateTime<Utc>,
    ) -> Result<RelatorioExecucao> {
        let txn = self.write_conn().begin().await?;
        let now = Utc::now();

        let execucao = execucao.insert(&txn).await?;

        let mut active: RelatorioAgendadoActiveModel = relatorio.into();
        active.ultimo_envio = Set(Some(now.into()));
        active.proximo_envio = Set(proximo_envio.into());
        active.updated_at = Set(now.into());
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(execucao)
    }

    pub async fn list_execucoes(
        &self,
        tenant_id: Uuid,
        relatorio_id: Uuid,
        pagination: &Pagination,
    ) -> Result<(Vec<RelatorioExecucao>, u64)> {
        let query = Self::scoped::<RelatorioExecucaoEntity>(tenant_id)
            .filter(RelatorioExecucaoColumn::RelatorioId.eq(relatorio_id))
            .order_by_desc(RelatorioExecucaoColumn::ExecutadoEm);
        self.paginate(query, pagination).await
    }

    // ========================================================================
    // Report data
    // ========================================================================

    /// Concluded sessions held inside the period
    pub async fn sessoes_concluidas(&self, tenant_id: Uuid, periodo: &Periodo) -> Result<Vec<Sessao>> {
        Self::scoped::<SessaoEntity>(tenant_id)
            .filter(SessaoColumn::Status.eq(SessaoStatus::Concluida.as_str()))
            .filter(SessaoColumn::Data.gte(periodo.inicio))
            .filter(SessaoColumn::Data.lt(periodo.fim))
            .order_by_asc(SessaoColumn::Data)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn registros_presenca(
        &self,
        tenant_id: Uuid,
        sessao_ids: &[Uuid],
    ) -> Result<Vec<RegistroPresenca>> {
        if sessao_ids.is_empty() {
            return Ok(Vec::new());
        }
        let presencas = Self::scoped::<PresencaEntity>(tenant_id)
            .filter(PresencaColumn::SessaoId.is_in(sessao_ids.iter().copied()))
            .all(self.read_conn())
            .await?;
        Ok(presencas
            .into_iter()
            .map(|p| RegistroPresenca {
                parlamentar_id: p.parlamentar_id,
                sessao_id: p.sessao_id,
                presente: p.presente,
            })
            .collect())
    }

    /// `(tipo, status)` of each bill presented inside the period
    pub async fn proposicoes_apresentadas(
        &self,
        tenant_id: Uuid,
        periodo: &Periodo,
    ) -> Result<Vec<(String, String)>> {
        Self::scoped::<ProposicaoEntity>(tenant_id)
            .filter(ProposicaoColumn::DataApresentacao.gte(periodo.inicio.date_naive()))
            .filter(ProposicaoColumn::DataApresentacao.lt(periodo.fim.date_naive()))
            .select_only()
            .column(ProposicaoColumn::Tipo)
            .column(ProposicaoColumn::Status)
            .into_tuple()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Agenda items voted in sessions held inside the period
    pub async fn votacoes_concluidas(
        &self,
        tenant_id: Uuid,
        periodo: &Periodo,
    ) -> Result<Vec<VotacaoResumo>> {
        let rows = Self::scoped::<PautaItemEntity>(tenant_id)
            .filter(PautaItemColumn::Status.eq(PautaStatus::Concluida.as_str()))
            .filter(PautaItemColumn::Apuracao.is_not_null())
            .find_also_related(SessaoEntity)
            .filter(SessaoColumn::Data.gte(periodo.inicio))
            .filter(SessaoColumn::Data.lt(periodo.fim))
            .order_by_asc(SessaoColumn::Data)
            .order_by_asc(PautaItemColumn::Ordem)
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(item, sessao)| {
                let sessao = sessao?;
                Some(VotacaoResumo {
                    pauta_item_id: item.id,
                    sessao_titulo: sessao.titulo,
                    data: sessao.data.date_naive(),
                    descricao: item.descricao,
                    resultado: item.resultado,
                    apuracao: item.apuracao,
                })
            })
            .collect())
    }
}
