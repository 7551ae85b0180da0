//! Scheduled report processor
//!
//! Runs every due report: gathers the period's data, stores the payload on a
//! new execution row and moves the report to its next slot.

use chrono::{DateTime, Datelike, Duration, Utc};
use plenario_common::{
    db::models::{RelatorioAgendado, RelatorioExecucao, RelatorioExecucaoActiveModel},
    db::{DbPool, Repository},
    errors::AppError,
    metrics,
    reports::{
        mes_referencia, next_run, resumo_presencas, resumo_producao, ExecucaoStatus, Frequencia,
        Periodo, RelatorioPayload, RelatorioTipo,
    },
};
use sea_orm::Set;
use serde::Deserialize;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Report processor configuration
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Reports executed per poll
    pub batch_size: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self { batch_size: 20 }
    }
}

/// Optional filters stored in `parametros`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Parametros {
    /// Restrict attendance to one party
    pub partido: Option<String>,
}

/// What one run covers and when the next one happens
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub tipo: RelatorioTipo,
    pub periodo: Periodo,
    pub proximo_envio: DateTime<Utc>,
}

/// Period ending at the scheduled slot, next slot strictly after `now`
pub fn plan_run(relatorio: &RelatorioAgendado, now: DateTime<Utc>) -> Result<RunPlan, SchedulerError> {
    let tipo = relatorio.tipo().map_err(|e| SchedulerError::InvalidDefinition(e.to_string()))?;
    let frequencia: Frequencia = relatorio
        .frequencia()
        .map_err(|e| SchedulerError::InvalidDefinition(e.to_string()))?;
    let scheduled = relatorio.proximo_envio.with_timezone(&Utc);
    let dia = u32::try_from(relatorio.dia_envio).unwrap_or_else(|_| scheduled.day());

    Ok(RunPlan {
        tipo,
        periodo: frequencia.periodo_ate(scheduled),
        proximo_envio: next_run(frequencia, scheduled, dia, now),
    })
}

/// Stored `resultado` document
pub fn resultado_json(periodo: &Periodo, payload: &RelatorioPayload) -> Result<serde_json::Value, SchedulerError> {
    let mut document = serde_json::to_value(payload)?;
    if let Some(object) = document.as_object_mut() {
        object.insert("referencia".into(), mes_referencia(periodo).into());
        object.insert("registros".into(), payload.len().into());
    }
    Ok(document)
}

fn execucao_model(
    relatorio: &RelatorioAgendado,
    periodo: &Periodo,
    outcome: &Result<serde_json::Value, SchedulerError>,
    now: DateTime<Utc>,
) -> RelatorioExecucaoActiveModel {
    let (status, resultado, erro) = match outcome {
        Ok(document) => (ExecucaoStatus::Sucesso, Some(document.clone()), None),
        Err(e) => (ExecucaoStatus::Falha, None, Some(e.to_string())),
    };
    RelatorioExecucaoActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(relatorio.tenant_id),
        relatorio_id: Set(relatorio.id),
        periodo_inicio: Set(periodo.inicio.into()),
        periodo_fim: Set(periodo.fim.into()),
        status: Set(status.to_string()),
        resultado: Set(resultado),
        erro: Set(erro),
        executado_em: Set(now.into()),
    }
}

/// Outcome of one poll
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Scheduled report processor
pub struct ReportProcessor {
    repository: Repository,
    config: ProcessorConfig,
}

impl ReportProcessor {
    pub fn new(db_pool: DbPool, config: ProcessorConfig) -> Self {
        Self {
            repository: Repository::new(db_pool),
            config,
        }
    }

    /// Execute every report due at `now`
    pub async fn run_due(&self, now: DateTime<Utc>) -> Result<PollSummary, SchedulerError> {
        let due = self
            .repository
            .due_relatorios(now, self.config.batch_size)
            .await?;
        let mut summary = PollSummary::default();

        for relatorio in due {
            let relatorio_id = relatorio.id;
            match self.execute(relatorio, now).await {
                Ok(execucao) if execucao.status == ExecucaoStatus::Sucesso.as_str() => {
                    summary.succeeded += 1
                }
                Ok(_) => summary.failed += 1,
                Err(e) => {
                    // nothing was stored, the report stays due
                    summary.failed += 1;
                    error!(relatorio_id = %relatorio_id, error = %e, "Failed to store report run");
                }
            }
        }
        Ok(summary)
    }

    /// Run one report and persist the outcome, success or failure
    #[instrument(skip(self, relatorio), fields(relatorio_id = %relatorio.id, tenant_id = %relatorio.tenant_id))]
    pub async fn execute(
        &self,
        relatorio: RelatorioAgendado,
        now: DateTime<Utc>,
    ) -> Result<RelatorioExecucao, SchedulerError> {
        let started = Instant::now();

        let plan = match plan_run(&relatorio, now) {
            Ok(plan) => plan,
            Err(e) => {
                // keep the broken definition from being picked up every poll
                warn!(error = %e, "Report definition is invalid, retrying tomorrow");
                let periodo = Periodo { inicio: now, fim: now };
                let execucao = execucao_model(&relatorio, &periodo, &Err(e), now);
                return self
                    .repository
                    .finish_relatorio_run(relatorio, execucao, now + Duration::days(1))
                    .await
                    .map_err(Into::into);
            }
        };

        let outcome = match self.gather(&relatorio, plan.tipo, &plan.periodo).await {
            Ok(payload) => resultado_json(&plan.periodo, &payload),
            Err(e) => Err(e),
        };
        let success = outcome.is_ok();
        metrics::record_report_run(started.elapsed().as_secs_f64(), plan.tipo.as_str(), success);

        match &outcome {
            Ok(_) => info!(
                tipo = %plan.tipo,
                inicio = %plan.periodo.inicio,
                fim = %plan.periodo.fim,
                proximo_envio = %plan.proximo_envio,
                "Report generated"
            ),
            Err(e) => warn!(tipo = %plan.tipo, error = %e, "Report generation failed"),
        }

        let execucao = execucao_model(&relatorio, &plan.periodo, &outcome, now);
        self.repository
            .finish_relatorio_run(relatorio, execucao, plan.proximo_envio)
            .await
            .map_err(Into::into)
    }

    async fn gather(
        &self,
        relatorio: &RelatorioAgendado,
        tipo: RelatorioTipo,
        periodo: &Periodo,
    ) -> Result<RelatorioPayload, SchedulerError> {
        let tenant_id = relatorio.tenant_id;
        let parametros: Parametros = serde_json::from_value(relatorio.parametros.clone())
            .map_err(|e| SchedulerError::InvalidDefinition(format!("parametros: {}", e)))?;

        let payload = match tipo {
            RelatorioTipo::Presenca => {
                let sessoes = self.repository.sessoes_concluidas(tenant_id, periodo).await?;
                let ids: Vec<Uuid> = sessoes.iter().map(|s| s.id).collect();
                let registros = self.repository.registros_presenca(tenant_id, &ids).await?;
                let parlamentares: Vec<(Uuid, String)> = self
                    .repository
                    .active_parlamentares(tenant_id)
                    .await?
                    .into_iter()
                    .filter(|p| match &parametros.partido {
                        Some(partido) => p.partido.as_deref() == Some(partido.as_str()),
                        None => true,
                    })
                    .map(|p| (p.id, p.nome_parlamentar))
                    .collect();
                RelatorioPayload::Presenca(resumo_presencas(
                    &parlamentares,
                    &registros,
                    sessoes.len() as u32,
                ))
            }
            RelatorioTipo::ProducaoLegislativa => {
                let proposicoes = self
                    .repository
                    .proposicoes_apresentadas(tenant_id, periodo)
                    .await?;
                RelatorioPayload::ProducaoLegislativa(resumo_producao(
                    proposicoes.iter().map(|(t, s)| (t.as_str(), s.as_str())),
                ))
            }
            RelatorioTipo::Votacoes => RelatorioPayload::Votacoes(
                self.repository.votacoes_concluidas(tenant_id, periodo).await?,
            ),
        };
        Ok(payload)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Invalid report definition: {0}")]
    InvalidDefinition(String),

    #[error("Database error: {0}")]
    Database(#[from] AppError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio_test::assert_err;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn relatorio(tipo: &str, frequencia: &str, proximo_envio: DateTime<Utc>) -> RelatorioAgendado {
        RelatorioAgendado {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            nome: "Frequência mensal".to_string(),
            tipo: tipo.to_string(),
            frequencia: frequencia.to_string(),
            parametros: serde_json::json!({}),
            destinatarios: serde_json::json!(["secretaria@camara.sp.gov.br"]),
            ativo: true,
            proximo_envio: proximo_envio.into(),
            dia_envio: proximo_envio.day() as i16,
            ultimo_envio: None,
            created_at: proximo_envio.into(),
            updated_at: proximo_envio.into(),
        }
    }

    #[test]
    fn test_plan_covers_the_period_before_the_slot() {
        let slot = at(2026, 4, 1, 6);
        let plan = plan_run(&relatorio("PRESENCA", "MENSAL", slot), at(2026, 4, 1, 6)).unwrap();

        assert_eq!(plan.tipo, RelatorioTipo::Presenca);
        assert_eq!(plan.periodo.inicio, at(2026, 3, 1, 6));
        assert_eq!(plan.periodo.fim, slot);
        assert_eq!(plan.proximo_envio, at(2026, 5, 1, 6));
    }

    #[test]
    fn test_plan_skips_slots_missed_while_down() {
        let slot = at(2026, 3, 2, 7);
        let plan = plan_run(&relatorio("VOTACOES", "DIARIO", slot), at(2026, 3, 5, 9)).unwrap();

        // the run still reports on the day before its own slot
        assert_eq!(plan.periodo.inicio, at(2026, 3, 1, 7));
        assert_eq!(plan.proximo_envio, at(2026, 3, 6, 7));
    }

    #[test]
    fn test_plan_keeps_the_anchor_day_across_february() {
        let mut definition = relatorio("PRESENCA", "MENSAL", at(2026, 2, 28, 6));
        definition.dia_envio = 31;
        let plan = plan_run(&definition, at(2026, 2, 28, 6)).unwrap();

        assert_eq!(plan.periodo.fim, at(2026, 2, 28, 6));
        assert_eq!(plan.proximo_envio, at(2026, 3, 31, 6));
    }

    #[test]
    fn test_plan_rejects_unknown_labels() {
        let now = at(2026, 3, 2, 7);
        assert!(matches!(
            plan_run(&relatorio("FINANCEIRO", "MENSAL", now), now),
            Err(SchedulerError::InvalidDefinition(_))
        ));
        assert_err!(plan_run(&relatorio("PRESENCA", "ANUAL", now), now));
    }

    #[test]
    fn test_resultado_document() {
        let periodo = Periodo {
            inicio: at(2026, 3, 1, 0),
            fim: at(2026, 4, 1, 0),
        };
        let payload = RelatorioPayload::ProducaoLegislativa(resumo_producao(vec![
            ("PL", "EM_TRAMITACAO"),
            ("PL", "APROVADA"),
            ("REQ", "APROVADA"),
        ]));

        let document = resultado_json(&periodo, &payload).unwrap();
        assert_eq!(document["tipo"], "PRODUCAO_LEGISLATIVA");
        assert_eq!(document["referencia"], "03/2026");
        assert_eq!(document["registros"], 2);
        assert_eq!(document["dados"][0]["tipo"], "PL");
        assert_eq!(document["dados"][0]["total"], 2);
    }

    #[test]
    fn test_failed_run_keeps_the_error() {
        let now = at(2026, 3, 2, 7);
        let relatorio = relatorio("PRESENCA", "SEMANAL", now);
        let periodo = Frequencia::Semanal.periodo_ate(now);
        let outcome = Err(SchedulerError::InvalidDefinition("parametros: bad".into()));

        let model = execucao_model(&relatorio, &periodo, &outcome, now);
        assert_eq!(model.status.clone().unwrap(), "FALHA");
        assert_eq!(model.resultado.clone().unwrap(), None);
        assert!(model.erro.clone().unwrap().unwrap().contains("parametros"));
        assert_eq!(model.relatorio_id.clone().unwrap(), relatorio.id);
    }

    #[test]
    fn test_parametros_defaults() {
        let parametros: Parametros = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(parametros.partido.is_none());
        let parametros: Parametros =
            serde_json::from_value(serde_json::json!({"partido": "PSD"})).unwrap();
        assert_eq!(parametros.partido.as_deref(), Some("PSD"));
    }
}
