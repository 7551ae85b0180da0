//! Scheduled report computation
//!
//! The scheduler loads raw rows through the repository, this module turns
//! them into the JSON payload stored on each `RelatorioExecucao` and works
//! out when a report runs next.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

string_enum! {
    pub enum Frequencia {
        Diario => "DIARIO",
        Semanal => "SEMANAL",
        Mensal => "MENSAL",
    }
}

string_enum! {
    pub enum RelatorioTipo {
        /// Attendance per parlamentar
        Presenca => "PRESENCA",
        /// Bills by type and status
        ProducaoLegislativa => "PRODUCAO_LEGISLATIVA",
        /// Concluded votings with their tally
        Votacoes => "VOTACOES",
    }
}

string_enum! {
    pub enum ExecucaoStatus {
        Sucesso => "SUCESSO",
        Falha => "FALHA",
    }
}

/// Half-open interval `[inicio, fim)` a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Periodo {
    pub inicio: DateTime<Utc>,
    pub fim: DateTime<Utc>,
}

/// Same day-of-month `months` later, clamped to the last day of short months
pub fn add_months_clamped(at: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    at.checked_add_months(Months::new(months))
        .unwrap_or_else(|| at + Duration::days(30 * i64::from(months)))
}

fn sub_months_clamped(at: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    at.checked_sub_months(Months::new(months))
        .unwrap_or_else(|| at - Duration::days(30 * i64::from(months)))
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// `months` later on day `dia`, or the month's last day when it is shorter
pub fn add_months_on_day(at: DateTime<Utc>, months: u32, dia: u32) -> DateTime<Utc> {
    let first = at.with_day(1).unwrap_or(at);
    let shifted = add_months_clamped(first, months);
    let day = dia.clamp(1, last_day_of_month(shifted.year(), shifted.month()));
    shifted.with_day(day).unwrap_or(shifted)
}

impl Frequencia {
    /// One step after `from`
    pub fn advance(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        self.advance_on(from, from.day())
    }

    /// One step after `from`, monthly runs land on `dia` whenever the month has it
    pub fn advance_on(&self, from: DateTime<Utc>, dia: u32) -> DateTime<Utc> {
        match self {
            Frequencia::Diario => from + Duration::days(1),
            Frequencia::Semanal => from + Duration::weeks(1),
            Frequencia::Mensal => add_months_on_day(from, 1, dia),
        }
    }

    /// The period a run at `fim` reports on
    pub fn periodo_ate(&self, fim: DateTime<Utc>) -> Periodo {
        let inicio = match self {
            Frequencia::Diario => fim - Duration::days(1),
            Frequencia::Semanal => fim - Duration::weeks(1),
            Frequencia::Mensal => sub_months_clamped(fim, 1),
        };
        Periodo { inicio, fim }
    }
}

/// First scheduled instant strictly after `now`, skipping missed runs.
///
/// `dia` is the day of month monthly schedules were set up on, so a run
/// clamped to a short month returns to it afterwards.
pub fn next_run(
    frequencia: Frequencia,
    scheduled: DateTime<Utc>,
    dia: u32,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let mut next = frequencia.advance_on(scheduled, dia);
    while next <= now {
        next = frequencia.advance_on(next, dia);
    }
    next
}

/// One attendance record inside the period
#[derive(Debug, Clone)]
pub struct RegistroPresenca {
    pub parlamentar_id: Uuid,
    pub sessao_id: Uuid,
    pub presente: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresencaResumo {
    pub parlamentar_id: Uuid,
    pub nome_parlamentar: String,
    pub presencas: u32,
    pub ausencias: u32,
    /// Sessions held in the period with no record count as absences
    pub sessoes: u32,
    pub percentual: f64,
}

/// Attendance per active parlamentar over `total_sessoes` sessions
pub fn resumo_presencas(
    parlamentares: &[(Uuid, String)],
    registros: &[RegistroPresenca],
    total_sessoes: u32,
) -> Vec<PresencaResumo> {
    parlamentares
        .iter()
        .map(|(id, nome)| {
            let presencas = registros
                .iter()
                .filter(|r| r.parlamentar_id == *id && r.presente)
                .count() as u32;
            let presencas = presencas.min(total_sessoes);
            let percentual = if total_sessoes == 0 {
                0.0
            } else {
                (f64::from(presencas) * 1000.0 / f64::from(total_sessoes)).round() / 10.0
            };
            PresencaResumo {
                parlamentar_id: *id,
                nome_parlamentar: nome.clone(),
                presencas,
                ausencias: total_sessoes - presencas,
                sessoes: total_sessoes,
                percentual,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducaoResumo {
    pub tipo: String,
    pub total: u64,
    pub por_status: BTreeMap<String, u64>,
}

/// Count bills by type, then status. Input is `(tipo, status)` per bill.
pub fn resumo_producao<'a, I>(proposicoes: I) -> Vec<ProducaoResumo>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut grouped: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    for (tipo, status) in proposicoes {
        *grouped
            .entry(tipo.to_string())
            .or_default()
            .entry(status.to_string())
            .or_default() += 1;
    }
    grouped
        .into_iter()
        .map(|(tipo, por_status)| ProducaoResumo {
            total: por_status.values().sum(),
            tipo,
            por_status,
        })
        .collect()
}

/// One concluded voting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotacaoResumo {
    pub pauta_item_id: Uuid,
    pub sessao_titulo: String,
    pub data: NaiveDate,
    pub descricao: String,
    pub resultado: Option<String>,
    pub apuracao: Option<serde_json::Value>,
}

/// Payload stored on the execution row
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tipo", content = "dados", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelatorioPayload {
    Presenca(Vec<PresencaResumo>),
    ProducaoLegislativa(Vec<ProducaoResumo>),
    Votacoes(Vec<VotacaoResumo>),
}

impl RelatorioPayload {
    pub fn tipo(&self) -> RelatorioTipo {
        match self {
            RelatorioPayload::Presenca(_) => RelatorioTipo::Presenca,
            RelatorioPayload::ProducaoLegislativa(_) => RelatorioTipo::ProducaoLegislativa,
            RelatorioPayload::Votacoes(_) => RelatorioTipo::Votacoes,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RelatorioPayload::Presenca(v) => v.len(),
            RelatorioPayload::ProducaoLegislativa(v) => v.len(),
            RelatorioPayload::Votacoes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `MM/YYYY` of the month the period starts in
pub fn mes_referencia(periodo: &Periodo) -> String {
    format!("{:02}/{}", periodo.inicio.month(), periodo.inicio.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_monthly_clamps_to_month_end() {
        assert_eq!(Frequencia::Mensal.advance(at(2026, 1, 31)), at(2026, 2, 28));
        assert_eq!(Frequencia::Mensal.advance(at(2028, 1, 31)), at(2028, 2, 29));
        assert_eq!(Frequencia::Mensal.advance(at(2026, 3, 15)), at(2026, 4, 15));
    }

    #[test]
    fn test_next_run_skips_missed() {
        let scheduled = at(2026, 3, 1);
        let now = at(2026, 3, 4) + Duration::hours(1);
        assert_eq!(next_run(Frequencia::Diario, scheduled, 1, now), at(2026, 3, 5));
        assert_eq!(next_run(Frequencia::Semanal, scheduled, 1, now), at(2026, 3, 8));
        assert_eq!(next_run(Frequencia::Mensal, scheduled, 1, now), at(2026, 4, 1));
    }

    #[test]
    fn test_monthly_returns_to_its_day_after_short_month() {
        let feb = next_run(Frequencia::Mensal, at(2026, 1, 31), 31, at(2026, 1, 31));
        assert_eq!(feb, at(2026, 2, 28));
        let mar = next_run(Frequencia::Mensal, feb, 31, feb);
        assert_eq!(mar, at(2026, 3, 31));
        let apr = next_run(Frequencia::Mensal, mar, 31, mar);
        assert_eq!(apr, at(2026, 4, 30));

        // missed runs are skipped without drifting either
        assert_eq!(
            next_run(Frequencia::Mensal, at(2026, 1, 31), 31, at(2026, 3, 1)),
            at(2026, 3, 31)
        );
    }

    #[test]
    fn test_periodo() {
        let p = Frequencia::Mensal.periodo_ate(at(2026, 3, 31));
        assert_eq!(p.inicio, at(2026, 2, 28));
        assert_eq!(mes_referencia(&p), "02/2026");
        let p = Frequencia::Semanal.periodo_ate(at(2026, 3, 8));
        assert_eq!(p.inicio, at(2026, 3, 1));
    }

    #[test]
    fn test_resumo_presencas() {
        let ana = Uuid::new_v4();
        let bruno = Uuid::new_v4();
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        let registros = vec![
            RegistroPresenca { parlamentar_id: ana, sessao_id: s1, presente: true },
            RegistroPresenca { parlamentar_id: ana, sessao_id: s2, presente: true },
            RegistroPresenca { parlamentar_id: bruno, sessao_id: s1, presente: false },
        ];
        let resumo = resumo_presencas(
            &[(ana, "Ana".into()), (bruno, "Bruno".into())],
            &registros,
            3,
        );
        assert_eq!(resumo[0].presencas, 2);
        assert_eq!(resumo[0].ausencias, 1);
        assert_eq!(resumo[0].percentual, 66.7);
        assert_eq!(resumo[1].presencas, 0);
        assert_eq!(resumo[1].ausencias, 3);
    }

    #[test]
    fn test_resumo_presencas_without_sessions() {
        let resumo = resumo_presencas(&[(Uuid::new_v4(), "Ana".into())], &[], 0);
        assert_eq!(resumo[0].percentual, 0.0);
    }

    #[test]
    fn test_resumo_producao() {
        let resumo = resumo_producao(vec![
            ("PL", "APROVADA"),
            ("PL", "EM_TRAMITACAO"),
            ("PL", "APROVADA"),
            ("REQ", "APROVADA"),
        ]);
        assert_eq!(resumo.len(), 2);
        assert_eq!(resumo[0].tipo, "PL");
        assert_eq!(resumo[0].total, 3);
        assert_eq!(resumo[0].por_status["APROVADA"], 2);
        assert_eq!(resumo[1].total, 1);
    }

    #[test]
    fn test_payload_tagging() {
        let payload = RelatorioPayload::ProducaoLegislativa(vec![]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["tipo"], "PRODUCAO_LEGISLATIVA");
        assert!(payload.is_empty());
        assert_eq!(payload.tipo(), RelatorioTipo::ProducaoLegislativa);
    }
}
