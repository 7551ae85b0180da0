//! Roll-call voting on agenda items

use axum::{
    extract::{Path, State},
    Json,
};
use plenario_common::{
    auth::{AuthContext, Role},
    db::models::{PautaItem, PautaItemEntity, ParlamentarEntity, UsuarioEntity, Voto},
    errors::{AppError, Result},
    legislative::{
        tally, Apuracao, PautaStatus, ProposicaoStatus, ResultadoVotacao, VotoOpcao,
    },
    metrics,
    response::ApiResponse,
    tenancy::ResolvedTenant,
    Repository,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ok, parse_label};
use crate::AppState;

const WRITE: &str = "votacao:write";

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    /// Omitted when a parlamentar votes for themself
    pub parlamentar_id: Option<Uuid>,
    pub opcao: String,
}

#[derive(Debug, Serialize)]
pub struct ApuracaoResponse {
    pub pauta_item_id: Uuid,
    /// False while the vote is still open
    pub definitiva: bool,
    pub apuracao: Apuracao,
}

#[derive(Debug, Serialize)]
pub struct EncerramentoResponse {
    pub item: PautaItem,
    pub apuracao: Apuracao,
}

/// Members vote as themselves; operators and integrations name the member
fn resolve_voter(role: Option<Role>, linked: Option<Uuid>, requested: Option<Uuid>) -> Result<Uuid> {
    match role {
        Some(Role::Parlamentar) => {
            let linked = linked.ok_or_else(|| AppError::Forbidden {
                message: "user is not linked to a parlamentar".to_string(),
            })?;
            if requested.is_some_and(|r| r != linked) {
                return Err(AppError::Forbidden {
                    message: "parlamentares can only cast their own vote".to_string(),
                });
            }
            Ok(linked)
        }
        _ => requested.ok_or_else(|| AppError::invalid_field("parlamentar_id", "required")),
    }
}

/// Settled bill status for a result; a vote without quorum settles nothing
fn proposicao_status(resultado: ResultadoVotacao) -> Option<ProposicaoStatus> {
    match resultado {
        ResultadoVotacao::Aprovada => Some(ProposicaoStatus::Aprovada),
        ResultadoVotacao::Rejeitada => Some(ProposicaoStatus::Rejeitada),
        ResultadoVotacao::SemQuorum => None,
    }
}

async fn live_tally(repo: &Repository, item: &PautaItem) -> Result<Apuracao> {
    let opcoes = repo
        .list_votos(item.tenant_id, item.id)
        .await?
        .iter()
        .map(|v| v.opcao.parse::<VotoOpcao>())
        .collect::<Result<Vec<_>>>()?;
    let total = repo.count_active_parlamentares(item.tenant_id).await?;
    let total = u32::try_from(total).unwrap_or(u32::MAX);
    Ok(tally(opcoes, total, item.quorum()?))
}

pub async fn list_votes(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(pauta_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Voto>>>> {
    let repo = state.repo();
    repo.find_scoped::<PautaItemEntity>(tenant.id, pauta_id)
        .await?
        .ok_or_else(|| AppError::not_found("PautaItem", pauta_id))?;
    Ok(ok(repo.list_votos(tenant.id, pauta_id).await?))
}

/// Cast or replace a vote while the item is in `VOTACAO`
pub async fn cast_vote(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(pauta_id): Path<Uuid>,
    Json(request): Json<CastVoteRequest>,
) -> Result<Json<ApiResponse<Voto>>> {
    auth.authorize(Role::Parlamentar, WRITE)?;
    let opcao: VotoOpcao = parse_label("opcao", &request.opcao)?;

    let repo = state.repo();
    let linked = match (auth.role(), auth.user_id()) {
        (Some(Role::Parlamentar), Some(user_id)) => {
            repo.get_scoped::<UsuarioEntity>(auth.tenant_id, user_id)
                .await?
                .parlamentar_id
        }
        _ => None,
    };
    let parlamentar_id = resolve_voter(auth.role(), linked, request.parlamentar_id)?;

    let found = repo.get_pauta_com_sessao(auth.tenant_id, pauta_id).await?;
    if found.item.status()? != PautaStatus::Votacao {
        return Err(AppError::VotingClosed {
            id: pauta_id.to_string(),
        });
    }

    let parlamentar = repo
        .get_scoped::<ParlamentarEntity>(auth.tenant_id, parlamentar_id)
        .await?;
    if !parlamentar.ativo {
        return Err(AppError::Forbidden {
            message: format!("{} is not an active member", parlamentar.nome_parlamentar),
        });
    }

    let voto = repo
        .upsert_voto(auth.tenant_id, pauta_id, parlamentar_id, opcao, auth.user_id())
        .await?;
    metrics::record_vote(opcao.as_str());

    tracing::info!(
        tenant_id = %auth.tenant_id,
        pauta_id = %pauta_id,
        parlamentar_id = %parlamentar_id,
        opcao = %opcao,
        "Vote recorded"
    );
    Ok(ok(voto))
}

/// Tally, store the result, conclude the item and settle the linked bill
pub async fn close(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(pauta_id): Path<Uuid>,
) -> Result<Json<ApiResponse<EncerramentoResponse>>> {
    auth.authorize(Role::Operador, WRITE)?;

    let repo = state.repo();
    let found = repo.get_pauta_com_sessao(auth.tenant_id, pauta_id).await?;
    if found.item.status()? != PautaStatus::Votacao {
        return Err(AppError::VotingClosed {
            id: pauta_id.to_string(),
        });
    }

    let apuracao = live_tally(&repo, &found.item).await?;
    let item = repo
        .close_voting(found.item, &apuracao, proposicao_status(apuracao.resultado))
        .await?;
    metrics::record_voting_closed(apuracao.resultado.as_str());

    tracing::info!(
        tenant_id = %auth.tenant_id,
        pauta_id = %pauta_id,
        sim = apuracao.sim,
        nao = apuracao.nao,
        abstencao = apuracao.abstencao,
        resultado = %apuracao.resultado,
        "Voting closed"
    );
    Ok(ok(EncerramentoResponse { item, apuracao }))
}

/// Final tally once closed, a provisional one while voting
pub async fn apuracao(
    State(state): State<AppState>,
    tenant: ResolvedTenant,
    Path(pauta_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ApuracaoResponse>>> {
    let repo = state.repo();
    let item = repo
        .find_scoped::<PautaItemEntity>(tenant.id, pauta_id)
        .await?
        .ok_or_else(|| AppError::not_found("PautaItem", pauta_id))?;

    let response = match item.apuracao() {
        Some(apuracao) => ApuracaoResponse {
            pauta_item_id: pauta_id,
            definitiva: true,
            apuracao,
        },
        None => ApuracaoResponse {
            pauta_item_id: pauta_id,
            definitiva: false,
            apuracao: live_tally(&repo, &item).await?,
        },
    };
    Ok(ok(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parlamentar_votes_as_linked_member() {
        let linked = Uuid::new_v4();
        assert_eq!(resolve_voter(Some(Role::Parlamentar), Some(linked), None).unwrap(), linked);
        assert_eq!(
            resolve_voter(Some(Role::Parlamentar), Some(linked), Some(linked)).unwrap(),
            linked
        );
        assert!(matches!(
            resolve_voter(Some(Role::Parlamentar), Some(linked), Some(Uuid::new_v4())),
            Err(AppError::Forbidden { .. })
        ));
        assert!(resolve_voter(Some(Role::Parlamentar), None, None).is_err());
    }

    #[test]
    fn test_operator_names_the_member() {
        let member = Uuid::new_v4();
        assert_eq!(resolve_voter(Some(Role::Operador), None, Some(member)).unwrap(), member);
        assert_eq!(resolve_voter(None, None, Some(member)).unwrap(), member);
        assert!(matches!(
            resolve_voter(Some(Role::Operador), None, None),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_no_quorum_leaves_bill_untouched() {
        assert_eq!(
            proposicao_status(ResultadoVotacao::Aprovada),
            Some(ProposicaoStatus::Aprovada)
        );
        assert_eq!(
            proposicao_status(ResultadoVotacao::Rejeitada),
            Some(ProposicaoStatus::Rejeitada)
        );
        assert_eq!(proposicao_status(ResultadoVotacao::SemQuorum), None);
    }
}
