//! Session, agenda and voting routes against a mock database

mod support;

use axum::http::StatusCode;
use axum_test::TestResponse;
use plenario_common::auth::Role;
use plenario_common::db::models::{ConsultaPublica, Sessao};
use sea_orm::MockDatabase;
use serde_json::{json, Value};
use support::*;
use uuid::Uuid;

fn operador(harness: &Harness) -> String {
    harness.token(&harness.ourinhos, Role::Operador)
}

// ============================================================================
// Voting
// ============================================================================

#[tokio::test]
async fn test_vote_outside_voting_is_refused() {
    let chambers = Chambers::new();
    let sessao = sessao(&chambers.ourinhos, "EM_ANDAMENTO");
    let item = pauta_item(&sessao, "EM_ANDAMENTO", None);
    let db = mock()
        .append_query_results([vec![(item.clone(), sessao.clone())]])
        .into_connection();
    let harness = Harness::with_database(&chambers, db.clone());

    let response = harness
        .server
        .post(&format!("/api/pauta/{}/votos", item.id))
        .add_header(HOST_HEADER, OURINHOS)
        .authorization_bearer(operador(&harness))
        .json(&json!({ "parlamentar_id": Uuid::new_v4(), "opcao": "SIM" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_code(&response.json()), "VOTING_CLOSED");
    assert!(!ran(&statements(db), r#"INSERT INTO "votos""#));
}

#[tokio::test]
async fn test_inactive_member_cannot_vote() {
    let chambers = Chambers::new();
    let sessao = sessao(&chambers.ourinhos, "EM_ANDAMENTO");
    let item = pauta_item(&sessao, "VOTACAO", None);
    let licenciado = parlamentar(&chambers.ourinhos, false);
    let db = mock()
        .append_query_results([vec![(item.clone(), sessao.clone())]])
        .append_query_results([vec![licenciado.clone()]])
        .into_connection();
    let harness = Harness::with_database(&chambers, db.clone());

    let response = harness
        .server
        .post(&format!("/api/pauta/{}/votos", item.id))
        .add_header(HOST_HEADER, OURINHOS)
        .authorization_bearer(operador(&harness))
        .json(&json!({ "parlamentar_id": licenciado.id, "opcao": "NAO" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(error_code(&response.json()), "FORBIDDEN");
    assert!(!ran(&statements(db), r#"INSERT INTO "votos""#));
}

#[tokio::test]
async fn test_vote_is_upserted_per_member() {
    let chambers = Chambers::new();
    let sessao = sessao(&chambers.ourinhos, "EM_ANDAMENTO");
    let item = pauta_item(&sessao, "VOTACAO", None);
    let membro = parlamentar(&chambers.ourinhos, true);
    let mut gravado = voto(&item, "ABSTENCAO");
    gravado.parlamentar_id = membro.id;
    let db = mock()
        .append_query_results([vec![(item.clone(), sessao.clone())]])
        .append_query_results([vec![membro.clone()]])
        .append_query_results([vec![gravado.clone()]])
        .into_connection();
    let harness = Harness::with_database(&chambers, db.clone());

    let response = harness
        .server
        .post(&format!("/api/pauta/{}/votos", item.id))
        .add_header(HOST_HEADER, OURINHOS)
        .authorization_bearer(operador(&harness))
        .json(&json!({ "parlamentar_id": membro.id, "opcao": "ABSTENCAO" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["opcao"], "ABSTENCAO");

    let log = statements(db);
    let insert = log
        .iter()
        .find(|s| s.contains(r#"INSERT INTO "votos""#))
        .expect("vote insert");
    assert!(insert.contains(r#"ON CONFLICT ("pauta_item_id", "parlamentar_id")"#));
}

// ============================================================================
// Closing a vote
// ============================================================================

/// Close an item in VOTACAO linked to a bill, five active members
async fn close_with(opcoes: &[&str]) -> (Value, Vec<String>, Uuid) {
    let chambers = Chambers::new();
    let proposicao_id = Uuid::new_v4();
    let sessao = sessao(&chambers.ourinhos, "EM_ANDAMENTO");
    let item = pauta_item(&sessao, "VOTACAO", Some(proposicao_id));
    let votos: Vec<_> = opcoes.iter().map(|o| voto(&item, o)).collect();

    let mut concluido = item.clone();
    concluido.status = "CONCLUIDA".to_string();

    let db = mock()
        .append_query_results([vec![(item.clone(), sessao.clone())]])
        .append_query_results([votos])
        .append_query_results([vec![count_row(5)]])
        .append_query_results([vec![concluido]])
        .append_exec_results([affected(1)])
        .into_connection();
    let harness = Harness::with_database(&chambers, db.clone());

    let response = harness
        .server
        .post(&format!("/api/pauta/{}/encerrar", item.id))
        .add_header(HOST_HEADER, OURINHOS)
        .authorization_bearer(operador(&harness))
        .await;
    response.assert_status_ok();

    (response.json(), statements(db), proposicao_id)
}

fn bill_update<'a>(log: &'a [String], proposicao_id: Uuid) -> Option<&'a String> {
    log.iter()
        .find(|s| s.contains(r#"UPDATE "proposicoes""#) && s.contains(&proposicao_id.to_string()))
}

#[tokio::test]
async fn test_approved_vote_settles_the_bill() {
    let (body, log, proposicao_id) = close_with(&["SIM", "SIM", "SIM", "NAO"]).await;

    assert_eq!(body["data"]["apuracao"]["resultado"], "APROVADA");
    assert_eq!(body["data"]["apuracao"]["ausente"], 1);
    let update = bill_update(&log, proposicao_id).expect("bill status update");
    assert!(update.contains("'APROVADA'"));
    assert!(ran(&log, r#"UPDATE "pauta_itens""#));
}

#[tokio::test]
async fn test_rejected_vote_settles_the_bill() {
    let (body, log, proposicao_id) = close_with(&["SIM", "NAO", "NAO", "ABSTENCAO"]).await;

    assert_eq!(body["data"]["apuracao"]["resultado"], "REJEITADA");
    let update = bill_update(&log, proposicao_id).expect("bill status update");
    assert!(update.contains("'REJEITADA'"));
}

#[tokio::test]
async fn test_vote_without_quorum_leaves_the_bill() {
    // two of five present, three are needed
    let (body, log, proposicao_id) = close_with(&["SIM", "SIM"]).await;

    assert_eq!(body["data"]["apuracao"]["resultado"], "SEM_QUORUM");
    assert!(bill_update(&log, proposicao_id).is_none());
    assert!(ran(&log, r#"UPDATE "pauta_itens""#));
}

// ============================================================================
// Session and agenda status
// ============================================================================

async fn change_session(
    sessao: &Sessao,
    chambers: &Chambers,
    rows: MockDatabase,
    status: &str,
) -> (TestResponse, Vec<String>) {
    let db = rows.into_connection();
    let harness = Harness::with_database(chambers, db.clone());
    let response = harness
        .server
        .post(&format!("/api/sessoes/{}/status", sessao.id))
        .add_header(HOST_HEADER, OURINHOS)
        .authorization_bearer(operador(&harness))
        .json(&json!({ "status": status }))
        .await;
    (response, statements(db))
}

#[tokio::test]
async fn test_session_start_is_stamped_once() {
    let chambers = Chambers::new();
    let agendada = sessao(&chambers.ourinhos, "AGENDADA");
    let mut iniciada = agendada.clone();
    iniciada.status = "EM_ANDAMENTO".to_string();
    iniciada.iniciada_em = Some(chrono::Utc::now().into());

    let rows = mock()
        .append_query_results([vec![agendada.clone()]])
        .append_query_results([vec![iniciada]]);
    let (response, log) = change_session(&agendada, &chambers, rows, "EM_ANDAMENTO").await;

    response.assert_status_ok();
    let update = log
        .iter()
        .find(|s| s.contains(r#"UPDATE "sessoes""#))
        .expect("session update");
    assert!(update.contains(r#""iniciada_em" ="#));
    assert!(!update.contains(r#""encerrada_em" ="#));
}

#[tokio::test]
async fn test_resumed_session_keeps_its_start() {
    let chambers = Chambers::new();
    let mut suspensa = sessao(&chambers.ourinhos, "SUSPENSA");
    suspensa.iniciada_em = Some(chrono::Utc::now().into());
    let mut retomada = suspensa.clone();
    retomada.status = "EM_ANDAMENTO".to_string();

    let rows = mock()
        .append_query_results([vec![suspensa.clone()]])
        .append_query_results([vec![retomada]]);
    let (response, log) = change_session(&suspensa, &chambers, rows, "EM_ANDAMENTO").await;

    response.assert_status_ok();
    assert!(!ran(&log, r#""iniciada_em" ="#));
}

#[tokio::test]
async fn test_session_conclusion_is_stamped() {
    let chambers = Chambers::new();
    let em_andamento = sessao(&chambers.ourinhos, "EM_ANDAMENTO");
    let mut concluida = em_andamento.clone();
    concluida.status = "CONCLUIDA".to_string();
    concluida.encerrada_em = Some(chrono::Utc::now().into());

    let rows = mock()
        .append_query_results([vec![em_andamento.clone()]])
        .append_query_results([vec![count_row(0)]])
        .append_query_results([vec![concluida]]);
    let (response, log) = change_session(&em_andamento, &chambers, rows, "CONCLUIDA").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["status"], "CONCLUIDA");
    let update = log
        .iter()
        .find(|s| s.contains(r#"UPDATE "sessoes""#))
        .expect("session update");
    assert!(update.contains(r#""encerrada_em" ="#));
}

#[tokio::test]
async fn test_session_with_open_items_cannot_conclude() {
    let chambers = Chambers::new();
    let em_andamento = sessao(&chambers.ourinhos, "EM_ANDAMENTO");

    let rows = mock()
        .append_query_results([vec![em_andamento.clone()]])
        .append_query_results([vec![count_row(2)]]);
    let (response, log) = change_session(&em_andamento, &chambers, rows, "CONCLUIDA").await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_code(&response.json()), "CONFLICT");
    assert!(!ran(&log, r#"UPDATE "sessoes""#));
}

#[tokio::test]
async fn test_session_of_another_chamber_is_not_found() {
    let chambers = Chambers::new();
    let alheia = sessao(&chambers.marilia, "AGENDADA");

    let rows = mock().append_query_results([Vec::<Sessao>::new()]);
    let (response, log) = change_session(&alheia, &chambers, rows, "EM_ANDAMENTO").await;

    response.assert_status_not_found();
    assert_eq!(error_code(&response.json()), "NOT_FOUND");
    let lookup = log.first().expect("session lookup");
    assert!(lookup.contains(&chambers.ourinhos.id.to_string()));
    assert!(!lookup.contains(&chambers.marilia.id.to_string()));
}

#[tokio::test]
async fn test_item_cannot_enter_voting_before_session_starts() {
    let chambers = Chambers::new();
    let agendada = sessao(&chambers.ourinhos, "AGENDADA");
    let item = pauta_item(&agendada, "EM_ANDAMENTO", None);
    let db = mock()
        .append_query_results([vec![(item.clone(), agendada.clone())]])
        .into_connection();
    let harness = Harness::with_database(&chambers, db.clone());

    let response = harness
        .server
        .post(&format!("/api/pauta/{}/status", item.id))
        .add_header(HOST_HEADER, OURINHOS)
        .authorization_bearer(operador(&harness))
        .json(&json!({ "status": "VOTACAO" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_code(&response.json()), "CONFLICT");
    assert!(!ran(&statements(db), r#"UPDATE "pauta_itens""#));
}

#[tokio::test]
async fn test_item_enters_voting_in_running_session() {
    let chambers = Chambers::new();
    let em_andamento = sessao(&chambers.ourinhos, "EM_ANDAMENTO");
    let item = pauta_item(&em_andamento, "EM_ANDAMENTO", None);
    let mut votando = item.clone();
    votando.status = "VOTACAO".to_string();
    let db = mock()
        .append_query_results([vec![(item.clone(), em_andamento.clone())]])
        .append_query_results([vec![votando]])
        .into_connection();
    let harness = Harness::with_database(&chambers, db.clone());

    let response = harness
        .server
        .post(&format!("/api/pauta/{}/status", item.id))
        .add_header(HOST_HEADER, OURINHOS)
        .authorization_bearer(operador(&harness))
        .json(&json!({ "status": "VOTACAO" }))
        .await;

    response.assert_status_ok();
    assert!(ran(&statements(db), r#"UPDATE "pauta_itens""#));
}

// ============================================================================
// Consultations
// ============================================================================

#[tokio::test]
async fn test_opinion_after_the_window_is_refused() {
    let chambers = Chambers::new();
    let now = chrono::Utc::now();
    let mut encerrada = rascunho(&chambers);
    encerrada.ativa = true;
    encerrada.abertura = (now - chrono::Duration::days(30)).into();
    encerrada.encerramento = (now - chrono::Duration::days(1)).into();
    let db = mock()
        .append_query_results([vec![encerrada.clone()]])
        .into_connection();
    let harness = Harness::with_database(&chambers, db.clone());

    let response = harness
        .server
        .post(&format!("/api/consultas/{}/opinioes", encerrada.id))
        .add_header(HOST_HEADER, OURINHOS)
        .json(&json!({ "opiniao": "FAVORAVEL" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "CONSULTATION_CLOSED");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .contains(&encerrada.id.to_string()));
    assert!(!ran(&statements(db), "INSERT INTO"));
}

fn rascunho(chambers: &Chambers) -> ConsultaPublica {
    let now = chrono::Utc::now();
    ConsultaPublica {
        id: Uuid::new_v4(),
        tenant_id: chambers.ourinhos.id,
        titulo: "Plano Diretor 2026".to_string(),
        descricao: "Revisão do zoneamento urbano".to_string(),
        proposicao_id: None,
        abertura: (now - chrono::Duration::days(1)).into(),
        encerramento: (now + chrono::Duration::days(30)).into(),
        ativa: false,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[tokio::test]
async fn test_draft_consultation_result_is_hidden_from_the_public() {
    let chambers = Chambers::new();
    let consulta = rascunho(&chambers);
    let db = mock()
        .append_query_results([vec![consulta.clone()]])
        .into_connection();
    let harness = Harness::with_database(&chambers, db.clone());

    let response = harness
        .server
        .get(&format!("/api/consultas/{}/resultado", consulta.id))
        .add_header(HOST_HEADER, OURINHOS)
        .await;

    response.assert_status_not_found();
    // no tally is computed for a draft
    assert_eq!(statements(db).len(), 1);
}

#[tokio::test]
async fn test_editor_sees_draft_consultation_result() {
    let chambers = Chambers::new();
    let consulta = rascunho(&chambers);
    let db = mock()
        .append_query_results([vec![consulta.clone()]])
        .append_query_results([Vec::<std::collections::BTreeMap<&str, sea_orm::Value>>::new()])
        .into_connection();
    let harness = Harness::with_database(&chambers, db);

    let response = harness
        .server
        .get(&format!("/api/consultas/{}/resultado", consulta.id))
        .add_header(HOST_HEADER, OURINHOS)
        .authorization_bearer(harness.token(&harness.ourinhos, Role::Editor))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["total"], 0);
    assert_eq!(body["data"]["aberta"], false);
}
