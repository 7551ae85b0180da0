//! Status workflows for plenary sessions and their agenda items
//!
//! Agenda items follow `AGENDADA → CONVOCADA → EM_ANDAMENTO → VOTACAO → CONCLUIDA`.
//! Any open item can be postponed (`ADIADA`) or withdrawn (`RETIRADA`); a
//! postponed item goes back to `AGENDADA` when it is rescheduled.

use crate::errors::{AppError, Result};

string_enum! {
    /// Status of an agenda (pauta) item
    pub enum PautaStatus {
        Agendada => "AGENDADA",
        Convocada => "CONVOCADA",
        EmAndamento => "EM_ANDAMENTO",
        Votacao => "VOTACAO",
        Concluida => "CONCLUIDA",
        Adiada => "ADIADA",
        Retirada => "RETIRADA",
    }
}

string_enum! {
    /// Status of a plenary session
    pub enum SessaoStatus {
        Agendada => "AGENDADA",
        EmAndamento => "EM_ANDAMENTO",
        Suspensa => "SUSPENSA",
        Concluida => "CONCLUIDA",
        Cancelada => "CANCELADA",
    }
}

/// A status whose legal successors are fixed
pub trait StatusMachine: Copy + PartialEq + std::fmt::Display + 'static {
    /// Name used in error messages
    const ENTITY: &'static str;

    /// States reachable in one step
    fn successors(&self) -> &'static [Self];

    fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }

    fn can_transition_to(&self, next: Self) -> bool {
        self.successors().contains(&next)
    }
}

impl StatusMachine for PautaStatus {
    const ENTITY: &'static str = "pauta";

    fn successors(&self) -> &'static [Self] {
        use PautaStatus::*;
        match self {
            Agendada => &[Convocada, Adiada, Retirada],
            Convocada => &[EmAndamento, Adiada, Retirada],
            EmAndamento => &[Votacao, Adiada, Retirada],
            Votacao => &[Concluida, Adiada, Retirada],
            Adiada => &[Agendada, Retirada],
            Concluida | Retirada => &[],
        }
    }
}

impl StatusMachine for SessaoStatus {
    const ENTITY: &'static str = "sessao";

    fn successors(&self) -> &'static [Self] {
        use SessaoStatus::*;
        match self {
            Agendada => &[EmAndamento, Cancelada],
            EmAndamento => &[Suspensa, Concluida],
            Suspensa => &[EmAndamento, Cancelada],
            Concluida | Cancelada => &[],
        }
    }
}

/// Validate a single step, returning the new status
pub fn transition<S: StatusMachine>(from: S, to: S) -> Result<S> {
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(AppError::InvalidTransition {
            entity: S::ENTITY.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Agenda items enter voting only while their session is running
pub fn check_item_transition(
    sessao: SessaoStatus,
    from: PautaStatus,
    to: PautaStatus,
) -> Result<PautaStatus> {
    if to == PautaStatus::Votacao && sessao != SessaoStatus::EmAndamento {
        return Err(AppError::Conflict {
            message: format!(
                "agenda item cannot move to {} while the session is {}",
                to, sessao
            ),
        });
    }
    transition(from, to)
}

/// Items still open when a session is concluded
pub fn blocks_conclusion(status: PautaStatus) -> bool {
    matches!(status, PautaStatus::EmAndamento | PautaStatus::Votacao)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut status = PautaStatus::Agendada;
        for next in [
            PautaStatus::Convocada,
            PautaStatus::EmAndamento,
            PautaStatus::Votacao,
            PautaStatus::Concluida,
        ] {
            status = transition(status, next).unwrap();
        }
        assert!(status.is_terminal());
    }

    #[test]
    fn test_cannot_skip_states() {
        let err = transition(PautaStatus::Agendada, PautaStatus::Votacao).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid status transition for pauta: AGENDADA -> VOTACAO"
        );
    }

    #[test]
    fn test_terminal_states_are_final() {
        assert!(transition(PautaStatus::Concluida, PautaStatus::Agendada).is_err());
        assert!(transition(PautaStatus::Retirada, PautaStatus::Agendada).is_err());
        assert!(SessaoStatus::Cancelada.is_terminal());
    }

    #[test]
    fn test_postponed_item_can_be_rescheduled() {
        let adiada = transition(PautaStatus::Votacao, PautaStatus::Adiada).unwrap();
        assert_eq!(
            transition(adiada, PautaStatus::Agendada).unwrap(),
            PautaStatus::Agendada
        );
    }

    #[test]
    fn test_session_suspend_and_resume() {
        let s = transition(SessaoStatus::Agendada, SessaoStatus::EmAndamento).unwrap();
        let s = transition(s, SessaoStatus::Suspensa).unwrap();
        let s = transition(s, SessaoStatus::EmAndamento).unwrap();
        assert_eq!(
            transition(s, SessaoStatus::Concluida).unwrap(),
            SessaoStatus::Concluida
        );
        assert!(transition(SessaoStatus::Agendada, SessaoStatus::Concluida).is_err());
    }

    #[test]
    fn test_voting_requires_running_session() {
        let err = check_item_transition(
            SessaoStatus::Suspensa,
            PautaStatus::EmAndamento,
            PautaStatus::Votacao,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        assert_eq!(
            check_item_transition(
                SessaoStatus::EmAndamento,
                PautaStatus::EmAndamento,
                PautaStatus::Votacao
            )
            .unwrap(),
            PautaStatus::Votacao
        );
        // Convocation and discussion do not depend on the session state
        assert!(check_item_transition(
            SessaoStatus::Agendada,
            PautaStatus::Agendada,
            PautaStatus::Convocada
        )
        .is_ok());
        assert_eq!(
            check_item_transition(
                SessaoStatus::Agendada,
                PautaStatus::Convocada,
                PautaStatus::EmAndamento
            )
            .unwrap(),
            PautaStatus::EmAndamento
        );
    }

    #[test]
    fn test_open_items_block_conclusion() {
        let blocking: Vec<_> = PautaStatus::ALL
            .iter()
            .copied()
            .filter(|s| blocks_conclusion(*s))
            .collect();
        assert_eq!(blocking, vec![PautaStatus::EmAndamento, PautaStatus::Votacao]);
    }
}
