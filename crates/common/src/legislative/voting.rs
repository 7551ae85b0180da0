//! Roll-call tallying

use serde::{Deserialize, Serialize};

string_enum! {
    /// A member's recorded choice on an agenda item
    pub enum VotoOpcao {
        Sim => "SIM",
        Nao => "NAO",
        Abstencao => "ABSTENCAO",
        Ausente => "AUSENTE",
    }
}

string_enum! {
    /// Approval threshold applied to an agenda item
    pub enum QuorumTipo {
        /// More yes than no, with a majority of the members present
        MaioriaSimples => "MAIORIA_SIMPLES",
        /// Yes from more than half of all members
        MaioriaAbsoluta => "MAIORIA_ABSOLUTA",
        /// Yes from at least two thirds of all members
        DoisTercos => "DOIS_TERCOS",
    }
}

string_enum! {
    pub enum ResultadoVotacao {
        Aprovada => "APROVADA",
        Rejeitada => "REJEITADA",
        SemQuorum => "SEM_QUORUM",
    }
}

/// Outcome of a roll call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apuracao {
    pub sim: u32,
    pub nao: u32,
    pub abstencao: u32,
    pub ausente: u32,
    /// Members who registered any choice other than AUSENTE
    pub presentes: u32,
    pub total_membros: u32,
    pub quorum: QuorumTipo,
    pub resultado: ResultadoVotacao,
}

/// Minimum number of members present for a deliberation
pub fn quorum_minimo(total_membros: u32) -> u32 {
    total_membros / 2 + 1
}

/// Count the votes and decide the outcome.
///
/// Members of the chamber that have no recorded vote are counted as absent.
pub fn tally<I>(votos: I, total_membros: u32, quorum: QuorumTipo) -> Apuracao
where
    I: IntoIterator<Item = VotoOpcao>,
{
    let (mut sim, mut nao, mut abstencao, mut ausente) = (0u32, 0u32, 0u32, 0u32);
    for voto in votos {
        match voto {
            VotoOpcao::Sim => sim += 1,
            VotoOpcao::Nao => nao += 1,
            VotoOpcao::Abstencao => abstencao += 1,
            VotoOpcao::Ausente => ausente += 1,
        }
    }

    let presentes = sim + nao + abstencao;
    let registrados = presentes + ausente;
    if total_membros > registrados {
        ausente += total_membros - registrados;
    }
    // A chamber can't have fewer members than votes cast
    let total_membros = total_membros.max(presentes + ausente);

    let resultado = if presentes < quorum_minimo(total_membros) {
        ResultadoVotacao::SemQuorum
    } else {
        let aprovada = match quorum {
            QuorumTipo::MaioriaSimples => sim > nao,
            QuorumTipo::MaioriaAbsoluta => sim > total_membros / 2,
            // ceil(2n/3) without floats
            QuorumTipo::DoisTercos => sim * 3 >= total_membros * 2,
        };
        if aprovada {
            ResultadoVotacao::Aprovada
        } else {
            ResultadoVotacao::Rejeitada
        }
    };

    Apuracao {
        sim,
        nao,
        abstencao,
        ausente,
        presentes,
        total_membros,
        quorum,
        resultado,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VotoOpcao::*;

    fn votes(sim: usize, nao: usize, abst: usize) -> Vec<VotoOpcao> {
        std::iter::repeat(Sim)
            .take(sim)
            .chain(std::iter::repeat(Nao).take(nao))
            .chain(std::iter::repeat(Abstencao).take(abst))
            .collect()
    }

    #[test]
    fn test_simple_majority() {
        let a = tally(votes(5, 3, 1), 11, QuorumTipo::MaioriaSimples);
        assert_eq!(a.presentes, 9);
        assert_eq!(a.ausente, 2);
        assert_eq!(a.resultado, ResultadoVotacao::Aprovada);
    }

    #[test]
    fn test_tie_is_rejected() {
        let a = tally(votes(4, 4, 1), 9, QuorumTipo::MaioriaSimples);
        assert_eq!(a.resultado, ResultadoVotacao::Rejeitada);
    }

    #[test]
    fn test_without_quorum() {
        // 11 members need 6 present
        let a = tally(votes(4, 1, 0), 11, QuorumTipo::MaioriaSimples);
        assert_eq!(a.resultado, ResultadoVotacao::SemQuorum);
        assert_eq!(quorum_minimo(11), 6);
    }

    #[test]
    fn test_absolute_majority_counts_all_members() {
        // 6 of 11 is more than half
        assert_eq!(
            tally(votes(6, 0, 3), 11, QuorumTipo::MaioriaAbsoluta).resultado,
            ResultadoVotacao::Aprovada
        );
        // 5 of 11 wins the room but not the chamber
        assert_eq!(
            tally(votes(5, 1, 3), 11, QuorumTipo::MaioriaAbsoluta).resultado,
            ResultadoVotacao::Rejeitada
        );
    }

    #[test]
    fn test_two_thirds() {
        // ceil(2 * 13 / 3) = 9
        assert_eq!(
            tally(votes(9, 4, 0), 13, QuorumTipo::DoisTercos).resultado,
            ResultadoVotacao::Aprovada
        );
        assert_eq!(
            tally(votes(8, 5, 0), 13, QuorumTipo::DoisTercos).resultado,
            ResultadoVotacao::Rejeitada
        );
        // exactly 2/3
        assert_eq!(
            tally(votes(6, 3, 0), 9, QuorumTipo::DoisTercos).resultado,
            ResultadoVotacao::Aprovada
        );
    }

    #[test]
    fn test_explicit_absences() {
        let mut v = votes(3, 0, 0);
        v.push(Ausente);
        let a = tally(v, 4, QuorumTipo::MaioriaSimples);
        assert_eq!(a.ausente, 1);
        assert_eq!(a.presentes, 3);
        assert_eq!(a.resultado, ResultadoVotacao::Aprovada);
    }
}
