//! Closed vocabularies used across the chamber's records

string_enum! {
    /// Kind of plenary session
    pub enum SessaoTipo {
        Ordinaria => "ORDINARIA",
        Extraordinaria => "EXTRAORDINARIA",
        Solene => "SOLENE",
        Especial => "ESPECIAL",
    }
}

impl SessaoTipo {
    /// Human label used by session titles
    pub fn label(&self) -> &'static str {
        match self {
            SessaoTipo::Ordinaria => "Ordinária",
            SessaoTipo::Extraordinaria => "Extraordinária",
            SessaoTipo::Solene => "Solene",
            SessaoTipo::Especial => "Especial",
        }
    }
}

string_enum! {
    /// Kind of bill or motion
    pub enum ProposicaoTipo {
        ProjetoLei => "PL",
        ProjetoLeiComplementar => "PLC",
        ProjetoResolucao => "PR",
        ProjetoDecretoLegislativo => "PDL",
        Requerimento => "REQ",
        Indicacao => "IND",
        Mocao => "MOC",
        Emenda => "EMENDA",
    }
}

impl ProposicaoTipo {
    pub fn label(&self) -> &'static str {
        match self {
            ProposicaoTipo::ProjetoLei => "Projeto de Lei",
            ProposicaoTipo::ProjetoLeiComplementar => "Projeto de Lei Complementar",
            ProposicaoTipo::ProjetoResolucao => "Projeto de Resolução",
            ProposicaoTipo::ProjetoDecretoLegislativo => "Projeto de Decreto Legislativo",
            ProposicaoTipo::Requerimento => "Requerimento",
            ProposicaoTipo::Indicacao => "Indicação",
            ProposicaoTipo::Mocao => "Moção",
            ProposicaoTipo::Emenda => "Emenda",
        }
    }

    /// Identifier shown to citizens, e.g. `PL 12/2024`
    pub fn identificador(&self, numero: i32, ano: i32) -> String {
        format!("{} {}/{}", self.as_str(), numero, ano)
    }
}

string_enum! {
    pub enum ProposicaoStatus {
        EmTramitacao => "EM_TRAMITACAO",
        Aprovada => "APROVADA",
        Rejeitada => "REJEITADA",
        Arquivada => "ARQUIVADA",
        Retirada => "RETIRADA",
    }
}

string_enum! {
    /// Role of a member inside a committee
    pub enum CargoComissao {
        Presidente => "PRESIDENTE",
        VicePresidente => "VICE_PRESIDENTE",
        Relator => "RELATOR",
        Membro => "MEMBRO",
    }
}

string_enum! {
    pub enum ReuniaoStatus {
        Agendada => "AGENDADA",
        Realizada => "REALIZADA",
        Cancelada => "CANCELADA",
    }
}

string_enum! {
    pub enum NormaTipo {
        LeiOrdinaria => "LEI_ORDINARIA",
        LeiComplementar => "LEI_COMPLEMENTAR",
        DecretoLegislativo => "DECRETO_LEGISLATIVO",
        Resolucao => "RESOLUCAO",
        EmendaLeiOrganica => "EMENDA_LEI_ORGANICA",
    }
}

string_enum! {
    pub enum NormaSituacao {
        Vigente => "VIGENTE",
        Alterada => "ALTERADA",
        Revogada => "REVOGADA",
    }
}

string_enum! {
    /// Transparency portal document category
    pub enum CategoriaPublicacao {
        Loa => "LOA",
        Ldo => "LDO",
        Ppa => "PPA",
        Rgf => "RGF",
        Rreo => "RREO",
        Contrato => "CONTRATO",
        Licitacao => "LICITACAO",
        Diaria => "DIARIA",
        FolhaPagamento => "FOLHA_PAGAMENTO",
        Outros => "OUTROS",
    }
}

impl CategoriaPublicacao {
    /// Documents required by the fiscal-responsibility law
    pub fn is_lrf(&self) -> bool {
        matches!(
            self,
            CategoriaPublicacao::Loa
                | CategoriaPublicacao::Ldo
                | CategoriaPublicacao::Ppa
                | CategoriaPublicacao::Rgf
                | CategoriaPublicacao::Rreo
        )
    }
}

string_enum! {
    /// A citizen's position on a public consultation
    pub enum Opiniao {
        Favoravel => "FAVORAVEL",
        Contraria => "CONTRARIA",
        Neutra => "NEUTRA",
    }
}

string_enum! {
    pub enum SugestaoStatus {
        Pendente => "PENDENTE",
        Aprovada => "APROVADA",
        Rejeitada => "REJEITADA",
        Respondida => "RESPONDIDA",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_trip_through_text() {
        for tipo in SessaoTipo::ALL {
            assert_eq!(SessaoTipo::from_str(tipo.as_str()).unwrap(), *tipo);
        }
        assert!(ProposicaoTipo::from_str("XYZ").is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&ProposicaoStatus::EmTramitacao).unwrap();
        assert_eq!(json, "\"EM_TRAMITACAO\"");
        let parsed: CargoComissao = serde_json::from_str("\"VICE_PRESIDENTE\"").unwrap();
        assert_eq!(parsed, CargoComissao::VicePresidente);
    }

    #[test]
    fn test_identificador() {
        assert_eq!(ProposicaoTipo::ProjetoLei.identificador(12, 2024), "PL 12/2024");
    }

    #[test]
    fn test_lrf_categories() {
        let lrf: Vec<_> = CategoriaPublicacao::ALL.iter().filter(|c| c.is_lrf()).collect();
        assert_eq!(lrf.len(), 5);
        assert!(!CategoriaPublicacao::Contrato.is_lrf());
    }
}
