//! SeaORM entity models
//!
//! Database entities for Plenário. Every table except `tenants` carries
//! `tenant_id`.

mod tenant;
mod usuario;
mod integration_token;
mod parlamentar;
mod legislatura;
mod sessao;
mod pauta_item;
mod voto;
mod presenca;
mod proposicao;
mod comissao;
mod membro_comissao;
mod reuniao_comissao;
mod norma_juridica;
mod publicacao;
mod noticia;
mod consulta_publica;
mod opiniao_consulta;
mod sugestao;
mod relatorio_agendado;
mod relatorio_execucao;
mod sequencia;
mod configuracao_nomenclatura;

pub use tenant::{
    Entity as TenantEntity,
    Model as Tenant,
    ActiveModel as TenantActiveModel,
    Column as TenantColumn,
};

pub use usuario::{
    Entity as UsuarioEntity,
    Model as Usuario,
    ActiveModel as UsuarioActiveModel,
    Column as UsuarioColumn,
};

pub use integration_token::{
    Entity as IntegrationTokenEntity,
    Model as IntegrationToken,
    ActiveModel as IntegrationTokenActiveModel,
    Column as IntegrationTokenColumn,
};

pub use parlamentar::{
    Entity as ParlamentarEntity,
    Model as Parlamentar,
    ActiveModel as ParlamentarActiveModel,
    Column as ParlamentarColumn,
};

pub use legislatura::{
    Entity as LegislaturaEntity,
    Model as Legislatura,
    ActiveModel as LegislaturaActiveModel,
    Column as LegislaturaColumn,
};

pub use sessao::{
    Entity as SessaoEntity,
    Model as Sessao,
    ActiveModel as SessaoActiveModel,
    Column as SessaoColumn,
};

pub use pauta_item::{
    Entity as PautaItemEntity,
    Model as PautaItem,
    ActiveModel as PautaItemActiveModel,
    Column as PautaItemColumn,
};

pub use voto::{
    Entity as VotoEntity,
    Model as Voto,
    ActiveModel as VotoActiveModel,
    Column as VotoColumn,
};

pub use presenca::{
    Entity as PresencaEntity,
    Model as Presenca,
    ActiveModel as PresencaActiveModel,
    Column as PresencaColumn,
};

pub use proposicao::{
    Entity as ProposicaoEntity,
    Model as Proposicao,
    ActiveModel as ProposicaoActiveModel,
    Column as ProposicaoColumn,
};

pub use comissao::{
    Entity as ComissaoEntity,
    Model as Comissao,
    ActiveModel as ComissaoActiveModel,
    Column as ComissaoColumn,
};

pub use membro_comissao::{
    Entity as MembroComissaoEntity,
    Model as MembroComissao,
    ActiveModel as MembroComissaoActiveModel,
    Column as MembroComissaoColumn,
};

pub use reuniao_comissao::{
    Entity as ReuniaoComissaoEntity,
    Model as ReuniaoComissao,
    ActiveModel as ReuniaoComissaoActiveModel,
    Column as ReuniaoComissaoColumn,
};

pub use norma_juridica::{
    Entity as NormaJuridicaEntity,
    Model as NormaJuridica,
    ActiveModel as NormaJuridicaActiveModel,
    Column as NormaJuridicaColumn,
};

pub use publicacao::{
    Entity as PublicacaoEntity,
    Model as Publicacao,
    ActiveModel as PublicacaoActiveModel,
    Column as PublicacaoColumn,
};

pub use noticia::{
    Entity as NoticiaEntity,
    Model as Noticia,
    ActiveModel as NoticiaActiveModel,
    Column as NoticiaColumn,
};

pub use consulta_publica::{
    Entity as ConsultaPublicaEntity,
    Model as ConsultaPublica,
    ActiveModel as ConsultaPublicaActiveModel,
    Column as ConsultaPublicaColumn,
};

pub use opiniao_consulta::{
    Entity as OpiniaoConsultaEntity,
    Model as OpiniaoConsulta,
    ActiveModel as OpiniaoConsultaActiveModel,
    Column as OpiniaoConsultaColumn,
};

pub use sugestao::{
    Entity as SugestaoEntity,
    Model as Sugestao,
    ActiveModel as SugestaoActiveModel,
    Column as SugestaoColumn,
};

pub use relatorio_agendado::{
    Entity as RelatorioAgendadoEntity,
    Model as RelatorioAgendado,
    ActiveModel as RelatorioAgendadoActiveModel,
    Column as RelatorioAgendadoColumn,
};

pub use relatorio_execucao::{
    Entity as RelatorioExecucaoEntity,
    Model as RelatorioExecucao,
    ActiveModel as RelatorioExecucaoActiveModel,
    Column as RelatorioExecucaoColumn,
};

pub use sequencia::{
    Entity as SequenciaEntity,
    Model as Sequencia,
    ActiveModel as SequenciaActiveModel,
    Column as SequenciaColumn,
};

pub use configuracao_nomenclatura::{
    Entity as ConfiguracaoNomenclaturaEntity,
    Model as ConfiguracaoNomenclatura,
    ActiveModel as ConfiguracaoNomenclaturaActiveModel,
    Column as ConfiguracaoNomenclaturaColumn,
};
