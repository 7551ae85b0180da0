//! Repository pattern for database operations
//!
//! A single `Repository` exposes every data access operation. Methods are
//! grouped by area in submodules; all of them go through the read/write
//! connections of the shared [`DbPool`].
//!
//! Every tenant-owned row is looked up together with its `tenant_id`, so a
//! row of another chamber is indistinguishable from a missing one.

mod acesso;
mod legislativo;
mod portal;
mod relatorios;

pub use legislativo::{PautaComSessao, ProposicaoFiltro, SessaoFiltro};

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::response::Pagination;
use crate::tenancy::{ResolvedTenant, TenantSource};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Select,
};
use uuid::Uuid;

/// Entities owned by a tenant
pub trait TenantScoped: EntityTrait {
    /// Name used in not-found errors
    const RESOURCE: &'static str;

    fn tenant_column() -> Self::Column;

    fn id_column() -> Self::Column;
}

macro_rules! tenant_scoped {
    ($($entity:ty => $column:ident, $resource:literal;)+) => {
        $(
            impl TenantScoped for $entity {
                const RESOURCE: &'static str = $resource;

                fn tenant_column() -> Self::Column {
                    $column::TenantId
                }

                fn id_column() -> Self::Column {
                    $column::Id
                }
            }
        )+
    };
}

tenant_scoped! {
    UsuarioEntity => UsuarioColumn, "Usuario";
    IntegrationTokenEntity => IntegrationTokenColumn, "IntegrationToken";
    ParlamentarEntity => ParlamentarColumn, "Parlamentar";
    LegislaturaEntity => LegislaturaColumn, "Legislatura";
    SessaoEntity => SessaoColumn, "Sessao";
    PautaItemEntity => PautaItemColumn, "PautaItem";
    VotoEntity => VotoColumn, "Voto";
    PresencaEntity => PresencaColumn, "Presenca";
    ProposicaoEntity => ProposicaoColumn, "Proposicao";
    ComissaoEntity => ComissaoColumn, "Comissao";
    MembroComissaoEntity => MembroComissaoColumn, "MembroComissao";
    ReuniaoComissaoEntity => ReuniaoComissaoColumn, "ReuniaoComissao";
    NormaJuridicaEntity => NormaJuridicaColumn, "NormaJuridica";
    PublicacaoEntity => PublicacaoColumn, "Publicacao";
    NoticiaEntity => NoticiaColumn, "Noticia";
    ConsultaPublicaEntity => ConsultaPublicaColumn, "ConsultaPublica";
    OpiniaoConsultaEntity => OpiniaoConsultaColumn, "OpiniaoConsulta";
    SugestaoEntity => SugestaoColumn, "Sugestao";
    RelatorioAgendadoEntity => RelatorioAgendadoColumn, "RelatorioAgendado";
    RelatorioExecucaoEntity => RelatorioExecucaoColumn, "RelatorioExecucao";
    ConfiguracaoNomenclaturaEntity => ConfiguracaoNomenclaturaColumn, "ConfiguracaoNomenclatura";
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Generic tenant-scoped operations
    // ========================================================================

    /// Base query restricted to one tenant
    pub fn scoped<E: TenantScoped>(tenant_id: Uuid) -> Select<E> {
        E::find().filter(E::tenant_column().eq(tenant_id))
    }

    pub async fn find_scoped<E: TenantScoped>(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<E::Model>> {
        Self::scoped::<E>(tenant_id)
            .filter(E::id_column().eq(id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Like `find_scoped`, reading from the primary
    pub async fn find_scoped_primary<E: TenantScoped>(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<E::Model>> {
        Self::scoped::<E>(tenant_id)
            .filter(E::id_column().eq(id))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Fetch a row of the tenant or fail with `NotFound`
    pub async fn get_scoped<E: TenantScoped>(&self, tenant_id: Uuid, id: Uuid) -> Result<E::Model> {
        self.find_scoped_primary::<E>(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found(E::RESOURCE, id))
    }

    /// Delete a row of the tenant, `NotFound` when nothing matched
    pub async fn delete_scoped<E: TenantScoped>(&self, tenant_id: Uuid, id: Uuid) -> Result<()> {
        let result = E::delete_many()
            .filter(E::tenant_column().eq(tenant_id))
            .filter(E::id_column().eq(id))
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found(E::RESOURCE, id));
        }
        Ok(())
    }

    pub async fn insert<A>(&self, model: A) -> Result<<A::Entity as EntityTrait>::Model>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    {
        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn update<A>(&self, model: A) -> Result<<A::Entity as EntityTrait>::Model>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    {
        model.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Run a query page by page, returning the page and the total count
    pub async fn paginate<E>(
        &self,
        select: Select<E>,
        pagination: &Pagination,
    ) -> Result<(Vec<E::Model>, u64)>
    where
        E: EntityTrait,
        E::Model: Send + Sync + 'static,
    {
        let paginator = select.paginate(self.read_conn(), pagination.per_page());

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(pagination.page_index()).await?;

        Ok((items, total))
    }

    // ========================================================================
    // Tenant Operations
    // ========================================================================

    /// Find tenant by ID
    pub async fn find_tenant_by_id(&self, id: Uuid) -> Result<Option<Tenant>> {
        TenantEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        TenantEntity::find()
            .filter(TenantColumn::Slug.eq(slug))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_tenant_by_domain(&self, domain: &str) -> Result<Option<Tenant>> {
        TenantEntity::find()
            .filter(TenantColumn::Dominio.eq(domain))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_tenants(&self, pagination: &Pagination) -> Result<(Vec<Tenant>, u64)> {
        self.paginate(TenantEntity::find().order_by_asc(TenantColumn::Slug), pagination)
            .await
    }
}

/// Tenant lookups for the resolver, backed by the `tenants` table
#[derive(Clone)]
pub struct DbTenantSource {
    repo: Repository,
}

impl DbTenantSource {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl TenantSource for DbTenantSource {
    async fn by_slug(&self, slug: &str) -> Result<Option<ResolvedTenant>> {
        Ok(self
            .repo
            .find_tenant_by_slug(slug)
            .await?
            .map(|t| t.resolved()))
    }

    async fn by_domain(&self, domain: &str) -> Result<Option<ResolvedTenant>> {
        Ok(self
            .repo
            .find_tenant_by_domain(domain)
            .await?
            .map(|t| t.resolved()))
    }
}
