//! Instrumented wrappers around the three builder roles.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::client::{FilterBuilder, QueryClient, TableBuilder};
use crate::integration::SupabaseIntegration;
use crate::parser::Operation;
use crate::pipeline::Observer;
use crate::registry::{BuilderRole, InstrumentationRegistry, TargetId};
use crate::request::RequestDescriptor;

/// Method wrapped on the filter builder.
pub(crate) const COMPLETION_METHOD: &str = "execute";

/// What every wrapper in a chain shares.
#[derive(Debug, Clone)]
pub(crate) struct Chain {
    pub(crate) registry: Arc<InstrumentationRegistry>,
    pub(crate) observer: Observer,
}

impl Chain {
    /// Instrument `C` once its parent `P` is known to be instrumented.
    fn descend<P: 'static, C: 'static>(&self, role: BuilderRole, methods: &[&'static str]) {
        if self.registry.contains::<P>() {
            self.registry.instrument(TargetId::of::<C>(), role, methods);
        }
    }
}

/// A query client whose queries are observed.
///
/// Created by [`SupabaseIntegration::instrument`] or [`InstrumentExt::instrumented`].
/// Observation only happens once the integration's
/// [`setup_once`](SupabaseIntegration::setup_once) has registered the client type;
/// until then, and after [`restore`](SupabaseIntegration::restore), every call is
/// forwarded untouched.
///
/// # Example
///
/// ```rust,ignore
/// let integration = SupabaseIntegration::builder()
///     .client_type::<Postgrest>()
///     .build()?;
/// integration.setup_once();
///
/// let client = integration.instrument(postgrest);
/// let response = client
///     .from("users")
///     .select("*")
///     .with(|q| q.eq("id", "42"))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct InstrumentedClient<C> {
    inner: C,
    chain: Chain,
}

impl<C> InstrumentedClient<C>
where
    C: QueryClient + 'static,
    C::Table: 'static,
{
    pub(crate) fn new(inner: C, chain: Chain) -> Self {
        Self { inner, chain }
    }

    /// Start a query against `table`.
    pub fn from(&self, table: &str) -> InstrumentedTable<C::Table> {
        let builder = self.inner.from(table);
        self.chain
            .descend::<C, C::Table>(BuilderRole::TableBuilder, &Operation::METHOD_NAMES);

        InstrumentedTable {
            inner: builder,
            chain: self.chain.clone(),
        }
    }

    /// Get a reference to the underlying client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Consume the wrapper and return the underlying client.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

/// A table builder whose operations lead to observed filter builders.
#[derive(Debug)]
pub struct InstrumentedTable<T> {
    inner: T,
    chain: Chain,
}

impl<T> InstrumentedTable<T>
where
    T: TableBuilder + 'static,
    T::Filter: 'static,
{
    // Every operation may be the first one called, so each one descends
    fn wrap(chain: Chain, filter: T::Filter) -> InstrumentedFilter<T::Filter> {
        chain.descend::<T, T::Filter>(BuilderRole::FilterBuilder, &[COMPLETION_METHOD]);
        InstrumentedFilter {
            inner: filter,
            chain,
        }
    }

    pub fn select(self, columns: &str) -> InstrumentedFilter<T::Filter> {
        let filter = self.inner.select(columns);
        Self::wrap(self.chain, filter)
    }

    pub fn insert(self, values: Value) -> InstrumentedFilter<T::Filter> {
        let filter = self.inner.insert(values);
        Self::wrap(self.chain, filter)
    }

    pub fn upsert(self, values: Value) -> InstrumentedFilter<T::Filter> {
        let filter = self.inner.upsert(values);
        Self::wrap(self.chain, filter)
    }

    pub fn update(self, values: Value) -> InstrumentedFilter<T::Filter> {
        let filter = self.inner.update(values);
        Self::wrap(self.chain, filter)
    }

    pub fn delete(self) -> InstrumentedFilter<T::Filter> {
        let filter = self.inner.delete();
        Self::wrap(self.chain, filter)
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// A filter builder whose completion is observed.
///
/// Filters are applied to the wrapped builder with [`with`](Self::with);
/// awaiting the wrapper executes the request.
#[derive(Debug)]
pub struct InstrumentedFilter<F> {
    inner: F,
    chain: Chain,
}

impl<F> InstrumentedFilter<F>
where
    F: FilterBuilder + 'static,
{
    /// Apply builder methods to the wrapped filter builder.
    pub fn with(mut self, apply: impl FnOnce(F) -> F) -> Self {
        self.inner = apply(self.inner);
        self
    }

    pub fn request(&self) -> &RequestDescriptor {
        self.inner.request()
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut F {
        &mut self.inner
    }

    pub fn into_inner(self) -> F {
        self.inner
    }

    /// Execute the request, observing it if the builder type is instrumented.
    pub async fn execute(self) -> Result<F::Output, F::Error> {
        if self.chain.registry.contains::<F>() {
            self.chain.observer.observe(self.inner).await
        } else {
            self.inner.execute().await
        }
    }
}

impl<F> IntoFuture for InstrumentedFilter<F>
where
    F: FilterBuilder + 'static,
{
    type Output = Result<F::Output, F::Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

/// Extension trait for easy wrapping of query clients.
pub trait InstrumentExt: QueryClient + Sized {
    /// Wrap this client with the given integration's instrumentation.
    fn instrumented(self, integration: &SupabaseIntegration) -> InstrumentedClient<Self>;
}

impl<C> InstrumentExt for C
where
    C: QueryClient + 'static,
    C::Table: 'static,
{
    fn instrumented(self, integration: &SupabaseIntegration) -> InstrumentedClient<Self> {
        integration.instrument(self)
    }
}
