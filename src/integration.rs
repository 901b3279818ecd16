//! Integration construction and lifecycle.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::client::QueryClient;
use crate::config::IntegrationOptions;
use crate::error::ConfigError;
use crate::instrument::{Chain, InstrumentedClient};
use crate::pipeline::Observer;
use crate::registry::{BuilderRole, InstrumentationRegistry, TargetId};
use crate::sink::ObservabilitySink;
use crate::tracing_sink::TracingSink;

/// Method wrapped on the client.
const ENTRY_METHOD: &str = "from";

/// Observes queries made through a Supabase/PostgREST client.
///
/// # Example
///
/// ```rust,ignore
/// use supabase_tracing::{IntegrationOptions, SupabaseIntegration};
///
/// let integration = SupabaseIntegration::builder()
///     .client_instance(&postgrest)
///     .options(IntegrationOptions::default().with_errors(true))
///     .build()?;
///
/// // Called once by the host when observability starts
/// integration.setup_once();
///
/// let client = integration.instrument(postgrest);
/// ```
#[derive(Debug)]
pub struct SupabaseIntegration {
    client: TargetId,
    chain: Chain,
}

impl SupabaseIntegration {
    /// Name under which the integration registers itself.
    pub const NAME: &'static str = "SupabaseIntegration";

    pub fn builder() -> IntegrationBuilder {
        IntegrationBuilder::default()
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Identity of the client type this integration instruments.
    pub fn client(&self) -> TargetId {
        self.client
    }

    pub fn options(&self) -> &IntegrationOptions {
        self.chain.observer.options()
    }

    pub fn registry(&self) -> &Arc<InstrumentationRegistry> {
        &self.chain.registry
    }

    /// Instrument the client type.
    ///
    /// Returns `false` if the type was already instrumented, in which case
    /// nothing changes.
    pub fn setup_once(&self) -> bool {
        self.chain
            .registry
            .instrument(self.client, BuilderRole::Client, &[ENTRY_METHOD])
    }

    /// Wrap a client so its queries flow through this integration.
    pub fn instrument<C>(&self, client: C) -> InstrumentedClient<C>
    where
        C: QueryClient + 'static,
        C::Table: 'static,
    {
        InstrumentedClient::new(client, self.chain.clone())
    }

    /// Undo all instrumentation recorded in the registry.
    ///
    /// Wrappers created earlier keep working but only forward calls.
    /// Meant for test teardown; returns the number of restored types.
    pub fn restore(&self) -> usize {
        self.chain.registry.restore().len()
    }
}

enum OptionsSource {
    Typed(IntegrationOptions),
    Raw(Value),
}

/// Builder for [`SupabaseIntegration`]. All validation happens in [`build`](Self::build).
#[derive(Default)]
pub struct IntegrationBuilder {
    client: Option<TargetId>,
    options: Option<OptionsSource>,
    sink: Option<Arc<dyn ObservabilitySink>>,
    registry: Option<Arc<InstrumentationRegistry>>,
}

impl fmt::Debug for IntegrationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationBuilder")
            .field("client", &self.client)
            .field("custom_sink", &self.sink.is_some())
            .field("shared_registry", &self.registry.is_some())
            .finish_non_exhaustive()
    }
}

impl IntegrationBuilder {
    /// Target the client type `C`.
    pub fn client_type<C: QueryClient + 'static>(mut self) -> Self {
        self.client = Some(TargetId::of::<C>());
        self
    }

    /// Target the type of an existing client.
    pub fn client_instance<C: QueryClient + 'static>(mut self, client: &C) -> Self {
        self.client = Some(TargetId::of_val(client));
        self
    }

    pub fn options(mut self, options: IntegrationOptions) -> Self {
        self.options = Some(OptionsSource::Typed(options));
        self
    }

    /// Options as a JSON mapping, validated by [`IntegrationOptions::from_value`].
    pub fn options_value(mut self, options: Value) -> Self {
        self.options = Some(OptionsSource::Raw(options));
        self
    }

    /// Where spans, breadcrumbs and errors go. Defaults to [`TracingSink`].
    pub fn sink(mut self, sink: impl ObservabilitySink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Share a registry with other integrations.
    pub fn registry(mut self, registry: Arc<InstrumentationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<SupabaseIntegration, ConfigError> {
        let client = self.client.ok_or(ConfigError::MissingClient)?;

        let options = match self.options {
            Some(OptionsSource::Typed(options)) => options,
            Some(OptionsSource::Raw(value)) => IntegrationOptions::from_value(&value)?,
            None => IntegrationOptions::default(),
        };

        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingSink::default()) as Arc<dyn ObservabilitySink>);
        let registry = self.registry.unwrap_or_default();

        tracing::debug!(
            client = client.type_name(),
            options = ?options,
            "Supabase integration configured"
        );

        Ok(SupabaseIntegration {
            client,
            chain: Chain {
                registry,
                observer: Observer::new(Arc::new(options), sink),
            },
        })
    }
}
