//! Provider: client configuration and the resource registries

use crate::data_source::{ApiDataSource, DynamicDataSource};
use crate::resource::{ApiResource, DynamicResource};
use apisix_client::{AdminApi, AdminClient, ClientConfig};
use apisix_config::ProviderBlock;
use apisix_model::{
    ApiModel, ConsumerModel, GlobalRuleModel, PluginMetadataModel, RouteModel, ServiceModel,
    SslModel, StreamRouteModel, UpstreamModel,
};
use apisix_schema::validator::int_at_least;
use apisix_schema::{attributes, Attribute, Diagnostics, Schema};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Environment variable holding the Admin API endpoint
pub const ENDPOINT_ENV: &str = "APISIX_ENDPOINT";

/// Environment variable holding the Admin API key
pub const API_KEY_ENV: &str = "APISIX_API_KEY";

/// Registry of resources keyed by type name
pub type ResourceRegistry = BTreeMap<&'static str, Arc<dyn DynamicResource>>;

/// Registry of data sources keyed by type name
pub type DataSourceRegistry = BTreeMap<&'static str, Arc<dyn DynamicDataSource>>;

/// The APISIX provider
#[derive(Clone, Default)]
pub struct ApisixProvider {
    client: Option<Arc<dyn AdminApi>>,
}

impl fmt::Debug for ApisixProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApisixProvider")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl ApisixProvider {
    /// Unconfigured provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider using an existing client
    pub fn with_client(client: Arc<dyn AdminApi>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Provider schema
    pub fn schema() -> Schema {
        Schema::new(attributes([
            (
                "endpoint",
                Attribute::string().optional().description(format!(
                    "Admin API endpoint, such as http://127.0.0.1:9180/apisix/admin. \
                     Falls back to {ENDPOINT_ENV}."
                )),
            ),
            (
                "api_key",
                Attribute::string()
                    .optional()
                    .sensitive()
                    .description(format!("Admin API key. Falls back to {API_KEY_ENV}.")),
            ),
            (
                "timeout",
                Attribute::string()
                    .optional()
                    .description("Request timeout, such as `30s`."),
            ),
            (
                "retry_attempts",
                Attribute::int64()
                    .optional()
                    .validator(int_at_least(1))
                    .description("Attempts for idempotent requests."),
            ),
        ]))
        .description("Manages Apache APISIX through its Admin API.")
    }

    /// Whether a client is available
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Configure the client from `block`, falling back to the process
    /// environment for the endpoint and the API key
    pub fn configure(&mut self, block: &ProviderBlock) -> Diagnostics {
        self.configure_with_env(block, |name| std::env::var(name).ok())
    }

    /// [`configure`](Self::configure) with an explicit environment lookup
    pub fn configure_with_env<F>(&mut self, block: &ProviderBlock, env: F) -> Diagnostics
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut diags = Diagnostics::new();
        let endpoint = block
            .endpoint
            .clone()
            .or_else(|| env(ENDPOINT_ENV))
            .filter(|endpoint| !endpoint.is_empty());
        let api_key = block.api_key.clone().or_else(|| env(API_KEY_ENV));

        let Some(endpoint) = endpoint else {
            warn!("No APISIX endpoint configured, resources will be unavailable");
            diags.add_warning(
                "Unable to create client",
                format!(
                    "No endpoint was configured. Set `endpoint` in the provider block \
                     or the {ENDPOINT_ENV} environment variable."
                ),
            );
            self.client = None;
            return diags;
        };

        let mut config = ClientConfig::new(endpoint);
        if let Some(api_key) = api_key.filter(|key| !key.is_empty()) {
            config = config.with_api_key(api_key);
        }
        if let Some(timeout) = block.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(attempts) = block.retry_attempts {
            let backoff = config.retry_backoff;
            config = config.with_retries(attempts, backoff);
        }

        match config.validate().and_then(|_| AdminClient::new(config.clone())) {
            Ok(client) => {
                info!(endpoint = %config.endpoint, "Configured APISIX client");
                self.client = Some(Arc::new(client));
            }
            Err(e) => {
                diags.add_from_error("Unable to create client", &e);
                self.client = None;
            }
        }
        diags
    }

    /// Every resource, keyed by type name
    pub fn resources(&self) -> ResourceRegistry {
        let mut registry = ResourceRegistry::new();
        self.register_resource::<RouteModel>(&mut registry);
        self.register_resource::<ServiceModel>(&mut registry);
        self.register_resource::<UpstreamModel>(&mut registry);
        self.register_resource::<SslModel>(&mut registry);
        self.register_resource::<ConsumerModel>(&mut registry);
        self.register_resource::<GlobalRuleModel>(&mut registry);
        self.register_resource::<StreamRouteModel>(&mut registry);
        self.register_resource::<PluginMetadataModel>(&mut registry);
        registry
    }

    /// Every data source, keyed by type name
    pub fn data_sources(&self) -> DataSourceRegistry {
        let mut registry = DataSourceRegistry::new();
        self.register_data_source::<RouteModel>(&mut registry);
        self.register_data_source::<UpstreamModel>(&mut registry);
        self.register_data_source::<ServiceModel>(&mut registry);
        registry
    }

    /// Resource of the given type
    pub fn resource(&self, type_name: &str) -> Option<Arc<dyn DynamicResource>> {
        self.resources().remove(type_name)
    }

    /// Data source of the given type
    pub fn data_source(&self, type_name: &str) -> Option<Arc<dyn DynamicDataSource>> {
        self.data_sources().remove(type_name)
    }

    fn register_resource<M: ApiModel>(&self, registry: &mut ResourceRegistry) {
        registry.insert(
            M::TYPE_NAME,
            Arc::new(ApiResource::<M>::new(self.client.clone())),
        );
    }

    fn register_data_source<M: ApiModel>(&self, registry: &mut DataSourceRegistry) {
        registry.insert(
            M::TYPE_NAME,
            Arc::new(ApiDataSource::<M>::new(self.client.clone())),
        );
    }
}
