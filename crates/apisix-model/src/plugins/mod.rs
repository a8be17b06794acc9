//! APISIX plugins
//!
//! Every plugin lives in its own module and implements [`Plugin`]: a name,
//! a schema fragment and the two conversions between state and the Admin
//! API. Plugin sets such as [`PluginsModel`] are generated by
//! `plugin_set!`, which dispatches over every field of the set so adding a
//! plugin is a one line change.
//!
//! The state representation of a plugin is its serde form. The default
//! conversions move the `disable` flag to the `_meta.disable` field APISIX
//! expects and pass every other field through unchanged.

use crate::convert::{json_string_from_api, parse_json_string, read_disable, write_disable, JsonMap};
use apisix_core::{Error, Result};
use apisix_schema::{Attribute, Diagnostics, ValidateRequest, Validator};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;

mod basic_auth;
mod cors;
mod ext_plugin_pre_req;
mod gelf_udp_logger;
mod http_logger;
mod ip_restriction;
mod jwt_auth;
mod key_auth;
mod limit_count;
mod prometheus;
mod proxy_rewrite;
mod redirect;
mod response_rewrite;
mod serverless_post_function;
mod serverless_pre_function;

pub use basic_auth::BasicAuthPlugin;
pub use cors::CorsPlugin;
pub use ext_plugin_pre_req::{ExtPluginConf, ExtPluginPreReqPlugin};
pub use gelf_udp_logger::GelfUdpLoggerPlugin;
pub use http_logger::HttpLoggerPlugin;
pub use ip_restriction::IpRestrictionPlugin;
pub use jwt_auth::JwtAuthPlugin;
pub use key_auth::KeyAuthPlugin;
pub use limit_count::LimitCountPlugin;
pub use prometheus::PrometheusPlugin;
pub use proxy_rewrite::ProxyRewritePlugin;
pub use redirect::RedirectPlugin;
pub use response_rewrite::ResponseRewritePlugin;
pub use serverless_post_function::ServerlessPostFunctionPlugin;
pub use serverless_pre_function::ServerlessPreFunctionPlugin;

/// Contract shared by every plugin
pub trait Plugin: Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync {
    /// Plugin name used by APISIX
    const NAME: &'static str;

    /// Schema of the plugin block
    fn schema() -> Attribute;

    /// Whether the plugin is configured but disabled
    fn disabled(&self) -> bool;

    /// Plugin configuration as sent to the Admin API
    fn to_api(&self) -> Result<JsonMap> {
        default_to_api(self)
    }

    /// Plugin state from the Admin API representation. `prior` is the
    /// plugin as recorded in state, if any.
    fn from_api(value: &JsonMap, _prior: Option<&Self>) -> Result<Self> {
        default_from_api(value)
    }
}

/// Serde form of the plugin with `disable` moved under `_meta`
pub(crate) fn default_to_api<P: Plugin>(plugin: &P) -> Result<JsonMap> {
    let mut value = match serde_json::to_value(plugin)? {
        Value::Object(map) => map,
        _ => return Err(Error::plugin(P::NAME, "expected an object")),
    };
    value.remove("disable");
    write_disable(&mut value, plugin.disabled());
    Ok(value)
}

/// Plugin read from its serde form, `disable` taken from `_meta`
pub(crate) fn default_from_api<P: Plugin>(value: &JsonMap) -> Result<P> {
    let mut state = value.clone();
    state.remove("_meta");
    state.insert("disable".to_string(), Value::Bool(read_disable(value)));
    serde_json::from_value(Value::Object(state)).map_err(|e| Error::plugin(P::NAME, e.to_string()))
}

/// `disable` attribute every plugin carries
pub(crate) fn disable_attribute() -> Attribute {
    Attribute::bool()
        .default_value(false)
        .description("Keep the plugin configured but skip it when handling requests.")
}

/// Fixed collection of plugins that can be attached to an object
pub trait PluginSet: Serialize + DeserializeOwned + Clone + Debug + Default + PartialEq {
    /// APISIX names of the plugins in the set
    fn names() -> &'static [&'static str];

    /// Schema of the `plugins` block
    fn schema() -> Attribute;

    /// Plugins as sent to the Admin API, keyed by plugin name
    fn to_api(&self) -> Result<JsonMap>;

    /// Typed plugins found in an API `plugins` object, other names ignored
    fn from_api(plugins: &JsonMap, prior: Option<&Self>) -> Result<Self>;

    /// Whether no plugin is configured
    fn is_empty(&self) -> bool;
}

macro_rules! plugin_set {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $($field:ident: $plugin:ty,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            $(
                #[doc = concat!("`", stringify!($field), "` plugin")]
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$plugin>,
            )+
        }

        impl PluginSet for $name {
            fn names() -> &'static [&'static str] {
                &[$(<$plugin as Plugin>::NAME),+]
            }

            fn schema() -> Attribute {
                Attribute::single_nested(apisix_schema::attributes([
                    $((stringify!($field), <$plugin as Plugin>::schema()),)+
                ]))
                .optional()
                .description("Plugins attached to the object.")
            }

            fn to_api(&self) -> Result<JsonMap> {
                let mut out = JsonMap::new();
                $(
                    if let Some(plugin) = &self.$field {
                        out.insert(
                            <$plugin as Plugin>::NAME.to_string(),
                            Value::Object(plugin.to_api()?),
                        );
                    }
                )+
                Ok(out)
            }

            fn from_api(plugins: &JsonMap, prior: Option<&Self>) -> Result<Self> {
                Ok(Self {
                    $(
                        $field: match plugins.get(<$plugin as Plugin>::NAME) {
                            None | Some(Value::Null) => None,
                            Some(Value::Object(value)) => Some(<$plugin as Plugin>::from_api(
                                value,
                                prior.and_then(|p| p.$field.as_ref()),
                            )?),
                            Some(_) => {
                                return Err(Error::plugin(
                                    <$plugin as Plugin>::NAME,
                                    "expected an object",
                                ))
                            }
                        },
                    )+
                })
            }

            fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())+
            }
        }
    };
}

plugin_set! {
    /// Plugins available to routes, services and global rules
    pub struct PluginsModel {
        cors: CorsPlugin,
        ext_plugin_pre_req: ExtPluginPreReqPlugin,
        gelf_udp_logger: GelfUdpLoggerPlugin,
        http_logger: HttpLoggerPlugin,
        ip_restriction: IpRestrictionPlugin,
        limit_count: LimitCountPlugin,
        prometheus: PrometheusPlugin,
        proxy_rewrite: ProxyRewritePlugin,
        redirect: RedirectPlugin,
        response_rewrite: ResponseRewritePlugin,
        serverless_post_function: ServerlessPostFunctionPlugin,
        serverless_pre_function: ServerlessPreFunctionPlugin,
    }
}

plugin_set! {
    /// Authentication plugins available to consumers
    pub struct ConsumerPluginsModel {
        basic_auth: BasicAuthPlugin,
        jwt_auth: JwtAuthPlugin,
        key_auth: KeyAuthPlugin,
    }
}

/// Merge typed and custom plugins into the API `plugins` object.
///
/// Returns `None` when neither is configured so the field is left out.
pub fn plugins_to_api<S: PluginSet>(
    plugins: &Option<S>,
    custom: &Option<String>,
) -> Result<Option<JsonMap>> {
    if plugins.is_none() && custom.is_none() {
        return Ok(None);
    }
    let mut out = match plugins {
        Some(plugins) => plugins.to_api()?,
        None => JsonMap::new(),
    };
    if let Some(custom) = custom {
        let Value::Object(custom) = parse_json_string("custom_plugins", custom)? else {
            return Err(Error::conversion("custom_plugins", "expected a JSON object"));
        };
        for (name, config) in custom {
            if S::names().contains(&name.as_str()) {
                return Err(Error::plugin(
                    name,
                    "configured in custom_plugins but has a dedicated block",
                ));
            }
            out.insert(name, config);
        }
    }
    Ok(Some(out))
}

/// Split an API `plugins` object into typed plugins and the JSON string of
/// every other plugin.
pub fn plugins_from_api<S: PluginSet>(
    value: Option<&Value>,
    prior_plugins: Option<&S>,
    prior_custom: Option<&str>,
) -> Result<(Option<S>, Option<String>)> {
    let plugins = match value {
        None | Some(Value::Null) => return Ok((None, None)),
        Some(Value::Object(plugins)) => plugins,
        Some(_) => return Err(Error::conversion("plugins", "expected an object")),
    };

    let typed = S::from_api(plugins, prior_plugins)?;
    let typed = if typed.is_empty() && prior_plugins.is_none() {
        None
    } else {
        Some(typed)
    };

    let custom: JsonMap = plugins
        .iter()
        .filter(|(name, _)| !S::names().contains(&name.as_str()))
        .map(|(name, config)| (name.clone(), config.clone()))
        .collect();
    let custom = if custom.is_empty() {
        None
    } else {
        json_string_from_api(Some(&Value::Object(custom)), prior_custom)?
    };

    Ok((typed, custom))
}

/// `custom_plugins` attribute: a JSON object of plugins without a
/// dedicated block
pub fn custom_plugins_attribute<S: PluginSet>() -> Attribute {
    Attribute::string()
        .optional()
        .description("JSON object of plugins without a dedicated block, keyed by plugin name.")
        .validator(CustomPlugins {
            reserved: S::names(),
        })
}

/// Validates the `custom_plugins` JSON document
#[derive(Debug, Clone)]
pub struct CustomPlugins {
    reserved: &'static [&'static str],
}

impl Validator for CustomPlugins {
    fn description(&self) -> String {
        "JSON object of plugin configurations".to_string()
    }

    fn validate(&self, req: &ValidateRequest<'_>, diags: &mut Diagnostics) {
        let Some(text) = req.value.as_str() else {
            return;
        };
        let plugins = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(plugins)) => plugins,
            Ok(_) => {
                diags.add_attribute_error(
                    req.path.clone(),
                    "Invalid JSON String",
                    "custom_plugins must be a JSON object keyed by plugin name",
                );
                return;
            }
            Err(e) => {
                diags.add_attribute_error(
                    req.path.clone(),
                    "Invalid JSON String",
                    format!("custom_plugins is not valid JSON: {e}"),
                );
                return;
            }
        };
        for name in plugins.keys() {
            if self.reserved.contains(&name.as_str()) {
                diags.add_attribute_error(
                    req.path.clone(),
                    "Invalid Attribute Value",
                    format!("Plugin \"{name}\" has a dedicated block, configure it under plugins"),
                );
            }
        }
    }
}
