//! Document loading

use crate::{ConfigFormat, Document};
use apisix_core::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load a document from a file, the format taken from its extension
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let path = path.as_ref();

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

    let format = ConfigFormat::from_path(path)?;
    let document = load_from_str(&content, format)?;
    debug!(
        path = %path.display(),
        resources = document.resources.len(),
        data_sources = document.data.len(),
        "Loaded document"
    );
    Ok(document)
}

/// Expand environment variables in a document.
///
/// Supports `${VAR}` and `${VAR:-default}`. References to other blocks such
/// as `${apisix_upstream.main.id}` contain dots and are left untouched.
pub fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .map_err(|e| Error::Config(format!("Invalid regex: {e}")))?;

    let mut result = String::new();
    let mut last_match = 0;

    for cap in re.captures_iter(content) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let var_name = var_name.as_str();
        let default_value = cap.get(3).map(|m| m.as_str());

        let value = match (env::var(var_name), default_value) {
            (Ok(val), _) => val,
            (Err(_), Some(default)) => default.to_string(),
            (Err(_), None) => {
                return Err(Error::Config(format!(
                    "Environment variable '{var_name}' not set and no default provided"
                )));
            }
        };

        result.push_str(&content[last_match..full_match.start()]);
        result.push_str(&value);
        last_match = full_match.end();
    }

    result.push_str(&content[last_match..]);

    Ok(result)
}

/// Parse a document from a string
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<Document> {
    let expanded_content = expand_env_vars(content)?;

    let document = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {e}")))?,
        ConfigFormat::Toml => toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse JSON: {e}")))?,
    };

    Ok(document)
}

/// Load and validate a single document
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Document> {
    let document = load_from_file(path)?;
    crate::validator::validate_document(&document)?;
    Ok(document)
}

/// Load and merge several documents.
///
/// Documents are merged in order, later ones overriding earlier ones per
/// block address, so a base document can be layered with
/// environment-specific ones.
pub fn load_and_merge<P: AsRef<Path>>(paths: &[P]) -> Result<Document> {
    if paths.is_empty() {
        return Err(Error::Config("No documents provided".to_string()));
    }

    let documents = paths
        .iter()
        .map(load_from_file)
        .collect::<Result<Vec<_>>>()?;

    let merged = crate::merger::merge_documents(documents)?;
    crate::validator::validate_document(&merged)?;

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const YAML_DOCUMENT: &str = r#"
provider:
  endpoint: "http://127.0.0.1:9180/apisix/admin"
  timeout: "10s"

resources:
  - type: apisix_upstream
    name: backend
    config:
      type: roundrobin
      nodes:
        - host: 127.0.0.1
          port: 1980
          weight: 1

  - type: apisix_route
    name: api
    config:
      name: api
      uri: "/api/*"
      methods: ["GET", "POST"]
      upstream_id: "${apisix_upstream.backend.id}"

data:
  - type: apisix_service
    name: billing
    config:
      name: billing
"#;

    #[test]
    fn test_load_yaml() {
        let document = load_from_str(YAML_DOCUMENT, ConfigFormat::Yaml).unwrap();

        assert_eq!(document.resources.len(), 2);
        assert_eq!(document.data.len(), 1);
        assert_eq!(
            document.provider.timeout,
            Some(std::time::Duration::from_secs(10))
        );
        let route = &document.resources[1];
        assert_eq!(route.address(), "apisix_route.api");
        assert_eq!(route.config["upstream_id"], json!("${apisix_upstream.backend.id}"));
        assert_eq!(document.resources[0].config["nodes"][0]["port"], json!(1980));
    }

    #[test]
    fn test_load_toml() {
        let content = r#"
[provider]
endpoint = "http://apisix:9180/apisix/admin"
retry_attempts = 5

[[resources]]
type = "apisix_consumer"
name = "jack"

[resources.config]
username = "jack"
"#;
        let document = load_from_str(content, ConfigFormat::Toml).unwrap();
        assert_eq!(document.provider.retry_attempts, Some(5));
        assert_eq!(document.resources[0].config["username"], json!("jack"));
    }

    #[test]
    fn test_invalid_yaml() {
        let result = load_from_str("resources: [yaml", ConfigFormat::Yaml);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_env_var_with_default() {
        env::remove_var("APISIX_CONFIG_TEST_UNDEFINED");
        let expanded =
            expand_env_vars("endpoint: ${APISIX_CONFIG_TEST_UNDEFINED:-http://localhost:9180}")
                .unwrap();
        assert_eq!(expanded, "endpoint: http://localhost:9180");
    }

    #[test]
    fn test_env_var_substitution_keeps_references() {
        env::set_var("APISIX_CONFIG_TEST_KEY", "secret");
        let expanded = expand_env_vars(
            "api_key: ${APISIX_CONFIG_TEST_KEY}\nupstream_id: ${apisix_upstream.main.id}",
        )
        .unwrap();
        assert_eq!(
            expanded,
            "api_key: secret\nupstream_id: ${apisix_upstream.main.id}"
        );
        env::remove_var("APISIX_CONFIG_TEST_KEY");
    }

    #[test]
    fn test_missing_env_var_no_default() {
        env::remove_var("APISIX_CONFIG_TEST_MISSING");
        let result = expand_env_vars("api_key: ${APISIX_CONFIG_TEST_MISSING}");
        assert!(result.unwrap_err().to_string().contains("APISIX_CONFIG_TEST_MISSING"));
    }

    #[test]
    fn test_load_from_file_detects_format() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"resources": [{{"type": "apisix_global_rule", "name": "metrics", "config": {{"id": "1", "plugins": {{"prometheus": {{}}}}}}}}]}}"#
        )
        .unwrap();

        let document = load_document(file.path()).unwrap();
        assert_eq!(document.resources[0].address(), "apisix_global_rule.metrics");
    }
}
