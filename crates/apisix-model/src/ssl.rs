//! `apisix_ssl_certificate`: certificate and key served for a set of SNIs

use crate::api_model::ApiModel;
use crate::certificate::{cert_snis, check_private_key};
use crate::convert::{get, get_int, put, JsonMap};
use apisix_core::{ObjectKind, Result};
use apisix_schema::validator::{int_one_of, one_of};
use apisix_schema::{
    attributes, is_unknown, Attribute, AttributePath, Diagnostics, ElementKind, PlanModifier,
    PlanModifyRequest, Schema,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// SSL certificate resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SslModel {
    /// Identifier assigned by APISIX
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// PEM certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    /// PEM private key, never returned by APISIX in clear text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// Server names the certificate is served for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snis: Option<Vec<String>>,
    /// `server` or `client`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub cert_type: Option<String>,
    /// Labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// 1 when enabled, 0 when disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
}

/// Plans the SNIs of the certificate when `snis` is not configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DeriveSnis;

impl PlanModifier for DeriveSnis {
    fn description(&self) -> String {
        "derived from the certificate when not configured".to_string()
    }

    fn modify(&self, req: &PlanModifyRequest<'_>, diags: &mut Diagnostics) -> Option<Value> {
        if !req.config.is_null() {
            return None;
        }
        let certificate = req.parent.get("certificate")?;
        if is_unknown(certificate) {
            return None;
        }
        let certificate = certificate.as_str()?;
        match cert_snis(certificate) {
            Ok(snis) => {
                debug!(count = snis.len(), "derived SNIs from certificate");
                Some(Value::from(snis))
            }
            Err(err) => {
                diags.add_attribute_error(
                    AttributePath::root().attribute("certificate"),
                    "Invalid Certificate",
                    format!("Unable to read SNIs from the certificate: {err}"),
                );
                None
            }
        }
    }
}

impl ApiModel for SslModel {
    const KIND: ObjectKind = ObjectKind::Ssl;
    const TYPE_NAME: &'static str = "apisix_ssl_certificate";

    fn schema() -> Schema {
        Schema::new(attributes([
            (
                "id",
                Attribute::string()
                    .computed()
                    .use_state_for_unknown()
                    .description("Identifier of the certificate."),
            ),
            (
                "certificate",
                Attribute::string().required().description("HTTPS certificate."),
            ),
            (
                "private_key",
                Attribute::string()
                    .required()
                    .sensitive()
                    .description("HTTPS private key."),
            ),
            (
                "snis",
                Attribute::list(ElementKind::String)
                    .optional()
                    .computed()
                    .plan_modifier(DeriveSnis)
                    .description("HTTPS SNIs. Read from the certificate when omitted."),
            ),
            (
                "type",
                Attribute::string()
                    .default_value("server")
                    .validator(one_of(&["server", "client"])),
            ),
            ("labels", Attribute::map(ElementKind::String).optional()),
            (
                "status",
                Attribute::int64()
                    .default_value(1)
                    .validator(int_one_of(&[0, 1]))
                    .description("`1` to enable the certificate, `0` to disable it."),
            ),
        ]))
        .description("Manages SSL certificates.")
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn to_api(&self) -> Result<JsonMap> {
        let mut out = JsonMap::new();
        put(&mut out, "cert", &self.certificate)?;
        put(&mut out, "key", &self.private_key)?;
        put(&mut out, "snis", &self.snis)?;
        put(&mut out, "type", &self.cert_type)?;
        put(&mut out, "labels", &self.labels)?;
        put(&mut out, "status", &self.status)?;
        Ok(out)
    }

    fn from_api(id: &str, value: &JsonMap, prior: Option<&Self>) -> Result<Self> {
        let mut certificate: Option<String> = get(value, "cert")?;
        if let (Some(current), Some(prior)) = (&certificate, prior.and_then(|p| p.certificate.as_ref())) {
            if current.trim() == prior.trim() {
                certificate = Some(prior.clone());
            }
        }
        Ok(Self {
            id: Some(id.to_string()),
            certificate,
            // APISIX stores the key encrypted
            private_key: prior.and_then(|p| p.private_key.clone()),
            snis: get(value, "snis")?,
            cert_type: get(value, "type")?,
            labels: get(value, "labels")?,
            status: get_int(value, "status")?,
        })
    }

    fn validate_plan(planned: &JsonMap, diags: &mut Diagnostics) {
        let cert_type = planned.get("type").and_then(Value::as_str).unwrap_or("server");
        let certificate_known = planned
            .get("certificate")
            .is_some_and(|cert| !is_unknown(cert));
        if cert_type == "server" && certificate_known {
            let has_snis = match planned.get("snis") {
                Some(Value::Array(snis)) => !snis.is_empty(),
                Some(other) => is_unknown(other),
                None => false,
            };
            if !has_snis {
                diags.add_attribute_error(
                    AttributePath::root().attribute("snis"),
                    "Missing SNIs",
                    "A server certificate needs at least one SNI, set snis or use a certificate with a subject alternative name or common name",
                );
            }
        }

        if let Some(key) = planned.get("private_key").filter(|k| !is_unknown(k)) {
            if let Some(Err(err)) = key.as_str().map(check_private_key) {
                diags.add_attribute_error(
                    AttributePath::root().attribute("private_key"),
                    "Invalid Private Key",
                    err.to_string(),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::tests::self_signed;
    use apisix_schema::plan;
    use serde_json::json;

    fn planned(config: Value) -> (JsonMap, Diagnostics) {
        let mut diags = Diagnostics::new();
        let value = plan(&SslModel::schema(), &config, None, &mut diags);
        (value.as_object().cloned().unwrap(), diags)
    }

    #[test]
    fn test_snis_derived_from_certificate() {
        let (cert, key) = self_signed(&["example.com", "*.example.com"], "example.com");
        let (planned, diags) = planned(json!({"certificate": cert, "private_key": key}));
        assert!(diags.is_empty(), "{diags}");
        assert_eq!(planned["snis"], json!(["example.com", "*.example.com"]));
        assert_eq!(planned["type"], json!("server"));
        assert_eq!(planned["status"], json!(1));

        let mut diags = Diagnostics::new();
        SslModel::validate_plan(&planned, &mut diags);
        assert!(diags.is_empty(), "{diags}");
    }

    #[test]
    fn test_configured_snis_win() {
        let (cert, key) = self_signed(&["example.com"], "example.com");
        let (planned, _) = planned(json!({
            "certificate": cert,
            "private_key": key,
            "snis": ["other.example.com"]
        }));
        assert_eq!(planned["snis"], json!(["other.example.com"]));
    }

    #[test]
    fn test_unknown_certificate_leaves_snis_unknown() {
        let (planned, diags) = planned(json!({
            "certificate": "${data.apisix_ssl.main.certificate}",
            "private_key": "${var.key}"
        }));
        assert!(diags.is_empty());
        assert!(planned.get("snis").is_none());

        let mut diags = Diagnostics::new();
        SslModel::validate_plan(&planned, &mut diags);
        assert!(diags.is_empty(), "{diags}");
    }

    #[test]
    fn test_server_without_snis() {
        let mut diags = Diagnostics::new();
        let planned = json!({"certificate": "-", "type": "server", "snis": []});
        SslModel::validate_plan(planned.as_object().unwrap(), &mut diags);
        assert_eq!(diags.error_count(), 1);

        let mut diags = Diagnostics::new();
        let planned = json!({"certificate": "-", "type": "client"});
        SslModel::validate_plan(planned.as_object().unwrap(), &mut diags);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_invalid_private_key() {
        let mut diags = Diagnostics::new();
        let planned = json!({"type": "client", "private_key": "not a key"});
        SslModel::validate_plan(planned.as_object().unwrap(), &mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn test_api_mapping_keeps_key_and_certificate_text() {
        let (cert, key) = self_signed(&["example.com"], "example.com");
        let model = SslModel {
            certificate: Some(format!("{cert}\n")),
            private_key: Some(key.clone()),
            snis: Some(vec!["example.com".to_string()]),
            cert_type: Some("server".to_string()),
            status: Some(1),
            ..Default::default()
        };
        let api = model.to_api().unwrap();
        assert_eq!(api["key"], json!(key));

        let mut returned = api.clone();
        returned.insert("cert".to_string(), json!(cert.trim()));
        returned.insert("key".to_string(), json!("ENCRYPTED"));
        let back = SslModel::from_api("1", &returned, Some(&model)).unwrap();
        assert_eq!(back.certificate, model.certificate);
        assert_eq!(back.private_key, Some(key));
        assert_eq!(back.snis, model.snis);
    }
}
