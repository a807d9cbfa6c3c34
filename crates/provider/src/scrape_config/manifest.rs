//! Renders a locally configured `ScrapeConfig` into a YAML manifest

use scrapeconfig_crd::ScrapeConfigSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{
    API_VERSION, KIND, Metadata, id_attribute, identity_attribute, object_id, spec_attribute,
    type_attributes,
};
use crate::{
    Error, Result,
    schema::{Attribute, Schema},
    state,
    validation::{Validator, validate_config},
};

/// Typed value of the manifest data source
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeConfigManifestData {
    /// `<name>/<namespace>`
    #[serde(skip)]
    pub id: String,
    /// Rendered manifest
    #[serde(skip)]
    pub yaml: String,
    /// Always [`API_VERSION`] after rendering
    #[serde(default)]
    pub api_version: Option<String>,
    /// Always [`KIND`] after rendering
    #[serde(default)]
    pub kind: Option<String>,
    /// Metadata of the object
    pub metadata: Metadata,
    /// Desired spec
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<ScrapeConfigSpec>,
}

/// Data source turning configuration into a `ScrapeConfig` manifest without contacting a cluster
#[derive(Clone, Copy, Debug, Default)]
pub struct ScrapeConfigManifest;

impl ScrapeConfigManifest {
    /// Suffix appended to the provider type name
    pub const TYPE_NAME_SUFFIX: &'static str =
        "_monitoring_coreos_com_scrape_config_v1alpha1_manifest";

    /// Full type name of the data source
    pub fn type_name(provider_type_name: &str) -> String {
        format!("{provider_type_name}{}", Self::TYPE_NAME_SUFFIX)
    }

    /// Attribute tree of the manifest
    pub fn schema() -> Schema {
        let mut attributes = vec![
            id_attribute(),
            Attribute::string("yaml")
                .state_only()
                .computed()
                .describe("The generated manifest in YAML format."),
        ];
        attributes.extend(type_attributes());
        attributes.push(
            Attribute::object(
                "metadata",
                vec![
                    identity_attribute("name", "Unique identifier for this object."),
                    identity_attribute("namespace", "Namespace that contains this object."),
                    Attribute::string_map("labels")
                        .describe("Map of string keys and values that can be used to organize and categorize (scope and select) objects.")
                        .validate(Validator::Labels),
                    Attribute::string_map("annotations")
                        .describe("Unstructured key value map stored with a resource that may be set by external tools to store and retrieve arbitrary metadata.")
                        .validate(Validator::Annotations),
                ],
            )
            .required()
            .describe("Data that helps uniquely identify this object."),
        );
        attributes.push(spec_attribute());

        Schema {
            description: "ScrapeConfig defines a namespaced Prometheus scrape_config to be aggregated across multiple namespaces into the Prometheus configuration.",
            attributes,
        }
    }

    /// Validates `config` and returns the state carrying the rendered manifest
    pub fn read(&self, config: &Value) -> Result<Value> {
        let schema = Self::schema();
        let diagnostics = validate_config(&schema, config);
        if !diagnostics.is_empty() {
            return Err(Error::InvalidConfiguration(diagnostics));
        }

        let model: ScrapeConfigManifestData =
            serde_json::from_value(state::decode(&schema, config)).map_err(Error::StateDecodeError)?;
        let data = self.render(model)?;

        let mut new_state = state::encode(&schema, &serde_json::to_value(&data)?);
        state::set(&mut new_state, "id", data.id);
        state::set(&mut new_state, "yaml", data.yaml);
        Ok(new_state)
    }

    /// Stamps identity and type information on `data` and renders it to YAML
    #[instrument(skip(self, data), fields(
        name = %data.metadata.name,
        namespace = %data.metadata.namespace,
    ))]
    pub fn render(&self, mut data: ScrapeConfigManifestData) -> Result<ScrapeConfigManifestData> {
        data.id = object_id(&data.metadata.name, &data.metadata.namespace);
        data.api_version = Some(API_VERSION.to_owned());
        data.kind = Some(KIND.to_owned());
        data.yaml = serde_yaml::to_string(&data)?;

        debug!(id = %data.id, bytes = data.yaml.len(), "rendered manifest");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rstest::rstest;
    use scrapeconfig_crd::v1_alpha1::DnsSdConfig;
    use serde_json::json;

    use super::*;

    fn config(spec: Value) -> Value {
        json!({
            "metadata": {
                "name": "node-exporter",
                "namespace": "monitoring",
                "labels": {"app.kubernetes.io/name": "node-exporter"},
            },
            "spec": spec,
        })
    }

    fn diagnostic_paths(config: &Value) -> Vec<String> {
        match ScrapeConfigManifest.read(config) {
            Err(Error::InvalidConfiguration(diagnostics)) => diagnostics
                .iter()
                .filter_map(|d| d.attribute.as_ref().map(ToString::to_string))
                .collect(),
            other => panic!("expected invalid configuration, got {other:?}"),
        }
    }

    #[test]
    fn read_sets_identity_and_yaml() {
        let state = ScrapeConfigManifest
            .read(&config(json!({"scheme": "HTTPS", "scrape_interval": "30s"})))
            .expect("rendering succeeds");

        assert_eq!(state["id"], "node-exporter/monitoring");
        assert_eq!(state["api_version"], API_VERSION);
        assert_eq!(state["kind"], KIND);
        assert_eq!(state["spec"]["scheme"], "HTTPS");
        assert_eq!(state["spec"]["metrics_path"], Value::Null);

        let yaml = state["yaml"].as_str().expect("yaml is a string");
        assert!(yaml.starts_with("apiVersion: monitoring.coreos.com/v1alpha1\nkind: ScrapeConfig\n"));
        assert!(!yaml.contains("yaml:"));
        assert!(!yaml.contains("id:"));
    }

    #[test]
    fn yaml_decodes_to_the_supplied_object() {
        let state = ScrapeConfigManifest
            .read(&config(json!({
                "dns_sd_configs": [{"names": ["_metrics._tcp.example.org"], "type": "SRV"}],
                "params": {"module": ["http_2xx"]},
                "relabelings": [{"source_labels": ["__address__"], "target_label": "instance", "action": "Replace"}],
                "tls_config": {"ca": {"config_map": {"key": "ca.crt", "name": "trusted-ca"}}},
            })))
            .expect("rendering succeeds");

        let document: Value =
            serde_yaml::from_str(state["yaml"].as_str().expect("yaml is a string"))
                .expect("yaml parses");
        assert_eq!(
            document,
            json!({
                "apiVersion": "monitoring.coreos.com/v1alpha1",
                "kind": "ScrapeConfig",
                "metadata": {
                    "name": "node-exporter",
                    "namespace": "monitoring",
                    "labels": {"app.kubernetes.io/name": "node-exporter"},
                },
                "spec": {
                    "dnsSDConfigs": [{"names": ["_metrics._tcp.example.org"], "type": "SRV"}],
                    "params": {"module": ["http_2xx"]},
                    "relabelings": [{"sourceLabels": ["__address__"], "targetLabel": "instance", "action": "Replace"}],
                    "tlsConfig": {"ca": {"configMap": {"key": "ca.crt", "name": "trusted-ca"}}},
                },
            })
        );
    }

    #[test]
    fn render_overrides_type_information() {
        let data = ScrapeConfigManifest
            .render(ScrapeConfigManifestData {
                api_version: Some("v1".into()),
                kind: Some("ConfigMap".into()),
                metadata: Metadata {
                    name: "a".into(),
                    namespace: "b".into(),
                    annotations: Some(BTreeMap::from([("note".into(), "x".into())])),
                    ..Default::default()
                },
                spec: Some(ScrapeConfigSpec {
                    scheme: Some("HTTP".into()),
                    dns_sd_configs: Some(vec![DnsSdConfig {
                        names: vec!["db.example.org".into()],
                        type_: Some("AAAA".into()),
                        port: Some(5432),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .expect("rendering succeeds");

        assert_eq!(data.id, "a/b");
        assert_eq!(data.api_version.as_deref(), Some(API_VERSION));
        assert_eq!(data.kind.as_deref(), Some(KIND));

        let decoded: ScrapeConfigManifestData =
            serde_yaml::from_str(&data.yaml).expect("yaml parses");
        assert_eq!(decoded.metadata, data.metadata);
        assert_eq!(decoded.spec, data.spec);
        assert_eq!(decoded.api_version, data.api_version);
        assert_eq!(decoded.kind, data.kind);
    }

    #[test]
    fn spec_is_optional() {
        let state = ScrapeConfigManifest
            .read(&json!({"metadata": {"name": "a", "namespace": "b"}}))
            .expect("rendering succeeds");
        assert_eq!(state["spec"], Value::Null);
        assert_eq!(
            state["yaml"],
            "apiVersion: monitoring.coreos.com/v1alpha1\nkind: ScrapeConfig\nmetadata:\n  name: a\n  namespace: b\n"
        );
    }

    #[rstest]
    #[case::kubernetes_role(json!({"kubernetes_sd_configs": [{"role": "Pod"}]}), "spec.kubernetes_sd_configs[0].role")]
    #[case::dns_type(json!({"dns_sd_configs": [{"names": ["a"], "type": "TXT"}]}), "spec.dns_sd_configs[0].type")]
    #[case::dns_names(json!({"dns_sd_configs": [{"names": []}]}), "spec.dns_sd_configs[0].names")]
    #[case::http_url(json!({"http_sd_configs": [{"url": "ftp://sd"}]}), "spec.http_sd_configs[0].url")]
    #[case::refresh_interval(json!({"file_sd_configs": [{"files": ["a.json"], "refresh_interval": "1 minute"}]}), "spec.file_sd_configs[0].refresh_interval")]
    #[case::scrape_interval(json!({"scrape_interval": "30"}), "spec.scrape_interval")]
    #[case::scheme(json!({"scheme": "https"}), "spec.scheme")]
    #[case::relabel_action(json!({"relabelings": [{"action": "rename"}]}), "spec.relabelings[0].action")]
    #[case::source_label(json!({"metric_relabelings": [{"source_labels": ["ok", "not-ok"]}]}), "spec.metric_relabelings[0].source_labels[1]")]
    #[case::consul_server(json!({"consul_sd_configs": [{"server": ""}]}), "spec.consul_sd_configs[0].server")]
    #[case::secret_key(json!({"basic_auth": {"username": {"name": "creds"}}}), "spec.basic_auth.username.key")]
    #[case::int64(json!({"sample_limit": "100"}), "spec.sample_limit")]
    fn invalid_spec_is_rejected(#[case] spec: Value, #[case] path: &str) {
        assert_eq!(diagnostic_paths(&config(spec)), vec![path]);
    }

    #[rstest]
    #[case::empty_name(json!({"name": "", "namespace": "b"}), vec!["metadata.name", "metadata.name"])]
    #[case::empty_namespace(json!({"name": "a", "namespace": ""}), vec!["metadata.namespace", "metadata.namespace"])]
    #[case::uppercase_name(json!({"name": "Web", "namespace": "b"}), vec!["metadata.name"])]
    #[case::dotted_namespace(json!({"name": "a.b", "namespace": "a.b"}), vec!["metadata.namespace"])]
    #[case::long_name(json!({"name": "a".repeat(254), "namespace": "b"}), vec!["metadata.name"])]
    #[case::long_namespace(json!({"name": "a", "namespace": "b".repeat(64)}), vec!["metadata.namespace"])]
    #[case::missing_namespace(json!({"name": "a"}), vec!["metadata.namespace"])]
    #[case::label_key(json!({"name": "a", "namespace": "b", "labels": {"bad key": "v"}}), vec![r#"metadata.labels["bad key"]"#])]
    #[case::label_value(json!({"name": "a", "namespace": "b", "labels": {"k": "-v"}}), vec![r#"metadata.labels["k"]"#])]
    #[case::annotation_key(json!({"name": "a", "namespace": "b", "annotations": {"a/b/c": "any value at all"}}), vec![r#"metadata.annotations["a/b/c"]"#])]
    fn invalid_metadata_is_rejected(#[case] metadata: Value, #[case] paths: Vec<&str>) {
        assert_eq!(diagnostic_paths(&json!({"metadata": metadata})), paths);
    }

    #[test]
    fn computed_attributes_cannot_be_configured() {
        let mut config = config(json!({}));
        config["yaml"] = json!("kind: Other");
        assert_eq!(diagnostic_paths(&config), vec!["yaml"]);
    }

    #[test]
    fn type_name_has_manifest_suffix() {
        assert_eq!(
            ScrapeConfigManifest::type_name("k8s"),
            "k8s_monitoring_coreos_com_scrape_config_v1alpha1_manifest"
        );
    }
}
