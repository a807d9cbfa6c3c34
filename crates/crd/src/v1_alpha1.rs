//! v1alpha1 `ScrapeConfig` resources of the Prometheus Operator

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of the Prometheus Operator resources
pub const GROUP: &str = "monitoring.coreos.com";
/// Version served by this module
pub const VERSION: &str = "v1alpha1";
/// Kind of the resource
pub const KIND: &str = "ScrapeConfig";
/// Plural resource name used in API paths
pub const PLURAL: &str = "scrapeconfigs";
/// `apiVersion` stamped on every rendered object
pub const API_VERSION: &str = "monitoring.coreos.com/v1alpha1";

/// Spec object for the `ScrapeConfig` CRD
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(kind = "ScrapeConfig", group = "monitoring.coreos.com", version = "v1alpha1")]
#[kube(plural = "scrapeconfigs", shortname = "scfg")]
#[kube(namespaced)]
pub struct ScrapeConfigSpec {
    /// List of targets for this scrape config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_configs: Option<Vec<StaticConfig>>,
    /// List of file service discovery configurations
    #[serde(default, rename = "fileSDConfigs", skip_serializing_if = "Option::is_none")]
    pub file_sd_configs: Option<Vec<FileSdConfig>>,
    /// List of HTTP service discovery configurations
    #[serde(default, rename = "httpSDConfigs", skip_serializing_if = "Option::is_none")]
    pub http_sd_configs: Option<Vec<HttpSdConfig>>,
    /// List of Kubernetes service discovery configurations
    #[serde(default, rename = "kubernetesSDConfigs", skip_serializing_if = "Option::is_none")]
    pub kubernetes_sd_configs: Option<Vec<KubernetesSdConfig>>,
    /// List of Consul service discovery configurations
    #[serde(default, rename = "consulSDConfigs", skip_serializing_if = "Option::is_none")]
    pub consul_sd_configs: Option<Vec<ConsulSdConfig>>,
    /// List of DNS service discovery configurations
    #[serde(default, rename = "dnsSDConfigs", skip_serializing_if = "Option::is_none")]
    pub dns_sd_configs: Option<Vec<DnsSdConfig>>,
    /// Relabelings applied to targets before scraping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relabelings: Option<Vec<RelabelConfig>>,
    /// HTTP path to scrape for metrics, defaults to `/metrics` on the server side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_path: Option<String>,
    /// How frequently to scrape the targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(
        pattern = r"^(0|(([0-9]+)y)?(([0-9]+)w)?(([0-9]+)d)?(([0-9]+)h)?(([0-9]+)m)?(([0-9]+)s)?(([0-9]+)ms)?)$"
    ))]
    pub scrape_interval: Option<String>,
    /// Number of seconds to wait until a scrape request times out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(
        pattern = r"^(0|(([0-9]+)y)?(([0-9]+)w)?(([0-9]+)d)?(([0-9]+)h)?(([0-9]+)m)?(([0-9]+)s)?(([0-9]+)ms)?)$"
    ))]
    pub scrape_timeout: Option<String>,
    /// Whether to respect the timestamps present in scraped data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honor_timestamps: Option<bool>,
    /// Whether scraped labels win over target labels on conflicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honor_labels: Option<bool>,
    /// Optional HTTP URL parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, Vec<String>>>,
    /// Protocol scheme used for requests, `HTTP` or `HTTPS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Basic authentication credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    /// Authorization header configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<SafeAuthorization>,
    /// TLS configuration used by the scrape requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<SafeTlsConfig>,
    /// Per-scrape limit on number of scraped samples that will be accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_limit: Option<i64>,
    /// Per-scrape limit on the number of targets dropped by relabeling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_limit: Option<i64>,
    /// Per-scrape limit on number of labels accepted for a sample
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_limit: Option<i64>,
    /// Per-scrape limit on length of label names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_name_length_limit: Option<i64>,
    /// Per-scrape limit on length of label values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_value_length_limit: Option<i64>,
    /// Per-scrape limit on the number of targets dropped by relabeling that are kept in memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_dropped_targets: Option<i64>,
    /// Relabelings applied to samples before ingestion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_relabelings: Option<Vec<RelabelConfig>>,
}

/// Static list of targets sharing a label set
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaticConfig {
    /// Targets of the static config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
    /// Labels assigned to all metrics scraped from the targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// File based service discovery
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileSdConfig {
    /// Files from which targets are extracted, globs are allowed in the last path segment
    #[schemars(length(min = 1))]
    pub files: Vec<String>,
    /// Refresh interval to re-read the files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(
        pattern = r"^(0|(([0-9]+)y)?(([0-9]+)w)?(([0-9]+)d)?(([0-9]+)h)?(([0-9]+)m)?(([0-9]+)s)?(([0-9]+)ms)?)$"
    ))]
    pub refresh_interval: Option<String>,
}

/// HTTP based service discovery
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpSdConfig {
    /// URL from which the targets are fetched
    #[schemars(length(min = 1))]
    #[schemars(regex(pattern = r"^http(s)?://.+$"))]
    pub url: String,
    /// Refresh interval to re-query the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(
        pattern = r"^(0|(([0-9]+)y)?(([0-9]+)w)?(([0-9]+)d)?(([0-9]+)h)?(([0-9]+)m)?(([0-9]+)s)?(([0-9]+)ms)?)$"
    ))]
    pub refresh_interval: Option<String>,
    /// Basic authentication for the discovery request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    /// Authorization header for the discovery request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<SafeAuthorization>,
    /// TLS configuration for the discovery request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<SafeTlsConfig>,
    /// Optional proxy URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    /// Comma-separated list of hosts excluded from proxying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<String>,
    /// Use the proxy configuration from the environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_from_environment: Option<bool>,
    /// Whether HTTP requests follow redirects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,
    /// Whether to enable HTTP2
    #[serde(default, rename = "enableHTTP2", skip_serializing_if = "Option::is_none")]
    pub enable_http2: Option<bool>,
}

/// Kubernetes service discovery
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesSdConfig {
    /// Role of the entities to discover, only `Node` is supported by this version
    pub role: String,
}

/// Consul service discovery
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsulSdConfig {
    /// Consul server address, a valid URL without the scheme
    #[schemars(length(min = 1))]
    pub server: String,
    /// Consul ACL token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_ref: Option<SecretKeySelector>,
    /// Consul datacenter name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    /// Namespaces are only supported in Consul Enterprise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Admin partitions are only supported in Consul Enterprise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    /// Protocol scheme used to talk to Consul, `HTTP` or `HTTPS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Services for which targets are retrieved, all services when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
    /// Tags used to filter nodes for a given service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// String by which Consul tags are joined into the tag label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_separator: Option<String>,
    /// Node metadata key/value pairs to filter nodes for a given service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_meta: Option<BTreeMap<String, String>>,
    /// Allow stale Consul results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_stale: Option<bool>,
    /// Time after which the provided names are refreshed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(
        pattern = r"^(0|(([0-9]+)y)?(([0-9]+)w)?(([0-9]+)d)?(([0-9]+)h)?(([0-9]+)m)?(([0-9]+)s)?(([0-9]+)ms)?)$"
    ))]
    pub refresh_interval: Option<String>,
    /// Basic authentication for Consul
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    /// Authorization header for Consul
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<SafeAuthorization>,
    /// OAuth2 client credentials used to fetch a token for Consul
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2: Option<OAuth2>,
    /// Optional proxy URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    /// Comma-separated list of hosts excluded from proxying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<String>,
    /// Use the proxy configuration from the environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_from_environment: Option<bool>,
    /// Whether HTTP requests follow redirects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,
    /// Whether to enable HTTP2
    #[serde(default, rename = "enableHTTP2", skip_serializing_if = "Option::is_none")]
    pub enable_http2: Option<bool>,
    /// TLS configuration for Consul
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<SafeTlsConfig>,
}

/// DNS based service discovery
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsSdConfig {
    /// DNS domain names to be queried
    #[schemars(length(min = 1))]
    pub names: Vec<String>,
    /// Time after which the provided names are refreshed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(
        pattern = r"^(0|(([0-9]+)y)?(([0-9]+)w)?(([0-9]+)d)?(([0-9]+)h)?(([0-9]+)m)?(([0-9]+)s)?(([0-9]+)ms)?)$"
    ))]
    pub refresh_interval: Option<String>,
    /// Type of DNS query to perform (`SRV`, `A`, `AAAA` or `MX`), `SRV` when unset
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Port number used if the query type is not `SRV`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
}

/// A relabeling rule applied to targets or samples
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelabelConfig {
    /// Source labels select values from existing labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_labels: Option<Vec<String>>,
    /// Separator placed between concatenated source label values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    /// Label to which the resulting value is written in a replace action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_label: Option<String>,
    /// Regular expression against which the extracted value is matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Modulus to take of the hash of the source label values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modulus: Option<i64>,
    /// Replacement value against which a regex replace is performed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    /// Action to perform based on the regex matching, `replace` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Basic authentication credentials taken from secrets
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BasicAuth {
    /// Secret key holding the username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<SecretKeySelector>,
    /// Secret key holding the password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretKeySelector>,
}

/// Authorization header configuration
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SafeAuthorization {
    /// Authentication type, `Bearer` when unset
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Secret key holding the credentials of the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<SecretKeySelector>,
}

/// OAuth2 client credentials flow
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2 {
    /// Secret or config map key holding the client id
    pub client_id: SecretOrConfigMap,
    /// Secret key holding the client secret
    pub client_secret: SecretKeySelector,
    /// URL to fetch the token from
    #[schemars(length(min = 1))]
    pub token_url: String,
    /// OAuth2 scopes used for the token request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    /// Parameters appended to the token URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_params: Option<BTreeMap<String, String>>,
}

/// TLS configuration referencing secrets and config maps
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SafeTlsConfig {
    /// Certificate authority used when verifying server certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<SecretOrConfigMap>,
    /// Client certificate presented for client authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<SecretOrConfigMap>,
    /// Secret key holding the client key file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_secret: Option<SecretKeySelector>,
    /// Used to verify the hostname of the targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// Disable target certificate validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_skip_verify: Option<bool>,
}

/// Data that may live either in a secret or in a config map
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretOrConfigMap {
    /// Secret containing the data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretKeySelector>,
    /// Config map containing the data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapKeySelector>,
}

/// Selects a key of a secret in the object's namespace
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Key of the secret to select from, must be a valid secret key
    pub key: String,
    /// Name of the referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the secret or its key must be defined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// Selects a key from a config map in the object's namespace
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapKeySelector {
    /// The key to select
    pub key: String,
    /// Name of the referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the config map or its key must be defined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

#[cfg(test)]
mod tests {
    use kube::{CustomResourceExt, Resource};

    use super::*;

    #[test]
    fn resource_identity_matches_prometheus_operator() {
        assert_eq!(ScrapeConfig::group(&()), GROUP);
        assert_eq!(ScrapeConfig::version(&()), VERSION);
        assert_eq!(ScrapeConfig::kind(&()), KIND);
        assert_eq!(ScrapeConfig::plural(&()), PLURAL);
        assert_eq!(ScrapeConfig::api_version(&()), API_VERSION);
    }

    #[test]
    fn crd_is_namespaced() {
        let crd = ScrapeConfig::crd();
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.names.kind, KIND);
    }

    #[test]
    fn spec_uses_prometheus_operator_field_names() {
        let spec = ScrapeConfigSpec {
            dns_sd_configs: Some(vec![DnsSdConfig {
                names: vec!["_metrics._tcp.example.org".into()],
                type_: Some("SRV".into()),
                ..Default::default()
            }]),
            http_sd_configs: Some(vec![HttpSdConfig {
                url: "https://sd.example.org".into(),
                enable_http2: Some(true),
                ..Default::default()
            }]),
            scheme: Some("HTTPS".into()),
            ..Default::default()
        };

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["dnsSDConfigs"][0]["type"], "SRV");
        assert_eq!(value["httpSDConfigs"][0]["enableHTTP2"], true);
        assert_eq!(value["scheme"], "HTTPS");
        assert!(value.get("staticConfigs").is_none());
    }

    #[test]
    fn roles_outside_this_version_are_kept() {
        let config: KubernetesSdConfig =
            serde_json::from_value(serde_json::json!({"role": "Pod"})).unwrap();
        assert_eq!(config.role, "Pod");
    }
}
