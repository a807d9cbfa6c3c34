//! `monitoring.coreos.com/v1alpha1` `ScrapeConfig` data sources

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    schema::Attribute,
    validation::{self, Validator},
};

pub mod data_source;
pub mod manifest;

pub use data_source::{ScrapeConfigDataSource, ScrapeConfigDataSourceData};
pub use manifest::{ScrapeConfigManifest, ScrapeConfigManifestData};
pub use scrapeconfig_crd::v1_alpha1::{API_VERSION, KIND};

const SCHEMES: &[&str] = &["HTTP", "HTTPS"];
const KUBERNETES_ROLES: &[&str] = &["Node"];
const DNS_RECORD_TYPES: &[&str] = &["SRV", "A", "AAAA", "MX"];
const RELABEL_ACTIONS: &[&str] = &[
    "replace", "Replace", "keep", "Keep", "drop", "Drop", "hashmod", "HashMod", "labelmap",
    "LabelMap", "labeldrop", "LabelDrop", "labelkeep", "LabelKeep", "lowercase", "Lowercase",
    "uppercase", "Uppercase", "keepequal", "KeepEqual", "dropequal", "DropEqual",
];

/// Object metadata carried by both data sources
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Unique name within the namespace
    pub name: String,
    /// Namespace of the object
    pub namespace: String,
    /// Labels of the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Annotations of the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// Synthetic identifier of an object, `<name>/<namespace>`
pub fn object_id(name: &str, namespace: &str) -> String {
    format!("{name}/{namespace}")
}

fn id_attribute() -> Attribute {
    Attribute::string("id")
        .state_only()
        .computed()
        .describe("Contains the value `metadata.name/metadata.namespace`.")
}

fn type_attributes() -> [Attribute; 2] {
    [
        Attribute::string("api_version")
            .computed()
            .describe("The API group of the requested resource."),
        Attribute::string("kind")
            .computed()
            .describe("The type of the requested resource."),
    ]
}

fn identity_attribute(name: &'static str, description: &'static str) -> Attribute {
    let (pattern, max) = if name == "namespace" {
        (&validation::KUBERNETES_NAMESPACE, validation::DNS_LABEL_MAX_LENGTH)
    } else {
        (&validation::KUBERNETES_NAME, validation::DNS_SUBDOMAIN_MAX_LENGTH)
    };
    Attribute::string(name)
        .required()
        .describe(description)
        .validate(Validator::LengthAtLeast(1))
        .validate(Validator::LengthAtMost(max))
        .validate(Validator::Matches(pattern))
}

fn duration(name: &'static str, description: &'static str) -> Attribute {
    Attribute::string(name)
        .describe(description)
        .validate(Validator::Matches(&validation::DURATION))
}

fn secret_key_selector(name: &'static str, description: &'static str) -> Attribute {
    Attribute::object(
        name,
        vec![
            Attribute::string("key")
                .required()
                .describe("The key of the secret to select from. Must be a valid secret key."),
            Attribute::string("name").describe("Name of the referent."),
            Attribute::bool("optional")
                .describe("Specify whether the Secret or its key must be defined."),
        ],
    )
    .describe(description)
}

fn config_map_key_selector(name: &'static str, description: &'static str) -> Attribute {
    Attribute::object(
        name,
        vec![
            Attribute::string("key").required().describe("The key to select."),
            Attribute::string("name").describe("Name of the referent."),
            Attribute::bool("optional")
                .describe("Specify whether the ConfigMap or its key must be defined."),
        ],
    )
    .describe(description)
}

fn secret_or_config_map(name: &'static str, description: &'static str) -> Attribute {
    Attribute::object(
        name,
        vec![
            secret_key_selector("secret", "Secret containing data to use for the targets."),
            config_map_key_selector("config_map", "ConfigMap containing data to use for the targets."),
        ],
    )
    .describe(description)
}

fn basic_auth() -> Attribute {
    Attribute::object(
        "basic_auth",
        vec![
            secret_key_selector(
                "username",
                "The secret in the service monitor namespace that contains the username for authentication.",
            ),
            secret_key_selector(
                "password",
                "The secret in the service monitor namespace that contains the password for authentication.",
            ),
        ],
    )
    .describe("BasicAuth information to use on every scrape request.")
}

fn authorization() -> Attribute {
    Attribute::object(
        "authorization",
        vec![
            Attribute::string("type")
                .describe("Set the authentication type. Defaults to Bearer, Basic will cause an error."),
            secret_key_selector(
                "credentials",
                "Selects a key of a Secret in the namespace that contains the credentials for authentication.",
            ),
        ],
    )
    .describe("Authorization header to use on every scrape request.")
}

fn tls_config() -> Attribute {
    Attribute::object(
        "tls_config",
        vec![
            secret_or_config_map("ca", "Certificate authority used when verifying server certificates."),
            secret_or_config_map("cert", "Client certificate to present when doing client-authentication."),
            secret_key_selector("key_secret", "Secret containing the client key file for the targets."),
            Attribute::string("server_name").describe("Used to verify the hostname for the targets."),
            Attribute::bool("insecure_skip_verify").describe("Disable target certificate validation."),
        ],
    )
    .describe("TLS configuration to use on every scrape request")
}

fn oauth2() -> Attribute {
    Attribute::object(
        "oauth2",
        vec![
            secret_or_config_map("client_id", "The secret or configmap containing the OAuth2 client id")
                .required(),
            secret_key_selector("client_secret", "The secret containing the OAuth2 client secret")
                .required(),
            Attribute::string("token_url")
                .json("tokenUrl")
                .required()
                .describe("The URL to fetch the token from")
                .validate(Validator::LengthAtLeast(1)),
            Attribute::string_list("scopes").describe("OAuth2 scopes used for the token request"),
            Attribute::string_map("endpoint_params")
                .describe("Parameters to append to the token URL"),
        ],
    )
    .describe("Optional OAuth 2.0 configuration.")
}

fn proxy_attributes() -> [Attribute; 5] {
    [
        Attribute::string("proxy_url")
            .json("proxyUrl")
            .describe("Optional proxy URL."),
        Attribute::string("no_proxy")
            .describe("Comma-separated string that can contain IPs, CIDR notation, domain names that should be excluded from proxying."),
        Attribute::bool("proxy_from_environment")
            .describe("Use the proxy URL indicated by environment variables (HTTP_PROXY, https_proxy, HTTPs_PROXY, https_proxy, and no_proxy)"),
        Attribute::bool("follow_redirects")
            .describe("Configure whether HTTP requests follow HTTP 3xx redirects."),
        Attribute::bool("enable_http2")
            .json("enableHTTP2")
            .describe("Whether to enable HTTP2."),
    ]
}

fn relabel_configs(name: &'static str, description: &'static str) -> Attribute {
    Attribute::object_list(
        name,
        vec![
            Attribute::string_list("source_labels")
                .describe("The source labels select values from existing labels. Their content is concatenated using the configured separator and matched against the configured regular expression for the replace, keep, and drop actions.")
                .validate(Validator::EachMatches(&validation::PROMETHEUS_LABEL_NAME)),
            Attribute::string("separator")
                .describe("Separator placed between concatenated source label values. Default is ';'."),
            Attribute::string("target_label")
                .describe("Label to which the resulting value is written in a replace action. It is mandatory for replace actions. Regex capture groups are available."),
            Attribute::string("regex")
                .describe("Regular expression against which the extracted value is matched. Default is '(.*)'"),
            Attribute::int64("modulus")
                .describe("Modulus to take of the hash of the source label values."),
            Attribute::string("replacement")
                .describe("Replacement value against which a regex replace is performed if the regular expression matches. Regex capture groups are available. Default is '$1'"),
            Attribute::string("action")
                .describe("Action to perform based on regex matching. Default is 'replace'")
                .validate(Validator::OneOf(RELABEL_ACTIONS)),
        ],
    )
    .describe(description)
}

fn static_configs() -> Attribute {
    Attribute::object_list(
        "static_configs",
        vec![
            Attribute::string_list("targets").describe("List of targets for this static configuration."),
            Attribute::string_map("labels")
                .describe("Labels assigned to all metrics scraped from the targets."),
        ],
    )
    .describe("StaticConfigs defines a list of static targets with a common label set.")
}

fn file_sd_configs() -> Attribute {
    Attribute::object_list(
        "file_sd_configs",
        vec![
            Attribute::string_list("files")
                .required()
                .describe("List of files to be used for file discovery. Recommendation: use absolute paths. While relative paths work, the prometheus-operator project makes no guarantees about the working directory where the configuration file is stored. Files must be mounted using Prometheus.ConfigMaps or Prometheus.Secrets.")
                .validate(Validator::SizeAtLeast(1)),
            duration("refresh_interval", "RefreshInterval configures the refresh interval at which Prometheus will reload the content of the files."),
        ],
    )
    .json("fileSDConfigs")
    .describe("FileSDConfigs defines a list of file service discovery configurations.")
}

fn http_sd_configs() -> Attribute {
    let mut attributes = vec![
        Attribute::string("url")
            .required()
            .describe("URL from which the targets are fetched.")
            .validate(Validator::LengthAtLeast(1))
            .validate(Validator::Matches(&validation::HTTP_URL)),
        duration("refresh_interval", "RefreshInterval configures the refresh interval at which Prometheus will re-query the endpoint to update the target list."),
        basic_auth(),
        authorization(),
        tls_config(),
    ];
    attributes.extend(proxy_attributes());

    Attribute::object_list("http_sd_configs", attributes)
        .json("httpSDConfigs")
        .describe("HTTPSDConfigs defines a list of HTTP service discovery configurations.")
}

fn kubernetes_sd_configs() -> Attribute {
    Attribute::object_list(
        "kubernetes_sd_configs",
        vec![
            Attribute::string("role")
                .required()
                .describe("Role of the Kubernetes entities that should be discovered. Currently the only supported role is 'Node'.")
                .validate(Validator::OneOf(KUBERNETES_ROLES)),
        ],
    )
    .json("kubernetesSDConfigs")
    .describe("KubernetesSDConfigs defines a list of Kubernetes service discovery configurations.")
}

fn consul_sd_configs() -> Attribute {
    let mut attributes = vec![
        Attribute::string("server")
            .required()
            .describe("A valid string consisting of a hostname or IP followed by an optional port number.")
            .validate(Validator::LengthAtLeast(1)),
        secret_key_selector("token_ref", "Consul ACL TokenRef, if not provided it will use the ACL from the local Consul Agent."),
        Attribute::string("datacenter").describe("Consul Datacenter name, if not provided it will use the local Consul Agent Datacenter."),
        Attribute::string("namespace").describe("Namespaces are only supported in Consul Enterprise."),
        Attribute::string("partition").describe("Admin Partitions are only supported in Consul Enterprise."),
        Attribute::string("scheme")
            .describe("HTTP Scheme default 'http'")
            .validate(Validator::OneOf(SCHEMES)),
        Attribute::string_list("services").describe("A list of services for which targets are retrieved. If omitted, all services are scraped."),
        Attribute::string_list("tags").describe("An optional list of tags used to filter nodes for a given service. Services must contain all tags in the list."),
        Attribute::string("tag_separator").describe("The string by which Consul tags are joined into the tag label. If unset, Prometheus uses its default value."),
        Attribute::string_map("node_meta").describe("Node metadata key/value pairs to filter nodes for a given service."),
        Attribute::bool("allow_stale").describe("Allow stale Consul results (see https://www.consul.io/api/features/consistency.html). Will reduce load on Consul. If unset, Prometheus uses its default value."),
        duration("refresh_interval", "The time after which the provided names are refreshed. On large setup it might be a good idea to increase this value because the catalog will change all the time. If unset, Prometheus uses its default value."),
        basic_auth(),
        authorization(),
        oauth2(),
    ];
    attributes.extend(proxy_attributes());
    attributes.push(tls_config());

    Attribute::object_list("consul_sd_configs", attributes)
        .json("consulSDConfigs")
        .describe("ConsulSDConfigs defines a list of Consul service discovery configurations.")
}

fn dns_sd_configs() -> Attribute {
    Attribute::object_list(
        "dns_sd_configs",
        vec![
            Attribute::string_list("names")
                .required()
                .describe("A list of DNS domain names to be queried.")
                .validate(Validator::SizeAtLeast(1)),
            duration("refresh_interval", "RefreshInterval configures the time after which the provided names are refreshed. If not set, Prometheus uses its default value."),
            Attribute::string("type")
                .describe("The type of DNS query to perform. One of SRV, A, AAAA or MX. If not set, Prometheus uses its default value.")
                .validate(Validator::OneOf(DNS_RECORD_TYPES)),
            Attribute::int64("port")
                .describe("The port number used if the query type is not SRV Ignored for SRV records"),
        ],
    )
    .json("dnsSDConfigs")
    .describe("DNSSDConfigs defines a list of DNS service discovery configurations.")
}

/// The `spec` subtree, as authored by users
pub fn spec_attribute() -> Attribute {
    Attribute::object(
        "spec",
        vec![
            static_configs(),
            file_sd_configs(),
            http_sd_configs(),
            kubernetes_sd_configs(),
            consul_sd_configs(),
            dns_sd_configs(),
            relabel_configs("relabelings", "RelabelConfigs defines how to rewrite the target's labels before scraping. Prometheus Operator automatically adds relabelings for a few standard Kubernetes fields. The original scrape job's name is available via the '__tmp_prometheus_job_name' label."),
            Attribute::string("metrics_path").describe("MetricsPath HTTP path to scrape for metrics. If empty, Prometheus uses the default value (e.g. /metrics)."),
            duration("scrape_interval", "ScrapeInterval is the interval between consecutive scrapes."),
            duration("scrape_timeout", "ScrapeTimeout is the number of seconds to wait until a scrape request times out."),
            Attribute::bool("honor_timestamps").describe("HonorTimestamps controls whether Prometheus respects the timestamps present in scraped data."),
            Attribute::bool("honor_labels").describe("HonorLabels chooses the metric's labels on collisions with target labels."),
            Attribute::string_list_map("params").describe("Optional HTTP URL parameters"),
            Attribute::string("scheme")
                .describe("Configures the protocol scheme used for requests. If empty, Prometheus uses HTTP by default.")
                .validate(Validator::OneOf(SCHEMES)),
            basic_auth(),
            authorization(),
            tls_config(),
            Attribute::int64("sample_limit").describe("SampleLimit defines per-scrape limit on number of scraped samples that will be accepted."),
            Attribute::int64("target_limit").describe("TargetLimit defines a limit on the number of scraped targets that will be accepted."),
            Attribute::int64("label_limit").describe("Per-scrape limit on number of labels that will be accepted for a sample. Only valid in Prometheus versions 2.27.0 and newer."),
            Attribute::int64("label_name_length_limit").describe("Per-scrape limit on length of labels name that will be accepted for a sample. Only valid in Prometheus versions 2.27.0 and newer."),
            Attribute::int64("label_value_length_limit").describe("Per-scrape limit on length of labels value that will be accepted for a sample. Only valid in Prometheus versions 2.27.0 and newer."),
            Attribute::int64("keep_dropped_targets").describe("Per-scrape limit on the number of targets dropped by relabeling that will be kept in memory. 0 means no limit. It requires Prometheus >= v2.47.0."),
            relabel_configs("metric_relabelings", "MetricRelabelConfigs to apply to samples before ingestion."),
        ],
    )
    .describe("ScrapeConfigSpec is a specification of the desired configuration for a scrape configuration.")
}
