//! Reads a live `ScrapeConfig` from the cluster

use std::any::Any;

use kube::{
    Api, Client,
    api::{ApiResource, DynamicObject},
};
use scrapeconfig_crd::{ScrapeConfig, ScrapeConfigSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Span, debug, field, info, instrument};

use super::{
    API_VERSION, KIND, Metadata, id_attribute, identity_attribute, object_id, spec_attribute,
    type_attributes,
};
use crate::{
    Error, Result,
    schema::{Attribute, Schema},
    state, telemetry,
    validation::validate_config,
};

/// Typed value of the data source
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeConfigDataSourceData {
    /// `<name>/<namespace>`
    #[serde(skip)]
    pub id: String,
    /// Always [`API_VERSION`] after a read
    #[serde(default)]
    pub api_version: Option<String>,
    /// Always [`KIND`] after a read
    #[serde(default)]
    pub kind: Option<String>,
    /// Metadata of the object
    pub metadata: Metadata,
    /// Spec as stored in the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<ScrapeConfigSpec>,
}

/// Data source exposing `ScrapeConfig` objects of a cluster
#[derive(Clone, Default)]
pub struct ScrapeConfigDataSource {
    client: Option<Client>,
}

impl ScrapeConfigDataSource {
    /// Suffix appended to the provider type name
    pub const TYPE_NAME_SUFFIX: &'static str = "_monitoring_coreos_com_scrape_config_v1alpha1";

    /// Creates an unconfigured data source
    pub fn new() -> Self {
        Self::default()
    }

    /// Full type name of the data source
    pub fn type_name(provider_type_name: &str) -> String {
        format!("{provider_type_name}{}", Self::TYPE_NAME_SUFFIX)
    }

    /// Attribute tree of the data source.
    ///
    /// Only `metadata.name` and `metadata.namespace` are configurable, everything else is read
    /// from the cluster.
    pub fn schema() -> Schema {
        let mut attributes = vec![id_attribute()];
        attributes.extend(type_attributes());
        attributes.push(
            Attribute::object(
                "metadata",
                vec![
                    identity_attribute("name", "The name of the resource."),
                    identity_attribute("namespace", "The namespace of the resource."),
                    Attribute::string_map("labels")
                        .computed()
                        .describe("Map of string keys and values that can be used to organize and categorize (scope and select) objects."),
                    Attribute::string_map("annotations")
                        .computed()
                        .describe("Unstructured key value map stored with a resource that may be set by external tools to store and retrieve arbitrary metadata."),
                ],
            )
            .required()
            .describe("Data that helps uniquely identify this object."),
        );
        attributes.push(spec_attribute().into_computed());

        Schema {
            description: "ScrapeConfig defines a namespaced Prometheus scrape_config to be aggregated across multiple namespaces into the Prometheus configuration.",
            attributes,
        }
    }

    /// Receives the data shared by the provider, which must be a [`kube::Client`].
    ///
    /// `None` means the provider is not configured yet and leaves the data source untouched.
    pub fn configure(&mut self, provider_data: Option<&(dyn Any + Send + Sync)>) -> Result<()> {
        let Some(provider_data) = provider_data else {
            return Ok(());
        };

        let client = provider_data
            .downcast_ref::<Client>()
            .ok_or(Error::UnexpectedProviderData {
                expected: std::any::type_name::<Client>(),
            })?;
        self.client = Some(client.clone());
        Ok(())
    }

    /// Whether a client has been received
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Validates `config`, reads the object it names and returns the new state
    pub async fn read(&self, config: &Value) -> Result<Value> {
        let schema = Self::schema();
        let diagnostics = validate_config(&schema, config);
        if !diagnostics.is_empty() {
            return Err(Error::InvalidConfiguration(diagnostics));
        }

        let model: ScrapeConfigDataSourceData =
            serde_json::from_value(state::decode(&schema, config)).map_err(Error::StateDecodeError)?;
        let data = self
            .fetch(&model.metadata.name, &model.metadata.namespace)
            .await?;

        let mut new_state = state::encode(&schema, &serde_json::to_value(&data)?);
        state::set(&mut new_state, "id", data.id);
        Ok(new_state)
    }

    /// Fetches the `ScrapeConfig` called `name` in `namespace`
    #[instrument(skip(self), fields(trace_id = field::Empty))]
    pub async fn fetch(&self, name: &str, namespace: &str) -> Result<ScrapeConfigDataSourceData> {
        let trace_id = telemetry::get_trace_id();
        if trace_id != opentelemetry::trace::TraceId::INVALID {
            Span::current().record("trace_id", field::display(&trace_id));
        }

        let client = self.client.clone().ok_or(Error::NotConfigured)?;
        let resource = ApiResource::erase::<ScrapeConfig>(&());
        let api: Api<DynamicObject> = Api::namespaced_with(client, namespace, &resource);

        let object = api.get(name).await?;
        debug!(
            resource_version = object.metadata.resource_version.as_deref(),
            "fetched resource"
        );

        let mut data: ScrapeConfigDataSourceData =
            serde_json::from_value(serde_json::to_value(&object)?)?;
        data.id = object_id(name, namespace);
        data.api_version = Some(API_VERSION.to_owned());
        data.kind = Some(KIND.to_owned());

        info!(id = %data.id, has_spec = data.spec.is_some(), "read resource");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use http::{Request, Response, StatusCode};
    use kube::client::Body;
    use serde_json::json;
    use tower_test::mock::{self, Handle};

    use super::*;
    use crate::{Provider, schema::Presence};

    type ApiServerHandle = Handle<Request<Body>, Response<Body>>;

    const OBJECT_PATH: &str = "/apis/monitoring.coreos.com/v1alpha1/namespaces/b/scrapeconfigs/a";

    fn configured() -> (ScrapeConfigDataSource, ApiServerHandle) {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let data_source = Provider::with_client(Client::new(mock_service, "default"))
            .scrape_config_data_source()
            .expect("client is accepted");
        (data_source, handle)
    }

    /// Answers the next request with `body`, asserting it is a GET of [`OBJECT_PATH`]
    fn serve_once(
        mut handle: ApiServerHandle,
        status: StatusCode,
        body: Value,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), http::Method::GET);
            assert_eq!(request.uri().path(), OBJECT_PATH);
            send.send_response(
                Response::builder()
                    .status(status)
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            );
        })
    }

    fn config() -> Value {
        json!({"metadata": {"name": "a", "namespace": "b"}})
    }

    #[tokio::test]
    async fn read_copies_remote_object_into_state() {
        let (data_source, handle) = configured();
        let server = serve_once(
            handle,
            StatusCode::OK,
            json!({"metadata": {"name": "a", "namespace": "b"}, "spec": {"scheme": "HTTPS"}}),
        );

        let state = data_source.read(&config()).await.expect("read succeeds");
        server.await.unwrap();

        assert_eq!(state["id"], "a/b");
        assert_eq!(state["api_version"], "monitoring.coreos.com/v1alpha1");
        assert_eq!(state["kind"], "ScrapeConfig");
        assert_eq!(state["metadata"]["name"], "a");
        assert_eq!(state["metadata"]["namespace"], "b");
        assert_eq!(state["metadata"]["labels"], Value::Null);
        assert_eq!(state["spec"]["scheme"], "HTTPS");
        assert_eq!(state["spec"]["dns_sd_configs"], Value::Null);
    }

    #[tokio::test]
    async fn fetch_overrides_type_information_and_keeps_metadata() {
        let (data_source, handle) = configured();
        let server = serve_once(
            handle,
            StatusCode::OK,
            json!({
                "apiVersion": "monitoring.coreos.com/v1beta9",
                "kind": "Something",
                "metadata": {
                    "name": "a",
                    "namespace": "b",
                    "uid": "6f1b5d1e",
                    "labels": {"team": "observability"},
                    "annotations": {"example.com/owner": "me"},
                },
                "spec": {
                    "scrapeInterval": "30s",
                    "dnsSDConfigs": [{"names": ["_metrics._tcp.example.org"], "type": "SRV"}],
                    "notYetKnown": true,
                },
                "status": {},
            }),
        );

        let data = data_source.fetch("a", "b").await.expect("fetch succeeds");
        server.await.unwrap();

        assert_eq!(data.id, "a/b");
        assert_eq!(data.api_version.as_deref(), Some(API_VERSION));
        assert_eq!(data.kind.as_deref(), Some(KIND));
        assert_eq!(
            data.metadata.labels.as_ref().and_then(|l| l.get("team")).map(String::as_str),
            Some("observability")
        );
        let spec = data.spec.expect("spec is present");
        assert_eq!(spec.scrape_interval.as_deref(), Some("30s"));
        assert_eq!(
            spec.dns_sd_configs.as_deref().map(<[_]>::len),
            Some(1)
        );
    }

    #[tokio::test]
    async fn read_keeps_values_the_manifest_would_reject() {
        let (data_source, handle) = configured();
        let server = serve_once(
            handle,
            StatusCode::OK,
            json!({
                "metadata": {"name": "a", "namespace": "b"},
                "spec": {
                    "kubernetesSDConfigs": [{"role": "Pod"}],
                    "dnsSDConfigs": [{"names": ["example.org"], "type": "NS"}],
                    "scheme": "https",
                },
            }),
        );

        let state = data_source.read(&config()).await.expect("read succeeds");
        server.await.unwrap();

        assert_eq!(state["spec"]["kubernetes_sd_configs"][0]["role"], "Pod");
        assert_eq!(state["spec"]["dns_sd_configs"][0]["type"], "NS");
        assert_eq!(state["spec"]["scheme"], "https");
    }

    #[tokio::test]
    async fn not_found_fails_without_state() {
        let (data_source, handle) = configured();
        let server = serve_once(
            handle,
            StatusCode::NOT_FOUND,
            json!({
                "kind": "Status",
                "apiVersion": "v1",
                "metadata": {},
                "status": "Failure",
                "message": "scrapeconfigs.monitoring.coreos.com \"a\" not found",
                "reason": "NotFound",
                "code": 404,
            }),
        );

        let err = data_source.read(&config()).await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, Error::KubeError(_)), "unexpected error {err:?}");
        assert!(err.to_string().contains("not found"));
        assert_eq!(err.diagnostic().summary, "Unable to GET resource");
    }

    #[tokio::test]
    async fn malformed_remote_object_is_a_serialization_error() {
        let (data_source, handle) = configured();
        let server = serve_once(
            handle,
            StatusCode::OK,
            json!({"metadata": {"name": "a", "namespace": "b"}, "spec": {"scrapeInterval": 30}}),
        );

        let err = data_source.read(&config()).await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, Error::SerializationError(_)), "unexpected error {err:?}");
    }

    #[tokio::test]
    async fn invalid_identity_is_rejected_before_any_request() {
        let (data_source, _handle) = configured();

        let err = data_source
            .read(&json!({"metadata": {"name": "", "namespace": "b"}}))
            .await
            .unwrap_err();
        let Error::InvalidConfiguration(diagnostics) = err else {
            panic!("expected an invalid configuration error");
        };
        let paths = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_ref().map(ToString::to_string))
            .collect::<Vec<_>>();
        assert_eq!(paths, vec!["metadata.name", "metadata.name"]);

        let err = data_source
            .read(&json!({"metadata": {"name": "a"}}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn read_without_client_is_a_misconfiguration() {
        let err = ScrapeConfigDataSource::new()
            .read(&config())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConfigured));
    }

    #[test]
    fn configure_rejects_unexpected_provider_data() {
        let mut data_source = ScrapeConfigDataSource::new();
        data_source.configure(None).expect("no data is accepted");
        assert!(!data_source.is_configured());

        let err = data_source
            .configure(Some(&String::from("not a client") as &(dyn Any + Send + Sync)))
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedProviderData { .. }));
        assert!(!data_source.is_configured());
    }

    #[test]
    fn spec_is_computed() {
        let schema = ScrapeConfigDataSource::schema();
        let role = schema
            .lookup("spec.kubernetes_sd_configs.role")
            .expect("role exists");
        assert_eq!(role.presence, Presence::Computed);
        assert!(role.validators.is_empty());
        assert_eq!(
            schema.lookup("metadata.name").map(|a| a.presence),
            Some(Presence::Required)
        );
        assert_eq!(
            schema.lookup("metadata.labels").map(|a| a.presence),
            Some(Presence::Computed)
        );
    }

    #[test]
    fn type_name_has_group_kind_and_version() {
        assert_eq!(
            ScrapeConfigDataSource::type_name("k8s"),
            "k8s_monitoring_coreos_com_scrape_config_v1alpha1"
        );
    }
}
