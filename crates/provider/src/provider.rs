//! Provider configuration and the registry of data sources

use std::{any::Any, path::PathBuf};

use kube::{
    Client, Config,
    config::{KubeConfigOptions, Kubeconfig},
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{
    Result,
    schema::Schema,
    scrape_config::{ScrapeConfigDataSource, ScrapeConfigManifest},
};

/// User supplied provider settings
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Path of a kubeconfig file, the standard lookup (`KUBECONFIG`, in-cluster) is used when unset
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
    /// Context to use from the kubeconfig, its current context when unset
    #[serde(default)]
    pub context: Option<String>,
}

impl ProviderConfig {
    fn kube_config_options(&self) -> KubeConfigOptions {
        KubeConfigOptions {
            context: self.context.clone(),
            ..KubeConfigOptions::default()
        }
    }

    /// Builds the Kubernetes client described by this configuration
    #[instrument(skip(self), fields(kubeconfig = ?self.kubeconfig, context = self.context.as_deref()))]
    pub async fn client(&self) -> Result<Client> {
        let client = match (&self.kubeconfig, &self.context) {
            (Some(path), _) => {
                let kubeconfig = Kubeconfig::read_from(path)?;
                let config =
                    Config::from_custom_kubeconfig(kubeconfig, &self.kube_config_options()).await?;
                Client::try_from(config)?
            }
            (None, Some(_)) => {
                let config = Config::from_kubeconfig(&self.kube_config_options()).await?;
                Client::try_from(config)?
            }
            (None, None) => Client::try_default().await?,
        };

        info!("kubernetes client initialized successfully");
        Ok(client)
    }
}

/// Holds the client shared by every data source of the provider
#[derive(Clone, Default)]
pub struct Provider {
    client: Option<Client>,
}

impl Provider {
    /// Prefix of every data source type name
    pub const TYPE_NAME: &'static str = "k8s";

    /// Creates an unconfigured provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider that uses `client`
    pub fn with_client(client: Client) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Creates the Kubernetes client from `config`
    pub async fn configure(&mut self, config: &ProviderConfig) -> Result<()> {
        self.client = Some(config.client().await?);
        Ok(())
    }

    /// Type names of all data sources
    pub fn data_source_names() -> Vec<String> {
        vec![
            ScrapeConfigDataSource::type_name(Self::TYPE_NAME),
            ScrapeConfigManifest::type_name(Self::TYPE_NAME),
        ]
    }

    /// Schema of the data source called `type_name`
    pub fn schema(type_name: &str) -> Option<Schema> {
        let suffix = type_name.strip_prefix(Self::TYPE_NAME)?;
        match suffix {
            ScrapeConfigDataSource::TYPE_NAME_SUFFIX => Some(ScrapeConfigDataSource::schema()),
            ScrapeConfigManifest::TYPE_NAME_SUFFIX => Some(ScrapeConfigManifest::schema()),
            _ => None,
        }
    }

    /// A `ScrapeConfig` data source, configured with the provider's client once there is one
    pub fn scrape_config_data_source(&self) -> Result<ScrapeConfigDataSource> {
        let mut data_source = ScrapeConfigDataSource::new();
        data_source.configure(
            self.client
                .as_ref()
                .map(|client| client as &(dyn Any + Send + Sync)),
        )?;
        Ok(data_source)
    }

    /// A `ScrapeConfig` manifest data source
    pub fn scrape_config_manifest(&self) -> ScrapeConfigManifest {
        ScrapeConfigManifest
    }
}
