// Copyright 2026 ScrapeConfig Provider Maintainers
// SPDX-License-Identifier: Apache-2.0

//! Provider internals for the Prometheus Operator `ScrapeConfig` data sources

use crate::diagnostics::{Diagnostic, Diagnostics};

/// Generic Error for data source operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Kubernetes API errors, including objects that do not exist
    #[error("Kube Error: {0}")]
    KubeError(#[from] kube::Error),

    /// The kubeconfig could not be loaded
    #[error("Kubeconfig Error: {0}")]
    KubeconfigError(#[from] kube::config::KubeconfigError),

    /// The provider handed something other than a Kubernetes client to a data source
    #[error("Unexpected provider data, expected {expected}")]
    UnexpectedProviderData {
        /// Type name the data source expected
        expected: &'static str,
    },

    /// A data source was read before the provider configured it
    #[error("Data source has no Kubernetes client, the provider is not configured")]
    NotConfigured,

    /// `serde_json` errors while converting Kubernetes objects
    #[error("Serialization Error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The configuration does not fit the typed model
    #[error("State Decode Error: {0}")]
    StateDecodeError(#[source] serde_json::Error),

    /// `serde_yaml` errors while rendering manifests
    #[error("YAML Error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The configuration failed schema validation
    #[error("Invalid configuration:\n{0}")]
    InvalidConfiguration(Diagnostics),
}

impl Error {
    /// Converts the error into the diagnostic reported to the host
    pub fn diagnostic(&self) -> Diagnostic {
        let summary = match self {
            Error::KubeError(_) => "Unable to GET resource",
            Error::KubeconfigError(_) => "Unable to create Kubernetes client",
            Error::UnexpectedProviderData { .. } => "Unexpected Data Source Configure Type",
            Error::NotConfigured => "Unconfigured Data Source",
            Error::SerializationError(_) => "Unable to unmarshal resource",
            Error::StateDecodeError(_) => "Unable to decode configuration",
            Error::YamlError(_) => "Unable to marshal resource",
            Error::InvalidConfiguration(_) => "Invalid Configuration",
        };
        let detail = match self {
            Error::KubeError(e) => e.to_string(),
            Error::KubeconfigError(e) => e.to_string(),
            Error::SerializationError(e) | Error::StateDecodeError(e) => e.to_string(),
            Error::YamlError(e) => e.to_string(),
            Error::InvalidConfiguration(diagnostics) => diagnostics.to_string(),
            Error::UnexpectedProviderData { .. } | Error::NotConfigured => self.to_string(),
        };
        Diagnostic::error(summary, detail)
    }

    /// All diagnostics carried by the error
    pub fn into_diagnostics(self) -> Diagnostics {
        match self {
            Error::InvalidConfiguration(diagnostics) => diagnostics,
            other => other.diagnostic().into(),
        }
    }
}

/// Generic result type to be used by the data sources
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub mod diagnostics;
pub mod provider;
pub mod schema;
pub mod scrape_config;
pub mod state;
pub mod telemetry;
pub mod validation;

pub use crate::provider::{Provider, ProviderConfig};
pub use crate::scrape_config::{ScrapeConfigDataSource, ScrapeConfigManifest};
