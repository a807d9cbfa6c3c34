// Copyright 2026 ScrapeConfig Provider Maintainers
// SPDX-License-Identifier: Apache-2.0

//! Custom resource definitions of the Prometheus Operator `ScrapeConfig` kind

pub mod v1_alpha1;

pub use v1_alpha1::ScrapeConfig;
pub use v1_alpha1::ScrapeConfigSpec;
