//! `refresh` command: fetch missing ride durations.

use std::io::Write;
use std::time::Duration;

use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use rideplan_core::{NeverSitePolicy, Planner, RefreshOutcome, RideDurationProvider};
use rideplan_data::routing::{HttpRideDurationProvider, HttpRideDurationProviderConfig};
use serde::{Deserialize, Serialize};

use crate::{ARG_PROVIDER_URL, CliError};

/// CLI arguments for the `refresh` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "refresh",
    long_about = "Request the ride durations missing between the current \
                 sites in one round trip. Provider settings can come from CLI \
                 flags, configuration files, or environment variables.",
    about = "Fetch missing ride durations"
)]
#[ortho_config(prefix = "RIDEPLAN")]
pub(crate) struct RefreshArgs {
    /// Ride duration service root (e.g. "http://localhost:8080").
    #[arg(long = ARG_PROVIDER_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) provider_url: Option<String>,
    /// Endpoint path below the service root.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) provider_path: Option<String>,
    /// Request timeout in seconds.
    #[arg(long, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Also fetch rides for NEVER sites.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "bool")]
    #[serde(default)]
    pub(crate) include_never: Option<bool>,
}

impl RefreshArgs {
    pub(crate) fn into_config(self) -> Result<RefreshConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        Ok(RefreshConfig::from(merged))
    }
}

/// Resolved `refresh` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct RefreshConfig {
    pub(crate) provider: HttpRideDurationProviderConfig,
    pub(crate) never_sites: NeverSitePolicy,
}

impl From<RefreshArgs> for RefreshConfig {
    fn from(args: RefreshArgs) -> Self {
        let mut provider = HttpRideDurationProviderConfig::default();
        if let Some(base_url) = args.provider_url {
            provider.base_url = base_url;
        }
        if let Some(path) = args.provider_path {
            provider = provider.with_path(path);
        }
        if let Some(secs) = args.timeout_secs {
            provider = provider.with_timeout(Duration::from_secs(secs));
        }
        Self {
            provider,
            never_sites: never_site_policy(args.include_never),
        }
    }
}

pub(crate) fn never_site_policy(include_never: Option<bool>) -> NeverSitePolicy {
    if include_never.unwrap_or(false) {
        NeverSitePolicy::PassThrough
    } else {
        NeverSitePolicy::Exclude
    }
}

/// Builds the provider for the current refresh invocation.
pub(crate) trait ProviderBuilder {
    fn build(
        &self,
        config: &HttpRideDurationProviderConfig,
    ) -> Result<Box<dyn RideDurationProvider>, CliError>;
}

pub(crate) struct DefaultProviderBuilder;

impl ProviderBuilder for DefaultProviderBuilder {
    fn build(
        &self,
        config: &HttpRideDurationProviderConfig,
    ) -> Result<Box<dyn RideDurationProvider>, CliError> {
        let provider = HttpRideDurationProvider::with_config(config.clone()).map_err(|source| {
            CliError::BuildProvider {
                base_url: config.base_url.clone(),
                source,
            }
        })?;
        Ok(Box::new(provider))
    }
}

pub(crate) async fn run_refresh_with(
    args: RefreshArgs,
    planner: &Planner,
    builder: &dyn ProviderBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let provider = builder.build(&config.provider)?;
    let outcome = planner
        .refresh_ride_durations(provider.as_ref(), config.never_sites)
        .await?;
    match outcome {
        RefreshOutcome::UpToDate => writeln!(writer, "Ride durations are up to date"),
        RefreshOutcome::Fetched { pairs, unknown } => {
            writeln!(writer, "Fetched {pairs} ride durations ({unknown} unknown)")
        }
    }
    .map_err(CliError::WriteOutput)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<RefreshConfig, CliError> {
    let merged = RefreshArgs::merge_from_layers(layers).map_err(CliError::from)?;
    Ok(RefreshConfig::from(merged))
}
