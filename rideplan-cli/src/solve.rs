//! Solve command implementation for the rideplan CLI.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use rideplan_core::{
    Itinerary, Planner, RankedItineraries, SolveOptions, Solver, SolverLimits, render,
};
use rideplan_data::CommandSolver;
use serde::{Deserialize, Serialize};

use crate::refresh::never_site_policy;
use crate::{ARG_SOLVER, CliError, ENV_SOLVE_SOLVER};

/// CLI arguments for the `solve` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "solve",
    long_about = "Build the solver request from the current plan, run the \
                 solver program on it and print the itineraries it proposes. \
                 Settings can come from CLI flags, configuration files, or \
                 environment variables.",
    about = "Compute itineraries"
)]
#[ortho_config(prefix = "RIDEPLAN")]
pub(crate) struct SolveArgs {
    /// Solver program reading the world on stdin.
    #[arg(long = ARG_SOLVER, value_name = "path")]
    #[serde(default)]
    pub(crate) solver: Option<Utf8PathBuf>,
    /// Bound on partial itineraries extended per step.
    #[arg(long, value_name = "n")]
    #[serde(default)]
    pub(crate) max_tested_extensions: Option<u32>,
    /// Bound on partial itineraries kept in the search bag.
    #[arg(long, value_name = "n")]
    #[serde(default)]
    pub(crate) max_bag_items: Option<u32>,
    /// Number of itineraries to return.
    #[arg(long, value_name = "n")]
    #[serde(default)]
    pub(crate) max_results: Option<u32>,
    /// Hand NEVER sites to the solver as well.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "bool")]
    #[serde(default)]
    pub(crate) include_never: Option<bool>,
    /// Also print dominated itineraries.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "bool")]
    #[serde(default)]
    pub(crate) show_dominated: Option<bool>,
    /// Print the solver request instead of solving.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "bool")]
    #[serde(default)]
    pub(crate) print_world: Option<bool>,
}

impl SolveArgs {
    pub(crate) fn into_config(self) -> Result<SolveConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SolveConfig::try_from(merged)
    }
}

/// What `solve` does once configuration is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SolveAction {
    /// Print the world JSON.
    PrintWorld,
    /// Run this solver program.
    Run {
        solver: Utf8PathBuf,
        show_dominated: bool,
    },
}

/// Resolved `solve` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SolveConfig {
    pub(crate) options: SolveOptions,
    pub(crate) action: SolveAction,
}

impl TryFrom<SolveArgs> for SolveConfig {
    type Error = CliError;

    fn try_from(args: SolveArgs) -> Result<Self, Self::Error> {
        let defaults = SolverLimits::default();
        let limits = SolverLimits {
            max_tested_extensions: args
                .max_tested_extensions
                .unwrap_or(defaults.max_tested_extensions),
            max_bag_items: args.max_bag_items.unwrap_or(defaults.max_bag_items),
            max_results: args.max_results.unwrap_or(defaults.max_results),
        };
        let options = SolveOptions {
            limits,
            never_sites: never_site_policy(args.include_never),
        };

        let action = if args.print_world.unwrap_or(false) {
            SolveAction::PrintWorld
        } else {
            let solver = args.solver.ok_or(CliError::MissingArgument {
                field: ARG_SOLVER,
                env: ENV_SOLVE_SOLVER,
            })?;
            SolveAction::Run {
                solver,
                show_dominated: args.show_dominated.unwrap_or(false),
            }
        };
        Ok(Self { options, action })
    }
}

/// Builds a solver instance for the current solve invocation.
pub(crate) trait SolverBuilder {
    fn build(&self, program: &Utf8Path) -> Result<Box<dyn Solver>, CliError>;
}

pub(crate) struct DefaultSolverBuilder;

impl SolverBuilder for DefaultSolverBuilder {
    fn build(&self, program: &Utf8Path) -> Result<Box<dyn Solver>, CliError> {
        Ok(Box::new(CommandSolver::new(program.as_str())))
    }
}

pub(crate) async fn run_solve_with(
    args: SolveArgs,
    planner: &Planner,
    builder: &dyn SolverBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    match config.action {
        SolveAction::PrintWorld => {
            let world = planner.build_world(&config.options)?;
            let payload =
                serde_json::to_string_pretty(&world).map_err(CliError::SerializeWorld)?;
            writeln!(writer, "{payload}").map_err(CliError::WriteOutput)
        }
        SolveAction::Run {
            solver,
            show_dominated,
        } => {
            let solver = builder.build(&solver)?;
            let mut ranked = planner.solve(solver.as_ref(), &config.options).await?;
            if show_dominated {
                ranked.reveal_dominated();
            }
            info!(
                "{} itineraries, {} hidden",
                ranked.len(),
                ranked.hidden_count()
            );
            write_itineraries(writer, &ranked).map_err(CliError::WriteOutput)
        }
    }
}

fn write_itineraries(writer: &mut dyn Write, ranked: &RankedItineraries) -> std::io::Result<()> {
    if ranked.is_empty() {
        return writeln!(writer, "No itinerary found");
    }
    for (index, itinerary) in ranked.visible().enumerate() {
        if index > 0 {
            writeln!(writer)?;
        }
        write_itinerary(writer, index + 1, itinerary)?;
    }
    match ranked.hidden_count() {
        0 => Ok(()),
        hidden => writeln!(
            writer,
            "\n{hidden} dominated itineraries hidden (use --show-dominated)"
        ),
    }
}

fn write_itinerary(
    writer: &mut dyn Write,
    rank: usize,
    itinerary: &Itinerary,
) -> std::io::Result<()> {
    let marker = if itinerary.is_dominated {
        " [dominated]"
    } else {
        ""
    };
    writeln!(writer, "#{rank}: {}{marker}", itinerary.cost)?;
    for step in render(itinerary) {
        writeln!(writer, "  {step}")?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<SolveConfig, CliError> {
    let merged = SolveArgs::merge_from_layers(layers).map_err(CliError::from)?;
    SolveConfig::try_from(merged)
}
