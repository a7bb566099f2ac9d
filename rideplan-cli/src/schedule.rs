//! `schedule` command.

use std::io::Write;

use clap::Args;
use rideplan_core::{Planner, TimeOfDay};

use crate::CliError;

#[derive(Debug, Clone, Args)]
pub(crate) struct ScheduleArgs {
    /// Earliest departure.
    #[arg(long, value_name = "HH:MM")]
    pub(crate) min_start_at: TimeOfDay,
    /// Latest return; unbounded when omitted.
    #[arg(long, value_name = "HH:MM")]
    pub(crate) max_end_at: Option<TimeOfDay>,
}

pub(crate) fn run_schedule(
    args: ScheduleArgs,
    planner: &mut Planner,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    planner.set_schedule(args.min_start_at, args.max_end_at)?;
    match args.max_end_at {
        Some(end) => writeln!(writer, "Leaving from {}, back by {end}", args.min_start_at),
        None => writeln!(writer, "Leaving from {}, no return limit", args.min_start_at),
    }
    .map_err(CliError::WriteOutput)
}
