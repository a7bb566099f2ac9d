//! `site` subcommands.

use std::io::Write;

use clap::{Args, Subcommand};
use rideplan_core::{Duty, PlanError, Planner, Site, VisitMode};

use crate::CliError;

#[derive(Debug, Subcommand)]
pub(crate) enum SiteCommand {
    /// Place a new site.
    Add(AddSiteArgs),
    /// Change an existing site.
    Edit(EditSiteArgs),
    /// Delete a site.
    Remove {
        /// Site to delete.
        name: String,
    },
    /// Show every site.
    List,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct AddSiteArgs {
    /// Latitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) latitude: f64,
    /// Longitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) longitude: f64,
    /// Name; defaults to the next free "Site <n>".
    #[arg(long)]
    pub(crate) name: Option<String>,
    /// Minutes spent at the site.
    #[arg(long, value_name = "minutes")]
    pub(crate) service_time: Option<u32>,
    /// ALWAYS, MAYBE or NEVER.
    #[arg(long)]
    pub(crate) visit: Option<VisitMode>,
    /// The day may start here.
    #[arg(long)]
    pub(crate) can_start_here: bool,
    /// Opening window, e.g. 09:00-12:00. Repeatable.
    #[arg(long = "duty", value_name = "HH:MM-HH:MM")]
    pub(crate) duties: Vec<Duty>,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct EditSiteArgs {
    /// Site to change.
    pub(crate) name: String,
    /// New name.
    #[arg(long)]
    pub(crate) rename: Option<String>,
    /// Minutes spent at the site.
    #[arg(long, value_name = "minutes")]
    pub(crate) service_time: Option<u32>,
    /// ALWAYS, MAYBE or NEVER.
    #[arg(long)]
    pub(crate) visit: Option<VisitMode>,
    /// Whether the day may start here.
    #[arg(long, value_name = "bool")]
    pub(crate) can_start_here: Option<bool>,
    /// Replacement opening windows. Repeatable.
    #[arg(long = "duty", value_name = "HH:MM-HH:MM")]
    pub(crate) duties: Vec<Duty>,
    /// Drop every opening window.
    #[arg(long, conflicts_with = "duties")]
    pub(crate) clear_duties: bool,
}

pub(crate) fn run_site(
    command: SiteCommand,
    planner: &mut Planner,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        SiteCommand::Add(args) => {
            let site = build_site(args, planner)?;
            let added = planner.add_site(site)?;
            writeln!(writer, "Added {}", describe(added)).map_err(CliError::WriteOutput)
        }
        SiteCommand::Edit(args) => {
            let name = args.name.clone();
            let site = edit_site(args, planner)?;
            let new_name = site.name().to_owned();
            planner.update_site(&name, site)?;
            writeln!(writer, "Updated {new_name}").map_err(CliError::WriteOutput)
        }
        SiteCommand::Remove { name } => {
            let removed = planner.remove_site(&name)?;
            writeln!(writer, "Removed {}", removed.name()).map_err(CliError::WriteOutput)
        }
        SiteCommand::List => list_sites(planner, writer),
    }
}

fn build_site(args: AddSiteArgs, planner: &Planner) -> Result<Site, CliError> {
    let name = args.name.unwrap_or_else(|| planner.next_site_name());
    let mut site = Site::new(name, args.latitude, args.longitude)?
        .with_can_start_here(args.can_start_here)
        .with_duties(args.duties);
    if let Some(minutes) = args.service_time {
        site = site.with_service_time_minutes(minutes)?;
    }
    if let Some(visit) = args.visit {
        site = site.with_visit(visit);
    }
    Ok(site)
}

fn edit_site(args: EditSiteArgs, planner: &Planner) -> Result<Site, CliError> {
    let mut site = planner
        .site(&args.name)
        .cloned()
        .ok_or_else(|| PlanError::UnknownSite {
            name: args.name.clone(),
        })?;
    if let Some(name) = args.rename {
        site = site.with_name(name)?;
    }
    if let Some(minutes) = args.service_time {
        site = site.with_service_time_minutes(minutes)?;
    }
    if let Some(visit) = args.visit {
        site = site.with_visit(visit);
    }
    if let Some(can_start_here) = args.can_start_here {
        site = site.with_can_start_here(can_start_here);
    }
    if args.clear_duties || !args.duties.is_empty() {
        site = site.with_duties(args.duties);
    }
    Ok(site)
}

fn list_sites(planner: &Planner, writer: &mut dyn Write) -> Result<(), CliError> {
    if planner.sites().is_empty() {
        return writeln!(writer, "No sites").map_err(CliError::WriteOutput);
    }
    for site in planner.sites() {
        writeln!(writer, "{}", describe(site)).map_err(CliError::WriteOutput)?;
    }
    Ok(())
}

/// One-line summary, e.g. `Bakery (47.47, -0.55) ALWAYS, 15m, start, duties 09:00-12:00`.
pub(crate) fn describe(site: &Site) -> String {
    let mut line = format!(
        "{} ({}, {}) {}, {}m",
        site.name(),
        site.latitude(),
        site.longitude(),
        site.visit(),
        site.service_time_minutes()
    );
    if site.can_start_here() {
        line.push_str(", start");
    }
    if !site.duties().is_empty() {
        let duties: Vec<String> = site.duties().iter().map(ToString::to_string).collect();
        line.push_str(", duties ");
        line.push_str(&duties.join(" "));
    }
    line
}
