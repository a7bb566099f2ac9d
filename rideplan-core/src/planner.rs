//! Application context tying the model, the cache and persistence together.
//!
//! A [`Planner`] owns the [`PlannerModel`] and saves it after every mutation.
//! Save failures are logged and never undo the mutation.

use log::{error, info};
use thiserror::Error;

use crate::Site;
use crate::clock::TimeOfDay;
use crate::itinerary::RankedItineraries;
use crate::persistence::{PersistenceGateway, PlannerModel};
use crate::ride_durations::{RefreshError, RefreshOutcome, RideDurationProvider, RideDurations};
use crate::site::{DutyError, SiteError};
use crate::solver::{SolveError, Solver};
use crate::store::SnapshotStore;
use crate::world::{NeverSitePolicy, SolverLimits, World, WorldError, WorldSettings, build_world};

/// Errors from [`Planner`] operations.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Another site already uses this name.
    #[error("a site named {name:?} already exists")]
    DuplicateSiteName {
        /// Conflicting name.
        name: String,
    },
    /// No site has this name.
    #[error("no site named {name:?}")]
    UnknownSite {
        /// Requested name.
        name: String,
    },
    /// The latest return precedes the earliest departure.
    #[error("schedule ends at {max_end_at} before it starts at {min_start_at}")]
    InvalidSchedule {
        /// Requested earliest departure.
        min_start_at: TimeOfDay,
        /// Requested latest return.
        max_end_at: TimeOfDay,
    },
    /// A site failed validation.
    #[error(transparent)]
    Site(#[from] SiteError),
    /// A duty failed validation.
    #[error(transparent)]
    Duty(#[from] DutyError),
    /// Refreshing ride durations failed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),
    /// The solver request could not be built.
    #[error(transparent)]
    World(#[from] WorldError),
    /// The solver failed.
    #[error(transparent)]
    Solve(#[from] SolveError),
}

/// Knobs for [`Planner::build_world`] and [`Planner::solve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveOptions {
    /// Solver search bounds.
    pub limits: SolverLimits,
    /// Treatment of NEVER sites.
    pub never_sites: NeverSitePolicy,
}

/// Planning session backed by a snapshot store.
///
/// # Examples
///
/// ```
/// use rideplan_core::{MemoryStore, Planner};
///
/// # fn main() -> Result<(), rideplan_core::PlanError> {
/// let mut planner = Planner::open(MemoryStore::default());
/// let name = planner.place_site(47.47, -0.55)?.name().to_owned();
/// assert_eq!(name, "Site 1");
/// planner.remove_site(&name)?;
/// assert!(planner.sites().is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Planner {
    model: PlannerModel,
    persistence: PersistenceGateway,
}

impl Planner {
    /// Load the model stored in `store`, or start empty.
    pub fn open(store: impl SnapshotStore + 'static) -> Self {
        let persistence = PersistenceGateway::new(store);
        let model = persistence.load_or_empty();
        info!(
            "opened plan with {} sites and {} cached rides",
            model.sites.len(),
            model.ride_durations.len()
        );
        Self { model, persistence }
    }

    /// Current model.
    #[must_use]
    pub const fn model(&self) -> &PlannerModel {
        &self.model
    }

    /// Sites in placement order.
    #[must_use]
    pub fn sites(&self) -> &[Site] {
        &self.model.sites
    }

    /// Site called `name`.
    #[must_use]
    pub fn site(&self, name: &str) -> Option<&Site> {
        self.model.sites.iter().find(|site| site.name() == name)
    }

    /// Ride cache.
    #[must_use]
    pub const fn ride_durations(&self) -> &RideDurations {
        &self.model.ride_durations
    }

    /// Place a new site with default constraints and a generated name.
    ///
    /// # Errors
    ///
    /// [`PlanError::Site`] for invalid coordinates.
    pub fn place_site(&mut self, latitude: f64, longitude: f64) -> Result<&Site, PlanError> {
        let site = Site::new(self.next_site_name(), latitude, longitude)?;
        self.add_site(site)
    }

    /// Append `site`.
    ///
    /// # Errors
    ///
    /// [`PlanError::DuplicateSiteName`] when the name is taken.
    pub fn add_site(&mut self, site: Site) -> Result<&Site, PlanError> {
        if self.site(site.name()).is_some() {
            return Err(PlanError::DuplicateSiteName {
                name: site.name().to_owned(),
            });
        }
        info!("adding site {}", site.name());
        let index = self.model.sites.len();
        self.model.sites.push(site);
        self.persist();
        Ok(&self.model.sites[index])
    }

    /// Replace the site called `name` with `site`, which may be renamed.
    ///
    /// # Errors
    ///
    /// [`PlanError::UnknownSite`] when `name` does not exist,
    /// [`PlanError::DuplicateSiteName`] when the new name belongs to another
    /// site.
    pub fn update_site(&mut self, name: &str, site: Site) -> Result<(), PlanError> {
        let index = self.index_of(name)?;
        let clash = self
            .model
            .sites
            .iter()
            .enumerate()
            .any(|(i, other)| i != index && other.name() == site.name());
        if clash {
            return Err(PlanError::DuplicateSiteName {
                name: site.name().to_owned(),
            });
        }
        self.model.sites[index] = site;
        self.persist();
        Ok(())
    }

    /// Remove the site called `name`.
    ///
    /// Its cached rides stay in place.
    ///
    /// # Errors
    ///
    /// [`PlanError::UnknownSite`] when `name` does not exist.
    pub fn remove_site(&mut self, name: &str) -> Result<Site, PlanError> {
        let index = self.index_of(name)?;
        let removed = self.model.sites.remove(index);
        info!("removed site {name}");
        self.persist();
        Ok(removed)
    }

    /// Set the departure and return bounds.
    ///
    /// # Errors
    ///
    /// [`PlanError::InvalidSchedule`] when `max_end_at < min_start_at`.
    pub fn set_schedule(
        &mut self,
        min_start_at: TimeOfDay,
        max_end_at: Option<TimeOfDay>,
    ) -> Result<(), PlanError> {
        if let Some(max_end_at) = max_end_at.filter(|end| *end < min_start_at) {
            return Err(PlanError::InvalidSchedule {
                min_start_at,
                max_end_at,
            });
        }
        self.model.min_start_at = min_start_at;
        self.model.max_end_at = max_end_at;
        self.persist();
        Ok(())
    }

    /// Fetch ride durations missing between the sites admitted by `policy`.
    ///
    /// The model is saved when anything was fetched.
    ///
    /// # Errors
    ///
    /// [`PlanError::Refresh`] when a refresh is already running or the
    /// provider fails.
    pub async fn refresh_ride_durations(
        &self,
        provider: &dyn RideDurationProvider,
        policy: NeverSitePolicy,
    ) -> Result<RefreshOutcome, PlanError> {
        let candidates = self.model.sites.iter().filter(|site| policy.admits(site));
        let outcome = self
            .model
            .ride_durations
            .refresh(candidates, provider)
            .await?;
        if let RefreshOutcome::Fetched { pairs, .. } = outcome {
            info!("fetched {pairs} ride durations");
            self.persist();
        }
        Ok(outcome)
    }

    /// Assemble the solver request for the current model.
    ///
    /// # Errors
    ///
    /// [`PlanError::World`] when the cache is empty for a multi-site model or
    /// the schedule is inverted.
    pub fn build_world(&self, options: &SolveOptions) -> Result<World, PlanError> {
        let settings = WorldSettings::new(self.model.min_start_at)
            .with_max_end_at(self.model.max_end_at)
            .with_limits(options.limits)
            .with_never_sites(options.never_sites);
        Ok(build_world(
            &self.model.sites,
            &self.model.ride_durations,
            &settings,
        )?)
    }

    /// Build the world, run `solver` on it and rank the answer.
    ///
    /// # Errors
    ///
    /// [`PlanError::World`] or [`PlanError::Solve`].
    pub async fn solve(
        &self,
        solver: &dyn Solver,
        options: &SolveOptions,
    ) -> Result<RankedItineraries, PlanError> {
        let world = self.build_world(options)?;
        info!("solving for {} sites", world.sites.len());
        let itineraries = solver.solve(&world).await?;
        info!("solver returned {} itineraries", itineraries.len());
        Ok(RankedItineraries::rank(itineraries))
    }

    fn index_of(&self, name: &str) -> Result<usize, PlanError> {
        self.model
            .sites
            .iter()
            .position(|site| site.name() == name)
            .ok_or_else(|| PlanError::UnknownSite {
                name: name.to_owned(),
            })
    }

    /// First free name of the form `Site <n>`, counting from the number of
    /// sites plus one.
    #[must_use]
    pub fn next_site_name(&self) -> String {
        (self.model.sites.len() + 1..)
            .map(|n| format!("Site {n}"))
            .find(|name| self.site(name).is_none())
            .unwrap_or_default()
    }

    fn persist(&self) {
        if let Err(err) = self.persistence.save(&self.model) {
            error!("failed to save model: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MODEL_KEY;
    use crate::site::VisitMode;
    use crate::store::{MemoryStore, StoreError};
    use crate::test_support::{StubRideDurationProvider, StubSolver};
    use rstest::{fixture, rstest};
    use std::sync::Arc;
    use std::time::Duration;

    const TEN_MINUTES: Duration = Duration::from_secs(600);

    struct BrokenStore;

    impl SnapshotStore for BrokenStore {
        fn read(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable {
                message: "disk full".to_owned(),
            })
        }
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("test runtime")
            .block_on(future)
    }

    #[fixture]
    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::default())
    }

    fn two_sites_in(store: &Arc<MemoryStore>) -> Planner {
        let mut planner = Planner::open(Arc::clone(store));
        planner.place_site(0.0, 0.0).expect("place A");
        planner.place_site(1.0, 1.0).expect("place B");
        planner
    }

    #[fixture]
    fn planner(store: Arc<MemoryStore>) -> Planner {
        two_sites_in(&store)
    }

    #[rstest]
    fn generated_names_skip_taken_ones(mut planner: Planner) {
        planner.remove_site("Site 1").expect("remove");
        let name = planner.place_site(2.0, 2.0).expect("place").name().to_owned();
        assert_eq!(name, "Site 3");

        let name = planner.place_site(3.0, 3.0).expect("place").name().to_owned();
        assert_eq!(name, "Site 4");
    }

    #[rstest]
    fn rejects_duplicate_names(mut planner: Planner) {
        let twin = Site::new("Site 1", 5.0, 5.0).expect("valid site");
        let err = planner.add_site(twin).expect_err("name taken");
        assert!(matches!(err, PlanError::DuplicateSiteName { .. }));
    }

    #[rstest]
    fn update_allows_keeping_the_name_but_not_stealing_one(mut planner: Planner) {
        let edited = planner
            .site("Site 1")
            .cloned()
            .expect("site exists")
            .with_visit(VisitMode::Maybe);
        planner.update_site("Site 1", edited).expect("same name");
        assert_eq!(
            planner.site("Site 1").map(Site::visit),
            Some(VisitMode::Maybe)
        );

        let stolen = Site::new("Site 2", 0.0, 0.0).expect("valid site");
        assert!(matches!(
            planner.update_site("Site 1", stolen),
            Err(PlanError::DuplicateSiteName { .. })
        ));
    }

    #[rstest]
    fn unknown_sites_are_reported(mut planner: Planner) {
        assert!(matches!(
            planner.remove_site("Nowhere"),
            Err(PlanError::UnknownSite { .. })
        ));
    }

    #[rstest]
    fn rejects_inverted_schedule(mut planner: Planner) {
        let err = planner
            .set_schedule(TimeOfDay::from_hms(10, 0, 0), Some(TimeOfDay::from_hms(9, 0, 0)))
            .expect_err("inverted schedule");
        assert!(matches!(err, PlanError::InvalidSchedule { .. }));
    }

    #[rstest]
    fn mutations_are_saved(store: Arc<MemoryStore>) {
        let mut planner = Planner::open(Arc::clone(&store));
        planner.place_site(0.0, 0.0).expect("place");
        planner
            .set_schedule(TimeOfDay::from_hms(8, 0, 0), None)
            .expect("schedule");

        let reopened = Planner::open(store);
        assert_eq!(reopened.sites().len(), 1);
        assert_eq!(reopened.model().min_start_at, TimeOfDay::from_hms(8, 0, 0));
    }

    #[rstest]
    fn failed_saves_keep_the_mutation() {
        let mut planner = Planner::open(BrokenStore);
        planner.place_site(0.0, 0.0).expect("mutation succeeds");
        assert_eq!(planner.sites().len(), 1);
    }

    #[rstest]
    fn refresh_saves_fetched_rides(store: Arc<MemoryStore>) {
        let planner = two_sites_in(&store);
        let provider = StubRideDurationProvider::with_duration(TEN_MINUTES);
        let outcome = block_on(planner.refresh_ride_durations(&provider, NeverSitePolicy::Exclude))
            .expect("refresh");
        assert!(matches!(outcome, RefreshOutcome::Fetched { .. }));

        let reopened = Planner::open(store);
        assert_eq!(reopened.ride_durations().len(), planner.ride_durations().len());
    }

    #[rstest]
    fn refresh_skips_never_sites_unless_asked(mut planner: Planner) {
        let never = Site::new("Closed", 2.0, 2.0)
            .expect("valid site")
            .with_visit(VisitMode::Never);
        planner.add_site(never).expect("add");
        let provider = StubRideDurationProvider::with_duration(TEN_MINUTES);

        block_on(planner.refresh_ride_durations(&provider, NeverSitePolicy::Exclude))
            .expect("refresh");
        assert_eq!(provider.calls()[0].0.len(), 2);

        block_on(planner.refresh_ride_durations(&provider, NeverSitePolicy::PassThrough))
            .expect("refresh");
        assert_eq!(provider.calls().len(), 2);
    }

    #[rstest]
    fn solve_requires_a_refresh(planner: Planner) {
        let solver = StubSolver::with_itineraries(Vec::new());
        let err = block_on(planner.solve(&solver, &SolveOptions::default()))
            .expect_err("cache is empty");
        assert!(matches!(
            err,
            PlanError::World(WorldError::ModelIncomplete { sites: 2 })
        ));
        assert!(solver.worlds().is_empty());
    }

    #[rstest]
    fn solve_forwards_the_world(planner: Planner) {
        let provider = StubRideDurationProvider::with_duration(TEN_MINUTES);
        block_on(planner.refresh_ride_durations(&provider, NeverSitePolicy::Exclude))
            .expect("refresh");
        let solver = StubSolver::with_itineraries(Vec::new());

        let ranked = block_on(planner.solve(&solver, &SolveOptions::default())).expect("solve");

        assert!(ranked.is_empty());
        let worlds = solver.worlds();
        assert_eq!(worlds.len(), 1);
        assert_eq!(worlds[0].sites[0].ride_durations["Site 2"], TEN_MINUTES);
    }

    #[rstest]
    fn stored_under_model_key(store: Arc<MemoryStore>) {
        drop(two_sites_in(&store));
        assert!(store.read(MODEL_KEY).expect("read").is_some());
    }
}
