//! [`Solver`] backed by an external program.

use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, info};
use rideplan_core::{Itinerary, SolveError, Solver, World};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Runs a solver program once per request.
///
/// The world JSON is written to the program's stdin, which is then closed.
/// The program must print a JSON array of itineraries on stdout and exit
/// with status zero.
///
/// # Examples
///
/// ```no_run
/// use rideplan_data::solver::CommandSolver;
///
/// let solver = CommandSolver::new("rideplan-solver").with_arg("--fast");
/// assert_eq!(solver.program(), "rideplan-solver");
/// ```
#[derive(Debug, Clone)]
pub struct CommandSolver {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandSolver {
    /// Solver launching `program` without arguments.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Program that is launched.
    #[must_use]
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    fn program_label(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

#[async_trait]
impl Solver for CommandSolver {
    async fn solve(&self, world: &World) -> Result<Vec<Itinerary>, SolveError> {
        let payload = serde_json::to_vec(world).map_err(|err| SolveError::Encode {
            message: err.to_string(),
        })?;

        info!("starting solver {}", self.program_label());
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| SolveError::Spawn {
                program: self.program_label(),
                message: err.to_string(),
            })?;
        let mut stdin = child.stdin.take().ok_or_else(|| SolveError::Io {
            message: "solver stdin was not captured".to_owned(),
        })?;

        // Feed stdin while collecting output so a chatty solver cannot block.
        let feed = async move {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(io_error)?;

        if !output.status.success() {
            return Err(SolveError::Exited {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        match fed {
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                debug!("solver answered before reading all of stdin");
            }
            other => other.map_err(io_error)?,
        }
        debug!("solver wrote {} bytes", output.stdout.len());

        serde_json::from_slice(&output.stdout).map_err(|err| SolveError::Decode {
            message: err.to_string(),
        })
    }
}

fn io_error(err: std::io::Error) -> SolveError {
    SolveError::Io {
        message: err.to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use rideplan_core::{TimeOfDay, VisitMode, WorldSite};
    use rstest::{fixture, rstest};
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[fixture]
    fn world() -> World {
        World {
            sites: Vec::new(),
            min_start_at: TimeOfDay::from_hms(9, 0, 0),
            max_end_at: None,
            max_tested_extensions: 10,
            max_bag_items: 100,
            max_results: 10,
        }
    }

    fn world_site(name: &str) -> WorldSite {
        WorldSite {
            name: name.to_owned(),
            ride_durations: BTreeMap::new(),
            duties: Vec::new(),
            service_time: Duration::from_secs(900),
            visit: VisitMode::Always,
            can_start_here: false,
        }
    }

    fn shell(script: &str) -> CommandSolver {
        CommandSolver::new("sh").with_arg("-c").with_arg(script)
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("test runtime")
            .block_on(future)
    }

    #[rstest]
    fn decodes_empty_answer(world: World) {
        let paths = block_on(shell("cat >/dev/null; echo '[]'").solve(&world)).expect("solve");
        assert!(paths.is_empty());
    }

    #[rstest]
    fn receives_the_world_on_stdin(world: World) {
        // Fails unless the payload carries the departure time.
        let solver = shell("grep -q '\"minStartAt\":\"09:00\"' && echo '[]'");
        assert!(block_on(solver.solve(&world)).is_ok());
    }

    #[rstest]
    fn reports_exit_status_and_stderr(world: World) {
        let err = block_on(shell("cat >/dev/null; echo 'no route' >&2; exit 3").solve(&world))
            .expect_err("solver fails");
        assert_eq!(
            err,
            SolveError::Exited {
                code: Some(3),
                stderr: "no route".to_owned()
            }
        );
        assert_eq!(err.to_string(), "solver exited with status 3: no route");
    }

    #[rstest]
    fn accepts_an_answer_given_without_reading_stdin(world: World) {
        let large = World {
            sites: (0..5000)
                .map(|n| world_site(&format!("Site {n}")))
                .collect(),
            ..world
        };
        let paths = block_on(shell("exec 0<&-; echo '[]'").solve(&large)).expect("solve");
        assert!(paths.is_empty());
    }

    #[rstest]
    fn reports_garbage_output(world: World) {
        let err = block_on(shell("cat >/dev/null; echo nonsense").solve(&world))
            .expect_err("undecodable");
        assert!(matches!(err, SolveError::Decode { .. }));
    }

    #[rstest]
    fn reports_missing_program(world: World) {
        let err = block_on(CommandSolver::new("/nonexistent/rideplan-solver").solve(&world))
            .expect_err("cannot spawn");
        assert!(matches!(err, SolveError::Spawn { .. }));
    }
}
