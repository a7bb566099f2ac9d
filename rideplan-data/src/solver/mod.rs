//! Solver adapters.

mod command;

pub use command::CommandSolver;
