#[macro_use]
extern crate log;

pub mod bridge;
pub mod engine;
pub mod formula;
pub mod parser;
pub mod prelude;
pub mod report;
pub mod solver;

#[cfg(test)]
mod tests;

pub use crate::bridge::{CallbackResult, HostError, InterruptFlag, InterruptSource, Interrupted};
pub use crate::engine::state::{SATISFIABLE, UNSATISFIABLE, UNSOLVED};
pub use crate::engine::{Cubes, Fixed, Inccnf, State, Statistics, Status};
pub use crate::parser::Strictness;
pub use crate::solver::{Error, Result, Solver};
