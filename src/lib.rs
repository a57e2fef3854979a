//! Batch cleaning of container location readings.
//!
//! Phones mounted on waste and recycling containers report how far the
//! container is from its siting point. The readings are noisy: GPS jumps,
//! containers moved aside for a few days, devices reporting from the depot.
//! For every location this crate labels each reading `accurate`, `outlier`
//! or `temporary_shift` and assigns it a corrected coordinate.
//!
//! The core lives in [`cleaning`] and works on in-memory readings only.
//! [`db`], [`ingest`] and [`runner`] wrap it for the command-line tool in
//! [`cli`].

pub mod cleaning;
pub mod cli;
pub mod db;
pub mod ingest;
pub mod models;
pub mod runner;
pub mod settings;
mod utils;

pub use cli::{run, Cli};
