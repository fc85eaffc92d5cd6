pub mod bonds;
pub mod config;
pub mod constants;
pub mod cycle;
pub mod db;
pub mod diff;
pub mod error;
pub mod logging;
pub mod notify;
pub mod schedule;

#[cfg(test)]
pub(crate) mod testing;
