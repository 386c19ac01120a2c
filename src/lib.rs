pub mod args;
mod backup;
pub mod commands;
mod config;
pub mod convert;
mod db;
mod error;
mod ledger;
pub mod model;
pub mod report;
#[cfg(test)]
mod test;
mod utils;

pub use backup::Backup;
pub use config::Config;
pub use error::{Error, ErrorType, Result};
pub use ledger::Ledger;
