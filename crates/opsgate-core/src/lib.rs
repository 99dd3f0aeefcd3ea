pub mod audit;
pub mod config;
pub mod contract;
pub mod error;
pub mod executor;
pub mod gate;
pub mod governance;
pub mod io;
pub mod ledger;
pub mod paths;
pub mod pipeline;
pub mod prompt;
pub mod resolver;
pub mod validate;

pub use error::{OpsgateError, Result};
