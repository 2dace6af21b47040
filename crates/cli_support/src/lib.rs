pub mod args;
pub mod config;
pub mod logging;

pub use args::{ReportArgs, RuntimeArgs};
pub use config::HazardConfig;
pub use logging::init_tracing;
