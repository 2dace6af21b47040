pub mod cli;
pub mod run;

pub use cli::AppArgs;
pub use run::run_app;
