use clap::Parser;

use road_hazard::{run_app, AppArgs};

fn main() -> anyhow::Result<()> {
    let args = AppArgs::parse();
    run_app(args)
}
