// CLI modules
mod cli;
mod process;
mod state;
mod version;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Apply, Import, Init, Plan, Version};

command_enum! {
    (Apply, Apply),
    (Import, Import),
    (Init, Init),
    (Plan, Plan),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Explicit flag > config file > info
    let config = state::AppState::load(args.config_path.clone())
        .map(|state| state.config)
        .ok();
    let log_level = args
        .log_level
        .clone()
        .or_else(|| config.as_ref().map(|c| c.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let log_dir = config.as_ref().and_then(|c| c.log_dir.clone());

    let guards = match process::init_logging(&log_level, log_dir.as_deref()) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {:#}", e);
            std::process::exit(1);
        }
    };

    let ctx = cli::op::OpContext::new(args.config_path);
    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    drop(guards);
    std::process::exit(code);
}
