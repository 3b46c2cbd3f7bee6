//! # Spark Host Daemon
//!
//! Main entry point for the Spark host runtime.

use sparkd::{parse_args, print_usage, CliAction, HostRuntime};
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("sparkd");

    let config = match parse_args(&args) {
        Ok(CliAction::Run(config)) => config,
        Ok(CliAction::Help) => {
            print_usage(program);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(program);
            process::exit(1);
        }
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", &config.log_level);
    env_logger::init_from_env(env);

    let mut runtime = HostRuntime::new(config).unwrap_or_else(|e| {
        eprintln!("Failed to create runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.run();
    runtime.shutdown();

    if let Err(e) = result {
        eprintln!("Runtime error: {}", e);
        process::exit(1);
    }
}
