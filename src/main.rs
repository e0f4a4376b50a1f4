use clap::Parser;
use log::LevelFilter;
use snafu::ErrorCompat;

mod args;
mod compass;

use crate::args::{Args, Command};

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .init();
    }

    let res = match args.command {
        Command::Ingest { config, out } => compass::run_ingest(config, out),
        Command::Evaluate {
            config,
            answers,
            out,
            reference,
            sort,
            save,
        } => compass::run_evaluate(compass::EvaluateOptions {
            config_path: config,
            answers,
            out,
            reference,
            sort,
            save,
        }),
        Command::Show { config, result_id } => compass::run_show(config, result_id),
    };

    if let Err(e) = res {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
