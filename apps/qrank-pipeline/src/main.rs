// [apps/qrank-pipeline/src/main.rs]

use clap::Parser;
use qrank_pipeline::{CommandArguments, Driver, PublishOutcome};
use qrank_shared_telemetry::init_tracing;
use tracing::{error, info};

fn main() -> std::process::ExitCode {
    init_tracing("qrank_pipeline");

    let args = CommandArguments::parse();
    let driver = Driver {
        input_root: args.input_root,
        work_dir: args.work_dir,
        output_dir: args.output_dir,
        workers: args.workers.unwrap_or_else(num_cpus::get),
    };

    match driver.run(args.dry_run) {
        Ok(PublishOutcome::Published) => {
            info!("run complete");
            std::process::ExitCode::SUCCESS
        }
        Ok(PublishOutcome::AlreadyPublished) => {
            info!("dump already published");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "pipeline failed");
            std::process::ExitCode::FAILURE
        }
    }
}
