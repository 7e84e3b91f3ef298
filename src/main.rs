use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::error;

use yoy_report::{export, init_defaults, load_unit_names, report, utils, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);

    utils::validate_args(&args)?;

    if args.init {
        return init_defaults(Path::new("."));
    }

    utils::configure_workers(args.workers)?;
    let units = load_unit_names(args.unit_names.as_deref())?;

    match report::run_report(&args) {
        Ok(result) => {
            if args.list_units {
                report::print_units(&result, &units);
                return Ok(());
            }

            report::print_report(&result, &units);
            if let Some(output_dir) = &args.export {
                println!();
                export::export_views(output_dir, &result)?;
            }
            Ok(())
        }
        Err(e) => {
            error!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
