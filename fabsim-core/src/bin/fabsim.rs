//! Native runner: `fabsim <config.json>`.
//!
//! Set `FABSIM_RECORD_DIR` to also dump the instrumented sale/profit/trial
//! tables as parquet for plotting.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use fabsim_core::{Experiment, SimResult};

fn main() -> ExitCode {
    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: fabsim <config.json>");
        return ExitCode::FAILURE;
    };

    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fabsim: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &std::path::Path) -> SimResult<()> {
    let experiment = Experiment::from_path(path)?;

    #[cfg(feature = "instrument")]
    let _recorder = std::env::var_os("FABSIM_RECORD_DIR").map(|dir| {
        fabsim_core::instrument::RunRecorder::new(dir, &experiment.config().output_file)
    });

    println!("Running...");
    println!();

    let started = Instant::now();
    let outcome = experiment.run()?;
    let elapsed = started.elapsed();

    for report in outcome.monitor_reports() {
        println!("{report}");
    }

    outcome.write_results()?;
    println!("{}", outcome.run_report(Some(elapsed)));
    println!("Results written to {}", outcome.config.output_path().display());
    Ok(())
}
