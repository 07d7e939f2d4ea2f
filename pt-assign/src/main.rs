use std::io::Write;
use std::process::ExitCode;

use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pt_assign::assignment::run_assignment;
use pt_assign::context::RunContext;
use pt_assign::error::AssignmentError;
use pt_assign::input::Scenario;
use pt_assign::pipeline::{RouteSink, SinkSet};
use pt_assign::skim::{OdSkim, SkimAggregator};
use pt_assign::timetable::TimetableSearch;

/// Environment variable overriding the scenario's worker thread count.
const THREADS_VAR: &str = "PT_ASSIGN_THREADS";

/// One output line: a skim tagged with its variant.
#[derive(Serialize)]
struct SkimLine<'a> {
    variant: &'a str,
    #[serde(flatten)]
    skim: &'a OdSkim,
}

fn run(path: &str) -> Result<(), AssignmentError> {
    let mut scenario = Scenario::load(path)?;
    if let Ok(threads) = std::env::var(THREADS_VAR) {
        let threads = threads.parse().map_err(|_| {
            AssignmentError::Configuration(format!("{THREADS_VAR} must be a number, got {threads:?}"))
        })?;
        scenario.pipeline.threads = Some(threads);
    }

    let zones = scenario.network()?;
    let demand = scenario.demand_table()?;
    let timetable = scenario.build_timetable()?;
    let variants = scenario.build_variants()?;
    let ctx = RunContext::new(&zones, &demand, scenario.time_slice_mins())?;
    info!(
        zones = zones.len(),
        trips = timetable.trips().len(),
        variants = variants.len(),
        "scenario loaded"
    );

    // Each worker gets its own search handle
    let max_transfers = scenario.max_transfers();
    let search =
        || -> Result<_, AssignmentError> { Ok(TimetableSearch::new(&timetable, max_transfers)) };

    let mut skims: Vec<SkimAggregator> = variants.iter().map(|_| SkimAggregator::new()).collect();
    let mut sinks: Vec<SinkSet<'_>> = skims
        .iter_mut()
        .map(|s| vec![s as &mut dyn RouteSink])
        .collect();
    let stats = run_assignment(
        &ctx,
        &search,
        scenario.origins.as_deref(),
        scenario.destinations.as_deref(),
        &variants,
        &scenario.pipeline,
        &mut sinks,
    )?;
    drop(sinks);
    info!(
        threads = stats.threads,
        zones = stats.zones,
        routes = stats.routes,
        unroutable = stats.unroutable,
        "assignment complete"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (variant, skims) in variants.iter().zip(skims) {
        if !skims.unroutable_within(scenario.unroutable_warning_share) {
            warn!(
                variant = variant.name(),
                share = skims.unroutable_share(),
                threshold = scenario.unroutable_warning_share,
                "unroutable share above threshold"
            );
        }
        for skim in skims.into_records() {
            let line = SkimLine {
                variant: variant.name(),
                skim: &skim,
            };
            serde_json::to_writer(&mut out, &line)
                .map_err(|e| AssignmentError::Sink(format!("failed to write skim: {}", e)))?;
            writeln!(out)
                .map_err(|e| AssignmentError::Sink(format!("failed to write skim: {}", e)))?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // Logs go to stderr, skims to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: pt-assign <scenario.json>");
        return ExitCode::from(2);
    };

    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "assignment failed");
            ExitCode::from(e.exit_code())
        }
    }
}
