//! ClientBench CLI
//!
//! Runs the chaos exercises or the performance batches against one target
//! with the reqwest engine and prints a per-scenario summary.

#![allow(clippy::print_stdout)]

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use application::ports::{ClientEngine, ClientEngineFactory};
use application::{
    ChaosExercise, ChaosSuite, FaultControlPlane, MetricsRegistry, PerformanceMode,
    PerformanceSuite, Workload,
};
use clap::Parser;
use domain::Scenario;
use infrastructure::reporting::format_statuses;
use infrastructure::{
    AppConfig, MetricsReporter, ReqwestEngineConfig, ReqwestEngineFactory, init_tracing,
    install_prometheus,
};
use tokio::runtime::{Handle, Runtime};
use tracing::{error, info};

use crate::cli::{Cli, Commands, chaos_selection, mode_selection};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    init_tracing(&config.logging)?;
    info!(
        target = %config.target.base_url(),
        control_port = config.control_plane.port,
        "ClientBench starting"
    );

    let runtime = build_runtime()?;
    let _prometheus = {
        let _guard = runtime.enter();
        install_prometheus(&config.metrics)?
    };
    let metrics = Arc::new(MetricsRegistry::new());
    let mut reporter =
        MetricsReporter::start(Arc::clone(&metrics), config.metrics.report_interval())
            .context("failed to start metrics reporter")?;

    let factory = ReqwestEngineFactory::new(ReqwestEngineConfig::from(&config.client));
    let engine = factory.create_client(&config.target.host, config.target.port)?;

    let result = match &cli.command {
        Commands::Chaos {
            faults, scenario, ..
        } => run_chaos(
            &config,
            &factory,
            runtime.handle(),
            Workload::new(
                Arc::clone(&engine),
                runtime.handle().clone(),
                Arc::clone(&metrics),
                *scenario,
            ),
            &chaos_selection(faults),
        ),
        Commands::Perf { modes, .. } => run_perf(
            &config,
            Workload::new(
                Arc::clone(&engine),
                runtime.handle().clone(),
                Arc::clone(&metrics),
                Scenario::ShortGet,
            ),
            &mode_selection(modes),
        ),
    };

    runtime.block_on(engine.close());
    reporter.stop();
    print_summary(&metrics);

    if let Err(e) = &result {
        error!(error = %e, "Run failed");
    }
    result
}

fn build_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("clientbench-io")
        .build()
        .context("failed to build async runtime")
}

fn run_chaos(
    config: &AppConfig,
    factory: &ReqwestEngineFactory,
    runtime: &Handle,
    workload: Workload,
    selection: &[ChaosExercise],
) -> anyhow::Result<()> {
    let control_engine =
        factory.create_client(config.control_plane_host(), config.control_plane.port)?;
    let control = FaultControlPlane::new(control_engine, runtime.clone());

    let suite = ChaosSuite::new(workload, control.clone(), config.chaos_suite_config())?;
    let results = suite.run(selection);
    control.close();

    println!("🌀 Chaos exercises:");
    for (exercise, summary) in results? {
        println!(
            "  {exercise:<24} executions={:<8} failures={:<6} elapsed={:.1}s",
            summary.executions,
            summary.failures,
            summary.elapsed.as_secs_f64()
        );
    }
    Ok(())
}

fn run_perf(
    config: &AppConfig,
    workload: Workload,
    modes: &[PerformanceMode],
) -> anyhow::Result<()> {
    let suite = PerformanceSuite::new(workload, config.performance_config());
    let runs = suite.run(modes)?;

    println!("⚡ Performance batches:");
    for run in runs {
        println!(
            "  {:<48} executions={:<8} elapsed={:.2}s throughput={:.0}/s",
            run.id.to_string(),
            run.executions,
            run.elapsed.as_secs_f64(),
            run.throughput()
        );
    }
    Ok(())
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

fn print_summary(metrics: &MetricsRegistry) {
    let snapshots = metrics.snapshot();
    if snapshots.is_empty() {
        return;
    }

    println!("\n📊 Scenario metrics:");
    for snapshot in &snapshots {
        let timer = &snapshot.timer;
        println!(
            "  {:<48} count={:<8} rate={:.1}/s errors={} app_errors={} [{}]",
            snapshot.id.to_string(),
            timer.count,
            snapshot.mean_rate(),
            snapshot.errors,
            snapshot.app_errors,
            format_statuses(snapshot)
        );
        println!(
            "  {:<48} mean={:.2}ms min={:.2}ms p50={:.2}ms p75={:.2}ms p95={:.2}ms p99={:.2}ms max={:.2}ms",
            "",
            millis(timer.mean),
            millis(timer.min),
            millis(timer.p50),
            millis(timer.p75),
            millis(timer.p95),
            millis(timer.p99),
            millis(timer.max)
        );
    }
}
