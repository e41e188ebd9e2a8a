//! The `run` command: configuration to pipeline to persisted run history.
//!
//! Individual source failures never produce a nonzero exit; the command
//! fails only when the whole run does (no sources, or all sources failed).

use pulse_core::{AppConfig, RunReport, SourceConfig};
use pulse_ingest::{run_pipeline, MemoryStore};

use crate::store::PgStore;

pub(crate) async fn run_pipeline_command(
    mut config: AppConfig,
    source_filter: Option<&str>,
    dry_run: bool,
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    if let Some(secs) = timeout_secs {
        config.run_timeout_secs = secs;
    }

    let sources_file = pulse_core::load_sources(&config.sources_path)?;
    let taxonomy = sources_file.active_taxonomy();
    let sources = select_sources(sources_file.enabled_sources(), source_filter)?;

    if dry_run {
        return run_dry(&config, &sources, &taxonomy).await;
    }

    let pool = pulse_db::connect(&config).await?;

    let run = pulse_db::create_pipeline_run(&pool, "cli").await?;
    if let Err(e) = pulse_db::start_pipeline_run(&pool, run.id).await {
        fail_run_best_effort(&pool, run.id, format!("{e:#}")).await;
        return Err(e.into());
    }
    tracing::info!(run_id = run.id, public_id = %run.public_id, "pipeline run started");

    let store = PgStore::new(pool.clone());
    match run_pipeline(&config, &sources, &taxonomy, &store).await {
        Ok(report) => {
            persist_source_outcomes(&pool, run.id, &report).await;
            if let Err(e) = pulse_db::complete_pipeline_run(
                &pool,
                run.id,
                report.status.as_str(),
                clamp_count(report.total_new()),
                clamp_count(report.total_duplicate()),
                clamp_count(report.total_updated()),
            )
            .await
            {
                fail_run_best_effort(&pool, run.id, format!("{e:#}")).await;
                return Err(e.into());
            }
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            persist_source_outcomes(&pool, run.id, &e.report).await;
            fail_run_best_effort(&pool, run.id, e.reason.clone()).await;
            print_report(&e.report);
            anyhow::bail!("pipeline run failed: {}", e.reason);
        }
    }
}

/// Full pipeline against an in-memory store; the database is never touched.
async fn run_dry(
    config: &AppConfig,
    sources: &[SourceConfig],
    taxonomy: &[pulse_core::Category],
) -> anyhow::Result<()> {
    let store = MemoryStore::new();
    match run_pipeline(config, sources, taxonomy, &store).await {
        Ok(report) => {
            print_report(&report);
            println!(
                "dry-run: {} articles held in memory, nothing written",
                store.len()
            );
            Ok(())
        }
        Err(e) => {
            print_report(&e.report);
            anyhow::bail!("pipeline run failed: {}", e.reason);
        }
    }
}

/// Narrow the enabled source list to `--source` when given.
fn select_sources(
    enabled: Vec<SourceConfig>,
    filter: Option<&str>,
) -> anyhow::Result<Vec<SourceConfig>> {
    let Some(id) = filter else {
        return Ok(enabled);
    };

    let selected: Vec<SourceConfig> = enabled.into_iter().filter(|s| s.id == id).collect();
    if selected.is_empty() {
        anyhow::bail!("source '{id}' not found or not enabled; check the sources file");
    }
    Ok(selected)
}

/// Persist per-source rows best effort; a reporting failure must not mask
/// the run result.
async fn persist_source_outcomes(pool: &sqlx::PgPool, run_id: i64, report: &RunReport) {
    for outcome in &report.sources {
        if let Err(e) = pulse_db::upsert_pipeline_run_source(pool, run_id, outcome).await {
            tracing::warn!(
                source = %outcome.source_id,
                error = %e,
                "failed to persist source outcome"
            );
        }
    }
}

async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(e) = pulse_db::fail_pipeline_run(pool, run_id, &message).await {
        tracing::error!(run_id, error = %e, "failed to mark pipeline run as failed");
    }
}

fn clamp_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn print_report(report: &RunReport) {
    println!(
        "run {} ({} -> {})",
        report.status,
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        report.completed_at.format("%H:%M:%S")
    );
    println!(
        "{:<20}{:>8}{:>6}{:>11}{:>9}{:>9}{:>8}  ERROR",
        "SOURCE", "FETCHED", "NEW", "DUPLICATE", "UPDATED", "DROPPED", "FAILED"
    );
    for o in &report.sources {
        println!(
            "{:<20}{:>8}{:>6}{:>11}{:>9}{:>9}{:>8}  {}",
            o.source_id,
            o.fetched,
            o.new,
            o.duplicate,
            o.updated,
            o.dropped,
            o.upsert_failed,
            o.error.as_deref().unwrap_or("-")
        );
    }
    println!(
        "totals: {} fetched, {} new, {} duplicate, {} updated",
        report.total_fetched(),
        report.total_new(),
        report.total_duplicate(),
        report.total_updated()
    );
}
