//! Read-only reporting over persisted run history and stored articles.

pub(crate) async fn run_report(config: &pulse_core::AppConfig, limit: i64) -> anyhow::Result<()> {
    let pool = pulse_db::connect(config).await?;

    let runs = pulse_db::list_pipeline_runs(&pool, limit).await?;
    if runs.is_empty() {
        println!("no pipeline runs recorded; run `pulse-cli run` first");
        return Ok(());
    }

    println!(
        "{:<6}{:<12}{:<22}{:>6}{:>11}{:>9}  ERROR",
        "RUN", "STATUS", "STARTED", "NEW", "DUPLICATE", "UPDATED"
    );
    for run in &runs {
        let started = run
            .started_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6}{:<12}{:<22}{:>6}{:>11}{:>9}  {}",
            run.id,
            run.status,
            started,
            run.articles_new,
            run.articles_duplicate,
            run.articles_updated,
            run.error_message.as_deref().unwrap_or("-")
        );
    }

    // Per-source breakdown of the most recent run.
    let latest = &runs[0];
    let outcomes = pulse_db::list_pipeline_run_sources(&pool, latest.id).await?;
    if !outcomes.is_empty() {
        println!("\nsources of run {}:", latest.id);
        for o in &outcomes {
            println!(
                "  {:<20}{:<12}{:>3} new, {:>3} duplicate, {:>3} updated  {}",
                o.source_id,
                o.status,
                o.new_count,
                o.duplicate_count,
                o.updated_count,
                o.error_message.as_deref().unwrap_or("-")
            );
        }
    }

    let total = pulse_db::count_articles(&pool).await?;
    let recent = pulse_db::list_recent_articles(&pool, 5).await?;
    println!("\n{total} articles stored; latest headlines:");
    for article in &recent {
        println!(
            "  [{}] {} ({})",
            article.sentiment_label, article.title, article.source_id
        );
    }

    Ok(())
}
