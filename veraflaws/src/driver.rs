//! Run orchestration: applications → build selection → filtering → CSV.
use log::{debug, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use veracode_platform::AppSummary;

use crate::error::{FlawsError, Result};
use crate::filter::FilterOptions;
use crate::row::ReportContext;
use crate::selector::select_build;
use crate::source::FlawSource;
use crate::writer::{ReportWriter, WriteFailurePolicy};

/// Settings for a single export run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub filter: FilterOptions,
    pub include_descriptions: bool,
    pub output_path: PathBuf,
    pub write_failure_policy: WriteFailurePolicy,
}

/// Counters collected over a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub apps_total: usize,
    pub apps_processed: usize,
    pub apps_with_results: usize,
    pub apps_skipped: usize,
    pub rows_written: usize,
    pub flaws_filtered: usize,
    pub failed_rows: usize,
    pub output_path: PathBuf,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn log(&self) {
        info!("Export complete: {}", self.output_path.display());
        info!(
            "  Applications: {} total, {} with results, {} skipped",
            self.apps_total, self.apps_with_results, self.apps_skipped
        );
        info!(
            "  Rows written: {} ({} flaws filtered out)",
            self.rows_written, self.flaws_filtered
        );
        if self.failed_rows > 0 {
            warn!("  Rows that failed to write: {}", self.failed_rows);
        }
    }
}

/// Export every application's flaws to `config.output_path`.
///
/// Failing to list applications, to list an application's builds or to
/// create the output file aborts the run. Whatever was written is flushed
/// before an error is returned.
pub async fn run<S: FlawSource>(source: &S, config: &RunConfig) -> Result<RunSummary> {
    let started = Instant::now();

    let apps = source
        .list_applications()
        .await
        .map_err(FlawsError::ApplicationList)?;
    info!("Found {} applications", apps.len());

    let mut writer = ReportWriter::create(
        &config.output_path,
        config.include_descriptions,
        config.write_failure_policy,
    )?;

    let mut summary = RunSummary {
        output_path: config.output_path.clone(),
        ..Default::default()
    };
    let exported = export_applications(source, &apps, config, &mut writer, &mut summary).await;
    let flushed = writer.flush();
    exported?;
    flushed?;

    summary.elapsed = started.elapsed();
    println!("Run time: {:?} ", summary.elapsed);
    Ok(summary)
}

/// Walk `apps` in order, writing the surviving flaws of each one.
pub(crate) async fn export_applications<S: FlawSource, W: Write>(
    source: &S,
    apps: &[AppSummary],
    config: &RunConfig,
    writer: &mut ReportWriter<W>,
    summary: &mut RunSummary,
) -> Result<()> {
    summary.apps_total = apps.len();

    for (index, app) in apps.iter().enumerate() {
        println!(
            "Processing App ID {}: {} ({} of {})",
            app.app_id,
            app.app_name,
            index + 1,
            apps.len()
        );
        summary.apps_processed += 1;

        let builds = source
            .list_builds(&app.app_id)
            .await
            .map_err(|source| FlawsError::BuildList {
                app_id: app.app_id.clone(),
                source,
            })?;
        if builds.is_empty() {
            debug!("Application {} has no builds", app.app_id);
            summary.apps_skipped += 1;
            continue;
        }

        let Some(selection) = select_build(source, &builds).await else {
            warn!(
                "No recent build with results for application {} ({})",
                app.app_id, app.app_name
            );
            summary.apps_skipped += 1;
            continue;
        };

        let Ok(context) = ReportContext::new(app, &selection) else {
            warn!(
                "Skipping application {} ({}): no custom fields defined",
                app.app_id, app.app_name
            );
            summary.apps_skipped += 1;
            continue;
        };
        summary.apps_with_results += 1;

        for flaw in &selection.report.flaws {
            if let Some(reason) = config.filter.drop_reason(flaw) {
                debug!("Skipping flaw {}-{}: {reason}", app.app_id, flaw.issueid);
                summary.flaws_filtered += 1;
                continue;
            }
            let result = writer.write_row(&context.project(flaw));
            summary.rows_written = writer.rows_written();
            summary.failed_rows = writer.failed_rows();
            result?;
        }
    }

    Ok(())
}
