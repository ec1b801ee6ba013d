//! Selection of the most recent build with retrievable results.
//!
//! A pending static, dynamic and manual scan can each occupy a newer build
//! slot than the last completed one, so up to four trailing builds are
//! tried, newest first. The first build whose detailed report can be
//! retrieved wins and no older build is fetched after it.
use log::{debug, warn};
use veracode_platform::{Build, DetailedReport};

use crate::source::FlawSource;

/// Maximum number of trailing builds tried per application.
pub const MAX_BUILD_ATTEMPTS: usize = 4;

/// The build chosen for an application together with its detailed report.
#[derive(Debug, Clone)]
pub struct BuildSelection {
    pub build_id: String,
    pub report: DetailedReport,
}

/// Walk `builds` (oldest first) from the newest backwards.
///
/// Returns `None` when there are no builds or none of the tried builds has
/// a retrievable report.
pub async fn select_build<S: FlawSource>(source: &S, builds: &[Build]) -> Option<BuildSelection> {
    for build in builds.iter().rev().take(MAX_BUILD_ATTEMPTS) {
        match source.detailed_report(&build.build_id).await {
            Ok(report) => {
                debug!("Using build {} for application {}", build.build_id, build.app_id);
                return Some(BuildSelection {
                    build_id: build.build_id.clone(),
                    report,
                });
            }
            Err(e) if e.is_not_ready() => {
                debug!("Build {} has no results: {e}", build.build_id);
            }
            Err(e) => {
                warn!("Could not retrieve report for build {}: {e}", build.build_id);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeSource;

    fn report(build_id: &str) -> DetailedReport {
        DetailedReport {
            build_id: build_id.to_string(),
            ..Default::default()
        }
    }

    fn builds_of(source: &FakeSource) -> Vec<Build> {
        source.builds.get("1").cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_no_builds_means_no_selection() {
        let source = FakeSource::default().with_app("1", "App", &[]);

        assert!(select_build(&source, &builds_of(&source)).await.is_none());
        assert!(source.requested().is_empty());
    }

    #[tokio::test]
    async fn test_newest_build_wins_without_further_requests() {
        let source = FakeSource::default()
            .with_app("1", "App", &["b1", "b2", "b3"])
            .with_report("b2", report("b2"))
            .with_report("b3", report("b3"));

        let selection = select_build(&source, &builds_of(&source)).await.unwrap();

        assert_eq!(selection.build_id, "b3");
        assert_eq!(source.requested(), vec!["b3"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_fourth_most_recent() {
        let source = FakeSource::default()
            .with_app("1", "App", &["b0", "b1", "b2", "b3", "b4"])
            .with_report("b0", report("b0"))
            .with_report("b1", report("b1"));

        let selection = select_build(&source, &builds_of(&source)).await.unwrap();

        assert_eq!(selection.build_id, "b1");
        assert_eq!(selection.report.build_id, "b1");
        assert_eq!(source.requested(), vec!["b4", "b3", "b2", "b1"]);
    }

    #[tokio::test]
    async fn test_never_requests_past_four_builds() {
        let source = FakeSource::default()
            .with_app("1", "App", &["b0", "b1", "b2", "b3", "b4"])
            .with_report("b0", report("b0"));

        assert!(select_build(&source, &builds_of(&source)).await.is_none());
        assert_eq!(source.requested(), vec!["b4", "b3", "b2", "b1"]);
    }

    #[tokio::test]
    async fn test_short_history_requests_each_build_once() {
        let source = FakeSource::default().with_app("1", "App", &["b0", "b1"]);

        assert!(select_build(&source, &builds_of(&source)).await.is_none());
        assert_eq!(source.requested(), vec!["b1", "b0"]);
    }

    #[tokio::test]
    async fn test_success_after_error_is_kept() {
        let source = FakeSource::default()
            .with_app("1", "App", &["b0", "b1", "b2"])
            .with_report("b0", report("b0"))
            .with_report("b1", report("b1"));

        let selection = select_build(&source, &builds_of(&source)).await.unwrap();

        assert_eq!(selection.build_id, "b1");
        assert_eq!(source.requested(), vec!["b2", "b1"]);
    }

    #[tokio::test]
    async fn test_api_error_moves_on_to_older_build() {
        let source = FakeSource::default()
            .with_app("1", "App", &["b0", "b1", "b2"])
            .with_report("b1", report("b1"))
            .with_report("b2", report("b2"))
            .with_failing_report("b2");

        let selection = select_build(&source, &builds_of(&source)).await.unwrap();

        assert_eq!(selection.build_id, "b1");
        assert_eq!(source.requested(), vec!["b2", "b1"]);
    }

    #[tokio::test]
    async fn test_four_api_errors_select_nothing() {
        let source = FakeSource::default()
            .with_app("1", "App", &["b0", "b1", "b2", "b3", "b4"])
            .with_report("b0", report("b0"))
            .with_failing_report("b1")
            .with_failing_report("b2")
            .with_failing_report("b3")
            .with_failing_report("b4");

        assert!(select_build(&source, &builds_of(&source)).await.is_none());
        assert_eq!(source.requested(), vec!["b4", "b3", "b2", "b1"]);
    }

    #[tokio::test]
    async fn test_mixed_errors_fall_back_to_oldest_build() {
        let source = FakeSource::default()
            .with_app("1", "App", &["b0", "b1", "b2", "b3"])
            .with_report("b0", report("b0"))
            .with_failing_report("b3")
            .with_failing_report("b1");

        let selection = select_build(&source, &builds_of(&source)).await.unwrap();

        assert_eq!(selection.build_id, "b0");
        assert_eq!(source.requested(), vec!["b3", "b2", "b1", "b0"]);
    }
}
