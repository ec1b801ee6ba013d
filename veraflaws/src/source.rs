//! The remote operations the export pipeline depends on.
use veracode_platform::{
    AppSummary, Build, BuildError, DetailedReport, ReportError, VeracodeClient, VeracodeError,
};

/// Source of applications, builds and detailed reports.
///
/// Implemented by [`VeracodeClient`]; tests provide in-memory versions.
#[allow(async_fn_in_trait)]
pub trait FlawSource {
    /// All applications of the account, in inventory order.
    async fn list_applications(&self) -> Result<Vec<AppSummary>, VeracodeError>;

    /// Build history of an application, oldest first.
    async fn list_builds(&self, app_id: &str) -> Result<Vec<Build>, BuildError>;

    /// Detailed report of a build. [`ReportError::NotReady`] means the build
    /// has no final results.
    async fn detailed_report(&self, build_id: &str) -> Result<DetailedReport, ReportError>;
}

impl FlawSource for VeracodeClient {
    async fn list_applications(&self) -> Result<Vec<AppSummary>, VeracodeError> {
        self.app_api().get_app_list().await
    }

    async fn list_builds(&self, app_id: &str) -> Result<Vec<Build>, BuildError> {
        Ok(self.build_api().get_app_builds(app_id).await?.builds)
    }

    async fn detailed_report(&self, build_id: &str) -> Result<DetailedReport, ReportError> {
        self.report_api().get_detailed_report(build_id).await
    }
}
