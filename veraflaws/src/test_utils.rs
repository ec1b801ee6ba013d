//! In-memory [`FlawSource`] for tests.
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use veracode_platform::{
    AppSummary, Build, BuildError, DetailedReport, ReportError, VeracodeError,
};

use crate::source::FlawSource;

/// Serves canned applications, builds and reports, recording every report request.
#[derive(Default)]
pub struct FakeSource {
    pub apps: Vec<AppSummary>,
    pub builds: HashMap<String, Vec<Build>>,
    /// Builds absent from this map answer with `NotReady`
    pub reports: HashMap<String, DetailedReport>,
    /// Builds whose report request fails with an API error
    pub failing_reports: HashSet<String>,
    pub failing_build_lists: HashSet<String>,
    pub fail_app_list: bool,
    pub report_requests: RefCell<Vec<String>>,
}

impl FakeSource {
    pub fn with_app(mut self, app_id: &str, app_name: &str, build_ids: &[&str]) -> Self {
        self.apps.push(AppSummary {
            app_id: app_id.to_string(),
            app_name: app_name.to_string(),
            policy_updated_date: None,
        });
        self.builds.insert(
            app_id.to_string(),
            build_ids.iter().map(|id| Build::new(app_id, *id)).collect(),
        );
        self
    }

    pub fn with_report(mut self, build_id: &str, report: DetailedReport) -> Self {
        self.reports.insert(build_id.to_string(), report);
        self
    }

    pub fn with_failing_report(mut self, build_id: &str) -> Self {
        self.failing_reports.insert(build_id.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.report_requests.borrow().clone()
    }
}

impl FlawSource for FakeSource {
    async fn list_applications(&self) -> Result<Vec<AppSummary>, VeracodeError> {
        if self.fail_app_list {
            return Err(VeracodeError::InvalidResponse("HTTP 500".to_string()));
        }
        Ok(self.apps.clone())
    }

    async fn list_builds(&self, app_id: &str) -> Result<Vec<Build>, BuildError> {
        if self.failing_build_lists.contains(app_id) {
            return Err(BuildError::ApplicationNotFound);
        }
        Ok(self.builds.get(app_id).cloned().unwrap_or_default())
    }

    async fn detailed_report(&self, build_id: &str) -> Result<DetailedReport, ReportError> {
        self.report_requests.borrow_mut().push(build_id.to_string());
        if self.failing_reports.contains(build_id) {
            return Err(ReportError::Api(VeracodeError::InvalidResponse(
                "GET /api/5.0/detailedreport.do: HTTP 502 Bad Gateway".to_string(),
            )));
        }
        self.reports
            .get(build_id)
            .cloned()
            .ok_or_else(|| ReportError::NotReady("No report available.".to_string()))
    }
}
