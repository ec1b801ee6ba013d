//! Projection of a flaw onto the fixed CSV schema.
use veracode_platform::{AppSummary, CustomField, DetailedReport, Flaw};

use crate::filter::{DYNAMIC_MODULE, MANUAL_MODULE};
use crate::selector::BuildSelection;

/// Columns after `app_name, app_id, <custom field>`.
const FIXED_COLUMNS: [&str; 20] = [
    "build_id",
    "unique_id",
    "issueid",
    "analysis_type",
    "category",
    "cwe_name",
    "cwe_id",
    "remediation_status",
    "mitigation_status",
    "policy_name",
    "affects_policy_compliance",
    "date_first_occurrence",
    "recent_scan_date",
    "severity",
    "exploit_level",
    "module",
    "source_file",
    "line",
    "scan_target_url",
    "flaw_url",
];

/// Header row. The third column is labelled with the custom field's name.
pub fn header_record(custom_field_name: &str, include_description: bool) -> Vec<&str> {
    let mut header = vec!["app_name", "app_id", custom_field_name];
    header.extend(FIXED_COLUMNS);
    if include_description {
        header.push("description");
    }
    header
}

/// Analysis type a flaw was found by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    Static,
    Dynamic,
    Manual,
}

impl ScanType {
    pub fn of(flaw: &Flaw) -> Self {
        match flaw.module.as_str() {
            DYNAMIC_MODULE => ScanType::Dynamic,
            MANUAL_MODULE => ScanType::Manual,
            _ => ScanType::Static,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScanType::Static => "static",
            ScanType::Dynamic => "dynamic",
            ScanType::Manual => "manual",
        }
    }
}

/// The application has no custom field to fill the third column with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCustomField;

/// Per-application values shared by every row of that application.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub app: &'a AppSummary,
    pub build_id: &'a str,
    pub report: &'a DetailedReport,
    pub custom_field: &'a CustomField,
}

impl<'a> ReportContext<'a> {
    /// Uses the application's first custom field.
    pub fn new(
        app: &'a AppSummary,
        selection: &'a BuildSelection,
    ) -> Result<Self, MissingCustomField> {
        let custom_field = selection
            .report
            .custom_fields
            .first()
            .ok_or(MissingCustomField)?;
        Ok(Self {
            app,
            build_id: &selection.build_id,
            report: &selection.report,
            custom_field,
        })
    }

    /// Build the output row for one surviving flaw.
    pub fn project(&self, flaw: &'a Flaw) -> FlawRow<'a> {
        let scan_type = ScanType::of(flaw);
        let (scan_target_url, recent_scan_date) = match scan_type {
            ScanType::Dynamic => (
                self.report.dynamic_target_url(),
                self.report.dynamic_submitted_date(),
            ),
            ScanType::Manual => ("", self.report.manual_submitted_date()),
            ScanType::Static => ("", self.report.static_submitted_date()),
        };

        FlawRow {
            custom_field_name: &self.custom_field.name,
            app_name: &self.app.app_name,
            app_id: &self.app.app_id,
            custom_field_value: &self.custom_field.value,
            build_id: self.build_id,
            unique_id: format!("{}-{}", self.app.app_id, flaw.issueid),
            scan_type,
            recent_scan_date,
            scan_target_url,
            flaw,
        }
    }
}

/// One data row of the report, borrowing from the application and report.
#[derive(Debug, Clone)]
pub struct FlawRow<'a> {
    /// Label for the custom field column, used for the header
    pub custom_field_name: &'a str,
    pub app_name: &'a str,
    pub app_id: &'a str,
    pub custom_field_value: &'a str,
    pub build_id: &'a str,
    pub unique_id: String,
    pub scan_type: ScanType,
    pub recent_scan_date: &'a str,
    pub scan_target_url: &'a str,
    pub flaw: &'a Flaw,
}

impl FlawRow<'_> {
    /// Fields in header order.
    pub fn to_record(&self, include_description: bool) -> Vec<&str> {
        let f = self.flaw;
        let mut record = vec![
            self.app_name,
            self.app_id,
            self.custom_field_value,
            self.build_id,
            &self.unique_id,
            &f.issueid,
            self.scan_type.as_str(),
            &f.category_name,
            &f.cwe_name,
            &f.cwe_id,
            &f.remediation_status,
            &f.mitigation_status,
            &f.policy_name,
            &f.affects_policy_compliance,
            &f.date_first_occurrence,
            self.recent_scan_date,
            &f.severity,
            &f.exploit_level,
            &f.module,
            &f.source_file,
            &f.line,
            self.scan_target_url,
            &f.flaw_url,
        ];
        if include_description {
            record.push(&f.description);
        }
        record
    }
}
