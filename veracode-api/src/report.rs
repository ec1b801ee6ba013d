//! Detailed report retrieval via the XML `detailedreport.do` endpoint.
//!
//! A detailed report aggregates the results of every analysis type (static,
//! dynamic, manual) attached to a build. Builds that have not finished (or
//! were cancelled) have no report; the API then answers with an `<error>`
//! document, surfaced here as [`ReportError::NotReady`].

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{VeracodeClient, VeracodeError, xml};

/// Summary of one analysis type within a detailed report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// When the analysis was submitted
    pub submitted_date: String,
    /// When the results were published
    pub published_date: Option<String>,
    /// Letter rating
    pub rating: Option<String>,
    /// Numeric score
    pub score: Option<String>,
}

/// A dynamic analysis target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicModule {
    pub name: String,
    pub target_url: String,
}

/// Dynamic analysis block, which also carries the scanned targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicAnalysis {
    pub summary: AnalysisSummary,
    pub modules: Vec<DynamicModule>,
}

/// Application-level custom field, as attached to the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    pub value: String,
}

impl CustomField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single finding of a detailed report.
///
/// Values are kept in the API's string form. In particular
/// `affects_policy_compliance` is the literal `"true"`/`"false"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flaw {
    pub issueid: String,
    pub category_name: String,
    pub cwe_name: String,
    pub cwe_id: String,
    /// e.g. `Open`, `New`, `Fixed`, `Cannot Reproduce`
    pub remediation_status: String,
    /// e.g. `none`, `proposed`, `accepted`, `rejected`
    pub mitigation_status: String,
    pub policy_name: String,
    pub affects_policy_compliance: String,
    pub date_first_occurrence: String,
    pub severity: String,
    pub exploit_level: String,
    /// Binary module for static flaws; `dynamic_analysis` or `manual_analysis` otherwise
    pub module: String,
    pub source_file: String,
    pub line: String,
    pub flaw_url: String,
    pub description: String,
}

/// Decoded `detailedreport.do` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedReport {
    pub app_id: String,
    pub app_name: String,
    pub build_id: String,
    pub policy_name: String,
    pub static_analysis: Option<AnalysisSummary>,
    pub dynamic_analysis: Option<DynamicAnalysis>,
    pub manual_analysis: Option<AnalysisSummary>,
    /// Custom fields in document order
    pub custom_fields: Vec<CustomField>,
    /// Flaws in document order
    pub flaws: Vec<Flaw>,
}

impl DetailedReport {
    /// Submission date of the static analysis, or `""` when there is none.
    pub fn static_submitted_date(&self) -> &str {
        self.static_analysis
            .as_ref()
            .map_or("", |a| a.submitted_date.as_str())
    }

    /// Submission date of the dynamic analysis, or `""` when there is none.
    pub fn dynamic_submitted_date(&self) -> &str {
        self.dynamic_analysis
            .as_ref()
            .map_or("", |a| a.summary.submitted_date.as_str())
    }

    /// Submission date of the manual analysis, or `""` when there is none.
    pub fn manual_submitted_date(&self) -> &str {
        self.manual_analysis
            .as_ref()
            .map_or("", |a| a.submitted_date.as_str())
    }

    /// Target URL of the first dynamic module, or `""` when there is none.
    pub fn dynamic_target_url(&self) -> &str {
        self.dynamic_analysis
            .as_ref()
            .and_then(|a| a.modules.first())
            .map_or("", |m| m.target_url.as_str())
    }
}

/// Detailed report error types
#[derive(Debug)]
pub enum ReportError {
    /// Veracode API error
    Api(VeracodeError),
    /// The build has no final results (pending, cancelled, failed, ...)
    NotReady(String),
    /// XML parsing error
    XmlParsingError(String),
}

impl ReportError {
    /// Whether the build simply has no results yet, as opposed to a failure.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, ReportError::NotReady(_))
    }
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Api(err) => write!(f, "API error: {err}"),
            ReportError::NotReady(msg) => write!(f, "Report not available: {msg}"),
            ReportError::XmlParsingError(msg) => write!(f, "XML parsing error: {msg}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<VeracodeError> for ReportError {
    fn from(err: VeracodeError) -> Self {
        ReportError::Api(err)
    }
}

/// Detailed report operations
pub struct ReportApi<'a> {
    client: &'a VeracodeClient,
}

impl<'a> ReportApi<'a> {
    pub fn new(client: &'a VeracodeClient) -> Self {
        Self { client }
    }

    /// Fetch and decode the detailed report of a build.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::NotReady`] when the build has no results,
    /// otherwise an API or XML error.
    pub async fn get_detailed_report(&self, build_id: &str) -> Result<DetailedReport, ReportError> {
        let xml = self
            .client
            .get_xml("/api/5.0/detailedreport.do", &[("build_id", build_id)])
            .await?;
        parse_detailed_report(&xml)
    }
}

/// Enclosing `<category>` / `<cwe>` values inherited by the flaws below them.
#[derive(Default)]
struct FlawContext {
    category_name: String,
    cwe_id: String,
    cwe_name: String,
}

/// Accumulates a [`DetailedReport`] while walking the XML events.
#[derive(Default)]
struct ReportBuilder {
    report: DetailedReport,
    context: FlawContext,
    in_dynamic_analysis: bool,
    saw_root: bool,
}

impl ReportBuilder {
    /// Handle a start tag (`has_children`) or an empty element.
    fn element(&mut self, e: &BytesStart<'_>, has_children: bool) {
        match e.local_name().as_ref() {
            b"detailedreport" => {
                self.saw_root = true;
                let mut attrs = xml::attributes(e);
                self.report.app_id = attrs.remove("app_id").unwrap_or_default();
                self.report.app_name = attrs.remove("app_name").unwrap_or_default();
                self.report.build_id = attrs.remove("build_id").unwrap_or_default();
                self.report.policy_name = attrs.remove("policy_name").unwrap_or_default();
            }
            b"static-analysis" => {
                self.report.static_analysis = Some(analysis_summary(xml::attributes(e)));
            }
            b"dynamic-analysis" => {
                self.report.dynamic_analysis = Some(DynamicAnalysis {
                    summary: analysis_summary(xml::attributes(e)),
                    modules: Vec::new(),
                });
                self.in_dynamic_analysis = has_children;
            }
            b"manual-analysis" => {
                self.report.manual_analysis = Some(analysis_summary(xml::attributes(e)));
            }
            b"module" if self.in_dynamic_analysis => {
                let mut attrs = xml::attributes(e);
                if let Some(dynamic) = self.report.dynamic_analysis.as_mut() {
                    dynamic.modules.push(DynamicModule {
                        name: attrs.remove("name").unwrap_or_default(),
                        target_url: attrs.remove("target_url").unwrap_or_default(),
                    });
                }
            }
            b"category" if has_children => {
                let mut attrs = xml::attributes(e);
                self.context.category_name = attrs.remove("categoryname").unwrap_or_default();
            }
            b"cwe" if has_children => {
                let mut attrs = xml::attributes(e);
                self.context.cwe_id = attrs.remove("cweid").unwrap_or_default();
                self.context.cwe_name = attrs.remove("cwename").unwrap_or_default();
            }
            b"customfield" => {
                let mut attrs = xml::attributes(e);
                self.report.custom_fields.push(CustomField {
                    name: attrs.remove("name").unwrap_or_default(),
                    value: attrs.remove("value").unwrap_or_default(),
                });
            }
            b"flaw" => {
                let flaw =
                    flaw_from_attributes(xml::attributes(e), &self.context, &self.report.policy_name);
                self.report.flaws.push(flaw);
            }
            _ => {}
        }
    }

    fn end_element(&mut self, e: &BytesEnd<'_>) {
        match e.local_name().as_ref() {
            b"dynamic-analysis" => self.in_dynamic_analysis = false,
            b"category" => self.context.category_name.clear(),
            b"cwe" => {
                self.context.cwe_id.clear();
                self.context.cwe_name.clear();
            }
            _ => {}
        }
    }
}

fn analysis_summary(mut attrs: HashMap<String, String>) -> AnalysisSummary {
    AnalysisSummary {
        submitted_date: attrs.remove("submitted_date").unwrap_or_default(),
        published_date: attrs.remove("published_date"),
        rating: attrs.remove("rating"),
        score: attrs.remove("score"),
    }
}

fn flaw_from_attributes(
    mut attrs: HashMap<String, String>,
    context: &FlawContext,
    report_policy_name: &str,
) -> Flaw {
    let mut take = |key: &str| attrs.remove(key).unwrap_or_default();

    let mut flaw = Flaw {
        issueid: take("issueid"),
        category_name: take("categoryname"),
        cwe_name: take("cwename"),
        cwe_id: take("cweid"),
        remediation_status: take("remediation_status"),
        mitigation_status: take("mitigation_status"),
        policy_name: take("policy_name"),
        affects_policy_compliance: take("affects_policy_compliance"),
        date_first_occurrence: take("date_first_occurrence"),
        severity: take("severity"),
        exploit_level: take("exploitLevel"),
        module: take("module"),
        source_file: take("sourcefile"),
        line: take("line"),
        flaw_url: take("url"),
        description: take("description"),
    };

    if flaw.category_name.is_empty() {
        flaw.category_name = context.category_name.clone();
    }
    if flaw.cwe_name.is_empty() {
        flaw.cwe_name = context.cwe_name.clone();
    }
    if flaw.cwe_id.is_empty() {
        flaw.cwe_id = context.cwe_id.clone();
    }
    if flaw.policy_name.is_empty() {
        flaw.policy_name = report_policy_name.to_string();
    }

    flaw
}

/// Parse a `detailedreport.do` response.
pub fn parse_detailed_report(xml: &str) -> Result<DetailedReport, ReportError> {
    if let Some(message) =
        xml::error_message(xml).map_err(|e| ReportError::XmlParsingError(e.to_string()))?
    {
        return Err(ReportError::NotReady(message));
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut builder = ReportBuilder::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => builder.element(e, true),
            Ok(Event::Empty(ref e)) => builder.element(e, false),
            Ok(Event::End(ref e)) => builder.end_element(e),
            Ok(Event::Eof) => break,
            Err(e) => return Err(ReportError::XmlParsingError(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !builder.saw_root {
        return Err(ReportError::XmlParsingError(
            "missing <detailedreport> element".to_string(),
        ));
    }

    let report = builder.report;
    debug!(
        "Parsed detailed report for build {}: {} flaws, {} custom fields",
        report.build_id,
        report.flaws.len(),
        report.custom_fields.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<detailedreport xmlns="https://www.veracode.com/schema/reports/export/1.0" report_format_version="1.5"
    app_name="Portal" app_id="101" build_id="1003" policy_name="Corporate Policy" version="v3">
  <static-analysis rating="B" score="88" submitted_date="2024-03-01 10:00:00 UTC" published_date="2024-03-01 11:00:00 UTC">
    <modules>
      <module name="portal.war" compiler="JAVAC_8" os="Java J2SE 8" architecture="JVM"/>
    </modules>
  </static-analysis>
  <dynamic-analysis rating="A" score="95" submitted_date="2024-03-02 09:00:00 UTC">
    <modules>
      <module name="dynamic_analysis" target_url="https://portal.example.com/app"/>
      <module name="dynamic_analysis" target_url="https://portal.example.com/admin"/>
    </modules>
  </dynamic-analysis>
  <manual-analysis rating="C" score="70" submitted_date="2024-02-20 08:00:00 UTC"/>
  <severity level="4">
    <category categoryid="19" categoryname="SQL Injection" pcirelated="true">
      <desc><para text="SQL injection flaws occur when..."/></desc>
      <cwe cweid="89" cwename="Improper Neutralization of Special Elements used in an SQL Command" pcirelated="true">
        <description><text text="This database query contains a SQL injection flaw."/></description>
        <staticflaws>
          <flaw severity="4" categoryname="SQL Injection" count="1" issueid="12" module="portal.war"
                description="Query built from &quot;user&quot; input" cweid="89" exploitLevel="1"
                date_first_occurrence="2024-01-05 10:00:00 UTC" remediation_status="Open"
                affects_policy_compliance="true" mitigation_status="none" sourcefile="UserDao.java" line="42"/>
          <flaw severity="4" count="1" issueid="13" module="portal.war" cweid="89" exploitLevel="0"
                remediation_status="Fixed" affects_policy_compliance="false" mitigation_status="accepted"
                sourcefile="OrderDao.java" line="7">
            <mitigations><mitigation action="Mitigate by Design" description="ok" user="u" date="d"/></mitigations>
          </flaw>
        </staticflaws>
        <dynamicflaws>
          <flaw severity="4" categoryname="SQL Injection" issueid="20" module="dynamic_analysis"
                url="https://portal.example.com/app/search?q=1" remediation_status="New"
                affects_policy_compliance="true" mitigation_status="none" exploitLevel="2"/>
        </dynamicflaws>
      </cwe>
    </category>
  </severity>
  <customfields>
    <customfield name="Business Unit" value="Finance"/>
    <customfield name="Owner" value="Team A"/>
  </customfields>
</detailedreport>"#;

    #[test]
    fn test_parse_report_header_and_analyses() {
        let report = parse_detailed_report(REPORT_XML).unwrap();

        assert_eq!(report.app_id, "101");
        assert_eq!(report.app_name, "Portal");
        assert_eq!(report.build_id, "1003");
        assert_eq!(report.policy_name, "Corporate Policy");
        assert_eq!(report.static_submitted_date(), "2024-03-01 10:00:00 UTC");
        assert_eq!(report.dynamic_submitted_date(), "2024-03-02 09:00:00 UTC");
        assert_eq!(report.manual_submitted_date(), "2024-02-20 08:00:00 UTC");
        assert_eq!(report.dynamic_target_url(), "https://portal.example.com/app");
        assert_eq!(report.dynamic_analysis.as_ref().unwrap().modules.len(), 2);
    }

    #[test]
    fn test_parse_report_custom_fields_in_order() {
        let report = parse_detailed_report(REPORT_XML).unwrap();

        assert_eq!(
            report.custom_fields,
            vec![
                CustomField::new("Business Unit", "Finance"),
                CustomField::new("Owner", "Team A"),
            ]
        );
    }

    #[test]
    fn test_parse_report_flaws_inherit_context() {
        let report = parse_detailed_report(REPORT_XML).unwrap();

        assert_eq!(report.flaws.len(), 3);

        let first = &report.flaws[0];
        assert_eq!(first.issueid, "12");
        assert_eq!(first.category_name, "SQL Injection");
        assert_eq!(
            first.cwe_name,
            "Improper Neutralization of Special Elements used in an SQL Command"
        );
        assert_eq!(first.cwe_id, "89");
        assert_eq!(first.policy_name, "Corporate Policy");
        assert_eq!(first.description, "Query built from \"user\" input");
        assert_eq!(first.exploit_level, "1");
        assert_eq!(first.source_file, "UserDao.java");
        assert_eq!(first.line, "42");

        // categoryname omitted on the flaw itself
        let second = &report.flaws[1];
        assert_eq!(second.issueid, "13");
        assert_eq!(second.category_name, "SQL Injection");
        assert_eq!(second.remediation_status, "Fixed");
        assert_eq!(second.mitigation_status, "accepted");
        assert_eq!(second.affects_policy_compliance, "false");

        let dynamic = &report.flaws[2];
        assert_eq!(dynamic.module, "dynamic_analysis");
        assert_eq!(dynamic.flaw_url, "https://portal.example.com/app/search?q=1");
    }

    #[test]
    fn test_static_modules_are_not_dynamic_targets() {
        let xml = r#"<detailedreport app_id="1" build_id="2">
  <static-analysis submitted_date="s"><modules><module name="a.jar"/></modules></static-analysis>
</detailedreport>"#;

        let report = parse_detailed_report(xml).unwrap();

        assert!(report.dynamic_analysis.is_none());
        assert_eq!(report.dynamic_target_url(), "");
        assert_eq!(report.dynamic_submitted_date(), "");
        assert_eq!(report.manual_submitted_date(), "");
        assert!(report.flaws.is_empty());
        assert!(report.custom_fields.is_empty());
    }

    #[test]
    fn test_error_document_is_not_ready() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<error>No report available.</error>"#;

        let err = parse_detailed_report(xml).unwrap_err();

        assert!(err.is_not_ready());
        assert_eq!(err.to_string(), "Report not available: No report available.");
    }

    #[test]
    fn test_unexpected_document_is_rejected() {
        let err = parse_detailed_report("<summaryreport app_id=\"1\"/>").unwrap_err();
        assert!(matches!(err, ReportError::XmlParsingError(_)));
        assert!(!err.is_not_ready());
    }
}
