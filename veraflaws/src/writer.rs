//! CSV output with a lazily written header.
use log::warn;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{FlawsError, Result};
use crate::row::{FlawRow, header_record};

/// What happens when a single data row cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFailurePolicy {
    /// Log the failure and keep going
    #[default]
    Log,
    /// Abort the run
    Fail,
}

/// Writes flaw rows, emitting the header just before the first data row.
///
/// The header's custom field column is labelled from the first row written,
/// so a run without rows leaves the output empty.
///
/// Every record is encoded on its own and handed to the sink with a single
/// `write_all`, so a row that fails to write leaves no encoder state behind
/// and the rows after it stay whole.
pub struct ReportWriter<W: Write> {
    sink: W,
    encoder: csv::WriterBuilder,
    include_descriptions: bool,
    failure_policy: WriteFailurePolicy,
    header_written: bool,
    rows_written: usize,
    failed_rows: usize,
}

impl ReportWriter<File> {
    /// Create (or truncate) the output file at `path`.
    pub fn create(
        path: &Path,
        include_descriptions: bool,
        failure_policy: WriteFailurePolicy,
    ) -> Result<Self> {
        let file = File::create(path).map_err(|source| FlawsError::OutputFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(file, include_descriptions, failure_policy))
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W, include_descriptions: bool, failure_policy: WriteFailurePolicy) -> Self {
        let mut encoder = csv::WriterBuilder::new();
        encoder.terminator(csv::Terminator::Any(b'\n'));
        Self {
            sink,
            encoder,
            include_descriptions,
            failure_policy,
            header_written: false,
            rows_written: 0,
            failed_rows: 0,
        }
    }

    /// Encode one record, terminator included.
    fn encode(&self, record: Vec<&str>) -> csv::Result<Vec<u8>> {
        let mut encoder = self.encoder.from_writer(Vec::with_capacity(256));
        encoder.write_record(record)?;
        encoder
            .into_inner()
            .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()).into())
    }

    /// Write one data row, preceded by the header on the first call.
    ///
    /// A header failure is always fatal. A row failure is fatal only under
    /// [`WriteFailurePolicy::Fail`].
    pub fn write_row(&mut self, row: &FlawRow<'_>) -> Result<()> {
        if !self.header_written {
            let header =
                self.encode(header_record(row.custom_field_name, self.include_descriptions))?;
            self.sink.write_all(&header)?;
            self.header_written = true;
        }

        let written = match self.encode(row.to_record(self.include_descriptions)) {
            Ok(bytes) => self.sink.write_all(&bytes).map_err(csv::Error::from),
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => {
                self.rows_written += 1;
                Ok(())
            }
            Err(source) => match self.failure_policy {
                WriteFailurePolicy::Log => {
                    warn!("Failed to write row {}: {source}", row.unique_id);
                    self.failed_rows += 1;
                    Ok(())
                }
                WriteFailurePolicy::Fail => Err(FlawsError::RowWrite {
                    unique_id: row.unique_id.clone(),
                    source,
                }),
            },
        }
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn failed_rows(&self) -> usize {
        self.failed_rows
    }

    /// Flush the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Flush and hand back the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::ReportContext;
    use crate::selector::BuildSelection;
    use veracode_platform::{AppSummary, CustomField, DetailedReport, Flaw};

    /// Fails the write calls whose (zero-based) index is listed, accepts the rest.
    struct FlakySink {
        written: Vec<u8>,
        calls: usize,
        failing_calls: Vec<usize>,
    }

    impl FlakySink {
        fn failing_on(failing_calls: &[usize]) -> Self {
            Self {
                written: Vec::new(),
                calls: 0,
                failing_calls: failing_calls.to_vec(),
            }
        }
    }

    impl Write for FlakySink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let call = self.calls;
            self.calls += 1;
            if self.failing_calls.contains(&call) {
                return Err(io::Error::other("disk full"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn app() -> AppSummary {
        AppSummary {
            app_id: "7".to_string(),
            app_name: "Billing, Core".to_string(),
            policy_updated_date: None,
        }
    }

    fn selection(flaws: Vec<Flaw>) -> BuildSelection {
        BuildSelection {
            build_id: "70".to_string(),
            report: DetailedReport {
                custom_fields: vec![CustomField::new("Business Unit", "Finance")],
                flaws,
                ..Default::default()
            },
        }
    }

    fn flaw(issueid: &str, description: &str) -> Flaw {
        Flaw {
            issueid: issueid.to_string(),
            module: "core.jar".to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_rows_leaves_output_empty() {
        let writer = ReportWriter::new(Vec::new(), false, WriteFailurePolicy::Log);

        assert!(!writer.header_written());
        assert!(writer.into_inner().unwrap().is_empty());
    }

    #[test]
    fn test_header_written_once_before_rows() {
        let app = app();
        let selection = selection(vec![flaw("1", ""), flaw("2", "")]);
        let context = ReportContext::new(&app, &selection).unwrap();
        let mut writer = ReportWriter::new(Vec::new(), false, WriteFailurePolicy::Log);

        for flaw in &selection.report.flaws {
            writer.write_row(&context.project(flaw)).unwrap();
        }

        assert_eq!(writer.rows_written(), 2);
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("app_name,app_id,Business Unit,build_id,unique_id,"));
        assert!(lines[1].starts_with("\"Billing, Core\",7,Finance,70,7-1,1,static,"));
        assert!(lines[2].contains(",7-2,2,"));
        assert_eq!(output.matches("app_name").count(), 1);
    }

    #[test]
    fn test_description_is_quoted() {
        let app = app();
        let selection = selection(vec![flaw("1", "uses \"eval\"\nunsafely")]);
        let context = ReportContext::new(&app, &selection).unwrap();
        let mut writer = ReportWriter::new(Vec::new(), true, WriteFailurePolicy::Log);

        writer
            .write_row(&context.project(&selection.report.flaws[0]))
            .unwrap();

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert!(output.starts_with("app_name,"));
        assert!(output.contains(",flaw_url,description\n"));
        assert!(output.ends_with(",\"uses \"\"eval\"\"\nunsafely\"\n"));
    }

    #[test]
    fn test_header_failure_is_fatal() {
        let app = app();
        let selection = selection(vec![flaw("1", "")]);
        let context = ReportContext::new(&app, &selection).unwrap();
        let mut writer =
            ReportWriter::new(FlakySink::failing_on(&[0]), false, WriteFailurePolicy::Log);

        let result = writer.write_row(&context.project(&selection.report.flaws[0]));

        assert!(matches!(result, Err(FlawsError::Io(_))));
        assert!(!writer.header_written());
        assert_eq!(writer.rows_written(), 0);
    }

    #[test]
    fn test_rows_after_a_failed_row_stay_intact() {
        let app = app();
        let selection = selection(vec![flaw("1", ""), flaw("2", ""), flaw("3", "")]);
        let context = ReportContext::new(&app, &selection).unwrap();
        // call 0 is the header, call 1 the first row
        let mut writer =
            ReportWriter::new(FlakySink::failing_on(&[1]), false, WriteFailurePolicy::Log);

        for flaw in &selection.report.flaws {
            writer.write_row(&context.project(flaw)).unwrap();
        }

        assert_eq!(writer.rows_written(), 2);
        assert_eq!(writer.failed_rows(), 1);

        let sink = writer.into_inner().unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(sink.written.as_slice());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.len() == 23));
        assert_eq!(&records[0][0], "app_name");
        assert_eq!(&records[1][4], "7-2");
        assert_eq!(&records[2][4], "7-3");
    }

    #[test]
    fn test_row_failure_is_fatal_when_strict() {
        let app = app();
        let selection = selection(vec![flaw("1", "")]);
        let context = ReportContext::new(&app, &selection).unwrap();
        let mut writer =
            ReportWriter::new(FlakySink::failing_on(&[1]), false, WriteFailurePolicy::Fail);

        let result = writer.write_row(&context.project(&selection.report.flaws[0]));

        match result {
            Err(FlawsError::RowWrite { unique_id, .. }) => assert_eq!(unique_id, "7-1"),
            _ => panic!("expected RowWrite error"),
        }
        assert_eq!(writer.failed_rows(), 0);
    }

    #[test]
    fn test_create_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        let result = ReportWriter::create(&path, false, WriteFailurePolicy::Log);

        match result {
            Err(FlawsError::OutputFile { path: failed, .. }) => assert_eq!(failed, path),
            _ => panic!("expected OutputFile error"),
        }
    }
}
