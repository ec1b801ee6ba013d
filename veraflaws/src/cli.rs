//! CLI argument parsing for veraflaws
use chrono::{DateTime, TimeZone};
use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use veracode_platform::VeracodeRegion;

use crate::driver::RunConfig;
use crate::filter::FilterOptions;
use crate::writer::WriteFailurePolicy;

/// Output name that selects a timestamped file name
pub const DEFAULT_OUTPUT_NAME: &str = "default";

#[derive(Parser, Debug)]
#[command(
    name = "veraflaws",
    version,
    about = "Export Veracode flaws to CSV",
    long_about = "Exports the flaws of the most recent completed build of every application in a Veracode account to a single CSV file",
    after_help = "CREDENTIALS:
  --credsFile reads veracode_api_key_id / veracode_api_key_secret from a
  Veracode credentials file ([default] profile). Without it the
  VERACODE_API_ID and VERACODE_API_KEY environment variables are used.

EXAMPLES:
  # Open, policy-violating, unmitigated flaws of every application
  veraflaws --credsFile ~/.veracode/credentials

  # Dynamic flaws only, including mitigated ones, with descriptions
  veraflaws --dynamic --mitigated --desc --outputFileName dast.csv"
)]
pub struct Args {
    /// Path to a Veracode credentials file
    #[arg(long = "credsFile", default_value = "")]
    pub creds_file: String,

    /// Include flaws that do not affect policy compliance
    #[arg(long = "nonpv")]
    pub include_non_policy_violating: bool,

    /// Include flaws with an accepted mitigation
    #[arg(long = "mitigated")]
    pub include_mitigated: bool,

    /// Only export static flaws
    #[arg(long = "static")]
    pub static_only: bool,

    /// Only export dynamic flaws
    #[arg(long = "dynamic")]
    pub dynamic_only: bool,

    /// Append the flaw description column
    #[arg(long = "desc")]
    pub include_descriptions: bool,

    /// Output file; "default" writes allVeracodeFlaws_<timestamp>.csv
    #[arg(long = "outputFileName", default_value = DEFAULT_OUTPUT_NAME)]
    pub output_file_name: String,

    /// Veracode region (commercial, european, federal)
    #[arg(long, default_value = "commercial", value_parser = clap::value_parser!(VeracodeRegion))]
    pub region: VeracodeRegion,

    /// Abort the run when a row cannot be written instead of logging it
    #[arg(long)]
    pub strict_writes: bool,
}

impl Args {
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            include_non_policy_violating: self.include_non_policy_violating,
            include_mitigated: self.include_mitigated,
            static_only: self.static_only,
            dynamic_only: self.dynamic_only,
        }
    }

    /// The output path, with `"default"` replaced by a name stamped with `now`.
    pub fn resolve_output_path<Tz>(&self, now: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        if self.output_file_name == DEFAULT_OUTPUT_NAME {
            PathBuf::from(format!(
                "allVeracodeFlaws_{}.csv",
                now.format("%Y%m%d_%H%M%S")
            ))
        } else {
            PathBuf::from(&self.output_file_name)
        }
    }

    pub fn write_failure_policy(&self) -> WriteFailurePolicy {
        if self.strict_writes {
            WriteFailurePolicy::Fail
        } else {
            WriteFailurePolicy::Log
        }
    }

    pub fn run_config<Tz>(&self, now: &DateTime<Tz>) -> RunConfig
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        RunConfig {
            filter: self.filter_options(),
            include_descriptions: self.include_descriptions,
            output_path: self.resolve_output_path(now),
            write_failure_policy: self.write_failure_policy(),
        }
    }
}
