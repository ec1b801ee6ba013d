//! # Veracode API Client Library
//!
//! A Rust client for the Veracode XML APIs (analysiscenter.veracode.*) that expose
//! an account's application inventory, the build history of each application and
//! the detailed flaw report of a build.
//!
//! This library handles HMAC authentication, regional endpoint routing and
//! decoding of the XML responses into plain Rust data types.
//!
//! ## Features
//!
//! - 🔐 **HMAC Authentication** - Built-in support for Veracode API credentials
//! - 🌍 **Multi-Regional Support** - Commercial, European and Federal endpoints
//! - 📱 **Application list** - `getapplist.do`
//! - 🏗️ **Build list** - `getbuildlist.do`
//! - 📋 **Detailed report** - `detailedreport.do`, including flaws, custom fields
//!   and per-analysis submission dates
//!
//! ## Quick Start
//!
//! ```no_run
//! use veracode_platform::{VeracodeConfig, VeracodeClient, VeracodeRegion};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VeracodeConfig::new("your_api_id", "your_api_key")
//!         .with_region(VeracodeRegion::Commercial);
//!
//!     let client = VeracodeClient::new(config)?;
//!
//!     let apps = client.app_api().get_app_list().await?;
//!     for app in &apps {
//!         let builds = client.build_api().get_app_builds(&app.app_id).await?;
//!         if let Some(latest) = builds.builds.last() {
//!             let report = client.report_api().get_detailed_report(&latest.build_id).await?;
//!             println!("{}: {} flaws", app.app_name, report.flaws.len());
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod build;
pub mod client;
pub mod report;
mod xml;

use reqwest::Error as ReqwestError;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

// Re-export common types for convenience
pub use app::{AppApi, AppSummary};
pub use build::{Build, BuildApi, BuildError, BuildList};
pub use client::VeracodeClient;
pub use report::{
    AnalysisSummary, CustomField, DetailedReport, DynamicAnalysis, DynamicModule, Flaw,
    ReportApi, ReportError,
};

/// Custom error type for Veracode API operations.
///
/// This enum represents all possible errors that can occur when talking to
/// the Veracode XML APIs.
#[derive(Debug)]
pub enum VeracodeError {
    /// HTTP request failed
    Http(ReqwestError),
    /// XML response could not be decoded
    Xml(String),
    /// Authentication error (invalid credentials, signature generation failure, etc.)
    Authentication(String),
    /// API returned an error response
    InvalidResponse(String),
    /// Configuration is invalid
    InvalidConfig(String),
}

impl VeracodeClient {
    /// Get an application list API instance.
    pub fn app_api(&self) -> AppApi<'_> {
        AppApi::new(self)
    }

    /// Get a build API instance.
    pub fn build_api(&self) -> BuildApi<'_> {
        BuildApi::new(self)
    }

    /// Get a detailed report API instance.
    pub fn report_api(&self) -> ReportApi<'_> {
        ReportApi::new(self)
    }
}

impl fmt::Display for VeracodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VeracodeError::Http(e) => write!(f, "HTTP error: {e}"),
            VeracodeError::Xml(e) => write!(f, "XML parsing error: {e}"),
            VeracodeError::Authentication(e) => write!(f, "Authentication error: {e}"),
            VeracodeError::InvalidResponse(e) => write!(f, "Invalid response: {e}"),
            VeracodeError::InvalidConfig(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for VeracodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VeracodeError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReqwestError> for VeracodeError {
    fn from(error: ReqwestError) -> Self {
        VeracodeError::Http(error)
    }
}

/// API credentials held as secrets so they never leak through `Debug`.
#[derive(Clone)]
pub struct VeracodeCredentials {
    api_id: SecretString,
    api_key: SecretString,
}

impl VeracodeCredentials {
    pub fn new(api_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_id: SecretString::from(api_id.into()),
            api_key: SecretString::from(api_key.into()),
        }
    }

    pub fn expose_api_id(&self) -> &str {
        self.api_id.expose_secret()
    }

    pub fn expose_api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl fmt::Debug for VeracodeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VeracodeCredentials")
            .field("api_id", &"[REDACTED]")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Configuration for the Veracode API client.
///
/// Holds the credentials, the regional XML endpoint and the HTTP settings.
#[derive(Debug, Clone)]
pub struct VeracodeConfig {
    /// API id and key
    pub credentials: VeracodeCredentials,
    /// XML API base URL (analysiscenter.veracode.*)
    pub base_url: String,
    /// Veracode region for your account
    pub region: VeracodeRegion,
    /// Whether to validate TLS certificates (default: true)
    pub validate_certificates: bool,
    /// Connect timeout in seconds
    pub connect_timeout: u64,
    /// Whole-request timeout in seconds. Detailed reports for large
    /// applications can take minutes to render.
    pub request_timeout: u64,
}

/// Veracode regions for API access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VeracodeRegion {
    /// Commercial region (default) - analysiscenter.veracode.com
    #[default]
    Commercial,
    /// European region - analysiscenter.veracode.eu
    European,
    /// US Federal region - analysiscenter.veracode.us
    Federal,
}

impl VeracodeRegion {
    /// XML API base URL for this region.
    pub fn xml_base_url(self) -> &'static str {
        match self {
            VeracodeRegion::Commercial => "https://analysiscenter.veracode.com",
            VeracodeRegion::European => "https://analysiscenter.veracode.eu",
            VeracodeRegion::Federal => "https://analysiscenter.veracode.us",
        }
    }
}

impl std::str::FromStr for VeracodeRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "commercial" => Ok(VeracodeRegion::Commercial),
            "european" | "eu" => Ok(VeracodeRegion::European),
            "federal" | "us" => Ok(VeracodeRegion::Federal),
            other => Err(format!(
                "Invalid region '{other}'. Valid values: commercial, european, federal"
            )),
        }
    }
}

impl VeracodeConfig {
    /// Create a new configuration for the Commercial region.
    ///
    /// # Arguments
    ///
    /// * `api_id` - Your Veracode API ID
    /// * `api_key` - Your Veracode API key
    pub fn new(api_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::from_credentials(VeracodeCredentials::new(api_id, api_key))
    }

    /// Create a new Commercial-region configuration from existing credentials.
    pub fn from_credentials(credentials: VeracodeCredentials) -> Self {
        Self {
            credentials,
            base_url: VeracodeRegion::Commercial.xml_base_url().to_string(),
            region: VeracodeRegion::Commercial,
            validate_certificates: true,
            connect_timeout: 30,
            request_timeout: 600,
        }
    }

    /// Set the region for this configuration, updating the base URL to match.
    pub fn with_region(mut self, region: VeracodeRegion) -> Self {
        self.region = region;
        self.base_url = region.xml_base_url().to_string();
        self
    }

    /// Override the base URL, e.g. to point at a local test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Disable certificate validation for development environments.
    ///
    /// WARNING: This should only be used in development environments with
    /// self-signed certificates. Never use this in production.
    pub fn with_certificate_validation_disabled(mut self) -> Self {
        self.validate_certificates = false;
        self
    }

    /// Set connect and request timeouts, in seconds.
    pub fn with_timeouts(mut self, connect_timeout: u64, request_timeout: u64) -> Self {
        self.connect_timeout = connect_timeout;
        self.request_timeout = request_timeout;
        self
    }
}
