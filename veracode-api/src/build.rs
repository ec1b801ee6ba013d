//! Build API functionality for Veracode platform.
//!
//! This module lists the build history of an application through the Veracode
//! Build XML API (`getbuildlist.do`, analysiscenter.veracode.com).

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{VeracodeClient, VeracodeError, xml};

/// Represents a Veracode build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    /// Build ID
    pub build_id: String,
    /// Application ID
    pub app_id: String,
    /// Build version
    pub version: Option<String>,
    /// Sandbox ID (if sandbox build)
    pub sandbox_id: Option<String>,
    /// Policy updated date
    pub policy_updated_date: Option<DateTime<Utc>>,
    /// Additional attributes
    pub attributes: HashMap<String, String>,
}

impl Build {
    /// Create a build with only an id, as used when the rest is unknown.
    pub fn new(app_id: impl Into<String>, build_id: impl Into<String>) -> Self {
        Self {
            build_id: build_id.into(),
            app_id: app_id.into(),
            version: None,
            sandbox_id: None,
            policy_updated_date: None,
            attributes: HashMap::new(),
        }
    }
}

/// List of builds, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildList {
    /// Account ID
    pub account_id: Option<String>,
    /// Application ID
    pub app_id: String,
    /// Application name
    pub app_name: Option<String>,
    /// List of builds
    pub builds: Vec<Build>,
}

/// Build specific error types
#[derive(Debug)]
pub enum BuildError {
    /// Veracode API error
    Api(VeracodeError),
    /// Application not found
    ApplicationNotFound,
    /// The API answered with an `<error>` document
    Rejected(String),
    /// XML parsing error
    XmlParsingError(String),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Api(err) => write!(f, "API error: {err}"),
            BuildError::ApplicationNotFound => write!(f, "Application not found"),
            BuildError::Rejected(msg) => write!(f, "Build list request rejected: {msg}"),
            BuildError::XmlParsingError(msg) => write!(f, "XML parsing error: {msg}"),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<VeracodeError> for BuildError {
    fn from(err: VeracodeError) -> Self {
        BuildError::Api(err)
    }
}

impl From<reqwest::Error> for BuildError {
    fn from(err: reqwest::Error) -> Self {
        BuildError::Api(VeracodeError::Http(err))
    }
}

/// Build API operations for Veracode platform
pub struct BuildApi<'a> {
    client: &'a VeracodeClient,
}

impl<'a> BuildApi<'a> {
    /// Create a new BuildApi instance
    pub fn new(client: &'a VeracodeClient) -> Self {
        Self { client }
    }

    /// Get the policy build history of an application.
    ///
    /// # Arguments
    ///
    /// * `app_id` - The application ID
    ///
    /// # Returns
    ///
    /// A `Result` containing the build list (oldest build first) or an error.
    pub async fn get_app_builds(&self, app_id: &str) -> Result<BuildList, BuildError> {
        let xml = self
            .client
            .get_xml("/api/5.0/getbuildlist.do", &[("app_id", app_id)])
            .await?;
        parse_build_list(&xml)
    }
}

/// Parse a `getbuildlist.do` response.
pub fn parse_build_list(xml: &str) -> Result<BuildList, BuildError> {
    if let Some(message) =
        xml::error_message(xml).map_err(|e| BuildError::XmlParsingError(e.to_string()))?
    {
        return if message.contains("Could not find") {
            Err(BuildError::ApplicationNotFound)
        } else {
            Err(BuildError::Rejected(message))
        };
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut build_list = BuildList {
        account_id: None,
        app_id: String::new(),
        app_name: None,
        builds: Vec::new(),
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"buildlist" => {
                    let mut attrs = xml::attributes(e);
                    build_list.account_id = attrs.remove("account_id");
                    build_list.app_id = attrs.remove("app_id").unwrap_or_default();
                    build_list.app_name = attrs.remove("app_name");
                }
                b"build" => {
                    let mut build = Build::new(build_list.app_id.clone(), String::new());

                    for (key, value) in xml::attributes(e) {
                        match key.as_str() {
                            "build_id" => build.build_id = value,
                            "version" => build.version = Some(value),
                            "sandbox_id" => build.sandbox_id = Some(value),
                            "policy_updated_date" => {
                                if let Ok(datetime) = DateTime::parse_from_rfc3339(&value) {
                                    build.policy_updated_date = Some(datetime.with_timezone(&Utc));
                                }
                            }
                            _ => {
                                build.attributes.insert(key, value);
                            }
                        }
                    }

                    if !build.build_id.is_empty() {
                        build_list.builds.push(build);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(BuildError::XmlParsingError(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(build_list)
}
