//! Application inventory via the XML `getapplist.do` endpoint.
//!
//! The XML API returns every application profile visible to the credentials
//! in a single document, so there is no pagination to handle here.

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

use crate::client::VeracodeClient;
use crate::{VeracodeError, xml};

/// An application profile as listed by `getapplist.do`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSummary {
    /// Numeric application id, kept as the API's string form
    pub app_id: String,
    /// Application profile name
    pub app_name: String,
    /// Last time the application's policy evaluation changed
    pub policy_updated_date: Option<String>,
}

/// Application list operations
pub struct AppApi<'a> {
    client: &'a VeracodeClient,
}

impl<'a> AppApi<'a> {
    pub fn new(client: &'a VeracodeClient) -> Self {
        Self { client }
    }

    /// List every application in the account, in the order the API returns them.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API answers with an
    /// `<error>` document, or the XML cannot be decoded.
    pub async fn get_app_list(&self) -> Result<Vec<AppSummary>, VeracodeError> {
        let xml = self
            .client
            .get_xml("/api/5.0/getapplist.do", &[("include_user_info", "false")])
            .await?;
        parse_app_list(&xml)
    }
}

/// Parse a `getapplist.do` response.
pub fn parse_app_list(xml: &str) -> Result<Vec<AppSummary>, VeracodeError> {
    if let Some(message) =
        xml::error_message(xml).map_err(|e| VeracodeError::Xml(e.to_string()))?
    {
        return Err(VeracodeError::InvalidResponse(message));
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut apps = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) if e.local_name().as_ref() == b"app" => {
                let mut attrs = xml::attributes(e);
                if let Some(app_id) = attrs.remove("app_id") {
                    apps.push(AppSummary {
                        app_id,
                        app_name: attrs.remove("app_name").unwrap_or_default(),
                        policy_updated_date: attrs.remove("policy_updated_date"),
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(VeracodeError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(apps)
}
