//! Loading Veracode API credentials.
//!
//! Credentials come from a Veracode credentials file when `--credsFile` is
//! given, otherwise from the `VERACODE_API_ID` / `VERACODE_API_KEY`
//! environment variables.
use log::{debug, info};
use std::path::Path;
use veracode_platform::VeracodeCredentials;

const API_ID_KEY: &str = "veracode_api_key_id";
const API_KEY_KEY: &str = "veracode_api_key_secret";
const DEFAULT_PROFILE: &str = "default";

/// Custom error types for credential operations
#[derive(thiserror::Error, Debug)]
pub enum CredentialError {
    #[error("Credential validation failed: {field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("Missing required credentials: {missing}")]
    MissingCredentials { missing: String },

    #[error("Failed to read credentials file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Validate API credential with optimized character checking
pub fn validate_api_credential(value: &str, field_name: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{field_name} cannot be empty"));
    }

    if !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(format!(
            "{field_name} must contain only alphanumeric characters"
        ));
    }

    Ok(())
}

fn validated(api_id: String, api_key: String) -> Result<VeracodeCredentials, CredentialError> {
    for (value, field) in [(&api_id, API_ID_KEY), (&api_key, API_KEY_KEY)] {
        validate_api_credential(value, field).map_err(|message| {
            CredentialError::ValidationError {
                field: field.to_string(),
                message,
            }
        })?;
    }
    Ok(VeracodeCredentials::new(api_id, api_key))
}

/// `(api id, api key)` as read from a credentials file
type KeyPair = (Option<String>, Option<String>);

/// Keep the first value seen for each credential key.
fn set_once(pair: &mut KeyPair, key: &str, value: &str) {
    let entry = match key {
        API_ID_KEY => &mut pair.0,
        API_KEY_KEY => &mut pair.1,
        _ => return,
    };
    if entry.is_none() {
        *entry = Some(value.to_string());
    }
}

/// Parse the contents of a Veracode credentials file.
///
/// The file is INI-like:
///
/// ```text
/// [default]
/// veracode_api_key_id = <id>
/// veracode_api_key_secret = <key>
/// ```
///
/// Keys are taken from the `[default]` profile. A file without a `[default]`
/// section uses the first value found for each key.
pub fn parse_credentials_file(contents: &str) -> Result<VeracodeCredentials, CredentialError> {
    let mut section: Option<String> = None;
    let mut has_default = false;
    let mut first = KeyPair::default();
    let mut default = KeyPair::default();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            has_default |= name == DEFAULT_PROFILE;
            section = Some(name);
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        set_once(&mut first, key, value);
        if section.as_deref() == Some(DEFAULT_PROFILE) {
            set_once(&mut default, key, value);
        }
    }

    let (api_id, api_key) = if has_default { default } else { first };
    match (api_id, api_key) {
        (Some(api_id), Some(api_key)) => validated(api_id, api_key),
        (None, _) => Err(CredentialError::MissingCredentials {
            missing: API_ID_KEY.to_string(),
        }),
        (_, None) => Err(CredentialError::MissingCredentials {
            missing: API_KEY_KEY.to_string(),
        }),
    }
}

/// Load credentials from the `VERACODE_API_ID` / `VERACODE_API_KEY` environment variables.
pub fn load_veracode_credentials_from_env() -> Result<VeracodeCredentials, CredentialError> {
    debug!("Loading credentials from environment variables");

    let api_id =
        std::env::var("VERACODE_API_ID").map_err(|_| CredentialError::MissingCredentials {
            missing: "VERACODE_API_ID environment variable".to_string(),
        })?;

    let api_key =
        std::env::var("VERACODE_API_KEY").map_err(|_| CredentialError::MissingCredentials {
            missing: "VERACODE_API_KEY environment variable".to_string(),
        })?;

    validated(api_id, api_key)
}

/// Load credentials from `creds_file`, or from the environment when it is empty.
pub fn load_credentials(creds_file: &str) -> Result<VeracodeCredentials, CredentialError> {
    if creds_file.is_empty() {
        return load_veracode_credentials_from_env();
    }

    let path = Path::new(creds_file);
    let contents =
        std::fs::read_to_string(path).map_err(|source| CredentialError::ReadFailed {
            path: creds_file.to_string(),
            source,
        })?;

    let credentials = parse_credentials_file(&contents)?;
    info!("Loaded credentials from {}", path.display());
    Ok(credentials)
}
