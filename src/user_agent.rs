//! User-Agent string shared by every request the tool sends.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/zzz-datagen";

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("zzz-datagen/{version} (fan-dataset-generator; +{PROJECT_UA_URL})")
}
