//! Error types for the extraction engine.

use thiserror::Error;

use crate::model::Language;

/// A required structure is absent from (or unreadable in) a payload.
///
/// Optional fields never produce this error; they default and may leave a
/// warning on the extracted record instead.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The envelope carries no page.
    #[error("{language} payload has no page")]
    MissingPage {
        /// Language of the payload.
        language: Language,
    },

    /// A required component is absent from every module.
    #[error("{language} payload is missing component '{component}'")]
    MissingComponent {
        /// Component id that was looked up.
        component: &'static str,
        /// Language of the payload.
        language: Language,
    },

    /// A component's embedded JSON document could not be decoded.
    #[error("{language} component '{component}' is malformed: {source}")]
    MalformedComponent {
        /// Component id whose data failed to decode.
        component: &'static str,
        /// Language of the payload.
        language: Language,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A required key is absent from the base-info list.
    #[error("{language} payload is missing required key '{key}'")]
    MissingKey {
        /// Semantic key name.
        key: &'static str,
        /// Language of the payload.
        language: Language,
    },
}

impl ExtractionError {
    /// Creates a missing-component error.
    #[must_use]
    pub fn missing_component(component: &'static str, language: Language) -> Self {
        Self::MissingComponent {
            component,
            language,
        }
    }

    /// Creates a malformed-component error.
    #[must_use]
    pub fn malformed(component: &'static str, language: Language, source: serde_json::Error) -> Self {
        Self::MalformedComponent {
            component,
            language,
            source,
        }
    }
}
