//! Pipeline configuration.

use mangrove_core::MongoSettings;

/// Configuration for the validation pipeline.
///
/// Built once from the application settings and handed to the extractors
/// (through axum state) and the response layer (at construction). Nothing
/// in the pipeline reads configuration ambiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchemaConfig {
    /// Convert between camelCase wire keys and snake_case model fields.
    pub convert_casing: bool,
}

impl SchemaConfig {
    /// Builds the pipeline configuration from the application settings.
    #[must_use]
    pub fn from_settings(settings: &MongoSettings) -> Self {
        Self {
            convert_casing: settings.convert_casing,
        }
    }
}
