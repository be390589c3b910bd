//! JSON output formatting for machine-readable output.

use super::OutputConfig;
use serde::Serialize;

/// JSON output formatter
pub struct JsonOutput;

impl JsonOutput {
    /// Format data as JSON string
    ///
    /// Pretty-printed unless `config.compact` is set.
    pub fn format<T: Serialize + ?Sized>(data: &T, config: &OutputConfig) -> String {
        if config.compact {
            serde_json::to_string(data).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        } else {
            serde_json::to_string_pretty(data)
                .unwrap_or_else(|e| format!("{{\n  \"error\": \"{}\"\n}}", e))
        }
    }

    /// Wrap data in a standard response envelope
    pub fn format_envelope<T: Serialize>(data: &T, success: bool, config: &OutputConfig) -> String {
        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            success: bool,
            data: &'a T,
        }

        Self::format(&Envelope { success, data }, config)
    }
}
