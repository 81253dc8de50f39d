//! Diagnostic log format selection.
//!
//! Diagnostics always go to stderr. With [`LogFormat::Auto`] they follow the
//! report format chosen on the command line, so `--output json` yields JSON
//! on both streams and a machine consumer never parses mixed text.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Format of diagnostic log lines on stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Matches the report: JSON lines for JSON reports, compact otherwise.
    #[default]
    Auto,
    /// One human-readable line per event.
    Compact,
    /// One flattened JSON object per event.
    Json,
}

impl LogFormat {
    /// Returns `true` when events should be written as JSON, given whether the
    /// report on stdout is itself JSON.
    #[must_use]
    pub const fn emits_json(self, json_report: bool) -> bool {
        match self {
            Self::Auto => json_report,
            Self::Compact => false,
            Self::Json => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::LogFormat;

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("COMPACT", LogFormat::Compact)]
    #[case("auto", LogFormat::Auto)]
    fn parses_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
        let parsed: LogFormat = text.parse().expect("log format parses");
        assert_eq!(parsed, expected);
    }

    #[test]
    fn rejects_unknown_formats() {
        assert!("pretty".parse::<LogFormat>().is_err());
    }

    #[rstest]
    #[case(LogFormat::Auto, false, false)]
    #[case(LogFormat::Auto, true, true)]
    #[case(LogFormat::Compact, true, false)]
    #[case(LogFormat::Json, false, true)]
    fn json_follows_report_only_when_automatic(
        #[case] format: LogFormat,
        #[case] json_report: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(format.emits_json(json_report), expected);
    }
}
