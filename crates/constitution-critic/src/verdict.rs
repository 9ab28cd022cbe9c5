use serde::{Deserialize, Serialize};
use tracing::debug;

/// Marker a critique model may echo when it runs on into the revision step
pub const REVISION_REQUEST_MARKER: &str = "Revision request:";

/// Phrase a critique uses to signal the response is acceptable
pub const NO_CRITIQUE_NEEDED: &str = "no critique needed";

/// Isolate the critique sentence from trailing scaffolding.
///
/// Without a [`REVISION_REQUEST_MARKER`] the input comes back untouched.
/// Otherwise everything from the marker on is dropped, and then everything
/// from the first blank line on. The result is not trimmed.
pub fn parse_critique(raw: &str) -> &str {
    let Some(marker) = raw.find(REVISION_REQUEST_MARKER) else {
        return raw;
    };
    let before = &raw[..marker];
    match before.find("\n\n") {
        Some(blank) => &before[..blank],
        None => before,
    }
}

/// What the loop should do with a parsed critique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CritiqueVerdict {
    /// The critique is exactly "no critique needed": skip silently
    NoCritique,
    /// The critique mentions "no critique needed" among other text:
    /// recorded, but no revision is produced
    NoRevision { critique: String },
    /// The critique found something to fix
    Revise { critique: String },
}

impl CritiqueVerdict {
    /// Classify a parsed critique. Surrounding whitespace is trimmed first.
    ///
    /// The exact-match and substring checks are separate: a
    /// bare "No critique needed" leaves no trace entry, while
    /// "No critique needed." (or any longer text containing the phrase)
    /// does.
    pub fn classify(critique: &str) -> Self {
        let critique = critique.trim();
        let lower = critique.to_lowercase();

        let verdict = if lower == NO_CRITIQUE_NEEDED {
            CritiqueVerdict::NoCritique
        } else if lower.contains(NO_CRITIQUE_NEEDED) {
            CritiqueVerdict::NoRevision {
                critique: critique.to_string(),
            }
        } else {
            CritiqueVerdict::Revise {
                critique: critique.to_string(),
            }
        };

        debug!(verdict = %verdict.short_description(), "Classified critique");
        verdict
    }

    /// Parse raw critique output and classify it in one step
    pub fn from_raw(raw: &str) -> Self {
        Self::classify(parse_critique(raw))
    }

    pub fn needs_revision(&self) -> bool {
        matches!(self, CritiqueVerdict::Revise { .. })
    }

    pub fn critique(&self) -> Option<&str> {
        match self {
            CritiqueVerdict::NoCritique => None,
            CritiqueVerdict::NoRevision { critique } | CritiqueVerdict::Revise { critique } => {
                Some(critique)
            }
        }
    }

    /// Get a short description of the verdict for logging
    pub fn short_description(&self) -> &'static str {
        match self {
            CritiqueVerdict::NoCritique => "NO CRITIQUE",
            CritiqueVerdict::NoRevision { .. } => "NO REVISION",
            CritiqueVerdict::Revise { .. } => "REVISE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT_ONE: &str = " This text is bad.\n\n\tRevision request: Make it better.\n\t\n\tRevision:";
    const TEXT_TWO: &str = " This text is bad.\n\n";
    const TEXT_THREE: &str =
        " This text is bad.\n\t\n\tRevision request: Make it better.\n\t\n\tRevision: Better text";

    #[test]
    fn test_parse_strips_revision_scaffolding() {
        for raw in [TEXT_ONE, TEXT_TWO, TEXT_THREE] {
            let critique = parse_critique(raw);
            assert_eq!(critique.trim(), "This text is bad.", "failed on {raw:?}");
        }
    }

    #[test]
    fn test_parse_without_marker_is_identity() {
        assert_eq!(parse_critique(TEXT_TWO), TEXT_TWO);
        assert_eq!(parse_critique("X\n\n"), "X\n\n");
        assert_eq!(parse_critique(""), "");
    }

    #[test]
    fn test_parse_cuts_at_first_blank_line_before_marker() {
        let raw = "X\n\nRevision request: Y\n\nRevision: Z";
        assert_eq!(parse_critique(raw), "X");

        let raw = "First.\n\nSecond.\n\nRevision request: Y";
        assert_eq!(parse_critique(raw), "First.");
    }

    #[test]
    fn test_parse_keeps_text_without_blank_line() {
        let raw = "Needs fixing. Revision request: clarify. Revision:";
        assert_eq!(parse_critique(raw), "Needs fixing. ");
    }

    #[test]
    fn test_parse_is_case_sensitive_on_marker() {
        let raw = "Fine.\n\nrevision request: nothing";
        assert_eq!(parse_critique(raw), raw);
    }

    #[test]
    fn test_parse_idempotent_without_marker() {
        for raw in ["plain", "a\n\nb", "  padded  ", "No critique needed."] {
            let once = parse_critique(raw);
            assert_eq!(parse_critique(once), once);
        }
    }

    #[test]
    fn test_classify_exact_match_any_case() {
        assert_eq!(
            CritiqueVerdict::classify("no critique needed"),
            CritiqueVerdict::NoCritique
        );
        assert_eq!(
            CritiqueVerdict::classify("  No Critique Needed \n"),
            CritiqueVerdict::NoCritique
        );
    }

    // Trailing punctuation defeats the exact match and falls through to the
    // substring check, so the critique is still recorded.
    #[test]
    fn test_classify_trailing_period_is_substring_match() {
        assert_eq!(
            CritiqueVerdict::classify("No critique needed."),
            CritiqueVerdict::NoRevision {
                critique: "No critique needed.".into()
            }
        );
    }

    #[test]
    fn test_classify_embedded_phrase() {
        let verdict =
            CritiqueVerdict::classify("The style matches well. No critique needed. ");
        assert!(!verdict.needs_revision());
        assert_eq!(
            verdict.critique(),
            Some("The style matches well. No critique needed.")
        );
    }

    #[test]
    fn test_classify_revise() {
        let verdict = CritiqueVerdict::from_raw("Needs fixing. Revision request: clarify. Revision:");
        assert_eq!(
            verdict,
            CritiqueVerdict::Revise {
                critique: "Needs fixing.".into()
            }
        );
        assert!(verdict.needs_revision());
        assert_eq!(verdict.short_description(), "REVISE");
    }

    #[test]
    fn test_verdict_serializes_tagged() {
        let json = serde_json::to_value(CritiqueVerdict::Revise {
            critique: "fix".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "revise", "critique": "fix"}));
    }
}
