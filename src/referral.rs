//! Plain-text referral summary built from a settled `SafetyAnalysis`, and a
//! WhatsApp share link carrying it.

use thiserror::Error;

use crate::models::SafetyAnalysis;

/// Longest conversation excerpt carried in a summary, in characters.
pub const MAX_EXCERPT_CHARS: usize = 500;

const WHATSAPP_BASE: &str = "https://wa.me/";

#[derive(Error, Debug)]
pub enum ReferralError {
    #[error("Could not build share link: {0}")]
    Link(String),
}

pub fn build_referral_summary(
    patient_name: &str,
    analysis: &SafetyAnalysis,
    excerpt: &str,
) -> String {
    let name = match patient_name.trim() {
        "" => "Unnamed patient",
        n => n,
    };
    let urgency = if analysis.is_emergency {
        "EMERGENCY: refer immediately"
    } else {
        "Routine follow-up"
    };

    let mut summary = format!("Referral for {name}\nUrgency: {urgency}\n\nRed flags:\n");
    if analysis.red_flags.is_empty() {
        summary.push_str("  none reported\n");
    } else {
        for (i, flag) in analysis.red_flags.iter().enumerate() {
            summary.push_str(&format!("  {}. {}\n", i + 1, flag));
        }
    }

    summary.push_str(&format!("\nRecommendation: {}\n", analysis.recommendation.trim()));

    let excerpt = truncate_excerpt(excerpt);
    if !excerpt.is_empty() {
        summary.push_str(&format!("\nConversation excerpt:\n{excerpt}\n"));
    }
    summary
}

/// `https://wa.me/?text=...` with the summary percent-encoded.
pub fn whatsapp_share_link(summary: &str) -> Result<String, ReferralError> {
    let mut url = reqwest::Url::parse_with_params(WHATSAPP_BASE, &[("text", summary)])
        .map_err(|e| ReferralError::Link(e.to_string()))?;
    // Form encoding writes spaces as '+'; literal '+' is already %2B.
    let query = url.query().map(|q| q.replace('+', "%20"));
    url.set_query(query.as_deref());
    Ok(url.to_string())
}

fn truncate_excerpt(excerpt: &str) -> String {
    let trimmed = excerpt.trim();
    if trimmed.chars().count() <= MAX_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX_EXCERPT_CHARS - 1).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emergency() -> SafetyAnalysis {
        SafetyAnalysis {
            is_emergency: true,
            red_flags: vec!["High fever (104.0°F)".into(), "Chest pain".into()],
            recommendation: "Refer to the district hospital now.".into(),
        }
    }

    #[test]
    fn summary_lists_flags_and_urgency() {
        let summary = build_referral_summary("Amina K.", &emergency(), "Fever since Monday.");
        assert!(summary.starts_with("Referral for Amina K.\nUrgency: EMERGENCY"));
        assert!(summary.contains("  1. High fever (104.0°F)\n  2. Chest pain\n"));
        assert!(summary.contains("Recommendation: Refer to the district hospital now."));
        assert!(summary.ends_with("Conversation excerpt:\nFever since Monday.\n"));
    }

    #[test]
    fn routine_summary_without_flags_or_excerpt() {
        let analysis = SafetyAnalysis {
            is_emergency: false,
            red_flags: vec![],
            recommendation: "Review in one week.".into(),
        };
        let summary = build_referral_summary("  ", &analysis, "   ");
        assert!(summary.starts_with("Referral for Unnamed patient\nUrgency: Routine"));
        assert!(summary.contains("none reported"));
        assert!(!summary.contains("Conversation excerpt"));
    }

    #[test]
    fn long_excerpt_is_capped() {
        let excerpt = "é".repeat(MAX_EXCERPT_CHARS + 50);
        let summary = build_referral_summary("P", &emergency(), &excerpt);
        let tail = summary.split("Conversation excerpt:\n").nth(1).unwrap().trim_end();
        assert_eq!(tail.chars().count(), MAX_EXCERPT_CHARS);
        assert!(tail.ends_with('…'));
    }

    #[test]
    fn share_link_round_trips_text() {
        let summary = build_referral_summary("Amina K.", &emergency(), "BP 150/95 & HR 110+");
        let link = whatsapp_share_link(&summary).unwrap();
        assert!(link.starts_with("https://wa.me/?text="));
        assert!(!link.contains(' '));
        assert!(!link.contains('+'));

        let parsed = reqwest::Url::parse(&link).unwrap();
        let text = parsed
            .query_pairs()
            .find(|(k, _)| k == "text")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(text, summary);
    }
}
