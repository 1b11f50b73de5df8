use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::workflows::recruitment::{Candidate, CandidateId};

use super::roster::RosterRow;

/// Canonical form used whenever two names are compared: lower-cased,
/// diacritics stripped by NFD decomposition (letters that do not decompose,
/// like `ø`, survive), whitespace runs collapsed, ends trimmed. Empty input
/// yields the empty string.
pub fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let stripped: String = cleaned.nfd().filter(|ch| !is_combining_mark(*ch)).collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchConfidence {
    High,
    Low,
    None,
}

impl MatchConfidence {
    pub const fn label(self) -> &'static str {
        match self {
            MatchConfidence::High => "high",
            MatchConfidence::Low => "low",
            MatchConfidence::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchMethod {
    Email,
    NameAndPhone,
    None,
}

impl MatchMethod {
    pub const fn label(self) -> &'static str {
        match self {
            MatchMethod::Email => "Email",
            MatchMethod::NameAndPhone => "NameAndPhone",
            MatchMethod::None => "None",
        }
    }
}

/// Classification of one roster row against the existing candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterMatch {
    High { candidate_id: CandidateId },
    Low { candidate_id: CandidateId },
    None,
}

impl RosterMatch {
    pub const fn confidence(&self) -> MatchConfidence {
        match self {
            RosterMatch::High { .. } => MatchConfidence::High,
            RosterMatch::Low { .. } => MatchConfidence::Low,
            RosterMatch::None => MatchConfidence::None,
        }
    }

    pub const fn method(&self) -> MatchMethod {
        match self {
            RosterMatch::High { .. } => MatchMethod::Email,
            RosterMatch::Low { .. } => MatchMethod::NameAndPhone,
            RosterMatch::None => MatchMethod::None,
        }
    }
}

/// Tiered roster-row classifier, first match wins. Exact matching only:
/// recall is traded for precision, and low-confidence matches are surfaced
/// for human review instead of silently merged.
pub fn classify_row(row: &RosterRow, candidates: &[Candidate]) -> RosterMatch {
    let email = row.email.trim();
    if !email.is_empty() {
        if let Some(candidate) = candidates
            .iter()
            .find(|candidate| candidate.email.trim().eq_ignore_ascii_case(email))
        {
            return RosterMatch::High {
                candidate_id: candidate.id,
            };
        }
    }

    let phone = row.phone.as_deref().map(str::trim).unwrap_or("");
    if !phone.is_empty() {
        let name = normalize_name(&row.full_name);
        if !name.is_empty() {
            if let Some(candidate) = candidates.iter().find(|candidate| {
                normalize_name(&candidate.full_name) == name
                    && candidate
                        .phone
                        .as_deref()
                        .map(str::trim)
                        .is_some_and(|existing| existing.eq_ignore_ascii_case(phone))
            }) {
                return RosterMatch::Low {
                    candidate_id: candidate.id,
                };
            }
        }
    }

    RosterMatch::None
}

/// Result of linking one split document to the candidate list by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentMatch {
    Auto(CandidateId),
    Unmatched,
}

/// A document auto-matches only when exactly one candidate's normalized full
/// name equals the document's normalized name. Zero or several equally-named
/// candidates both escalate to manual assignment; ambiguity is never broken
/// arbitrarily.
pub fn match_document(name: &str, candidates: &[Candidate]) -> DocumentMatch {
    let target = normalize_name(name);
    if target.is_empty() {
        return DocumentMatch::Unmatched;
    }

    let mut matched = None;
    for candidate in candidates {
        if normalize_name(&candidate.full_name) == target {
            if matched.is_some() {
                return DocumentMatch::Unmatched;
            }
            matched = Some(candidate.id);
        }
    }

    match matched {
        Some(candidate_id) => DocumentMatch::Auto(candidate_id),
        None => DocumentMatch::Unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::recruitment::RecruitmentId;

    fn candidate(name: &str, email: &str, phone: Option<&str>) -> Candidate {
        let mut candidate =
            Candidate::new(RecruitmentId::generate(), name.to_string(), email.to_string());
        candidate.phone = phone.map(str::to_string);
        candidate
    }

    fn row(name: &str, email: &str, phone: Option<&str>) -> RosterRow {
        RosterRow {
            row_number: 2,
            full_name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            location: None,
            applied_on: None,
        }
    }

    #[test]
    fn normalizer_strips_diacritics_and_collapses_whitespace() {
        assert_eq!(normalize_name("  José   GARCÍA "), "jose garcia");
        assert_eq!(normalize_name("\u{feff}Mäkinen\u{200b}"), "makinen");
        assert_eq!(normalize_name("OLA\tNORDMANN"), "ola nordmann");
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn normalizer_preserves_non_decomposable_letters() {
        assert_eq!(normalize_name("Søren Ørsted"), "søren ørsted");
        assert_eq!(normalize_name("Łukasz"), "łukasz");
    }

    #[test]
    fn email_match_wins_over_name_and_phone() {
        let by_email = candidate("Alice Stone", "alice@example.com", Some("555-0100"));
        let by_phone = candidate("Dana Reyes", "dana@example.com", Some("555-0200"));
        let candidates = vec![by_email.clone(), by_phone];

        let classified = classify_row(
            &row("Dana Reyes", "ALICE@example.com", Some("555-0200")),
            &candidates,
        );
        assert_eq!(
            classified,
            RosterMatch::High {
                candidate_id: by_email.id
            }
        );
        assert_eq!(classified.confidence(), MatchConfidence::High);
        assert_eq!(classified.method().label(), "Email");
    }

    #[test]
    fn name_and_phone_match_is_low_confidence() {
        let existing = candidate("Dana Reyes", "dana@example.com", Some("555-0200"));
        let candidates = vec![existing.clone()];

        let classified = classify_row(
            &row("DANA   reyes", "dana.reyes@other.com", Some("555-0200")),
            &candidates,
        );
        assert_eq!(
            classified,
            RosterMatch::Low {
                candidate_id: existing.id
            }
        );
        assert_eq!(classified.method().label(), "NameAndPhone");
    }

    #[test]
    fn rows_without_phone_never_reach_the_low_tier() {
        let existing = candidate("Dana Reyes", "dana@example.com", Some("555-0200"));
        let classified = classify_row(
            &row("Dana Reyes", "dana.reyes@other.com", None),
            &[existing],
        );
        assert_eq!(classified, RosterMatch::None);
        assert_eq!(classified.method().label(), "None");
    }

    #[test]
    fn document_matching_requires_exactly_one_candidate() {
        let only = candidate("Priya Nair", "priya@example.com", None);
        assert_eq!(
            match_document("PRIYA   NAIR", &[only.clone()]),
            DocumentMatch::Auto(only.id)
        );

        let twin_a = candidate("Chris Lund", "a@example.com", None);
        let twin_b = candidate("Chris  Lund", "b@example.com", None);
        assert_eq!(
            match_document("Chris Lund", &[twin_a, twin_b]),
            DocumentMatch::Unmatched
        );

        assert_eq!(match_document("Unknown Person", &[only]), DocumentMatch::Unmatched);
        assert_eq!(match_document("", &[]), DocumentMatch::Unmatched);
    }
}
