use regex::Regex;
use std::sync::OnceLock;

/// Abbreviations commonly used in the procedure spreadsheet
const EXPANSIONS: &[(&str, &str)] = &[
    ("NLF", "nasolabial fold"),
    ("Botox", "botulinum toxin"),
    ("Filler", "dermal filler"),
];

fn parenthetical_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([^(]+?)(?:\s*\((.+?)\))?\s*$").expect("valid regex"))
}

fn expand(term: &str) -> &str {
    EXPANSIONS
        .iter()
        .find(|(abbrev, _)| *abbrev == term)
        .map_or(term, |(_, full)| full)
}

/// Normalize a spreadsheet procedure name into a PubMed query.
///
/// A trailing parenthetical qualifier list becomes an OR clause ANDed to the
/// base term; known abbreviations are expanded in both positions. Input that
/// doesn't match the expected shape passes through unchanged.
///
/// `"Botox (glabella, forehead)"` -> `"botulinum toxin AND (glabella OR forehead)"`
pub fn normalize_query(raw: &str) -> String {
    let Some(caps) = parenthetical_re().captures(raw) else {
        return raw.to_string();
    };

    let base = expand(caps.get(1).map_or("", |m| m.as_str()).trim());
    if base.is_empty() {
        return raw.to_string();
    }

    match caps.get(2) {
        Some(subs) => {
            let parts: Vec<&str> = subs
                .as_str()
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(expand)
                .collect();
            if parts.is_empty() {
                base.to_string()
            } else {
                format!("{} AND ({})", base, parts.join(" OR "))
            }
        }
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_term_passes_through() {
        assert_eq!(normalize_query("Rhinoplasty"), "Rhinoplasty");
    }

    #[test]
    fn test_abbreviation_expansion() {
        assert_eq!(normalize_query("Botox"), "botulinum toxin");
        assert_eq!(normalize_query("Filler"), "dermal filler");
    }

    #[test]
    fn test_parenthetical_split() {
        assert_eq!(
            normalize_query("Botox (glabella, forehead, crow's feet)"),
            "botulinum toxin AND (glabella OR forehead OR crow's feet)"
        );
    }

    #[test]
    fn test_sub_term_expansion() {
        assert_eq!(
            normalize_query("Filler (lips, NLF, tear trough)"),
            "dermal filler AND (lips OR nasolabial fold OR tear trough)"
        );
    }

    #[test]
    fn test_empty_parenthetical_drops_clause() {
        assert_eq!(normalize_query("Rhinoplasty ( , )"), "Rhinoplasty");
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(
            normalize_query("  Rhinoplasty (primary open)  "),
            "Rhinoplasty AND (primary open)"
        );
    }

    proptest! {
        // Any base + qualifier list yields a non-empty base and each qualifier once.
        #[test]
        fn prop_qualifiers_appear_exactly_once(
            base in "[A-Za-z][A-Za-z ]{0,20}",
            quals in prop::collection::vec("[a-z]{3,10}", 1..5)
        ) {
            prop_assume!(!base.trim().is_empty());
            // Qualifiers must not contain each other or appear in the base,
            // so counting occurrences is meaningful
            for (i, a) in quals.iter().enumerate() {
                for (j, b) in quals.iter().enumerate() {
                    if i != j {
                        prop_assume!(!a.contains(b.as_str()));
                    }
                }
            }
            prop_assume!(!quals.iter().any(|q| base.contains(q.as_str())));

            let raw = format!("{} ({})", base.trim(), quals.join(", "));
            let normalized = normalize_query(&raw);

            prop_assert!(normalized.contains(" AND ("));
            let clause = normalized.split(" AND (").nth(1).unwrap();
            for q in &quals {
                prop_assert_eq!(clause.matches(q.as_str()).count(), 1);
            }
        }
    }
}
