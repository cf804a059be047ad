//! Pattern-based entity extraction.
//!
//! Total over all inputs: a pattern that does not match simply leaves its key
//! out. When a pattern matches more than once the leftmost match wins.

use aura_core::Entities;
use once_cell::sync::Lazy;
use regex::Regex;

/// Specialization keywords recognized anywhere in a command.
pub const SPECIALIZATIONS: [&str; 6] = [
    "code",
    "quantum",
    "optimizer",
    "security",
    "documentation",
    "testing",
];

static FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z0-9_-]+\.[A-Za-z][A-Za-z0-9]*)\b").expect("Invalid file regex"));

static BACKEND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bibm_(?:fez|torino|kyoto|osaka|brisbane)\b").expect("Invalid backend regex")
});

static QUANTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+)\s*(shots?|iterations?|times?)\b").expect("Invalid quantity regex")
});

static QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("Invalid quoted regex"));

static SPECIALIZATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(code|quantum|optimizer|security|documentation|testing)\b")
        .expect("Invalid specialization regex")
});

static LANGUAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(typescript|javascript|python|rust|go|java)\b").expect("Invalid language regex")
});

/// Pull structured fields out of `text`.
///
/// Keys: `file`, `backend`, `text`, `specialization`, `language`, and one
/// key per quantity unit in singular form (`shot`, `iteration`, `time`).
pub fn extract(text: &str) -> Entities {
    let mut entities = Entities::new();

    if let Some(m) = FILE_RE.captures(text).and_then(|c| c.get(1)) {
        entities.insert_first("file", m.as_str());
    }

    if let Some(m) = BACKEND_RE.find(text) {
        entities.insert_first("backend", m.as_str().to_lowercase());
    }

    for caps in QUANTITY_RE.captures_iter(text) {
        let (Some(count), Some(unit)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let Ok(count) = count.as_str().parse::<u64>() else {
            continue;
        };
        let unit = unit.as_str().to_lowercase();
        let key = unit.strip_suffix('s').unwrap_or(&unit).to_string();
        entities.insert_first(key, count);
    }

    if let Some(caps) = QUOTED_RE.captures(text) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            entities.insert_first("text", m.as_str());
        }
    }

    if let Some(m) = SPECIALIZATION_RE.find(text) {
        entities.insert_first("specialization", m.as_str().to_lowercase());
    }

    if let Some(m) = LANGUAGE_RE.find(text) {
        entities.insert_first("language", m.as_str().to_lowercase());
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_command_entities() {
        let e = extract("deploy organism MyOrganism.dna on ibm_torino with 2048 shots");
        assert_eq!(e.text("file"), Some("MyOrganism.dna"));
        assert_eq!(e.text("backend"), Some("ibm_torino"));
        assert_eq!(e.number("shot"), Some(2048));
    }

    #[test]
    fn test_first_match_wins() {
        let e = extract("run a.dna then b.dna on IBM_KYOTO or ibm_fez, 10 shots then 20 shots");
        assert_eq!(e.text("file"), Some("a.dna"));
        assert_eq!(e.text("backend"), Some("ibm_kyoto"));
        assert_eq!(e.number("shot"), Some(10));
    }

    #[test]
    fn test_units_are_singularized() {
        let e = extract("optimize for 50 iterations, repeat 3 times, 1 shot");
        assert_eq!(e.number("iteration"), Some(50));
        assert_eq!(e.number("time"), Some(3));
        assert_eq!(e.number("shot"), Some(1));
    }

    #[test]
    fn test_quoted_text_either_quote_style() {
        assert_eq!(extract(r#"commit mutation "fix the bug""#).text("text"), Some("fix the bug"));
        assert_eq!(extract("generate code 'a login form'").text("text"), Some("a login form"));
    }

    #[test]
    fn test_specialization_leftmost_keyword() {
        let e = extract("spawn security agent for quantum work");
        assert_eq!(e.text("specialization"), Some("security"));
    }

    #[test]
    fn test_language_requires_whole_word() {
        assert_eq!(extract("generate python function").text("language"), Some("python"));
        assert!(!extract("a good day").contains("language"));
        assert_eq!(extract("write it in Rust").text("language"), Some("rust"));
    }

    #[test]
    fn test_no_patterns_yields_empty_map() {
        assert!(extract("list agents").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn test_version_numbers_are_not_files() {
        assert!(!extract("upgrade to 2.5 now").contains("file"));
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_extract_is_total(text in ".{0,200}") {
            let entities = extract(&text);
            for (key, _) in entities.iter() {
                prop_assert!(!key.is_empty());
            }
        }

        #[test]
        fn prop_shot_count_is_recovered(n in 0u32..100_000) {
            let entities = extract(&format!("run quantum job with {} shots", n));
            prop_assert_eq!(entities.number("shot"), Some(n as u64));
        }
    }
}
