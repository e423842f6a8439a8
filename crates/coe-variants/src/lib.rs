//! Deterministic name-variant generation plus the similarity metric the
//! collision radar uses to score near-collisions.

use rphonetic::{DoubleMetaphone, Encoder};
use unicode_normalization::UnicodeNormalization;

const HOMOGLYPH_CAP: usize = 12;
const EDIT_DISTANCE_CAP: usize = 20;
const EDIT_DISTANCE_ALPHABET: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '-',
];

/// Category order, then lexicographic within each category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSet {
    pub normalized: String,
    pub tokenized: Vec<String>,
    pub phonetic: String,
    pub homoglyph: Vec<String>,
    pub edit_distance: Vec<String>,
}

impl VariantSet {
    /// All variants in category order, each category lexicographically sorted.
    #[must_use]
    pub fn ordered(&self) -> Vec<String> {
        let mut out = vec![self.normalized.clone()];
        out.extend(sorted(self.tokenized.clone()));
        out.push(self.phonetic.clone());
        out.extend(sorted(self.homoglyph.clone()));
        out.extend(sorted(self.edit_distance.clone()));
        out
    }
}

fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v.dedup();
    v
}

/// Lowercase, NFKC, strip whitespace, collapse runs of `-_` to a single `-`.
#[must_use]
pub fn normalize(candidate: &str) -> String {
    let lower: String = candidate.nfkc().collect::<String>().to_lowercase();
    let no_whitespace: String = lower.chars().filter(|c| !c.is_whitespace()).collect();
    let mut out = String::with_capacity(no_whitespace.len());
    let mut prev_sep = false;
    for c in no_whitespace.chars() {
        if c == '-' || c == '_' {
            if !prev_sep {
                out.push('-');
            }
            prev_sep = true;
        } else {
            out.push(c);
            prev_sep = false;
        }
    }
    out
}

/// Split on non-alphanumeric runs; re-emit as hyphen-, underscore-, and
/// concatenated forms.
#[must_use]
pub fn tokenize(normalized: &str) -> Vec<String> {
    let tokens: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() < 2 {
        return Vec::new();
    }
    vec![tokens.join("-"), tokens.join("_"), tokens.concat()]
}

/// Double Metaphone primary key of the normalized form.
#[must_use]
pub fn phonetic(normalized: &str) -> String {
    let encoder = DoubleMetaphone::default();
    encoder.encode(normalized)
}

const HOMOGLYPH_TABLE: &[(&str, &[&str])] = &[
    ("0", &["o"]),
    ("o", &["0"]),
    ("1", &["l", "i"]),
    ("l", &["1", "i"]),
    ("i", &["1", "l"]),
    ("rn", &["m"]),
    ("m", &["rn"]),
    ("a", &["а"]),
    ("e", &["е"]),
    ("p", &["р"]),
    ("c", &["с"]),
    ("x", &["х"]),
    ("y", &["у"]),
];

/// Substitute each character/digraph with its confusables from a fixed
/// table, one substitution per variant, capped at [`HOMOGLYPH_CAP`].
#[must_use]
pub fn homoglyphs(normalized: &str) -> Vec<String> {
    let mut out = Vec::new();
    for (needle, replacements) in HOMOGLYPH_TABLE {
        let mut start = 0;
        while let Some(pos) = normalized[start..].find(needle) {
            let abs_pos = start + pos;
            for replacement in *replacements {
                let mut candidate = String::with_capacity(normalized.len());
                candidate.push_str(&normalized[..abs_pos]);
                candidate.push_str(replacement);
                candidate.push_str(&normalized[abs_pos + needle.len()..]);
                if candidate != normalized {
                    out.push(candidate);
                }
                if out.len() >= HOMOGLYPH_CAP {
                    out.sort();
                    out.dedup();
                    out.truncate(HOMOGLYPH_CAP);
                    return out;
                }
            }
            start = abs_pos + needle.len();
        }
    }
    out.sort();
    out.dedup();
    out.truncate(HOMOGLYPH_CAP);
    out
}

/// All strings at Damerau-Levenshtein distance 1 from `normalized`, using
/// `[a-z0-9-]`, capped at [`EDIT_DISTANCE_CAP`].
#[must_use]
pub fn edit_distance_one(normalized: &str) -> Vec<String> {
    let chars: Vec<char> = normalized.chars().collect();
    let mut out = Vec::new();

    // Deletions.
    for i in 0..chars.len() {
        let mut candidate = chars.clone();
        candidate.remove(i);
        out.push(candidate.into_iter().collect());
    }
    // Substitutions.
    for i in 0..chars.len() {
        for &a in EDIT_DISTANCE_ALPHABET {
            if a == chars[i] {
                continue;
            }
            let mut candidate = chars.clone();
            candidate[i] = a;
            out.push(candidate.into_iter().collect());
        }
    }
    // Insertions.
    for i in 0..=chars.len() {
        for &a in EDIT_DISTANCE_ALPHABET {
            let mut candidate = chars.clone();
            candidate.insert(i, a);
            out.push(candidate.into_iter().collect());
        }
    }
    // Transpositions of adjacent characters.
    for i in 0..chars.len().saturating_sub(1) {
        let mut candidate = chars.clone();
        candidate.swap(i, i + 1);
        out.push(candidate.into_iter().collect());
    }

    out.retain(|s: &String| s != normalized && !s.is_empty());
    out.sort();
    out.dedup();
    out.truncate(EDIT_DISTANCE_CAP);
    out
}

/// Builds the full, deterministically-ordered variant set for `candidate`.
#[must_use]
pub fn generate(candidate: &str) -> VariantSet {
    let normalized = normalize(candidate);
    VariantSet {
        tokenized: tokenize(&normalized),
        phonetic: phonetic(&normalized),
        homoglyph: homoglyphs(&normalized),
        edit_distance: edit_distance_one(&normalized),
        normalized,
    }
}

/// `1 − dist/len(max)` where `dist` is the Damerau-Levenshtein distance
/// between `a` and `b`. Used by the radar to score near-collisions.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let dist = strsim::damerau_levenshtein(a, b);
    1.0 - (dist as f64 / max_len as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_collapses_separators() {
        assert_eq!(normalize("My--Cool__Name"), "my-cool-name");
    }

    #[test]
    fn normalize_strips_whitespace() {
        assert_eq!(normalize(" foo bar "), "foobar");
    }

    #[test]
    fn tokenize_emits_three_forms_for_multi_token_input() {
        let forms = tokenize("foo-bar");
        assert!(forms.contains(&"foo-bar".to_string()));
        assert!(forms.contains(&"foo_bar".to_string()));
        assert!(forms.contains(&"foobar".to_string()));
    }

    #[test]
    fn tokenize_is_empty_for_single_token() {
        assert!(tokenize("foobar").is_empty());
    }

    #[test]
    fn homoglyphs_substitutes_confusables() {
        let variants = homoglyphs("foo");
        assert!(variants.iter().any(|v| v == "f0o"));
    }

    #[test]
    fn homoglyphs_respects_cap() {
        assert!(homoglyphs("0101010101rnrnrn").len() <= HOMOGLYPH_CAP);
    }

    #[test]
    fn edit_distance_one_respects_cap_and_excludes_self() {
        let variants = edit_distance_one("ab");
        assert!(!variants.contains(&"ab".to_string()));
        assert!(variants.len() <= EDIT_DISTANCE_CAP);
        assert!(!variants.is_empty());
    }

    #[test]
    fn similarity_is_one_for_identical_strings() {
        assert!((similarity("acme", "acme") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn similarity_degrades_with_distance() {
        assert!(similarity("acme", "acne") < 1.0);
        assert!(similarity("acme", "zzzz") < similarity("acme", "acne"));
    }

    #[test]
    fn generate_is_deterministic() {
        let a = generate("My Project");
        let b = generate("My Project");
        assert_eq!(a, b);
        assert_eq!(a.ordered(), b.ordered());
    }
}
