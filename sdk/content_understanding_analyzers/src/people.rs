//! Heuristic people counting from free-text image descriptions.
//!
//! The estimate is approximate. It looks for a quantity followed by a person
//! noun ("three women", "a group of 12 people") and otherwise falls back to a
//! handful of fixed phrases ("couple", "crowd"). When it misses, it
//! undercounts silently, usually returning 0. It never fails.
//!
//! Quantities are ASCII digits or English number words up to twenty. Digits
//! from other scripts ("٣ people") are not recognized.

use std::sync::LazyLock;

use regex::Regex;

use crate::analyzer::AnalysisResult;

const PERSON_NOUNS: &str = "people|persons|individuals|men|women|adults|children";

/// Quantity patterns in priority order; group 1 is the quantity token.
static COUNT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"(?:group of|crowd of)?\s*(\w+)\s+(?:{PERSON_NOUNS})"),
        format!(r"(\w+)\s+(?:{PERSON_NOUNS})"),
        format!(r"([0-9]+)\s+(?:{PERSON_NOUNS})"),
        r"(?:shows|depicts|contains|has|features)\s+(\w+)\s+(?:people|persons)".to_string(),
        r"(\w+)\s+(?:people|persons)\s+(?:sitting|standing|walking|gathered)".to_string(),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("people count pattern is valid"))
    .collect()
});

/// Phrase fallbacks, checked in order once no pattern resolved.
const PHRASE_ESTIMATES: &[(&[&str], u32)] = &[
    (&["couple"], 2),
    (&["trio", "three people"], 3),
    (&["quartet", "four people"], 4),
    (&["crowd", "many people"], 10),
    (&["few people"], 3),
    (&["several people"], 5),
];

const NUMBER_WORDS: [&str; 21] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
    "twenty",
];

/// Resolves a quantity token written as digits or as a number word up to twenty.
pub fn parse_quantity(token: &str) -> Option<u32> {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        return token.parse().ok();
    }

    NUMBER_WORDS
        .iter()
        .position(|word| *word == token)
        .and_then(|n| u32::try_from(n).ok())
}

/// Estimates how many people a description mentions.
///
/// ```rust
/// use content_understanding_analyzers::people::count_people;
///
/// assert_eq!(count_people("The photo shows five people at a table"), 5);
/// assert_eq!(count_people("A couple walking in the park"), 2);
/// assert_eq!(count_people("The weather is nice today"), 0);
/// ```
pub fn count_people(text: &str) -> u32 {
    let text = text.to_lowercase();

    for pattern in COUNT_PATTERNS.iter() {
        let Some(captures) = pattern.captures(&text) else {
            continue;
        };
        if let Some(count) = captures.get(1).and_then(|m| parse_quantity(m.as_str())) {
            return count;
        }
    }

    PHRASE_ESTIMATES
        .iter()
        .find(|(phrases, _)| phrases.iter().any(|phrase| text.contains(phrase)))
        .map(|(_, estimate)| *estimate)
        .unwrap_or(0)
}

/// Description of an analyzed image, ready for [`count_people`].
///
/// Uses the `Summary` field when the analyzer produced one and the content
/// markdown otherwise.
pub fn describe_image(result: &AnalysisResult) -> Option<String> {
    result.description().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_image_prefers_summary() {
        let result = AnalysisResult::new(json!({
            "result": {"contents": [{
                "markdown": "![image](x)",
                "fields": {"Summary": {"type": "string", "valueString": "Two men talking"}}
            }]}
        }));
        assert_eq!(describe_image(&result).as_deref(), Some("Two men talking"));

        let markdown_only = AnalysisResult::new(json!({
            "result": {"contents": [{"markdown": "A crowd at a concert"}]}
        }));
        assert_eq!(describe_image(&markdown_only).as_deref(), Some("A crowd at a concert"));
        assert_eq!(describe_image(&AnalysisResult::new(json!({}))), None);
    }

    #[test]
    fn test_digits_and_number_words_up_to_twenty() {
        for (n, word) in NUMBER_WORDS.iter().enumerate() {
            let n = n as u32;
            assert_eq!(count_people(&format!("{n} people")), n, "digits {n}");
            assert_eq!(count_people(&format!("{word} people")), n, "word {word}");
            assert_eq!(
                count_people(&format!("The image shows {word} people on a beach")),
                n,
                "embedded {word}"
            );
        }
    }

    #[test]
    fn test_non_ascii_digits_are_not_quantities() {
        assert_eq!(parse_quantity("٣"), None);
        assert_eq!(count_people("٣ people"), 0);
        assert_eq!(count_people("٣ people and 4 children"), 4);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(count_people("THREE WOMEN and a dog"), 3);
    }

    #[test]
    fn test_fixed_phrase_fallbacks() {
        assert_eq!(count_people("a couple walking in the park"), 2);
        assert_eq!(count_people("a trio of musicians"), 3);
        assert_eq!(count_people("a string quartet rehearsing"), 4);
        assert_eq!(count_people("a large crowd gathered"), 10);
        assert_eq!(count_people("many people at the station"), 10);
        assert_eq!(count_people("a few people on the platform"), 3);
        assert_eq!(count_people("several people waiting"), 5);
    }

    #[test]
    fn test_no_people_yields_zero() {
        assert_eq!(count_people("the weather is nice today"), 0);
        assert_eq!(count_people(""), 0);
    }

    #[test]
    fn test_group_of_prefix() {
        assert_eq!(count_people("A group of 12 people hiking"), 12);
        assert_eq!(count_people("a crowd of twenty adults"), 20);
    }

    #[test]
    fn test_unresolvable_token_falls_through_to_digit_pattern() {
        // "some" defeats the first two patterns; the digit pattern still finds 4.
        assert_eq!(count_people("some people near 4 children"), 4);
    }

    #[test]
    fn test_first_match_of_winning_pattern_is_used() {
        assert_eq!(count_people("two men and three women"), 2);
    }

    #[test]
    fn test_unresolvable_quantities_fall_back_to_phrases() {
        assert_eq!(count_people("a crowd of happy people"), 10);
    }

    #[test]
    fn test_oversized_digit_tokens_do_not_panic() {
        assert_eq!(count_people("99999999999999999999 people"), 0);
    }

    #[test]
    fn test_parse_quantity_resolves_words_and_digits() {
        assert_eq!(parse_quantity("0"), Some(0));
        assert_eq!(parse_quantity("17"), Some(17));
        assert_eq!(parse_quantity("seventeen"), Some(17));
        assert_eq!(parse_quantity("dozen"), None);
        assert_eq!(parse_quantity(""), None);
    }
}
