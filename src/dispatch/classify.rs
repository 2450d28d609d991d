use std::sync::OnceLock;

use regex::Regex;

/// What an inbound text turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// 1-based pick from the most recent suggestion set
    Selection(usize),
    /// Ingredient-shaped text, with any leading list prefix stripped
    Ingredients(String),
    /// Anything else; answered with the greeting
    Unrecognized,
}

/// Prefixes users put in front of ingredient lists. Stripped before the
/// text is handed to the extractor.
const INGREDIENT_PREFIXES: &[&str] = &["i have", "ingredients:", "ingredients", "food:"];

/// The fixed selection vocabulary: a bare digit 1-3 (optionally with a
/// trailing period), or a known prefix word followed by a digit 1-3.
fn selection_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[1-3]\.?|(?:recipe|number|select|choose|option|i\s*want)\s*[1-3])$")
            .expect("selection pattern is valid")
    })
}

/// Classify one trimmed inbound text.
///
/// Selection takes precedence over ingredient text; whether a suggestion
/// set actually exists is the dispatcher's concern, so a selection-shaped
/// reply with no prior suggestions still classifies as a selection and is
/// answered with a corrective prompt rather than fed to the extractor.
pub fn classify(text: &str) -> MessageKind {
    let trimmed = text.trim();

    if is_selection(trimmed) {
        return MessageKind::Selection(extract_selection(trimmed));
    }
    if looks_like_ingredients(trimmed) {
        return MessageKind::Ingredients(strip_ingredient_prefixes(trimmed));
    }
    MessageKind::Unrecognized
}

/// True when the entire lowercased text matches the selection vocabulary.
pub fn is_selection(text: &str) -> bool {
    selection_pattern().is_match(&text.trim().to_lowercase())
}

/// Extract the chosen index: the first '1', '2' or '3' in the text wins.
/// Ambiguous multi-digit input ("option13") is not special-cased.
pub fn extract_selection(text: &str) -> usize {
    for ch in text.chars() {
        if let Some(n) = ch.to_digit(10) {
            if (1..=3).contains(&n) {
                return n as usize;
            }
        }
    }
    1
}

/// Ingredient-shaped text contains a comma, a newline, or more than one
/// whitespace-separated token.
pub fn looks_like_ingredients(text: &str) -> bool {
    text.contains(',') || text.contains('\n') || text.split_whitespace().count() > 1
}

/// Strip known list prefixes ("i have ...", "ingredients: ...") from the
/// start of the text, case-insensitively.
pub fn strip_ingredient_prefixes(text: &str) -> String {
    let mut clean = text.trim().to_string();
    for prefix in INGREDIENT_PREFIXES {
        if clean.to_lowercase().starts_with(prefix) {
            clean = clean[prefix.len()..].trim().to_string();
        }
    }
    clean
}
