use std::sync::OnceLock;

use regex::Regex;

fn re_code_charset() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^[0-9\-\s./()A-Za-z]+$").expect("invalid regex"))
}

/// Whether a fragment looks like a barcode, SKU or stray symbol rather than product text.
///
/// Only pure ASCII code-ish fragments qualify; anything containing a non-Latin
/// character or a currency sign is kept as a potential product name.
pub fn is_code_like(text: &str) -> bool {
    let t = text.trim();
    if t.chars().count() <= 1 {
        return true;
    }
    re_code_charset().is_match(t)
}
