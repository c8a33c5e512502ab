use std::sync::OnceLock;

use regex::Regex;
use shelftag_core::{Currency, PriceMatch};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Digits are ASCII or full-width (０-９); other numeral scripts are not read.
// INR: ₹129 / Rs 59 / ₹ 1,299.00
re!(re_rupee_symbol, r"₹\s*[0-9０-９][0-9０-９,]*(?:\.[0-9０-９]{1,2})?");
re!(re_rupee_abbr, r"Rs\.?\s*[0-9０-９][0-9０-９,]*(?:\.[0-9０-９]{1,2})?");
// JPY: ¥120 / ￥480 / 128円
re!(re_yen_symbol, r"[¥￥]\s*[0-9０-９][0-9０-９,]*");
re!(re_yen_suffix, r"[0-9０-９][0-9０-９,]*\s*円");
// No marker at all.
re!(re_bare_number, r"[0-9０-９][0-9０-９,]*(?:\.[0-9０-９]{1,2})?");

/// Highest priority first. The first pattern that matches anywhere wins.
const CASCADE: &[fn() -> &'static Regex] = &[
    re_rupee_symbol,
    re_rupee_abbr,
    re_yen_symbol,
    re_yen_suffix,
    re_bare_number,
];

/// Checked in order against the matched substring; first hit decides.
const CURRENCY_SYMBOLS: &[(&str, Currency)] = &[
    ("₹", Currency::Inr),
    ("Rs", Currency::Inr),
    ("¥", Currency::Jpy),
    ("￥", Currency::Jpy),
    ("円", Currency::Jpy),
];

/// Extract the first price in `text`, honoring pattern priority.
pub fn extract_price(text: &str) -> Option<PriceMatch> {
    if text.trim().is_empty() {
        return None;
    }

    let matched = CASCADE
        .iter()
        .find_map(|re| re().find_iter(text).find(|m| !touches_foreign_numeral(text, m.start(), m.end())))?
        .as_str();

    Some(PriceMatch {
        raw_text: text.to_string(),
        matched_text: matched.to_string(),
        currency: detect_currency(matched),
        value: normalize_number(matched),
    })
}

fn detect_currency(matched: &str) -> Option<Currency> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(symbol, _)| matched.contains(symbol))
        .map(|(_, currency)| *currency)
}

/// Strip the currency marker, thousands separators, whitespace and a trailing 円.
/// Full-width digits are folded to ASCII.
fn normalize_number(matched: &str) -> String {
    let digits_start = matched.find(is_price_digit).unwrap_or(0);
    let clean: String = matched[digits_start..]
        .chars()
        .filter(|c| *c != ',')
        .map(fold_full_width)
        .collect();
    let clean = clean.trim();
    clean.strip_suffix('円').unwrap_or(clean).trim_end().to_string()
}

/// A match glued to a numeral of another script is part of a number that cannot be read.
fn touches_foreign_numeral(text: &str, start: usize, end: usize) -> bool {
    let foreign = |c: char| c.is_numeric() && !is_price_digit(c);
    text[..start].chars().next_back().is_some_and(foreign) || text[end..].chars().next().is_some_and(foreign)
}

fn is_price_digit(c: char) -> bool {
    c.is_ascii_digit() || ('０'..='９').contains(&c)
}

fn fold_full_width(c: char) -> char {
    match c {
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
        _ => c,
    }
}
