//! Contact phone normalization and masking
//!
//! Finder notifications are delivered over SMS/WhatsApp gateways that only
//! accept E.164-style numbers. Stored phones come from order forms and
//! account records and are frequently in local format, so known local
//! prefixes are mapped through a fixed rule table. A number that matches no
//! rule is rejected rather than guessed.

use crate::TagError;

/// Local leading digits mapped to the international prefix that replaces
/// the leading zero. Covers the local formats seen in order data.
const PREFIX_RULES: &[(&str, &str)] = &[
    ("05", "+972"), // mobile
    ("02", "+972"),
    ("03", "+972"),
    ("04", "+972"),
    ("07", "+972"),
    ("08", "+972"),
    ("09", "+972"),
];

const MIN_DIGITS: usize = 8;
const MAX_DIGITS: usize = 15;

/// Normalize a raw phone string to international format.
pub fn normalize_phone(raw: &str) -> Result<String, TagError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    if cleaned.is_empty() {
        return Err(TagError::InvalidInput("empty phone number".to_string()));
    }

    if let Some(rest) = cleaned.strip_prefix('+') {
        return validated(format!("+{rest}"), rest);
    }

    // "00" international dialing form
    if let Some(rest) = cleaned.strip_prefix("00") {
        return validated(format!("+{rest}"), rest);
    }

    for (local, prefix) in PREFIX_RULES {
        if cleaned.starts_with(local) {
            // Drop the leading zero, prepend the country prefix
            let rest = &cleaned[1..];
            return validated(format!("{prefix}{rest}"), rest);
        }
    }

    Err(TagError::InvalidInput(format!(
        "cannot determine country prefix for phone ending in {}",
        tail(&cleaned)
    )))
}

fn validated(normalized: String, digits: &str) -> Result<String, TagError> {
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(TagError::InvalidInput(
            "phone contains non-digit characters".to_string(),
        ));
    }
    let count = normalized.chars().filter(char::is_ascii_digit).count();
    if !(MIN_DIGITS..=MAX_DIGITS).contains(&count) {
        return Err(TagError::InvalidInput(format!(
            "phone has {count} digits, expected {MIN_DIGITS}-{MAX_DIGITS}"
        )));
    }
    Ok(normalized)
}

/// Last four characters, for error messages. Indexed by char so stored
/// garbage with multibyte text cannot split a UTF-8 boundary.
fn tail(s: &str) -> &str {
    let start = s
        .char_indices()
        .rev()
        .nth(3)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[start..]
}

/// Mask a phone number, keeping only the last four digits.
pub fn mask_phone(phone: &str) -> String {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let mut seen = 0usize;
    phone
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                seen += 1;
                if seen + 4 <= digits {
                    '*'
                } else {
                    c
                }
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn international_numbers_pass_through() {
        assert_eq!(normalize_phone("+31612345678").unwrap(), "+31612345678");
        assert_eq!(
            normalize_phone("+972 52-123-4567").unwrap(),
            "+972521234567"
        );
    }

    #[test]
    fn double_zero_prefix_becomes_plus() {
        assert_eq!(normalize_phone("0031612345678").unwrap(), "+31612345678");
    }

    #[test]
    fn local_mobile_maps_through_rule_table() {
        assert_eq!(normalize_phone("052-123-4567").unwrap(), "+972521234567");
        assert_eq!(normalize_phone("03 555 1234").unwrap(), "+97235551234");
    }

    #[test]
    fn ambiguous_numbers_are_rejected_not_guessed() {
        assert!(matches!(
            normalize_phone("12345678"),
            Err(TagError::InvalidInput(_))
        ));
        assert!(matches!(
            normalize_phone("061234567"),
            Err(TagError::InvalidInput(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("+12ab34cd").is_err());
        assert!(normalize_phone("+123").is_err());
    }

    #[test]
    fn multibyte_garbage_is_rejected_not_panicked_on() {
        // Legacy rows carry arbitrary text; the error path must stay on
        // char boundaries.
        assert!(matches!(
            normalize_phone("€€€"),
            Err(TagError::InvalidInput(_))
        ));
        assert!(matches!(
            normalize_phone("€€€€€"),
            Err(TagError::InvalidInput(_))
        ));
        assert!(matches!(
            normalize_phone("05אב4567"),
            Err(TagError::InvalidInput(_))
        ));
    }

    #[test]
    fn masking_keeps_last_four_digits() {
        assert_eq!(mask_phone("+972521234567"), "+*********4567");
        assert_eq!(mask_phone("4567"), "4567");
    }
}
