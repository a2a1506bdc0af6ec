/// Normalise a column header or free-text label for lookups.
pub(crate) fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}', '\u{200c}'], " ");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

/// Fold Persian and Arabic-Indic digits into their ASCII counterparts.
pub(crate) fn fold_digits(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            '\u{06f0}'..='\u{06f9}' => char::from(b'0' + (ch as u32 - 0x06f0) as u8),
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (ch as u32 - 0x0660) as u8),
            other => other,
        })
        .collect()
}

/// Textual markers that spreadsheets and exports use for "no value".
pub(crate) fn is_blank_sentinel(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }
    matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "nan" | "none" | "null" | "-" | "\u{2013}" | "\u{2014}" | "\u{2212}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_name_collapses_whitespace_and_case() {
        assert_eq!(normalize_name("\u{feff}  Remaining   Capacity "), "remaining capacity");
        assert_eq!(normalize_name("کد\u{200c}مدرسه"), "کد مدرسه");
    }

    #[test]
    fn fold_digits_handles_persian_and_arabic_indic() {
        assert_eq!(fold_digits("۱۲۳"), "123");
        assert_eq!(fold_digits("٤٥٦"), "456");
        assert_eq!(fold_digits("EMP-۷"), "EMP-7");
    }

    #[test]
    fn blank_sentinels_cover_common_spellings() {
        for value in ["", "  ", "NaN", "None", "null", "-", "\u{2014}"] {
            assert!(is_blank_sentinel(value), "{value:?} should be blank");
        }
        assert!(!is_blank_sentinel("0"));
        assert!(!is_blank_sentinel("many"));
    }
}
