//! Column letter codec.
//!
//! Grid columns are addressed with bijective base-26 letters: `A` is column
//! 0, `Z` is 25, `AA` is 26, `AZ` is 51, `BA` is 52 and so on. There is no
//! zero digit, which is why the conversion subtracts one before every
//! division.

/// Convert a zero-based column index to its letter identifier.
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Convert a letter identifier back to its zero-based column index.
///
/// Lowercase letters are accepted. Returns `None` for empty input, input
/// containing anything other than ASCII letters, or an index that overflows
/// `usize`.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }

    let mut n: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter_single() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(1), "B");
        assert_eq!(column_letter(25), "Z");
    }

    #[test]
    fn test_column_letter_multi() {
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(51), "AZ");
        assert_eq!(column_letter(52), "BA");
        assert_eq!(column_letter(103), "CZ");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("CZ"), Some(103));
        assert_eq!(column_index("AAA"), Some(702));
    }

    #[test]
    fn test_column_index_rejects_invalid() {
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index("$A"), None);
    }

    #[test]
    fn test_round_trip_and_monotonic() {
        let mut previous: Option<String> = None;
        for n in 0..20_000 {
            let letters = column_letter(n);
            assert_eq!(column_index(&letters), Some(n), "round trip failed for {n}");
            if let Some(prev) = previous {
                // Longer identifiers always sort after shorter ones.
                assert!(
                    (prev.len(), prev.as_str()) < (letters.len(), letters.as_str()),
                    "{prev} should sort before {letters}"
                );
            }
            previous = Some(letters);
        }
    }
}
