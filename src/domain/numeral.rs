//! Roman numerals and heading prefixes of directive points.
//!
//! Nothing in here is stored. The numeral and the prefix of a point are always
//! derived from its ordinal and its reproduction ("Abdruck") flag.

use std::sync::LazyLock;

use regex::Regex;

/// Label written in front of reproduction points.
pub const ABDRUCK: &str = "Abdruck";

const NUMERALS: [(usize, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[IVXLCDM]+\.\s*").expect("static regex"));

static REPRODUCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Abdruck(?: von [IVXLCDM]+\.(?: (?:und|bis) [IVXLCDM]+\.)?)?(?:\s+|$)")
        .expect("static regex")
});

/// Converts a number to an upper-case roman numeral.
///
/// Zero has no roman representation and yields an empty string. Values above
/// 3999 are written with repeated `M`s.
///
/// ```
/// use slv::domain::numeral::roman;
///
/// assert_eq!(roman(4), "IV");
/// assert_eq!(roman(1994), "MCMXCIV");
/// ```
#[must_use]
pub fn roman(mut value: usize) -> String {
    let mut out = String::new();
    for (weight, symbol) in NUMERALS {
        while value >= weight {
            out.push_str(symbol);
            value -= weight;
        }
    }
    out
}

/// The prefix written between the numeral and the heading of a point.
///
/// Primary points have no prefix. Reproductions name the points they
/// reproduce:
///
/// | ordinal | prefix                     |
/// |---------|----------------------------|
/// | 1       | `Abdruck`                  |
/// | 2       | `Abdruck von I.`           |
/// | 3       | `Abdruck von I. und II.`   |
/// | n > 3   | `Abdruck von I. bis {n-1}.`|
#[must_use]
pub fn prefix(ordinal: usize, abdruck: bool) -> String {
    if !abdruck {
        return String::new();
    }

    match ordinal {
        0 | 1 => ABDRUCK.to_string(),
        2 => format!("{ABDRUCK} von I."),
        3 => format!("{ABDRUCK} von I. und II."),
        n => format!("{ABDRUCK} von I. bis {}.", roman(n - 1)),
    }
}

/// Joins an optional numeral and a text the way headings are written to the
/// document: `"{numeral}.\t{text}"`, trimmed.
#[must_use]
pub fn numbered(numeral: Option<&str>, text: &str) -> String {
    match numeral {
        Some(numeral) if !numeral.is_empty() => format!("{numeral}.\t{text}").trim().to_string(),
        _ => text.trim().to_string(),
    }
}

/// The complete heading text of a point: numeral, prefix and heading.
#[must_use]
pub fn heading_text(ordinal: usize, abdruck: bool, heading: &str) -> String {
    let body = format!("{} {}", prefix(ordinal, abdruck), heading);
    numbered(Some(&roman(ordinal)), body.trim())
}

/// Splits the text of a point anchor back into its heading and its
/// reproduction flag.
///
/// A leading roman numeral and a reproduction prefix are removed.
///
/// ```
/// use slv::domain::numeral::strip_heading;
///
/// assert_eq!(strip_heading("III.\tAbdruck von I. und II. An Herrn X"), ("An Herrn X".to_string(), true));
/// assert_eq!(strip_heading("II.\tWV"), ("WV".to_string(), false));
/// ```
#[must_use]
pub fn strip_heading(text: &str) -> (String, bool) {
    let rest = NUMBERED.replace(text, "");
    let rest = rest.trim_start();
    REPRODUCTION.find(rest).map_or_else(
        || (rest.trim_end().to_string(), false),
        |m| (rest[m.end()..].trim().to_string(), true),
    )
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(0, ""; "zero")]
    #[test_case(1, "I")]
    #[test_case(4, "IV")]
    #[test_case(9, "IX")]
    #[test_case(14, "XIV")]
    #[test_case(40, "XL")]
    #[test_case(1994, "MCMXCIV")]
    #[test_case(3999, "MMMCMXCIX")]
    #[test_case(4000, "MMMM")]
    fn roman_numerals(value: usize, expected: &str) {
        assert_eq!(roman(value), expected);
    }

    #[test_case(1, "Abdruck")]
    #[test_case(2, "Abdruck von I.")]
    #[test_case(3, "Abdruck von I. und II.")]
    #[test_case(4, "Abdruck von I. bis III.")]
    #[test_case(10, "Abdruck von I. bis IX.")]
    fn reproduction_prefix(ordinal: usize, expected: &str) {
        assert_eq!(prefix(ordinal, true), expected);
    }

    #[test]
    fn prefix_is_deterministic_and_distinguishes_reproductions() {
        for ordinal in 1..=50 {
            assert_eq!(prefix(ordinal, true), prefix(ordinal, true));
            assert_eq!(prefix(ordinal, false), prefix(ordinal, false));
            assert_ne!(prefix(ordinal, true), prefix(ordinal, false));
        }
    }

    #[test]
    fn numbered_text_is_trimmed() {
        assert_eq!(numbered(Some("II"), "  Heading  "), "II.\t  Heading");
        assert_eq!(numbered(None, "  Heading  "), "Heading");
        assert_eq!(numbered(Some(""), "Heading"), "Heading");
    }

    #[test]
    fn heading_text_combines_numeral_prefix_and_heading() {
        assert_eq!(heading_text(1, false, "Vermerk"), "I.\tVermerk");
        assert_eq!(heading_text(2, true, "Herrn Müller"), "II.\tAbdruck von I. Herrn Müller");
        assert_eq!(heading_text(1, true, ""), "I.\tAbdruck");
        assert_eq!(heading_text(3, false, ""), "III.");
    }

    #[test]
    fn strip_heading_inverts_heading_text() {
        for (ordinal, abdruck, heading) in [
            (1, false, "Vermerk"),
            (2, true, "Herrn Müller zur Kenntnis"),
            (5, true, "z.d.A."),
            (7, false, "Wiedervorlage"),
        ] {
            let text = heading_text(ordinal, abdruck, heading);
            assert_eq!(strip_heading(&text), (heading.to_string(), abdruck));
        }
    }

    #[test]
    fn strip_heading_keeps_unnumbered_text() {
        assert_eq!(strip_heading("Abdrucken lassen"), ("Abdrucken lassen".to_string(), false));
        assert_eq!(strip_heading("Vermerk"), ("Vermerk".to_string(), false));
    }
}
