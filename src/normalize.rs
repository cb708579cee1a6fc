//! Cleanup of raw OCR text before it reaches the plate grammars.

/// Letters OCR commonly returns where the plate has a digit, keyed on the
/// upper-cased glyph. `L` stands in for a lower-case `l` once folded.
const CONFUSABLE_DIGITS: [(char, char); 6] = [
    ('O', '0'),
    ('I', '1'),
    ('L', '1'),
    ('Z', '2'),
    ('S', '5'),
    ('B', '8'),
];

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '.' || c == '-'
}

/// Digit a character stands for in a digit-only field, if any.
pub fn digit_for(c: char) -> Option<char> {
    if c.is_ascii_digit() {
        return Some(c);
    }
    CONFUSABLE_DIGITS
        .iter()
        .find(|(letter, _)| *letter == c)
        .map(|(_, digit)| *digit)
}

/// Substitutes confusable letters with digits everywhere, upper-cases, and
/// drops whitespace, periods and hyphens. Only lower-case `l` is treated as a
/// one; an upper-case `L` survives.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if is_separator(c) {
            continue;
        }
        if c == 'l' {
            out.push('1');
            continue;
        }
        for u in c.to_uppercase() {
            match u {
                'O' => out.push('0'),
                'I' => out.push('1'),
                'Z' => out.push('2'),
                'S' => out.push('5'),
                'B' => out.push('8'),
                other => out.push(other),
            }
        }
    }
    out
}

/// Upper-cases and drops separators without touching any glyph.
pub fn clean(raw: &str) -> String {
    raw.chars()
        .filter(|c| !is_separator(*c))
        .flat_map(char::to_uppercase)
        .collect()
}
