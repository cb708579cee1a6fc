//! Structural grammars for Indian registration plates.
//!
//! Each format is a fixed sequence of fields. Matching is anchored at both
//! ends and tries wider fields first, backtracking when the remainder fails.

use crate::normalize::digit_for;
use crate::types::PlateFormat;

/// State and union territory codes, plus the `LD` and `BH` series.
pub const STATE_CODES: [&str; 38] = [
    "AP", "AR", "AS", "BR", "CG", "CH", "DD", "DL", "DN", "GA", "GJ", "HP", "HR", "JH", "JK",
    "KA", "KL", "LA", "LD", "MH", "ML", "MN", "MP", "MZ", "NL", "OD", "PB", "PY", "RJ", "SK",
    "TN", "TR", "TS", "UK", "UP", "WB", "AN", "BH",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    StateCode,
    Digits { min: usize, max: usize },
    Letters { min: usize, max: usize },
    Literal(&'static str),
}

impl Field {
    fn width(&self) -> (usize, usize) {
        match *self {
            Field::StateCode => (2, 2),
            Field::Digits { min, max } | Field::Letters { min, max } => (min, max),
            Field::Literal(s) => (s.len(), s.len()),
        }
    }

    /// Reads `chars` as this field, returning the captured text.
    fn read(&self, chars: &[char], lenient_digits: bool) -> Option<String> {
        match *self {
            Field::StateCode => {
                let code: String = chars.iter().map(char::to_ascii_uppercase).collect();
                if STATE_CODES.contains(&code.as_str()) {
                    Some(code)
                } else {
                    None
                }
            }
            Field::Digits { .. } => chars
                .iter()
                .map(|&c| {
                    if lenient_digits {
                        digit_for(c.to_ascii_uppercase())
                    } else if c.is_ascii_digit() {
                        Some(c)
                    } else {
                        None
                    }
                })
                .collect(),
            Field::Letters { .. } => chars
                .iter()
                .map(|c| {
                    if c.is_ascii_alphabetic() {
                        Some(c.to_ascii_uppercase())
                    } else {
                        None
                    }
                })
                .collect(),
            Field::Literal(s) => {
                if chars.len() == s.len()
                    && chars.iter().zip(s.chars()).all(|(a, b)| a.eq_ignore_ascii_case(&b))
                {
                    Some(s.to_string())
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    /// Captured fields joined with `-`.
    Hyphenated,
    /// Captured fields run together.
    Concatenated,
}

#[derive(Debug)]
pub struct Grammar {
    pub format: PlateFormat,
    pub fields: &'static [Field],
    pub rendering: Rendering,
}

static GRAMMARS: [Grammar; 4] = [
    // DL-01-AB-1234, KA-51-P-9999
    Grammar {
        format: PlateFormat::Private,
        fields: &[
            Field::StateCode,
            Field::Digits { min: 1, max: 2 },
            Field::Letters { min: 1, max: 3 },
            Field::Digits { min: 1, max: 4 },
        ],
        rendering: Rendering::Hyphenated,
    },
    // TN-38-N-1234
    Grammar {
        format: PlateFormat::Commercial,
        fields: &[
            Field::StateCode,
            Field::Digits { min: 2, max: 2 },
            Field::Letters { min: 1, max: 1 },
            Field::Digits { min: 4, max: 4 },
        ],
        rendering: Rendering::Hyphenated,
    },
    // 29-BH-2345-AA
    Grammar {
        format: PlateFormat::Bharat,
        fields: &[
            Field::Digits { min: 2, max: 2 },
            Field::Literal("BH"),
            Field::Digits { min: 4, max: 4 },
            Field::Letters { min: 2, max: 2 },
        ],
        rendering: Rendering::Hyphenated,
    },
    // CD 123 XYZ, left unformatted
    Grammar {
        format: PlateFormat::Diplomatic,
        fields: &[
            Field::Literal("CD"),
            Field::Digits { min: 1, max: 3 },
            Field::Letters { min: 1, max: 3 },
        ],
        rendering: Rendering::Concatenated,
    },
];

pub fn grammar(format: PlateFormat) -> &'static Grammar {
    match format {
        PlateFormat::Private => &GRAMMARS[0],
        PlateFormat::Commercial => &GRAMMARS[1],
        PlateFormat::Bharat => &GRAMMARS[2],
        PlateFormat::Diplomatic => &GRAMMARS[3],
    }
}

impl Grammar {
    /// Matches the whole of `input`, returning one captured string per field.
    /// With `lenient_digits`, confusable letters inside digit fields are read
    /// as the digits they resemble, but only when no strict reading exists.
    pub fn parse(&self, input: &str, lenient_digits: bool) -> Option<Vec<String>> {
        let chars: Vec<char> = input.chars().collect();
        let mut groups = Vec::with_capacity(self.fields.len());
        if match_fields(&chars, self.fields, false, &mut groups) {
            return Some(groups);
        }
        groups.clear();
        if lenient_digits && match_fields(&chars, self.fields, true, &mut groups) {
            Some(groups)
        } else {
            None
        }
    }

    pub fn render(&self, groups: &[String]) -> String {
        match self.rendering {
            Rendering::Hyphenated => groups.join("-"),
            Rendering::Concatenated => groups.concat(),
        }
    }

    pub fn canonicalize(&self, input: &str, lenient_digits: bool) -> Option<String> {
        self.parse(input, lenient_digits)
            .map(|groups| self.render(&groups))
    }
}

fn match_fields(
    input: &[char],
    fields: &[Field],
    lenient_digits: bool,
    groups: &mut Vec<String>,
) -> bool {
    let (field, rest) = match fields.split_first() {
        Some(split) => split,
        None => return input.is_empty(),
    };
    let (min, max) = field.width();
    let longest = max.min(input.len());
    for width in (min..=longest).rev() {
        if let Some(text) = field.read(&input[..width], lenient_digits) {
            groups.push(text);
            if match_fields(&input[width..], rest, lenient_digits, groups) {
                return true;
            }
            groups.pop();
        }
    }
    false
}
