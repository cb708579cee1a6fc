use crate::grammar::grammar;
use crate::normalize::{clean, normalize};
use crate::rank::rank;
use crate::types::{Plate, PlateFormat, ValidationResult};
use log::debug;
use std::str::FromStr;

/// Where OCR digit look-alikes get corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    /// Every candidate is normalized up front, so letter fields lose their
    /// B, S, O, I and Z too. Bharat plates can never match in this mode.
    Global,
    /// Look-alikes are read as digits only inside digit fields.
    PositionAware,
}

impl FromStr for Substitution {
    type Err = failure::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Substitution::Global),
            "position-aware" | "position_aware" | "positional" => Ok(Substitution::PositionAware),
            other => Err(format_err!("Unknown substitution policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlateValidator {
    formats: Vec<PlateFormat>,
    substitution: Substitution,
}

impl Default for PlateValidator {
    fn default() -> Self {
        PlateValidator::new(PlateFormat::ALL.to_vec(), Substitution::PositionAware)
    }
}

impl PlateValidator {
    /// `formats` is tried in the given order for every candidate.
    pub fn new(formats: Vec<PlateFormat>, substitution: Substitution) -> PlateValidator {
        PlateValidator {
            formats,
            substitution,
        }
    }

    pub fn formats(&self) -> &[PlateFormat] {
        &self.formats
    }

    pub fn substitution(&self) -> Substitution {
        self.substitution
    }

    /// Returns the first candidate, in ranked order, that matches one of the
    /// configured formats. Formats are tried in order within each candidate.
    pub fn validate<S: AsRef<str>>(&self, candidates: &[S]) -> ValidationResult {
        let lenient_digits = self.substitution == Substitution::PositionAware;
        let prepared = candidates
            .iter()
            .map(|c| match self.substitution {
                Substitution::Global => normalize(c.as_ref()),
                Substitution::PositionAware => clean(c.as_ref()),
            })
            .collect();
        let ranked = rank(prepared);

        for candidate in &ranked {
            for format in &self.formats {
                let rule = grammar(*format);
                if let Some(text) = rule.canonicalize(candidate, lenient_digits) {
                    debug!("Candidate {} matched {} as {}", candidate, format, text);
                    return ValidationResult::Matched(Plate {
                        text,
                        format: rule.format,
                    });
                }
            }
        }
        debug!("No plate among {} candidates", ranked.len());
        ValidationResult::NoMatch { ranked }
    }
}
