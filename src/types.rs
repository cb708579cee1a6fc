use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlateFormat {
    Private,
    Commercial,
    Bharat,
    Diplomatic,
}

impl PlateFormat {
    pub const ALL: [PlateFormat; 4] = [
        PlateFormat::Private,
        PlateFormat::Commercial,
        PlateFormat::Bharat,
        PlateFormat::Diplomatic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlateFormat::Private => "private",
            PlateFormat::Commercial => "commercial",
            PlateFormat::Bharat => "bharat",
            PlateFormat::Diplomatic => "diplomatic",
        }
    }
}

impl fmt::Display for PlateFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlateFormat {
    type Err = failure::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PlateFormat::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format_err!("Unknown plate format '{}'", s))
    }
}

/// A validated plate in its canonical rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plate {
    pub text: String,
    pub format: PlateFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Matched(Plate),
    /// Carries every prepared candidate in ranked order.
    NoMatch { ranked: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Allowed,
    Blocked,
}

impl AccessStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessStatus::Allowed => "ALLOWED",
            AccessStatus::Blocked => "BLOCKED",
        }
    }
}

/// Where the image came from. Parsed from the `/recognize/{source}` path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Upload,
    Camera,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Upload => "UPLOAD",
            Source::Camera => "CAMERA",
        }
    }
}

impl FromStr for Source {
    type Err = failure::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("upload") {
            Ok(Source::Upload)
        } else if s.eq_ignore_ascii_case("camera") {
            Ok(Source::Camera)
        } else {
            Err(format_err!("Unknown image source '{}'", s))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub plate: String,
    pub status: AccessStatus,
    pub source: Source,
    pub elapsed: Duration,
}

/// A row read back from the log store.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub plate: String,
    pub status: String,
    pub source: String,
    pub timestamp: f64,
    pub processing_time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    Identified {
        plate: Plate,
        status: AccessStatus,
        elapsed: Duration,
    },
    NoMatch {
        /// Candidates exactly as the OCR service returned them.
        diagnostics: Vec<String>,
        ranked: Vec<String>,
        elapsed: Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!("Bharat".parse::<PlateFormat>().unwrap(), PlateFormat::Bharat);
        assert_eq!(" private ".parse::<PlateFormat>().unwrap(), PlateFormat::Private);
        assert!("military".parse::<PlateFormat>().is_err());
    }

    #[test]
    fn parses_sources() {
        assert_eq!("upload".parse::<Source>().unwrap(), Source::Upload);
        assert_eq!("CAMERA".parse::<Source>().unwrap(), Source::Camera);
        assert!("lorry".parse::<Source>().is_err());
        assert_eq!(Source::Camera.as_str(), "CAMERA");
    }
}
