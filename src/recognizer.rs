//! End-to-end recognition: preprocess, OCR, validate, then classify and log.

use crate::preprocess::Preprocessor;
use crate::types::{AccessStatus, LogEntry, Recognition, Source, ValidationResult};
use crate::validator::PlateValidator;
use log::{debug, error, info, warn};
use std::future::Future;
use std::time::Instant;

/// Source of candidate text lines for an image.
pub trait TextExtractor {
    fn extract_text(
        &self,
        image: &[u8],
    ) -> impl Future<Output = Result<Vec<String>, failure::Error>> + Send;
}

pub trait Blocklist {
    fn is_blocked(&self, plate: &str) -> bool;
}

/// Persists recognized plates. Implementations handle their own failures.
pub trait RecognitionLog {
    fn record(&self, entry: LogEntry) -> impl Future<Output = ()> + Send;
}

pub struct Recognizer<O, B, L> {
    preprocessor: Preprocessor,
    ocr: O,
    validator: PlateValidator,
    blocklist: B,
    log: L,
}

impl<O, B, L> Recognizer<O, B, L>
where
    O: TextExtractor,
    B: Blocklist,
    L: RecognitionLog,
{
    pub fn new(
        preprocessor: Preprocessor,
        ocr: O,
        validator: PlateValidator,
        blocklist: B,
        log: L,
    ) -> Recognizer<O, B, L> {
        Recognizer {
            preprocessor,
            ocr,
            validator,
            blocklist,
            log,
        }
    }

    pub fn validator(&self) -> &PlateValidator {
        &self.validator
    }

    pub fn blocklist(&self) -> &B {
        &self.blocklist
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Fails only when the image cannot be decoded. OCR failures count as
    /// an empty candidate list.
    pub async fn recognize(&self, image: &[u8], source: Source) -> Result<Recognition, failure::Error> {
        let start = Instant::now();
        let preprocessor = self.preprocessor.clone();
        let data = image.to_vec();
        let processed = tokio::task::spawn_blocking(move || preprocessor.process(&data)).await??;

        let candidates = match self.ocr.extract_text(&processed).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("OCR failed, treating image as unreadable: {}", e);
                Vec::new()
            }
        };
        debug!("OCR returned {:?}", candidates);

        let result = self.validator.validate(&candidates);
        let elapsed = start.elapsed();
        match result {
            ValidationResult::Matched(plate) => {
                let status = if self.blocklist.is_blocked(&plate.text) {
                    AccessStatus::Blocked
                } else {
                    AccessStatus::Allowed
                };
                info!(
                    "Recognized {} plate {} ({}) in {:?}",
                    plate.format,
                    plate.text,
                    status.as_str(),
                    elapsed
                );
                self.log
                    .record(LogEntry {
                        plate: plate.text.clone(),
                        status,
                        source,
                        elapsed,
                    })
                    .await;
                Ok(Recognition::Identified {
                    plate,
                    status,
                    elapsed,
                })
            }
            ValidationResult::NoMatch { ranked } => {
                warn!("No valid plate among OCR results {:?}", candidates);
                Ok(Recognition::NoMatch {
                    diagnostics: candidates,
                    ranked,
                    elapsed,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::tests::sample_png;
    use crate::types::{Plate, PlateFormat};
    use std::sync::Mutex;

    struct FixedOcr(Option<Vec<&'static str>>);

    impl TextExtractor for FixedOcr {
        async fn extract_text(&self, _image: &[u8]) -> Result<Vec<String>, failure::Error> {
            match &self.0 {
                Some(lines) => Ok(lines.iter().map(|s| s.to_string()).collect()),
                None => Err(format_err!("service unavailable")),
            }
        }
    }

    struct ListBlocklist(Vec<&'static str>);

    impl Blocklist for ListBlocklist {
        fn is_blocked(&self, plate: &str) -> bool {
            self.0.iter().any(|p| p.contains(plate))
        }
    }

    #[derive(Default)]
    struct MemoryLog(Mutex<Vec<LogEntry>>);

    impl RecognitionLog for MemoryLog {
        async fn record(&self, entry: LogEntry) {
            self.0.lock().unwrap().push(entry);
        }
    }

    fn recognizer(
        lines: Option<Vec<&'static str>>,
        blocked: Vec<&'static str>,
    ) -> Recognizer<FixedOcr, ListBlocklist, MemoryLog> {
        Recognizer::new(
            Preprocessor::new(800, None),
            FixedOcr(lines),
            PlateValidator::default(),
            ListBlocklist(blocked),
            MemoryLog::default(),
        )
    }

    #[tokio::test]
    async fn allowed_plate_is_logged_once() {
        let r = recognizer(Some(vec!["DL 01 AB 1234", "STOP", "SIGN"]), vec![]);
        let result = r.recognize(&sample_png(80, 40), Source::Upload).await.unwrap();
        match result {
            Recognition::Identified { plate, status, .. } => {
                assert_eq!(
                    plate,
                    Plate {
                        text: "DL-01-AB-1234".to_string(),
                        format: PlateFormat::Private
                    }
                );
                assert_eq!(status, AccessStatus::Allowed);
            }
            other => panic!("unexpected {:?}", other),
        }
        let entries = r.log().0.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].plate, "DL-01-AB-1234");
        assert_eq!(entries[0].status, AccessStatus::Allowed);
        assert_eq!(entries[0].source, Source::Upload);
    }

    #[tokio::test]
    async fn blocklisted_plate_is_blocked() {
        let r = recognizer(Some(vec!["29BH2345AA"]), vec!["29-BH-2345-AA"]);
        let result = r.recognize(&sample_png(80, 40), Source::Camera).await.unwrap();
        match result {
            Recognition::Identified { status, .. } => assert_eq!(status, AccessStatus::Blocked),
            other => panic!("unexpected {:?}", other),
        }
        let entries = r.log().0.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, AccessStatus::Blocked);
        assert_eq!(entries[0].source, Source::Camera);
    }

    #[tokio::test]
    async fn no_match_surfaces_raw_candidates_without_logging() {
        let r = recognizer(Some(vec!["random text", "EXIT"]), vec![]);
        let result = r.recognize(&sample_png(80, 40), Source::Upload).await.unwrap();
        match result {
            Recognition::NoMatch {
                diagnostics,
                ranked,
                ..
            } => {
                assert_eq!(diagnostics, vec!["random text", "EXIT"]);
                assert_eq!(ranked, vec!["RANDOMTEXT", "EXIT"]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(r.log().0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ocr_failure_is_an_empty_no_match() {
        let r = recognizer(None, vec![]);
        let result = r.recognize(&sample_png(80, 40), Source::Upload).await.unwrap();
        match result {
            Recognition::NoMatch {
                diagnostics,
                ranked,
                ..
            } => {
                assert!(diagnostics.is_empty());
                assert!(ranked.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(r.log().0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn undecodable_image_is_an_error() {
        let r = recognizer(Some(vec!["DL01AB1234"]), vec![]);
        assert!(r.recognize(b"not an image", Source::Upload).await.is_err());
        assert!(r.log().0.lock().unwrap().is_empty());
    }
}
