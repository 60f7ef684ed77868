//! Optional narrative annotation.
//!
//! Annotation is a post-processing decoration applied after a deterministic
//! result is finalized. The core has no dependency on any provider; a slow
//! or failing annotator leaves the numeric result untouched.

use serde::Serialize;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::types::ComputationOutput;

/// Default time budget for an annotation provider.
pub const DEFAULT_ANNOTATION_TIMEOUT: Duration = Duration::from_secs(10);

/// An advisory text provider. Annotations never influence numeric output.
pub trait NarrativeAnnotator: Send + Sync {
    /// Produce narrative text for a finalized result. The context is a
    /// serialized summary of the computation.
    fn annotate(&self, context: &str) -> Result<String, String>;
}

/// A computation result with its optional narrative.
#[derive(Debug, Clone, Serialize)]
pub struct Annotated<T: Serialize> {
    pub output: ComputationOutput<T>,
    /// Advisory text; absent when the provider timed out or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

/// Decorate a finalized result with narrative text, bounded by `timeout`.
///
/// The provider runs on a worker thread. On timeout or provider error the
/// deterministic result is returned unannotated, with a warning appended to
/// its envelope.
pub fn annotate_output<T: Serialize>(
    mut output: ComputationOutput<T>,
    annotator: Arc<dyn NarrativeAnnotator>,
    timeout: Duration,
) -> Annotated<T> {
    let context = serde_json::json!({
        "methodology": output.methodology,
        "assumptions": output.assumptions,
        "warnings": output.warnings,
    })
    .to_string();

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(annotator.annotate(&context));
    });

    let narrative = match rx.recv_timeout(timeout) {
        Ok(Ok(text)) => Some(text),
        Ok(Err(reason)) => {
            output
                .warnings
                .push(format!("Annotation unavailable: provider error: {reason}"));
            None
        }
        Err(_) => {
            output.warnings.push(format!(
                "Annotation unavailable: provider exceeded the {}s time budget",
                timeout.as_secs()
            ));
            None
        }
    };

    Annotated { output, narrative }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::with_metadata;

    struct FixedAnnotator(&'static str);

    impl NarrativeAnnotator for FixedAnnotator {
        fn annotate(&self, _context: &str) -> Result<String, String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingAnnotator;

    impl NarrativeAnnotator for FailingAnnotator {
        fn annotate(&self, _context: &str) -> Result<String, String> {
            Err("service unreachable".into())
        }
    }

    struct SlowAnnotator;

    impl NarrativeAnnotator for SlowAnnotator {
        fn annotate(&self, _context: &str) -> Result<String, String> {
            thread::sleep(Duration::from_millis(200));
            Ok("too late".into())
        }
    }

    fn sample_output() -> ComputationOutput<u32> {
        with_metadata("Test", &serde_json::json!({}), Vec::new(), 1, 7)
    }

    #[test]
    fn test_successful_annotation() {
        let annotated = annotate_output(
            sample_output(),
            Arc::new(FixedAnnotator("a concise narrative")),
            DEFAULT_ANNOTATION_TIMEOUT,
        );
        assert_eq!(annotated.narrative.as_deref(), Some("a concise narrative"));
        assert_eq!(annotated.output.result, 7);
        assert!(annotated.output.warnings.is_empty());
    }

    #[test]
    fn test_provider_error_keeps_result() {
        let annotated = annotate_output(
            sample_output(),
            Arc::new(FailingAnnotator),
            DEFAULT_ANNOTATION_TIMEOUT,
        );
        assert!(annotated.narrative.is_none());
        assert_eq!(annotated.output.result, 7);
        assert!(annotated
            .output
            .warnings
            .iter()
            .any(|w| w.contains("provider error")));
    }

    #[test]
    fn test_timeout_keeps_result() {
        let annotated = annotate_output(
            sample_output(),
            Arc::new(SlowAnnotator),
            Duration::from_millis(20),
        );
        assert!(annotated.narrative.is_none());
        assert_eq!(annotated.output.result, 7);
        assert!(annotated
            .output
            .warnings
            .iter()
            .any(|w| w.contains("time budget")));
    }
}
