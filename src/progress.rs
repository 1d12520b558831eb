//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn MigrationProgressCallback>`] via
//! [`crate::config::MigrationConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its three stages.
//!
//! # Example
//!
//! ```rust
//! use sop2docx::{MigrationConfig, MigrationProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl MigrationProgressCallback for Printer {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("{} …", stage.label());
//!     }
//! }
//!
//! let config = MigrationConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn MigrationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One step of the Reader → Extractor → Renderer pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Read,
    Extract,
    Render,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Read => "Reading document",
            Stage::Extract => "Extracting structured record",
            Stage::Render => "Rendering document",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the pipeline at stage boundaries.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. A stage that never starts (because an earlier one
/// failed) produces no events at all.
pub trait MigrationProgressCallback: Send + Sync {
    /// Called just before a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed: Duration) {
        let _ = (stage, elapsed);
    }

    /// Called when a stage fails; the run stops after this event.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl MigrationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::MigrationConfig`].
pub type ProgressCallback = Arc<dyn MigrationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl MigrationProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {stage:?}"));
        }

        fn on_stage_complete(&self, stage: Stage, _elapsed: Duration) {
            self.events.lock().unwrap().push(format!("done {stage:?}"));
        }

        fn on_stage_error(&self, stage: Stage, _error: &str) {
            self.events.lock().unwrap().push(format!("error {stage:?}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Read);
        cb.on_stage_complete(Stage::Read, Duration::from_millis(3));
        cb.on_stage_error(Stage::Extract, "boom");
    }

    #[test]
    fn recorder_sees_events_in_order() {
        let rec = Recorder::default();
        rec.on_stage_start(Stage::Read);
        rec.on_stage_complete(Stage::Read, Duration::ZERO);
        rec.on_stage_start(Stage::Extract);
        rec.on_stage_error(Stage::Extract, "rate limited");
        assert_eq!(
            *rec.events.lock().unwrap(),
            ["start Read", "done Read", "start Extract", "error Extract"]
        );
    }

    #[test]
    fn stage_labels() {
        assert_eq!(Stage::Render.to_string(), "Rendering document");
    }
}
