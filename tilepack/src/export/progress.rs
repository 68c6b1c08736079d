//! Progress reporting for export runs.

use super::summary::BundleReport;

/// Observer notified as bundles finish.
///
/// Called from worker threads; implementations must be thread-safe.
pub trait ExportProgress: Send + Sync {
    /// The run is about to process `bundles` bundles.
    fn on_start(&self, bundles: usize);

    /// A bundle finished. `completed` counts finished bundles including this one.
    fn on_bundle_complete(&self, report: &BundleReport, completed: usize, total: usize);

    /// All bundles are done.
    fn on_finish(&self) {}
}

/// Progress observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ExportProgress for NoProgress {
    fn on_start(&self, _bundles: usize) {}

    fn on_bundle_complete(&self, _report: &BundleReport, _completed: usize, _total: usize) {}
}
