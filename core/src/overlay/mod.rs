// Live overlay module
//
// Polls node status and data-grid metrics independently of the graph layout.

pub mod path;
mod probe;
mod refresher;

pub use probe::{
    evaluate_metric, evaluate_status, format_metric_value, format_number, HttpProbeFetcher,
    MetricOutcome, ProbeError, ProbeFetcher, StatusOutcome, StatusState, NOT_AVAILABLE,
};
pub use refresher::{
    OverlayRefresher, OverlaySettings, ProbeKey, ProbeReading, ProbeSlot, ReadingValue,
};
