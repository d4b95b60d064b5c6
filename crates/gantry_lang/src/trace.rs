//! Opt-in parser tracing.
//!
//! A [`Tracer`] receives one event per grammar rule entered and per
//! diagnostic recorded. Parsers carry no tracer unless one is installed.

use crate::location::Location;

/// A single trace point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// Cursor position when the event fired
    pub location: Location,
    /// Grammar rule or event name
    pub rule: &'static str,
    /// Up to five bytes of source before the cursor
    pub before: String,
    /// Up to five bytes of source after the cursor
    pub after: String,
}

/// Receiver of parser trace events
pub trait Tracer {
    /// Called for every trace point
    fn trace(&mut self, event: TraceEvent);
}

/// `tracing` target of parser trace events
pub const TRACE_TARGET: &str = "gantry::parser";

/// Forwards trace events to `tracing` at TRACE level on [`TRACE_TARGET`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracer;

impl Tracer for TracingTracer {
    fn trace(&mut self, event: TraceEvent) {
        tracing::trace!(
            target: TRACE_TARGET,
            line = event.location.line,
            column = event.location.column,
            offset = event.location.offset,
            "{:?}-{:?} {}",
            event.before,
            event.after,
            event.rule
        );
    }
}

impl Tracer for Vec<TraceEvent> {
    fn trace(&mut self, event: TraceEvent) {
        self.push(event);
    }
}
