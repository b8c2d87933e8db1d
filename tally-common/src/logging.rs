//! Subscriber setup and the direction-tagged event macros.
//!
//! Each event is emitted inside a span saying which way the data was going:
//! `outgoing` on the producer side, `incoming` on the consumer side, and
//! `internal` for everything else. Without `level = ..` the event is TRACE.

use tracing_subscriber::{EnvFilter, fmt::time::ChronoUtc, prelude::*};

pub const LOG_ENV: &str = "LOG_LEVEL";

#[doc(hidden)]
#[macro_export]
macro_rules! directed {
    ($direction:literal, $level:ident, $($event:tt)*) => {{
        let span = $crate::tracing::span!($crate::tracing::Level::$level, $direction);
        let _entered = span.enter();
        $crate::tracing::event!($crate::tracing::Level::$level, $($event)*)
    }};
}

#[macro_export]
macro_rules! outgoing {
    (level = $level:ident, $($event:tt)*) => {
        $crate::directed!("outgoing", $level, $($event)*)
    };
    ($($event:tt)*) => {
        $crate::directed!("outgoing", TRACE, $($event)*)
    };
}

#[macro_export]
macro_rules! incoming {
    (level = $level:ident, $($event:tt)*) => {
        $crate::directed!("incoming", $level, $($event)*)
    };
    ($($event:tt)*) => {
        $crate::directed!("incoming", TRACE, $($event)*)
    };
}

#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($event:tt)*) => {
        $crate::directed!("internal", $level, $($event)*)
    };
    ($($event:tt)*) => {
        $crate::directed!("internal", TRACE, $($event)*)
    };
}

const fn default_level() -> &'static str {
    if cfg!(debug_assertions) { "trace" } else { "info" }
}

fn tally_only(level: &str) -> String {
    format!("tally={level}")
}

/// Filter described by a `LOG_LEVEL` value.
///
/// A bare level applies to tally's own targets only; a value containing `=`
/// is used as a full directive list (`warn,tally_broker=trace`).
fn filter_from(value: Option<&str>) -> EnvFilter {
    let parsed = match value {
        None => EnvFilter::try_new(tally_only(default_level())),
        Some(directives) if directives.contains('=') => EnvFilter::try_new(directives),
        Some(level) => EnvFilter::try_new(tally_only(level)),
    };

    parsed.unwrap_or_else(|err| {
        eprintln!(
            "Invalid {LOG_ENV} {value:?} ({err}), defaulting to {}",
            default_level()
        );
        EnvFilter::new(tally_only(default_level()))
    })
}

/// Install the global subscriber, filtered by `LOG_LEVEL`.
///
/// Later calls are ignored.
pub fn init() {
    let filter = filter_from(std::env::var(LOG_ENV).ok().as_deref());

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(false)
                .with_line_number(false)
                .with_timer(ChronoUtc::rfc_3339())
                .with_filter(filter),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_targets_tally() {
        assert_eq!(filter_from(Some("warn")).to_string(), "tally=warn");
        assert_eq!(
            filter_from(None).to_string(),
            tally_only(default_level())
        );
    }

    #[test]
    fn directives_pass_through() {
        let filter = filter_from(Some("warn,tally_broker=debug")).to_string();
        assert!(filter.contains("tally_broker=debug"));
        assert!(filter.contains("warn"));
    }

    #[test]
    fn invalid_level_falls_back() {
        assert_eq!(
            filter_from(Some("loud")).to_string(),
            tally_only(default_level())
        );
    }

    #[test]
    fn macros_expand() {
        internal!("plain {}", 1);
        internal!(level = INFO, "with level {}", 2);
        incoming!(level = DEBUG, record = %"mytopic[0]@1", "structured");
        outgoing!("done");
    }
}
