//! Worker metrics.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "docflow_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "docflow_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "docflow_jobs_failed_total";
    pub const JOBS_IN_FLIGHT: &str = "docflow_jobs_in_flight";
    pub const JOB_DURATION_SECONDS: &str = "docflow_job_duration_seconds";
    pub const JOBS_RECOVERED_TOTAL: &str = "docflow_jobs_recovered_total";
}

/// Counts a started job and holds it in the in-flight gauge until dropped.
///
/// Dropping covers every exit: terminal writes, errors, and tasks aborted at
/// shutdown.
#[must_use]
pub struct InFlightGuard(());

impl InFlightGuard {
    pub fn start() -> Self {
        counter!(names::JOBS_STARTED_TOTAL).increment(1);
        gauge!(names::JOBS_IN_FLIGHT).increment(1.0);
        Self(())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(names::JOBS_IN_FLIGHT).decrement(1.0);
    }
}

pub fn record_job_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "status" => "complete").record(duration_secs);
}

pub fn record_job_failed(duration_secs: f64) {
    counter!(names::JOBS_FAILED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "status" => "error").record(duration_secs);
}

pub fn record_jobs_recovered(action: &'static str, count: usize) {
    counter!(names::JOBS_RECOVERED_TOTAL, "action" => action).increment(count as u64);
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use metrics::{
        Counter, Gauge, GaugeFn, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };

    use super::*;

    #[derive(Default)]
    struct Level(Mutex<f64>);

    impl GaugeFn for Level {
        fn increment(&self, value: f64) {
            *self.0.lock().unwrap() += value;
        }

        fn decrement(&self, value: f64) {
            *self.0.lock().unwrap() -= value;
        }

        fn set(&self, value: f64) {
            *self.0.lock().unwrap() = value;
        }
    }

    /// Records only the in-flight gauge.
    #[derive(Default)]
    struct InFlightRecorder {
        level: Arc<Level>,
    }

    impl InFlightRecorder {
        fn value(&self) -> f64 {
            *self.level.0.lock().unwrap()
        }
    }

    impl Recorder for InFlightRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
            Counter::noop()
        }

        fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
            if key.name() == names::JOBS_IN_FLIGHT {
                Gauge::from_arc(self.level.clone())
            } else {
                Gauge::noop()
            }
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn test_in_flight_returns_to_zero_on_every_exit() {
        let recorder = InFlightRecorder::default();
        metrics::with_local_recorder(&recorder, || {
            let first = InFlightGuard::start();
            let second = InFlightGuard::start();
            assert_eq!(recorder.value(), 2.0);

            record_job_failed(0.5);
            assert_eq!(recorder.value(), 2.0);

            drop(first);
            assert_eq!(recorder.value(), 1.0);

            let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
                let _held = second;
                panic!("aborted");
            }));
            assert!(unwound.is_err());
            assert_eq!(recorder.value(), 0.0);
        });
    }
}
