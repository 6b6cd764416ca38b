//! Narrow callback surface for presentation layers. The core never
//! touches a UI; anything that wants live output subscribes here.

use crate::logbook::LogRecord;
use crate::types::{ActionKind, ActionOutcome, RunStats};

/// Subscriber interface for log, stats, and action events. All methods
/// default to no-ops so implementors pick what they care about.
/// Callbacks fire from the scheduler loop; keep them cheap.
pub trait ConsoleObserver: Send + Sync {
    fn on_log(&self, _record: &LogRecord) {}

    fn on_stats_changed(&self, _stats: &RunStats) {}

    fn on_action_recorded(&self, _action: ActionKind, _outcome: ActionOutcome) {}
}

/// Observer that ignores everything
pub struct NullObserver;

impl ConsoleObserver for NullObserver {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logbook::{LogRecord, LogStatus};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        logs: Mutex<Vec<String>>,
        actions: Mutex<Vec<(ActionKind, ActionOutcome)>>,
    }

    impl ConsoleObserver for Recorder {
        fn on_log(&self, record: &LogRecord) {
            self.logs.lock().unwrap().push(record.details.clone());
        }

        fn on_action_recorded(&self, action: ActionKind, outcome: ActionOutcome) {
            self.actions.lock().unwrap().push((action, outcome));
        }
    }

    #[test]
    fn test_default_methods_are_no_ops() {
        let observer = NullObserver;
        observer.on_log(&LogRecord::new(LogStatus::Info, "hello"));
        observer.on_stats_changed(&RunStats::default());
        observer.on_action_recorded(ActionKind::Idle, ActionOutcome::Success);
    }

    #[test]
    fn test_custom_observer_receives_events() {
        let observer = Recorder::default();
        observer.on_log(&LogRecord::new(LogStatus::Info, "session start"));
        observer.on_action_recorded(ActionKind::Send, ActionOutcome::Skipped);

        assert_eq!(observer.logs.lock().unwrap().len(), 1);
        assert_eq!(
            observer.actions.lock().unwrap()[0],
            (ActionKind::Send, ActionOutcome::Skipped)
        );
    }
}
