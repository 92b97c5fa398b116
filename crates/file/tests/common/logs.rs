//! Captures warnings emitted while a test runs

use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Messages of every `warn!` seen by the capture layer
#[derive(Debug, Clone, Default)]
pub struct WarnStore(Arc<Mutex<Vec<String>>>);

impl WarnStore {
    /// All captured messages, in emission order
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// True if any captured message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.0.lock().unwrap().iter().any(|m| m.contains(needle))
    }
}

struct WarnLayer {
    store: WarnStore,
}

struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for WarnLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if let Some(message) = visitor.0 {
            self.store.0.lock().unwrap().push(message);
        }
    }
}

/// Install the capture layer for the current thread.
///
/// Hold the guard for the duration of the test.
pub fn capture_warnings() -> (WarnStore, tracing::subscriber::DefaultGuard) {
    let store = WarnStore::default();
    let subscriber = tracing_subscriber::registry().with(WarnLayer {
        store: store.clone(),
    });
    let guard = tracing::subscriber::set_default(subscriber);
    (store, guard)
}
