//! Data provider change events and listener fan-out.
//!
//! Providers announce two kinds of change: `Refresh` (everything may have
//! changed, consumers should re-fetch) and `Mutate` (a described set of
//! rows was added, removed, or updated). [`EventDispatcher`] keeps the
//! registered listeners and fans each event out to those interested in its
//! type.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::{ItemMetadata, Key, Value};

/// Event type a listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Refresh,
    Mutate,
}

/// One group of rows affected by a mutation.
///
/// `keys` is always present. `data`, `metadata`, and `indexes`, when
/// present, are parallel to `keys`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOperation {
    pub keys: Vec<Key>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<Vec<ItemMetadata>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub indexes: Option<Vec<usize>>,
}

/// Detail of a `Mutate` event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationDetail {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub add: Option<MutationOperation>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub remove: Option<MutationOperation>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub update: Option<MutationOperation>,
}

/// A change notification emitted by a data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "detail")]
pub enum DataProviderEvent {
    Refresh,
    Mutate(MutationDetail),
}

impl DataProviderEvent {
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            DataProviderEvent::Refresh => EventType::Refresh,
            DataProviderEvent::Mutate(_) => EventType::Mutate,
        }
    }
}

/// Receiver of data provider events.
///
/// Used as `Arc<dyn DataProviderListener>`. Closures taking
/// `&DataProviderEvent` implement it directly.
pub trait DataProviderListener: Send + Sync {
    fn on_event(&self, event: &DataProviderEvent);
}

impl<F> DataProviderListener for F
where
    F: Fn(&DataProviderEvent) + Send + Sync,
{
    fn on_event(&self, event: &DataProviderEvent) {
        self(event);
    }
}

/// Handle identifying one registration, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    event_type: EventType,
    listener: Arc<dyn DataProviderListener>,
}

/// Fan-out of events to registered listeners, filtered by event type.
///
/// Dispatch iterates a snapshot of the registrations, so a listener may add
/// or remove listeners while handling an event.
#[derive(Default)]
pub struct EventDispatcher {
    registrations: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for events of `event_type`.
    pub fn add_listener(
        &self,
        event_type: EventType,
        listener: Arc<dyn DataProviderListener>,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registrations.write().push(Registration {
            id,
            event_type,
            listener,
        });
        id
    }

    /// Removes a registration. Returns `false` if `id` was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut registrations = self.registrations.write();
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }

    /// Number of current registrations.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registrations.read().len()
    }

    /// Delivers `event` to every listener registered for its type.
    pub fn dispatch(&self, event: &DataProviderEvent) {
        let event_type = event.event_type();
        let targets: Vec<Arc<dyn DataProviderListener>> = self
            .registrations
            .read()
            .iter()
            .filter(|r| r.event_type == event_type)
            .map(|r| Arc::clone(&r.listener))
            .collect();
        tracing::trace!(?event_type, listeners = targets.len(), "dispatching data provider event");
        for listener in targets {
            listener.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Default)]
    struct CountingListener {
        count: AtomicUsize,
    }

    impl DataProviderListener for CountingListener {
        fn on_event(&self, _: &DataProviderEvent) {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn mutate_event() -> DataProviderEvent {
        DataProviderEvent::Mutate(MutationDetail {
            remove: Some(MutationOperation {
                keys: vec![Key::Int(1)],
                ..MutationOperation::default()
            }),
            ..MutationDetail::default()
        })
    }

    #[test]
    fn empty_dispatcher_does_not_panic() {
        let dispatcher = EventDispatcher::new();
        dispatcher.dispatch(&DataProviderEvent::Refresh);
        dispatcher.dispatch(&mutate_event());
    }

    #[test]
    fn listeners_only_receive_their_event_type() {
        let dispatcher = EventDispatcher::new();
        let refresh = Arc::new(CountingListener::default());
        let mutate = Arc::new(CountingListener::default());
        dispatcher.add_listener(EventType::Refresh, Arc::clone(&refresh) as _);
        dispatcher.add_listener(EventType::Mutate, Arc::clone(&mutate) as _);

        dispatcher.dispatch(&DataProviderEvent::Refresh);
        dispatcher.dispatch(&mutate_event());
        dispatcher.dispatch(&mutate_event());

        assert_eq!(refresh.count.load(Ordering::Relaxed), 1);
        assert_eq!(mutate.count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn removed_listener_stops_receiving() {
        let dispatcher = EventDispatcher::new();
        let listener = Arc::new(CountingListener::default());
        let id = dispatcher.add_listener(EventType::Refresh, Arc::clone(&listener) as _);

        dispatcher.dispatch(&DataProviderEvent::Refresh);
        assert!(dispatcher.remove_listener(id));
        assert!(!dispatcher.remove_listener(id));
        dispatcher.dispatch(&DataProviderEvent::Refresh);

        assert_eq!(listener.count.load(Ordering::Relaxed), 1);
        assert_eq!(dispatcher.listener_count(), 0);
    }

    #[test]
    fn closures_are_listeners() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(RwLock::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.add_listener(
            EventType::Mutate,
            Arc::new(move |event: &DataProviderEvent| sink.write().push(event.clone())),
        );

        dispatcher.dispatch(&mutate_event());
        assert_eq!(*seen.read(), vec![mutate_event()]);
    }

    #[test]
    fn listener_may_unregister_itself_during_dispatch() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let slot: Arc<RwLock<Option<ListenerId>>> = Arc::new(RwLock::new(None));
        let (d, s) = (Arc::clone(&dispatcher), Arc::clone(&slot));
        let id = dispatcher.add_listener(
            EventType::Refresh,
            Arc::new(move |_: &DataProviderEvent| {
                if let Some(id) = *s.read() {
                    d.remove_listener(id);
                }
            }),
        );
        *slot.write() = Some(id);

        dispatcher.dispatch(&DataProviderEvent::Refresh);
        assert_eq!(dispatcher.listener_count(), 0);
    }

    #[test]
    fn mutate_event_serializes_with_detail() {
        let json = serde_json::to_value(mutate_event()).unwrap();
        assert_eq!(json["type"], "mutate");
        assert_eq!(json["detail"]["remove"]["keys"][0]["Int"], 1);
    }
}
