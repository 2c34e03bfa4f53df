// Observer primitives
//
// Signals with slot-map backed connections, observable property cells, and the
// release handles that tie a connection back to the signal it was made on.
// Everything here is synchronous: `emit` runs every connected slot before it
// returns, in connection order.

use parking_lot::{Mutex, RwLock};
use slotmap::{SlotMap, new_key_type};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;

new_key_type! {
    /// Identifier of a single slot connected to a [`Signal`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A synchronous multi-slot notification source.
///
/// Slots are snapshotted before they are invoked, so a slot may connect,
/// disconnect or emit other signals without deadlocking.
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    /// Create a signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot. The returned id disconnects it again.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// Disconnect a slot. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.lock().contains_key(id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// While blocked, `emit` does nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Invoke every connected slot with `args`.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!("signal blocked, skipping emit");
            return;
        }

        let slots: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        for slot in slots {
            slot(&args);
        }
    }
}

impl<Args> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connection_count())
            .field("blocked", &self.is_blocked())
            .finish()
    }
}

/// An observable value cell.
///
/// `set` only notifies when the value actually changes, which is what keeps
/// two-way bindings from ping-ponging.
pub struct Property<T> {
    value: RwLock<T>,
    changed: Arc<Signal<T>>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            changed: Arc::new(Signal::new()),
        }
    }

    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value without cloning it.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Store `value` and notify observers. Returns `false` (and stays silent)
    /// when the value is unchanged.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.value.write();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.changed.emit(value);
        true
    }

    /// Store `value` without notifying anyone.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }

    /// Register an observer of future changes.
    pub fn observe<F>(&self, observer: F) -> ConnectionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.changed.connect(observer)
    }

    /// The change signal, for building release handles.
    pub fn changed(&self) -> &Arc<Signal<T>> {
        &self.changed
    }

    pub fn observer_count(&self) -> usize {
        self.changed.connection_count()
    }
}

impl<T: Clone + PartialEq + Send + Sync + Default + 'static> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &*self.value.read())
            .finish()
    }
}

/// Failure to release a single observer handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReleaseError {
    #[error("source of '{label}' was dropped before release")]
    SourceDropped { label: String },

    #[error("'{label}' was no longer connected")]
    NotConnected { label: String },
}

type Releaser = Box<dyn FnOnce() -> Result<(), ReleaseError> + Send>;

/// Release handle for one connection.
///
/// `release` consumes the handle, so a handle can be released at most once.
/// A handle dropped without an explicit release disconnects itself.
pub struct Subscription {
    label: String,
    releaser: Option<Releaser>,
}

impl Subscription {
    /// Track connection `id` on `signal`. The handle keeps only a weak
    /// reference to the signal.
    pub fn new<Args: 'static>(
        label: impl Into<String>,
        signal: &Arc<Signal<Args>>,
        id: ConnectionId,
    ) -> Self {
        let label = label.into();
        let source: Weak<Signal<Args>> = Arc::downgrade(signal);
        let releaser_label = label.clone();

        let releaser: Releaser = Box::new(move || match source.upgrade() {
            None => Err(ReleaseError::SourceDropped {
                label: releaser_label,
            }),
            Some(signal) if signal.disconnect(id) => Ok(()),
            Some(_) => Err(ReleaseError::NotConnected {
                label: releaser_label,
            }),
        });

        Self {
            label,
            releaser: Some(releaser),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Disconnect the tracked connection.
    pub fn release(mut self) -> Result<(), ReleaseError> {
        match self.releaser.take() {
            Some(releaser) => releaser(),
            None => Ok(()),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(releaser) = self.releaser.take() {
            if let Err(e) = releaser() {
                tracing::trace!("Implicit release of '{}' failed: {}", self.label, e);
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("live", &self.releaser.is_some())
            .finish()
    }
}

/// Propagate `read(source)` into `write(target)` through `map`, now and on
/// every later change of the source.
pub fn bind_one_way<S, T, V, W>(
    source: &Arc<S>,
    read: fn(&S) -> &Property<V>,
    target: &Arc<T>,
    write: fn(&T) -> &Property<W>,
    map: fn(&V) -> W,
    label: &str,
) -> Subscription
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
    W: Clone + PartialEq + Send + Sync + 'static,
{
    write(target).set(read(source).with(map));

    let weak_target = Arc::downgrade(target);
    let id = read(source).observe(move |value| {
        if let Some(target) = weak_target.upgrade() {
            write(&target).set(map(value));
        }
    });

    Subscription::new(label, read(source).changed(), id)
}

/// Keep `a(source)` and `b(target)` equal in both directions.
///
/// Built from two one-way observers sharing a guard: a value received through
/// the binding is never published back through it. The target takes the
/// source's value on creation.
pub fn bind_two_way<S, T, V>(
    source: &Arc<S>,
    a: fn(&S) -> &Property<V>,
    target: &Arc<T>,
    b: fn(&T) -> &Property<V>,
    label: &str,
) -> [Subscription; 2]
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    b(target).set(a(source).get());

    let guard = Arc::new(AtomicBool::new(false));

    let forward = {
        let weak_target = Arc::downgrade(target);
        let guard = Arc::clone(&guard);
        a(source).observe(move |value| {
            if guard.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(target) = weak_target.upgrade() {
                b(&target).set(value.clone());
            }
            guard.store(false, Ordering::SeqCst);
        })
    };

    let backward = {
        let weak_source = Arc::downgrade(source);
        let guard = Arc::clone(&guard);
        b(target).observe(move |value| {
            if guard.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(source) = weak_source.upgrade() {
                a(&source).set(value.clone());
            }
            guard.store(false, Ordering::SeqCst);
        })
    };

    [
        Subscription::new(format!("{label} (forward)"), a(source).changed(), forward),
        Subscription::new(format!("{label} (backward)"), b(target).changed(), backward),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Pair {
        left: Property<bool>,
        label: Property<String>,
    }

    impl Pair {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                left: Property::new(false),
                label: Property::new(String::new()),
            })
        }

        fn left(&self) -> &Property<bool> {
            &self.left
        }

        fn label(&self) -> &Property<String> {
            &self.label
        }
    }

    #[test]
    fn test_signal_emit_reaches_all_slots() {
        let signal = Signal::<u32>::new();
        let total = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let total = total.clone();
            signal.connect(move |n| {
                total.fetch_add(*n as usize, Ordering::SeqCst);
            });
        }

        signal.emit(2);
        assert_eq!(total.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_blocked_signal_is_silent() {
        let signal = Signal::<()>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        signal.connect(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.set_blocked(true);
        signal.emit(());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_slot_may_disconnect_itself_during_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let weak = Arc::downgrade(&signal);
        let id_cell = Arc::new(Mutex::new(None::<ConnectionId>));
        let id_clone = id_cell.clone();

        let id = signal.connect(move |_| {
            if let (Some(signal), Some(id)) = (weak.upgrade(), *id_clone.lock()) {
                signal.disconnect(id);
            }
        });
        *id_cell.lock() = Some(id);

        signal.emit(());
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_property_notifies_only_on_change() {
        let prop = Property::new(1);
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        prop.observe(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!prop.set(1));
        assert!(prop.set(2));
        prop.set_silent(5);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(prop.get(), 5);
    }

    #[test]
    fn test_subscription_release_disconnects() {
        let prop = Property::new(0u8);
        let id = prop.observe(|_| {});
        let sub = Subscription::new("counter", prop.changed(), id);

        assert_eq!(prop.observer_count(), 1);
        assert!(sub.release().is_ok());
        assert_eq!(prop.observer_count(), 0);
    }

    #[test]
    fn test_release_reports_missing_connection() {
        let prop = Property::new(0u8);
        let id = prop.observe(|_| {});
        let sub = Subscription::new("counter", prop.changed(), id);

        prop.changed().disconnect_all();
        assert_eq!(
            sub.release(),
            Err(ReleaseError::NotConnected {
                label: "counter".to_string()
            })
        );
    }

    #[test]
    fn test_release_reports_dropped_source() {
        let sub = {
            let prop = Property::new(0u8);
            let id = prop.observe(|_| {});
            Subscription::new("gone", prop.changed(), id)
        };

        assert!(matches!(
            sub.release(),
            Err(ReleaseError::SourceDropped { .. })
        ));
    }

    #[test]
    fn test_dropped_subscription_disconnects() {
        let prop = Property::new(0u8);
        {
            let id = prop.observe(|_| {});
            let _sub = Subscription::new("scoped", prop.changed(), id);
            assert_eq!(prop.observer_count(), 1);
        }
        assert_eq!(prop.observer_count(), 0);
    }

    #[test]
    fn test_one_way_binding_maps_values() {
        let source = Pair::new();
        let target = Pair::new();
        fn describe(v: &bool) -> String {
            if *v { "on".into() } else { "off".into() }
        }

        let sub = bind_one_way(&source, Pair::left, &target, Pair::label, describe, "describe");
        assert_eq!(target.label.get(), "off");

        source.left.set(true);
        assert_eq!(target.label.get(), "on");

        sub.release().unwrap();
        source.left.set(false);
        assert_eq!(target.label.get(), "on");
    }

    #[test]
    fn test_two_way_binding_syncs_both_directions() {
        let source = Pair::new();
        let target = Pair::new();
        source.left.set(true);

        let [forward, backward] = bind_two_way(&source, Pair::left, &target, Pair::left, "left");
        assert!(target.left.get());

        target.left.set(false);
        assert!(!source.left.get());

        source.left.set(true);
        assert!(target.left.get());

        forward.release().unwrap();
        backward.release().unwrap();
        assert_eq!(source.left.observer_count(), 0);
        assert_eq!(target.left.observer_count(), 0);
    }

    #[test]
    fn test_two_way_binding_does_not_echo() {
        let source = Pair::new();
        let target = Pair::new();
        let _subs = bind_two_way(&source, Pair::left, &target, Pair::left, "left");

        let source_hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = source_hits.clone();
        source.left.observe(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        target.left.set(true);
        assert_eq!(source_hits.load(Ordering::SeqCst), 1);
    }
}
