use std::collections::BTreeSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use crate::keys::{InputEvent, InputState, KeyBindings};

/// Cloneable write end of the input channel.
///
/// Hosts may hold this on any thread; events are buffered until the frame
/// loop drains them.
#[derive(Debug, Clone)]
pub struct InputSender {
    tx: Sender<InputEvent>,
}

impl InputSender {
    /// Queue an event. Returns `false` once the channel has been dropped.
    pub fn send(&self, event: InputEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn key_down(&self, code: impl Into<String>) -> bool {
        self.send(InputEvent::KeyDown(code.into()))
    }

    pub fn key_up(&self, code: impl Into<String>) -> bool {
        self.send(InputEvent::KeyUp(code.into()))
    }
}

type Registry = Arc<Mutex<BTreeSet<u64>>>;

/// Scoped listener registration. Dropping it unregisters the listener.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Registry,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.remove(&self.id);
        tracing::debug!(subscription = self.id, "input listener released");
    }
}

/// Engine-owned input channel.
///
/// Events arrive through [`InputSender`]s and are applied to a single
/// [`InputState`] snapshot when the frame loop calls [`InputChannel::drain`].
#[derive(Debug)]
pub struct InputChannel {
    tx: Sender<InputEvent>,
    rx: Receiver<InputEvent>,
    bindings: KeyBindings,
    state: InputState,
    registry: Registry,
    next_id: u64,
}

impl Default for InputChannel {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}

impl InputChannel {
    pub fn new(bindings: KeyBindings) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            bindings,
            state: InputState::default(),
            registry: Arc::new(Mutex::new(BTreeSet::new())),
            next_id: 0,
        }
    }

    pub fn sender(&self) -> InputSender {
        InputSender {
            tx: self.tx.clone(),
        }
    }

    /// Register a listener. The returned handle must be kept alive for as
    /// long as the listener wants to see input.
    pub fn subscribe(&mut self) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        tracing::debug!(subscription = id, "input listener registered");
        Subscription {
            id,
            registry: Arc::clone(&self.registry),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_subscribed(&self, subscription: &Subscription) -> bool {
        registered(&self.registry, subscription)
    }

    /// Apply every queued event to the snapshot. Returns how many events
    /// were consumed.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.state.apply(&event, &self.bindings);
            count += 1;
        }
        if count > 0 {
            tracing::trace!(events = count, "input drained");
        }
        count
    }

    /// Current snapshot, regardless of subscription.
    pub fn state(&self) -> &InputState {
        &self.state
    }

    /// Snapshot as seen by a listener. `None` if the subscription does not
    /// belong to this channel.
    pub fn snapshot_for(&self, subscription: &Subscription) -> Option<&InputState> {
        self.snapshot().for_subscription(subscription)
    }

    /// Read-only view of the drained state that can be shared across
    /// threads during the update pass.
    pub fn snapshot(&self) -> InputSnapshot<'_> {
        InputSnapshot {
            state: &self.state,
            registry: &self.registry,
        }
    }

    /// Forget every held key (e.g. when the host window loses focus).
    pub fn reset(&mut self) {
        while self.rx.try_recv().is_ok() {}
        self.state.clear();
    }
}

fn registered(registry: &Registry, subscription: &Subscription) -> bool {
    Arc::ptr_eq(registry, &subscription.registry)
        && registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&subscription.id)
}

/// Borrowed input state plus the listener registry, without the receiving
/// end of the channel. `Sync`, unlike [`InputChannel`].
#[derive(Debug, Clone, Copy)]
pub struct InputSnapshot<'a> {
    state: &'a InputState,
    registry: &'a Registry,
}

impl<'a> InputSnapshot<'a> {
    pub fn state(&self) -> &'a InputState {
        self.state
    }

    /// `None` if the subscription is released or belongs to another channel.
    pub fn for_subscription(&self, subscription: &Subscription) -> Option<&'a InputState> {
        registered(self.registry, subscription).then_some(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::MoveKey;

    #[test]
    fn events_are_invisible_until_drained() {
        let mut ch = InputChannel::default();
        let tx = ch.sender();
        tx.key_down("KeyW");
        assert!(ch.state().is_idle());
        assert_eq!(ch.drain(), 1);
        assert!(ch.state().is_held(MoveKey::Forward));
    }

    #[test]
    fn press_release_within_one_frame_nets_out() {
        let mut ch = InputChannel::default();
        let tx = ch.sender();
        tx.key_down("KeyA");
        tx.key_up("KeyA");
        ch.drain();
        assert!(ch.state().is_idle());
    }

    #[test]
    fn sender_works_across_threads() {
        let mut ch = InputChannel::default();
        let tx = ch.sender();
        std::thread::spawn(move || {
            tx.key_down("KeyD");
        })
        .join()
        .unwrap();
        ch.drain();
        assert!(ch.state().is_held(MoveKey::Right));
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let mut ch = InputChannel::default();
        let sub = ch.subscribe();
        assert_eq!(ch.listener_count(), 1);
        assert!(ch.snapshot_for(&sub).is_some());
        drop(sub);
        assert_eq!(ch.listener_count(), 0);
    }

    #[test]
    fn foreign_subscription_sees_nothing() {
        let mut a = InputChannel::default();
        let mut b = InputChannel::default();
        let sub_b = b.subscribe();
        let _sub_a = a.subscribe();
        assert!(a.snapshot_for(&sub_b).is_none());
    }

    #[test]
    fn snapshot_is_shareable_across_threads() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<InputSnapshot<'static>>();

        let mut ch = InputChannel::default();
        let sub = ch.subscribe();
        let other = InputChannel::default().subscribe();
        ch.sender().key_down("KeyW");
        ch.drain();

        let snapshot = ch.snapshot();
        std::thread::scope(|s| {
            s.spawn(|| {
                let state = snapshot.for_subscription(&sub).unwrap();
                assert!(state.is_held(MoveKey::Forward));
                assert!(snapshot.for_subscription(&other).is_none());
            });
        });
    }

    #[test]
    fn reset_clears_pending_and_held() {
        let mut ch = InputChannel::default();
        let tx = ch.sender();
        tx.key_down("KeyW");
        ch.drain();
        tx.key_down("KeyS");
        ch.reset();
        ch.drain();
        assert!(ch.state().is_idle());
    }
}
