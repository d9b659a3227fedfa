pub mod clock;
pub mod events;
pub mod math;
pub mod schedule;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::events::{EventBus, SubscriberId, Topical};

    /// Drain a subscriber and keep only events matching `topic`.
    pub fn drain_topic<E: Topical + Clone>(
        bus: &mut EventBus<E>,
        sub: SubscriberId,
        topic: E::Topic,
    ) -> Vec<E> {
        bus.drain(sub)
            .into_iter()
            .filter(|e| e.topic() == topic)
            .collect()
    }

    /// Count drained events matching `topic`, discarding the rest.
    pub fn count_topic<E: Topical + Clone>(
        bus: &mut EventBus<E>,
        sub: SubscriberId,
        topic: E::Topic,
    ) -> usize {
        drain_topic(bus, sub, topic).len()
    }

    /// Count events of `topic` in an already-drained batch.
    pub fn topic_count<E: Topical>(events: &[E], topic: E::Topic) -> usize {
        events.iter().filter(|e| e.topic() == topic).count()
    }
}
