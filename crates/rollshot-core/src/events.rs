use std::collections::VecDeque;

/// Types that carry a topic tag the bus can filter on.
pub trait Topical {
    type Topic: Copy + PartialEq;

    fn topic(&self) -> Self::Topic;
}

/// Handle returned by [`EventBus::subscribe`]; used to drain and unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Subscriber<E: Topical> {
    id: SubscriberId,
    /// `None` subscribes to every topic.
    filter: Option<Vec<E::Topic>>,
    queue: VecDeque<E>,
}

/// Topic-based publish/subscribe channel.
///
/// Single-threaded and pull-based: `publish` clones the event into each
/// matching subscriber queue, and consumers call `drain` on their own
/// schedule. Delivery order per subscriber is publication order. Consumers
/// never mutate core state through the bus.
pub struct EventBus<E: Topical> {
    subscribers: Vec<Subscriber<E>>,
    next_id: u64,
}

impl<E: Topical + Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Topical + Clone> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a subscriber. `filter: None` receives every topic.
    pub fn subscribe(&mut self, filter: Option<Vec<E::Topic>>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            filter,
            queue: VecDeque::new(),
        });
        id
    }

    /// Remove a subscriber and drop anything still queued for it.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        if self.subscribers.len() == before {
            tracing::debug!(?id, "unsubscribe for unknown subscriber ignored");
        }
    }

    /// Deliver an event to every subscriber whose filter matches its topic.
    pub fn publish(&mut self, event: E) {
        let topic = event.topic();
        for sub in &mut self.subscribers {
            let wants = match &sub.filter {
                None => true,
                Some(topics) => topics.contains(&topic),
            };
            if wants {
                sub.queue.push_back(event.clone());
            }
        }
    }

    /// Take everything queued for `id` since the last drain.
    pub fn drain(&mut self, id: SubscriberId) -> Vec<E> {
        match self.subscribers.iter_mut().find(|s| s.id == id) {
            Some(sub) => sub.queue.drain(..).collect(),
            None => {
                tracing::debug!(?id, "drain for unknown subscriber ignored");
                Vec::new()
            },
        }
    }

    /// Number of events queued for `id` (0 for unknown subscribers).
    pub fn pending(&self, id: SubscriberId) -> usize {
        self.subscribers
            .iter()
            .find(|s| s.id == id)
            .map_or(0, |s| s.queue.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum TestTopic {
        Alpha,
        Beta,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct TestEvent {
        topic: TestTopic,
        value: u32,
    }

    impl Topical for TestEvent {
        type Topic = TestTopic;
        fn topic(&self) -> TestTopic {
            self.topic
        }
    }

    fn ev(topic: TestTopic, value: u32) -> TestEvent {
        TestEvent { topic, value }
    }

    #[test]
    fn all_topics_subscriber_sees_everything() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe(None);
        bus.publish(ev(TestTopic::Alpha, 1));
        bus.publish(ev(TestTopic::Beta, 2));

        let got = bus.drain(sub);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].value, 1);
        assert_eq!(got[1].value, 2);
    }

    #[test]
    fn filter_restricts_delivery() {
        let mut bus = EventBus::new();
        let alpha_only = bus.subscribe(Some(vec![TestTopic::Alpha]));
        bus.publish(ev(TestTopic::Alpha, 1));
        bus.publish(ev(TestTopic::Beta, 2));

        let got = bus.drain(alpha_only);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].topic, TestTopic::Alpha);
    }

    #[test]
    fn drain_empties_queue() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe(None);
        bus.publish(ev(TestTopic::Alpha, 1));
        assert_eq!(bus.drain(sub).len(), 1);
        assert!(bus.drain(sub).is_empty());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe(None);
        bus.unsubscribe(sub);
        bus.publish(ev(TestTopic::Alpha, 1));
        assert!(bus.drain(sub).is_empty());
    }

    #[test]
    fn unknown_subscriber_is_noop() {
        let mut bus = EventBus::<TestEvent>::new();
        let sub = bus.subscribe(None);
        bus.unsubscribe(sub);
        // Double-unsubscribe and drain after removal must not panic.
        bus.unsubscribe(sub);
        assert!(bus.drain(sub).is_empty());
        assert_eq!(bus.pending(sub), 0);
    }

    #[test]
    fn independent_queues_per_subscriber() {
        let mut bus = EventBus::new();
        let a = bus.subscribe(None);
        let b = bus.subscribe(None);
        bus.publish(ev(TestTopic::Beta, 7));

        assert_eq!(bus.drain(a).len(), 1);
        // Draining a does not consume b's copy
        assert_eq!(bus.drain(b).len(), 1);
    }
}
