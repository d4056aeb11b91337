//! Tools to help testing metrics

use cadence::{SpyMetricSink, StatsdClient};
use crossbeam_channel::Receiver;
use statsd_parser::Message;

/// Helper to collect metrics during tests, and make assertions about them.
pub struct MetricsWatcher {
    /// Receives metric lines as bytes.
    rx: Receiver<Vec<u8>>,

    /// Metrics received so far from [`rx`](Self::rx).
    messages: Vec<Message>,
}

impl MetricsWatcher {
    /// Make a new metrics watcher, attach it to a [`StatsdClient`] and return both.
    pub fn new_with_client() -> (Self, StatsdClient) {
        let (rx, spy_sink) = SpyMetricSink::new();
        let metrics_client = StatsdClient::from_sink("", spy_sink);
        let metrics_watcher = Self {
            rx,
            messages: vec![],
        };

        (metrics_watcher, metrics_client)
    }

    /// Parse any metrics waiting in `rx`.
    fn process_events(&mut self) {
        self.messages.extend(self.rx.try_iter().map(|bytes| {
            let line = String::from_utf8(bytes).expect("Invalid UTF8 in metric message");
            statsd_parser::parse(line).expect("Metric message parse error")
        }));
    }

    /// All the metrics seen by this watcher, primarily for debugging.
    pub fn all_messages(&mut self) -> &[Message] {
        self.process_events();
        self.messages.as_slice()
    }

    /// Test if any metric this watcher received matches `predicate`.
    pub fn has<F>(&mut self, predicate: F) -> bool
    where
        F: FnMut(&Message) -> bool,
    {
        self.all_messages().iter().any(predicate)
    }

    /// Test if any metric named `name` was received with `tag` set to `value`.
    pub fn has_tagged(&mut self, name: &str, tag: &str, value: &str) -> bool {
        self.has(|message| {
            message.name == name
                && message
                    .tags
                    .as_ref()
                    .and_then(|tags| tags.get(tag))
                    .map_or(false, |tag_value| tag_value == value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::MetricsWatcher;
    use cadence::{CountedExt, Timed};
    use statsd_parser::{Counter, Metric};
    use std::time::Duration;

    #[test]
    fn counters_are_seen() {
        let (mut metrics_watcher, metrics_client) = MetricsWatcher::new_with_client();
        metrics_client.incr("a-metric").expect("could not send metric");

        assert!(metrics_watcher.has(|msg| {
            msg.name == "a-metric"
                && matches!(msg.metric, Metric::Counter(Counter { value, .. }) if value == 1.0)
        }));
    }

    #[test]
    fn tags_are_seen() {
        let (mut metrics_watcher, metrics_client) = MetricsWatcher::new_with_client();
        metrics_client
            .time_with_tags("request.duration", Duration::from_millis(3))
            .with_tag("status", "200")
            .send();

        assert!(metrics_watcher.has_tagged("request.duration", "status", "200"));
        assert!(!metrics_watcher.has_tagged("request.duration", "status", "404"));
    }
}
