use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("dreamchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("dreamchat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("dreamchat.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("dreamchat.stream.events");
pub(crate) static STREAM_MALFORMED_EVENTS: Counter =
    Counter::new("dreamchat.stream.malformed_events");
pub(crate) static STREAM_BYTES: Counter = Counter::new("dreamchat.stream.bytes");
pub(crate) static STREAM_DURATION: Moments = Moments::new("dreamchat.stream.duration_seconds");

pub(crate) static SESSION_EXCHANGES: Counter = Counter::new("dreamchat.session.exchanges");
pub(crate) static SESSION_FAILURES: Counter = Counter::new("dreamchat.session.failures");
pub(crate) static SESSION_IMAGES: Counter = Counter::new("dreamchat.session.images");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_MALFORMED_EVENTS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_EXCHANGES);
    collector.register_counter(&SESSION_FAILURES);
    collector.register_counter(&SESSION_IMAGES);
}
