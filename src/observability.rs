use biometrics::{Collector, Counter, Moments};

pub(crate) static CHAT_REQUESTS: Counter = Counter::new("citechat.client.chat_requests");
pub(crate) static CHAT_ERRORS: Counter = Counter::new("citechat.client.chat_errors");
pub(crate) static CHAT_RETRYABLE_ERRORS: Counter =
    Counter::new("citechat.client.chat_retryable_errors");
pub(crate) static CHAT_BUSY: Counter = Counter::new("citechat.client.chat_busy");
pub(crate) static CHAT_DURATION: Moments =
    Moments::new("citechat.client.chat_duration_seconds");

pub(crate) static RATE_REQUESTS: Counter = Counter::new("citechat.client.rate_requests");
pub(crate) static RATE_ERRORS: Counter = Counter::new("citechat.client.rate_errors");
pub(crate) static RATE_DURATION: Moments =
    Moments::new("citechat.client.rate_duration_seconds");

pub(crate) static ANSWER_FOLLOWUPS: Counter = Counter::new("citechat.session.followups");
pub(crate) static SESSION_RETRIES: Counter = Counter::new("citechat.session.retries");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CHAT_REQUESTS);
    collector.register_counter(&CHAT_ERRORS);
    collector.register_counter(&CHAT_RETRYABLE_ERRORS);
    collector.register_counter(&CHAT_BUSY);
    collector.register_moments(&CHAT_DURATION);

    collector.register_counter(&RATE_REQUESTS);
    collector.register_counter(&RATE_ERRORS);
    collector.register_moments(&RATE_DURATION);

    collector.register_counter(&ANSWER_FOLLOWUPS);
    collector.register_counter(&SESSION_RETRIES);
}
