use chrono::{DateTime, Utc};

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(crate) fn job_timestamp(clock: &dyn Clock) -> String {
    clock.now_utc().format(TIMESTAMP_FORMAT).to_string()
}
