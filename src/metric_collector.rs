use crate::coordinator::Status;

/// Sink notified after every refresh cycle, successful or not.
pub trait MetricCollector: Send {
    fn publish(&mut self, status: &Status);
}
