//! Client-side view of the counter
//!
//! Keeps the last counter received from a [`CounterService`] plus the two
//! flags that drive what is shown.  Failures are logged and otherwise
//! ignored: the view keeps showing whatever it showed before.

use crate::model::Counter;
use crate::model::Increment;
use crate::service::CounterService;
use chrono::Local;
use slog::error;

pub struct CounterView<S> {
    log: slog::Logger,
    service: S,
    counter: Option<Counter>,
    is_loading: bool,
    is_incrementing: bool,
}

impl<S: CounterService> CounterView<S> {
    pub fn new(log: slog::Logger, service: S) -> CounterView<S> {
        CounterView {
            log,
            service,
            counter: None,
            is_loading: false,
            is_incrementing: false,
        }
    }

    pub fn counter(&self) -> Option<&Counter> {
        self.counter.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_incrementing(&self) -> bool {
        self.is_incrementing
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Mark the view as loading.  Returns false if a load is already running.
    pub fn begin_load(&mut self) -> bool {
        if self.is_loading {
            return false;
        }
        self.is_loading = true;
        true
    }

    pub fn finish_load(&mut self, result: anyhow::Result<Counter>) {
        match result {
            Ok(counter) => self.counter = Some(counter),
            Err(error) => {
                error!(&self.log, "failed to load counter";
                    "error_message" => #%error);
            }
        }
        self.is_loading = false;
    }

    /// Fetch the counter.  Called once when the view is first shown.
    pub async fn load(&mut self) {
        if !self.begin_load() {
            return;
        }
        let result = self.service.get_counter().await;
        self.finish_load(result);
    }

    /// Mark an increment as in flight.  Returns false (and changes nothing)
    /// if one is already running, the way a disabled button ignores clicks.
    pub fn begin_increment(&mut self) -> bool {
        if self.is_incrementing {
            return false;
        }
        self.is_incrementing = true;
        true
    }

    pub fn finish_increment(&mut self, result: anyhow::Result<Counter>) {
        match result {
            Ok(counter) => self.counter = Some(counter),
            Err(error) => {
                error!(&self.log, "failed to increment counter";
                    "error_message" => #%error);
            }
        }
        self.is_incrementing = false;
    }

    /// Add one to the counter.
    pub async fn increment(&mut self) {
        if !self.begin_increment() {
            return;
        }
        let result = self.service.increment_counter(Increment::ONE).await;
        self.finish_increment(result);
    }

    pub fn render(&self) -> String {
        let counter = match &self.counter {
            Some(counter) if !self.is_loading => counter,
            _ => return String::from("Loading counter..."),
        };

        let button = if self.is_incrementing {
            "[ Incrementing... ]"
        } else {
            "[ Increment ]"
        };
        let updated_at = counter.updated_at.with_timezone(&Local);
        format!(
            "Counter App\n\n{:>8}\nCurrent Count\n\n{}\n\nLast updated: {}",
            counter.count,
            button,
            updated_at.format("%Y-%m-%d %H:%M:%S"),
        )
    }
}
