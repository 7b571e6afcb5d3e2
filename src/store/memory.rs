//! In-process counter store
//!
//! Holds rows the way the `counter` table would: ids come from a sequence,
//! and the operations always act on the row with the lowest id.

use crate::model::Counter;
use crate::model::Increment;
use crate::model::NewCounter;
use crate::service::CounterService;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use slog::error;
use slog::info;
use std::sync::Mutex;

pub struct MemoryCounterStore {
    log: slog::Logger,
    table: Mutex<Table>,
}

#[derive(Default)]
struct Table {
    rows: Vec<Counter>,
    next_id: i32,
}

impl Table {
    fn insert(&mut self, new: NewCounter) -> Counter {
        self.next_id += 1;
        let counter = Counter {
            id: self.next_id,
            count: new.count,
            updated_at: new.updated_at,
        };
        self.rows.push(counter.clone());
        counter
    }
}

impl MemoryCounterStore {
    pub fn new(log: slog::Logger) -> MemoryCounterStore {
        MemoryCounterStore { log, table: Mutex::new(Table::default()) }
    }

    /// Insert a row directly, bypassing the counter operations.
    pub fn insert_row(&self, new: NewCounter) -> Counter {
        self.lock().insert(new)
    }

    /// Snapshot of every row, in id order.
    pub fn rows(&self) -> Vec<Counter> {
        self.lock().rows.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Table> {
        // Nothing panics while holding the lock, so a poisoned mutex still
        // holds a consistent table.
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CounterService for MemoryCounterStore {
    async fn get_counter(&self) -> anyhow::Result<Counter> {
        let mut table = self.lock();
        if let Some(counter) = table.rows.first() {
            return Ok(counter.clone());
        }

        let counter = table.insert(NewCounter::now(0));
        info!(&self.log, "created counter";
            "id" => counter.id, "count" => counter.count);
        Ok(counter)
    }

    async fn increment_counter(
        &self,
        increment: Increment,
    ) -> anyhow::Result<Counter> {
        let mut table = self.lock();
        let Some(current) = table.rows.first_mut() else {
            let counter = table.insert(NewCounter::now(increment.get()));
            info!(&self.log, "created counter";
                "id" => counter.id, "count" => counter.count);
            return Ok(counter);
        };

        let Some(new_count) = current.count.checked_add(increment.get())
        else {
            let error = anyhow!(
                "incrementing counter {} by {} would overflow",
                current.count,
                increment.get()
            );
            error!(&self.log, "counter increment failed";
                "error_message" => #%error);
            return Err(error);
        };

        current.count = new_count;
        current.updated_at = Utc::now();
        info!(&self.log, "incremented counter";
            "id" => current.id,
            "increment" => increment.get(),
            "count" => current.count
        );
        Ok(current.clone())
    }
}
