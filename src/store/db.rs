//! PostgreSQL-backed counter store

use crate::model::Counter;
use crate::model::Increment;
use crate::model::NewCounter;
use crate::pool::DbPool;
use crate::schema::counter::dsl;
use crate::service::CounterService;
use anyhow::anyhow;
use anyhow::Context;
use async_bb8_diesel::AsyncRunQueryDsl;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use slog::error;
use slog::info;

pub struct DbCounterStore {
    log: slog::Logger,
    pool: DbPool,
}

impl DbCounterStore {
    pub fn new(log: slog::Logger, pool: DbPool) -> DbCounterStore {
        DbCounterStore { log, pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Load the row with the lowest id, if there is one.
    async fn load_first(&self) -> anyhow::Result<Option<Counter>> {
        let rows = dsl::counter
            .order(dsl::id.asc())
            .limit(1)
            .select(Counter::as_select())
            .load_async::<Counter>(&self.pool)
            .await
            .context("loading counter")?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, count: i32) -> anyhow::Result<Counter> {
        let counter: Counter = diesel::insert_into(dsl::counter)
            .values(NewCounter::now(count))
            .returning(Counter::as_returning())
            .get_result_async(&self.pool)
            .await
            .context("inserting counter")?;
        info!(&self.log, "created counter";
            "id" => counter.id, "count" => counter.count);
        Ok(counter)
    }

    async fn do_get_counter(&self) -> anyhow::Result<Counter> {
        match self.load_first().await? {
            Some(counter) => Ok(counter),
            None => self.insert(0).await,
        }
    }

    async fn do_increment_counter(
        &self,
        increment: Increment,
    ) -> anyhow::Result<Counter> {
        // Read, then write.  Two concurrent increments can interleave here
        // and one of them will be lost.
        let Some(current) = self.load_first().await? else {
            return self.insert(increment.get()).await;
        };

        let new_count =
            current.count.checked_add(increment.get()).ok_or_else(|| {
                anyhow!(
                    "incrementing counter {} by {} would overflow",
                    current.count,
                    increment.get()
                )
            })?;

        let target = dsl::counter.filter(dsl::id.eq(current.id));
        let counter: Counter = diesel::update(target)
            .set((dsl::count.eq(new_count), dsl::updated_at.eq(Utc::now())))
            .returning(Counter::as_returning())
            .get_result_async(&self.pool)
            .await
            .context("updating counter")?;
        info!(&self.log, "incremented counter";
            "id" => counter.id,
            "increment" => increment.get(),
            "count" => counter.count
        );
        Ok(counter)
    }
}

#[async_trait]
impl CounterService for DbCounterStore {
    async fn get_counter(&self) -> anyhow::Result<Counter> {
        self.do_get_counter().await.map_err(|error| {
            error!(&self.log, "fetching counter failed";
                "error_message" => #%error);
            error
        })
    }

    async fn increment_counter(
        &self,
        increment: Increment,
    ) -> anyhow::Result<Counter> {
        self.do_increment_counter(increment).await.map_err(|error| {
            error!(&self.log, "counter increment failed";
                "error_message" => #%error);
            error
        })
    }
}

#[cfg(test)]
mod test {
    //! These run against a real PostgreSQL database and only when
    //! COUNTER_TEST_DATABASE_URL points at one.  The table is dropped and
    //! recreated between cases, so they all run from a single test.
    //!
    //! PostgreSQL is the default backend: CI jobs must set
    //! COUNTER_TEST_DATABASE_URL, or this test only prints a note and passes.

    use super::DbCounterStore;
    use crate::model::Counter;
    use crate::model::Increment;
    use crate::pool;
    use crate::schema::counter::dsl;
    use crate::service::CounterService;
    use async_bb8_diesel::AsyncRunQueryDsl;
    use chrono::DateTime;
    use chrono::Duration;
    use chrono::Utc;
    use diesel::prelude::*;

    const DB_URL_ENV: &str = "COUNTER_TEST_DATABASE_URL";

    async fn seed(
        store: &DbCounterStore,
        count: i32,
        at: DateTime<Utc>,
    ) -> Counter {
        diesel::insert_into(dsl::counter)
            .values((dsl::count.eq(count), dsl::updated_at.eq(at)))
            .returning(Counter::as_returning())
            .get_result_async(store.pool())
            .await
            .unwrap()
    }

    async fn all_rows(store: &DbCounterStore) -> Vec<Counter> {
        dsl::counter
            .order(dsl::id.asc())
            .select(Counter::as_select())
            .load_async::<Counter>(store.pool())
            .await
            .unwrap()
    }

    async fn reset(store: &DbCounterStore) {
        pool::reset_schema(&store.log, store.pool()).await.unwrap();
    }

    fn increment(n: i32) -> Increment {
        Increment::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_db_store() {
        let Ok(db_url) = std::env::var(DB_URL_ENV) else {
            eprintln!("skipping test: {} is not set", DB_URL_ENV);
            return;
        };
        let log = slog::Logger::root(slog::Discard, slog::o!());
        let pool = pool::create_pool(log.clone(), &db_url, 1).await.unwrap();
        let store = DbCounterStore::new(log, pool);

        // get_counter() initializes an empty table with a zero count.
        reset(&store).await;
        let counter = store.get_counter().await.unwrap();
        assert_eq!(counter.count, 0);
        let rows = all_rows(&store).await;
        assert_eq!(rows, vec![counter.clone()]);
        // ... and returns the same row afterwards.
        assert_eq!(store.get_counter().await.unwrap(), counter);

        // get_counter() returns the first of several rows, unmodified.
        reset(&store).await;
        let first = seed(&store, 10, Utc::now()).await;
        seed(&store, 20, Utc::now()).await;
        assert_eq!(store.get_counter().await.unwrap(), first);

        // increment_counter() creates the row with the increment as count.
        reset(&store).await;
        let counter = store.increment_counter(increment(5)).await.unwrap();
        assert_eq!(counter.count, 5);
        assert_eq!(all_rows(&store).await, vec![counter]);

        // increment_counter() adds to an existing row and bumps updated_at.
        reset(&store).await;
        let initial =
            seed(&store, 10, Utc::now() - Duration::seconds(1)).await;
        let counter = store.increment_counter(increment(3)).await.unwrap();
        assert_eq!(counter.id, initial.id);
        assert_eq!(counter.count, 13);
        assert!(counter.updated_at > initial.updated_at);
        assert_eq!(all_rows(&store).await, vec![counter]);

        // Sequential increments accumulate on the same row.
        reset(&store).await;
        let a = store.increment_counter(increment(2)).await.unwrap();
        let b = store.increment_counter(increment(3)).await.unwrap();
        let c = store.increment_counter(increment(10)).await.unwrap();
        assert_eq!((a.count, b.count, c.count), (2, 5, 15));
        assert_eq!(a.id, b.id);
        assert_eq!(b.id, c.id);
        assert_eq!(all_rows(&store).await.len(), 1);

        // The default increment is one.
        reset(&store).await;
        seed(&store, 5, Utc::now()).await;
        let counter =
            store.increment_counter(Increment::default()).await.unwrap();
        assert_eq!(counter.count, 6);

        // Overflow is an error and leaves the row alone.
        reset(&store).await;
        let initial = seed(&store, i32::MAX - 1, Utc::now()).await;
        let error = store.increment_counter(increment(2)).await.unwrap_err();
        assert!(error.to_string().contains("would overflow"));
        assert_eq!(all_rows(&store).await, vec![initial]);

        reset(&store).await;
    }
}
