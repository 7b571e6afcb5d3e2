use crate::DbConnection;
use anyhow::Context;
use async_bb8_diesel::AsyncSimpleConnection;
use slog::error;
use slog::info;

pub type DbPool = bb8::Pool<async_bb8_diesel::ConnectionManager<DbConnection>>;

const CREATE_COUNTER_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS counter (
        id SERIAL PRIMARY KEY,
        count INT4 NOT NULL DEFAULT 0,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    );
"#;

pub async fn create_pool(
    log: slog::Logger,
    db_url: &str,
    max_size: u32,
) -> anyhow::Result<DbPool> {
    let error_sink = LoggingErrorSink::new(log.clone());
    let manager = async_bb8_diesel::ConnectionManager::new(db_url);
    bb8::Builder::new()
        .error_sink(Box::new(error_sink))
        .max_size(max_size)
        .build(manager)
        .await
        .context("building pool")
}

/// Create the counter table if it is not there already
pub async fn ensure_schema(
    log: &slog::Logger,
    pool: &DbPool,
) -> anyhow::Result<()> {
    pool.batch_execute_async(CREATE_COUNTER_TABLE)
        .await
        .context("creating counter table")?;
    info!(log, "counter table ready");
    Ok(())
}

/// Drop the counter table and create it again, empty
pub async fn reset_schema(
    log: &slog::Logger,
    pool: &DbPool,
) -> anyhow::Result<()> {
    pool.batch_execute_async("DROP TABLE IF EXISTS counter;")
        .await
        .context("dropping counter table")?;
    ensure_schema(log, pool).await
}

#[derive(Clone, Debug)]
struct LoggingErrorSink {
    log: slog::Logger,
}

impl LoggingErrorSink {
    fn new(log: slog::Logger) -> LoggingErrorSink {
        LoggingErrorSink { log }
    }
}

impl bb8::ErrorSink<async_bb8_diesel::ConnectionError> for LoggingErrorSink {
    fn sink(&self, error: async_bb8_diesel::ConnectionError) {
        error!(
            &self.log,
            "database connection error";
            "error_message" => #%error
        );
    }

    fn boxed_clone(
        &self,
    ) -> Box<dyn bb8::ErrorSink<async_bb8_diesel::ConnectionError>> {
        Box::new(self.clone())
    }
}
