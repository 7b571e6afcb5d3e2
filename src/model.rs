use chrono::DateTime;
use chrono::Utc;
use diesel::prelude::*;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// The singleton counter row.
#[derive(
    Clone,
    Debug,
    Deserialize,
    JsonSchema,
    PartialEq,
    Queryable,
    Selectable,
    Serialize,
)]
#[diesel(table_name = crate::schema::counter)]
pub struct Counter {
    pub id: i32,
    pub count: i32,
    pub updated_at: DateTime<Utc>,
}

/// A counter row that has not been assigned an id yet.
#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = crate::schema::counter)]
pub struct NewCounter {
    pub count: i32,
    pub updated_at: DateTime<Utc>,
}

impl NewCounter {
    pub fn now(count: i32) -> NewCounter {
        NewCounter { count, updated_at: Utc::now() }
    }
}

/// Body of an increment request.
#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
pub struct IncrementCounterInput {
    /// Amount to add to the counter.  Must be positive.  Defaults to 1.
    #[serde(default = "default_increment")]
    pub increment: i32,
}

fn default_increment() -> i32 {
    1
}

impl Default for IncrementCounterInput {
    fn default() -> Self {
        IncrementCounterInput { increment: default_increment() }
    }
}

impl From<Increment> for IncrementCounterInput {
    fn from(value: Increment) -> Self {
        IncrementCounterInput { increment: value.get() }
    }
}

/// A validated, strictly positive increment.
///
/// The stores only accept this type, so anything that reaches storage has
/// already been checked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Increment(i32);

impl Increment {
    pub const ONE: Increment = Increment(1);

    pub fn new(value: i32) -> Result<Increment, InvalidIncrement> {
        if value > 0 {
            Ok(Increment(value))
        } else {
            Err(InvalidIncrement(value))
        }
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl Default for Increment {
    fn default() -> Self {
        Increment::ONE
    }
}

impl TryFrom<IncrementCounterInput> for Increment {
    type Error = InvalidIncrement;

    fn try_from(value: IncrementCounterInput) -> Result<Self, Self::Error> {
        Increment::new(value.increment)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("increment must be a positive integer (got {0})")]
pub struct InvalidIncrement(pub i32);
