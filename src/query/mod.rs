mod executor;

pub use executor::{ExecuteOptions, QueryExecutor, StatementResult};
