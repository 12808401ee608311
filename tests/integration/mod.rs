//! Server-backed gateway tests.
//!
//! Every test works in its own scratch table, named after the test, and drops
//! it again at the end.

pub mod mysql_test;
pub mod postgres_test;

use sqlflow::config::ConnectionConfig;
use sqlflow::db::SqlGateway;
use std::time::Duration;

/// Builds a gateway from the connection string in `var`, if it is set.
pub fn gateway_from_env(var: &str) -> Option<SqlGateway> {
    let url = std::env::var(var).ok()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    Some(SqlGateway::new(config, Duration::from_secs(30)))
}
