//! Time-to-live garbage collection for the verification code ledger.
//!
//! Expired codes are already dead on read: every lookup evaluates expiry
//! against the database clock. The sweeper only reclaims the rows, so its
//! interval affects table size and nothing else.

use sqlx::PgPool;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info};

use crate::api::handlers::auth::delete_expired_codes;

/// Spawn the background sweeper. Runs until the process exits.
pub fn spawn_expiry_sweeper(pool: PgPool, interval: Duration) -> JoinHandle<()> {
    let interval = if interval.is_zero() {
        Duration::from_secs(1)
    } else {
        interval
    };

    tokio::spawn(async move {
        loop {
            match delete_expired_codes(&pool).await {
                Ok(0) => {}
                Ok(swept) => info!(swept, "reclaimed expired verification codes"),
                Err(err) => error!("verification code sweep failed: {err}"),
            }
            sleep(interval).await;
        }
    })
}
