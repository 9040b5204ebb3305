use dotenvy::dotenv;
use std::{env, str::FromStr};

use crate::jobs::RetentionPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_speed: u8,
    pub worker_count: usize,
    pub worker_poll_interval_ms: u64,
    pub job_batch_size: i64,
    pub job_lease_secs: i64,
    pub job_timeout_secs: u64,
    pub completed_job_retention: RetentionPolicy,
    pub failed_job_retention: RetentionPolicy,
    pub prune_interval_secs: u64,
    pub tx_retries: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let server_speed = env_or("STRONGHOLD_SERVER_SPEED", 1u8).clamp(1, 5);
        let job_timeout_secs = env_or("STRONGHOLD_JOB_TIMEOUT_SECS", 30u64);

        Self {
            server_speed,
            worker_count: env_or("STRONGHOLD_WORKER_COUNT", 4usize).max(1),
            worker_poll_interval_ms: env_or("STRONGHOLD_WORKER_POLL_INTERVAL_MS", 1000),
            job_batch_size: env_or("STRONGHOLD_JOB_BATCH_SIZE", 10),
            // A lease must outlive a handler that runs until its timeout.
            job_lease_secs: env_or("STRONGHOLD_JOB_LEASE_SECS", 60i64)
                .max(job_timeout_secs as i64 + 1),
            job_timeout_secs,
            completed_job_retention: RetentionPolicy {
                max_age_secs: env_or("STRONGHOLD_COMPLETED_JOB_RETENTION_SECS", 3600),
                max_count: env_or("STRONGHOLD_COMPLETED_JOB_RETENTION_COUNT", 100),
            },
            failed_job_retention: RetentionPolicy {
                max_age_secs: env_or("STRONGHOLD_FAILED_JOB_RETENTION_SECS", 86_400),
                max_count: env_or("STRONGHOLD_FAILED_JOB_RETENTION_COUNT", 50),
            },
            prune_interval_secs: env_or("STRONGHOLD_PRUNE_INTERVAL_SECS", 60),
            tx_retries: env_or("STRONGHOLD_TX_RETRIES", 3),
        }
    }
}

/// Reads and parses an env var, falling back to `default` when missing or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
