use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::jobs::tasks::JobTask;

/// Logical identity of a job. At most one pending or processing job exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey(String);

impl JobKey {
    pub fn building(building_id: Uuid, target_level: u8) -> Self {
        Self(format!("build:{building_id}:{target_level}"))
    }

    pub fn training(task_id: Uuid, remaining: u32) -> Self {
        Self(format!("train:{task_id}:{remaining}"))
    }

    pub fn battle(battle_id: Uuid) -> Self {
        Self(format!("battle:{battle_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Processing => "Processing",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }

    /// Pending and processing jobs hold their key.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(JobStatus::Pending),
            "Processing" => Ok(JobStatus::Processing),
            "Completed" => Ok(JobStatus::Completed),
            "Failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Externally visible state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Absent,
    Waiting,
    Delayed,
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backoff {
    Fixed { delay_ms: i64 },
    Exponential { base_ms: i64 },
}

impl Backoff {
    /// Delay before the retry following the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = match *self {
            Backoff::Fixed { delay_ms } => delay_ms,
            Backoff::Exponential { base_ms } => {
                let exponent = attempt.saturating_sub(1).min(20);
                base_ms.saturating_mul(1i64 << exponent)
            }
        };
        Duration::milliseconds(ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOptions {
    pub delay_ms: i64,
    pub attempts: u32,
    pub backoff: Backoff,
}

/// How long finished jobs of one outcome are kept around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age_secs: i64,
    pub max_count: i64,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub key: JobKey,
    pub village_id: Uuid,
    pub task: JobTask,
    pub status: JobStatus,
    pub run_at: DateTime<Utc>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub last_error: Option<String>,
    pub locked_until: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(village_id: Uuid, task: JobTask, options: &JobOptions, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: task.key(),
            village_id,
            task,
            status: JobStatus::Pending,
            run_at: now + Duration::milliseconds(options.delay_ms.max(0)),
            attempts: 0,
            max_attempts: options.attempts.max(1),
            backoff: options.backoff,
            last_error: None,
            locked_until: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self, now: DateTime<Utc>) -> JobState {
        match self.status {
            JobStatus::Pending if self.run_at <= now => JobState::Waiting,
            JobStatus::Pending => JobState::Delayed,
            JobStatus::Processing => JobState::Active,
            JobStatus::Completed => JobState::Completed,
            JobStatus::Failed => JobState::Failed,
        }
    }

    /// Whether a failed run may be retried. `attempts` counts claimed runs.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Claimable now: due and pending, or processing with an expired lease.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            JobStatus::Pending => self.run_at <= now,
            JobStatus::Processing => self.locked_until.is_some_and(|until| until < now),
            _ => false,
        }
    }
}
