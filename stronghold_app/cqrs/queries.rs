use uuid::Uuid;

use stronghold_game::models::village::Village;

use crate::{
    cqrs::Query,
    jobs::{JobKey, JobState},
};

/// State of the scheduled job owning a key.
pub struct GetJobStatus {
    pub key: JobKey,
}

impl Query for GetJobStatus {
    type Output = JobState;
}

/// Villages owned by a player, as last persisted.
pub struct ListPlayerVillages {
    pub player_id: Uuid,
}

impl Query for ListPlayerVillages {
    type Output = Vec<Village>;
}
