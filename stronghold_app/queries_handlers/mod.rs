mod get_job_status;
mod list_player_villages;

pub use get_job_status::GetJobStatusHandler;
pub use list_player_villages::ListPlayerVillagesHandler;
