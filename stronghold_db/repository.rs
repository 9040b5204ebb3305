mod battle_repository;
mod building_repository;
mod construction_task_repository;
mod job_repository;
mod movement_repository;
mod training_task_repository;
mod troop_repository;
mod village_repository;

pub use battle_repository::PostgresBattleRepository;
pub use building_repository::PostgresBuildingRepository;
pub use construction_task_repository::PostgresConstructionTaskRepository;
pub use job_repository::PostgresJobRepository;
pub use movement_repository::PostgresMovementRepository;
pub use training_task_repository::PostgresTrainingTaskRepository;
pub use troop_repository::PostgresTroopRepository;
pub use village_repository::PostgresVillageRepository;
