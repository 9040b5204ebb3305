mod battle_repository;
mod building_repository;
mod construction_task_repository;
mod job_repository;
mod movement_repository;
mod training_task_repository;
mod troop_repository;
mod village_repository;

pub use battle_repository::BattleRepository;
pub use building_repository::BuildingRepository;
pub use construction_task_repository::ConstructionTaskRepository;
pub use job_repository::JobRepository;
pub use movement_repository::MovementRepository;
pub use training_task_repository::TrainingTaskRepository;
pub use troop_repository::TroopRepository;
pub use village_repository::VillageRepository;
