mod attack_village;
mod cancel_construction;
mod cancel_training;
mod found_village;
mod refresh_village_state;
mod train_units;
mod upgrade_building;

pub use attack_village::AttackVillageCommandHandler;
pub use cancel_construction::CancelConstructionCommandHandler;
pub use cancel_training::CancelTrainingCommandHandler;
pub use found_village::FoundVillageCommandHandler;
pub use refresh_village_state::RefreshVillageStateCommandHandler;
pub use train_units::TrainUnitsCommandHandler;
pub use upgrade_building::UpgradeBuildingCommandHandler;
