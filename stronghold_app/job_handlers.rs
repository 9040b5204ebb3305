pub mod building_upgrade;
pub mod resolve_battle;
pub mod train_unit;
