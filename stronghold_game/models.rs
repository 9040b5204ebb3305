pub mod battle;
pub mod building;
pub mod construction;
pub mod movement;
pub mod training;
pub mod troops;
pub mod village;
