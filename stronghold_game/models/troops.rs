use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use stronghold_types::{
    errors::GameError,
    troops::{TroopAmount, TroopName, TroopStatus},
};

use crate::balance::troop_spec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopGroup {
    pub village_id: Uuid,
    pub troop: TroopName,
    pub status: TroopStatus,
    pub quantity: u32,
}

/// Merges duplicate entries and drops zero quantities.
/// An empty result means nothing was selected.
pub fn normalize_manifest(manifest: &[TroopAmount]) -> Result<Vec<TroopAmount>, GameError> {
    let mut merged: BTreeMap<TroopName, u32> = BTreeMap::new();
    for entry in manifest.iter().filter(|e| e.quantity > 0) {
        let total = merged.entry(entry.troop).or_default();
        *total = total
            .checked_add(entry.quantity)
            .ok_or(GameError::InvalidQuantity)?;
    }
    if merged.is_empty() {
        return Err(GameError::NoUnitsSelected);
    }

    Ok(merged
        .into_iter()
        .map(|(troop, quantity)| TroopAmount::new(troop, quantity))
        .collect())
}

/// Speed of the slowest troop type in the manifest, in tiles per hour.
pub fn slowest_speed(manifest: &[TroopAmount]) -> Result<u32, GameError> {
    let mut slowest: Option<u32> = None;
    for entry in manifest {
        let speed = troop_spec(&entry.troop)?.speed;
        slowest = Some(slowest.map_or(speed, |s| s.min(speed)));
    }
    slowest.ok_or(GameError::NoUnitsSelected)
}
