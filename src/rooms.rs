//! Room Aggregation - Required Capacity from Room Volumes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::settings::ConfigurationSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    LivingRoom,
    Bedroom,
    Kitchen,
    Office,
    Bathroom,
    Attic,
    Conservatory,
    Other,
}

impl RoomType {
    pub fn default_factor(&self) -> f64 {
        match self {
            Self::LivingRoom => 1.0,
            Self::Bedroom => 0.9,
            Self::Kitchen => 1.1,
            Self::Office => 1.0,
            Self::Bathroom => 0.9,
            Self::Attic => 1.3,
            Self::Conservatory => 1.5,
            Self::Other => 1.0,
        }
    }
}

/// Overrides on top of the built-in room-type factors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomTypeFactors(BTreeMap<RoomType, f64>);

impl RoomTypeFactors {
    pub fn set(&mut self, room_type: RoomType, factor: f64) {
        self.0.insert(room_type, factor);
    }

    /// Configured factor, or the built-in one when missing or unusable.
    pub fn factor(&self, room_type: RoomType) -> f64 {
        match self.0.get(&room_type).copied() {
            Some(f) if f.is_finite() && f >= 0.0 => f,
            Some(f) => {
                warn!(?room_type, factor = %f, "invalid room-type factor, using default");
                room_type.default_factor()
            }
            None => room_type.default_factor(),
        }
    }
}

/// Heat demand per cubic meter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsulationClass {
    Good,
    #[default]
    Average,
    Poor,
}

impl InsulationClass {
    pub fn watts_per_m3(&self) -> f64 {
        match self {
            Self::Good => 30.0,
            Self::Average => 40.0,
            Self::Poor => 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size_m2: f64,
    #[serde(default)]
    pub ceiling_height_m: f64,
    #[serde(default = "default_room_type")]
    pub room_type: RoomType,
}

fn default_room_type() -> RoomType { RoomType::LivingRoom }

impl Room {
    pub fn new(name: &str, size_m2: f64, ceiling_height_m: f64, room_type: RoomType) -> Self {
        Self {
            name: name.to_string(),
            size_m2,
            ceiling_height_m,
            room_type,
        }
    }

    /// Rows still being typed in (zero, negative or non-numeric dimensions)
    /// contribute nothing.
    fn usable_dimensions(&self) -> Option<(f64, f64)> {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        if usable(self.size_m2) && usable(self.ceiling_height_m) {
            Some((self.size_m2, self.ceiling_height_m))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomLoad {
    pub name: String,
    pub required_watts: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomAggregate {
    pub required_kw: f64,
    pub total_area_m2: f64,
    /// Rooms with usable dimensions; these are the ones that get a unit.
    pub room_count: usize,
    /// Every supplied row, including ones still being filled in.
    pub row_count: usize,
    pub per_room: Vec<RoomLoad>,
}

pub fn aggregate_rooms(
    rooms: &[Room],
    insulation: InsulationClass,
    factors: &RoomTypeFactors,
) -> RoomAggregate {
    let mut total_watts = 0.0;
    let mut total_area_m2 = 0.0;
    let mut room_count = 0;
    let mut per_room = Vec::with_capacity(rooms.len());

    for room in rooms {
        let required_watts = match room.usable_dimensions() {
            Some((size, height)) => {
                total_area_m2 += size;
                room_count += 1;
                size * height * insulation.watts_per_m3() * factors.factor(room.room_type)
            }
            None => 0.0,
        };
        total_watts += required_watts;
        per_room.push(RoomLoad {
            name: room.name.clone(),
            required_watts,
        });
    }

    RoomAggregate {
        required_kw: total_watts / 1000.0,
        total_area_m2,
        room_count,
        row_count: rooms.len(),
        per_room,
    }
}

/// Same as [`aggregate_rooms`], reading the factor table from a snapshot.
pub fn aggregate_with_config(
    rooms: &[Room],
    insulation: InsulationClass,
    config: &ConfigurationSnapshot,
) -> RoomAggregate {
    aggregate_rooms(rooms, insulation, &config.room_type_factors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_room_capacity() {
        let rooms = vec![Room::new("Woonkamer", 35.0, 2.5, RoomType::LivingRoom)];
        let agg = aggregate_rooms(&rooms, InsulationClass::Average, &RoomTypeFactors::default());
        assert!((agg.required_kw - 3.5).abs() < 1e-9);
        assert_eq!(agg.total_area_m2, 35.0);
        assert_eq!(agg.room_count, 1);
    }

    #[test]
    fn test_room_type_factor_applies() {
        let rooms = vec![Room::new("Zolder", 20.0, 2.5, RoomType::Attic)];
        let agg = aggregate_rooms(&rooms, InsulationClass::Good, &RoomTypeFactors::default());
        // 20 * 2.5 * 30 * 1.3
        assert!((agg.required_kw - 1.95).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_rows_contribute_zero() {
        let rooms = vec![
            Room::new("ok", 10.0, 2.5, RoomType::Office),
            Room::new("negative", -12.0, 2.5, RoomType::Office),
            Room::new("typing", f64::NAN, 2.5, RoomType::Office),
            Room::new("no height", 15.0, 0.0, RoomType::Office),
        ];
        let agg = aggregate_rooms(&rooms, InsulationClass::Average, &RoomTypeFactors::default());
        assert!((agg.required_kw - 1.0).abs() < 1e-9);
        assert_eq!(agg.total_area_m2, 10.0);
        assert_eq!(agg.room_count, 1);
        assert_eq!(agg.row_count, 4);
        assert_eq!(agg.per_room[1].required_watts, 0.0);
    }

    #[test]
    fn test_factor_override_and_invalid_override() {
        let mut factors = RoomTypeFactors::default();
        factors.set(RoomType::Bedroom, 1.2);
        factors.set(RoomType::Kitchen, f64::INFINITY);
        assert_eq!(factors.factor(RoomType::Bedroom), 1.2);
        assert_eq!(factors.factor(RoomType::Kitchen), 1.1);
        assert_eq!(factors.factor(RoomType::Attic), 1.3);
    }
}
