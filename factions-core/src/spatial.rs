//! Block positions, chunk keys and the cell sets used by radius operations.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub type WorldName = String;

/// Side length of a chunk in blocks.
pub const CHUNK_SIZE: i32 = 16;

/// World names compare case-insensitively, so keys store them lowercased.
pub fn world_name(name: &str) -> WorldName {
    name.to_ascii_lowercase()
}

fn deserialize_world<'de, D: Deserializer<'de>>(deserializer: D) -> Result<WorldName, D::Error> {
    String::deserialize(deserializer).map(|name| world_name(&name))
}

/// An exact block position in a named world.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    #[serde(deserialize_with = "deserialize_world")]
    pub world: WorldName,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(world: &str, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world_name(world),
            x,
            y,
            z,
        }
    }

    /// The chunk containing this block. Negative coordinates floor toward -inf.
    pub fn chunk(&self) -> ChunkKey {
        ChunkKey::new(
            &self.world,
            self.x.div_euclid(CHUNK_SIZE),
            self.z.div_euclid(CHUNK_SIZE),
        )
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}, {}, {}]", self.world, self.x, self.y, self.z)
    }
}

/// Which cells a radius operation covers around its center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusShape {
    /// Every cell with `|dx| <= r` and `|dz| <= r`.
    #[default]
    Square,
    /// Every cell with `dx² + dz² <= r²`.
    Disc,
}

/// Key of one claimable cell: (world, chunk x, chunk z).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    #[serde(deserialize_with = "deserialize_world")]
    pub world: WorldName,
    pub x: i32,
    pub z: i32,
}

impl ChunkKey {
    pub fn new(world: &str, x: i32, z: i32) -> Self {
        Self {
            world: world_name(world),
            x,
            z,
        }
    }

    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self {
            world: self.world.clone(),
            x: self.x.saturating_add(dx),
            z: self.z.saturating_add(dz),
        }
    }

    /// Cardinal neighbors in north, east, south, west order.
    pub fn neighbors(&self) -> [ChunkKey; 4] {
        [
            self.offset(0, 1),
            self.offset(1, 0),
            self.offset(0, -1),
            self.offset(-1, 0),
        ]
    }

    pub fn contains(&self, pos: &BlockPos) -> bool {
        pos.world == self.world
            && pos.x.div_euclid(CHUNK_SIZE) == self.x
            && pos.z.div_euclid(CHUNK_SIZE) == self.z
    }

    /// Cells covered by `radius` around this one, sorted by (x, z).
    ///
    /// A radius of 0 yields only this cell.
    pub fn cells_in_radius(&self, radius: u32, shape: RadiusShape) -> Vec<ChunkKey> {
        let r = radius.min(i32::MAX as u32) as i64;
        let mut cells = Vec::new();
        for dx in -r..=r {
            for dz in -r..=r {
                if shape == RadiusShape::Disc && dx * dx + dz * dz > r * r {
                    continue;
                }
                cells.push(self.offset(dx as i32, dz as i32));
            }
        }
        cells
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.world, self.x, self.z)
    }
}
