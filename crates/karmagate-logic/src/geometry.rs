//! Block positions, gate orientation, and the occupancy zones flanking a gate.
//!
//! A gate leaf swings along its **gate axis**. The perpendicular horizontal
//! axis is the **normal axis**; the two sides of the airlock sit on either
//! side of the controller along it.
//!
//! ```
//! use karmagate_logic::geometry::{BlockPos, GateAxis, Side, side_zone};
//! use karmagate_logic::config::GateConfig;
//!
//! let config = GateConfig::default();
//! let zone = side_zone(BlockPos::new(0, 64, 0), GateAxis::X, Side::Side1, &config);
//! assert_eq!(zone.cz, 0.5 - 4.0);
//! assert!(zone.contains(0.5, -3.5));
//! ```

use serde::{Deserialize, Serialize};

use crate::config::GateConfig;

/// Integer block coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Shifted position. Coordinates saturate at the `i32` range.
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.z.saturating_add(dz),
        )
    }

    /// Squared Euclidean distance, saturating at `i64::MAX`.
    pub fn squared_distance(&self, other: &Self) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        let dz = self.z as i64 - other.z as i64;
        dx.saturating_mul(dx)
            .saturating_add(dy.saturating_mul(dy))
            .saturating_add(dz.saturating_mul(dz))
    }

    /// Whether `other` lies inside the cube of `radius` blocks around `self`.
    /// A negative radius contains nothing.
    pub fn within_cube(&self, other: &Self, radius: i32) -> bool {
        let Ok(radius) = u32::try_from(radius) else {
            return false;
        };
        self.x.abs_diff(other.x) <= radius
            && self.y.abs_diff(other.y) <= radius
            && self.z.abs_diff(other.z) <= radius
    }

    pub fn center_x(&self) -> f64 {
        self.x as f64 + 0.5
    }

    pub fn center_z(&self) -> f64 {
        self.z as f64 + 0.5
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// Horizontal axis a gate leaf moves along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GateAxis {
    #[default]
    X,
    Z,
}

impl GateAxis {
    /// The perpendicular horizontal axis (side separation).
    pub fn normal(self) -> GateAxis {
        match self {
            GateAxis::X => GateAxis::Z,
            GateAxis::Z => GateAxis::X,
        }
    }

    /// Signed distance from the centre of `origin` to `pos` along this axis.
    pub fn delta(self, origin: BlockPos, pos: BlockPos) -> f64 {
        match self {
            GateAxis::X => pos.x as f64 - origin.center_x(),
            GateAxis::Z => pos.z as f64 - origin.center_z(),
        }
    }
}

/// One of the two occupancy zones flanking the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// Negative offset along the normal axis.
    Side1,
    /// Positive offset along the normal axis.
    Side2,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Side1, Side::Side2];

    pub fn opposite(self) -> Side {
        match self {
            Side::Side1 => Side::Side2,
            Side::Side2 => Side::Side1,
        }
    }

    /// Stable tag used in save data.
    pub fn tag(self) -> &'static str {
        match self {
            Side::Side1 => "SIDE1",
            Side::Side2 => "SIDE2",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Side> {
        match tag {
            "SIDE1" => Some(Side::Side1),
            "SIDE2" => Some(Side::Side2),
            _ => None,
        }
    }

    /// Which side of the controller a block falls on.
    pub fn classify(controller: BlockPos, axis: GateAxis, pos: BlockPos) -> Side {
        if axis.normal().delta(controller, pos) < 0.0 {
            Side::Side1
        } else {
            Side::Side2
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Closed axis-aligned square on the horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquareZone {
    pub cx: f64,
    pub cz: f64,
    pub half_side: f64,
}

impl SquareZone {
    pub fn contains(&self, x: f64, z: f64) -> bool {
        x >= self.cx - self.half_side
            && x <= self.cx + self.half_side
            && z >= self.cz - self.half_side
            && z <= self.cz + self.half_side
    }
}

/// Occupancy zone for `side` of a controller at `pos`.
pub fn side_zone(pos: BlockPos, axis: GateAxis, side: Side, config: &GateConfig) -> SquareZone {
    let offset = match side {
        Side::Side1 => config.side1_offset,
        Side::Side2 => config.side2_offset,
    };
    let (mut cx, mut cz) = (pos.center_x(), pos.center_z());
    match axis.normal() {
        GateAxis::X => cx += offset,
        GateAxis::Z => cz += offset,
    }
    SquareZone {
        cx,
        cz,
        half_side: config.zone_half_side,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_is_perpendicular() {
        assert_eq!(GateAxis::X.normal(), GateAxis::Z);
        assert_eq!(GateAxis::Z.normal(), GateAxis::X);
    }

    #[test]
    fn zones_offset_along_normal() {
        let config = GateConfig::default();
        let origin = BlockPos::new(10, 64, 20);

        let z1 = side_zone(origin, GateAxis::Z, Side::Side1, &config);
        assert_eq!(z1.cx, 10.5 - 4.0);
        assert_eq!(z1.cz, 20.5);

        let z2 = side_zone(origin, GateAxis::Z, Side::Side2, &config);
        assert_eq!(z2.cx, 10.5 + 5.0);
        assert_eq!(z2.half_side, 6.5);
    }

    #[test]
    fn zone_is_closed_interval() {
        let zone = SquareZone {
            cx: 0.0,
            cz: 0.0,
            half_side: 6.5,
        };
        assert!(zone.contains(6.5, -6.5));
        assert!(!zone.contains(6.51, 0.0));
    }

    #[test]
    fn classify_sides() {
        let c = BlockPos::new(0, 64, 0);
        // Gate along X: sides split along Z.
        assert_eq!(Side::classify(c, GateAxis::X, BlockPos::new(5, 64, -1)), Side::Side1);
        assert_eq!(Side::classify(c, GateAxis::X, BlockPos::new(-5, 64, 1)), Side::Side2);
        // The controller's own row sits half a block below the centre.
        assert_eq!(Side::classify(c, GateAxis::X, BlockPos::new(0, 70, 0)), Side::Side1);
    }

    #[test]
    fn far_apart_positions_do_not_overflow() {
        let low = BlockPos::new(i32::MIN, i32::MIN, i32::MIN);
        let high = BlockPos::new(i32::MAX, i32::MAX, i32::MAX);

        assert!(!low.within_cube(&high, i32::MAX));
        assert!(low.within_cube(&low, 0));
        assert!(!low.within_cube(&low, -1));
        assert_eq!(low.squared_distance(&high), i64::MAX);
        assert_eq!(high.offset(1, 0, -1), BlockPos::new(i32::MAX, i32::MAX, i32::MAX - 1));
        assert_eq!(low.offset(-5, 2, 0), BlockPos::new(i32::MIN, i32::MIN + 2, i32::MIN));

        let a = BlockPos::new(-1_000_000_000, 0, 0);
        let b = BlockPos::new(1_000_000_000, 0, 0);
        assert_eq!(a.squared_distance(&b), 4_000_000_000_000_000_000);
        assert!(a.within_cube(&b, 2_000_000_000));
    }

    #[test]
    fn side_tags_roundtrip() {
        for side in Side::BOTH {
            assert_eq!(Side::from_tag(side.tag()), Some(side));
        }
        assert_eq!(Side::from_tag("garbage"), None);
        assert_eq!(Side::Side1.opposite(), Side::Side2);
    }
}
