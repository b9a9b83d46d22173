//! Lamp groups: the feedback indicators on each side of the airlock.
//!
//! Each side owns one [`GateLightGroup`]. Lamps are split into two columns
//! along the gate axis (near = negative offset from the controller centre,
//! far = positive) and each column is sorted bottom to top.
//!
//! Every pattern is safe on an empty or sparse group: missing lamps are
//! skipped or substituted, never an error.

use log::debug;

use crate::geometry::{BlockPos, GateAxis, Side};
use crate::host::{command_lamp, LampControl, SpatialIndex};

/// A bound lamp plus the ordinate it is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LampRef {
    pub pos: BlockPos,
    pub y: i32,
}

impl LampRef {
    pub fn new(pos: BlockPos) -> Self {
        Self { pos, y: pos.y }
    }
}

/// The lamps bound to one side of a gate.
#[derive(Debug, Clone)]
pub struct GateLightGroup {
    side: Side,
    half_period: u32,
    near: Vec<LampRef>,
    far: Vec<LampRef>,
}

impl GateLightGroup {
    pub fn new(side: Side, half_period: u32) -> Self {
        Self {
            side,
            half_period: half_period.max(1),
            near: Vec::new(),
            far: Vec::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Rebuild from the lamps around `center`. Lamps on the other side of
    /// the normal axis are ignored.
    pub fn bind_lights<H: SpatialIndex + ?Sized>(
        &mut self,
        host: &H,
        center: BlockPos,
        axis: GateAxis,
        radius: i32,
    ) {
        self.near.clear();
        self.far.clear();

        for pos in host.lamps_within(center, radius) {
            if Side::classify(center, axis, pos) != self.side {
                continue;
            }
            let lamp = LampRef::new(pos);
            if axis.delta(center, pos) < 0.0 {
                self.near.push(lamp);
            } else {
                self.far.push(lamp);
            }
        }

        self.near.sort_by_key(|l| (l.y, l.pos));
        self.far.sort_by_key(|l| (l.y, l.pos));

        debug!(
            "light group {} bound {} near / {} far lamps around {}",
            self.side,
            self.near.len(),
            self.far.len(),
            center
        );
    }

    pub fn near(&self) -> &[LampRef] {
        &self.near
    }

    pub fn far(&self) -> &[LampRef] {
        &self.far
    }

    pub fn bottom_near(&self) -> Option<BlockPos> {
        self.near.first().map(|l| l.pos)
    }

    pub fn top_near(&self) -> Option<BlockPos> {
        self.near.last().map(|l| l.pos)
    }

    pub fn bottom_far(&self) -> Option<BlockPos> {
        self.far.first().map(|l| l.pos)
    }

    pub fn top_far(&self) -> Option<BlockPos> {
        self.far.last().map(|l| l.pos)
    }

    /// Lowest lamp of the side, preferring the near column.
    pub fn bottom(&self) -> Option<BlockPos> {
        self.bottom_near().or_else(|| self.bottom_far())
    }

    /// Highest lamp of the side, preferring the near column.
    pub fn top(&self) -> Option<BlockPos> {
        self.top_near().or_else(|| self.top_far())
    }

    pub fn lamps(&self) -> impl Iterator<Item = BlockPos> + '_ {
        self.near.iter().chain(self.far.iter()).map(|l| l.pos)
    }

    pub fn len(&self) -> usize {
        self.near.len() + self.far.len()
    }

    pub fn is_empty(&self) -> bool {
        self.near.is_empty() && self.far.is_empty()
    }

    /// Whether a blinking lamp is in its "on" half at `tick`.
    pub fn blink_on(&self, tick: u32) -> bool {
        tick % (self.half_period * 2) < self.half_period
    }

    pub fn all_off<H: LampControl + ?Sized>(&self, host: &mut H) {
        self.show_only(host, &[]);
    }

    /// All lamps on together for the first half period, off for the second.
    pub fn blink_all<H: LampControl + ?Sized>(&self, host: &mut H, tick: u32) {
        let on = self.blink_on(tick);
        for pos in self.lamps() {
            command_lamp(host, pos, on);
        }
    }

    /// Alternate between the bottom pair (bottom-near, top-far) and the top
    /// pair (top-near, bottom-far).
    ///
    /// A pair with no exact member falls back to the nearest lamp at the same
    /// end of either column. A lamp that ends up in both pairs belongs to the
    /// bottom pair, so a lone lamp still blinks.
    pub fn blink_bottom_top_alternate<H: LampControl + ?Sized>(&self, host: &mut H, tick: u32) {
        if self.is_empty() {
            return;
        }

        let mut bottom_pair: Vec<BlockPos> = [self.bottom_near(), self.top_far()]
            .into_iter()
            .flatten()
            .collect();
        if bottom_pair.is_empty() {
            bottom_pair.extend(self.bottom());
        }

        let mut top_pair: Vec<BlockPos> = [self.top_near(), self.bottom_far()]
            .into_iter()
            .flatten()
            .collect();
        if top_pair.is_empty() {
            top_pair.extend(self.top());
        }
        top_pair.retain(|p| !bottom_pair.contains(p));

        if self.blink_on(tick) {
            self.show_only(host, &bottom_pair);
        } else {
            self.show_only(host, &top_pair);
        }
    }

    /// Light exactly the listed lamps of this group and turn the rest off.
    /// Positions not bound to this group are ignored.
    pub fn show_only<H: LampControl + ?Sized>(&self, host: &mut H, lit: &[BlockPos]) {
        for pos in self.lamps() {
            command_lamp(host, pos, lit.contains(&pos));
        }
    }
}
