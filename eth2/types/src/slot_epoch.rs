//! `Slot` and `Epoch` are newtypes over `u64` so that the two clocks cannot
//! be mixed up by the compiler. Conversion between them always goes through
//! an explicit `slots_per_epoch`.

#[derive(Eq, Debug, Clone, Copy, Default)]
pub struct Slot(u64);

#[derive(Eq, Debug, Clone, Copy, Default)]
pub struct Epoch(u64);

impl_common!(Slot);
impl_common!(Epoch);

impl Slot {
    pub fn new(slot: u64) -> Slot {
        Slot(slot)
    }

    pub fn epoch(self, slots_per_epoch: u64) -> Epoch {
        Epoch::from(self.0 / slots_per_epoch)
    }

    pub fn max_value() -> Slot {
        Slot(u64::max_value())
    }
}

impl Epoch {
    pub fn new(epoch: u64) -> Epoch {
        Epoch(epoch)
    }

    pub fn max_value() -> Epoch {
        Epoch(u64::max_value())
    }

    pub fn start_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::from(self.0.saturating_mul(slots_per_epoch))
    }

    pub fn end_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::from(
            self.0
                .saturating_add(1)
                .saturating_mul(slots_per_epoch)
                .saturating_sub(1),
        )
    }

    /// Iterates the slots of this epoch, in order.
    pub fn slot_iter(self, slots_per_epoch: u64) -> impl Iterator<Item = Slot> {
        let start = self.start_slot(slots_per_epoch).as_u64();
        (start..start + slots_per_epoch).map(Slot::new)
    }
}
