use core::fmt;
use core::num::NonZeroU8;

/// Identifies one grip on one controller.
///
/// Ids are unique among the active grips of a controller and are never zero.
/// Replicated grips use `1..=127`, local-only grips use `128..=254`, so a local
/// grip can never shadow an id assigned by the authority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GripId(NonZeroU8);

impl GripId {
    const REPLICATED: (u8, u8) = (1, 127);
    const LOCAL: (u8, u8) = (128, 254);

    /// Wraps a raw id. Returns `None` for zero, the invalid id.
    pub const fn new(raw: u8) -> Option<Self> {
        match NonZeroU8::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// The raw id as sent over the wire.
    pub const fn get(self) -> u8 {
        self.0.get()
    }

    /// True if the id lies in the local-only range.
    pub const fn is_local(self) -> bool {
        self.0.get() >= Self::LOCAL.0
    }
}

impl fmt::Display for GripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grip#{}", self.0)
    }
}

/// Hands out [`GripId`]s for one controller.
#[derive(Clone, Debug, Default)]
pub struct GripIdAllocator {
    last_replicated: u8,
    last_local: u8,
}

impl GripIdAllocator {
    /// Returns the next id in the requested range that `in_use` does not
    /// claim, wrapping around and skipping zero. `None` once the range is full.
    pub fn next(&mut self, local: bool, mut in_use: impl FnMut(GripId) -> bool) -> Option<GripId> {
        let ((first, last), cursor) = if local {
            (GripId::LOCAL, &mut self.last_local)
        } else {
            (GripId::REPLICATED, &mut self.last_replicated)
        };
        let span = u16::from(last - first) + 1;
        for _ in 0..span {
            *cursor = if *cursor < first || *cursor >= last {
                first
            } else {
                *cursor + 1
            };
            if let Some(id) = GripId::new(*cursor)
                && !in_use(id)
            {
                return Some(id);
            }
        }
        None
    }
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident($repr:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub $repr);
    };
}

opaque_id!(
    /// Identifies a hand controller.
    ControllerId(u32)
);
opaque_id!(
    /// Identifies a grippable target in the scene.
    TargetId(u64)
);
opaque_id!(
    /// Identifies a scene component, such as the secondary hand's tracked point.
    ComponentId(u64)
);
opaque_id!(
    /// Identifies a rigid body owned by the physics engine.
    BodyId(u64)
);
opaque_id!(
    /// Identifies a joint created by the physics engine.
    JointHandle(u64)
);
opaque_id!(
    /// Identifies the kinematic anchor body a joint is attached to.
    AnchorHandle(u64)
);

/// A `(controller, grip)` pair, the weak back-reference a target keeps to each
/// controller holding it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GripPair {
    /// The holding controller.
    pub controller: ControllerId,
    /// The grip on that controller.
    pub grip: GripId,
}

impl GripPair {
    /// Creates a pair.
    pub const fn new(controller: ControllerId, grip: GripId) -> Self {
        Self { controller, grip }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_never_an_id() {
        assert!(GripId::new(0).is_none());
        assert_eq!(GripId::new(7).map(GripId::get), Some(7));
    }

    #[test]
    fn allocator_skips_ids_in_use() {
        let mut ids = GripIdAllocator::default();
        let first = ids.next(false, |_| false).unwrap();
        assert_eq!(first.get(), 1);
        let second = ids.next(false, |id| id.get() == 2).unwrap();
        assert_eq!(second.get(), 3);
        assert!(!second.is_local());
        assert!(ids.next(true, |_| false).unwrap().is_local());
    }

    #[test]
    fn allocator_wraps_and_reports_exhaustion() {
        let mut ids = GripIdAllocator::default();
        for expected in 1..=127 {
            assert_eq!(ids.next(false, |_| false).unwrap().get(), expected);
        }
        assert_eq!(ids.next(false, |_| false).unwrap().get(), 1);
        assert!(ids.next(false, |_| true).is_none());
    }
}
