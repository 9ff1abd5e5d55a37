use std::fmt;

/// Commit version assigned by the store. Every committed transaction bumps it.
pub type Version = u64;

/// Opaque identity of an object in the store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ObjectRef(u64);

impl ObjectRef {
    pub fn new(id: u64) -> Self {
        ObjectRef(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{:x}", self.0)
    }
}

// Reference slots shared by the terminus and every node.
//  [skip list, value object, level-0 prev, forward_0, forward_1, ...]
pub const LIST_SLOT: usize = 0;
pub const VALUE_SLOT: usize = 1;
pub const PREV_SLOT: usize = 2;
pub const FORWARD_BASE: usize = 3;

// The metadata object holds a single reference.
pub const TERMINUS_SLOT: usize = 0;

#[inline]
pub fn forward_slot(level: usize) -> usize {
    FORWARD_BASE + level
}
