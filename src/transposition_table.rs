use std::sync::{atomic::*, Arc};

/// Default table capacity, a prime so `key % capacity` spreads well
pub const TABLE_MAX_SIZE: usize = (1 << 23) + 9;

/// How a cached value bounds the true value of its position.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Flag {
    Exact,
    LowerBound,
    UpperBound,
}

impl Flag {
    // encoding starts at 1 so a stored entry never packs to the zero word,
    // which marks an empty slot
    fn encode(self) -> u64 {
        match self {
            Flag::Exact => 1,
            Flag::LowerBound => 2,
            Flag::UpperBound => 3,
        }
    }

    fn decode(raw: u64) -> Option<Self> {
        match raw {
            1 => Some(Flag::Exact),
            2 => Some(Flag::LowerBound),
            3 => Some(Flag::UpperBound),
            _ => None,
        }
    }
}

/// One cached search result.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub depth: u32,
    pub value: i32,
    pub flag: Flag,
    pub column: Option<usize>,
}

const NO_COLUMN: u64 = 0xff;

impl Entry {
    // layout: value in the low 32 bits, then depth, flag and best column
    fn pack(self) -> u64 {
        let column = match self.column {
            Some(column) => column as u64 & 0xff,
            None => NO_COLUMN,
        };
        (self.value as u32 as u64)
            | (self.depth as u64 & 0xff) << 32
            | self.flag.encode() << 40
            | column << 48
    }

    fn unpack(data: u64) -> Option<Self> {
        let flag = Flag::decode(data >> 40 & 0xff)?;
        let column = match data >> 48 & 0xff {
            NO_COLUMN => None,
            column => Some(column as usize),
        };
        Some(Self {
            depth: (data >> 32 & 0xff) as u32,
            value: data as u32 as i32,
            flag,
            column,
        })
    }
}

struct SharedSlot {
    key: AtomicU64,
    data: AtomicU64,
}

impl SharedSlot {
    fn new() -> Self {
        Self {
            key: AtomicU64::new(0),
            data: AtomicU64::new(0),
        }
    }
}

/// Fixed-capacity position cache shared between search threads.
///
/// A flat array indexed by `key % capacity`; colliding stores silently
/// overwrite. Slots hold two relaxed atomics, the payload word and the full
/// key XORed with it, so a reader that races a writer reconstructs a key
/// that cannot match and treats the slot as a miss. Lost updates are
/// acceptable staleness; no lock is taken anywhere.
#[derive(Clone)]
pub struct SharedTranspositionTable {
    slots: Arc<Vec<SharedSlot>>,
}

impl SharedTranspositionTable {
    pub fn new() -> Self {
        Self::with_capacity(TABLE_MAX_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(SharedSlot::new());
        }
        Self {
            slots: Arc::new(slots),
        }
    }

    /// Looks up `key`, rejecting slots whose stored full key does not match
    pub fn get(&self, key: u64) -> Option<Entry> {
        let slot = &self.slots[key as usize % self.slots.len()];
        let data = slot.data.load(Ordering::Relaxed);
        if data == 0 || slot.key.load(Ordering::Relaxed) != key ^ data {
            return None;
        }
        Entry::unpack(data)
    }

    /// Stores `entry` under `key`, overwriting whatever occupied the slot
    pub fn set(&self, key: u64, entry: Entry) {
        let slot = &self.slots[key as usize % self.slots.len()];
        let data = entry.pack();
        slot.key.store(key ^ data, Ordering::Relaxed);
        slot.data.store(data, Ordering::Relaxed);
    }
}

impl Default for SharedTranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}
