use crate::index::FileId;

/// Vacant-slot marker. Trigrams only occupy the low 24 bits, so the
/// all-ones key can never collide with a real one.
const EMPTY_KEY: u32 = u32::MAX;

const INITIAL_CAPACITY: usize = 1024;

/// Load factor cap: grow at 0.7.
const LOAD_NUM: usize = 7;
const LOAD_DEN: usize = 10;

/// One inverted-index entry.
///
/// `buffer` is the mutable posting list accumulated between commits; it may
/// hold duplicates. Sealing replaces it with `(offset, size)` into the
/// compressed payload arena, whose content decodes to a strictly ascending
/// id sequence of length `file_count`.
pub struct Entry {
    pub trigram: u32,
    pub file_count: u32,
    pub offset: usize,
    pub size: usize,
    pub buffer: Option<Vec<FileId>>,
}

impl Entry {
    fn vacant() -> Self {
        Entry {
            trigram: EMPTY_KEY,
            file_count: 0,
            offset: 0,
            size: 0,
            buffer: None,
        }
    }

    #[inline]
    pub fn is_vacant(&self) -> bool {
        self.trigram == EMPTY_KEY
    }

    /// Whether a compressed payload has been written for this entry.
    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.size > 0
    }
}

/// Open-addressed hash table keyed by trigram.
///
/// Quadratic (triangular) probing over a power-of-two slot array; with
/// that combination every probe sequence visits every slot, so inserts
/// below the load cap always terminate.
pub struct EntryTable {
    slots: Vec<Entry>,
    live: usize,
}

#[inline]
fn slot_hash(trigram: u32) -> usize {
    // Multiplicative mix; the key is only 24 bits wide.
    trigram.wrapping_mul(0x9E37_79B1) as usize
}

impl Default for EntryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryTable {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Entry::vacant);
        EntryTable { slots, live: 0 }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Probe for `trigram`. Returns the slot holding it, or the vacant slot
    /// where it would be inserted.
    fn probe(&self, trigram: u32) -> usize {
        let mask = self.slots.len() - 1;
        let h = slot_hash(trigram);
        let mut i = 0usize;
        loop {
            let idx = (h + (i + i * i) / 2) & mask;
            let entry = &self.slots[idx];
            if entry.is_vacant() || entry.trigram == trigram {
                return idx;
            }
            i += 1;
            debug_assert!(i <= self.slots.len());
        }
    }

    pub fn get(&self, trigram: u32) -> Option<&Entry> {
        let idx = self.probe(trigram);
        let entry = &self.slots[idx];
        (!entry.is_vacant()).then_some(entry)
    }

    pub fn get_mut(&mut self, trigram: u32) -> Option<&mut Entry> {
        let idx = self.probe(trigram);
        let entry = &mut self.slots[idx];
        (!entry.is_vacant()).then_some(entry)
    }

    /// Locate or create the entry for `trigram`, growing first if the
    /// insert would breach the load cap.
    pub fn get_or_insert(&mut self, trigram: u32) -> &mut Entry {
        debug_assert_ne!(trigram, EMPTY_KEY);

        if (self.live + 1) * LOAD_DEN > self.slots.len() * LOAD_NUM {
            self.grow();
        }

        let idx = self.probe(trigram);
        let entry = &mut self.slots[idx];
        if entry.is_vacant() {
            entry.trigram = trigram;
            self.live += 1;
        }
        &mut self.slots[idx]
    }

    /// Double the slot array and reinsert every live entry.
    fn grow(&mut self) {
        let mut bigger = EntryTable::with_capacity(self.slots.len() * 2);
        for entry in self.slots.drain(..) {
            if entry.trigram == EMPTY_KEY {
                continue;
            }
            let idx = bigger.probe(entry.trigram);
            bigger.slots[idx] = entry;
            bigger.live += 1;
        }
        *self = bigger;
    }

    /// Live entries, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.slots.iter().filter(|e| !e.is_vacant())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.slots.iter_mut().filter(|e| !e.is_vacant())
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
