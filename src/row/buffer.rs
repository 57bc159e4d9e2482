//! # Row Buffers
//!
//! A [`RowBuffer`] is the fixed-size byte image of one row in one physical
//! layout, plus the [`BlobHeap`] holding that row's large-object bytes.
//!
//! Large objects are stored out of row. The record holds a length prefix and
//! an 8-byte [`BlobHandle`] naming a heap and a slot:
//!
//! ```text
//! record:  ... │ len (1-4 B LE) │ heap id u32 LE │ slot u32 LE │ ...
//!                                   │
//! BlobHeap #heap id  ───────────────┘  slots: [bytes, bytes, ...]
//! ```
//!
//! Copying record bytes (`copy_bytes_from`) copies handles, not the bytes
//! behind them: the copy's handles keep naming the source heap and read as
//! dangling through the copy's own heap. A stable copy needs
//! [`crate::RowLayout::copy_row`], which re-homes every large object.

use std::sync::atomic::{AtomicU32, Ordering};

use eyre::{ensure, Result};

/// Heap ids start at 1; 0 marks "no object".
static NEXT_HEAP_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobHandle {
    pub heap: u32,
    pub slot: u32,
}

impl BlobHandle {
    pub const SIZE: usize = 8;

    pub const NONE: BlobHandle = BlobHandle { heap: 0, slot: 0 };

    pub fn write(self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.heap.to_le_bytes());
        out[4..8].copy_from_slice(&self.slot.to_le_bytes());
    }

    pub fn read(src: &[u8]) -> Self {
        Self {
            heap: u32::from_le_bytes([src[0], src[1], src[2], src[3]]),
            slot: u32::from_le_bytes([src[4], src[5], src[6], src[7]]),
        }
    }
}

#[derive(Debug)]
pub struct BlobHeap {
    id: u32,
    slots: Vec<Vec<u8>>,
}

impl Default for BlobHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobHeap {
    pub fn new() -> Self {
        Self {
            id: NEXT_HEAP_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn owns(&self, handle: BlobHandle) -> bool {
        handle.heap == self.id && (handle.slot as usize) < self.slots.len()
    }

    pub fn insert(&mut self, bytes: &[u8]) -> BlobHandle {
        self.slots.push(bytes.to_vec());
        BlobHandle {
            heap: self.id,
            slot: (self.slots.len() - 1) as u32,
        }
    }

    /// Overwrites `handle`'s slot when this heap owns it, else allocates.
    pub fn replace(&mut self, handle: BlobHandle, bytes: &[u8]) -> BlobHandle {
        if self.owns(handle) {
            let slot = &mut self.slots[handle.slot as usize];
            slot.clear();
            slot.extend_from_slice(bytes);
            return handle;
        }
        self.insert(bytes)
    }

    pub fn get(&self, handle: BlobHandle) -> Option<&[u8]> {
        if handle.heap != self.id {
            return None;
        }
        self.slots.get(handle.slot as usize).map(Vec::as_slice)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[derive(Debug)]
pub struct RowBuffer {
    data: Vec<u8>,
    blobs: BlobHeap,
}

impl RowBuffer {
    /// A zeroed record of `len` bytes with an empty heap.
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0u8; len],
            blobs: BlobHeap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn blobs(&self) -> &BlobHeap {
        &self.blobs
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [u8], &mut BlobHeap) {
        (&mut self.data, &mut self.blobs)
    }

    /// Shallow copy of the record bytes of a row in the same layout.
    pub fn copy_bytes_from(&mut self, other: &RowBuffer) -> Result<()> {
        ensure!(
            self.data.len() == other.data.len(),
            "cannot copy a {}-byte record into a {}-byte record",
            other.data.len(),
            self.data.len()
        );
        self.data.copy_from_slice(&other.data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heaps_get_distinct_ids() {
        let a = BlobHeap::new();
        let b = BlobHeap::new();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), 0);
    }

    #[test]
    fn handles_resolve_only_in_their_heap() {
        let mut a = BlobHeap::new();
        let b = BlobHeap::new();
        let h = a.insert(b"payload");
        assert_eq!(a.get(h), Some(&b"payload"[..]));
        assert_eq!(b.get(h), None);
    }

    #[test]
    fn replace_reuses_owned_slots() {
        let mut heap = BlobHeap::new();
        let h = heap.insert(b"one");
        let h2 = heap.replace(h, b"two");
        assert_eq!(h, h2);
        assert_eq!(heap.len(), 1);
        let h3 = heap.replace(BlobHandle::NONE, b"three");
        assert_ne!(h3, h);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn handle_bytes_round_trip() {
        let h = BlobHandle { heap: 7, slot: 0x0102_0304 };
        let mut buf = [0u8; 8];
        h.write(&mut buf);
        assert_eq!(BlobHandle::read(&buf), h);
    }

    #[test]
    fn shallow_copy_requires_equal_lengths() {
        let mut a = RowBuffer::new(4);
        let b = RowBuffer::new(5);
        assert!(a.copy_bytes_from(&b).is_err());
        let mut c = RowBuffer::new(4);
        c.as_bytes_mut()[0] = 9;
        a.copy_bytes_from(&c).unwrap();
        assert_eq!(a.as_bytes()[0], 9);
    }
}
