// storage.rs - Fixed-stride component columns
//
// One column per registered component type, indexed by entity slot. Each
// slot is `stride` bytes rounded up to whole 8-byte words. Words are
// `AtomicU64` accessed with relaxed ordering: that compiles to plain loads and
// stores, lets every chunk of a parallel dispatch share the column through
// `&Column`, and turns an unsynchronized cross-chunk read into a possibly
// torn value instead of undefined behaviour.

use bytemuck::Pod;
use std::mem::size_of;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

const WORD: usize = size_of::<u64>();

/// Raw address of one component instance.
///
/// Valid until the next structural change (attach, detach, destroy, create)
/// on the owning store; growth of a column may relocate every slot in it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ComponentPtr(NonNull<u8>);

// The pointer is only an address. Dereferencing it is already `unsafe` and
// the caller takes on the aliasing rules there.
unsafe impl Send for ComponentPtr {}
unsafe impl Sync for ComponentPtr {}

impl ComponentPtr {
    #[inline]
    pub fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr()
    }

    /// Reinterpret as a typed pointer. The slot is 8-byte aligned.
    #[inline]
    pub fn cast<T>(self) -> *mut T {
        self.0.as_ptr().cast()
    }
}

/// Backing storage for a single component type.
pub struct Column {
    stride: usize,
    words_per_slot: usize,
    words: Vec<AtomicU64>,
}

impl Column {
    pub fn new(stride: usize) -> Self {
        Self {
            stride,
            words_per_slot: stride.div_ceil(WORD),
            words: Vec::new(),
        }
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of slots currently backed by memory.
    #[inline]
    pub fn slot_capacity(&self) -> usize {
        if self.words_per_slot == 0 {
            usize::MAX
        } else {
            self.words.len() / self.words_per_slot
        }
    }

    /// Make sure `slot` is backed and zero it.
    pub fn init_slot(&mut self, slot: usize) {
        let needed = (slot + 1) * self.words_per_slot;
        if self.words.len() < needed {
            self.words.resize_with(needed, || AtomicU64::new(0));
        } else {
            self.clear_slot(slot);
        }
    }

    /// Zero a slot so a later attach never sees the previous owner's data.
    pub fn clear_slot(&mut self, slot: usize) {
        let range = self.range(slot);
        if let Some(words) = self.words.get_mut(range) {
            for word in words {
                *word.get_mut() = 0;
            }
        }
    }

    #[inline]
    fn range(&self, slot: usize) -> std::ops::Range<usize> {
        let start = slot * self.words_per_slot;
        start..start + self.words_per_slot
    }

    #[inline]
    fn words(&self, slot: usize) -> Option<&[AtomicU64]> {
        self.words.get(self.range(slot))
    }

    /// Address of a slot, or `None` if it was never backed.
    pub fn ptr(&self, slot: usize) -> Option<ComponentPtr> {
        if self.words_per_slot == 0 {
            return Some(ComponentPtr(NonNull::dangling()));
        }
        let first = self.words(slot)?.first()?;
        NonNull::new(first.as_ptr().cast::<u8>()).map(ComponentPtr)
    }

    /// Copy the first `out.len()` bytes of a slot.
    pub fn load(&self, slot: usize, out: &mut [u8]) -> bool {
        if out.len() > self.stride {
            return false;
        }
        let Some(words) = self.words(slot) else {
            return false;
        };
        for (chunk, word) in out.chunks_mut(WORD).zip(words) {
            let bytes = word.load(Ordering::Relaxed).to_ne_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
        true
    }

    /// Overwrite the first `data.len()` bytes of a slot.
    pub fn store(&self, slot: usize, data: &[u8]) -> bool {
        if data.len() > self.stride {
            return false;
        }
        let Some(words) = self.words(slot) else {
            return false;
        };
        for (chunk, word) in data.chunks(WORD).zip(words) {
            let mut bytes = [0u8; WORD];
            if chunk.len() < WORD {
                // keep the tail bytes that belong to this slot
                bytes = word.load(Ordering::Relaxed).to_ne_bytes();
            }
            bytes[..chunk.len()].copy_from_slice(chunk);
            word.store(u64::from_ne_bytes(bytes), Ordering::Relaxed);
        }
        true
    }

    pub fn read<T: Pod>(&self, slot: usize) -> Option<T> {
        let mut value = T::zeroed();
        self.load(slot, bytemuck::bytes_of_mut(&mut value))
            .then_some(value)
    }

    pub fn write<T: Pod>(&self, slot: usize, value: &T) -> bool {
        self.store(slot, bytemuck::bytes_of(value))
    }

    /// Exclusive byte view of a slot, trimmed to the stride.
    pub fn bytes_mut(&mut self, slot: usize) -> Option<&mut [u8]> {
        let range = self.range(slot);
        let stride = self.stride;
        let words = self.words.get_mut(range)?;
        // SAFETY: `AtomicU64` has the same size and alignment as `u64`, and the
        // `&mut` borrow rules out any concurrent atomic access to these words.
        let bytes = unsafe {
            std::slice::from_raw_parts_mut(words.as_mut_ptr().cast::<u8>(), words.len() * WORD)
        };
        Some(&mut bytes[..stride])
    }

    /// Exclusive typed view. Fails if `T` is larger than the stride or needs
    /// more than 8-byte alignment.
    pub fn get_mut<T: Pod>(&mut self, slot: usize) -> Option<&mut T> {
        let bytes = self.bytes_mut(slot)?;
        let bytes = bytes.get_mut(..size_of::<T>())?;
        bytemuck::try_from_bytes_mut(bytes).ok()
    }

    /// Drop every slot.
    pub fn clear(&mut self) {
        self.words.clear();
    }
}
