use super::ComplexWord;
use crate::sync::{LockBlame, WaitMechanism};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wide::f32x4;

/// Shared allocation behind a [`SimdBuffer`] and its views.
struct Storage {
    lock: LockBlame,
    groups: AtomicUsize,
    size: AtomicUsize,
    words: UnsafeCell<Vec<ComplexWord>>,
}

// SAFETY: `words` is only touched through a `BufferAccess`, whose `LockBlame`
// hold rules out a writer running next to any other holder.
unsafe impl Sync for Storage {}

impl Storage {
    fn new(groups: usize, size: usize) -> Self {
        Self {
            lock: LockBlame::new(),
            groups: AtomicUsize::new(groups),
            size: AtomicUsize::new(size),
            words: UnsafeCell::new(vec![f32x4::ZERO; groups * size]),
        }
    }
}

/// Owner of lock-guarded spectral storage: `groups` channel groups of `size`
/// packed bins each.
///
/// Views share the allocation but cannot resize it.
pub struct SimdBuffer {
    storage: Arc<Storage>,
}

impl SimdBuffer {
    pub fn new(groups: usize, size: usize) -> Self {
        Self {
            storage: Arc::new(Storage::new(groups, size)),
        }
    }

    #[inline]
    pub fn groups(&self) -> usize {
        self.storage.groups.load(Ordering::Acquire)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.storage.size.load(Ordering::Acquire)
    }

    /// Grow to at least `groups` x `size`, or exactly that with `fit_to_size`.
    ///
    /// Bins keep their index within each surviving group. Waits for every
    /// holder (including views) to release first.
    pub fn reserve(&mut self, groups: usize, size: usize, fit_to_size: bool, mechanism: WaitMechanism) {
        let (old_groups, old_size) = (self.groups(), self.size());
        let (groups, size) = if fit_to_size {
            (groups, size)
        } else {
            (groups.max(old_groups), size.max(old_size))
        };
        if (groups, size) == (old_groups, old_size) {
            return;
        }

        let _access = self.lock(true, mechanism);
        let mut words = vec![f32x4::ZERO; groups * size];
        let keep = size.min(old_size);
        {
            // SAFETY: exclusive hold.
            let old = unsafe { &*self.storage.words.get() };
            for group in 0..groups.min(old_groups) {
                words[group * size..group * size + keep]
                    .copy_from_slice(&old[group * old_size..group * old_size + keep]);
            }
        }
        // SAFETY: exclusive hold; no slice into the old vector outlives this.
        unsafe {
            *self.storage.words.get() = words;
        }
        self.storage.groups.store(groups, Ordering::Release);
        self.storage.size.store(size, Ordering::Release);
    }

    /// View of every group.
    pub fn view(&self) -> SimdBufferView {
        SimdBufferView {
            storage: Arc::clone(&self.storage),
            first_group: 0,
            groups: self.groups(),
        }
    }

    /// View of a single channel group.
    pub fn view_group(&self, group: usize) -> SimdBufferView {
        assert!(group < self.groups(), "group {group} out of range");
        SimdBufferView {
            storage: Arc::clone(&self.storage),
            first_group: group,
            groups: 1,
        }
    }

    pub fn lock(&self, exclusive: bool, mechanism: WaitMechanism) -> BufferAccess {
        self.view().lock(exclusive, mechanism)
    }

    pub fn try_lock(&self, exclusive: bool, mechanism: WaitMechanism) -> Option<BufferAccess> {
        self.view().try_lock(exclusive, mechanism)
    }

    /// Current lock counter (see [`LockBlame`]).
    pub fn lock_count(&self) -> i32 {
        self.storage.lock.count()
    }

    /// Number of owners and views sharing the allocation.
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.storage)
    }
}

impl std::fmt::Debug for SimdBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimdBuffer")
            .field("groups", &self.groups())
            .field("size", &self.size())
            .field("lock", &self.lock_count())
            .finish()
    }
}

/// Non-owning handle onto a range of groups of a [`SimdBuffer`].
#[derive(Clone)]
pub struct SimdBufferView {
    storage: Arc<Storage>,
    first_group: usize,
    groups: usize,
}

impl SimdBufferView {
    #[inline]
    pub fn groups(&self) -> usize {
        self.groups
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.storage.size.load(Ordering::Acquire)
    }

    /// Whether both views are backed by the same allocation.
    #[inline]
    pub fn same_storage(&self, other: &SimdBufferView) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    pub fn lock(&self, exclusive: bool, mechanism: WaitMechanism) -> BufferAccess {
        self.storage.lock.lock(exclusive, mechanism);
        self.access(exclusive, mechanism)
    }

    pub fn try_lock(&self, exclusive: bool, mechanism: WaitMechanism) -> Option<BufferAccess> {
        self.storage
            .lock
            .try_lock(exclusive)
            .then(|| self.access(exclusive, mechanism))
    }

    fn access(&self, exclusive: bool, mechanism: WaitMechanism) -> BufferAccess {
        BufferAccess {
            view: self.clone(),
            exclusive,
            mechanism,
        }
    }
}

impl std::fmt::Debug for SimdBufferView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimdBufferView")
            .field("first_group", &self.first_group)
            .field("groups", &self.groups)
            .finish()
    }
}

/// Held lock on a buffer's storage, scoped to a view's groups.
///
/// Shared holds read, exclusive holds also write. The hold remembers its
/// exclusivity and releases accordingly on drop.
pub struct BufferAccess {
    view: SimdBufferView,
    exclusive: bool,
    mechanism: WaitMechanism,
}

impl BufferAccess {
    #[inline]
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    #[inline]
    pub fn groups(&self) -> usize {
        self.view.groups
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.view.size()
    }

    /// The view this hold was taken through.
    pub fn view(&self) -> &SimdBufferView {
        &self.view
    }

    /// Every word of the held groups, group after group.
    #[inline]
    pub fn words(&self) -> &[ComplexWord] {
        let size = self.size();
        // SAFETY: the hold excludes writers other than ourselves.
        let words = unsafe { &*self.view.storage.words.get() };
        &words[self.view.first_group * size..(self.view.first_group + self.view.groups) * size]
    }

    #[inline]
    pub fn words_mut(&mut self) -> &mut [ComplexWord] {
        assert!(self.exclusive, "write through a shared buffer hold");
        let size = self.size();
        // SAFETY: exclusive hold; `&mut self` keeps this slice unique.
        let words = unsafe { &mut *self.view.storage.words.get() };
        &mut words[self.view.first_group * size..(self.view.first_group + self.view.groups) * size]
    }

    #[inline]
    pub fn group(&self, group: usize) -> &[ComplexWord] {
        let size = self.size();
        &self.words()[group * size..(group + 1) * size]
    }

    #[inline]
    pub fn group_mut(&mut self, group: usize) -> &mut [ComplexWord] {
        let size = self.size();
        &mut self.words_mut()[group * size..(group + 1) * size]
    }

    /// Keep reading, let other readers in.
    pub fn downgrade(&mut self) {
        if self.exclusive {
            self.view.storage.lock.downgrade(self.mechanism);
            self.exclusive = false;
        }
    }

    /// Copy the first `bins` bins of every group of `source`.
    ///
    /// Panics if both holds are on the same allocation.
    pub fn copy_from(&mut self, source: &BufferAccess, bins: usize) {
        assert!(
            !self.view.same_storage(&source.view),
            "copy between holds on the same storage"
        );
        let (size, source_size) = (self.size(), source.size());
        for group in 0..self.groups().min(source.groups()) {
            let words = &source.words()[group * source_size..group * source_size + bins];
            self.words_mut()[group * size..group * size + bins].copy_from_slice(words);
        }
    }
}

impl Drop for BufferAccess {
    fn drop(&mut self) {
        self.view.storage.lock.unlock(self.exclusive, self.mechanism);
    }
}

impl std::fmt::Debug for BufferAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferAccess")
            .field("view", &self.view)
            .field("exclusive", &self.exclusive)
            .finish()
    }
}
