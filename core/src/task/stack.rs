//! Owned kernel stack buffer. The actual allocator is out of scope;
//! this wraps the `alloc` crate's global allocator directly since
//! `alloc` is already pulled in at the crate root for task-table
//! storage.

use alloc::alloc::{Layout, alloc_zeroed, dealloc};
use core::ptr::NonNull;

use crate::config::KERNEL_STACK_SIZE;
use kestrel_abi::task::TASK_KERNEL_STACK_ALIGN;

pub struct KernelStack {
    base: NonNull<u8>,
    layout: Layout,
}

// SAFETY: the buffer is exclusively owned by the `Task` holding this
// stack; no aliasing pointers to it exist outside the owning task.
unsafe impl Send for KernelStack {}

impl KernelStack {
    pub fn new(size: usize) -> Option<Self> {
        let size = size.max(TASK_KERNEL_STACK_ALIGN);
        let layout = Layout::from_size_align(size, TASK_KERNEL_STACK_ALIGN).ok()?;
        // SAFETY: `layout` has non-zero size.
        let base = unsafe { alloc_zeroed(layout) };
        NonNull::new(base).map(|base| Self { base, layout })
    }

    pub fn default_sized() -> Option<Self> {
        Self::new(KERNEL_STACK_SIZE)
    }

    #[inline]
    pub fn base(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Address one past the last byte — the initial stack pointer for a
    /// full-descending-stack architecture.
    #[inline]
    pub fn top(&self) -> *mut u8 {
        // SAFETY: stays within the allocation (one-past-the-end is a
        // valid pointer to compute even though it may not be dereferenced).
        unsafe { self.base.as_ptr().add(self.layout.size()) }
    }
}

impl Drop for KernelStack {
    fn drop(&mut self) {
        // SAFETY: `base`/`layout` are exactly what `alloc_zeroed` returned.
        unsafe { dealloc(self.base.as_ptr(), self.layout) };
    }
}
