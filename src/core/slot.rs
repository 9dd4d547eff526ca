//! Slot storage dan cursor padding untuk circular queue.
//!
//! Slot tidak tahu apakah dirinya berisi elemen hidup. Status "occupied"
//! ditentukan sepenuhnya oleh posisi slot terhadap cursor `read`/`write`,
//! jadi setiap method di sini `unsafe` dan caller yang menjamin statusnya.

use std::mem::MaybeUninit;

#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicUsize, Ordering};

#[cfg(loom)]
use loom::cell::UnsafeCell;

/// `std::cell::UnsafeCell` dengan API closure yang sama seperti
/// `loom::cell::UnsafeCell`, supaya akses slot ikut dicek loom.
#[cfg(not(loom))]
#[repr(transparent)]
struct UnsafeCell<T>(std::cell::UnsafeCell<T>);

#[cfg(not(loom))]
impl<T> UnsafeCell<T> {
    #[inline(always)]
    const fn new(value: T) -> Self {
        Self(std::cell::UnsafeCell::new(value))
    }

    #[inline(always)]
    fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
        f(self.0.get())
    }

    #[inline(always)]
    fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
        f(self.0.get())
    }
}

/// Satu cell storage: empty atau occupied(T).
#[repr(transparent)]
pub(crate) struct Slot<T> {
    data: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Empty -> occupied.
    ///
    /// # Safety
    /// Slot harus empty dan tidak sedang diakses thread lain.
    #[inline(always)]
    pub(crate) unsafe fn write(&self, value: T) {
        self.data.with_mut(|ptr| {
            (*ptr).write(value);
        })
    }

    /// Occupied -> empty. Ownership elemen pindah ke caller.
    ///
    /// # Safety
    /// Slot harus occupied dan tidak sedang diakses thread lain.
    #[inline(always)]
    pub(crate) unsafe fn take(&self) -> T {
        self.data.with_mut(|ptr| (*ptr).assume_init_read())
    }

    /// Occupied -> empty, elemen di-drop di tempat.
    ///
    /// # Safety
    /// Sama dengan [`Slot::take`].
    #[inline(always)]
    pub(crate) unsafe fn drop_in_place(&self) {
        self.data.with_mut(|ptr| (*ptr).assume_init_drop())
    }

    /// Clone elemen yang masih hidup; slot tetap occupied.
    ///
    /// # Safety
    /// Slot harus occupied dan tidak ada writer maupun thread lain yang
    /// mengakses elemen ini selama clone berlangsung.
    #[inline(always)]
    pub(crate) unsafe fn cloned(&self) -> T
    where
        T: Clone,
    {
        self.data.with(|ptr| (*ptr).assume_init_ref().clone())
    }
}

/// Padding untuk cache line isolation (64 bytes pada x86-64)
#[repr(C, align(64))]
pub(crate) struct CacheLinePadded<T> {
    pub(crate) value: T,
}

impl<T> CacheLinePadded<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self { value }
    }
}
