//! Handle producer/consumer untuk pemakaian lintas thread.
//!
//! Masing-masing peran hanya punya satu handle (tidak `Clone`), dan keduanya
//! meminjam queue selama `'q`. Itu yang membuat kontrak SPSC terjaga tanpa
//! `unsafe` di sisi caller.

use std::fmt;

use super::queue::{CircularQueue, Full};

/// Sisi producer dari [`CircularQueue::split`].
pub struct Producer<'q, T, const N: usize> {
    queue: &'q CircularQueue<T, N>,
}

impl<'q, T, const N: usize> Producer<'q, T, N> {
    /// # Safety
    /// Tidak boleh ada producer lain untuk `queue` selama `'q`.
    pub(crate) unsafe fn new(queue: &'q CircularQueue<T, N>) -> Self {
        Self { queue }
    }

    /// Enqueue salinan `item`. Returns `false` jika penuh (state tidak berubah).
    #[inline(always)]
    pub fn enqueue(&mut self, item: &T) -> bool
    where
        T: Clone,
    {
        // SAFETY: handle ini satu-satunya producer
        unsafe { self.queue.push_cloned(item) }
    }

    /// Enqueue dengan move. Jika penuh, nilai dikembalikan di dalam [`Full`].
    #[inline(always)]
    pub fn try_enqueue(&mut self, value: T) -> Result<(), Full<T>> {
        // SAFETY: handle ini satu-satunya producer
        unsafe { self.queue.push_unchecked(value) }.map_err(Full)
    }

    /// Cek apakah queue penuh (snapshot)
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    /// Jumlah elemen dalam queue (snapshot)
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Cek apakah queue kosong (snapshot)
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N - 1
    }
}

/// Sisi consumer dari [`CircularQueue::split`].
pub struct Consumer<'q, T, const N: usize> {
    queue: &'q CircularQueue<T, N>,
}

impl<'q, T, const N: usize> Consumer<'q, T, N> {
    /// # Safety
    /// Tidak boleh ada consumer lain untuk `queue` selama `'q`.
    pub(crate) unsafe fn new(queue: &'q CircularQueue<T, N>) -> Self {
        Self { queue }
    }

    /// Dequeue ke `out`. Returns `false` jika kosong, `out` tidak disentuh.
    #[inline(always)]
    pub fn dequeue(&mut self, out: &mut T) -> bool {
        match self.try_dequeue() {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    /// Dequeue dengan move.
    #[inline(always)]
    pub fn try_dequeue(&mut self) -> Option<T> {
        // SAFETY: handle ini satu-satunya consumer
        unsafe { self.queue.pop_unchecked() }
    }

    /// Iterator yang mengambil elemen sampai queue terlihat kosong.
    ///
    /// Tidak menunggu: elemen yang masuk setelah iterator selesai tetap di queue.
    pub fn try_iter(&mut self) -> TryIter<'_, 'q, T, N> {
        TryIter { consumer: self }
    }

    /// Cek apakah queue kosong (snapshot)
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Jumlah elemen dalam queue (snapshot)
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Iterator dari [`Consumer::try_iter`].
pub struct TryIter<'a, 'q, T, const N: usize> {
    consumer: &'a mut Consumer<'q, T, N>,
}

impl<T, const N: usize> Iterator for TryIter<'_, '_, T, N> {
    type Item = T;

    #[inline(always)]
    fn next(&mut self) -> Option<T> {
        self.consumer.try_dequeue()
    }
}

// SAFETY: handle hanya memindahkan `T` masuk (producer) atau keluar
// (consumer) lewat cursor miliknya sendiri, tidak pernah membuat `&T` ke
// elemen di queue. Selama handle hidup queue ter-borrow mutable, jadi
// `clone(&self)` tidak bisa berjalan paralel. Karena itu `T: Send` cukup,
// walaupun `CircularQueue<T, N>` sendiri butuh `T: Sync` untuk `Sync`.
unsafe impl<T: Send, const N: usize> Send for Producer<'_, T, N> {}
unsafe impl<T: Send, const N: usize> Send for Consumer<'_, T, N> {}

impl<T, const N: usize> fmt::Debug for Producer<'_, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").field("queue", self.queue).finish()
    }
}

impl<T, const N: usize> fmt::Debug for Consumer<'_, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("queue", self.queue).finish()
    }
}
