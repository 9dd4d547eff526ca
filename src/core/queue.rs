//! Lock-Free Single-Producer Single-Consumer (SPSC) Circular Queue
//!
//! Implementasi Lamport Queue dengan dua cursor dalam rentang `[0, N)`.
//! Satu slot selalu dikorbankan supaya kondisi kosong (`read == write`)
//! bisa dibedakan dari kondisi penuh (`(write + 1) % N == read`), jadi
//! kapasitas efektif adalah `N - 1`.
//!
//! Memory ordering:
//!
//! ```text
//! Producer menulis slot, lalu Release-store `write`  ->  consumer Acquire-load `write`, lalu baca slot
//! Consumer baca slot,    lalu Release-store `read`   ->  producer Acquire-load `read`, lalu tulis ulang slot
//! ```
//!
//! Tidak ada Mutex, tidak ada alokasi heap, tidak ada retry loop di dalam
//! queue. Kalau penuh atau kosong, caller yang memutuskan mau spin, backoff,
//! atau drop.

use std::fmt;

use super::handle::{Consumer, Producer};
use super::slot::{AtomicUsize, CacheLinePadded, Ordering, Slot};

/// Nilai yang ditolak karena queue penuh.
///
/// Dikembalikan oleh `try_enqueue` supaya caller tidak kehilangan ownership.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Ambil kembali nilai yang gagal dimasukkan.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Full(..)")
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is full")
    }
}

impl<T> std::error::Error for Full<T> {}

/// Bounded lock-free SPSC circular queue dengan `N` slot inline.
///
/// `N` harus >= 1; `N == 0` ditolak saat compile ketika `new()` di-instantiate.
/// Dengan `N == 1` queue selalu kosong sekaligus penuh.
///
/// Semua slot disimpan langsung di dalam struct, jadi untuk `N` besar
/// letakkan queue di `Box` atau `static` supaya tidak membebani stack.
///
/// Queue hanya `Sync` kalau `T: Send + Sync`. Untuk elemen yang `Send` saja,
/// pakai [`CircularQueue::split`]; handle-nya tetap bisa dikirim ke thread lain.
///
/// ```compile_fail
/// use std::cell::Cell;
/// use tandem::CircularQueue;
///
/// fn assert_sync<S: Sync>() {}
/// assert_sync::<CircularQueue<Cell<u64>, 4>>();
/// ```
#[repr(C)]
pub struct CircularQueue<T, const N: usize> {
    // Producer side - hanya producer yang menulis
    write: CacheLinePadded<AtomicUsize>,
    // Consumer side - hanya consumer yang menulis
    read: CacheLinePadded<AtomicUsize>,
    slots: [Slot<T>; N],
}

// SAFETY: CircularQueue aman untuk Send/Sync karena:
// - Hanya satu producer (menulis `write` dan slot di luar [read, write))
// - Hanya satu consumer (menulis `read` dan memindahkan slot di `read`)
// - Pasangan Release/Acquire pada kedua cursor menjamin visibility slot
// Kontrak SPSC dijaga oleh `split()` atau oleh caller API `*_unchecked`.
// Sync butuh `T: Sync` karena `clone(&self)` membuat `&T` ke setiap elemen
// hidup; dua thread yang berbagi `&CircularQueue` bisa clone bersamaan.
// Handle `Producer`/`Consumer` cukup `T: Send` (lihat handle.rs).
unsafe impl<T: Send, const N: usize> Send for CircularQueue<T, N> {}
unsafe impl<T: Send + Sync, const N: usize> Sync for CircularQueue<T, N> {}

impl<T, const N: usize> Default for CircularQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> CircularQueue<T, N> {
    const NON_ZERO_SLOTS: () = assert!(N > 0, "CircularQueue requires at least one slot");

    /// Jumlah slot fisik (`N`); satu di antaranya selalu kosong.
    pub const SLOTS: usize = N;

    /// Membuat queue kosong (`read == write == 0`).
    ///
    /// Tidak ada alokasi heap; `T` tidak perlu `Default`.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_ZERO_SLOTS;

        Self {
            write: CacheLinePadded::new(AtomicUsize::new(0)),
            read: CacheLinePadded::new(AtomicUsize::new(0)),
            slots: std::array::from_fn(|_| Slot::new()),
        }
    }

    /// Kapasitas efektif: jumlah elemen maksimum yang bisa ditampung (`N - 1`).
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Jumlah elemen dalam queue: `(write - read) mod N`.
    ///
    /// Selama producer/consumer aktif, nilainya hanya snapshot.
    #[inline(always)]
    pub fn len(&self) -> usize {
        let read = self.read.value.load(Ordering::Acquire);
        let write = self.write.value.load(Ordering::Acquire);
        if write >= read {
            write - read
        } else {
            N - read + write
        }
    }

    /// Cek apakah queue kosong
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        let read = self.read.value.load(Ordering::Acquire);
        let write = self.write.value.load(Ordering::Acquire);
        read == write
    }

    /// Cek apakah queue penuh
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        let write = self.write.value.load(Ordering::Acquire);
        let read = self.read.value.load(Ordering::Acquire);
        Self::advance(write) == read
    }

    /// Pisahkan queue menjadi satu [`Producer`] dan satu [`Consumer`].
    ///
    /// Selama kedua handle hidup, queue ter-borrow secara mutable, sehingga
    /// `clear()`, `clone()` dan `clone_from()` tidak mungkin berjalan
    /// bersamaan dengan enqueue/dequeue.
    pub fn split(&mut self) -> (Producer<'_, T, N>, Consumer<'_, T, N>) {
        let queue: &Self = self;
        // SAFETY: `&mut self` menjamin belum ada handle lain untuk queue ini,
        // dan hanya satu Producer dan satu Consumer yang dibuat di sini.
        unsafe { (Producer::new(queue), Consumer::new(queue)) }
    }

    /// Enqueue salinan `item` (Producer side, akses eksklusif).
    ///
    /// Returns `false` tanpa mengubah state jika queue penuh.
    #[inline]
    pub fn enqueue(&mut self, item: &T) -> bool
    where
        T: Clone,
    {
        // SAFETY: `&mut self` - tidak ada producer lain.
        unsafe { self.push_cloned(item) }
    }

    /// Enqueue dengan move (Producer side, akses eksklusif).
    ///
    /// Jika penuh, nilai dikembalikan di dalam [`Full`].
    #[inline]
    pub fn try_enqueue(&mut self, value: T) -> Result<(), Full<T>> {
        // SAFETY: `&mut self` - tidak ada producer lain.
        unsafe { self.push_unchecked(value) }.map_err(Full)
    }

    /// Dequeue ke `out` (Consumer side, akses eksklusif).
    ///
    /// Returns `false` dan `out` tidak disentuh jika queue kosong.
    #[inline]
    pub fn dequeue(&mut self, out: &mut T) -> bool {
        match self.try_dequeue() {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    /// Dequeue dengan move (Consumer side, akses eksklusif).
    #[inline]
    pub fn try_dequeue(&mut self) -> Option<T> {
        // SAFETY: `&mut self` - tidak ada consumer lain.
        unsafe { self.pop_unchecked() }
    }

    /// Push data ke queue tanpa handle (Producer side).
    ///
    /// Returns `Err(value)` tanpa mengubah state jika queue penuh.
    /// Zero-allocation, lock-free, O(1).
    ///
    /// # Safety
    /// - Hanya satu thread pada satu waktu yang boleh berperan sebagai producer
    ///   (memanggil `push_unchecked` atau memegang [`Producer`]).
    /// - Tidak boleh berjalan bersamaan dengan `clear()`, `clone()` atau
    ///   `clone_from()` pada queue ini.
    #[inline(always)]
    pub unsafe fn push_unchecked(&self, value: T) -> Result<(), T> {
        match self.claim_write() {
            Some((write, next)) => {
                self.commit_write(write, next, value);
                Ok(())
            }
            None => Err(value),
        }
    }

    /// Pop data dari queue tanpa handle (Consumer side).
    ///
    /// Returns `None` jika queue kosong.
    /// Zero-allocation, lock-free, O(1).
    ///
    /// # Safety
    /// - Hanya satu thread pada satu waktu yang boleh berperan sebagai consumer
    ///   (memanggil `pop_unchecked` atau memegang [`Consumer`]).
    /// - Tidak boleh berjalan bersamaan dengan `clear()`, `clone()` atau
    ///   `clone_from()` pada queue ini.
    #[inline(always)]
    pub unsafe fn pop_unchecked(&self) -> Option<T> {
        let read = self.read.value.load(Ordering::Relaxed);
        let write = self.write.value.load(Ordering::Acquire);

        // Cek apakah queue kosong
        if read == write {
            return None;
        }

        // SAFETY: `read` berada di [read, write) jadi slot occupied, dan
        // Acquire di atas menjamin konstruksi elemen sudah visible.
        let value = self.slots[read].take();

        // Release: slot sudah kosong sebelum producer boleh memakainya lagi
        self.read
            .value
            .store(Self::advance(read), Ordering::Release);

        Some(value)
    }

    /// Seperti `push_unchecked`, tapi `item` hanya di-clone kalau ada slot.
    ///
    /// # Safety
    /// Sama dengan [`CircularQueue::push_unchecked`].
    #[inline(always)]
    pub(crate) unsafe fn push_cloned(&self, item: &T) -> bool
    where
        T: Clone,
    {
        match self.claim_write() {
            Some((write, next)) => {
                self.commit_write(write, next, item.clone());
                true
            }
            None => false,
        }
    }

    /// Kosongkan queue: drop semua elemen di [read, write) lalu reset cursor ke 0.
    ///
    /// `&mut self` menjamin tidak ada producer/consumer yang aktif.
    pub fn clear(&mut self) {
        let mut read = self.read.value.load(Ordering::Relaxed);
        let write = self.write.value.load(Ordering::Relaxed);

        if std::mem::needs_drop::<T>() {
            while read != write {
                let slot = &self.slots[read];
                read = Self::advance(read);
                // Cursor maju dulu: kalau Drop milik T panic, slot ini tidak di-drop dua kali
                self.read.value.store(read, Ordering::Relaxed);
                // SAFETY: slot berada di [read, write) sebelum cursor dimajukan
                unsafe { slot.drop_in_place() };
            }
        }

        self.read.value.store(0, Ordering::Release);
        self.write.value.store(0, Ordering::Release);
    }

    /// Cek ruang kosong untuk producer. Returns `(write, next)` kalau tidak penuh.
    #[inline(always)]
    fn claim_write(&self) -> Option<(usize, usize)> {
        let write = self.write.value.load(Ordering::Relaxed);
        let next = Self::advance(write);

        // Acquire: lihat slot yang sudah dibebaskan consumer
        if next == self.read.value.load(Ordering::Acquire) {
            return None;
        }

        Some((write, next))
    }

    /// # Safety
    /// `(write, next)` harus berasal dari `claim_write` oleh producer yang sama.
    #[inline(always)]
    unsafe fn commit_write(&self, write: usize, next: usize, value: T) {
        // SAFETY: slot `write` berada di luar [read, write), jadi empty
        self.slots[write].write(value);

        // Release: elemen sudah terkonstruksi sebelum `write` baru terlihat
        self.write.value.store(next, Ordering::Release);
    }

    /// Salin isi `source` ke queue ini, yang harus kosong dengan cursor 0.
    fn copy_from(&mut self, source: &Self)
    where
        T: Clone,
    {
        let read = source.read.value.load(Ordering::Acquire);
        let write = source.write.value.load(Ordering::Acquire);

        // `write` hanya maju setelah slot selesai di-clone, supaya queue tetap
        // valid untuk di-drop kalau `T::clone` panic di tengah jalan.
        self.read.value.store(read, Ordering::Relaxed);
        self.write.value.store(read, Ordering::Relaxed);

        let mut index = read;
        while index != write {
            // SAFETY: `index` berada di [read, write) milik source
            let value = unsafe { source.slots[index].cloned() };
            // SAFETY: cursor queue ini [read, index) belum mencakup slot ini
            unsafe { self.slots[index].write(value) };
            index = Self::advance(index);
            self.write.value.store(index, Ordering::Relaxed);
        }

        self.read.value.store(read, Ordering::Release);
        self.write.value.store(write, Ordering::Release);
    }

    /// `(index + 1) mod N` tanpa operasi modulo.
    #[inline(always)]
    const fn advance(index: usize) -> usize {
        let next = index + 1;
        if next == N {
            0
        } else {
            next
        }
    }
}

impl<T: Clone, const N: usize> Clone for CircularQueue<T, N> {
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        copy.copy_from(self);
        copy
    }

    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.copy_from(source);
    }
}

impl<T, const N: usize> Drop for CircularQueue<T, N> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, const N: usize> fmt::Debug for CircularQueue<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircularQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_basic_enqueue_dequeue() {
        let mut queue: CircularQueue<i32, 5> = CircularQueue::new();

        assert!(queue.is_empty());
        assert!(queue.enqueue(&1));
        assert!(queue.enqueue(&2));
        assert!(queue.enqueue(&3));
        assert_eq!(queue.len(), 3);

        let mut value = 0;
        assert!(queue.dequeue(&mut value) && value == 1);
        assert!(queue.dequeue(&mut value) && value == 2);
        assert!(queue.dequeue(&mut value) && value == 3);

        // Queue kosong, `value` tidak berubah
        assert!(!queue.dequeue(&mut value));
        assert_eq!(value, 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue() {
        let mut queue: CircularQueue<u64, 4> = CircularQueue::new();
        assert_eq!(CircularQueue::<u64, 4>::SLOTS, queue.capacity() + 1);

        assert!(queue.enqueue(&1));
        assert!(queue.enqueue(&2));
        assert!(queue.enqueue(&3));

        assert!(queue.is_full());
        assert_eq!(queue.len(), queue.capacity());
        assert!(!queue.enqueue(&4)); // Should fail - one slot is reserved

        assert_eq!(queue.try_dequeue(), Some(1));
        assert!(queue.enqueue(&4)); // Now should succeed
        assert!(queue.is_full());
    }

    #[test]
    fn test_try_enqueue_returns_value() {
        let mut queue: CircularQueue<String, 2> = CircularQueue::new();

        assert!(queue.try_enqueue("a".to_string()).is_ok());
        let rejected = queue.try_enqueue("b".to_string()).unwrap_err();
        assert_eq!(rejected.into_inner(), "b");
        assert_eq!(Full(0u8).to_string(), "queue is full");
    }

    #[test]
    fn test_wraparound() {
        let mut queue: CircularQueue<u64, 4> = CircularQueue::new();

        // Fill and drain multiple times to test wraparound
        for round in 0..10 {
            for i in 0..3 {
                assert!(queue.enqueue(&(round * 3 + i)));
            }
            for i in 0..3 {
                assert_eq!(queue.try_dequeue(), Some(round * 3 + i));
            }
        }
    }

    #[test]
    fn test_len_across_wrap() {
        let mut queue: CircularQueue<u8, 4> = CircularQueue::new();

        for i in 0..3 {
            assert!(queue.enqueue(&i));
        }
        assert_eq!(queue.try_dequeue(), Some(0));
        assert_eq!(queue.try_dequeue(), Some(1));
        // write sudah wrap ke depan read
        assert!(queue.enqueue(&3));
        assert!(queue.enqueue(&4));
        assert_eq!(queue.len(), 3);
        assert!(queue.is_full());
    }

    #[test]
    fn test_single_slot_is_always_full() {
        let mut queue: CircularQueue<u8, 1> = CircularQueue::new();

        assert_eq!(CircularQueue::<u8, 1>::SLOTS, 1);
        assert_eq!(queue.capacity(), 0);
        assert!(queue.is_empty());
        assert!(queue.is_full());
        assert!(!queue.enqueue(&1));
        assert_eq!(queue.try_dequeue(), None);
    }

    #[test]
    fn test_clear_resets_cursors() {
        let mut queue: CircularQueue<String, 4> = CircularQueue::new();

        assert!(queue.enqueue(&"x".to_string()));
        assert!(queue.enqueue(&"y".to_string()));
        assert_eq!(queue.try_dequeue().as_deref(), Some("x"));

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.read.value.load(Ordering::Relaxed), 0);
        assert_eq!(queue.write.value.load(Ordering::Relaxed), 0);

        for i in 0..3 {
            assert!(queue.enqueue(&i.to_string()));
        }
        assert!(!queue.enqueue(&"overflow".to_string()));
    }

    #[test]
    fn test_clone_preserves_cursor_positions() {
        let mut queue: CircularQueue<u32, 4> = CircularQueue::new();

        assert!(queue.enqueue(&10));
        assert!(queue.enqueue(&20));
        assert_eq!(queue.try_dequeue(), Some(10));
        assert!(queue.enqueue(&30));

        let mut copy = queue.clone();
        assert_eq!(
            copy.read.value.load(Ordering::Relaxed),
            queue.read.value.load(Ordering::Relaxed)
        );
        assert_eq!(
            copy.write.value.load(Ordering::Relaxed),
            queue.write.value.load(Ordering::Relaxed)
        );
        assert_eq!(copy.try_dequeue(), Some(20));
        assert_eq!(copy.try_dequeue(), Some(30));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_clone_from_replaces_contents() {
        let mut source: CircularQueue<String, 8> = CircularQueue::new();
        let mut target: CircularQueue<String, 8> = CircularQueue::new();

        assert!(source.enqueue(&"new".to_string()));
        assert!(target.enqueue(&"old-1".to_string()));
        assert!(target.enqueue(&"old-2".to_string()));

        target.clone_from(&source);
        assert_eq!(target.len(), 1);
        assert_eq!(target.try_dequeue().as_deref(), Some("new"));
        assert_eq!(source.try_dequeue().as_deref(), Some("new"));
    }

    #[test]
    fn test_debug_output() {
        let mut queue: CircularQueue<u8, 8> = CircularQueue::new();
        assert!(queue.enqueue(&1));
        assert_eq!(
            format!("{:?}", queue),
            "CircularQueue { len: 1, capacity: 7 }"
        );
    }

    fn assert_send<S: Send>() {}
    fn assert_sync<S: Sync>() {}

    #[test]
    fn test_send_sync_bounds() {
        // Send-only element: queue tetap Send, tapi tidak Sync (cek compile_fail di doc)
        assert_send::<CircularQueue<std::cell::Cell<u64>, 4>>();
        assert_send::<CircularQueue<u64, 4>>();
        assert_sync::<CircularQueue<u64, 4>>();
        assert_sync::<CircularQueue<String, 4>>();
    }

    /// Elemen Sync yang menghitung berapa kali di-clone.
    struct CloneCounter {
        clones: std::sync::Arc<std::sync::atomic::AtomicU64>,
    }

    impl Clone for CloneCounter {
        fn clone(&self) -> Self {
            self.clones
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            Self {
                clones: std::sync::Arc::clone(&self.clones),
            }
        }
    }

    #[test]
    fn test_concurrent_clone_of_shared_queue() {
        const THREADS: u64 = 4;
        const ROUNDS: u64 = 10_000;

        let clones = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
        let mut queue: CircularQueue<CloneCounter, 4> = CircularQueue::new();
        assert!(queue
            .try_enqueue(CloneCounter {
                clones: std::sync::Arc::clone(&clones),
            })
            .is_ok());

        let shared = &queue;
        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(move || {
                    for _ in 0..ROUNDS {
                        let copy = shared.clone();
                        assert_eq!(copy.len(), 1);
                    }
                });
            }
        });

        assert_eq!(
            clones.load(std::sync::atomic::Ordering::Relaxed),
            THREADS * ROUNDS
        );
    }
}
