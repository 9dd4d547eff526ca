//! Tandem Bench - latency dan throughput CircularQueue
//!
//! Usage:
//!   cargo run --release --bin tandem_bench -- [OPTIONS]
//!
//! Options:
//!   -n, --iterations <N>     Jumlah operasi per benchmark (default: 1000000)
//!       --producer-cpu <ID>  Pin producer thread ke CPU (Linux)
//!       --consumer-cpu <ID>  Pin consumer thread ke CPU (Linux)
//!   -v, --verbose            Tampilkan detail per run

use std::thread;
use std::time::{Duration, Instant};

use tandem::CircularQueue;

const SLOTS: usize = 4096;

type Payload = u64;

type BenchQueue = CircularQueue<Payload, SLOTS>;

/// Benchmark configuration
struct BenchConfig {
    iterations: usize,
    producer_cpu: Option<usize>,
    consumer_cpu: Option<usize>,
    verbose: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 1_000_000,
            producer_cpu: None,
            consumer_cpu: None,
            verbose: false,
        }
    }
}

fn parse_args() -> BenchConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = BenchConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--iterations" | "-n" => {
                if i + 1 < args.len() {
                    config.iterations = args[i + 1].parse().unwrap_or(1_000_000);
                    i += 1;
                }
            }
            "--producer-cpu" => {
                if i + 1 < args.len() {
                    config.producer_cpu = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--consumer-cpu" => {
                if i + 1 < args.len() {
                    config.consumer_cpu = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--help" | "-h" => {
                println!("Tandem Bench - Bounded Lock-Free SPSC Queue\n");
                println!("Usage: tandem_bench [OPTIONS]\n");
                println!("Options:");
                println!("  -n, --iterations <N>     Operations per benchmark (default: 1000000)");
                println!("      --producer-cpu <ID>  Pin producer thread to CPU (Linux only)");
                println!("      --consumer-cpu <ID>  Pin consumer thread to CPU (Linux only)");
                println!("  -v, --verbose            Verbose output");
                println!("  -h, --help               Show this help");
                std::process::exit(0);
            }
            other => {
                eprintln!("⚠️  Unknown option: {}", other);
            }
        }
        i += 1;
    }

    config
}

/// Pin thread saat ini ke satu CPU. Returns `false` jika gagal atau tidak didukung.
#[cfg(target_os = "linux")]
fn pin_to_cpu(cpu: usize) -> bool {
    // SAFETY: cpu_set_t adalah plain data; zeroed adalah set kosong yang valid
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) == 0
    }
}

#[cfg(not(target_os = "linux"))]
fn pin_to_cpu(_cpu: usize) -> bool {
    false
}

fn apply_affinity(role: &str, cpu: Option<usize>, verbose: bool) {
    if let Some(id) = cpu {
        let pinned = pin_to_cpu(id);
        if verbose || !pinned {
            println!(
                "   {} -> CPU {} ({})",
                role,
                id,
                if pinned { "pinned" } else { "pin failed" }
            );
        }
    }
}

/// Operasi per detik; 0 kalau tidak ada operasi atau durasi nol.
fn ops_per_sec(ops: usize, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64();
    if ops == 0 || secs == 0.0 {
        0.0
    } else {
        ops as f64 / secs
    }
}

fn report_latency(label: &str, iterations: usize, duration: Duration) {
    if iterations == 0 {
        println!("  {} latency: n/a (0 operations)", label);
        return;
    }
    let ns = duration.as_nanos() as f64 / iterations as f64;
    println!("  {} latency: {:.2} ns/op ({:.3} μs/op)", label, ns, ns / 1000.0);
}

fn benchmark_single_thread(config: &BenchConfig) {
    println!("📊 Single-Thread Benchmark (enqueue/dequeue)");
    println!("--------------------------------------------");

    let iterations = config.iterations;
    let mut queue: Box<BenchQueue> = Box::default();

    // Warm up
    for i in 0..1000 {
        queue.enqueue(&i);
    }
    queue.clear();

    // Benchmark enqueue
    let start = Instant::now();
    for i in 0..iterations {
        while !queue.enqueue(&(i as Payload)) {
            queue.try_dequeue();
        }
    }
    let enqueue_duration = start.elapsed();

    queue.clear();
    for i in 0..queue.capacity() {
        queue.enqueue(&(i as Payload));
    }

    // Benchmark dequeue (refill setiap kali kosong, refill tidak dihitung)
    let mut out: Payload = 0;
    let mut dequeue_duration = Duration::ZERO;
    let mut remaining = iterations;
    while remaining > 0 {
        let batch = remaining.min(queue.len());
        let start = Instant::now();
        for _ in 0..batch {
            queue.dequeue(&mut out);
        }
        dequeue_duration += start.elapsed();
        remaining -= batch;

        for i in 0..queue.capacity() {
            queue.enqueue(&(i as Payload));
        }
    }

    println!("  Operations: {}", iterations);
    report_latency("Enqueue", iterations, enqueue_duration);
    report_latency("Dequeue", iterations, dequeue_duration);
    println!(
        "  Enqueue throughput: {:.2} M ops/sec\n",
        ops_per_sec(iterations, enqueue_duration) / 1_000_000.0
    );
}

/// Hasil transfer dua thread
struct TransferStats {
    received: usize,
    out_of_order: usize,
    producer_full_spins: u64,
    consumer_empty_spins: u64,
    duration: Duration,
}

fn run_transfer(config: &BenchConfig) -> TransferStats {
    let iterations = config.iterations;
    let mut queue: Box<BenchQueue> = Box::default();
    let (mut producer, mut consumer) = queue.split();

    let start = Instant::now();
    let (producer_full_spins, (received, out_of_order, consumer_empty_spins)) =
        thread::scope(|s| {
            let producer_cpu = config.producer_cpu;
            let consumer_cpu = config.consumer_cpu;
            let verbose = config.verbose;

            let producer_thread = s.spawn(move || {
                apply_affinity("Producer", producer_cpu, verbose);
                let mut full_spins = 0u64;
                for i in 0..iterations as Payload {
                    let mut value = i;
                    loop {
                        match producer.try_enqueue(value) {
                            Ok(()) => break,
                            Err(full) => {
                                value = full.into_inner();
                                full_spins += 1;
                                std::hint::spin_loop();
                            }
                        }
                    }
                }
                full_spins
            });

            let consumer_thread = s.spawn(move || {
                apply_affinity("Consumer", consumer_cpu, verbose);
                let mut empty_spins = 0u64;
                let mut out_of_order = 0usize;
                let mut value: Payload = 0;
                for expected in 0..iterations as Payload {
                    while !consumer.dequeue(&mut value) {
                        empty_spins += 1;
                        std::hint::spin_loop();
                    }
                    if value != expected {
                        out_of_order += 1;
                    }
                }
                (iterations, out_of_order, empty_spins)
            });

            let full_spins = producer_thread.join().unwrap_or(0);
            let consumer_result = consumer_thread.join().unwrap_or((0, usize::MAX, 0));
            (full_spins, consumer_result)
        });

    TransferStats {
        received,
        out_of_order,
        producer_full_spins,
        consumer_empty_spins,
        duration: start.elapsed(),
    }
}

fn benchmark_two_threads(config: &BenchConfig) -> bool {
    println!("📊 Two-Thread Benchmark (1 producer, 1 consumer)");
    println!("------------------------------------------------");

    let stats = run_transfer(config);
    let secs = stats.duration.as_secs_f64();

    println!(
        "  Slots:        {} (capacity {})",
        BenchQueue::SLOTS,
        BenchQueue::SLOTS - 1
    );
    println!("  Transferred:  {}", stats.received);
    println!("  Duration:     {:.2}ms", secs * 1000.0);
    println!(
        "  Throughput:   {:.2} M msgs/sec",
        ops_per_sec(stats.received, stats.duration) / 1_000_000.0
    );
    if config.verbose {
        println!("  Full spins:   {}", stats.producer_full_spins);
        println!("  Empty spins:  {}", stats.consumer_empty_spins);
    }

    if stats.out_of_order == 0 && stats.received == config.iterations {
        println!("  Ordering:     ✅ every value exactly once, in order\n");
        true
    } else {
        println!("  Ordering:     ❌ {} values out of order\n", stats.out_of_order);
        false
    }
}

fn main() {
    let config = parse_args();

    println!("🚀 Tandem - Bounded Lock-Free SPSC Queue");
    println!("========================================\n");

    benchmark_single_thread(&config);
    let ordered = benchmark_two_threads(&config);

    if !ordered {
        eprintln!("❌ Transfer verification failed");
        std::process::exit(1);
    }

    println!("✅ All benchmarks complete!");
}
