//! # Talos Simulation Driver
//!
//! Interactive host-side driver for the Talos kernel: creates the example
//! task set, randomises system load, and forwards console input to the
//! fault injector.
//!
//! Controls (line-buffered): an empty line injects a random fault, `q`
//! quits.

use talos_ai::Xorshift32;
use talos_config::Criticality;
use talos_core::Kernel;
use talos_fault::FaultKind;

use std::io::{self, BufRead};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Main loop interval.
const DRIVER_PERIOD: Duration = Duration::from_millis(100);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Starting Hardware-Accelerated ML RTOS Simulation");
    println!("-----------------------------------------------");
    println!();

    let kernel = Kernel::new();
    create_example_tasks(&kernel);

    if let Err(err) = kernel.start() {
        log::error!("[sim] failed to start kernel: {err:?}");
        std::process::exit(1);
    }

    println!();
    println!("System running... press Enter to inject a fault, q to quit");
    println!();

    let console = spawn_console_reader();
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0x1234_5678);
    let mut rng = Xorshift32::new(seed);

    loop {
        match console.recv_timeout(DRIVER_PERIOD) {
            Ok(line) if line.trim().eq_ignore_ascii_case("q") => break,
            Ok(line) if line.trim().is_empty() => inject_random_fault(&kernel, &mut rng),
            Ok(_) => println!("(Enter injects a fault, q quits)"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        simulate_environment(&kernel, &mut rng);

        if rng.next_below(50) == 0 {
            print_system_state(&kernel);
        }
    }

    kernel.stop();
    print_jitter_statistics(&kernel);
    println!();
    println!("RTOS simulation terminated.");
}

/// The example task set: one task per criticality level.
fn create_example_tasks(kernel: &Kernel) {
    let specs: [(&str, u32, u32, Criticality, fn()); 4] = [
        ("SafetyCritical", 100, 100, Criticality::DalA, || {
            log::debug!("[safety] executing critical operations");
        }),
        ("Control", 200, 180, Criticality::DalB, || {
            log::debug!("[control] executing control operations");
        }),
        ("Monitoring", 500, 450, Criticality::DalC, || {
            log::debug!("[monitor] collecting system data");
        }),
        ("Background", 1000, 900, Criticality::DalD, || {
            log::debug!("[background] performing maintenance");
        }),
    ];

    for (name, period, deadline, criticality, body) in specs {
        kernel
            .add_task(name, std::sync::Arc::new(body), period, deadline, criticality)
            .expect("example task set fits the registry");
    }
}

/// Forward stdin lines over a channel so the main loop never blocks.
fn spawn_console_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("talos-console".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        log::error!("[sim] failed to spawn console reader: {err}");
        std::process::exit(1);
    }
    rx
}

/// Pick a random task and fault class and queue the injection.
fn inject_random_fault(kernel: &Kernel, rng: &mut Xorshift32) {
    let tasks = kernel.tasks();
    if tasks.is_empty() {
        return;
    }

    let task = &tasks[rng.next_below(tasks.len() as u32) as usize];
    let kind = FaultKind::from_raw(1 + rng.next_below(5) as u8).expect("raw kind in 1..=5");
    let address = 0x1000 + rng.next_below(0x1000);

    println!(
        "\nInjecting {:?} fault into task '{}' (address {:#x})...",
        kind, task.name, address
    );
    if let Err(err) = kernel.fault_monitor().inject(kind, task.id, address) {
        log::error!("[sim] injection rejected: {err:?}");
    }
}

/// Randomise load, memory, thermal and power figures the way a busy
/// target would drift.
fn simulate_environment(kernel: &Kernel, rng: &mut Xorshift32) {
    let load = 0.30 + rng.next_below(40) as f32 / 100.0;
    let memory = 0.40 + rng.next_below(30) as f32 / 100.0;
    kernel.update_load(load, memory);

    let temperature = 30.0 + rng.next_below(30) as f32;
    let power = 1.0 + rng.next_below(30) as f32 / 10.0;
    kernel.update_environment(temperature, power);
}

fn print_system_state(kernel: &Kernel) {
    let sys = kernel.system_state();
    println!();
    println!("System State:");
    println!("  CPU Load: {:.2}", sys.cpu_load);
    println!("  Memory Usage: {:.2}", sys.memory_usage);
    println!("  Temperature: {:.1} C", sys.temperature);
    println!("  Power Draw: {:.1} W", sys.power_draw);
    println!("  Active Tasks: {}", sys.active_tasks);
    println!("  System Mode: {}", sys.health.name());
    println!(
        "  Scheduling Jitter: {} ns",
        kernel.scheduler().worst_case_jitter_ns()
    );
}

fn print_jitter_statistics(kernel: &Kernel) {
    println!();
    println!("Performance Statistics:");
    println!(
        "  Worst-case scheduling jitter: {} ns",
        kernel.scheduler().worst_case_jitter_ns()
    );
    println!("  Scheduler ticks: {}", kernel.tick_count());
}
