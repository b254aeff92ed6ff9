mod menu;

use std::env;

use acquisition::{AcquisitionController, SimulatedSource};
use common::config::load_config;
use common::{LoggerConfig, SessionMetadata};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "configs/motion_logger.toml";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Could not load {}: {} (using defaults)", config_path, e);
            LoggerConfig::default()
        }
    };
    init_logging(&config);
    tracing::info!(config = %config_path, rate_hz = config.nominal_rate_hz, "motion logger starting");

    println!("===========================================");
    println!("Motion Logger ({} Hz fixed-rate recording)", config.nominal_rate_hz);
    println!("===========================================");

    // Worker threads keep the sampler running while the menu waits on stdin.
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let mut metadata = config.metadata();
    let mut controller = AcquisitionController::new(config)?;
    let mut source: Option<JoinHandle<()>> = None;

    loop {
        menu::show_status(
            &controller.display_frame(),
            controller.permission(),
            &metadata.subject_id,
            &metadata.condition,
        );
        menu::show_menu();

        match menu::get_user_choice() {
            Ok(1) => connect_simulated(&mut controller, &mut source),
            Ok(2) => match controller.begin_session() {
                Ok(()) => println!("Recording..."),
                Err(e) => println!("Could not start recording: {}", e),
            },
            Ok(3) => {
                controller.end_session();
                println!(
                    "Stopped: {} samples ({:.2} s)",
                    controller.sample_count(),
                    controller.elapsed_secs()
                );
            }
            Ok(4) => match controller.export_csv(&metadata) {
                Ok(path) => println!("Saved {}", path.display()),
                Err(e) => println!("Export failed: {}", e),
            },
            Ok(5) => {
                if controller.is_recording() {
                    println!("Stop the recording before clearing it.");
                } else {
                    controller.discard_session();
                    println!("Buffer cleared.");
                }
            }
            Ok(6) => {
                if controller.is_recording() {
                    println!("Metadata is locked while recording.");
                } else {
                    metadata = edit_metadata(&metadata);
                }
            }
            Ok(7) => print_audit(&controller),
            Ok(menu::EXIT_CHOICE) => {
                controller.end_session();
                println!("Goodbye!");
                break;
            }
            _ => println!("Invalid choice. Please select 1-8."),
        }
    }

    if let Some(handle) = source {
        handle.abort();
    }
    Ok(())
}

fn init_logging(config: &LoggerConfig) {
    if !config.enable_logging {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn connect_simulated(controller: &mut AcquisitionController, source: &mut Option<JoinHandle<()>>) {
    if let Some(previous) = source.take() {
        previous.abort();
    }
    let (events, handle) = SimulatedSource::default().spawn(controller.config().source_queue_capacity);
    match controller.connect_source(events) {
        Ok(()) => {
            *source = Some(handle);
            println!("Simulated source connected.");
        }
        Err(e) => {
            handle.abort();
            println!("Could not connect source: {}", e);
        }
    }
}

fn edit_metadata(current: &SessionMetadata) -> SessionMetadata {
    let candidate = SessionMetadata::new(
        &menu::prompt("Subject ID", &current.subject_id),
        &menu::prompt("Condition", &current.condition),
    );
    match candidate.validate() {
        Ok(()) => candidate,
        Err(e) => {
            println!("{} (keeping previous values)", e);
            current.clone()
        }
    }
}

fn print_audit(controller: &AcquisitionController) {
    match controller.timing_audit() {
        Ok(audit) => {
            println!("\n=== Timing Audit ===");
            println!("Samples: {}", audit.sample_count);
            println!(
                "Duration: {:.3} s reconstructed, {:.3} s raw (drift {:+.3} s)",
                audit.reconstructed_duration_s, audit.raw_duration_s, audit.drift_s
            );
            println!(
                "Interval (ms): nominal {:.2}, mean {:.2}, min {:.0}, max {:.0}, std {:.2}",
                audit.nominal_period_ms,
                audit.mean_interval_ms,
                audit.min_interval_ms,
                audit.max_interval_ms,
                audit.interval_std_ms
            );
            println!("Gaps over 1.5 periods: {}", audit.gap_count);
            let diag = controller.diagnostics();
            println!(
                "Source events: {} ({} empty), stale samples: {}",
                diag.source_events, diag.empty_events, diag.stale_samples
            );
        }
        Err(e) => println!("No audit available: {}", e),
    }
}
