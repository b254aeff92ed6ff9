use acquisition::{AcquisitionController, SimulatedSource};
use common::config::{load_config, LoggerConfig};
use common::{ExportRecord, MotionSample, TimingAudit};
use criterion::{black_box, Criterion};
use std::env;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn print_audit(audit: &TimingAudit, name: &str) {
    println!("\n=== {} Timing Audit ===", name);
    println!("Samples: {}", audit.sample_count);
    println!("Nominal period: {:.3} ms", audit.nominal_period_ms);
    println!(
        "Duration: reconstructed={:.3}s, raw={:.3}s, drift={:+.4}s",
        audit.reconstructed_duration_s, audit.raw_duration_s, audit.drift_s
    );
    println!(
        "Interval (ms): avg={:.3}, min={:.0}, max={:.0}, std={:.3}",
        audit.mean_interval_ms, audit.min_interval_ms, audit.max_interval_ms, audit.interval_std_ms
    );
    println!(
        "Gaps over 1.5 periods: {} ({:.2}%)",
        audit.gap_count,
        audit.gap_count as f64 / audit.sample_count.max(1) as f64 * 100.0
    );
}

/// Synthetic session with a few milliseconds of scheduler jitter.
fn synthetic_session(seconds: usize, rate_hz: f64) -> Vec<MotionSample> {
    let count = (seconds as f64 * rate_hz) as usize;
    let period_ms = 1000.0 / rate_hz;
    (0..count)
        .map(|i| {
            let jitter = (i * 7 % 5) as f64 - 2.0;
            let t = 1_700_000_000_000.0 + i as f64 * period_ms + jitter;
            let phase = i as f64 / rate_hz * std::f64::consts::TAU * 1.8;
            MotionSample::new(t as u64, 0.75 * phase.sin(), 2.5 * (2.0 * phase).sin(), 1.25 * phase.cos())
        })
        .collect()
}

fn benchmark_export(c: &mut Criterion, config: &LoggerConfig) {
    let rate = config.nominal_rate_hz;
    let session = synthetic_session(60, rate);

    c.bench_function("export_record_60s", |b| {
        b.iter(|| {
            let record = ExportRecord::from_session(black_box(&session), rate).ok();
            black_box(record);
        });
    });

    let record = match ExportRecord::from_session(&session, rate) {
        Ok(record) => record,
        Err(e) => {
            eprintln!("Cannot build benchmark record: {}", e);
            return;
        }
    };
    c.bench_function("write_csv_60s", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(512 * 1024);
            let _ = record.write_csv(&mut out);
            black_box(out);
        });
    });

    c.bench_function("timing_audit_60s", |b| {
        b.iter(|| black_box(TimingAudit::from_session(black_box(&session), rate).ok()));
    });
}

fn record_session(config: &LoggerConfig, duration: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let mut controller = AcquisitionController::new(config.clone())?;
    let (events, source) = SimulatedSource::default().spawn(config.source_queue_capacity);
    controller.connect_source(events)?;

    println!(
        "Recording for {:.1} seconds (sampling every {:.3} ms)...",
        duration.as_secs_f64(),
        controller.sampling_period().as_secs_f64() * 1000.0
    );
    let start = std::time::Instant::now();
    controller.begin_session()?;
    rt.block_on(tokio::time::sleep(duration));
    controller.end_session();
    let elapsed = start.elapsed();
    source.abort();

    println!(
        "Recorded {} samples in {:.2} s (expected about {:.0})",
        controller.sample_count(),
        elapsed.as_secs_f64(),
        elapsed.as_secs_f64() * config.nominal_rate_hz
    );

    let audit = controller.timing_audit()?;
    print_audit(&audit, "SIMULATED");

    let diag = controller.diagnostics();
    println!(
        "Source events: {} ({} empty), stale samples: {}",
        diag.source_events, diag.empty_events, diag.stale_samples
    );

    let record = controller.export_record()?;
    println!(
        "Export: {} rows, reconstructed at {} Hz",
        record.len(),
        record.nominal_rate_hz()
    );
    let path = controller.export_csv(&config.metadata())?;
    println!("Session saved to {}", path.display());
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: timing_report <config_file> [duration_secs] [--criterion]");
        eprintln!("Example: timing_report configs/motion_logger.toml 10");
        eprintln!("Example: timing_report configs/motion_logger.toml --criterion");
        std::process::exit(1);
    }

    let config_path = &args[1];
    let duration_secs = args
        .iter()
        .skip(2)
        .find_map(|a| a.parse::<f64>().ok())
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(5.0);
    let use_criterion = args.iter().any(|a| a == "--criterion");

    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    // Logging would skew the benchmark timings.
    if use_criterion {
        config.enable_logging = false;
    }
    if config.enable_logging {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }

    println!("========================================");
    println!("Motion Logger Timing Report");
    println!("========================================");
    println!("Config: {}", config_path);
    println!("Session: {}", config.session_name);
    println!("Nominal rate: {} Hz", config.nominal_rate_hz);
    println!("Output dir: {}", config.output_dir.display());
    println!("========================================\n");

    if use_criterion {
        let mut criterion = Criterion::default()
            .sample_size(20)
            .measurement_time(Duration::from_secs(10));
        benchmark_export(&mut criterion, &config);
        println!("\nCheck the target/criterion directory for detailed HTML reports.");
        return;
    }

    if let Err(e) = record_session(&config, Duration::from_secs_f64(duration_secs)) {
        eprintln!("Timing report failed: {}", e);
        std::process::exit(1);
    }
}
