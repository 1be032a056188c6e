use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::path::PathBuf;
use std::sync::mpsc;

use libmuonic::config::Config;
use libmuonic::process::process;
use libmuonic::worker_status::WorkerStatus;

fn main() {
    // Create a cli
    let matches = Command::new("muonic_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the config file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }

    // Parse the cli
    let Some(config_path) = matches.get_one::<String>("path").map(PathBuf::from) else {
        log::error!("A config path is required");
        return;
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match Config::default().write_config_file(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("{e}"),
        }
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Input Path: {}", config.input_path.to_string_lossy());
    let show = |path: &Option<PathBuf>| {
        path.as_ref()
            .map_or(String::from("None"), |p| p.to_string_lossy().to_string())
    };
    log::info!("Pulse Path: {}", show(&config.pulse_path));
    log::info!("Rate Path: {}", show(&config.rate_path));
    log::info!("Event Path: {}", show(&config.event_path));
    log::info!("Decay Trigger: {}", config.decay_trigger.is_some());
    log::info!("Velocity Trigger: {}", config.velocity_trigger.is_some());

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}") {
        pb.set_style(style);
    }
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    // Spawn the task!
    let handle = std::thread::spawn(move || process(config, tx));

    loop {
        // No UI here, so sleep a bit before trying to update
        std::thread::sleep(std::time::Duration::from_millis(250));
        for status in rx.try_iter() {
            pb.set_position((status.progress * 100.0) as u64);
            pb.set_message(format!("{} ({} lines)", status.stage, status.lines_read));
        }

        if handle.is_finished() {
            match handle.join() {
                Ok(result) => match result {
                    Ok(summary) => log::info!(
                        "Successfully processed {} lines into {} pulse sets!",
                        summary.lines_read,
                        summary.pulse_sets
                    ),
                    Err(e) => log::error!("Processing failed with error: {e}"),
                },
                Err(_) => log::error!("Failed to join processing task!"),
            }
            break;
        }
    }

    pb.finish();

    log::info!("Done.");
}
