use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use libevio_scan::address::AddressTranslator;
use libevio_scan::config::Config;
use libevio_scan::constants::{DEFAULT_REGION_SIZE_BYTES, FIRST_DATA_COLUMN, LAST_DATA_COLUMN};
use libevio_scan::error::ProcessorError;
use libevio_scan::mapped_region::{MappedRegionSet, WordOrder};
use libevio_scan::process::{create_subsets, process_subset};
use libevio_scan::scan_status::ScanStatus;

/// Deeply nested events are walked recursively
const WORKER_STACK_BYTES: usize = 64 * 1024 * 1024;

/// A scanning thread and what the terminal shows of it
struct Worker {
    handle: JoinHandle<Result<usize, ProcessorError>>,
    status: Arc<ScanStatus>,
    pb: ProgressBar,
    n_files: usize,
}

/// Print to the terminal (above any progress bars) and to the log
fn report(pb_manager: &MultiProgress, message: &str) {
    spdlog::info!("{message}");
    if pb_manager.println(message).is_err() {
        println!("{message}");
    }
}

fn make_template_config(path: &Path) {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config).expect("Could not serialize template config!");
    std::fs::write(path, yaml_str).expect("Failed to write yaml data to file!");
}

fn setup_logging() {
    // Setup logging to a file
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from("./evio_scan.log"))
            .formatter(Box::new(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
                ),
            )))
            .truncate(true)
            .build()
            .expect("Could not create log file!"),
    );
    let logger = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()
            .expect("Could not create logger!"),
    );
    spdlog::set_default_logger(logger);
}

/// Print the coordinate of a word and the whole row it is displayed in
fn locate(matches: &ArgMatches, pb_manager: &MultiProgress) {
    let file_path = PathBuf::from(matches.get_one::<String>("file").expect("We require a file"));
    let word_index = *matches.get_one::<u64>("word").expect("We require a word");
    let order = if matches.get_flag("little-endian") {
        WordOrder::Little
    } else {
        WordOrder::Big
    };
    let region_size = *matches
        .get_one::<usize>("region-size")
        .unwrap_or(&DEFAULT_REGION_SIZE_BYTES);

    let regions = match MappedRegionSet::open_with_region_size(&file_path, order, region_size) {
        Ok(r) => r,
        Err(e) => {
            spdlog::error!("{e}");
            report(pb_manager, &format!("Could not open file: {e}"));
            return;
        }
    };
    let translator = AddressTranslator::for_regions(&regions);
    let Some(address) = translator.to_coordinate(word_index) else {
        report(
            pb_manager,
            &format!(
                "Word {word_index} is past the end of the file ({} words)",
                regions.word_count()
            ),
        );
        return;
    };
    report(pb_manager, &format!("Word {word_index} is at {address}"));

    let row: Vec<String> = (FIRST_DATA_COLUMN..=LAST_DATA_COLUMN)
        .map(|column| {
            let cell = libevio_scan::address::WordAddress { column, ..address };
            match translator.to_word_index(&cell) {
                Some(_) => format!("{:#010x}", translator.word_at(&regions, &cell)),
                None => String::from("----------"),
            }
        })
        .collect();
    report(pb_manager, &format!("Row {}: {}", address.row, row.join(" ")));
}

fn main() {
    // Create a cli
    let matches = Command::new("evio_scan_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("locate")
                .about("Print the region, row and column of a word")
                .arg(Arg::new("file").required(true).help("Path to the EVIO file"))
                .arg(
                    Arg::new("word")
                        .short('w')
                        .long("word")
                        .required(true)
                        .value_parser(value_parser!(u64))
                        .help("Index of the 32-bit word"),
                )
                .arg(
                    Arg::new("little-endian")
                        .short('l')
                        .long("little-endian")
                        .action(ArgAction::SetTrue)
                        .help("Read the file as little endian"),
                )
                .arg(
                    Arg::new("region-size")
                        .long("region-size")
                        .value_parser(value_parser!(usize))
                        .help("Size of a mapped region in bytes"),
                ),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the configuration file"),
        )
        .get_matches();

    setup_logging();
    spdlog::info!("Starting EVIO scan");
    let pb_manager = MultiProgress::new();

    if let Some(("locate", sub_matches)) = matches.subcommand() {
        locate(sub_matches, &pb_manager);
        return;
    }

    // Parse the cli
    let Some(config_path) = matches.get_one::<String>("path").map(PathBuf::from) else {
        report(&pb_manager, "A configuration path is required (-p)");
        return;
    };

    if let Some(("new", _)) = matches.subcommand() {
        report(
            &pb_manager,
            &format!(
                "Making a template config at {}...",
                config_path.to_string_lossy()
            ),
        );
        make_template_config(&config_path);
        report(&pb_manager, "Done.");
        return;
    }

    // Load our config
    report(
        &pb_manager,
        &format!("Loading config from {}...", config_path.to_string_lossy()),
    );
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            spdlog::error!("{e}");
            report(&pb_manager, &format!("Could not load config: {e}"));
            return;
        }
    };
    if !config.is_n_threads_valid() {
        report(&pb_manager, "n_threads must be at least 1");
        return;
    }
    spdlog::info!("Config successfully loaded.");
    spdlog::info!("Files: {}", config.files.len());
    spdlog::info!("Byte order: {}", config.byte_order);
    spdlog::info!(
        "Region size: {}",
        human_bytes::human_bytes(config.region_size_bytes as f64)
    );
    if let Some(report_path) = &config.report_path {
        spdlog::info!("Report Path: {}", report_path.to_string_lossy());
    }

    // Spawn the workers, one progress bar each
    let style =
        ProgressStyle::with_template("[worker {prefix}] {bar:40.cyan/blue} {pos:>3}% {msg}")
            .expect("Progress bar template is valid");
    let mut workers: Vec<Worker> = vec![];
    for (idx, subset) in create_subsets(&config).into_iter().enumerate() {
        // Dont make empty workers
        if subset.is_empty() {
            continue;
        }
        let n_files = subset.len();
        let status = Arc::new(ScanStatus::new(idx));
        let pb = pb_manager.add(ProgressBar::new(100));
        pb.set_style(style.clone());
        pb.set_prefix(format!("{idx}"));
        let conf = config.clone();
        let sent_status = status.clone();
        let handle = std::thread::Builder::new()
            .name(format!("worker_{idx}"))
            .stack_size(WORKER_STACK_BYTES)
            .spawn(move || process_subset(conf, sent_status, subset))
            .expect("Could not spawn a worker thread!");
        workers.push(Worker {
            handle,
            status,
            pb,
            n_files,
        });
    }

    let mut n_faulty = 0;
    while !workers.is_empty() {
        // No UI here, so sleep for a bit before trying to update
        std::thread::sleep(std::time::Duration::from_millis(500));
        let mut still_running = vec![];
        for worker in workers {
            worker.pb.set_position(worker.status.progress() as u64);
            worker.pb.set_message(format!(
                "{}/{} files",
                worker.status.files_done(),
                worker.n_files
            ));
            if !worker.handle.is_finished() {
                still_running.push(worker);
                continue;
            }
            let Worker {
                handle, status, pb, ..
            } = worker;
            match handle.join() {
                Ok(Ok(n)) => n_faulty += n,
                Ok(Err(e)) => {
                    spdlog::error!("Scanning failed with error: {e}");
                    report(&pb_manager, &format!("Worker {} failed: {e}", status.worker_id()));
                }
                Err(_) => spdlog::error!("Failed to join a scanning worker!"),
            }
            pb.finish();
        }
        workers = still_running;
    }

    report(
        &pb_manager,
        &format!(
            "Done. {n_faulty} of {} files have faults, see evio_scan.log for details.",
            config.files.len()
        ),
    );
}
