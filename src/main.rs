use std::fs::File;
use std::io::{self, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::unbounded;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dropmon::config::Config;
use dropmon::monitor::Monitor;
use dropmon::{source, AgentClient, EndpointCache, PacketDissector, Renderer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || running_clone.store(false, Ordering::SeqCst))?;

    let client = AgentClient::new(&config.host)?;
    let cache = Arc::new(EndpointCache::new(client));
    let renderer = Renderer::new(cache, PacketDissector, config.dissect);
    let mut monitor = Monitor::new(renderer, config.verbose);
    info!(host = %config.host, verbose = config.verbose, "listening for drop notifications");

    let (tx, rx) = unbounded();
    let input = config.input.clone();
    let reader_thread = thread::spawn(move || {
        let result = match input {
            Some(path) => File::open(&path).and_then(|f| source::start_reading(BufReader::new(f), tx)),
            None => source::start_reading(io::stdin().lock(), tx),
        };
        if let Err(e) = result {
            error!("Event source error: {}", e);
        }
    });

    monitor.run(rx, running.clone(), &mut io::stdout())?;
    monitor.stats().log_summary();

    // On Ctrl-C the reader may still be blocked on input; leave it behind.
    if running.load(Ordering::SeqCst) && reader_thread.join().is_err() {
        error!("event reader thread panicked");
    }
    Ok(())
}
