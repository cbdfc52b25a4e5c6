//! Control/data session: activate, poll, print.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use gesture_hal::{DataDevice, PollOutcome};
use gesture_transport::write_record;
use tracing::{debug, info};

use super::{format_event, CommandResult, ModuleSource};

pub struct MonitorOptions {
    /// Handles to activate; empty means every gesture in the catalog
    pub activate: Vec<i32>,
    pub sensitivity: Vec<(i32, i32)>,
    pub count: Option<usize>,
    pub record: Option<PathBuf>,
}

/// Set the flag, then detach the data device. Unlike a wake, the detach
/// sticks: a poll that has not blocked yet returns `Woken` as well.
fn interrupt(stop: &AtomicBool, data: &DataDevice) {
    stop.store(true, Ordering::SeqCst);
    data.data_close();
}

/// Ctrl-C stops the loop
fn setup_interrupt_handler(data: Arc<DataDevice>) -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = Arc::clone(&stop);

    ctrlc::set_handler(move || interrupt(&stop_clone, &data)).ok();

    stop
}

pub fn monitor(source: &ModuleSource, opts: MonitorOptions) -> CommandResult {
    let module = source.open_module()?;
    let control = module.open_control().context("opening control device")?;

    for &(handle, value) in &opts.sensitivity {
        control
            .set_sensitivity(handle, value)
            .with_context(|| format!("setting sensitivity of handle {handle}"))?;
    }
    let handles: Vec<i32> = if opts.activate.is_empty() {
        module.catalog().handles().map(|h| h.as_i32()).collect()
    } else {
        opts.activate.clone()
    };
    for &handle in &handles {
        control
            .activate(handle, true)
            .with_context(|| format!("activating handle {handle}"))?;
    }

    let channel = control.open_data_source()?;
    let data = Arc::new(module.open_data());
    // Attach by token, as a consumer in another context would
    data.data_open_token(channel.token())?;
    info!("Monitoring {} gestures on {}", handles.len(), channel.token());

    let mut recorder = match &opts.record {
        Some(path) => Some(BufWriter::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening {}", path.display()))?,
        )),
        None => None,
    };

    let stop = setup_interrupt_handler(Arc::clone(&data));
    eprintln!("Press Ctrl-C to stop");

    let mut seen = 0usize;
    while !stop.load(Ordering::SeqCst) {
        match data.poll()? {
            PollOutcome::Event(event) => {
                println!("{}", format_event(&module, &event));
                if let Some(out) = recorder.as_mut() {
                    write_record(out, &event)?;
                }
                seen += 1;
                if opts.count.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
            PollOutcome::Woken => debug!("poll woken"),
        }
    }

    if let Some(mut out) = recorder {
        out.flush()?;
    }
    data.data_close();
    control.close();
    eprintln!("{seen} events");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gesture_transport::ChannelOwner;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_interrupt_before_poll_blocks() {
        let owner = ChannelOwner::create(4);
        let data = Arc::new(DataDevice::new());
        data.data_open(&owner.handle()).unwrap();
        let stop = AtomicBool::new(false);

        // Interrupt lands before the loop reaches poll
        interrupt(&stop, &data);
        assert!(stop.load(Ordering::SeqCst));

        let poller = Arc::clone(&data);
        let (tx, done) = mpsc::channel();
        thread::spawn(move || tx.send(poller.poll()).unwrap());
        let outcome = done.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(outcome.unwrap(), PollOutcome::Woken);
        assert!(!owner.handle().is_closed());
    }

    #[test]
    fn test_interrupt_releases_blocked_poll() {
        let owner = ChannelOwner::create(4);
        let data = Arc::new(DataDevice::new());
        data.data_open(&owner.handle()).unwrap();
        let stop = AtomicBool::new(false);

        let poller = Arc::clone(&data);
        let (tx, done) = mpsc::channel();
        thread::spawn(move || tx.send(poller.poll()).unwrap());
        thread::sleep(Duration::from_millis(20));
        interrupt(&stop, &data);

        let outcome = done.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(outcome.unwrap(), PollOutcome::Woken);
    }
}
