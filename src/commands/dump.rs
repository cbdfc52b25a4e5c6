//! Recording decoder.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use gesture_transport::RecordReader;

use super::CommandResult;

/// Print every event in a recording
pub fn dump(path: &Path, json: bool) -> CommandResult {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut count = 0usize;
    for (index, event) in RecordReader::new(BufReader::new(file)).enumerate() {
        let event = event.with_context(|| format!("record {index}"))?;
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            let [x, y, z] = event.vector.v;
            println!(
                "{:>6}  {:>14}ns  handle={:<3} ({:+.3}, {:+.3}, {:+.3}) status={}",
                index,
                event.timestamp_ns,
                event.gesture.get(),
                x,
                y,
                z,
                event.vector.status
            );
        }
        count += 1;
    }
    if !json {
        println!("{count} records");
    }
    Ok(())
}
