//! Catalog listing.

use super::{CommandResult, ModuleSource};

/// Print every gesture the module exposes
pub fn list(source: &ModuleSource, json: bool) -> CommandResult {
    let module = source.open_module()?;
    let gestures = module.get_gestures_list();

    if json {
        println!("{}", serde_json::to_string_pretty(gestures)?);
        return Ok(());
    }

    println!(
        "Module '{}' ({} driver), {} gestures:",
        module.id(),
        module.driver().name(),
        gestures.len()
    );
    println!("  {:>6}  {:<18} {:<14} {:>6}", "HANDLE", "NAME", "TYPE", "SENSOR");
    for g in gestures {
        println!(
            "  {:>6}  {:<18} {:<14} {:>6}",
            g.handle.get(),
            g.name,
            g.gesture_type.label(),
            g.sensor_type.0
        );
    }
    Ok(())
}
