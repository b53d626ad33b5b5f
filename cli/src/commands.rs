use crate::CliContext;
use std::io::Write;
use std::time::Duration;
use tally_core::context::{AppConfigExt, Flag};
use tally_core::sink::fit;
use tally_core::{Notification, Row, RowEvent};
use tally_types::{Column, SinkSettings};

const PRINT_WIDTH: usize = 10;

pub async fn reset(ctx: &CliContext) -> Result<(), String> {
    ctx.tracker.reset_tracking().await
}

pub async fn clear(ctx: &CliContext) -> Result<(), String> {
    ctx.tracker.clear_table().await
}

pub async fn set_identity(name: Option<String>, ctx: &CliContext) -> Result<(), String> {
    match &name {
        Some(name) => println!("Tracking {name}"),
        None => println!("Tracking the next live damage source"),
    }
    ctx.config.write().await.tracked_identity = name.clone();
    ctx.tracker.set_identity(name).await
}

pub async fn toggle(flag: Flag, value: bool, ctx: &CliContext) {
    ctx.tracker.set_flag(flag, value);
    ctx.config.write().await.tracking.set(flag, value);
    println!("{flag:?}: {}", if value { "on" } else { "off" });
}

pub async fn reload(ctx: &CliContext) -> Result<(), String> {
    ctx.tracker.reload_log().await
}

pub async fn show_stats(ctx: &CliContext) -> Result<(), String> {
    ctx.tracker.request_diagnostics().await
}

pub async fn set_sink_enabled(enabled: bool, ctx: &CliContext) -> Result<(), String> {
    ctx.config.write().await.sink.enabled = enabled;
    ctx.tracker.set_sink_enabled(enabled)
}

/// Apply `edit` to the stored sink settings and push the result to the sink.
pub async fn update_sink(
    ctx: &CliContext,
    edit: impl FnOnce(&mut SinkSettings),
) -> Result<(), String> {
    let settings = {
        let mut config = ctx.config.write().await;
        edit(&mut config.sink);
        config.sink.clone()
    };
    ctx.tracker.update_sink_settings(settings)
}

pub async fn set_auto_reset(secs: Option<u64>, ctx: &CliContext) -> Result<(), String> {
    ctx.config.write().await.auto_reset_secs = secs;
    ctx.tracker.set_auto_reset(secs.map(Duration::from_secs))
}

pub async fn show_config(ctx: &CliContext) {
    let config = ctx.config.read().await;
    println!("log directory:  {}", config.log_directory);
    println!(
        "identity:       {}",
        config.tracked_identity.as_deref().unwrap_or("(auto)")
    );
    println!("tracking:       {:?}", ctx.tracker.flags());
    println!("sink:           {:?}", config.sink);
    println!("auto reset:     {:?}", config.auto_reset_secs);
}

pub async fn save_config(ctx: &CliContext) -> Result<(), String> {
    ctx.config.read().await.save().map_err(|e| e.to_string())?;
    println!("Configuration saved");
    Ok(())
}

pub fn exit() -> Result<(), String> {
    write!(std::io::stdout(), "quitting...").map_err(|e| e.to_string())?;
    std::io::stdout().flush().map_err(|e| e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────────

fn format_row(row: &Row) -> String {
    Column::ALL
        .iter()
        .map(|c| fit(&row.field(*c), PRINT_WIDTH))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_notification(notification: &Notification) {
    let now = chrono::Local::now().format("%H:%M:%S");
    match notification {
        Notification::Row(RowEvent::Append(row)) => println!("{now} + {}", format_row(row)),
        Notification::Row(RowEvent::ReplaceLast(row)) => println!("{now} ~ {}", format_row(row)),
        Notification::Row(RowEvent::InsertBeforeReset(row)) => {
            println!("{now} ^ {}", format_row(row))
        }
        Notification::Row(RowEvent::Clear) => println!("{now} table cleared"),
        Notification::IdentityDetected(name) => println!("{now} tracking {name}"),
        Notification::LogFileChanged(Some(name)) => println!("{now} reading {name}"),
        Notification::LogFileChanged(None) => println!("{now} no combat log"),
        Notification::StateChanged(state) => println!("{now} tracker {state:?}"),
        Notification::Diagnostics(d) => println!(
            "{now} malformed lines: {}, unrecognized events: {}, dropped corrections: {}",
            d.malformed_lines, d.unrecognized_events, d.stale_corrections
        ),
        Notification::SinkStatus(message) => println!("{now} sink: {message}"),
    }
}
