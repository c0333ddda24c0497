use color_eyre::eyre::Result;
use trickle_core::Session;

use crate::data::SqliteSessionStore;
use crate::monitor::{format_elapsed, short_id};

pub fn run(limit: usize, json: bool, clear: bool) -> Result<()> {
    let store = match SqliteSessionStore::open() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open session database: {}", e);
            std::process::exit(1);
        }
    };

    if clear {
        let removed = store.delete_all()?;
        println!("Deleted {} session(s).", removed);
        return Ok(());
    }

    let sessions = store.list_sessions(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions recorded yet.");
        println!("\nStart one by plugging in while running:");
        println!("  trickle monitor");
        return Ok(());
    }

    println!(
        "{:<10} {:<17} {:>9} {:>8} {:>8} {:>8}  {}",
        "Session", "Started", "Duration", "Delta", "Avg W", "Peak W", "Charger"
    );
    println!("{}", "-".repeat(80));
    for session in &sessions {
        println!("{}", format_row(session));
    }

    let total = store.count()?;
    println!(
        "\nShowing {} of {} session(s) from {}",
        sessions.len(),
        total,
        store.path().display()
    );

    let interrupted = sessions.iter().filter(|s| s.is_open()).count();
    if interrupted > 0 {
        println!(
            "{} session(s) marked 'interrupted' were never finished.",
            interrupted
        );
    }

    Ok(())
}

fn format_row(session: &Session) -> String {
    let started = session
        .start_time
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string();

    let Some(end) = session.end_time else {
        return format!(
            "{:<10} {:<17} {:>9} {:>8} {:>8} {:>8}  {}",
            short_id(session),
            started,
            "-",
            "-",
            "-",
            "-",
            "interrupted"
        );
    };

    format!(
        "{:<10} {:<17} {:>9} {:>8} {:>8.2} {:>8.2}  {}",
        short_id(session),
        started,
        format_elapsed(session.duration(end)),
        format!("{:+.1}%", session.delta_percent),
        session.average_watts,
        session.peak_watts,
        session.charger_label.as_deref().unwrap_or("-"),
    )
}
