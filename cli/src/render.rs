//! Plain-text rendering of engine events and snapshots.

use std::fmt::Write;

use gostream_ipc::{ConnectionPhase, DashboardSnapshot, EngineEvent, LiveMetricsSample, Platform};

/// One line (or block) for an engine event.
pub fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::Ready => "Engine ready. Type `help` for commands.".to_string(),
        EngineEvent::SessionChanged(session) if session.is_live => {
            format!("LIVE  {}", session.title)
        }
        EngineEvent::SessionChanged(session) => format!("OFFLINE  {}", session.title),
        EngineEvent::PlatformsChanged(platforms) => {
            format!("Destinations: {}", destinations(platforms))
        }
        EngineEvent::ConnectionProgress { platform_id, phase } => progress(platform_id, *phase),
        EngineEvent::Metrics(sample) => metrics(sample),
        EngineEvent::Chat(message) => {
            format!("[{}] {}: {}", message.platform, message.user, message.text)
        }
        EngineEvent::Suggestions(suggestions) => {
            let mut out = String::from("Suggested titles:");
            for (i, title) in suggestions.titles.iter().enumerate() {
                let _ = write!(out, "\n  {}. {}", i + 1, title);
            }
            let tags: Vec<String> = suggestions.tags.iter().map(|t| format!("#{t}")).collect();
            let _ = write!(out, "\nTags: {}\n{}", tags.join(" "), suggestions.description);
            out
        }
        EngineEvent::Mood(report) => format!("Chat mood: {}. {}", report.mood, report.summary),
        EngineEvent::SectionChanged(section) => format!("== {} ==", section.title()),
        EngineEvent::Rejected { message, .. } => format!("! {message}"),
        EngineEvent::Snapshot(snapshot) => status(snapshot),
        EngineEvent::Shutdown => "Engine stopped".to_string(),
    }
}

/// Multi-line dashboard summary.
pub fn status(snapshot: &DashboardSnapshot) -> String {
    let mut out = String::new();
    let state = if snapshot.session.is_live { "LIVE" } else { "OFFLINE" };

    let _ = writeln!(out, "== {} ==", snapshot.section.title());
    let _ = writeln!(out, "{}  {}", state, snapshot.session.title);
    let _ = writeln!(
        out,
        "Destinations ({} active): {}",
        snapshot.active_destinations(),
        destinations(&snapshot.platforms)
    );
    let _ = writeln!(out, "{}", metrics(&snapshot.metrics));
    if let Some(connection) = &snapshot.connection {
        let _ = writeln!(out, "{}", progress(&connection.platform_name, connection.phase));
    }
    if let Some(mood) = &snapshot.mood {
        let _ = writeln!(out, "Chat mood: {}", mood.mood);
    }
    let recent = snapshot.chat.len().saturating_sub(5);
    for message in &snapshot.chat[recent..] {
        let _ = writeln!(
            out,
            "  {} [{}] {}: {}",
            message.timestamp.format("%H:%M:%S"),
            message.platform,
            message.user,
            message.text
        );
    }

    out.truncate(out.trim_end().len());
    out
}

fn destinations(platforms: &[Platform]) -> String {
    platforms
        .iter()
        .map(|p| format!("{} [{}]", p.name, p.status_label()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn progress(platform: &str, phase: ConnectionPhase) -> String {
    format!("{}: {} ({}/3)", platform, phase.name(), phase.step())
}

fn metrics(sample: &LiveMetricsSample) -> String {
    format!(
        "{} viewers | {} kbps | CPU {}% | {}",
        sample.viewers,
        sample.bitrate_kbps,
        sample.cpu_percent,
        sample.uptime_display()
    )
}
