use chrono::{DateTime, Utc};

/// Renders a spot the way DX cluster nodes print them.
pub fn cluster_line(
    spotter: &str,
    frequency_khz: f64,
    callsign: &str,
    comment: &str,
    at: DateTime<Utc>,
) -> String {
    format!(
        "DX de {:<10}{:>8.1}  {:<13}{:<30}{}Z",
        format!("{spotter}:"),
        frequency_khz,
        callsign,
        comment,
        at.format("%H%M")
    )
}
