//! Timestamp formatting shared by the renderer and caption sidecars.

/// Format seconds as `HH:MM:SS` (or `HH:MM:SS.mmm` when fractional).
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0005 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}

/// Parse `HH:MM:SS[.mmm]`, `MM:SS[.mmm]` or bare seconds.
pub fn parse_timestamp(ts: &str) -> Option<f64> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    let parts: Vec<&str> = ts.split(':').collect();
    let parsed: Option<Vec<f64>> = parts.iter().map(|p| p.parse::<f64>().ok()).collect();
    let parsed = parsed?;
    if parsed.iter().any(|v| *v < 0.0) {
        return None;
    }
    match parsed.as_slice() {
        [s] => Some(*s),
        [m, s] => Some(m * 60.0 + s),
        [h, m, s] => Some(h * 3600.0 + m * 60.0 + s),
        _ => None,
    }
}

/// Format seconds as an SRT timestamp, `HH:MM:SS,mmm`.
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Parse an SRT timestamp (`HH:MM:SS,mmm`) back to seconds.
pub fn parse_srt_timestamp(ts: &str) -> Option<f64> {
    let (hms, millis) = ts.trim().split_once(',')?;
    let millis: f64 = millis.parse().ok()?;
    let secs = parse_timestamp(hms)?;
    Some(secs + millis / 1000.0)
}
