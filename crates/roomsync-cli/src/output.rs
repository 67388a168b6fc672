//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{Local, TimeZone};

use roomsync_core::{Message, Room};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print one chat message, marking the reader's own messages
    pub fn print_message(&self, message: &Message, own_uid: &str) {
        match self.format {
            OutputFormat::Human => {
                let marker = if message.is_from(own_uid) { "*" } else { " " };
                println!(
                    "{} [{}] {}: {}",
                    marker,
                    format_time(message.timestamp),
                    message.author_label(),
                    message.text
                );
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "id": message.id,
                        "text": message.text,
                        "userId": message.user_id,
                        "userName": message.user_name,
                        "timestamp": message.timestamp
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", message.text);
            }
        }
    }

    /// Print a list of rooms, highlighting the active one
    pub fn print_rooms(&self, rooms: &[Room], current_room: &str) {
        match self.format {
            OutputFormat::Human => {
                if rooms.is_empty() {
                    println!("No rooms yet.");
                    return;
                }
                for room in rooms {
                    let id = room.id.as_deref().unwrap_or_default();
                    let marker = if id == current_room { ">" } else { " " };
                    let description = room
                        .description
                        .as_deref()
                        .map(|d| format!(" - {}", truncate(d, 40)))
                        .unwrap_or_default();
                    println!("{} {} ({}){}", marker, room.display_name(), id, description);
                }
                println!("\n{} room(s)", rooms.len());
            }
            OutputFormat::Json => {
                let json_rooms: Vec<_> = rooms
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "id": r.id,
                            "name": r.display_name(),
                            "description": r.description,
                            "createdBy": r.created_by,
                            "participantCount": r.participant_count
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json_rooms).unwrap_or_default()
                );
            }
            OutputFormat::Quiet => {
                for room in rooms {
                    println!("{}", room.id.as_deref().unwrap_or_default());
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an error without aborting
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Human | OutputFormat::Quiet => eprintln!("✗ {}", message),
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({"status": "error", "message": message})
                );
            }
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Format an epoch-millisecond timestamp as local HH:MM
fn format_time(timestamp: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_format_time_out_of_range() {
        assert_eq!(format_time(i64::MAX), "--:--");
        assert_eq!(format_time(0).len(), 5);
    }
}
