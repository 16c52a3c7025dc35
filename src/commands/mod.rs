mod bus;
mod chat;
mod config_cmd;
mod contacts;
mod laundry;
mod live;
mod mess;
mod requests;
mod status;
mod students;

pub use bus::BusCommand;
pub use chat::ChatCommand;
pub use config_cmd::ConfigCommand;
pub use contacts::ContactsCommand;
pub use laundry::LaundryCommand;
pub use mess::MessCommand;
pub use requests::RequestsCommand;
pub use status::StatusCommand;
pub use students::StudentsCommand;

use chrono::{DateTime, Local, Utc};

/// Local time for display, or "-" when the server has not stamped it yet.
fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t
            .with_timezone(&Local)
            .format("%b %-d, %Y %H:%M")
            .to_string(),
        None => "-".to_string(),
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash("  "), "-");
        assert_eq!(or_dash("Monday"), "Monday");
    }

    #[test]
    fn test_format_time_unset() {
        assert_eq!(format_time(None), "-");
    }
}
