//! Day-grouping for chat transcripts.

use chrono::{DateTime, Days, NaiveDate, TimeZone};

use crate::records::ChatMessage;

/// One row of a rendered transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatItem {
    Message(ChatMessage),
    DaySeparator { id: String, label: String },
}

impl ChatItem {
    pub fn id(&self) -> &str {
        match self {
            ChatItem::Message(message) => &message.id,
            ChatItem::DaySeparator { id, .. } => id,
        }
    }
}

/// Interleaves day separators into a newest-first message list.
///
/// A separator follows the last message of each calendar day (in the time
/// zone of `now`), so in a bottom-anchored view it sits above that day's
/// messages. Messages still waiting for their server timestamp count as
/// sent at `now`.
pub fn group_by_day<Tz: TimeZone>(messages: &[ChatMessage], now: &DateTime<Tz>) -> Vec<ChatItem> {
    let today = now.date_naive();
    let day_of = |message: &ChatMessage| -> NaiveDate {
        message
            .created_at
            .map(|t| t.with_timezone(&now.timezone()).date_naive())
            .unwrap_or(today)
    };

    let mut items = Vec::with_capacity(messages.len() + 4);
    for (index, message) in messages.iter().enumerate() {
        let day = day_of(message);
        items.push(ChatItem::Message(message.clone()));

        let day_ends = match messages.get(index + 1) {
            Some(older) => day_of(older) != day,
            None => true,
        };
        if day_ends {
            let label = day_label(day, today);
            items.push(ChatItem::DaySeparator {
                id: format!("date-{}", label),
                label,
            });
        }
    }
    items
}

/// "Today", "Yesterday", or an absolute date such as "October 13, 2026".
pub fn day_label(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        "Today".to_string()
    } else if today.checked_sub_days(Days::new(1)) == Some(day) {
        "Yesterday".to_string()
    } else {
        day.format("%B %-d, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Utc};

    fn message(id: &str, created_at: DateTime<Utc>) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            text: format!("message {}", id),
            created_at: Some(created_at),
            ..ChatMessage::default()
        }
    }

    fn labels(items: &[ChatItem]) -> Vec<String> {
        items
            .iter()
            .map(|item| match item {
                ChatItem::Message(m) => m.id.clone(),
                ChatItem::DaySeparator { label, .. } => format!("[{}]", label),
            })
            .collect()
    }

    #[test]
    fn test_today_yesterday_and_older() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap();
        let messages = vec![
            message("t2", now - Duration::hours(1)),
            message("t1", now - Duration::hours(3)),
            message("y1", now - Duration::days(1)),
            message("o2", now - Duration::days(3)),
            message("o1", now - Duration::days(3) - Duration::hours(2)),
        ];

        let items = group_by_day(&messages, &now);

        assert_eq!(
            labels(&items),
            vec![
                "t2",
                "t1",
                "[Today]",
                "y1",
                "[Yesterday]",
                "o2",
                "o1",
                "[October 13, 2026]",
            ]
        );
        assert_eq!(items[2].id(), "date-Today");
        assert_eq!(items[7].id(), "date-October 13, 2026");
    }

    #[test]
    fn test_days_follow_local_time_zone() {
        // 23:30 UTC on the 15th is already the 16th in UTC+05:30
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let now = ist.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();
        let messages = vec![message(
            "late",
            Utc.with_ymd_and_hms(2026, 10, 15, 23, 30, 0).unwrap(),
        )];

        let items = group_by_day(&messages, &now);
        assert_eq!(labels(&items), vec!["late", "[Today]"]);
    }

    #[test]
    fn test_pending_timestamp_counts_as_today() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap();
        let pending = ChatMessage {
            id: "p".into(),
            ..ChatMessage::default()
        };
        let items = group_by_day(&[pending, message("y", now - Duration::days(1))], &now);
        assert_eq!(labels(&items), vec!["p", "[Today]", "y", "[Yesterday]"]);
    }

    #[test]
    fn test_empty_transcript() {
        let now = Utc::now();
        assert!(group_by_day(&[], &now).is_empty());
    }
}
