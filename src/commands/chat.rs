use std::sync::Arc;

use chrono::Local;
use clap::{Args, Subcommand};
use hostel_sync_core::{
    group_by_day, ChatItem, ChatMessage, ChatService, Conversation, DocumentStore, Sender,
};

use super::format_time;
use super::live::{forward, next_value, read_once, watch_until_interrupted};
use crate::config::Config;

#[derive(Args)]
pub struct ChatCommand {
    #[command(subcommand)]
    pub command: ChatSubcommand,
}

#[derive(Subcommand)]
pub enum ChatSubcommand {
    /// List conversations, most recent first (admin)
    List,

    /// Show a conversation grouped by day and mark it read
    Show {
        /// Participant (student) ID (default: the configured user)
        participant: Option<String>,
    },

    /// Print a conversation every time a message arrives
    Watch {
        /// Participant (student) ID (default: the configured user)
        participant: Option<String>,
    },

    /// Send a message as the configured user
    Send {
        /// Participant (student) ID of the conversation
        participant: String,

        /// Message text
        text: String,
    },
}

impl ChatCommand {
    pub async fn run(
        &self,
        store: Arc<dyn DocumentStore>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let service = ChatService::new(store);
        let me = &config.user_id.value;

        match &self.command {
            ChatSubcommand::List => {
                let conversations: Vec<Conversation> =
                    read_once(|on_update| service.subscribe_conversations(on_update)).await?;
                print_conversations(&conversations);
                Ok(())
            }

            ChatSubcommand::Show { participant } => {
                let participant = participant.as_deref().unwrap_or(me);
                let (on_update, mut rx) = forward::<Vec<ChatMessage>>();
                let subscription = service.subscribe_messages(participant, on_update)?;
                let messages = next_value(&mut rx).await?;
                subscription.unsubscribe();

                print_transcript(&messages, me);
                let marked = service.mark_read(participant, me).await?;
                if marked > 0 {
                    println!("\nMarked {} message(s) as read.", marked);
                }
                Ok(())
            }

            ChatSubcommand::Watch { participant } => {
                let participant = participant.as_deref().unwrap_or(me);
                let viewer = me.clone();
                let subscription = service.subscribe_messages(participant, move |messages| {
                    print_transcript(&messages, &viewer);
                    println!();
                })?;
                watch_until_interrupted(subscription).await
            }

            ChatSubcommand::Send { participant, text } => {
                let sender = Sender::new(me.clone(), config.display_name.value.clone());
                let id = service.send(participant, &sender, text).await?;
                println!("Sent message: {}", id);
                Ok(())
            }
        }
    }
}

fn print_conversations(conversations: &[Conversation]) {
    if conversations.is_empty() {
        println!("No conversations.");
        return;
    }

    println!(
        "{:<16} {:<20} {:<8} {:<20} {}",
        "PARTICIPANT", "NAME", "UNREAD", "LAST ACTIVITY", "LAST MESSAGE"
    );
    println!("{}", "-".repeat(96));
    for conversation in conversations {
        println!(
            "{:<16} {:<20} {:<8} {:<20} {}",
            conversation.participant_id,
            conversation.participant_name,
            conversation.unread_count,
            format_time(conversation.last_message_time),
            conversation.last_message
        );
    }
}

/// Prints oldest first, each day under its separator.
fn print_transcript(messages: &[ChatMessage], viewer: &str) {
    if messages.is_empty() {
        println!("No messages yet.");
        return;
    }

    let items = group_by_day(messages, &Local::now());
    for item in items.iter().rev() {
        match item {
            ChatItem::DaySeparator { label, .. } => println!("\n--- {} ---", label),
            ChatItem::Message(message) => {
                let time = message
                    .created_at
                    .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
                    .unwrap_or_else(|| "sending".to_string());
                let who = if message.sender_id == viewer {
                    "you"
                } else {
                    message.sender_name.as_str()
                };
                let unread = if message.read || message.sender_id == viewer {
                    ""
                } else {
                    " *"
                };
                println!("[{}] {}: {}{}", time, who, message.text, unread);
            }
        }
    }
}
