use std::sync::Arc;

use chrono::{Datelike, Local, Weekday};
use clap::{Args, Subcommand};
use hostel_sync_core::records::{parse_weekday, weekday_key};
use hostel_sync_core::{
    subscribe_mess_menu, DirtyDiffWriter, DocumentStore, DraftState, MealSlot, MessMenu,
};

use super::format_time;
use super::live::{drain_into, forward, next_value, read_once, save_draft, watch_until_interrupted};

#[derive(Args)]
pub struct MessCommand {
    #[command(subcommand)]
    pub command: MessSubcommand,
}

#[derive(Subcommand)]
pub enum MessSubcommand {
    /// Show the menu for a day
    Show {
        /// Day of the week (default: today)
        #[arg(long, short, value_parser = parse_weekday)]
        day: Option<Weekday>,
    },

    /// Print the menu for a day every time it changes
    Watch {
        /// Day of the week (default: today)
        #[arg(long, short, value_parser = parse_weekday)]
        day: Option<Weekday>,
    },

    /// Edit the menu for a day (admin). Given meals replace their item lists.
    Set {
        /// Day of the week
        #[arg(value_parser = parse_weekday)]
        day: Weekday,

        /// Breakfast item (can be repeated)
        #[arg(long = "breakfast", value_name = "ITEM")]
        breakfast: Vec<String>,

        /// Lunch item (can be repeated)
        #[arg(long = "lunch", value_name = "ITEM")]
        lunch: Vec<String>,

        /// Snacks item (can be repeated)
        #[arg(long = "snacks", value_name = "ITEM")]
        snacks: Vec<String>,

        /// Dinner item (can be repeated)
        #[arg(long = "dinner", value_name = "ITEM")]
        dinner: Vec<String>,

        /// Special note for the day (empty string clears it)
        #[arg(long)]
        note: Option<String>,
    },
}

impl MessCommand {
    pub async fn run(
        &self,
        store: Arc<dyn DocumentStore>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            MessSubcommand::Show { day } => {
                let day = day.unwrap_or_else(today);
                let menu: MessMenu =
                    read_once(|on_update| subscribe_mess_menu(&store, day, on_update)).await?;
                print_menu(day, &menu);
                Ok(())
            }

            MessSubcommand::Watch { day } => {
                let day = day.unwrap_or_else(today);
                let subscription = subscribe_mess_menu(&store, day, move |menu| {
                    print_menu(day, &menu);
                    println!();
                });
                watch_until_interrupted(subscription).await
            }

            MessSubcommand::Set {
                day,
                breakfast,
                lunch,
                snacks,
                dinner,
                note,
            } => {
                let day = *day;
                let (on_update, mut rx) = forward::<MessMenu>();
                let subscription = subscribe_mess_menu(&store, day, on_update);

                let mut state: DraftState<Weekday, MessMenu> = DraftState::new(day);
                state.apply_snapshot(day, next_value(&mut rx).await?);

                let edits = [
                    (MealSlot::Breakfast, breakfast),
                    (MealSlot::Lunch, lunch),
                    (MealSlot::Snacks, snacks),
                    (MealSlot::Dinner, dinner),
                ];
                for (slot, items) in edits {
                    if !items.is_empty() {
                        state.edit(slot.key(), |menu| *menu.items_mut(slot) = items.clone());
                    }
                }
                if let Some(note) = note {
                    state.edit("specialNote", |menu| menu.special_note = note.clone());
                }

                drain_into(&mut rx, &mut state);
                let writer = DirtyDiffWriter::new(Arc::clone(&store));
                save_draft(&writer, &MessMenu::path(day), &mut state).await?;
                subscription.unsubscribe();
                Ok(())
            }
        }
    }
}

fn today() -> Weekday {
    Local::now().weekday()
}

fn print_menu(day: Weekday, menu: &MessMenu) {
    let title = format!("Mess menu: {}", weekday_key(day));
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));

    for slot in MealSlot::ALL {
        let items = menu.items(slot);
        if items.is_empty() {
            println!("{:<10} -", slot.to_string());
        } else {
            println!("{:<10} {}", slot.to_string(), items.join(", "));
        }
    }
    if !menu.special_note.trim().is_empty() {
        println!();
        println!("Note: {}", menu.special_note);
    }
    println!("Updated: {}", format_time(menu.last_updated));
}
