use std::sync::Arc;

use clap::{Args, Subcommand};
use hostel_sync_core::{
    subscribe_laundry_settings, DirtyDiffWriter, DocumentStore, DraftState, LaundrySettings,
};

use super::{format_time, or_dash};
use super::live::{drain_into, forward, next_value, read_once, save_draft, watch_until_interrupted};

#[derive(Args)]
pub struct LaundryCommand {
    #[command(subcommand)]
    pub command: LaundrySubcommand,
}

#[derive(Subcommand)]
pub enum LaundrySubcommand {
    /// Show laundry settings
    Show,

    /// Print laundry settings every time they change
    Watch,

    /// Edit laundry settings (admin). Only the given fields are written.
    Set {
        /// Service status (e.g. "On Schedule", "Delayed", "Closed")
        #[arg(long)]
        status: Option<String>,

        /// Pickup day
        #[arg(long)]
        pickup_day: Option<String>,

        /// Drop-off day
        #[arg(long)]
        dropoff_day: Option<String>,

        /// Timings text (e.g. "8:00 AM - 11:00 AM")
        #[arg(long)]
        timings: Option<String>,

        /// Instruction line (can be repeated; replaces all instructions)
        #[arg(long = "instruction", value_name = "TEXT")]
        instructions: Vec<String>,
    },
}

impl LaundryCommand {
    pub async fn run(
        &self,
        store: Arc<dyn DocumentStore>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            LaundrySubcommand::Show => {
                let laundry: LaundrySettings =
                    read_once(|on_update| subscribe_laundry_settings(&store, on_update)).await?;
                print_laundry(&laundry);
                Ok(())
            }

            LaundrySubcommand::Watch => {
                let subscription = subscribe_laundry_settings(&store, |laundry| {
                    print_laundry(&laundry);
                    println!();
                });
                watch_until_interrupted(subscription).await
            }

            LaundrySubcommand::Set {
                status,
                pickup_day,
                dropoff_day,
                timings,
                instructions,
            } => {
                let (on_update, mut rx) = forward::<LaundrySettings>();
                let subscription = subscribe_laundry_settings(&store, on_update);

                let mut state = DraftState::single();
                state.apply_snapshot((), next_value(&mut rx).await?);

                if let Some(status) = status {
                    state.edit("status", |l: &mut LaundrySettings| l.status = status.clone());
                }
                if let Some(day) = pickup_day {
                    state.edit("pickupDay", |l| l.pickup_day = day.clone());
                }
                if let Some(day) = dropoff_day {
                    state.edit("dropoffDay", |l| l.dropoff_day = day.clone());
                }
                if let Some(timings) = timings {
                    state.edit("timings", |l| l.timings = timings.clone());
                }
                if !instructions.is_empty() {
                    state.edit("instructions", |l| l.instructions = instructions.clone());
                }

                drain_into(&mut rx, &mut state);
                let writer = DirtyDiffWriter::new(Arc::clone(&store));
                save_draft(&writer, &LaundrySettings::path(), &mut state).await?;
                subscription.unsubscribe();
                Ok(())
            }
        }
    }
}

fn print_laundry(laundry: &LaundrySettings) {
    println!("Laundry");
    println!("=======");
    println!("Status:   {}", laundry.status);
    println!("Pickup:   {}", or_dash(&laundry.pickup_day));
    println!("Drop-off: {}", or_dash(&laundry.dropoff_day));
    println!("Timings:  {}", or_dash(&laundry.timings));
    if !laundry.instructions.is_empty() {
        println!("Instructions:");
        for line in &laundry.instructions {
            println!("  - {}", line);
        }
    }
    println!("Updated:  {}", format_time(laundry.last_updated));
}
