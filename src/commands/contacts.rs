use std::sync::Arc;

use clap::{Args, Subcommand};
use hostel_sync_core::records::DEFAULT_CONTACT_ICON;
use hostel_sync_core::{ContactService, DocumentStore, EmergencyContact};

use super::live::{read_once, watch_until_interrupted};

#[derive(Args)]
pub struct ContactsCommand {
    #[command(subcommand)]
    pub command: ContactsSubcommand,
}

#[derive(Subcommand)]
pub enum ContactsSubcommand {
    /// List emergency contacts
    List,

    /// Print the contact list every time it changes
    Watch,

    /// Add an emergency contact (admin)
    Add {
        /// Title shown on the card (e.g. "Warden", "Ambulance")
        #[arg(long)]
        title: String,

        /// Contact person
        #[arg(long)]
        name: String,

        /// Phone number
        #[arg(long)]
        phone: String,

        /// Icon name
        #[arg(long, default_value = DEFAULT_CONTACT_ICON)]
        icon: String,
    },

    /// Remove an emergency contact (admin)
    Remove {
        /// Contact ID
        id: String,
    },
}

impl ContactsCommand {
    pub async fn run(
        &self,
        store: Arc<dyn DocumentStore>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let service = ContactService::new(store);

        match &self.command {
            ContactsSubcommand::List => {
                let contacts: Vec<EmergencyContact> =
                    read_once(|on_update| service.subscribe(on_update)).await?;
                print_contacts(&contacts);
                Ok(())
            }

            ContactsSubcommand::Watch => {
                let subscription = service.subscribe(|contacts| {
                    print_contacts(&contacts);
                    println!();
                });
                watch_until_interrupted(subscription).await
            }

            ContactsSubcommand::Add {
                title,
                name,
                phone,
                icon,
            } => {
                let contact = EmergencyContact::new(title, name, phone).with_icon(icon);
                let id = service.add(&contact).await?;
                println!("Added contact: {} ({})", contact.title.trim(), id);
                Ok(())
            }

            ContactsSubcommand::Remove { id } => {
                service.remove(id).await?;
                println!("Removed contact: {}", id);
                Ok(())
            }
        }
    }
}

fn print_contacts(contacts: &[EmergencyContact]) {
    if contacts.is_empty() {
        println!("No emergency contacts.");
        return;
    }

    println!("{:<24} {:<24} {:<16} {:<10}", "TITLE", "NAME", "PHONE", "ID");
    println!("{}", "-".repeat(80));
    for contact in contacts {
        println!(
            "{:<24} {:<24} {:<16} {:<10}",
            contact.title, contact.name, contact.phone, contact.id
        );
    }
}
