use std::sync::Arc;

use clap::{Args, Subcommand};
use hostel_sync_core::{Feed, PollingFeed, Student, StudentDirectory};

use super::live::watch_until_interrupted;
use crate::config::Config;

#[derive(Args)]
pub struct StudentsCommand {
    #[command(subcommand)]
    pub command: StudentsSubcommand,
}

#[derive(Subcommand)]
pub enum StudentsSubcommand {
    /// List the student roster
    List,

    /// Show one student
    Show {
        /// Student ID
        id: String,
    },

    /// Re-fetch the roster on the configured poll interval
    Watch,
}

impl StudentsCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let directory = StudentDirectory::new(config.remote_store()?);

        match &self.command {
            StudentsSubcommand::List => {
                let students = directory.list().await?;
                print_students(&students);
                Ok(())
            }

            StudentsSubcommand::Show { id } => match directory.student(id).await? {
                Some(student) => {
                    println!("ID:    {}", student.id);
                    println!("Name:  {}", student.name);
                    println!("Room:  {}", student.room);
                    println!("Phone: {}", student.phone);
                    Ok(())
                }
                None => Err(format!("Student not found: {}", id).into()),
            },

            StudentsSubcommand::Watch => {
                println!(
                    "Refreshing every {}s.",
                    config.poll_interval_secs.value
                );
                let feed = PollingFeed::<Vec<Student>>::new(Arc::new(directory), config.poll_interval());
                let subscription = feed.subscribe(Box::new(|students: Vec<Student>| {
                    print_students(&students);
                    println!();
                }));
                watch_until_interrupted(subscription).await
            }
        }
    }
}

fn print_students(students: &[Student]) {
    if students.is_empty() {
        println!("No students registered.");
        return;
    }

    println!("{:<16} {:<30} {:<10} {:<16}", "ID", "NAME", "ROOM", "PHONE");
    println!("{}", "-".repeat(72));
    for student in students {
        println!(
            "{:<16} {:<30} {:<10} {:<16}",
            student.id, student.name, student.room, student.phone
        );
    }
    println!();
    println!("Total: {} student(s)", students.len());
}
