//! Hostel Admin CLI
//!
//! Administration tool for the student roster on the sync server.
//!
//! # Usage
//!
//! ```bash
//! hostel-admin student add stu-1 --name "Asha Rao" --room B-204 --phone 9876543210
//! hostel-admin student list
//! hostel-admin student remove stu-1
//! ```
//!
//! # Environment Variables
//!
//! - `HOSTEL_DATABASE_PATH`: SQLite database used by the server (default: ~/.local/share/hostel-server/hostel.db)

use clap::{Args, Parser, Subcommand};
use hostel_sync_core::Student;
use hostelsync::server::{init_db, StudentRepository};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hostel-admin")]
#[command(version)]
#[command(about = "Hostel server administration tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the student roster
    Student(StudentCommand),
}

#[derive(Args)]
struct StudentCommand {
    #[command(subcommand)]
    command: StudentSubcommand,
}

#[derive(Subcommand)]
enum StudentSubcommand {
    /// Add a student
    Add {
        /// Student id (matches the `user_id` of their API key)
        id: String,
        /// Full name
        #[arg(long, short)]
        name: String,
        /// Room number
        #[arg(long, short, default_value = "")]
        room: String,
        /// Contact phone
        #[arg(long, short, default_value = "")]
        phone: String,
    },
    /// List all students
    List,
    /// Remove a student
    Remove {
        /// Student id
        id: String,
    },
}

/// Get the database path used by the server
fn database_path() -> PathBuf {
    std::env::var("HOSTEL_DATABASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("hostel-server")
                .join("hostel.db")
        })
}

async fn add_student(
    repo: &StudentRepository,
    student: Student,
) -> Result<(), Box<dyn std::error::Error>> {
    if student.name.trim().is_empty() {
        return Err("Student name cannot be empty".into());
    }

    if !repo.add(&student).await? {
        return Err(format!("Student '{}' already exists", student.id).into());
    }

    println!("Added student: {}", student.id);
    println!("  Name: {}", student.name);
    if !student.room.is_empty() {
        println!("  Room: {}", student.room);
    }
    if !student.phone.is_empty() {
        println!("  Phone: {}", student.phone);
    }

    Ok(())
}

async fn list_students(repo: &StudentRepository) -> Result<(), Box<dyn std::error::Error>> {
    let students = repo.list().await?;

    if students.is_empty() {
        println!("No students registered.");
        return Ok(());
    }

    println!("{:<16} {:<30} {:<10} {:<16}", "ID", "NAME", "ROOM", "PHONE");
    println!("{}", "-".repeat(72));

    for student in &students {
        println!(
            "{:<16} {:<30} {:<10} {:<16}",
            student.id, student.name, student.room, student.phone
        );
    }

    println!();
    println!("Total: {} student(s)", students.len());

    Ok(())
}

async fn remove_student(
    repo: &StudentRepository,
    id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    if !repo.remove(&id).await? {
        return Err(format!("Student '{}' not found", id).into());
    }

    println!("Removed student: {}", id);

    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let pool = init_db(&database_path()).await?;
    let repo = StudentRepository::new(pool);

    match cli.command {
        Commands::Student(student_cmd) => match student_cmd.command {
            StudentSubcommand::Add {
                id,
                name,
                room,
                phone,
            } => {
                let student = Student {
                    id,
                    name: name.trim().to_string(),
                    room,
                    phone,
                };
                add_student(&repo, student).await
            }
            StudentSubcommand::List => list_students(&repo).await,
            StudentSubcommand::Remove { id } => remove_student(&repo, id).await,
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
