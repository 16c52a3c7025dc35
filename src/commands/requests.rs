use std::sync::Arc;

use clap::{Args, Subcommand};
use hostel_sync_core::{
    DocumentStore, NewServiceRequest, RequestStatus, ServiceRequest, ServiceRequestService,
};

use super::format_time;
use super::live::{read_once, watch_until_interrupted};
use crate::config::Config;

#[derive(Args)]
pub struct RequestsCommand {
    #[command(subcommand)]
    pub command: RequestsSubcommand,
}

#[derive(Subcommand)]
pub enum RequestsSubcommand {
    /// List service requests, newest first
    List {
        /// Only requests submitted by the configured user
        #[arg(long, conflicts_with = "student")]
        mine: bool,

        /// Only requests submitted by this student
        #[arg(long)]
        student: Option<String>,

        /// Only requests in this status
        #[arg(long, conflicts_with = "open")]
        status: Option<RequestStatus>,

        /// Hide completed and rejected requests
        #[arg(long)]
        open: bool,
    },

    /// Print the request list every time it changes
    Watch {
        /// Only requests submitted by the configured user
        #[arg(long)]
        mine: bool,
    },

    /// Submit a service request as the configured user
    Submit {
        /// What needs doing
        description: String,

        /// Category (e.g. "plumbing", "electrical")
        #[arg(long, default_value = "general")]
        category: String,
    },

    /// Approve a pending request (admin)
    Approve {
        /// Request ID
        id: String,

        /// Expected completion (free text, e.g. "Tomorrow 10 AM")
        #[arg(long)]
        eta: Option<String>,

        /// Note for the student
        #[arg(long)]
        note: Option<String>,
    },

    /// Reject a pending request (admin)
    Reject {
        /// Request ID
        id: String,

        /// Reason shown to the student
        #[arg(long)]
        note: Option<String>,
    },

    /// Mark an approved request as completed (admin)
    Complete {
        /// Request ID
        id: String,
    },
}

impl RequestsCommand {
    pub async fn run(
        &self,
        store: Arc<dyn DocumentStore>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let service = ServiceRequestService::new(store);

        match &self.command {
            RequestsSubcommand::List {
                mine,
                student,
                status,
                open,
            } => {
                let student = if *mine {
                    Some(config.user_id.value.as_str())
                } else {
                    student.as_deref()
                };
                let requests: Vec<ServiceRequest> =
                    read_once(|on_update| service.subscribe(student, on_update)).await?;
                let requests: Vec<ServiceRequest> = requests
                    .into_iter()
                    .filter(|r| status.map_or(true, |s| r.status == s))
                    .filter(|r| !*open || !r.status.is_final())
                    .collect();
                print_requests(&requests);
                Ok(())
            }

            RequestsSubcommand::Watch { mine } => {
                let student = mine.then_some(config.user_id.value.as_str());
                let subscription = service.subscribe(student, |requests| {
                    print_requests(&requests);
                    println!();
                });
                watch_until_interrupted(subscription).await
            }

            RequestsSubcommand::Submit {
                description,
                category,
            } => {
                let request = NewServiceRequest {
                    student_id: config.user_id.value.clone(),
                    student_name: config.display_name.value.clone(),
                    category: category.clone(),
                    description: description.clone(),
                };
                let id = service.submit(&request).await?;
                println!("Submitted request: {}", id);
                Ok(())
            }

            RequestsSubcommand::Approve { id, eta, note } => {
                service
                    .approve(id, eta.as_deref(), note.as_deref())
                    .await?;
                println!("Approved request: {}", id);
                Ok(())
            }

            RequestsSubcommand::Reject { id, note } => {
                service.reject(id, note.as_deref()).await?;
                println!("Rejected request: {}", id);
                Ok(())
            }

            RequestsSubcommand::Complete { id } => {
                service.complete(id).await?;
                println!("Completed request: {}", id);
                Ok(())
            }
        }
    }
}

fn print_requests(requests: &[ServiceRequest]) {
    if requests.is_empty() {
        println!("No service requests.");
        return;
    }

    for request in requests {
        println!(
            "[{}] {} ({}) {}",
            request.status, request.category, request.id, request.description
        );
        println!(
            "  from {} ({}), submitted {}",
            request.student_name,
            request.student_id,
            format_time(request.created_at)
        );
        if let Some(eta) = &request.eta {
            println!("  eta: {}", eta);
        }
        if let Some(note) = &request.admin_note {
            println!("  note: {}", note);
        }
    }
    println!();
    println!("Total: {} request(s)", requests.len());
}
