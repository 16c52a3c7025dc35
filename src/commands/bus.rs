use std::sync::Arc;

use clap::{Args, Subcommand};
use hostel_sync_core::{
    subscribe_bus_route, subscribe_bus_routes, BusSchedule, DirtyDiffWriter, DocumentStore,
    DraftState,
};

use super::live::{drain_into, forward, next_value, read_once, save_draft, watch_until_interrupted};
use super::{format_time, or_dash};

#[derive(Args)]
pub struct BusCommand {
    #[command(subcommand)]
    pub command: BusSubcommand,
}

#[derive(Subcommand)]
pub enum BusSubcommand {
    /// List all bus routes
    List,

    /// Print the route table every time it changes
    Watch,

    /// Edit a bus route (admin). Creates the route if it does not exist.
    Set {
        /// Route ID
        route_id: String,

        /// Display name of the route
        #[arg(long)]
        route_name: Option<String>,

        /// Route status (e.g. "On Schedule", "Delayed", "Cancelled")
        #[arg(long)]
        status: Option<String>,

        /// Departure time (can be repeated; replaces all times)
        #[arg(long = "time", value_name = "HH:MM")]
        departure_times: Vec<String>,

        /// Pickup point
        #[arg(long)]
        pickup_point: Option<String>,

        /// Driver's name
        #[arg(long)]
        driver_name: Option<String>,

        /// Driver's phone
        #[arg(long)]
        driver_phone: Option<String>,
    },
}

impl BusCommand {
    pub async fn run(
        &self,
        store: Arc<dyn DocumentStore>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            BusSubcommand::List => {
                let routes: Vec<BusSchedule> =
                    read_once(|on_update| subscribe_bus_routes(&store, on_update)).await?;
                print_routes(&routes);
                Ok(())
            }

            BusSubcommand::Watch => {
                let subscription = subscribe_bus_routes(&store, |routes| {
                    print_routes(&routes);
                    println!();
                });
                watch_until_interrupted(subscription).await
            }

            BusSubcommand::Set {
                route_id,
                route_name,
                status,
                departure_times,
                pickup_point,
                driver_name,
                driver_phone,
            } => {
                let path = BusSchedule::path(route_id)?;
                let (on_update, mut rx) = forward::<BusSchedule>();
                let subscription = subscribe_bus_route(&store, route_id, on_update)?;

                let mut state = DraftState::new(route_id.clone());
                state.apply_snapshot(route_id.clone(), next_value(&mut rx).await?);

                if let Some(name) = route_name {
                    state.edit("routeName", |b: &mut BusSchedule| b.route_name = name.clone());
                }
                if let Some(status) = status {
                    state.edit("status", |b| b.status = status.clone());
                }
                if !departure_times.is_empty() {
                    state.edit("departureTimes", |b| {
                        b.departure_times = departure_times.clone()
                    });
                }
                if let Some(point) = pickup_point {
                    state.edit("pickupPoint", |b| b.pickup_point = point.clone());
                }
                if let Some(name) = driver_name {
                    state.edit("driver", |b| b.driver_name = name.clone());
                }
                if let Some(phone) = driver_phone {
                    state.edit("driver", |b| b.driver_phone = phone.clone());
                }

                drain_into(&mut rx, &mut state);
                let writer = DirtyDiffWriter::new(Arc::clone(&store));
                save_draft(&writer, &path, &mut state).await?;
                subscription.unsubscribe();
                Ok(())
            }
        }
    }
}

fn print_routes(routes: &[BusSchedule]) {
    if routes.is_empty() {
        println!("No bus routes.");
        return;
    }

    println!(
        "{:<20} {:<14} {:<24} {:<20}",
        "ROUTE", "STATUS", "DEPARTURES", "PICKUP"
    );
    println!("{}", "-".repeat(80));
    for route in routes {
        println!(
            "{:<20} {:<14} {:<24} {:<20}",
            route.route_name,
            route.status,
            or_dash(&route.departure_times.join(", ")),
            or_dash(&route.pickup_point)
        );
        if !route.driver_name.is_empty() {
            println!(
                "{:<20} driver: {} {}",
                "", route.driver_name, route.driver_phone
            );
        }
    }
    let latest = routes.iter().filter_map(|r| r.last_updated).max();
    println!();
    println!("Last updated: {}", format_time(latest));
}
