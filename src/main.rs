//! Demo of the donation pipeline.
//!
//! 1. Submits a synthetic donation photo with three stops.
//! 2. Connects two shelters and one driver over the in-memory transport.
//! 3. Relays one position report from the driver.

use food_rescue::config::PipelineConfig;
use food_rescue::lifecycle::{setup_tracing, PipelineSystem};
use food_rescue::quality::synthetic;
use food_rescue::routing::{RouteRequest, Stop};
use food_rescue::tracking::mock::ChannelTransport;
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let mut system = PipelineSystem::new(PipelineConfig::default())?;

    let photo = synthetic::checkerboard_png(100, 100, 10, 60, 240)?;
    let request = RouteRequest::new(vec![
        Stop::new("Restaurant").with_coordinate(37.7749, -122.4194),
        Stop::new("Shelter A").with_coordinate(37.8044, -122.2712),
        Stop::new("Shelter B").with_coordinate(37.7599, -122.4148),
    ]);

    let span = tracing::info_span!("donation");
    let decision = async { system.submit(photo, request).await }.instrument(span).await?;
    println!("{}", decision.to_json());

    let (shelter_a, mut shelter_a_peer) = ChannelTransport::pair();
    let (shelter_b, mut shelter_b_peer) = ChannelTransport::pair();
    let (driver, mut driver_peer) = ChannelTransport::pair();
    system.open_session("D1", shelter_a);
    system.open_session("D1", shelter_b);

    // Let the shelters register before the driver starts reporting.
    while system.tracking().subscriber_count("D1").await? < 2 {
        tokio::task::yield_now().await;
    }
    system.open_session("D1", driver);
    driver_peer.push("37.1,-122.4");

    for peer in [&mut shelter_a_peer, &mut shelter_b_peer] {
        if let Some(message) = peer.recv().await {
            println!("{message}");
        }
    }

    driver_peer.hang_up();
    let summaries = system.shutdown().await?;
    info!(sessions = summaries.len(), "Demo complete");
    Ok(())
}
