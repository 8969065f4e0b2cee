use std::sync::Arc;

use dotenvy::dotenv;
use tracing::{debug, error, info};

use common::actors::{Actor, ActorType};
use common::config::AppConfig;
use common::logger;
use market_data::BinanceTradeFeed;
use midi_out::open_sink;

use crate::actors::supervisor::Supervisor;
use crate::services::performer_service::SymbolPerformer;

mod actors;
mod services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logger::setup_logger();
    debug!("System starting up...");

    let config = match AppConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Configuration rejected: {}", e);
            return Err(e.into());
        }
    };

    let sink = match open_sink(&config.output) {
        Ok(sink) => sink,
        Err(e) => {
            error!("Cannot start without MIDI output: {}", e);
            return Err(e.into());
        }
    };

    let mut supervisor = Supervisor::new();

    for assignment in &config.symbols {
        info!("{} -> {}", assignment.symbol, assignment.channel);

        let config_for_actor = config.clone();
        let sink_for_actor = sink.clone();
        let assignment_for_actor = assignment.clone();
        supervisor.register_actor(
            ActorType::Performer(assignment.symbol.clone()),
            Box::new(move || -> Box<dyn Actor> {
                let feed = BinanceTradeFeed::new(
                    &assignment_for_actor.symbol,
                    &config_for_actor.feed.ws_base_url,
                );
                Box::new(SymbolPerformer::new(
                    &assignment_for_actor,
                    &config_for_actor,
                    sink_for_actor.clone(),
                    Box::new(feed),
                ))
            }),
        );
    }

    supervisor.start().await
}
