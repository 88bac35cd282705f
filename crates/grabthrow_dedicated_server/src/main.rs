use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use clap::Parser;

use grabthrow_protocol::config::{
    DEFAULT_FOCUS_DISTANCE, DEFAULT_PICKUP_DISTANCE, DEFAULT_THROW_COOLDOWN, DEFAULT_THROW_SPEED,
    InteractionConfig,
};
use grabthrow_protocol::tcp_transport::TcpServerTransport;
use grabthrow_server::ServerPlugin;
use grabthrow_server::world_session::{WorldSession, WorldSettings};

#[derive(Parser)]
#[command(name = "grabthrow_dedicated_server")]
#[command(about = "Grabthrow dedicated server (headless)")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 7777)]
    port: u16,

    /// World seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// World name
    #[arg(short, long, default_value = "World")]
    world: String,

    #[arg(long, default_value_t = 8)]
    max_players: usize,

    /// Length of the view ray used to focus objects
    #[arg(long, default_value_t = DEFAULT_FOCUS_DISTANCE)]
    focus_distance: f32,

    /// Maximum distance at which an object can be picked up
    #[arg(long, default_value_t = DEFAULT_PICKUP_DISTANCE)]
    pickup_distance: f32,

    #[arg(long, default_value_t = DEFAULT_THROW_SPEED)]
    throw_speed: f32,

    /// Seconds between two throws of the same character
    #[arg(long, default_value_t = DEFAULT_THROW_COOLDOWN)]
    throw_cooldown: f32,

    /// Simulation ticks per second
    #[arg(long, default_value_t = 60)]
    tick_rate: u32,
}

fn main() {
    let args = Args::parse();

    let config = InteractionConfig {
        focus_distance: args.focus_distance,
        pickup_distance: args.pickup_distance,
        throw_speed: args.throw_speed,
        throw_cooldown: args.throw_cooldown,
    };
    let settings = WorldSettings {
        max_players: args.max_players,
        ..Default::default()
    };
    let session = WorldSession::generate(args.world.clone(), args.seed, config, settings);

    let addr = format!("0.0.0.0:{}", args.port);
    let transport = match TcpServerTransport::bind(&addr) {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("Failed to listen on {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    println!("Listening on {}", transport.local_addr());

    let tick = Duration::from_secs_f64(1.0 / f64::from(args.tick_rate.max(1)));

    App::new()
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(tick)))
        .add_plugins(bevy::log::LogPlugin::default())
        .add_plugins(ServerPlugin::new(transport, session))
        .run();
}
