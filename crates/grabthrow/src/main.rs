use bevy::prelude::*;
use clap::Parser;
use grabthrow_macros::grab_plugin;

use grabthrow_client::events;
use grabthrow_client::render::RenderPlugin;
use grabthrow_protocol::config::InteractionConfig;
use grabthrow_protocol::tcp_transport::TcpClientTransport;
use grabthrow_protocol::transport::create_local_transport;
use grabthrow_server::world_session::{WorldSession, WorldSettings};

#[derive(Parser)]
#[command(name = "grabthrow")]
#[command(about = "Grabthrow: pick up objects and throw them")]
struct Args {
    /// Connect to a remote server (host:port)
    #[arg(long)]
    connect: Option<String>,

    /// Player name
    #[arg(long, default_value = "Player")]
    name: String,

    /// World seed (solo mode only)
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// World name (solo mode only)
    #[arg(long, default_value = "Default World")]
    world: String,
}

struct LogPlugin;

#[grab_plugin]
impl LogPlugin {
    #[Event::ItemPickedUp]
    fn on_picked_up(&self, event: &events::ItemPickedUpEvent) {
        info!("Character {} picked up object {}", event.character, event.object);
    }

    #[Event::ItemThrown]
    fn on_thrown(&self, event: &events::ItemThrownEvent) {
        info!("Character {} threw object {}", event.character, event.object);
    }

    #[Event::MontagePlayed]
    fn on_montage(&self, event: &events::MontagePlayedEvent) {
        debug!("Character {} plays {:?}", event.character, event.montage);
    }

    #[Event::CameraModeChanged]
    fn on_camera(&self, event: &events::CameraModeChangedEvent) {
        debug!("Camera mode {:?}", event.mode);
    }

    #[Event::CharacterJoin]
    fn on_join(&self, event: &events::CharacterJoinEvent) {
        info!(
            "{} joined at ({:.0}, {:.0}, {:.0})",
            event.name, event.position.x, event.position.y, event.position.z
        );
    }

    #[Event::CharacterLeave]
    fn on_leave(&self, event: &events::CharacterLeaveEvent) {
        info!("Character {} left", event.character_id);
    }
}

fn main() {
    let args = Args::parse();

    let mut app = App::new();
    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Grabthrow".into(),
            ..default()
        }),
        ..default()
    }));

    match args.connect {
        // Network mode: connect to a remote server
        Some(addr) => {
            let transport = match TcpClientTransport::connect(&addr) {
                Ok(transport) => transport,
                Err(e) => {
                    eprintln!("Failed to connect to {}: {}", addr, e);
                    std::process::exit(1);
                }
            };

            app.add_plugins(
                grabthrow_client::ClientPlugin::new(Box::new(transport), args.name)
                    .with_plugin(LogPlugin),
            );
        }
        // Solo mode: embedded server + local transport
        None => {
            let (client_transport, server_transport) = create_local_transport();
            let session = WorldSession::generate(
                args.world,
                args.seed,
                InteractionConfig::default(),
                WorldSettings::default(),
            );

            app.add_plugins(grabthrow_server::ServerPlugin::new(server_transport, session));
            app.add_plugins(
                grabthrow_client::ClientPlugin::new(Box::new(client_transport), args.name)
                    .with_plugin(LogPlugin),
            );
        }
    }

    app.add_plugins(RenderPlugin);
    app.add_systems(Startup, setup_ambient_light);
    app.run();
}

fn setup_ambient_light(mut commands: Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 200.0,
    });
}
