pub mod events;
pub mod interaction;
pub mod network;
pub mod player;
pub mod presentation;
pub mod render;
pub mod world;

use std::sync::Mutex;

use bevy::prelude::*;
use grabthrow_protocol::transport::ClientTransport;

use events::{EventsPlugin, HookDispatch};
use interaction::client_scan_focus;
use network::{client_connect, client_disconnect_on_exit, client_receive_messages};
use player::{InputSettings, InputState, client_handle_input};
use presentation::{PresentationQueue, flush_presentation};
use world::ClientWorld;

/// Bevy Resource wrapping a boxed ClientTransport.
#[derive(Resource)]
pub struct ClientTransportRes(pub Box<dyn ClientTransport>);

/// The client plugin composes all client-side functionality:
/// the world mirror, input and prediction, local focus and presentation hooks.
///
/// Rendering lives in [`render::RenderPlugin`] so headless clients can skip it.
pub struct ClientPlugin {
    transport: Mutex<Option<Box<dyn ClientTransport>>>,
    player_name: String,
    event_plugins: Mutex<Vec<Box<dyn events::GrabthrowPlugin>>>,
}

impl ClientPlugin {
    pub fn new(transport: Box<dyn ClientTransport>, player_name: impl Into<String>) -> Self {
        Self {
            transport: Mutex::new(Some(transport)),
            player_name: player_name.into(),
            event_plugins: Mutex::new(Vec::new()),
        }
    }

    pub fn with_plugin(self, plugin: impl events::GrabthrowPlugin) -> Self {
        if let Ok(mut plugins) = self.event_plugins.lock() {
            plugins.push(Box::new(plugin));
        }
        self
    }
}

impl Plugin for ClientPlugin {
    fn build(&self, app: &mut App) {
        let Some(transport) = self.transport.lock().ok().and_then(|mut t| t.take()) else {
            error!("ClientPlugin built twice, ignoring");
            return;
        };

        let event_plugins = self
            .event_plugins
            .lock()
            .map(|mut plugins| plugins.drain(..).collect())
            .unwrap_or_default();

        app.insert_resource(ClientTransportRes(transport))
            .insert_resource(ClientWorld::new(self.player_name.clone()))
            .init_resource::<PresentationQueue>()
            .init_resource::<InputState>()
            .init_resource::<InputSettings>()
            .add_plugins(EventsPlugin::new_with(event_plugins))
            .configure_sets(Update, HookDispatch.after(flush_presentation))
            .add_systems(Startup, client_connect)
            .add_systems(
                Update,
                (
                    client_receive_messages,
                    client_handle_input
                        .after(client_receive_messages)
                        .run_if(resource_exists::<ButtonInput<KeyCode>>),
                    client_scan_focus.after(client_handle_input),
                    flush_presentation.after(client_scan_focus),
                ),
            )
            .add_systems(Last, client_disconnect_on_exit);
    }
}
