pub mod ability;
pub mod authority;
pub mod systems;
pub mod world_session;

use std::sync::Mutex;

use bevy::prelude::*;

use grabthrow_protocol::transport::ServerTransport;

use systems::{
    ServerTransportRes, server_process_messages, server_scan_focus, server_simulate_objects,
};
use world_session::WorldSession;

pub struct ServerPlugin {
    transport: Mutex<Option<Box<dyn ServerTransport>>>,
    session: Mutex<Option<WorldSession>>,
}

impl ServerPlugin {
    pub fn new(transport: impl ServerTransport, session: WorldSession) -> Self {
        Self {
            transport: Mutex::new(Some(Box::new(transport))),
            session: Mutex::new(Some(session)),
        }
    }
}

impl Plugin for ServerPlugin {
    fn build(&self, app: &mut App) {
        let transport = self.transport.lock().ok().and_then(|mut t| t.take());
        let session = self.session.lock().ok().and_then(|mut s| s.take());
        let (Some(transport), Some(session)) = (transport, session) else {
            error!("ServerPlugin built twice, ignoring");
            return;
        };

        info!(
            "World '{}' (seed={}, objects={})",
            session.name,
            session.seed,
            session.objects.objects.len()
        );

        app.insert_resource(ServerTransportRes(transport))
            .insert_resource(session)
            .add_systems(
                Update,
                (
                    server_process_messages,
                    server_scan_focus.after(server_process_messages),
                    server_simulate_objects.after(server_scan_focus),
                ),
            );
    }
}
