use bevy::prelude::*;

use grabthrow_protocol::transport::ServerTransport;

use crate::world_session::WorldSession;

/// Bevy Resource wrapping a boxed ServerTransport.
#[derive(Resource)]
pub struct ServerTransportRes(pub Box<dyn ServerTransport>);

/// Process all incoming client messages and produce authoritative responses.
pub fn server_process_messages(
    time: Res<Time>,
    mut session: ResMut<WorldSession>,
    transport: Res<ServerTransportRes>,
) {
    session.tick += 1;
    let now = time.elapsed_secs_f64();

    for (client_id, msg) in transport.0.receive() {
        session.handle_message(client_id, msg, transport.0.as_ref(), now);
    }
}

/// Refresh every character's focus from authority state.
pub fn server_scan_focus(mut session: ResMut<WorldSession>) {
    session.scan_focus();
}

/// Simulate thrown and carried objects.
pub fn server_simulate_objects(
    time: Res<Time>,
    mut session: ResMut<WorldSession>,
    transport: Res<ServerTransportRes>,
) {
    session.simulate(time.delta_secs(), transport.0.as_ref());
}
