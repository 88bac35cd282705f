use bevy::prelude::*;

use grabthrow_protocol::protocol::ClientMessage;

use crate::ClientTransportRes;
use crate::presentation::PresentationQueue;
use crate::world::ClientWorld;

/// Introduce ourselves to the server.
pub fn client_connect(transport: Res<ClientTransportRes>, world: Res<ClientWorld>) {
    transport.0.send(ClientMessage::Connect {
        player_name: world.player_name.clone(),
    });
}

/// Receives all server messages and applies them to the client mirror.
pub fn client_receive_messages(
    transport: Res<ClientTransportRes>,
    mut world: ResMut<ClientWorld>,
    mut queue: ResMut<PresentationQueue>,
) {
    for msg in transport.0.receive() {
        world.apply(msg, &mut queue.events);
    }
}

/// Tell the server we are leaving when the app shuts down.
pub fn client_disconnect_on_exit(
    mut exit: EventReader<AppExit>,
    transport: Res<ClientTransportRes>,
    world: Res<ClientWorld>,
) {
    if exit.read().next().is_some() && world.local.is_some() {
        transport.0.send(ClientMessage::Disconnect);
    }
}
