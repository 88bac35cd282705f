use bevy::prelude::*;

use grabthrow_protocol::interaction::ScanOutcome;

use crate::presentation::PresentationQueue;
use crate::world::ClientWorld;

/// Local focus scan, run every frame after input so the affordance follows the view.
pub fn client_scan_focus(mut world: ResMut<ClientWorld>, mut queue: ResMut<PresentationQueue>) {
    if let Some(ScanOutcome::Focused { object, range }) = world.scan_local(&mut queue.events) {
        trace!("Focused object {} ({:?})", object, range);
    }
}
