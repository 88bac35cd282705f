use bevy::prelude::*;

use grabthrow_protocol::possession::{CameraMode, Montage};
use grabthrow_protocol::protocol::{CharacterId, ObjectId};

// --- Events ---

/// The local character aims at something it can pick up right now.
#[derive(Event)]
pub struct CanInteractEvent {
    pub character: CharacterId,
}

/// The local character aims at something out of reach or not pickable.
#[derive(Event)]
pub struct CannotInteractEvent {
    pub character: CharacterId,
}

#[derive(Event)]
pub struct ItemPickedUpEvent {
    pub character: CharacterId,
    pub object: ObjectId,
}

#[derive(Event)]
pub struct ItemThrownEvent {
    pub character: CharacterId,
    pub object: ObjectId,
}

#[derive(Event)]
pub struct MontagePlayedEvent {
    pub character: CharacterId,
    pub montage: Montage,
}

#[derive(Event)]
pub struct CameraModeChangedEvent {
    pub mode: CameraMode,
}

#[derive(Event)]
pub struct CharacterJoinEvent {
    pub character_id: CharacterId,
    pub name: String,
    pub position: Vec3,
}

#[derive(Event)]
pub struct CharacterLeaveEvent {
    pub character_id: CharacterId,
}

// --- Plugin trait ---

#[allow(unused_variables)]
pub trait GrabthrowPlugin: Send + Sync + 'static {
    fn on_can_interact(&self, event: &CanInteractEvent) {}
    fn on_cannot_interact(&self, event: &CannotInteractEvent) {}
    fn on_item_picked_up(&self, event: &ItemPickedUpEvent) {}
    fn on_item_thrown(&self, event: &ItemThrownEvent) {}
    fn on_montage_played(&self, event: &MontagePlayedEvent) {}
    fn on_camera_mode_changed(&self, event: &CameraModeChangedEvent) {}
    fn on_character_join(&self, event: &CharacterJoinEvent) {}
    fn on_character_leave(&self, event: &CharacterLeaveEvent) {}
}

// --- Registry ---

#[derive(Resource)]
struct PluginRegistry {
    plugins: Vec<Box<dyn GrabthrowPlugin>>,
}

/// Systems that hand bevy events to registered plugins.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookDispatch;

// --- Dispatch systems ---

fn dispatch_can_interact(mut reader: EventReader<CanInteractEvent>, registry: Res<PluginRegistry>) {
    for event in reader.read() {
        for plugin in &registry.plugins {
            plugin.on_can_interact(event);
        }
    }
}

fn dispatch_cannot_interact(
    mut reader: EventReader<CannotInteractEvent>,
    registry: Res<PluginRegistry>,
) {
    for event in reader.read() {
        for plugin in &registry.plugins {
            plugin.on_cannot_interact(event);
        }
    }
}

fn dispatch_item_picked_up(
    mut reader: EventReader<ItemPickedUpEvent>,
    registry: Res<PluginRegistry>,
) {
    for event in reader.read() {
        for plugin in &registry.plugins {
            plugin.on_item_picked_up(event);
        }
    }
}

fn dispatch_item_thrown(mut reader: EventReader<ItemThrownEvent>, registry: Res<PluginRegistry>) {
    for event in reader.read() {
        for plugin in &registry.plugins {
            plugin.on_item_thrown(event);
        }
    }
}

fn dispatch_montage_played(
    mut reader: EventReader<MontagePlayedEvent>,
    registry: Res<PluginRegistry>,
) {
    for event in reader.read() {
        for plugin in &registry.plugins {
            plugin.on_montage_played(event);
        }
    }
}

fn dispatch_camera_mode_changed(
    mut reader: EventReader<CameraModeChangedEvent>,
    registry: Res<PluginRegistry>,
) {
    for event in reader.read() {
        for plugin in &registry.plugins {
            plugin.on_camera_mode_changed(event);
        }
    }
}

fn dispatch_character_join(
    mut reader: EventReader<CharacterJoinEvent>,
    registry: Res<PluginRegistry>,
) {
    for event in reader.read() {
        for plugin in &registry.plugins {
            plugin.on_character_join(event);
        }
    }
}

fn dispatch_character_leave(
    mut reader: EventReader<CharacterLeaveEvent>,
    registry: Res<PluginRegistry>,
) {
    for event in reader.read() {
        for plugin in &registry.plugins {
            plugin.on_character_leave(event);
        }
    }
}

// --- EventsPlugin builder ---

pub struct EventsPlugin {
    plugins: std::sync::Mutex<Vec<Box<dyn GrabthrowPlugin>>>,
}

impl EventsPlugin {
    pub fn new_with(plugins: Vec<Box<dyn GrabthrowPlugin>>) -> Self {
        Self {
            plugins: std::sync::Mutex::new(plugins),
        }
    }
}

impl Plugin for EventsPlugin {
    fn build(&self, app: &mut App) {
        let plugins = self
            .plugins
            .lock()
            .map(|mut plugins| plugins.drain(..).collect())
            .unwrap_or_default();
        app.insert_resource(PluginRegistry { plugins });

        app.add_event::<CanInteractEvent>()
            .add_event::<CannotInteractEvent>()
            .add_event::<ItemPickedUpEvent>()
            .add_event::<ItemThrownEvent>()
            .add_event::<MontagePlayedEvent>()
            .add_event::<CameraModeChangedEvent>()
            .add_event::<CharacterJoinEvent>()
            .add_event::<CharacterLeaveEvent>()
            .add_systems(
                Update,
                (
                    dispatch_can_interact,
                    dispatch_cannot_interact,
                    dispatch_item_picked_up,
                    dispatch_item_thrown,
                    dispatch_montage_played,
                    dispatch_camera_mode_changed,
                    dispatch_character_join,
                    dispatch_character_leave,
                )
                    .in_set(HookDispatch),
            );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl GrabthrowPlugin for Recorder {
        fn on_item_picked_up(&self, event: &ItemPickedUpEvent) {
            self.0
                .lock()
                .unwrap()
                .push(format!("picked {} by {}", event.object, event.character));
        }

        fn on_camera_mode_changed(&self, event: &CameraModeChangedEvent) {
            self.0.lock().unwrap().push(format!("camera {:?}", event.mode));
        }
    }

    #[test]
    fn registered_plugins_see_sent_events() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = App::new();
        app.add_plugins(EventsPlugin::new_with(vec![Box::new(Recorder(log.clone()))]));

        app.world_mut().send_event(ItemPickedUpEvent {
            character: 1,
            object: 4,
        });
        app.world_mut().send_event(CameraModeChangedEvent {
            mode: CameraMode::Throwable,
        });
        app.update();

        let log = log.lock().unwrap();
        assert!(log.contains(&"picked 4 by 1".to_string()));
        assert!(log.contains(&"camera Throwable".to_string()));
    }
}
