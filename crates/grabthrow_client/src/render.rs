use std::collections::HashMap;

use bevy::prelude::*;

use grabthrow_protocol::movement::{CAPSULE_HALF_HEIGHT, CAPSULE_RADIUS, view_direction, yaw_right};
use grabthrow_protocol::possession::CameraMode;
use grabthrow_protocol::protocol::{CharacterId, ObjectId};
use grabthrow_protocol::world::ObjectKind;

use crate::events::{CanInteractEvent, CannotInteractEvent, ItemPickedUpEvent, ItemThrownEvent};
use crate::world::ClientWorld;

const GROUND_SIZE: f32 = 6000.0;
/// Over-the-shoulder offsets used by the throwable camera.
const SHOULDER_BACK: f32 = 160.0;
const SHOULDER_RIGHT: f32 = 45.0;
const SHOULDER_UP: f32 = 15.0;

#[derive(Component)]
pub struct MainCamera;

#[derive(Component)]
struct AffordanceHint;

#[derive(Resource)]
struct RenderAssets {
    sphere: Handle<Mesh>,
    capsule: Handle<Mesh>,
    throwable: Handle<StandardMaterial>,
    prop: Handle<StandardMaterial>,
    character: Handle<StandardMaterial>,
}

/// Entities spawned for mirrored objects and remote characters.
#[derive(Resource, Default)]
struct Visuals {
    objects: HashMap<ObjectId, Entity>,
    characters: HashMap<CharacterId, Entity>,
}

/// Debug view of the mirrored world: spheres for objects, capsules for
/// other characters, and a camera driven by the local character.
pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Visuals>()
            .add_systems(Startup, setup_scene)
            .add_systems(
                Update,
                (
                    sync_object_visuals,
                    sync_character_visuals,
                    follow_local_character,
                    update_affordance_hint,
                ),
            );
    }
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(GROUND_SIZE, GROUND_SIZE))),
        MeshMaterial3d(materials.add(Color::srgb(0.35, 0.5, 0.3))),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 12000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.9, 0.3, 0.0)),
    ));

    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 400.0, 800.0).looking_at(Vec3::ZERO, Vec3::Y),
        MainCamera,
    ));

    commands.spawn((
        Text::new(""),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(24.0),
            left: Val::Px(24.0),
            ..default()
        },
        AffordanceHint,
    ));

    let capsule_length = CAPSULE_HALF_HEIGHT * 2.0 - CAPSULE_RADIUS * 2.0;
    commands.insert_resource(RenderAssets {
        sphere: meshes.add(Sphere::new(1.0)),
        capsule: meshes.add(Capsule3d::new(CAPSULE_RADIUS, capsule_length)),
        throwable: materials.add(Color::srgb(0.9, 0.6, 0.1)),
        prop: materials.add(Color::srgb(0.5, 0.5, 0.55)),
        character: materials.add(Color::srgb(0.2, 0.4, 0.9)),
    });
}

fn sync_object_visuals(
    mut commands: Commands,
    world: Res<ClientWorld>,
    assets: Option<Res<RenderAssets>>,
    mut visuals: ResMut<Visuals>,
    mut transforms: Query<&mut Transform>,
) {
    let Some(assets) = assets else {
        return;
    };

    for (&id, object) in &world.objects.objects {
        let scale = Vec3::splat(object.radius);
        match visuals.objects.get(&id) {
            Some(&entity) => {
                if let Ok(mut transform) = transforms.get_mut(entity) {
                    transform.translation = object.position;
                }
            }
            None => {
                let material = match object.kind {
                    ObjectKind::Throwable => assets.throwable.clone(),
                    ObjectKind::Prop => assets.prop.clone(),
                };
                let entity = commands
                    .spawn((
                        Mesh3d(assets.sphere.clone()),
                        MeshMaterial3d(material),
                        Transform::from_translation(object.position).with_scale(scale),
                    ))
                    .id();
                visuals.objects.insert(id, entity);
            }
        }
    }

    visuals.objects.retain(|id, entity| {
        let keep = world.objects.objects.contains_key(id);
        if !keep {
            commands.entity(*entity).despawn_recursive();
        }
        keep
    });
}

fn sync_character_visuals(
    mut commands: Commands,
    world: Res<ClientWorld>,
    assets: Option<Res<RenderAssets>>,
    mut visuals: ResMut<Visuals>,
    mut transforms: Query<&mut Transform>,
) {
    let Some(assets) = assets else {
        return;
    };

    for (&id, character) in &world.characters {
        if Some(id) == world.local {
            continue;
        }
        let transform = Transform::from_translation(character.position)
            .with_rotation(Quat::from_rotation_y(character.yaw));
        match visuals.characters.get(&id) {
            Some(&entity) => {
                if let Ok(mut current) = transforms.get_mut(entity) {
                    *current = transform;
                }
            }
            None => {
                let entity = commands
                    .spawn((
                        Mesh3d(assets.capsule.clone()),
                        MeshMaterial3d(assets.character.clone()),
                        transform,
                    ))
                    .id();
                visuals.characters.insert(id, entity);
            }
        }
    }

    visuals.characters.retain(|id, entity| {
        let keep = world.characters.contains_key(id);
        if !keep {
            commands.entity(*entity).despawn_recursive();
        }
        keep
    });
}

/// First person by default, over the shoulder while holding a throwable.
fn follow_local_character(
    world: Res<ClientWorld>,
    mut camera: Query<&mut Transform, With<MainCamera>>,
) {
    let Some(local) = world.local_character() else {
        return;
    };
    let Ok(mut transform) = camera.get_single_mut() else {
        return;
    };

    let eye = local.eye();
    let rotation = Quat::from_euler(EulerRot::YXZ, local.yaw, local.pitch, 0.0);
    transform.translation = match world.camera {
        CameraMode::Default => eye,
        CameraMode::Throwable => {
            eye - view_direction(local.yaw, local.pitch) * SHOULDER_BACK
                + yaw_right(local.yaw) * SHOULDER_RIGHT
                + Vec3::Y * SHOULDER_UP
        }
    };
    transform.rotation = rotation;
}

fn update_affordance_hint(
    mut ev_can: EventReader<CanInteractEvent>,
    mut ev_cannot: EventReader<CannotInteractEvent>,
    mut ev_picked_up: EventReader<ItemPickedUpEvent>,
    mut ev_thrown: EventReader<ItemThrownEvent>,
    world: Res<ClientWorld>,
    mut hint: Query<&mut Text, With<AffordanceHint>>,
) {
    let Ok(mut text) = hint.get_single_mut() else {
        return;
    };

    if ev_can.read().last().is_some() {
        text.0 = "[E] Pick up".to_string();
    }
    if ev_cannot.read().last().is_some() {
        text.0.clear();
    }
    if ev_picked_up.read().any(|e| Some(e.character) == world.local) {
        text.0 = "[Q] Throw".to_string();
    }
    if ev_thrown.read().any(|e| Some(e.character) == world.local) {
        text.0.clear();
    }
}
