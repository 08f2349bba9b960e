use crate::playback::Player;
use crate::pose::{rest_pose, Pose};
use crate::render::{RenderTarget, Rig};
use crate::skeleton::{Bone, Joint, Skeleton};
use crate::transform::Transformable;
use crate::types;
use bevy::prelude::*;
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};
use std::sync::Arc;

/// Bone cylinders are this thick, in file units.
const BONE_DIAMETER: f64 = 0.5;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Resource)]
pub struct ViewerState {
    pub player: Player,
    pub rest: Pose,
    pub rest_pose_mode: bool,
    pub scale: f32,
    pub debug_text: bool,
}

impl ViewerState {
    /// Pose currently on screen.
    fn pose(&self) -> &Pose {
        if self.rest_pose_mode {
            &self.rest
        } else {
            self.player.pose()
        }
    }
}

/// The spawned sphere and cylinder entities, kept in sync with the pose.
#[derive(Resource)]
struct ViewerRig(Rig<EntityHandle>);

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn to_mat4(m: &types::Transform) -> Mat4 {
    let cols: &[f64; 16] = m.as_ref();
    Mat4::from_cols_array(&cols.map(|v| v as f32))
}

/// Sphere size relative to the unit sphere mesh: the head is drawn bigger.
fn joint_shape(joint: &Joint) -> Mat4 {
    let size = if joint.name == "Head" { 8.0 } else { 2.0 };
    Mat4::from_scale(Vec3::splat(size))
}

/// A spawned entity plus the world matrix it should show.
#[derive(Debug, Clone)]
struct EntityHandle {
    entity: Entity,
    /// Applied before the pose matrix (sphere size); identity for bones.
    shape: Mat4,
    /// File units to viewer units.
    scale: f32,
    world: Mat4,
}

impl EntityHandle {
    fn bevy_transform(&self) -> Transform {
        Transform::from_matrix(self.world)
    }
}

impl Transformable for EntityHandle {
    fn set_world_transform(&mut self, transform: &types::Transform) {
        self.world = Mat4::from_scale(Vec3::splat(self.scale)) * to_mat4(transform) * self.shape;
    }
}

/// Spawns one sphere per joint and one cylinder per bone.
struct EntitySpawner<'a, 'w, 's> {
    commands: &'a mut Commands<'w, 's>,
    sphere: Handle<Mesh>,
    cylinder: Handle<Mesh>,
    joint_material: Handle<StandardMaterial>,
    bone_material: Handle<StandardMaterial>,
    scale: f32,
}

impl EntitySpawner<'_, '_, '_> {
    fn spawn(
        &mut self,
        mesh: Handle<Mesh>,
        material: Handle<StandardMaterial>,
        shape: Mat4,
        transform: &types::Transform,
    ) -> EntityHandle {
        let mut handle = EntityHandle {
            entity: Entity::PLACEHOLDER,
            shape,
            scale: self.scale,
            world: Mat4::IDENTITY,
        };
        handle.set_world_transform(transform);
        handle.entity = self
            .commands
            .spawn(PbrBundle {
                mesh,
                material,
                transform: handle.bevy_transform(),
                ..default()
            })
            .id();
        handle
    }
}

impl RenderTarget for EntitySpawner<'_, '_, '_> {
    type Handle = EntityHandle;

    fn create_joint(&mut self, joint: &Joint, transform: &types::Transform) -> EntityHandle {
        let (mesh, material) = (self.sphere.clone(), self.joint_material.clone());
        self.spawn(mesh, material, joint_shape(joint), transform)
    }

    fn create_bone(&mut self, _bone: &Bone, transform: &types::Transform) -> EntityHandle {
        let (mesh, material) = (self.cylinder.clone(), self.bone_material.clone());
        self.spawn(mesh, material, Mat4::IDENTITY, transform)
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Opens a window replaying `skeleton`.
/// (use scale when your skeleton is in different units than meters, e.g. 0.01 for centimeters)
pub fn visualize_skeleton(skeleton: Arc<Skeleton>, scale: f32, playing: bool) {
    let rest = rest_pose(&skeleton);
    let mut player = Player::new(skeleton);
    player.set_playing(playing);

    App::new()
        .insert_resource(ViewerState {
            player,
            rest,
            rest_pose_mode: false,
            scale,
            debug_text: false,
        })
        .add_plugins(DefaultPlugins)
        .add_plugins(PanOrbitCameraPlugin)
        .add_systems(Startup, (setup, spawn_rig))
        .add_systems(
            Update,
            (update_main, sync_rig, draw_joint_axes, update_debug_text).chain(),
        )
        .run();
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

// A unit struct to help identify the debug text component, since there may be many Text components
#[derive(Component)]
struct DebugText;

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    //// Orbit camera
    commands.spawn((
        Camera3dBundle {
            transform: Transform::from_xyz(0., 1.5, 6.).looking_at(Vec3::ZERO, Vec3::Y),
            ..default()
        },
        PanOrbitCamera::default(),
    ));

    // ground plane
    commands.spawn(PbrBundle {
        mesh: meshes.add(Plane3d::default().mesh().size(5.0, 5.0)),
        material: materials.add(StandardMaterial {
            base_color: Color::rgba(1., 1., 1., 0.5),
            alpha_mode: AlphaMode::Blend,
            double_sided: true,
            cull_mode: None,
            ..default()
        }),
        ..default()
    });

    commands.spawn(
        TextBundle::from_section(
            "Press 'Space' to play / pause\n\
            Press 'R' to toggle rest pose mode\n\
            Press 'D' to toggle debug text\n\
            Press 'Left' or 'Right' to step frames\n\
            Hold 'Up' or 'Down' to change the line width\n",
            TextStyle {
                font_size: 15.,
                ..default()
            },
        )
        .with_style(Style {
            position_type: PositionType::Absolute,
            bottom: Val::Px(12.0),
            right: Val::Px(12.0),
            ..default()
        }),
    );

    commands.spawn((
        TextBundle::from_section(
            "",
            TextStyle {
                font_size: 17.,
                color: Color::rgba(1.0, 1.0, 1.0, 0.5),
                ..default()
            },
        )
        .with_style(Style {
            position_type: PositionType::Absolute,
            top: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        }),
        DebugText,
    ));
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn spawn_rig(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    state: Res<ViewerState>,
) {
    let mut spawner = EntitySpawner {
        commands: &mut commands,
        // unit diameter sphere, cylinder of height 2 and diameter 1
        sphere: meshes.add(Sphere::new(0.5)),
        cylinder: meshes.add(Cylinder::new(0.5, 2.0)),
        joint_material: materials.add(Color::WHITE),
        bone_material: materials.add(Color::YELLOW),
        scale: state.scale,
    };
    let rig = Rig::build(state.player.skeleton(), &mut spawner, BONE_DIAMETER);
    commands.insert_resource(ViewerRig(rig));
}

/// Copies the rig's world matrices onto the spawned entities.
fn sync_rig(rig: Res<ViewerRig>, mut transforms: Query<&mut Transform>) {
    let handles = rig.0.joint_handles().iter().chain(rig.0.bone_handles().map(|(_, handle)| handle));
    for handle in handles {
        if let Ok(mut transform) = transforms.get_mut(handle.entity) {
            *transform = handle.bevy_transform();
        }
    }
}

/// Draw joint axes (red, green, blue) at every joint.
fn draw_joint_axes(mut gizmos: Gizmos, state: Res<ViewerState>) {
    let length = 0.05;
    for (_, m) in state.pose().iter() {
        let m = Mat4::from_scale(Vec3::splat(state.scale)) * to_mat4(m);
        let origin = m.w_axis.truncate();
        for (column, color) in [(m.x_axis, Color::RED), (m.y_axis, Color::GREEN), (m.z_axis, Color::BLUE)] {
            let axis = column.truncate().normalize_or_zero();
            gizmos.line(origin, origin + axis * length, color);
        }
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn update_main(
    mut config_store: ResMut<GizmoConfigStore>,
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut state: ResMut<ViewerState>,
    mut rig: ResMut<ViewerRig>,
) {
    let (config, _) = config_store.config_mut::<DefaultGizmoConfigGroup>();
    if keyboard.pressed(KeyCode::ArrowUp) {
        config.line_width += 5. * time.delta_seconds();
        config.line_width = config.line_width.clamp(0., 50.);
    }
    if keyboard.pressed(KeyCode::ArrowDown) {
        config.line_width -= 5. * time.delta_seconds();
        config.line_width = config.line_width.clamp(0., 50.);
    }

    if keyboard.just_released(KeyCode::KeyR) {
        state.rest_pose_mode = !state.rest_pose_mode;
    }
    if keyboard.just_released(KeyCode::KeyD) {
        state.debug_text = !state.debug_text;
    }
    if keyboard.just_released(KeyCode::Space) {
        state.player.toggle();
    }
    if keyboard.just_released(KeyCode::ArrowRight) {
        state.player.step(1);
    }
    if keyboard.just_released(KeyCode::ArrowLeft) {
        state.player.step(-1);
    }

    let state = &mut *state;
    if state.rest_pose_mode {
        rig.0.apply(&state.rest);
    } else {
        state.player.tick_into(time.delta_seconds_f64(), &mut rig.0);
    }
}

fn update_debug_text(mut query: Query<&mut Text, With<DebugText>>, state: Res<ViewerState>) {
    let mut t = String::new();
    if state.debug_text {
        let skeleton = state.player.skeleton();
        let pose = state.pose();
        t += &format!("Frame: {} / {}\n", state.player.frame(), skeleton.num_frames());
        t += "=============== GLOBAL POSITIONS ===============\n";
        for joint in skeleton.joints() {
            if let Some(pos) = pose.position(joint.id) {
                t += &format!("{:.<20} {:8.2} {:8.2} {:8.2}\n", joint.name, pos.x, pos.y, pos.z);
            }
        }
    }
    for mut text in &mut query {
        text.sections[0].value = t.clone();
    }
}
