use glam::{Vec2, Vec3};
use tracing::{debug, debug_span};

use crate::{
    hierarchy::reconstruct,
    mesh::unbias_bone_index,
    transform::{SceneCorrection, UvFlip},
    BoneBinding, DecodeSettings, P3m, Result, Scene, SceneBone, SceneVertex,
};

/// Rebuilds a scene from the file's arrays.
pub(crate) fn assemble(file: &P3m, settings: &DecodeSettings) -> Result<Scene> {
    let position_bones = file.position_bones();
    let angle_bones = file.angle_bones();

    let _span = debug_span!(
        "decode",
        position_bones = position_bones.len(),
        angle_bones = angle_bones.len(),
        vertices = file.vertices().len(),
        faces = file.triangles().len()
    )
    .entered();

    let skeleton = reconstruct(position_bones, angle_bones, settings.stub_length)?;
    let nodes = skeleton.nodes();

    let bones = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| SceneBone {
            name: format!("bone_{index}"),
            head: SceneCorrection::apply(node.head),
            tail: SceneCorrection::apply(node.tail),
            parent: node.parent,
            local_vector: node.local_vector,
            scale: node.scale,
            hidden: false,
        })
        .collect();

    let vertices = file
        .vertices()
        .iter()
        .enumerate()
        .map(|(index, vertex)| {
            let bone = unbias_bone_index(
                index,
                vertex.bone_index,
                position_bones.len(),
                angle_bones.len(),
            )?;

            let position = Vec3::from(vertex.position);
            let (position, binding) = match bone {
                Some(bone) => (
                    nodes[bone].head + position,
                    Some(BoneBinding {
                        bone,
                        weight: vertex.weight,
                    }),
                ),
                None => (position, None),
            };

            Ok(SceneVertex {
                position: SceneCorrection::apply(position),
                normal: SceneCorrection::apply(Vec3::from(vertex.normal)),
                uv: UvFlip::apply(Vec2::from(vertex.uv)),
                binding,
            })
        })
        .collect::<Result<_>>()?;

    let triangles = file
        .triangles()
        .iter()
        .map(|triangle| triangle.vertex_indices.map(u32::from))
        .collect();

    let mut scene = Scene {
        bones,
        vertices,
        triangles,
    };

    if settings.hide_unused_bones {
        scene.mark_unused_bones();
        debug!(
            "hid {} unused bones",
            scene.bones.iter().filter(|bone| bone.hidden).count()
        );
    }

    Ok(scene)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{AngleBone, ChildIndices, PositionBone, Triangle, Vertex, NO_INDEX};

    fn children(indices: &[u8]) -> ChildIndices {
        ChildIndices::pack(indices.iter().copied()).0
    }

    /// A root at (1, 2, 3) in the file frame with one child one unit up, skinning two
    /// vertices, plus an unbound vertex.
    fn two_bones() -> P3m {
        P3m::new(
            vec![
                PositionBone {
                    position: [1.0, 2.0, 3.0],
                    child_angle_indices: children(&[0]),
                },
                PositionBone {
                    position: [0.0, 1.0, 0.0],
                    child_angle_indices: children(&[1]),
                },
            ],
            vec![
                AngleBone {
                    local_vector: [0.5, 0.0, 0.0],
                    scale: 1.0,
                    child_position_indices: children(&[1]),
                },
                AngleBone {
                    local_vector: [0.5, 0.0, 0.0],
                    scale: 3.0,
                    child_position_indices: children(&[]),
                },
            ],
            vec![Triangle {
                vertex_indices: [0, 1, 2],
            }],
            vec![
                Vertex {
                    position: [0.0, 0.0, 0.0],
                    weight: 1.0,
                    bone_index: 2,
                    normal: [1.0, 0.0, 0.0],
                    uv: [0.0, 0.25],
                },
                Vertex {
                    position: [0.0, 0.5, 0.0],
                    weight: 0.5,
                    bone_index: 3,
                    normal: [0.0, 1.0, 0.0],
                    uv: [1.0, 1.0],
                },
                Vertex {
                    position: [4.0, 5.0, 6.0],
                    weight: 0.75,
                    bone_index: NO_INDEX,
                    normal: [0.0, 0.0, 1.0],
                    uv: [0.5, 0.5],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn bones_are_corrected_into_host_frame() {
        let scene = assemble(&two_bones(), &DecodeSettings::default()).unwrap();

        assert_eq!(scene.bones.len(), 2);
        assert_eq!(scene.bones[0].name, "bone_0");
        assert_eq!(scene.bones[0].head, Vec3::new(-1.0, 3.0, 2.0));
        assert_eq!(scene.bones[1].head, Vec3::new(-1.0, 3.0, 3.0));
        assert_eq!(scene.bones[1].parent, Some(0));

        assert_eq!(scene.bones[0].tail, scene.bones[1].head);
        assert_relative_eq!(scene.bones[1].tail, Vec3::new(-1.0, 3.0, 3.05));

        assert_eq!(scene.bones[1].local_vector, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(scene.bones[1].scale, 3.0);
    }

    #[test]
    fn vertices_are_absolute_and_bound() {
        let scene = assemble(&two_bones(), &DecodeSettings::default()).unwrap();
        let vertices = &scene.vertices;

        assert_eq!(vertices[0].position, Vec3::new(-1.0, 3.0, 2.0));
        assert_eq!(
            vertices[0].binding,
            Some(BoneBinding {
                bone: 0,
                weight: 1.0
            })
        );
        assert_eq!(vertices[0].normal, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(vertices[0].uv, Vec2::new(0.0, 0.75));

        assert_eq!(vertices[1].position, Vec3::new(-1.0, 3.0, 3.5));
        assert_eq!(vertices[1].binding.map(|binding| binding.bone), Some(1));
        assert_eq!(vertices[1].normal, Vec3::new(0.0, 0.0, 1.0));

        assert_eq!(vertices[2].position, Vec3::new(-4.0, 6.0, 5.0));
        assert_eq!(vertices[2].binding, None);

        assert_eq!(scene.triangles, [[0, 1, 2]]);
    }

    #[test]
    fn hides_bones_without_vertices() {
        let mut file = two_bones();
        let mut settings = DecodeSettings::new();
        settings.hide_unused_bones(true);

        let scene = assemble(&file, &settings).unwrap();
        assert!(scene.bones.iter().all(|bone| !bone.hidden));

        file = P3m::new(
            file.position_bones().to_vec(),
            file.angle_bones().to_vec(),
            Vec::new(),
            Vec::new(),
        )
        .unwrap();
        let scene = assemble(&file, &settings).unwrap();
        assert!(scene.bones.iter().all(|bone| bone.hidden));
    }

    #[test]
    fn bone_index_below_bias_is_invalid() {
        let file = two_bones();
        let mut vertices = file.vertices().to_vec();
        vertices[1].bone_index = 1;
        let file = P3m::new(
            file.position_bones().to_vec(),
            file.angle_bones().to_vec(),
            file.triangles().to_vec(),
            vertices,
        )
        .unwrap();

        assert_eq!(
            assemble(&file, &DecodeSettings::default()),
            Err(crate::Error::InvalidBoneIndex {
                vertex: 1,
                index: 1
            })
        );
    }
}
