use tracing::{debug, debug_span, warn};

use crate::{
    dedup::{dedup_joints, JointCandidate},
    format::check_capacity,
    mesh::bias_bone_index,
    transform::{relative_in_file_frame, to_file_frame, UvFlip},
    AngleBone, BoneKind, ChildIndices, Error, P3m, PositionBone, Result, Scene, SceneBone,
    Triangle, Vertex, MAX_BONES, MAX_VERTICES, NO_INDEX,
};

/// Converts a scene into the file's bone and geometry arrays.
pub(crate) fn flatten(scene: &Scene) -> Result<P3m> {
    let _span = debug_span!(
        "encode",
        bones = scene.bones.len(),
        vertices = scene.vertices.len(),
        faces = scene.triangles.len()
    )
    .entered();

    let bones = &scene.bones;
    check_capacity("angle bone", bones.len(), MAX_BONES)?;
    validate_hierarchy(bones)?;

    let candidates = bones
        .iter()
        .enumerate()
        .map(|(index, bone)| {
            let position = match bone.parent {
                Some(parent) => relative_in_file_frame(bone.head, bones[parent].head),
                None => to_file_frame(bone.head),
            };
            JointCandidate::new(position, bone.parent, index)
        })
        .collect();
    let joints = dedup_joints(candidates);
    debug!(
        "{} angle bones share {} position bones",
        bones.len(),
        joints.len()
    );

    let mut child_joints = vec![Vec::new(); bones.len()];
    for (index, joint) in joints.iter().enumerate() {
        if let Some(parent) = joint.parent {
            child_joints[parent].push(index);
        }
    }

    let position_bones = joints
        .iter()
        .enumerate()
        .map(|(index, joint)| PositionBone {
            position: joint.position.to_array(),
            child_angle_indices: pack_children(
                &joint.angle_children,
                BoneKind::Position,
                index,
            ),
        })
        .collect();

    let angle_bones = bones
        .iter()
        .zip(&child_joints)
        .enumerate()
        .map(|(index, (bone, children))| {
            let local_vector = match bone.parent {
                Some(parent) => bone.local_vector - bones[parent].local_vector,
                None => bone.local_vector,
            };
            AngleBone {
                local_vector: local_vector.to_array(),
                scale: bone.scale,
                child_position_indices: pack_children(children, BoneKind::Angle, index),
            }
        })
        .collect();

    let vertices = scene
        .vertices
        .iter()
        .enumerate()
        .map(|(index, vertex)| {
            let (position, weight, bone_index) = match vertex.binding {
                Some(binding) => {
                    let bone = bones.get(binding.bone).ok_or(Error::InvalidBoneIndex {
                        vertex: index,
                        index: binding.bone,
                    })?;
                    (
                        relative_in_file_frame(vertex.position, bone.head),
                        binding.weight,
                        bias_bone_index(binding.bone, joints.len())?,
                    )
                }
                None => (to_file_frame(vertex.position), 1.0, NO_INDEX),
            };

            Ok(Vertex {
                position: position.to_array(),
                weight,
                bone_index,
                normal: to_file_frame(vertex.normal).to_array(),
                uv: UvFlip::apply(vertex.uv).to_array(),
            })
        })
        .collect::<Result<_>>()?;

    let triangles = scene
        .triangles
        .iter()
        .map(|triangle| {
            let mut vertex_indices = [0; 3];
            for (stored, &index) in vertex_indices.iter_mut().zip(triangle) {
                *stored = u16::try_from(index).map_err(|_| Error::CapacityExceeded {
                    what: "vertex index",
                    count: index as usize,
                    limit: MAX_VERTICES,
                })?;
            }
            Ok(Triangle { vertex_indices })
        })
        .collect::<Result<_>>()?;

    P3m::new(position_bones, angle_bones, triangles, vertices)
}

/// Checks that the parents form a single tree rooted at bone 0.
fn validate_hierarchy(bones: &[SceneBone]) -> Result<()> {
    for (index, bone) in bones.iter().enumerate() {
        let valid = match bone.parent {
            Some(parent) => index != 0 && parent < bones.len(),
            None => index == 0,
        };
        if !valid {
            return Err(if index == 0 {
                Error::CyclicHierarchy { index }
            } else {
                Error::OrphanBone {
                    kind: BoneKind::Angle,
                    index,
                }
            });
        }
    }

    for (index, bone) in bones.iter().enumerate() {
        let mut current = bone.parent;
        let mut steps = 0;

        while let Some(parent) = current {
            steps += 1;
            if steps > bones.len() {
                return Err(Error::CyclicHierarchy { index });
            }
            current = bones[parent].parent;
        }
    }

    Ok(())
}

fn pack_children(children: &[usize], kind: BoneKind, index: usize) -> ChildIndices {
    let (packed, dropped) = ChildIndices::pack(children.iter().map(|&child| child as u8));
    if dropped > 0 {
        warn!(
            "{} bone {} has {} children, dropping the last {}",
            kind,
            index,
            children.len(),
            dropped
        );
    }
    packed
}
