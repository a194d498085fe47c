use super::*;

fn push_floats(bytes: &mut Vec<u8>, floats: &[f32]) {
    for float in floats {
        bytes.extend_from_slice(&float.to_le_bytes());
    }
}

fn push_children(bytes: &mut Vec<u8>, children: &[u8]) {
    let mut slots = [NO_INDEX; MAX_CHILDREN];
    slots[..children.len()].copy_from_slice(children);
    bytes.extend_from_slice(&slots);
    bytes.extend_from_slice(&[0, 0]);
}

/// One bone at the origin bound to a unit triangle, assembled field by field.
fn single_bone_triangle() -> Vec<u8> {
    let mut bytes = b"Perfect 3D Model (Ver 0.5)\0".to_vec();
    bytes.extend_from_slice(&[1, 1]);

    push_floats(&mut bytes, &[0.0, 0.0, 0.0]);
    push_children(&mut bytes, &[0]);

    push_floats(&mut bytes, &[0.0, 0.0, 0.0, 1.0]);
    push_children(&mut bytes, &[0]);

    bytes.extend_from_slice(&3_u16.to_le_bytes());
    bytes.extend_from_slice(&1_u16.to_le_bytes());
    bytes.extend_from_slice(&[0; RESERVED_LEN]);

    for index in [0_u16, 1, 2] {
        bytes.extend_from_slice(&index.to_le_bytes());
    }

    for position in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        push_floats(&mut bytes, &position);
        push_floats(&mut bytes, &[1.0]);
        bytes.push(1);
        bytes.extend_from_slice(&[0; 3]);
        push_floats(&mut bytes, &[0.0, 1.0, 0.0]);
        push_floats(&mut bytes, &[position[0], position[1]]);
    }

    bytes
}

#[test]
fn record_sizes_match_layout() {
    assert_eq!(size_of::<Header>(), 29);
    assert_eq!(size_of::<RawPositionBone>(), 24);
    assert_eq!(size_of::<RawAngleBone>(), 28);
    assert_eq!(size_of::<MeshHeader>(), 4);
    assert_eq!(size_of::<RawTriangle>(), 6);
    assert_eq!(size_of::<RawVertex>(), 40);
}

#[test]
fn parse_single_bone_triangle() {
    let bytes = single_bone_triangle();
    let file = P3m::parse(&bytes).unwrap();

    assert_eq!(file.position_bones().len(), 1);
    assert_eq!(file.angle_bones().len(), 1);

    let position_bone = file.position_bones()[0];
    assert_eq!(position_bone.position, [0.0, 0.0, 0.0]);
    assert_eq!(position_bone.child_angle_indices.iter().collect::<Vec<_>>(), [0]);

    let angle_bone = file.angle_bones()[0];
    assert_eq!(angle_bone.local_vector, [0.0, 0.0, 0.0]);
    assert_eq!(angle_bone.scale, 1.0);
    assert_eq!(angle_bone.child_position_indices.len(), 1);

    assert_eq!(file.triangles(), [Triangle { vertex_indices: [0, 1, 2] }]);

    let vertices = file.vertices();
    assert_eq!(vertices.len(), 3);
    assert_eq!(vertices[1].position, [1.0, 0.0, 0.0]);
    assert_eq!(vertices[1].bone_index, 1);
    assert_eq!(vertices[2].uv, [0.0, 1.0]);

    assert!(file.reserved().iter().all(|&b| b == 0));
    assert_eq!(file.byte_len(), bytes.len());
}

#[test]
fn writes_back_byte_for_byte() {
    let bytes = single_bone_triangle();
    let file = P3m::parse(&bytes).unwrap();
    assert_eq!(file.to_bytes(), bytes);
}

#[test]
fn reserved_block_is_preserved() {
    let mut bytes = single_bone_triangle();
    let reserved_start = 29 + 24 + 28 + 4;
    bytes[reserved_start..reserved_start + 8].copy_from_slice(b"skin.dds");

    let file = P3m::parse(&bytes).unwrap();
    assert_eq!(&file.reserved()[..8], b"skin.dds");
    assert_eq!(file.to_bytes(), bytes);
}

#[test]
fn sparse_child_slots_survive() {
    let mut bytes = single_bone_triangle();
    // second slot used, first slot empty
    bytes[29 + 12] = NO_INDEX;
    bytes[29 + 13] = 0;

    let file = P3m::parse(&bytes).unwrap();
    let children = file.position_bones()[0].child_angle_indices;
    assert_eq!(children.iter().collect::<Vec<_>>(), [0]);
    assert_eq!(file.to_bytes(), bytes);
}

#[test]
fn rejects_wrong_magic() {
    let mut bytes = single_bone_triangle();
    bytes[24] = b'6';

    assert_eq!(
        P3m::parse(&bytes),
        Err(Error::MalformedHeader {
            magic: "Perfect 3D Model (Ver 0.6)".to_owned()
        })
    );
}

#[test]
fn rejects_short_garbage_as_malformed() {
    assert!(matches!(
        P3m::parse(b"PK\x03\x04"),
        Err(Error::MalformedHeader { .. })
    ));
}

#[test]
fn empty_buffer_is_truncated() {
    assert!(matches!(
        P3m::parse(&[]),
        Err(Error::TruncatedBuffer {
            section: "header",
            ..
        })
    ));
}

#[test]
fn truncation_reports_section() {
    let bytes = single_bone_triangle();

    let cases = [
        (40, "position bones"),
        (29 + 24 + 10, "angle bones"),
        (29 + 24 + 28 + 2, "mesh header"),
        (29 + 24 + 28 + 4 + 100, "reserved block"),
        (bytes.len() - 40 * 3 - 1, "triangles"),
        (bytes.len() - 1, "vertices"),
    ];

    for (len, expected) in cases {
        match P3m::parse(&bytes[..len]) {
            Err(Error::TruncatedBuffer { section, .. }) => {
                assert_eq!(section, expected, "truncated at {len}");
            }
            other => panic!("truncated at {len}: expected eof, got {other:?}"),
        }
    }
}

#[test]
fn declared_counts_past_end_are_truncated() {
    let mut bytes = single_bone_triangle();
    // claim 200 angle bones
    bytes[28] = 200;

    assert!(matches!(
        P3m::parse(&bytes),
        Err(Error::TruncatedBuffer {
            section: "angle bones",
            ..
        })
    ));
}

#[test]
fn trailing_bytes_are_ignored() {
    let mut bytes = single_bone_triangle();
    let expected = P3m::parse(&bytes).unwrap();
    bytes.extend_from_slice(&[0xde, 0xad]);

    assert_eq!(P3m::parse(&bytes).unwrap(), expected);
}

#[test]
fn new_writes_zeroed_padding_and_reserved() {
    let (children, dropped) = ChildIndices::pack([0]);
    assert_eq!(dropped, 0);

    let file = P3m::new(
        vec![PositionBone {
            position: [0.0, 0.0, 0.0],
            child_angle_indices: children,
        }],
        vec![AngleBone {
            local_vector: [0.0, 0.0, 0.0],
            scale: 1.0,
            child_position_indices: children,
        }],
        vec![Triangle {
            vertex_indices: [0, 1, 2],
        }],
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
            .into_iter()
            .map(|position| Vertex {
                position,
                weight: 1.0,
                bone_index: 1,
                normal: [0.0, 1.0, 0.0],
                uv: [position[0], position[1]],
            })
            .collect(),
    )
    .unwrap();

    assert_eq!(file.to_bytes(), single_bone_triangle());
}

#[test]
fn pack_drops_children_past_capacity() {
    let (children, dropped) = ChildIndices::pack(0..13);

    assert_eq!(dropped, 3);
    assert_eq!(children.len(), MAX_CHILDREN);
    assert_eq!(children.iter().last(), Some(9));
    assert!(ChildIndices::EMPTY.is_empty());
}

#[test]
fn new_checks_capacity() {
    let bone = AngleBone {
        local_vector: [0.0; 3],
        scale: 1.0,
        child_position_indices: ChildIndices::EMPTY,
    };

    assert!(P3m::new(Vec::new(), vec![bone; MAX_BONES], Vec::new(), Vec::new()).is_ok());
    assert_eq!(
        P3m::new(Vec::new(), vec![bone; MAX_BONES + 1], Vec::new(), Vec::new()),
        Err(Error::CapacityExceeded {
            what: "angle bone",
            count: 256,
            limit: 255
        })
    );
}
