/// Integration tests for frame metadata decoding.
///
/// The per-client stride on the wire is fixed: every client occupies
/// `17 + MAX_VIEWPORTS_PER_CLIENT * 68` bytes regardless of how many
/// viewports are live, so decoding must consume an exact, predictable
/// number of bytes and must reject truncated buffers.
use scenelink_shared::{
    ByteReader, ByteWriter, ClientViewports, FrameMetadata, Rtid, Uuid, Viewport, WireError,
    MAX_VIEWPORTS_PER_CLIENT, VIEWPORT_RECORD_SIZE,
};

fn client_uuid(seed: u8) -> Uuid {
    Uuid::from_bytes([seed; 16])
}

fn identity_matrix() -> [f32; 16] {
    let mut matrix = [0f32; 16];
    for i in 0..4 {
        matrix[i * 4 + i] = 1.0;
    }
    matrix
}

fn sample_metadata(viewports_per_client: &[usize]) -> FrameMetadata {
    FrameMetadata {
        timestamp: 123_456,
        frame_counter: 789,
        clients: viewports_per_client
            .iter()
            .enumerate()
            .map(|(i, count)| ClientViewports {
                client_id: client_uuid(i as u8 + 1),
                viewports: (0..*count)
                    .map(|v| Viewport {
                        camera: Rtid::from(100 + v as u32),
                        world_from_view: identity_matrix(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[test]
fn viewport_record_size_is_sixty_eight() {
    assert_eq!(VIEWPORT_RECORD_SIZE, 68);
}

#[test]
fn decode_consumes_exactly_the_fixed_stride() {
    for client_counts in [&[][..], &[0][..], &[1][..], &[2, 0, 4][..]] {
        let metadata = sample_metadata(client_counts);
        let mut writer = ByteWriter::new();
        let written = metadata.ser(&mut writer);
        let expected = FrameMetadata::wire_size(client_counts.len());
        assert_eq!(written, expected);

        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        let decoded = FrameMetadata::de(&mut reader).unwrap();
        assert_eq!(reader.consumed(), expected);
        assert_eq!(decoded, metadata);
    }
}

#[test]
fn wire_size_matches_documented_formula() {
    for clients in 0..4usize {
        assert_eq!(
            FrameMetadata::wire_size(clients),
            9 + clients * (17 + MAX_VIEWPORTS_PER_CLIENT * 68)
        );
    }
}

#[test]
fn trailing_bytes_are_left_unread() {
    let metadata = sample_metadata(&[1]);
    let mut writer = ByteWriter::new();
    metadata.ser(&mut writer);
    writer.write_bytes(&[0xaa, 0xbb, 0xcc]);

    let bytes = writer.into_bytes();
    let mut reader = ByteReader::new(&bytes);
    FrameMetadata::de(&mut reader).unwrap();
    assert_eq!(reader.remaining(), 3);
}

#[test]
fn truncated_buffers_are_rejected() {
    let metadata = sample_metadata(&[2, 1]);
    let mut writer = ByteWriter::new();
    metadata.ser(&mut writer);
    let bytes = writer.into_bytes();

    // every proper prefix must fail
    for cut in [0, 4, 8, 9, 20, bytes.len() - 1] {
        let mut reader = ByteReader::new(&bytes[..cut]);
        assert!(
            FrameMetadata::de(&mut reader).is_err(),
            "prefix of {cut} bytes decoded"
        );
    }
}

#[test]
fn overlarge_viewport_count_is_rejected() {
    let mut writer = ByteWriter::new();
    writer.write_u32(1); // timestamp
    writer.write_u32(1); // frame counter
    writer.write_u8(1); // one client
    client_uuid(9).ser(&mut writer);
    writer.write_u8(MAX_VIEWPORTS_PER_CLIENT as u8 + 1);
    writer.write_bytes(&vec![0u8; 8 * VIEWPORT_RECORD_SIZE]);

    let bytes = writer.into_bytes();
    let mut reader = ByteReader::new(&bytes);
    assert_eq!(
        FrameMetadata::de(&mut reader),
        Err(WireError::CountExceedsCapacity {
            declared: MAX_VIEWPORTS_PER_CLIENT + 1,
            capacity: MAX_VIEWPORTS_PER_CLIENT
        })
    );
}

#[test]
fn declared_counts_never_read_past_the_buffer() {
    // claims 200 clients but carries none
    let mut writer = ByteWriter::new();
    writer.write_u32(0);
    writer.write_u32(0);
    writer.write_u8(200);

    let bytes = writer.into_bytes();
    let mut reader = ByteReader::new(&bytes);
    assert!(matches!(
        FrameMetadata::de(&mut reader),
        Err(WireError::BufferOverrun { .. })
    ));
}
