// Unit tests for PCM helpers and frame chunking

use lingua_live::audio::codec;
use lingua_live::audio::FrameChunker;

#[test]
fn test_f32_to_i16_scaling_and_clamping() {
    assert_eq!(codec::f32_to_i16(0.0), 0);
    assert_eq!(codec::f32_to_i16(1.0), i16::MAX);
    assert_eq!(codec::f32_to_i16(2.5), i16::MAX);
    assert_eq!(codec::f32_to_i16(-2.5), -i16::MAX);
}

#[test]
fn test_pcm16_little_endian_packing() {
    let bytes = codec::pcm16_to_bytes(&[0x0102, -2]);
    assert_eq!(bytes, vec![0x02, 0x01, 0xFE, 0xFF]);
}

#[test]
fn test_segment_from_pcm16() {
    // 0x4000 = 16384 -> 0.5 after scaling by 1/32768
    let bytes = [0x00, 0x40, 0x00, 0xC0];
    let segment = codec::segment_from_pcm16(&bytes, 24_000);

    assert_eq!(segment.samples.len(), 2);
    assert!((segment.samples[0] - 0.5).abs() < 1e-6);
    assert!((segment.samples[1] + 0.5).abs() < 1e-6);
    assert_eq!(segment.sample_rate, 24_000);
}

#[test]
fn test_segment_duration() {
    let segment = codec::segment_from_pcm16(&vec![0u8; 48_000], 24_000);
    assert_eq!(segment.samples.len(), 24_000);
    assert!((segment.duration_secs() - 1.0).abs() < 1e-9);
}

#[test]
fn test_encoded_frame_decodes_to_same_samples() {
    let samples: Vec<i16> = (0..64).map(|i| i * 100).collect();
    let encoded = codec::encode_input_frame(&samples);

    let bytes = codec::decode_base64_chunk(&encoded).expect("valid base64");
    let segment = codec::segment_from_pcm16(&bytes, codec::INPUT_SAMPLE_RATE);

    assert_eq!(segment.samples.len(), samples.len());
    assert!((segment.samples[32] - samples[32] as f32 / 32768.0).abs() < 1e-6);
}

#[test]
fn test_decode_rejects_invalid_base64() {
    assert!(codec::decode_base64_chunk("not base64!!!").is_err());
}

#[test]
fn test_chunker_emits_fixed_size_frames() {
    let mut chunker = FrameChunker::new(100);

    assert!(chunker.push(&[0i16; 60]).is_empty());
    assert_eq!(chunker.pending_len(), 60);

    // 60 + 250 = 310 -> three full frames, 10 samples pending
    let frames = chunker.push(&[1i16; 250]);
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f.len() == 100));
    assert_eq!(chunker.pending_len(), 10);
}

#[test]
fn test_chunker_preserves_sample_order() {
    let mut chunker = FrameChunker::new(4);
    let frames = chunker.push(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);

    assert_eq!(frames, vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
    assert_eq!(chunker.pending_len(), 1);
}
