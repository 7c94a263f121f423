//! On-disk segment round-trip through the real `SegmentSink`.

use reelcap_writer::format::{read_segment, SegmentRecord};
use reelcap_writer::{
    AudioStreamParams, ContainerWriter, SegmentSink, StreamParams, VideoStreamParams,
};

#[test]
fn segment_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.cap");

    let mut writer = ContainerWriter::new(SegmentSink::new());
    writer.open_video_codec("h264").unwrap();
    writer.open_audio_codec("aac").unwrap();
    writer.open_output(&path).unwrap();
    writer
        .add_video_stream(
            0,
            VideoStreamParams {
                width: 64,
                height: 32,
                frame_rate: 120,
                bit_rate: 8_000_000,
            },
        )
        .unwrap();
    writer
        .add_audio_stream(
            1,
            AudioStreamParams {
                sample_rate: 44_100,
                bit_rate: 320_000,
            },
        )
        .unwrap();
    writer.open_video(0).unwrap();
    writer.open_audio(1).unwrap();
    writer.start_output().unwrap();

    for pts in 0..3 {
        let mut guard = writer.make_frame_writable(0).unwrap();
        guard.plane_mut(0).unwrap()[0] = pts as u8;
        guard.write_video(pts).unwrap();
    }
    let mut guard = writer.make_frame_writable(1).unwrap();
    guard.samples_mut().unwrap()[0] = -7;
    guard.write_audio(0).unwrap();

    for index in [0, 1] {
        writer.finish_stream(index).unwrap();
    }
    writer.finish_output().unwrap();
    for index in [0, 1] {
        writer.close_stream(index).unwrap();
    }
    writer.close_output().unwrap();

    let records = read_segment(&path).unwrap();
    assert_eq!(records.len(), 6); // header + 3 video + 1 audio + trailer

    let SegmentRecord::Header { streams } = &records[0] else {
        panic!("first record must be the header");
    };
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].codec, "h264");
    assert!(matches!(streams[0].params, StreamParams::Video(_)));

    let SegmentRecord::VideoFrame {
        stream,
        pts,
        width,
        height,
        data,
    } = &records[1]
    else {
        panic!("expected a video frame");
    };
    assert_eq!((*stream, *pts, *width, *height), (0, 0, 64, 32));
    assert_eq!(data.len(), 64 * 32 * 3 / 2);
    assert_eq!(data[0], 0);

    let SegmentRecord::AudioFrame { samples, .. } = &records[4] else {
        panic!("expected an audio frame");
    };
    assert_eq!(samples[0], -7);

    let SegmentRecord::Trailer { frames } = &records[5] else {
        panic!("last record must be the trailer");
    };
    assert_eq!(frames.as_slice(), &[(0, 3), (1, 1)]);
}
