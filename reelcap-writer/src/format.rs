//! Framed capture-segment records.
//!
//! A segment file is the raw on-disk container produced while recording:
//! a 6-byte magic/version preamble followed by postcard-encoded records,
//! each prefixed with a little-endian u32 length. The preview/encode layer
//! reads these back with [`read_record`].

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::stream::StreamParams;

/// File magic at the start of every segment.
pub const SEGMENT_MAGIC: [u8; 4] = *b"RCAP";

/// Current segment format version.
pub const SEGMENT_VERSION: u16 = 1;

/// One entry in the segment's stream table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub index: u32,
    /// Codec name the stream was configured with (e.g. "h264", "aac").
    pub codec: String,
    pub params: StreamParams,
}

/// A single record in a segment file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentRecord {
    /// Stream table; always the first record.
    Header { streams: Vec<StreamInfo> },
    /// One tightly packed NV12 frame.
    VideoFrame {
        stream: u32,
        pts: i64,
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
    /// One interleaved-stereo audio frame.
    AudioFrame {
        stream: u32,
        pts: i64,
        samples: Vec<i16>,
    },
    /// Per-stream frame counts; always the last record.
    Trailer { frames: Vec<(u32, u64)> },
}

/// Write the segment preamble (magic + version).
pub fn write_preamble<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(&SEGMENT_MAGIC)?;
    w.write_all(&SEGMENT_VERSION.to_le_bytes())
}

/// Read and validate the segment preamble.
pub fn read_preamble<R: Read>(r: &mut R) -> io::Result<()> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != SEGMENT_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "not a capture segment file",
        ));
    }
    let mut version = [0u8; 2];
    r.read_exact(&mut version)?;
    let version = u16::from_le_bytes(version);
    if version != SEGMENT_VERSION {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported segment version {version}"),
        ));
    }
    Ok(())
}

/// Append one length-prefixed record.
pub fn write_record<W: Write>(w: &mut W, record: &SegmentRecord) -> io::Result<()> {
    let bytes = postcard::to_stdvec(record)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(bytes.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "record too large"))?;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(&bytes)
}

/// Read the next record, or `None` at a clean end of file.
pub fn read_record<R: Read>(r: &mut R) -> io::Result<Option<SegmentRecord>> {
    let mut len = [0u8; 4];
    match r.read_exact(&mut len) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_le_bytes(len) as usize;
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes)?;
    let record = postcard::from_bytes(&bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(record))
}

/// Read every record in a segment file.
pub fn read_segment(path: &std::path::Path) -> io::Result<Vec<SegmentRecord>> {
    let mut file = io::BufReader::new(std::fs::File::open(path)?);
    read_preamble(&mut file)?;
    let mut records = Vec::new();
    while let Some(record) = read_record(&mut file)? {
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{AudioStreamParams, VideoStreamParams};

    #[test]
    fn record_roundtrip() {
        let record = SegmentRecord::VideoFrame {
            stream: 0,
            pts: 42,
            width: 4,
            height: 2,
            data: vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        };
        let mut buf = Vec::new();
        write_record(&mut buf, &record).unwrap();
        let decoded = read_record(&mut buf.as_slice()).unwrap().unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn header_roundtrip() {
        let record = SegmentRecord::Header {
            streams: vec![
                StreamInfo {
                    index: 0,
                    codec: "h264".into(),
                    params: StreamParams::Video(VideoStreamParams {
                        width: 1280,
                        height: 720,
                        frame_rate: 120,
                        bit_rate: 8_000_000,
                    }),
                },
                StreamInfo {
                    index: 1,
                    codec: "aac".into(),
                    params: StreamParams::Audio(AudioStreamParams {
                        sample_rate: 44_100,
                        bit_rate: 320_000,
                    }),
                },
            ],
        };
        let mut buf = Vec::new();
        write_record(&mut buf, &record).unwrap();
        let decoded = read_record(&mut buf.as_slice()).unwrap().unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn clean_eof_is_none() {
        let mut empty: &[u8] = &[];
        assert!(read_record(&mut empty).unwrap().is_none());
    }

    #[test]
    fn truncated_record_is_error() {
        let record = SegmentRecord::Trailer {
            frames: vec![(0, 10)],
        };
        let mut buf = Vec::new();
        write_record(&mut buf, &record).unwrap();
        buf.truncate(buf.len() - 1);
        assert!(read_record(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn preamble_rejects_foreign_magic() {
        let mut bad: &[u8] = b"MKV\x00\x01\x00";
        assert!(read_preamble(&mut bad).is_err());
    }
}
