// SPDX-License-Identifier: MIT
pub mod format;
pub mod reader;
pub mod writer;

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use crate::error::RecordingError;
    use crate::frame::Frame;
    use crate::recording::format::RecordingMetadata;
    use crate::recording::reader::RecordingReader;
    use crate::recording::writer::RecordingWriter;
    use crate::sink::RecordingSink;

    fn make_metadata() -> RecordingMetadata {
        RecordingMetadata {
            source_index: 1,
            device: "synthetic 64x48 @ 30 fps".to_string(),
            nominal_fps: 30.0,
            recording_start: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn frames_survive_a_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Cam2_Recording1.camrec");

        let frames: Vec<Frame> = (0..5u8).map(|i| Frame::uniform(4, 3, i * 40)).collect();
        {
            let mut writer = RecordingWriter::create(&path, &make_metadata()).unwrap();
            for frame in &frames {
                writer.write_frame(frame).unwrap();
            }
            writer.finish().unwrap();
        }

        let reader = RecordingReader::open(&path).unwrap();
        assert_eq!(reader.metadata().source_index, 1);
        assert_eq!(reader.metadata().device, "synthetic 64x48 @ 30 fps");
        assert_eq!(reader.frame_count(), 5);
        for (i, expected) in frames.iter().enumerate() {
            assert_eq!(&reader.frame_at(i).unwrap().frame, expected);
        }
        let stamps: Vec<u64> = reader.frames().iter().map(|f| f.elapsed_ns).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        assert!(reader.frame_at(5).is_none());
    }

    #[test]
    fn empty_recording_has_no_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.camrec");

        let mut writer = RecordingWriter::create(&path, &make_metadata()).unwrap();
        writer.finish().unwrap();
        // second finish is harmless
        writer.finish().unwrap();
        assert!(writer.write_frame(&Frame::uniform(1, 1, 0)).is_err());

        let reader = RecordingReader::open(&path).unwrap();
        assert_eq!(reader.frame_count(), 0);
    }

    #[test]
    fn dropping_the_writer_finishes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.camrec");
        {
            let mut writer = RecordingWriter::create(&path, &make_metadata()).unwrap();
            writer.write_frame(&Frame::uniform(2, 2, 9)).unwrap();
        }
        let reader = RecordingReader::open(&path).unwrap();
        assert_eq!(reader.frame_count(), 1);
    }

    #[test]
    fn rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.camrec");
        let compressed = zstd::encode_all(&b"\x04\x00\x00\x00nope"[..], 3).unwrap();
        std::fs::write(&path, compressed).unwrap();
        assert!(RecordingReader::open(&path).is_err());

        let missing = dir.path().join("missing.camrec");
        assert!(matches!(
            RecordingReader::open(&missing),
            Err(RecordingError::Open { .. })
        ));
    }
}
