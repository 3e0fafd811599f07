//! Optional sink for the raw XML exchanged with a device.

use log::warn;
use std::fs::{File, OpenOptions};
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

#[derive(Debug, Clone, Copy)]
pub struct RpcEvent<'a> {
    pub direction: Direction,
    pub message_id: Option<u64>,
    pub xml: &'a str,
}

/// Receives every message a session sends or receives.
///
/// Recording is diagnostics only; an implementation must not panic and its
/// failures never reach the RPC caller.
pub trait Recorder: Send + Sync {
    fn record(&self, event: &RpcEvent<'_>);
}

/// Appends each message to a file.
pub struct FileRecorder {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileRecorder {
    pub fn create(path: impl AsRef<Path>) -> io::Result<FileRecorder> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(FileRecorder {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Recorder for FileRecorder {
    fn record(&self, event: &RpcEvent<'_>) {
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        let header = match (event.direction, event.message_id) {
            (Direction::Sent, Some(id)) => format!("<!-- sent message-id {} -->", id),
            (Direction::Received, Some(id)) => format!("<!-- received message-id {} -->", id),
            (Direction::Sent, None) => "<!-- sent -->".to_string(),
            (Direction::Received, None) => "<!-- received -->".to_string(),
        };
        if let Err(err) = writeln!(file, "{}\n{}", header, event.xml).and_then(|_| file.flush()) {
            warn!("Could not write to log file {}: {}", self.path.display(), err);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Default)]
    pub(crate) struct MemoryRecorder {
        pub(crate) events: Mutex<Vec<(Direction, Option<u64>, String)>>,
    }

    impl Recorder for MemoryRecorder {
        fn record(&self, event: &RpcEvent<'_>) {
            self.events.lock().unwrap().push((
                event.direction,
                event.message_id,
                event.xml.to_string(),
            ));
        }
    }

    #[test]
    fn test_file_recorder_appends() {
        let path = std::env::temp_dir().join(format!("junos-netconf-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let recorder = FileRecorder::create(&path).unwrap();
        recorder.record(&RpcEvent {
            direction: Direction::Sent,
            message_id: Some(1),
            xml: "<rpc message-id=\"1\"><get-software-information/></rpc>",
        });
        recorder.record(&RpcEvent {
            direction: Direction::Received,
            message_id: None,
            xml: "<hello/>",
        });

        let contents = std::fs::read_to_string(recorder.path()).unwrap();
        assert_eq!(
            contents,
            "<!-- sent message-id 1 -->\n<rpc message-id=\"1\"><get-software-information/></rpc>\n<!-- received -->\n<hello/>\n"
        );
        std::fs::remove_file(&path).unwrap();
    }
}
