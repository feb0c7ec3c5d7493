//! JSON event handler for structured job output
//!
//! Writes one JSON object per job event, for consumption by scripts and
//! frontends that drive discline as a subprocess.

use super::{JobEvent, JobEventHandler};
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Event handler that writes job events as JSON lines
pub struct JsonEventHandler {
    output: Mutex<Box<dyn Write + Send>>,
    include_debug: bool,
}

impl JsonEventHandler {
    /// Create a handler writing to stdout
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    /// Create a handler with a custom writer
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            output: Mutex::new(writer),
            include_debug: false,
        }
    }

    /// Also write raw `debugging_output` events
    #[must_use]
    pub fn include_debug(mut self, include: bool) -> Self {
        self.include_debug = include;
        self
    }

    fn get_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

impl JobEventHandler for JsonEventHandler {
    fn handle(&self, event: &JobEvent) {
        if !self.include_debug && matches!(event, JobEvent::DebuggingOutput { .. }) {
            return;
        }
        let Ok(mut value) = serde_json::to_value(event) else {
            return;
        };
        if let Some(object) = value.as_object_mut() {
            object.insert("timestamp".to_string(), Self::get_timestamp().into());
        }
        if let Ok(mut output) = self.output.lock() {
            if let Ok(json_str) = serde_json::to_string(&value) {
                let _ = writeln!(output, "{json_str}");
                let _ = output.flush();
            }
        }
    }
}

impl Default for JsonEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Severity;
    use std::sync::{Arc, Mutex};

    struct MockWriter {
        content: Arc<Mutex<Vec<u8>>>,
    }

    impl Write for MockWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.content.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn handler() -> (JsonEventHandler, Arc<Mutex<Vec<u8>>>) {
        let content = Arc::new(Mutex::new(Vec::new()));
        let writer = MockWriter {
            content: content.clone(),
        };
        (JsonEventHandler::with_writer(Box::new(writer)), content)
    }

    fn lines(content: &Arc<Mutex<Vec<u8>>>) -> Vec<serde_json::Value> {
        String::from_utf8(content.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_progress_json() {
        let (handler, content) = handler();
        handler.handle(&JobEvent::Percent { value: 48 });
        handler.handle(&JobEvent::ProcessedSize {
            current_kib: 12000,
            total_kib: 24690,
        });

        let parsed = lines(&content);
        assert_eq!(parsed[0]["type"], "percent");
        assert_eq!(parsed[0]["value"], 48);
        assert!(parsed[0]["timestamp"].is_u64());
        assert_eq!(parsed[1]["type"], "processed_size");
        assert_eq!(parsed[1]["total_kib"], 24690);
    }

    #[test]
    fn test_debug_output_is_filtered_by_default() {
        let (handler, content) = handler();
        handler.handle(&JobEvent::DebuggingOutput {
            tag: "readcd".to_string(),
            line: "addr: 1".to_string(),
        });
        handler.handle(&JobEvent::info("Writing image to /tmp/x.iso.", Severity::Info));
        handler.handle(&JobEvent::Finished { success: false });

        let parsed = lines(&content);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["severity"], "info");
        assert_eq!(parsed[1]["type"], "finished");
        assert_eq!(parsed[1]["success"], false);
    }
}
