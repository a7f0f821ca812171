// Output Pipeline
//
// Consumes raw bytes from a child's output stream, decodes them, splits
// into lines, interprets ANSI styling or keyword colors, captures hashrate
// telemetry and fans each line out to the display and global log sinks.

pub mod ansi;
pub mod classify;
pub mod decode;
pub mod hashrate;

pub use ansi::{ansi_to_styled_line, strip_ansi};
pub use classify::classify_line;
pub use decode::decode_process_bytes;
pub use hashrate::extract_hashrate;

use std::collections::HashMap;
use std::sync::Arc;

use crate::logging;
use crate::types::{DisplaySink, HashrateSample, StyledLine};
use crate::xmrig::is_designated;

/// Render one output line: embedded ANSI styling wins; otherwise the
/// designated miner's keyword ruleset applies; otherwise no styling.
pub fn render_line(line: &str, miner_id: &str) -> StyledLine {
    if line.contains("\x1b[") {
        return ansi_to_styled_line(line);
    }
    if is_designated(miner_id) {
        if let Some(color) = classify_line(line) {
            return StyledLine::colored(line, color);
        }
    }
    StyledLine::plain(line)
}

/// Per-application pipeline state: the display sink and the last-known
/// hashrate per miner
pub struct OutputPipeline {
    display: Arc<dyn DisplaySink>,
    hashrates: HashMap<String, HashrateSample>,
}

impl OutputPipeline {
    pub fn new(display: Arc<dyn DisplaySink>) -> Self {
        OutputPipeline {
            display,
            hashrates: HashMap::new(),
        }
    }

    /// Process one read event's worth of bytes from a miner's output.
    ///
    /// Line framing is this function's responsibility: each event's decoded
    /// text is split independently and a dangling partial line is treated
    /// as complete.
    pub fn on_bytes(&mut self, miner_id: &str, bytes: &[u8]) {
        let text = decode_process_bytes(bytes);
        if text.is_empty() {
            return;
        }

        for line in text.lines() {
            let stripped = strip_ansi(line);

            if is_designated(miner_id) {
                if let Some(sample) = extract_hashrate(&stripped) {
                    self.hashrates.insert(miner_id.to_string(), sample);
                }
            }

            let styled = render_line(line, miner_id);
            self.display.append_styled_line(miner_id, &styled);

            let global = format!("[{}] {}", miner_id, stripped);
            self.display.append_global_line(&global);
            logging::log_to_file(&global);
        }
    }

    /// Last-known hashrate for a miner (no TTL; stays until overwritten)
    pub fn hashrate(&self, miner_id: &str) -> Option<&HashrateSample> {
        self.hashrates.get(miner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MinerStatus;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TestSink {
        styled: Mutex<Vec<(String, StyledLine)>>,
        global: Mutex<Vec<String>>,
    }

    impl DisplaySink for TestSink {
        fn append_styled_line(&self, miner_id: &str, line: &StyledLine) {
            self.styled.lock().unwrap().push((miner_id.to_string(), line.clone()));
        }
        fn append_global_line(&self, line: &str) {
            self.global.lock().unwrap().push(line.to_string());
        }
        fn set_status(&self, _miner_id: &str, _status: MinerStatus, _detail: &str) {}
    }

    fn pipeline() -> (Arc<TestSink>, OutputPipeline) {
        let sink = Arc::new(TestSink::default());
        let pipe = OutputPipeline::new(sink.clone());
        (sink, pipe)
    }

    #[test]
    fn test_lines_fan_out_to_both_sinks() {
        let (sink, mut pipe) = pipeline();
        pipe.on_bytes("xmrig", b"line one\nline two\n");

        let styled = sink.styled.lock().unwrap();
        assert_eq!(styled.len(), 2);
        assert_eq!(styled[0].1.plain_text(), "line one");

        let global = sink.global.lock().unwrap();
        assert_eq!(global.as_slice(), ["[xmrig] line one", "[xmrig] line two"]);
    }

    #[test]
    fn test_ansi_line_is_styled_and_log_is_clean() {
        let (sink, mut pipe) = pipeline();
        pipe.on_bytes("xmrig", b"\x1b[32mOK\x1b[0m\n");

        let styled = sink.styled.lock().unwrap();
        assert_eq!(styled[0].1.spans[0].color.as_deref(), Some("#00aa00"));

        let global = sink.global.lock().unwrap();
        assert_eq!(global[0], "[xmrig] OK");
        assert!(!global[0].contains('\x1b'));
    }

    #[test]
    fn test_keyword_color_only_for_designated_miner() {
        let (sink, mut pipe) = pipeline();
        pipe.on_bytes("xmrig", b"accepted (1/0)\n");
        pipe.on_bytes("wildrig", b"accepted (1/0)\n");

        let styled = sink.styled.lock().unwrap();
        assert_eq!(styled[0].1.spans[0].color.as_deref(), Some(classify::COLOR_SUCCESS));
        assert_eq!(styled[1].1.spans[0].color, None);
    }

    #[test]
    fn test_hashrate_captured_and_overwritten() {
        let (_sink, mut pipe) = pipeline();
        pipe.on_bytes("xmrig", b"speed 10s/60s/15m 1234.5 5678.9 n/a H/s\n");
        assert_eq!(pipe.hashrate("xmrig").unwrap().to_string(), "1234.5 H/s");

        pipe.on_bytes("xmrig", b"hashrate: 2000.0 H/s\n");
        assert_eq!(pipe.hashrate("xmrig").unwrap().to_string(), "2000.0 H/s");

        // Non-matching lines leave the sample alone
        pipe.on_bytes("xmrig", b"new job from pool\n");
        assert_eq!(pipe.hashrate("xmrig").unwrap().to_string(), "2000.0 H/s");
    }

    #[test]
    fn test_hashrate_ignored_for_other_miners() {
        let (_sink, mut pipe) = pipeline();
        pipe.on_bytes("wildrig", b"speed 500.0 H/s\n");
        assert!(pipe.hashrate("wildrig").is_none());
    }

    #[test]
    fn test_dangling_partial_line_is_processed() {
        let (sink, mut pipe) = pipeline();
        pipe.on_bytes("xmrig", b"no trailing newline");
        assert_eq!(sink.styled.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_read_is_a_no_op() {
        let (sink, mut pipe) = pipeline();
        pipe.on_bytes("xmrig", b"");
        assert!(sink.styled.lock().unwrap().is_empty());
    }
}
