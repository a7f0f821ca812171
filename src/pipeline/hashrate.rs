// Hashrate Extraction
//
// Pattern-matches XMRig telemetry lines for the current hashrate. The
// "speed" report form is tried before the "hashrate:" form; the first
// numeric value wins, paired with the nearest following unit token.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::HashrateSample;

// e.g. "speed 10s/60s/15m 1234.5 5678.9 n/a H/s max 9999.9 H/s"
static SPEED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)speed\s+(?:10s/60s/15m\s+)?([0-9]+(?:\.[0-9]+)?).*?([kMGT]?H/s)").unwrap()
});

// e.g. "hashrate: 812.7 kH/s"
static HASHRATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)hashrate\s*[:=]?\s*([0-9]+(?:\.[0-9]+)?)\s*([kMGT]?H/s)").unwrap()
});

/// Extract a hashrate sample from an escape-stripped output line
pub fn extract_hashrate(line: &str) -> Option<HashrateSample> {
    let caps = SPEED_RE.captures(line).or_else(|| HASHRATE_RE.captures(line))?;
    let value = caps.get(1)?.as_str().trim().to_string();
    let unit = caps.get(2)?.as_str().trim().to_string();
    Some(HashrateSample { value, unit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_report_takes_first_value() {
        let sample =
            extract_hashrate("miner speed 10s/60s/15m 1234.5 5678.9 n/a H/s max 9999.9 H/s")
                .unwrap();
        assert_eq!(sample.value, "1234.5");
        assert_eq!(sample.unit, "H/s");
    }

    #[test]
    fn test_speed_without_window_header() {
        let sample = extract_hashrate("speed 812.7 kH/s").unwrap();
        assert_eq!(sample.value, "812.7");
        assert_eq!(sample.unit, "kH/s");
    }

    #[test]
    fn test_hashrate_form() {
        let sample = extract_hashrate("hashrate: 42.0 MH/s").unwrap();
        assert_eq!(sample.value, "42.0");
        assert_eq!(sample.unit, "MH/s");

        let sample = extract_hashrate("Hashrate = 7 GH/s").unwrap();
        assert_eq!(sample.value, "7");
        assert_eq!(sample.unit, "GH/s");
    }

    #[test]
    fn test_speed_form_tried_first() {
        // Both patterns could match; the speed form is declared first
        let sample = extract_hashrate("speed 100.0 H/s after hashrate: 9.9 kH/s").unwrap();
        assert_eq!(sample.value, "100.0");
        assert_eq!(sample.unit, "H/s");
    }

    #[test]
    fn test_no_match() {
        assert!(extract_hashrate("accepted (1/0)").is_none());
        assert!(extract_hashrate("speed n/a").is_none());
    }
}
