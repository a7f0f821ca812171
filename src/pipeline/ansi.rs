// ANSI Styling
//
// Interprets SGR foreground-color directives in miner output lines.
// Supported: reset (0/39), 30-37, 90-97, and 38;5;N extended colors via the
// system palette, the 6x6x6 RGB cube and the grayscale ramp. Everything
// else is ignored.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{StyledLine, StyledSpan};

static ANSI_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").unwrap());
static ANSI_SGR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[([0-9;]*)m").unwrap());

/// Remove all escape sequences (and stray ESC bytes) from a line
pub fn strip_ansi(s: &str) -> String {
    ANSI_ESCAPE_RE.replace_all(s, "").replace('\x1b', "")
}

fn basic_color(code: u32) -> Option<&'static str> {
    let hex = match code {
        30 => "#000000",
        31 => "#cc0000",
        32 => "#00aa00",
        33 => "#aa8800",
        34 => "#0000cc",
        35 => "#aa00aa",
        36 => "#00aaaa",
        37 => "#cccccc",
        90 => "#666666",
        91 => "#ff4444",
        92 => "#44ff44",
        93 => "#ffff44",
        94 => "#4444ff",
        95 => "#ff44ff",
        96 => "#44ffff",
        97 => "#ffffff",
        _ => return None,
    };
    Some(hex)
}

/// Hex color for a 256-color palette index
fn color_256(n: u32) -> String {
    const SYSTEM: [&str; 16] = [
        "#000000", "#800000", "#008000", "#808000", "#000080", "#800080", "#008080", "#c0c0c0",
        "#808080", "#ff0000", "#00ff00", "#ffff00", "#0000ff", "#ff00ff", "#00ffff", "#ffffff",
    ];

    match n {
        0..=15 => SYSTEM[n as usize].to_string(),
        16..=231 => {
            let n = n - 16;
            let v = |x: u32| if x > 0 { 55 + x * 40 } else { 0 };
            let r = v((n / 36) % 6);
            let g = v((n / 6) % 6);
            let b = v(n % 6);
            format!("#{:02x}{:02x}{:02x}", r, g, b)
        }
        232..=255 => {
            let gray = 8 + (n - 232) * 10;
            format!("#{:02x}{:02x}{:02x}", gray, gray, gray)
        }
        _ => "#cccccc".to_string(),
    }
}

/// Parse a line containing SGR codes into colored spans
pub fn ansi_to_styled_line(s: &str) -> StyledLine {
    let mut spans: Vec<StyledSpan> = Vec::new();
    let mut fg: Option<String> = None;
    let mut last = 0;

    for caps in ANSI_SGR_RE.captures_iter(s) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };

        let text = &s[last..whole.start()];
        if !text.is_empty() {
            spans.push(StyledSpan { text: text.to_string(), color: fg.clone() });
        }
        last = whole.end();

        let code_str = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        let codes: Vec<&str> = if code_str.is_empty() {
            vec!["0"]
        } else {
            code_str.split(';').filter(|c| !c.is_empty()).collect()
        };
        apply_codes(&codes, &mut fg);
    }

    let tail = &s[last..];
    if !tail.is_empty() {
        spans.push(StyledSpan { text: tail.to_string(), color: fg });
    }

    StyledLine { spans }
}

fn apply_codes(codes: &[&str], fg: &mut Option<String>) {
    let mut idx = 0;
    while idx < codes.len() {
        let code = match codes[idx].parse::<u32>() {
            Ok(c) => c,
            Err(_) => {
                idx += 1;
                continue;
            }
        };

        match code {
            0 | 39 => *fg = None,
            c if basic_color(c).is_some() => *fg = basic_color(c).map(str::to_string),
            38 => {
                // 38;5;N extended foreground
                if idx + 2 < codes.len() && codes[idx + 1] == "5" {
                    if let Ok(n) = codes[idx + 2].parse::<u32>() {
                        *fg = Some(color_256(n));
                    }
                    idx += 2;
                }
            }
            _ => {}
        }
        idx += 1;
    }
}
