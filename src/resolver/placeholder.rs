// Placeholder Expansion
//
// Argument-template token substitution and environment-variable expansion

use chrono::Local;
use std::path::Path;

/// Expand the recognized placeholder tokens inside an argument template.
///
/// Supported placeholders:
///   {APP_DIR} {DATE} {TIME} {DATETIME}
///   {XMRIG_CONFIG} full path of the generated config
///   {XMRIG_CONFIG_NAME} filename only
/// Unrecognized tokens are left verbatim. Environment references are
/// expanded afterwards by `expand_env_vars`.
pub fn expand_placeholders(template: &str, app_dir: &Path, config_path: Option<&Path>) -> String {
    let now = Local::now();

    let config_full = config_path
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let config_name = config_path
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config.generated.json".to_string());

    let out = template
        .replace("{APP_DIR}", &app_dir.to_string_lossy())
        .replace("{DATE}", &now.format("%Y-%m-%d").to_string())
        .replace("{TIME}", &now.format("%H:%M:%S").to_string())
        .replace("{DATETIME}", &now.format("%Y-%m-%d_%H-%M-%S").to_string())
        .replace("{XMRIG_CONFIG}", &config_full)
        .replace("{XMRIG_CONFIG_NAME}", &config_name);

    expand_env_vars(&out)
}

/// Expand OS-style environment references from the current environment.
///
/// Windows uses `%NAME%`; elsewhere `$NAME` and `${NAME}`. References to
/// unset variables stay verbatim.
pub fn expand_env_vars(s: &str) -> String {
    #[cfg(windows)]
    {
        expand_percent_vars(s)
    }
    #[cfg(not(windows))]
    {
        expand_dollar_vars(s)
    }
}

#[cfg(any(windows, test))]
fn expand_percent_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(val) if !name.is_empty() => out.push_str(&val),
                    _ => {
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(any(not(windows), test))]
fn expand_dollar_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let rest = &s[i + 1..];
        if let Some(stripped) = rest.strip_prefix('{') {
            if let Some(end) = stripped.find('}') {
                let name = &stripped[..end];
                match std::env::var(name) {
                    Ok(val) if !name.is_empty() => out.push_str(&val),
                    _ => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                // Skip the consumed "{name}"
                for _ in 0..end + 2 {
                    chars.next();
                }
                continue;
            }
            out.push('$');
            continue;
        }

        let name_len = rest
            .char_indices()
            .take_while(|(_, ch)| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if name_len == 0 {
            out.push('$');
            continue;
        }
        let name = &rest[..name_len];
        match std::env::var(name) {
            Ok(val) => out.push_str(&val),
            Err(_) => {
                out.push('$');
                out.push_str(name);
            }
        }
        for _ in 0..name_len {
            chars.next();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_config_name_placeholder() {
        let cfg = PathBuf::from("/opt/miners/xmrig/config.generated.json");
        let out = expand_placeholders(
            "--config {XMRIG_CONFIG_NAME}",
            Path::new("/opt/app"),
            Some(&cfg),
        );
        assert_eq!(out, "--config config.generated.json");
    }

    #[test]
    fn test_config_name_defaults_without_generated_file() {
        let out = expand_placeholders("--config {XMRIG_CONFIG_NAME}", Path::new("/opt/app"), None);
        assert_eq!(out, "--config config.generated.json");
    }

    #[test]
    fn test_app_dir_and_unknown_tokens() {
        let out = expand_placeholders("{APP_DIR}/data {NOT_A_TOKEN}", Path::new("/opt/app"), None);
        assert_eq!(out, "/opt/app/data {NOT_A_TOKEN}");
    }

    #[test]
    fn test_date_placeholder_shape() {
        let out = expand_placeholders("--log {DATE}", Path::new("/"), None);
        let date = out.strip_prefix("--log ").unwrap();
        assert_eq!(date.len(), 10);
        assert_eq!(&date[4..5], "-");
        assert_eq!(&date[7..8], "-");
    }

    #[test]
    fn test_dollar_vars_expand_and_unknown_stay() {
        std::env::set_var("MINER_PANEL_TEST_VAR", "hello");
        assert_eq!(expand_dollar_vars("$MINER_PANEL_TEST_VAR/x"), "hello/x");
        assert_eq!(expand_dollar_vars("${MINER_PANEL_TEST_VAR}y"), "helloy");
        assert_eq!(expand_dollar_vars("$MINER_PANEL_UNSET_VAR"), "$MINER_PANEL_UNSET_VAR");
        assert_eq!(expand_dollar_vars("100$"), "100$");
    }

    #[test]
    fn test_percent_vars_expand_and_unknown_stay() {
        std::env::set_var("MINER_PANEL_TEST_VAR", "hello");
        assert_eq!(expand_percent_vars("%MINER_PANEL_TEST_VAR%\\x"), "hello\\x");
        assert_eq!(expand_percent_vars("%MINER_PANEL_UNSET%"), "%MINER_PANEL_UNSET%");
        assert_eq!(expand_percent_vars("50%"), "50%");
    }
}
