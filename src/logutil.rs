//! Log hygiene helpers for raw server output.
//!
//! RCON responses routinely contain newlines and legacy `§x` color codes;
//! both are scrubbed before a response is echoed into the log stream so
//! every log record stays on one line.

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///   Truncates very long responses (over `MAX_PREVIEW` chars) with an ellipsis.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 240;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Strip legacy Minecraft `§x` formatting codes from a response body.
/// The code character following the section sign is removed with it.
pub fn strip_color_codes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '§' {
            // Swallow the format code that follows, if any.
            let _ = chars.next();
        } else {
            out.push(ch);
        }
    }
    out
}
