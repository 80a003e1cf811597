use std::time::Duration;

pub const ERROR_COLOR_ON: &str = "\x1b[31;1m";
pub const WARNING_COLOR_ON: &str = "\x1b[33;1m";
pub const SUCCESS_COLOR_ON: &str = "\x1b[32;1m";
pub const INFO_COLOR_ON: &str = "\x1b[;7m";
pub const VERBOSE_COLOR_ON: &str = "\x1b[;7m";
pub const DEBUG_COLOR_ON: &str = "\x1b[37;1m";
pub const COLOR_OFF: &str = "\x1b[0m";

/// Severity header used to decorate a line of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoration {
    Error,
    Warning,
    Success,
    Info,
    Verbose,
    Debug,
}

impl Decoration {
    pub fn header(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Success => "SUCCESS",
            Self::Info => "INFO",
            Self::Verbose => "VERBOSE",
            Self::Debug => "DEBUG",
        }
    }

    pub fn color_on(self) -> &'static str {
        match self {
            Self::Error => ERROR_COLOR_ON,
            Self::Warning => WARNING_COLOR_ON,
            Self::Success => SUCCESS_COLOR_ON,
            Self::Info => INFO_COLOR_ON,
            Self::Verbose => VERBOSE_COLOR_ON,
            Self::Debug => DEBUG_COLOR_ON,
        }
    }

    /// `"ERROR: "`, colored when the destination supports it.
    pub fn prefix(self, supports_colors: bool) -> String {
        if supports_colors {
            format!("{}{}:{} ", self.color_on(), self.header(), COLOR_OFF)
        } else {
            format!("{}: ", self.header())
        }
    }

    /// Prefix the first non-empty line and indent the remaining lines to align with it.
    pub fn decorate(self, value: &str, supports_colors: bool) -> String {
        let body_start = value.len() - value.trim_start_matches('\n').len();
        let (leading, body) = value.split_at(body_start);
        let indent = " ".repeat(self.prefix(false).len());

        let mut out = String::with_capacity(value.len() + indent.len());
        out.push_str(leading);
        out.push_str(&self.prefix(supports_colors));

        for (index, line) in body.split('\n').enumerate() {
            if index > 0 {
                out.push('\n');
                if !line.is_empty() {
                    out.push_str(&indent);
                }
            }
            out.push_str(line);
        }

        out
    }
}

/// Left-justify `value` to exactly `width` characters, replacing the middle with an ellipsis
/// when it is too long.
///
/// The split point is biased by one character when both lengths are even so that repeated
/// renders of similar strings keep the ellipsis in the same column.
pub fn bounded_ljust(value: &str, width: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();

    if len <= width {
        let mut out = String::with_capacity(value.len() + width - len);
        out.push_str(value);
        out.extend(std::iter::repeat(' ').take(width - len));
        return out;
    }

    if width < 3 {
        return "...".chars().take(width).collect();
    }

    // (len - width + 3) / 2, kept doubled to stay in integers
    let trim_doubled = len - width + 3;
    let trim_floor = trim_doubled / 2;
    let trim_ceil = trim_doubled.div_ceil(2);

    let mut midpoint = len / 2;
    if width % 2 == 0 && len % 2 == 0 {
        midpoint -= 1;
    }

    let left_end = midpoint.saturating_sub(trim_floor);
    let right_start = (midpoint + trim_ceil).min(len);

    let mut out: String = chars[..left_end].iter().collect();
    out.push_str("...");
    out.extend(&chars[right_start..]);
    out
}

/// OSC-8 terminal hyperlink.
pub fn ansi_hyperlink(url: &str, value: &str) -> String {
    format!("\x1b]8;;{url}\x1b\\{value}\x1b]8;;\x1b\\")
}

/// `file:///` url for a local path.
pub fn file_url(path: &std::path::Path) -> String {
    let display = path.to_string_lossy().replace('\\', "/");
    format!("file:///{}", display.trim_start_matches('/'))
}

/// `"no items"`, `"1 item"`, `"3 items"`.
pub fn count_noun(noun: &str, count: usize) -> String {
    match count {
        0 => format!("no {noun}s"),
        1 => format!("1 {noun}"),
        n => format!("{n} {noun}s"),
    }
}

/// `H:MM:SS` with a microsecond fraction when there is one.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let micros = elapsed.subsec_micros();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if micros == 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours}:{minutes:02}:{seconds:02}.{micros:06}")
    }
}
