use protocol::{parse_line, LogRecord, ParsedLine};

/// One terminal line per record: `<timestamp> <LEVEL> <name>: <message>`,
/// with the source location and exception appended when present. Raw
/// lines are printed verbatim.
pub fn render_line(line: &str) -> String {
    match parse_line(line) {
        ParsedLine::Record(record) => render_record(&record),
        ParsedLine::Raw(raw) => raw,
    }
}

pub fn render_record(record: &LogRecord) -> String {
    let mut out = format!(
        "{} {:<8} {}: {}",
        record.timestamp, record.level, record.name, record.message
    );
    if let Some(location) = location(record) {
        out.push_str(&format!(" [{location}]"));
    }
    if let Some(exception) = record.exception.as_deref() {
        if !exception.trim().is_empty() {
            out.push('\n');
            out.push_str(exception.trim_end());
        }
    }
    out
}

fn location(record: &LogRecord) -> Option<String> {
    let module = record.module.as_deref()?;
    let mut location = module.to_string();
    if let Some(function) = record.function.as_deref() {
        location.push(':');
        location.push_str(function);
    }
    if let Some(line) = record.line {
        location.push(':');
        location.push_str(&line.to_string());
    }
    Some(location)
}
