use serde::Serialize;

/// Two record layouts are seen in the wild; the longer one carries six commas and one more
/// numeric field ahead of the process name.
const EXTENDED_RECORD_COMMAS: usize = 6;

/// A process-start record taken from one line of the event stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessEvent {
    pub pid: i32,
    pub name: String,
}

fn is_numeric(token: &str) -> bool {
    token.parse::<i64>().is_ok()
}

/// Parses `[<seq> <pid> <uid> [<gid>] <name> ...]`, with fields separated by commas and/or
/// spaces. The leading field is discarded. The six-comma layout needs one more numeric field
/// ahead of the name; when it carries five, the extra one sits in front of the pid.
/// Returns `None` for anything else.
pub fn parse_event_line(line: &str) -> Option<ProcessEvent> {
    let line = line.trim();
    let body = line.strip_prefix('[')?;
    let body = body.strip_suffix(']').unwrap_or(body);

    let commas = body.matches(',').count();
    let body = body.replace(',', " ");
    let mut fields = body.split_whitespace();

    let mut numeric: Vec<&str> = Vec::new();
    let name = loop {
        let field = fields.next()?;
        if is_numeric(field) {
            numeric.push(field);
        } else {
            break field;
        }
    };

    let extended = commas == EXTENDED_RECORD_COMMAS;
    let min_numeric = if extended { 4 } else { 3 };
    if numeric.len() < min_numeric {
        return None;
    }
    let pid_index = if extended && numeric.len() > 4 { 2 } else { 1 };

    let pid: i32 = numeric[pid_index].parse().ok()?;
    if pid <= 0 {
        return None;
    }

    Some(ProcessEvent {
        pid,
        name: name.to_string(),
    })
}
