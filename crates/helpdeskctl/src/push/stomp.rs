//! STOMP 1.2 frame codec
//!
//! Frames travel inside WebSocket text messages: `COMMAND\nheader:value\n\nbody\0`.
//! One message may carry several frames, and a bare EOL is a heart-beat.

use std::time::Duration;

/// Errors decoding an inbound message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StompError {
    #[error("Frame has no command line")]
    MissingCommand,

    #[error("Malformed header line {0:?}")]
    MalformedHeader(String),

    #[error("Frame is not NUL-terminated")]
    Unterminated,
}

/// One STOMP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Something read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Heartbeat,
    Frame(Frame),
}

impl Frame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value for `name`; repeated headers keep the first occurrence
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// CONNECT with our heart-beat offer (`outgoing,incoming` in ms)
    pub fn connect(host: &str, heartbeat: (u64, u64)) -> Self {
        Frame::new("CONNECT")
            .header("accept-version", "1.2")
            .header("host", host)
            .header("heart-beat", format!("{},{}", heartbeat.0, heartbeat.1))
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new("SUBSCRIBE")
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Frame::new("UNSUBSCRIBE").header("id", id)
    }

    pub fn disconnect() -> Self {
        Frame::new("DISCONNECT")
    }

    /// Serialize, NUL terminator included
    pub fn encode(&self) -> String {
        let escape = escapes_headers(&self.command);
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

/// CONNECT and CONNECTED headers are sent raw
fn escapes_headers(command: &str) -> bool {
    !matches!(command, "CONNECT" | "CONNECTED")
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            Some('\\') => out.push('\\'),
            // Undefined escapes are kept verbatim
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Decode everything in one WebSocket text message
pub fn decode(message: &str) -> Result<Vec<Inbound>, StompError> {
    let mut out = Vec::new();
    let mut rest = message;

    loop {
        let trimmed = rest.trim_start_matches(['\r', '\n']);
        if trimmed.len() != rest.len() {
            out.push(Inbound::Heartbeat);
        }
        if trimmed.is_empty() {
            break;
        }

        let Some(end) = trimmed.find('\0') else {
            return Err(StompError::Unterminated);
        };
        out.push(Inbound::Frame(parse_frame(&trimmed[..end])?));
        rest = &trimmed[end + 1..];
    }

    Ok(out)
}

fn parse_frame(raw: &str) -> Result<Frame, StompError> {
    let (head, body) = match raw.find("\n\n") {
        Some(pos) => (&raw[..pos], &raw[pos + 2..]),
        None => match raw.find("\r\n\r\n") {
            Some(pos) => (&raw[..pos], &raw[pos + 4..]),
            None => (raw, ""),
        },
    };

    let mut lines = head.lines();
    let command = lines
        .next()
        .map(|line| line.trim_end_matches('\r').trim())
        .filter(|line| !line.is_empty())
        .ok_or(StompError::MissingCommand)?
        .to_string();

    let escape = escapes_headers(&command);
    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| StompError::MalformedHeader(line.to_string()))?;
        if escape {
            headers.push((unescape_header(name), unescape_header(value)));
        } else {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    Ok(Frame {
        command,
        headers,
        body: body.to_string(),
    })
}

/// Negotiated heart-beat intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// How often we must send something; `None` disables
    pub outgoing: Option<Duration>,
    /// How often the server promised to send something; `None` disables
    pub incoming: Option<Duration>,
}

/// Combine our `(cx, cy)` offer with the server's `heart-beat:sx,sy`
///
/// Each direction is 0 (off) if either side says 0, otherwise the larger value.
pub fn negotiate_heartbeat(client: (u64, u64), server_header: Option<&str>) -> Heartbeat {
    let (sx, sy) = server_header
        .and_then(|raw| {
            let (x, y) = raw.split_once(',')?;
            Some((x.trim().parse::<u64>().ok()?, y.trim().parse::<u64>().ok()?))
        })
        .unwrap_or((0, 0));
    let (cx, cy) = client;

    let pick = |ours: u64, theirs: u64| {
        if ours == 0 || theirs == 0 {
            None
        } else {
            Some(Duration::from_millis(ours.max(theirs)))
        }
    };

    Heartbeat {
        outgoing: pick(cx, sy),
        incoming: pick(cy, sx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_frame_layout() {
        let raw = Frame::connect("backend", (4000, 4000)).encode();
        assert_eq!(
            raw,
            "CONNECT\naccept-version:1.2\nhost:backend\nheart-beat:4000,4000\n\n\0"
        );
    }

    #[test]
    fn test_subscribe_frame_layout() {
        let raw = Frame::subscribe("sub-0", "/topic/admin/updates").encode();
        assert!(raw.starts_with("SUBSCRIBE\n"));
        assert!(raw.contains("id:sub-0\n"));
        assert!(raw.contains("destination:/topic/admin/updates\n"));
        assert!(raw.ends_with("\n\n\0"));
    }

    #[test]
    fn test_decode_message_frame() {
        let raw = "MESSAGE\ndestination:/topic/admin/alerts\nsubscription:sub-1\nmessage-id:7\ncontent-type:application/json\n\n{\"ticketCode\":\"SBSC-1\"}\0";
        let decoded = decode(raw).unwrap();
        assert_eq!(decoded.len(), 1);
        let Inbound::Frame(frame) = &decoded[0] else {
            panic!("expected a frame");
        };
        assert_eq!(frame.command, "MESSAGE");
        assert_eq!(frame.get("destination"), Some("/topic/admin/alerts"));
        assert_eq!(frame.get("subscription"), Some("sub-1"));
        assert_eq!(frame.body, "{\"ticketCode\":\"SBSC-1\"}");
    }

    #[test]
    fn test_decode_heartbeats_and_multiple_frames() {
        let raw = "\nCONNECTED\nversion:1.2\nheart-beat:0,0\n\n\0\nRECEIPT\nreceipt-id:1\n\n\0";
        let decoded = decode(raw).unwrap();
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[0], Inbound::Heartbeat);
        assert!(matches!(&decoded[1], Inbound::Frame(f) if f.command == "CONNECTED"));
        assert_eq!(decoded[2], Inbound::Heartbeat);
        assert!(matches!(&decoded[3], Inbound::Frame(f) if f.command == "RECEIPT"));

        assert_eq!(decode("\n").unwrap(), vec![Inbound::Heartbeat]);
        assert_eq!(decode("\r\n").unwrap(), vec![Inbound::Heartbeat]);
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_crlf_frame() {
        let raw = "ERROR\r\nmessage:Bad login\r\n\r\ndetails\0";
        let decoded = decode(raw).unwrap();
        let Inbound::Frame(frame) = &decoded[0] else {
            panic!("expected a frame");
        };
        assert_eq!(frame.command, "ERROR");
        assert_eq!(frame.get("message"), Some("Bad login"));
        assert_eq!(frame.body, "details");
    }

    #[test]
    fn test_header_escapes() {
        let raw = "MESSAGE\nmessage:a\\cb\\nc\\\\d\n\n\0";
        let decoded = decode(raw).unwrap();
        let Inbound::Frame(frame) = &decoded[0] else {
            panic!("expected a frame");
        };
        assert_eq!(frame.get("message"), Some("a:b\nc\\d"));

        let encoded = Frame::new("SEND").header("x", "a:b").encode();
        assert!(encoded.contains("x:a\\cb\n"));
    }

    #[test]
    fn test_connected_headers_are_not_unescaped() {
        let raw = "CONNECTED\nserver:broker\\c1\n\n\0";
        let decoded = decode(raw).unwrap();
        let Inbound::Frame(frame) = &decoded[0] else {
            panic!("expected a frame");
        };
        assert_eq!(frame.get("server"), Some("broker\\c1"));
    }

    #[test]
    fn test_repeated_header_keeps_first() {
        let raw = "MESSAGE\nfoo:first\nfoo:second\n\n\0";
        let decoded = decode(raw).unwrap();
        let Inbound::Frame(frame) = &decoded[0] else {
            panic!("expected a frame");
        };
        assert_eq!(frame.get("foo"), Some("first"));
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode("MESSAGE\n\nbody"), Err(StompError::Unterminated));
        assert!(matches!(
            decode("MESSAGE\nbroken-header\n\n\0"),
            Err(StompError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_heartbeat_negotiation() {
        let hb = negotiate_heartbeat((4000, 4000), Some("10000,10000"));
        assert_eq!(hb.outgoing, Some(Duration::from_millis(10000)));
        assert_eq!(hb.incoming, Some(Duration::from_millis(10000)));

        let hb = negotiate_heartbeat((4000, 4000), Some("0,2000"));
        assert_eq!(hb.outgoing, Some(Duration::from_millis(4000)));
        assert_eq!(hb.incoming, None);

        let hb = negotiate_heartbeat((0, 4000), Some("1000,1000"));
        assert_eq!(hb.outgoing, None);
        assert_eq!(hb.incoming, Some(Duration::from_millis(4000)));

        let hb = negotiate_heartbeat((4000, 4000), None);
        assert_eq!(hb.outgoing, None);
        assert_eq!(hb.incoming, None);

        let hb = negotiate_heartbeat((4000, 4000), Some("garbage"));
        assert_eq!(hb.outgoing, None);
    }
}
