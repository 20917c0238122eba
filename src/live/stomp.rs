//! Minimal STOMP 1.2 text frame codec.
//!
//! Only what a subscribe-only client needs: CONNECT and SUBSCRIBE going out,
//! CONNECTED / MESSAGE / ERROR / RECEIPT coming in. Heart-beats are disabled in
//! the handshake, but a bare end-of-line from the server still decodes as
//! "no frame".

use color_eyre::eyre::{eyre, Result};

const NULL: char = '\0';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// First value wins when a header repeats.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn connect(host: &str) -> Self {
        Frame::new("CONNECT")
            .header("accept-version", "1.2")
            .header("host", host)
            .header("heart-beat", "0,0")
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new("SUBSCRIBE")
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    pub fn disconnect() -> Self {
        Frame::new("DISCONNECT")
    }

    pub fn encode(&self) -> String {
        let raw_headers = escapes_disabled(&self.command);
        let mut out = String::with_capacity(self.command.len() + self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            if raw_headers {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            } else {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(NULL);
        out
    }
}

/// CONNECT and CONNECTED frames carry headers verbatim.
fn escapes_disabled(command: &str) -> bool {
    matches!(command, "CONNECT" | "CONNECTED")
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

fn unescape(s: &str) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => return Err(eyre!("Invalid STOMP header escape: \\{}", other.unwrap_or(' '))),
        }
    }
    Ok(out)
}

/// Decodes one frame. Returns `Ok(None)` for a heart-beat (only end-of-line
/// characters).
pub fn decode(text: &str) -> Result<Option<Frame>> {
    let text = text.trim_start_matches(['\r', '\n']);
    if text.is_empty() {
        return Ok(None);
    }

    let (head, rest) = split_head(text).ok_or_else(|| eyre!("STOMP frame without header terminator"))?;
    let mut lines = head.lines();
    let command = lines
        .next()
        .map(str::trim_end)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| eyre!("STOMP frame without command"))?
        .to_string();
    let raw_headers = escapes_disabled(&command);

    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| eyre!("Malformed STOMP header line: {line}"))?;
        if raw_headers {
            headers.push((name.to_string(), value.to_string()));
        } else {
            headers.push((unescape(name)?, unescape(value)?));
        }
    }

    let frame = Frame {
        command,
        headers,
        body: String::new(),
    };
    let body = match frame.get("content-length").and_then(|n| n.trim().parse::<usize>().ok()) {
        Some(len) if len <= rest.len() && rest.is_char_boundary(len) => &rest[..len],
        _ => rest.split(NULL).next().unwrap_or_default(),
    };
    Ok(Some(Frame {
        body: body.to_string(),
        ..frame
    }))
}

fn split_head(text: &str) -> Option<(&str, &str)> {
    let lf = text.find("\n\n").map(|i| (i, 2));
    let crlf = text.find("\r\n\r\n").map(|i| (i, 4));
    let (at, sep) = match (lf, crlf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Some((&text[..at], &text[at + sep..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn connect_frame_wire_format() {
        assert_eq!(
            Frame::connect("localhost").encode(),
            "CONNECT\naccept-version:1.2\nhost:localhost\nheart-beat:0,0\n\n\0"
        );
    }

    #[test]
    fn subscribe_frame_escapes_headers() {
        let encoded = Frame::subscribe("sub-0", "/topic/a:b").encode();
        assert_eq!(
            encoded,
            "SUBSCRIBE\nid:sub-0\ndestination:/topic/a\\cb\nack:auto\n\n\0"
        );
    }

    #[test]
    fn decode_message_frame() {
        let raw = "MESSAGE\ndestination:/topic/new-test-run\nmessage-id:1\nsubscription:sub-0\n\n{\"id\":\"r1\"}\0";
        let frame = decode(raw).unwrap().unwrap();
        assert_eq!(frame.command, "MESSAGE");
        assert_eq!(frame.get("destination"), Some("/topic/new-test-run"));
        assert_eq!(frame.body, "{\"id\":\"r1\"}");
    }

    #[test]
    fn decode_honours_content_length() {
        let raw = "MESSAGE\ncontent-length:2\n\nab\0trailing";
        assert_eq!(decode(raw).unwrap().unwrap().body, "ab");
    }

    #[test]
    fn decode_crlf_frames() {
        let raw = "CONNECTED\r\nversion:1.2\r\n\r\n\0";
        let frame = decode(raw).unwrap().unwrap();
        assert_eq!(frame.command, "CONNECTED");
        assert_eq!(frame.get("version"), Some("1.2"));
    }

    #[test]
    fn heartbeat_is_not_a_frame() {
        assert_eq!(decode("\n").unwrap(), None);
        assert_eq!(decode("\r\n\r\n").unwrap(), None);
    }

    #[test]
    fn header_unescaping() {
        let raw = "ERROR\nmessage:bad\\cthing\\nhappened\n\n\0";
        let frame = decode(raw).unwrap().unwrap();
        assert_eq!(frame.get("message"), Some("bad:thing\nhappened"));
    }

    #[test]
    fn bad_escape_is_error() {
        assert!(decode("ERROR\nmessage:oops\\t\n\n\0").is_err());
    }

    #[test]
    fn missing_terminator_is_error() {
        assert!(decode("MESSAGE\ndestination:/x").is_err());
    }
}
