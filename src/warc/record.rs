// Logical WARC records and the HTTP head embedded in protocol records.

use crate::headers::{CanonicalHeaders, HeaderMap, HeaderValue, canonicalize};

/// Key under which the HTTP start line is stored in a nested header
/// object. The leading colon keeps it out of the HTTP field-name space.
pub const START_LINE: &str = ":start-line";

/// Record types whose block may carry an HTTP message.
pub const HTTP_RECORD_TYPES: [&str; 3] = ["request", "response", "revisit"];

/// One record from a WARC stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub headers: HeaderMap,
    /// HTTP head split off the block, for protocol-wrapped records.
    pub http: Option<HttpHead>,
    /// Block bytes after the HTTP head (the whole block otherwise).
    pub payload: Vec<u8>,
}

impl Record {
    /// The `WARC-Type` value.
    pub fn kind(&self) -> Option<&str> {
        self.headers.get("warc-type")
    }

    /// Length of the record block as it would be written.
    pub fn block_len(&self) -> usize {
        self.http.as_ref().map_or(0, |h| h.serialized_len()) + self.payload.len()
    }
}

/// Whether a record of this type and content type carries an HTTP message.
pub fn carries_http(headers: &HeaderMap) -> bool {
    let kind = headers.get("warc-type").unwrap_or_default();
    let content_type = headers.get("content-type").unwrap_or_default();
    HTTP_RECORD_TYPES
        .iter()
        .any(|t| kind.eq_ignore_ascii_case(t))
        && content_type
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("application/http")
}

// ---------------------------------------------------------------------------
// HTTP head
// ---------------------------------------------------------------------------

/// Start line and header fields of an HTTP/1.x message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHead {
    pub start_line: String,
    pub headers: HeaderMap,
}

impl HttpHead {
    /// Split an HTTP message into its head and the offset of the body.
    ///
    /// The head ends at the first empty line (CRLF or bare LF). A message
    /// with no empty line is all head. Returns `None` when the head is not
    /// UTF-8, the start line is empty, or a field line lacks a colon.
    pub fn parse(block: &[u8]) -> Option<(HttpHead, usize)> {
        let (head_end, body_start) = find_head_end(block).unwrap_or((block.len(), block.len()));
        let text = std::str::from_utf8(&block[..head_end]).ok()?;

        let mut lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
        let start_line = lines.next()?.trim_end();
        if start_line.is_empty() {
            return None;
        }

        let mut fields: Vec<(String, String)> = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            if line.starts_with([' ', '\t']) {
                let (_, value) = fields.last_mut()?;
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(line.trim());
                continue;
            }
            let (name, value) = line.split_once(':')?;
            let name = name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return None;
            }
            fields.push((name.to_string(), value.trim().to_string()));
        }

        let head = HttpHead {
            start_line: start_line.to_string(),
            headers: fields.into_iter().collect(),
        };
        Some((head, body_start))
    }

    /// Wire form: start line, fields, blank line; all CRLF terminated.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_len());
        out.extend_from_slice(self.start_line.as_bytes());
        out.extend_from_slice(b"\r\n");
        for (name, value) in self.headers.iter() {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out
    }

    pub fn serialized_len(&self) -> usize {
        let fields: usize = self
            .headers
            .iter()
            .map(|(k, v)| k.len() + 2 + v.len() + 2)
            .sum();
        self.start_line.len() + 2 + fields + 2
    }

    /// Canonical header object: canonicalized fields plus the start line.
    pub fn to_canonical(&self) -> CanonicalHeaders {
        let mut canonical = canonicalize(&self.headers);
        canonical.insert(START_LINE, HeaderValue::Text(self.start_line.clone()));
        canonical
    }

    /// Rebuild from a canonical header object. `None` when the start line
    /// is absent or not text.
    pub fn from_canonical(canonical: &CanonicalHeaders) -> Option<HttpHead> {
        let mut fields = canonical.clone();
        let start_line = match fields.remove(START_LINE)? {
            HeaderValue::Text(s) => s,
            _ => return None,
        };
        Some(HttpHead {
            start_line,
            headers: fields.to_header_map(),
        })
    }
}

/// Locate the first empty line. Returns (end of head, start of body).
fn find_head_end(block: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while let Some(pos) = block[i..].iter().position(|&b| b == b'\n') {
        let nl = i + pos;
        let next = nl + 1;
        if block[next..].starts_with(b"\r\n") {
            return Some((nl + 1, next + 2));
        }
        if block[next..].starts_with(b"\n") {
            return Some((nl + 1, next + 1));
        }
        i = next;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &[u8] =
        b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 5\r\n\r\nhello";

    #[test]
    fn parse_response_head() {
        let (head, body) = HttpHead::parse(RESPONSE).unwrap();
        assert_eq!(head.start_line, "HTTP/1.1 200 OK");
        assert_eq!(head.headers.get("content-type"), Some("text/html"));
        assert_eq!(&RESPONSE[body..], b"hello");
    }

    #[test]
    fn parse_bare_lf() {
        let msg = b"GET / HTTP/1.1\nHost: example.com\n\nbody";
        let (head, body) = HttpHead::parse(msg).unwrap();
        assert_eq!(head.start_line, "GET / HTTP/1.1");
        assert_eq!(head.headers.get("host"), Some("example.com"));
        assert_eq!(&msg[body..], b"body");
    }

    #[test]
    fn head_without_terminator_is_all_head() {
        let msg = b"GET / HTTP/1.1\r\nHost: a";
        let (head, body) = HttpHead::parse(msg).unwrap();
        assert_eq!(head.headers.get("host"), Some("a"));
        assert_eq!(body, msg.len());
    }

    #[test]
    fn folded_lines_are_joined() {
        let msg = b"HTTP/1.0 200 OK\r\nX-Long: one\r\n  two\r\n\r\n";
        let (head, _) = HttpHead::parse(msg).unwrap();
        assert_eq!(head.headers.get("x-long"), Some("one two"));
    }

    #[test]
    fn unparseable_heads() {
        assert!(HttpHead::parse(b"\r\n\r\nbody").is_none());
        assert!(HttpHead::parse(b"HTTP/1.1 200 OK\r\nno colon here\r\n\r\n").is_none());
        assert!(HttpHead::parse(b"HTTP/1.1 200 OK\r\nX: \xff\r\n\r\n").is_none());
    }

    #[test]
    fn serialize_matches_len() {
        let (head, body) = HttpHead::parse(RESPONSE).unwrap();
        let bytes = head.serialize();
        assert_eq!(bytes.len(), head.serialized_len());
        assert_eq!(bytes, &RESPONSE[..body]);
    }

    #[test]
    fn canonical_roundtrip_keeps_start_line() {
        let (head, _) = HttpHead::parse(RESPONSE).unwrap();
        let canonical = head.to_canonical();
        assert_eq!(
            canonical.get(START_LINE),
            Some(&HeaderValue::Text("HTTP/1.1 200 OK".into()))
        );
        assert_eq!(canonical.get("content-length"), Some(&HeaderValue::Integer(5)));
        let back = HttpHead::from_canonical(&canonical).unwrap();
        assert_eq!(back.start_line, head.start_line);
        assert_eq!(back.headers.get("content-length"), Some("5"));
        assert!(!back.headers.contains(START_LINE));
    }

    #[test]
    fn from_canonical_requires_start_line() {
        let canonical = canonicalize(&[("Host", "a")].into_iter().collect());
        assert!(HttpHead::from_canonical(&canonical).is_none());
    }

    #[test]
    fn http_detection() {
        let yes: HeaderMap = [
            ("WARC-Type", "response"),
            ("Content-Type", "application/http; msgtype=response"),
        ]
        .into_iter()
        .collect();
        assert!(carries_http(&yes));

        let metadata: HeaderMap = [
            ("WARC-Type", "metadata"),
            ("Content-Type", "application/http"),
        ]
        .into_iter()
        .collect();
        assert!(!carries_http(&metadata));

        let plain: HeaderMap = [("WARC-Type", "response"), ("Content-Type", "text/plain")]
            .into_iter()
            .collect();
        assert!(!carries_http(&plain));
    }
}
