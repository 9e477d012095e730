//! Fixed error-response templates, byte-for-byte compatible with the
//! status lines, content lengths, and body text of the system this proxy
//! was distilled from.

use chrono::Utc;

struct Template {
    status_line: &'static str,
    body: &'static str,
}

fn template_for(status: u16) -> Option<Template> {
    Some(match status {
        400 => Template {
            status_line: "HTTP/1.1 400 Bad Request",
            body: "<HTML><HEAD><TITLE>400 Bad Request</TITLE></HEAD>\n<BODY><H1>400 Bad Request</H1>\n</BODY></HTML>",
        },
        404 => Template {
            status_line: "HTTP/1.1 404 Not Found",
            body: "<HTML><HEAD><TITLE>404 Not Found</TITLE></HEAD>\n<BODY><H1>404 Not Found</H1>\n</BODY></HTML>",
        },
        500 => Template {
            status_line: "HTTP/1.1 500 Internal Server Error",
            body: "<HTML><HEAD><TITLE>500 Internal Server Error</TITLE></HEAD>\n<BODY><H1>500 Internal Server Error</H1>\n</BODY></HTML>",
        },
        501 => Template {
            status_line: "HTTP/1.1 501 Not Implemented",
            body: "<HTML><HEAD><TITLE>501 Not Implemented</TITLE></HEAD>\n<BODY><H1>501 Not Implemented</H1>\n</BODY></HTML>",
        },
        _ => return None,
    })
}

/// Build a complete error response, including `Date` (IMF-fixdate) and
/// `Server` headers. Returns `None` for any status this proxy does not
/// emit; 404 is provisioned here for contract parity but no accept-loop or
/// worker path currently produces it.
pub fn build_error_response(status: u16) -> Option<Vec<u8>> {
    let tpl = template_for(status)?;
    let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    let body = tpl.body;
    let text = format!(
        "{}\r\nContent-Length: {}\r\nConnection: close\r\nContent-Type: text/html\r\nDate: {date}\r\nServer: ProxyServer/1.0\r\n\r\n{body}",
        tpl.status_line,
        body.len(),
    );
    Some(text.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_400_with_matching_content_length() {
        let resp = build_error_response(400).unwrap();
        let text = String::from_utf8(resp).unwrap();
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(text.contains("Content-Length: 95\r\n"));
        assert!(text.contains("Server: ProxyServer/1.0"));
    }

    #[test]
    fn builds_501() {
        let resp = build_error_response(501).unwrap();
        let text = String::from_utf8(resp).unwrap();
        assert!(text.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
    }

    #[test]
    fn dormant_404_is_still_constructible() {
        let resp = build_error_response(404).unwrap();
        let text = String::from_utf8(resp).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn unknown_status_returns_none() {
        assert!(build_error_response(418).is_none());
    }
}
