//! Reply parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses the collected lines of one reply.
///
/// Continuation lines use `-` after the code, the final line uses a space:
/// `250-mx.example.com` … `250 SMTPUTF8`.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if there are no lines, the code is not
/// numeric, or the lines disagree on the code.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let first = lines
        .first()
        .ok_or_else(|| Error::Protocol("empty reply".into()))?;

    let code_str = first
        .get(0..3)
        .ok_or_else(|| Error::Protocol(format!("reply too short: {first}")))?;
    let code = code_str
        .parse::<u16>()
        .map_err(|_| Error::Protocol(format!("invalid reply code: {code_str}")))?;

    let mut message = Vec::with_capacity(lines.len());
    for line in lines {
        if line.get(0..3) != Some(code_str) {
            return Err(Error::Protocol(format!("inconsistent reply line: {line}")));
        }
        match line.len() {
            3 => message.push(String::new()),
            n if n >= 4 => message.push(line[4..].to_string()),
            _ => return Err(Error::Protocol(format!("malformed reply line: {line}"))),
        }
    }

    Ok(Reply::new(ReplyCode::new(code), message))
}

/// Returns true if `line` ends a reply (a bare code or code + space).
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.len() == 3 || (line.len() >= 4 && line.as_bytes()[3] == b' ')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn single_line_reply() {
        let reply = parse_reply(&lines(&["220 mx.example.com ESMTP ready"])).unwrap();
        assert_eq!(reply.code, ReplyCode::SERVICE_READY);
        assert_eq!(reply.message, vec!["mx.example.com ESMTP ready"]);
    }

    #[test]
    fn multi_line_ehlo_reply() {
        let reply = parse_reply(&lines(&[
            "250-mx.example.com greets you",
            "250-STARTTLS",
            "250 AUTH PLAIN LOGIN",
        ]))
        .unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.message.len(), 3);
        assert_eq!(reply.message[2], "AUTH PLAIN LOGIN");
    }

    #[test]
    fn bare_code_line() {
        let reply = parse_reply(&lines(&["250"])).unwrap();
        assert_eq!(reply.message, vec![String::new()]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_reply(&[]).is_err());
        assert!(parse_reply(&lines(&["OK"])).is_err());
        assert!(parse_reply(&lines(&["abc hello"])).is_err());
        assert!(parse_reply(&lines(&["250-first", "251 second"])).is_err());
    }

    #[test]
    fn last_line_detection() {
        assert!(is_last_reply_line("250 OK"));
        assert!(is_last_reply_line("250"));
        assert!(!is_last_reply_line("250-PIPELINING"));
    }
}
