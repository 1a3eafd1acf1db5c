//! Shared HTTP agent and size-bounded response helpers.
//!
//! Every network touch in the update flow goes through the single agent so
//! transport timeouts stay consistent. There is deliberately no retry helper
//! here: a failed check or transfer is reported and the flow returns to idle.

use std::io::{self, Read, Write};
use std::sync::OnceLock;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Return the shared HTTP agent with consistent timeouts.
pub(crate) fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .timeout_write(WRITE_TIMEOUT)
            .build()
    })
}

/// Read a response body into memory, refusing anything over `max_bytes`.
pub(crate) fn read_response_bytes(
    response: ureq::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, io::Error> {
    reject_oversized_content_length(&response, max_bytes)?;
    let mut limited = response.into_reader().take(max_bytes as u64 + 1);
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        return Err(too_large(bytes.len()));
    }
    Ok(bytes)
}

/// Stream a response body to `writer`, refusing anything over `max_bytes`.
pub(crate) fn copy_response_to_writer(
    response: ureq::Response,
    writer: &mut impl Write,
    max_bytes: usize,
) -> Result<(), io::Error> {
    reject_oversized_content_length(&response, max_bytes)?;
    let mut limited = response.into_reader().take(max_bytes as u64 + 1);
    let mut buf = [0u8; 64 * 1024];
    let mut total = 0usize;
    loop {
        let read = limited.read(&mut buf)?;
        if read == 0 {
            break;
        }
        total += read;
        if total > max_bytes {
            return Err(too_large(total));
        }
        writer.write_all(&buf[..read])?;
    }
    Ok(())
}

fn reject_oversized_content_length(
    response: &ureq::Response,
    max_bytes: usize,
) -> Result<(), io::Error> {
    let declared = response
        .header("Content-Length")
        .and_then(|value| value.parse::<u64>().ok());
    match declared {
        Some(length) if length > max_bytes as u64 => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Response declares {length} bytes, over the {max_bytes} byte limit"),
        )),
        _ => Ok(()),
    }
}

fn too_large(seen: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Response body exceeded limit after {seen} bytes"),
    )
}


#[cfg(test)]
mod tests {
    use super::test_server::{http_response, serve_once};
    use super::*;

    #[test]
    fn read_rejects_declared_length_over_max() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nok".to_string());
        let response = agent().get(&url).call().unwrap();
        let err = read_response_bytes(response, 10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn read_rejects_undeclared_body_over_max() {
        let body = "a".repeat(32);
        let url = serve_once(format!("HTTP/1.0 200 OK\r\n\r\n{body}"));
        let response = agent().get(&url).call().unwrap();
        let err = read_response_bytes(response, 16).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn read_accepts_body_under_limit() {
        let url = serve_once(http_response("200 OK", "hello"));
        let response = agent().get(&url).call().unwrap();
        let bytes = read_response_bytes(response, 16).unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn copy_streams_body_to_writer() {
        let url = serve_once(http_response("200 OK", "artifact-bytes"));
        let response = agent().get(&url).call().unwrap();
        let mut sink = Vec::new();
        copy_response_to_writer(response, &mut sink, 64).unwrap();
        assert_eq!(sink, b"artifact-bytes");
    }

    #[test]
    fn copy_rejects_body_over_max() {
        let body = "b".repeat(40);
        let url = serve_once(format!("HTTP/1.0 200 OK\r\n\r\n{body}"));
        let response = agent().get(&url).call().unwrap();
        let mut sink = Vec::new();
        let err = copy_response_to_writer(response, &mut sink, 20).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
