//! Minimal one-shot HTTP servers for driving the update flow locally.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

/// Serve one canned HTTP response on a local port and return its base URL.
pub fn serve_once(response: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local listener");
    let addr = listener.local_addr().expect("local addr");
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}")
}

/// Build a minimal HTTP/1.1 response with the given status line and body.
pub fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Release feed JSON with a single downloadable asset.
pub fn release_json(tag: &str, notes: &str, download_url: &str) -> String {
    format!(
        r#"{{ "tag_name": "{tag}", "body": "{notes}", "assets": [ {{ "browser_download_url": "{download_url}" }} ] }}"#
    )
}
