#![allow(dead_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;
use xscan_core::prelude::*;
use zip::write::FileOptions;

pub fn write_zip(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
    for (entry, content) in entries {
        writer.start_file(*entry, FileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
    path
}

pub fn yara_rule(id: u64, name: &str, definition: &str) -> RuleDefinition {
    RuleDefinition {
        id,
        name: name.to_string(),
        scanner: ScannerKind::Yara,
        definition: Some(definition.to_string()),
        is_active: true,
    }
}

pub fn webextension_payload() -> ValidationPayload {
    ValidationPayload::new(serde_json::json!({
        "errors": 0,
        "metadata": {"is_webextension": true}
    }))
}

pub enum StubReply {
    Respond { status: u16, body: &'static str },
    /// Accept the request and never answer within `Duration`
    Hang(Duration),
}

/// One-shot HTTP server; returns its URL and the request body it received
pub fn serve_once(reply: StubReply) -> (String, Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/scan", listener.local_addr().unwrap());
    let (sender, receiver) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = match listener.accept() {
            Ok(connection) => connection,
            Err(_) => return,
        };
        let body = read_request_body(&mut stream);
        let _ = sender.send(body);

        match reply {
            StubReply::Respond { status, body } => {
                let response = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
            StubReply::Hang(duration) => thread::sleep(duration),
        }
    });

    (url, receiver)
}

fn read_request_body(stream: &mut impl Read) -> String {
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];
    loop {
        let read = stream.read(&mut buffer).unwrap_or(0);
        if read == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..read]);

        let text = String::from_utf8_lossy(&data);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            let body_start = header_end + 4;
            if data.len() >= body_start + content_length {
                return String::from_utf8_lossy(&data[body_start..body_start + content_length])
                    .into_owned();
            }
        }
    }
    String::new()
}
