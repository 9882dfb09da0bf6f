//! Mock LP Finanças API server for tests
//!
//! Serves the three endpoints the client uses:
//! - GET /api/categories returns a fixed category list
//! - POST /api/incomes and POST /api/expenses echo the body with a new id
//!
//! A bearer token starting with `valid_` is required. Bodies whose
//! description is listed in `reject_descriptions` get a 400 with a detail.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value as JsonValue};

#[derive(Debug, Clone, Default)]
pub struct MockApiConfig {
    /// Respond 503 to every request
    pub unavailable: bool,
    pub reject_descriptions: Vec<String>,
    /// Answer creates with 201 and no body
    pub empty_created_body: bool,
}

/// Requests received so far, as (path, JSON body)
type RequestLog = Arc<Mutex<Vec<(String, JsonValue)>>>;

pub struct MockApiServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: RequestLog,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockApiServer {
    /// Start on a random free port
    pub fn start(config: MockApiConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let requests: RequestLog = Arc::default();
        let next_id = Arc::new(AtomicU64::new(1));

        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let requests_clone = requests.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        // Serve inline so ids and the request log keep arrival order
                        let _ = stream.set_nonblocking(false);
                        handle_connection(stream, &config, &requests_clone, &next_id);
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn requests(&self) -> Vec<(String, JsonValue)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read one HTTP request: head plus a Content-Length body
fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    let head_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < head_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let body = String::from_utf8_lossy(&data[head_end..]).to_string();
    Some((head, body))
}

fn handle_connection(
    mut stream: TcpStream,
    config: &MockApiConfig,
    requests: &RequestLog,
    next_id: &AtomicU64,
) {
    let Some((head, body)) = read_request(&mut stream) else {
        return;
    };

    let parts: Vec<&str> = head.lines().next().unwrap_or("").split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", r#"{"detail": "Invalid request"}"#);
        return;
    }
    let (method, path) = (parts[0], parts[1]);

    if config.unavailable {
        send_response(&mut stream, 503, "Service Unavailable", r#"{"detail": "maintenance"}"#);
        return;
    }

    let authorized = head.to_lowercase().contains("authorization: bearer valid_");
    if !authorized {
        send_response(&mut stream, 401, "Unauthorized", r#"{"detail": "Not authenticated"}"#);
        return;
    }

    match (method, path) {
        ("GET", "/api/categories") => {
            let categories = json!([
                {"id": "1", "name": "Salário", "type": "income", "is_default": true},
                {"id": "2", "name": "Outras receitas", "type": "income", "is_default": true},
                {"id": "3", "name": "Mercado", "type": "expense", "is_default": true},
                {"id": "4", "name": "Investimentos", "type": "investment", "is_default": true},
            ]);
            send_response(&mut stream, 200, "OK", &categories.to_string());
        }
        ("POST", "/api/incomes") | ("POST", "/api/expenses") => {
            let Ok(mut record) = serde_json::from_str::<JsonValue>(&body) else {
                send_response(&mut stream, 422, "Unprocessable Entity", r#"{"detail": [{"msg": "invalid JSON"}]}"#);
                return;
            };
            requests.lock().unwrap().push((path.to_string(), record.clone()));

            let description = record["description"].as_str().unwrap_or("");
            if config.reject_descriptions.iter().any(|d| d == description) {
                send_response(&mut stream, 400, "Bad Request", r#"{"detail": "duplicate transaction"}"#);
                return;
            }

            if config.empty_created_body {
                send_response(&mut stream, 201, "Created", "");
                return;
            }

            record["id"] = json!(next_id.fetch_add(1, Ordering::SeqCst));
            send_response(&mut stream, 201, "Created", &record.to_string());
        }
        _ => send_response(&mut stream, 404, "Not Found", r#"{"detail": "Not Found"}"#),
    }
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
