#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb};
use qrcode::QrCode;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use qrtrace::config::BrowserOptions;
use qrtrace::{Browser, BrowserLauncher, Error, QrTraceConfig, Result};

// ── HTTP stub ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

type Handler = dyn Fn(&Request) -> (u16, String) + Send + Sync + 'static;

pub struct StubServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl StubServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = Arc::clone(&handler);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let _ = serve(stream, handler, log).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve(
    mut stream: TcpStream,
    handler: Arc<Handler>,
    log: Arc<Mutex<Vec<Request>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or("").split_whitespace();
    let method = request_line.next().unwrap_or("").to_string();
    let path = request_line.next().unwrap_or("").to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    let request = Request {
        method,
        path,
        headers,
        body,
    };
    let (status, body) = handler(&request);
    log.lock().unwrap().push(request);

    let reason = if (200..300).contains(&status) { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Decode an `application/x-www-form-urlencoded` value.
pub fn form_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                match u8::from_str_radix(hex, 16) {
                    Ok(b) => out.push(b),
                    Err(_) => out.extend_from_slice(&bytes[i..i + 3]),
                }
                i += 2;
            }
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}

// ── Fake reputation service ──────────────────────────────────────────────────

/// A reputation service stand-in.
///
/// Submissions whose URL contains `bad` are rejected with HTTP 500. Analyses
/// for URLs containing `lost` answer 404. URLs containing `huge` report a
/// malicious count of `u64::MAX`. URLs containing `evil` score 3/20,
/// everything else 0/70.
pub async fn reputation_stub() -> StubServer {
    let submitted: Mutex<Vec<String>> = Mutex::new(Vec::new());

    StubServer::start(move |req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/api/v3/urls") => {
            let url = req
                .body
                .strip_prefix("url=")
                .map(form_decode)
                .unwrap_or_default();
            if url.contains("bad") {
                return (500, json!({"error": {"code": "InternalError"}}).to_string());
            }
            let mut submitted = submitted.lock().unwrap();
            submitted.push(url);
            let id = format!("an-{}", submitted.len());
            (200, json!({"data": {"type": "analysis", "id": id}}).to_string())
        }
        ("GET", path) if path.starts_with("/api/v3/analyses/an-") => {
            let index: usize = path["/api/v3/analyses/an-".len()..].parse().unwrap_or(0);
            let submitted = submitted.lock().unwrap();
            let Some(url) = index.checked_sub(1).and_then(|i| submitted.get(i)) else {
                return (404, json!({"error": {"code": "NotFoundError"}}).to_string());
            };
            if url.contains("lost") {
                return (404, json!({"error": {"code": "NotFoundError"}}).to_string());
            }
            let stats = if url.contains("huge") {
                json!({"malicious": u64::MAX, "suspicious": 1, "undetected": 0, "harmless": 0, "timeout": 0})
            } else if url.contains("evil") {
                json!({"malicious": 2, "suspicious": 1, "undetected": 5, "harmless": 12, "timeout": 0})
            } else {
                json!({"malicious": 0, "suspicious": 0, "undetected": 10, "harmless": 60, "timeout": 0})
            };
            (
                200,
                json!({
                    "meta": {"url_info": {"id": format!("uid-{index}"), "url": url}},
                    "data": {"id": format!("an-{index}"), "type": "analysis",
                             "attributes": {"status": "completed", "stats": stats}}
                })
                .to_string(),
            )
        }
        _ => (404, "{}".to_string()),
    })
    .await
}

/// Configuration pointing at `stub` and writing into `dir`.
pub fn test_config(stub: &StubServer, dir: &Path) -> QrTraceConfig {
    let mut config = QrTraceConfig::default();
    config.reputation.api_key = Some("test-key".into());
    config.reputation.urls_endpoint = stub.url("/api/v3/urls");
    config.reputation.analyses_endpoint = stub.url("/api/v3/analyses");
    config.reputation.report_base_url = "https://report.test/gui/url/".into();
    config.browser.driver_path = Some(PathBuf::from("/unused/chromedriver"));
    config.browser.settle_delay_secs = 0;
    config.output.images_dir = dir.join("generated_images");
    config.output.docs_dir = dir.join("generated_docs");
    config
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn write_qr(dir: &Path, name: &str, data: &str) -> PathBuf {
    let code = QrCode::new(data.as_bytes()).expect("encode qr");
    let image = code.render::<Luma<u8>>().min_dimensions(400, 400).build();
    let path = dir.join(name);
    DynamicImage::ImageLuma8(image).save(&path).expect("save qr");
    path
}

pub fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(w, h, Rgb([200u8, 30, 30]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

// ── Fake browser ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct BrowserLog {
    pub visited: Mutex<Vec<String>>,
    pub screenshots: AtomicUsize,
    pub quit: AtomicBool,
    pub launches: AtomicUsize,
}

pub struct FakeBrowser {
    log: Arc<BrowserLog>,
    fail_on: Option<usize>,
}

impl FakeBrowser {
    /// `fail_on`: zero-based index of the screenshot that errors.
    pub fn new(log: Arc<BrowserLog>, fail_on: Option<usize>) -> Self {
        Self { log, fail_on }
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.log.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let index = self.log.screenshots.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(index) {
            return Err(Error::Browser("renderer crashed".into()));
        }
        Ok(png_bytes(16, 9))
    }

    async fn quit(&mut self) -> Result<()> {
        self.log.quit.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeLauncher {
    pub log: Arc<BrowserLog>,
    pub fail_on: Option<usize>,
}

impl FakeLauncher {
    pub fn new(fail_on: Option<usize>) -> Self {
        Self {
            log: Arc::new(BrowserLog::default()),
            fail_on,
        }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, _options: &BrowserOptions) -> Result<Box<dyn Browser>> {
        self.log.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBrowser::new(Arc::clone(&self.log), self.fail_on)))
    }
}
