//! Wire behaviour of the REST blob backend against a local HTTP server

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docstore::file_storage::{BlobBackend, BlobEntry, BlobError, HttpBlobBackend};
use docstore::{Document, DocumentStore, EmulatedStore};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const TOKEN: &str = "tok";

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
struct FormField {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: String,
}

/// Blob REST endpoint kept in memory
#[derive(Default)]
struct BlobServer {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
    requests: Mutex<Vec<Recorded>>,
    write_status: AtomicU16,
    stall_writes: AtomicBool,
}

impl BlobServer {
    async fn start() -> (Arc<Self>, String) {
        let server = Arc::new(Self::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let accepting = Arc::clone(&server);
        let origin = base.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let server = Arc::clone(&accepting);
                let origin = origin.clone();
                tokio::spawn(async move {
                    let _ = server.serve(stream, &origin).await;
                });
            }
        });
        (server, base)
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn stored(&self, key: &str) -> Option<Value> {
        let blobs = self.blobs.lock().unwrap();
        blobs.get(key).map(|b| serde_json::from_slice(b).unwrap())
    }

    async fn serve(&self, mut stream: TcpStream, origin: &str) -> io::Result<()> {
        let request = read_request(&mut stream).await?;
        self.requests.lock().unwrap().push(request.clone());

        if request.method == "POST" && self.stall_writes.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(30)).await;
            return Ok(());
        }

        let (status, body) = self.respond(&request, origin);
        let head = format!(
            concat!(
                "HTTP/1.1 {} X\r\n",
                "content-type: application/json\r\n",
                "content-length: {}\r\n",
                "connection: close\r\n\r\n",
            ),
            status,
            body.len()
        );
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(&body).await?;
        stream.shutdown().await
    }

    fn respond(&self, request: &Recorded, origin: &str) -> (u16, Vec<u8>) {
        if let Some(prefix) = request.target.strip_prefix("/?prefix=") {
            let prefix = prefix.replace("%2F", "/");
            let blobs = self.blobs.lock().unwrap();
            let listed: Vec<Value> = blobs
                .keys()
                .filter(|key| key.starts_with(&prefix))
                .map(|key| {
                    json!({
                        "url": format!("{}/files/{}", origin, key),
                        "pathname": key,
                        "uploadedAt": "2024-05-01T10:00:00.000Z",
                    })
                })
                .collect();
            return (200, json!({ "blobs": listed }).to_string().into_bytes());
        }

        if let Some(key) = request.target.strip_prefix("/files/") {
            return match self.blobs.lock().unwrap().get(key) {
                Some(body) => (200, body.clone()),
                None => (404, b"{}".to_vec()),
            };
        }

        if request.method == "POST" {
            let status = match self.write_status.load(Ordering::SeqCst) {
                0 => 200,
                configured => configured,
            };
            if (200..300).contains(&status) {
                let fields = form_fields(request);
                let pathname = field(&fields, "pathname").data.clone();
                let file = field(&fields, "file").data.clone();
                self.blobs.lock().unwrap().insert(pathname, file.into_bytes());
            }
            return (status, b"{}".to_vec());
        }

        (404, b"{}".to_vec())
    }
}

async fn read_request(stream: &mut TcpStream) -> io::Result<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let mut request = Recorded {
        method,
        target,
        headers,
        body: buf[head_end + 4..].to_vec(),
    };

    let length = request.header("content-length").map(|v| v.parse::<usize>().unwrap());
    let chunked = request
        .header("transfer-encoding")
        .map_or(false, |v| v.contains("chunked"));

    if let Some(length) = length {
        while request.body.len() < length {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            request.body.extend_from_slice(&chunk[..n]);
        }
    } else if chunked {
        while !request.body.ends_with(b"0\r\n\r\n") {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            request.body.extend_from_slice(&chunk[..n]);
        }
        request.body = dechunk(&request.body);
    }
    Ok(request)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn dechunk(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = raw;
    while let Some(line_end) = find(rest, b"\r\n") {
        let size_line = String::from_utf8_lossy(&rest[..line_end]).to_string();
        let size_hex = size_line.split(';').next().unwrap().trim();
        let size = usize::from_str_radix(size_hex, 16).unwrap();
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        out.extend_from_slice(&rest[start..start + size]);
        rest = &rest[start + size + 2..];
    }
    out
}

fn quoted(header: &str, attr: &str) -> Option<String> {
    let marker = format!("; {}=\"", attr);
    let start = header.find(&marker)? + marker.len();
    let end = header[start..].find('"')? + start;
    Some(header[start..end].to_string())
}

fn form_fields(request: &Recorded) -> Vec<FormField> {
    let content_type = request.header("content-type").unwrap();
    let boundary = content_type.split("boundary=").nth(1).unwrap().trim_matches('"');
    let body = String::from_utf8_lossy(&request.body).to_string();

    body.split(&format!("--{}", boundary))
        .filter_map(|segment| {
            let segment = segment.strip_prefix("\r\n")?;
            let (head, data) = segment.split_once("\r\n\r\n")?;
            let mut disposition = None;
            let mut part_type = None;
            for line in head.split("\r\n") {
                let (name, value) = line.split_once(':')?;
                match name.trim().to_ascii_lowercase().as_str() {
                    "content-disposition" => disposition = Some(value.trim().to_string()),
                    "content-type" => part_type = Some(value.trim().to_string()),
                    _ => {}
                }
            }
            let disposition = disposition?;
            Some(FormField {
                name: quoted(&disposition, "name")?,
                filename: quoted(&disposition, "filename"),
                content_type: part_type,
                data: data.strip_suffix("\r\n").unwrap_or(data).to_string(),
            })
        })
        .collect()
}

fn field<'a>(fields: &'a [FormField], name: &str) -> &'a FormField {
    fields
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("missing form field {}", name))
}

fn backend(base: &str, timeout: Duration) -> HttpBlobBackend {
    HttpBlobBackend::new(base, TOKEN, timeout).unwrap()
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

#[tokio::test]
async fn list_sends_prefix_and_bearer_token() {
    let (server, base) = BlobServer::start().await;
    server
        .blobs
        .lock()
        .unwrap()
        .insert("db/orders.json".to_string(), b"[]".to_vec());

    let entries = backend(&base, Duration::from_secs(5))
        .list("db/orders.json")
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].pathname, "db/orders.json");
    assert!(entries[0].uploaded_at.is_some());

    let requests = server.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].target, "/?prefix=db%2Forders.json");
    assert_eq!(requests[0].header("authorization"), Some("Bearer tok"));
}

#[tokio::test]
async fn read_fetches_blob_url_without_auth() {
    let (server, base) = BlobServer::start().await;
    server
        .blobs
        .lock()
        .unwrap()
        .insert("db/orders.json".to_string(), b"[{\"id\":\"a\"}]".to_vec());

    let entry = BlobEntry {
        url: format!("{}/files/db/orders.json", base),
        pathname: "db/orders.json".to_string(),
        uploaded_at: None,
    };
    let body = backend(&base, Duration::from_secs(5)).read(&entry).await.unwrap();

    assert_eq!(body, b"[{\"id\":\"a\"}]");
    let requests = server.requests();
    assert_eq!(requests[0].target, "/files/db/orders.json");
    assert!(requests[0].header("authorization").is_none());
}

#[tokio::test]
async fn write_uploads_multipart_form() {
    let (server, base) = BlobServer::start().await;
    server.write_status.store(201, Ordering::SeqCst);

    backend(&base, Duration::from_secs(5))
        .write("db/orders.json", b"[{\"id\":\"a\"}]".to_vec())
        .await
        .unwrap();

    let requests = server.requests();
    let upload = &requests[0];
    assert_eq!(upload.method, "POST");
    assert_eq!(upload.target, "/");
    assert_eq!(upload.header("authorization"), Some("Bearer tok"));
    assert!(upload
        .header("content-type")
        .unwrap()
        .starts_with("multipart/form-data"));

    let fields = form_fields(upload);
    let file = field(&fields, "file");
    assert_eq!(file.filename.as_deref(), Some("db/orders.json"));
    assert_eq!(file.content_type.as_deref(), Some("application/json"));
    assert_eq!(file.data, "[{\"id\":\"a\"}]");
    assert_eq!(field(&fields, "pathname").data, "db/orders.json");
    assert_eq!(field(&fields, "access").data, "public");
}

#[tokio::test]
async fn write_rejected_status_is_an_error() {
    let (server, base) = BlobServer::start().await;
    server.write_status.store(500, Ordering::SeqCst);

    let result = backend(&base, Duration::from_secs(5))
        .write("db/orders.json", b"[]".to_vec())
        .await;

    assert!(matches!(
        result,
        Err(BlobError::Status { operation: "write", status: 500 })
    ));
}

#[tokio::test]
async fn store_persists_through_rest_api() {
    let (server, base) = BlobServer::start().await;
    let store = EmulatedStore::new(Arc::new(backend(&base, Duration::from_secs(5))));

    let id = store
        .insert_one("orders", doc(json!({"status": "paid", "total": 10})))
        .await
        .unwrap()
        .inserted_id;

    assert_eq!(
        server.stored("db/orders.json"),
        Some(json!([{"id": id, "status": "paid", "total": 10}]))
    );

    let reopened = EmulatedStore::new(Arc::new(backend(&base, Duration::from_secs(5))));
    let found = reopened
        .find_one("orders", &doc(json!({"id": id})))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found["total"], 10);
}

#[tokio::test]
async fn server_error_on_upload_fails_mutation() {
    let (server, base) = BlobServer::start().await;
    let store = EmulatedStore::new(Arc::new(backend(&base, Duration::from_secs(5))));
    store
        .insert_one("orders", doc(json!({"status": "paid"})))
        .await
        .unwrap();

    server.write_status.store(500, Ordering::SeqCst);
    let err = store
        .insert_one("orders", doc(json!({"status": "pending"})))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "STORAGE_WRITE_FAILURE");
    assert_eq!(store.count_documents("orders", None).await.unwrap(), 1);
    let stored = server.stored("db/orders.json").unwrap();
    assert_eq!(stored.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stalled_upload_times_out_as_connectivity_failure() {
    let (server, base) = BlobServer::start().await;
    server.stall_writes.store(true, Ordering::SeqCst);
    let store = EmulatedStore::new(Arc::new(backend(&base, Duration::from_millis(300))));

    let err = store
        .insert_one("orders", doc(json!({"status": "paid"})))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "CONNECTIVITY_FAILURE");
    assert_eq!(store.count_documents("orders", None).await.unwrap(), 0);
    assert!(server.stored("db/orders.json").is_none());
}
