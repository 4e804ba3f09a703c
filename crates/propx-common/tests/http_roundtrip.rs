use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use propx_common::{ApiClient, ApiError, HttpImageUploader, LegalKind, Session};
use propx_editor_core::{ImageFile, ImageUpload, UploadError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Answer exactly one request with `status` and a JSON `body`, returning the
/// raw request text.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.expect("read");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= head_end + 4 + length {
                    break;
                }
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.expect("write");
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });
    (format!("http://{addr}/api"), handle)
}

#[tokio::test]
async fn unauthorized_clears_session_and_fires_hook() {
    let (base, server) = serve_once("401 Unauthorized", r#"{"message":"expired"}"#).await;
    let fired = Arc::new(AtomicBool::new(false));
    let flag = fired.clone();
    let session = Session::with_unauthorized_hook(Some("stale".into()), move || {
        flag.store(true, Ordering::SeqCst);
    });
    let client = ApiClient::new(base, session.clone());

    let err = client
        .save_legal_document(LegalKind::PrivacyPolicy, "<p>x</p>")
        .await
        .expect_err("401 fails");
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(!session.is_signed_in().await);
    assert!(fired.load(Ordering::SeqCst));

    let request = server.await.expect("server");
    assert!(request.starts_with("POST /api/admin/legal-documents/privacy-policy"));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer stale"));
}

#[tokio::test]
async fn legal_document_is_fetched_without_credential() {
    let (base, server) = serve_once("200 OK", r#"{"data":{"content":"<h2>Terms</h2>"}}"#).await;
    let client = ApiClient::new(base, Session::anonymous());
    let content = client
        .legal_document(LegalKind::TermsOfService)
        .await
        .expect("fetch");
    assert_eq!(content, "<h2>Terms</h2>");

    let request = server.await.expect("server");
    assert!(request.starts_with("GET /api/legal-documents/terms-of-service"));
    assert!(!request.to_ascii_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn forbidden_save_is_reported_as_denied() {
    let (base, _server) = serve_once("403 Forbidden", "{}").await;
    let session = Session::new(Some("viewer".into()));
    let client = ApiClient::new(base, session.clone());
    let err = client
        .save_legal_document(LegalKind::TermsOfService, "<p>x</p>")
        .await
        .expect_err("403 fails");
    assert!(matches!(err, ApiError::Forbidden));
    assert!(session.is_signed_in().await);
}

#[tokio::test]
async fn uploader_sends_image_field_and_reads_url() {
    let (base, server) = serve_once(
        "201 Created",
        r#"{"success":true,"data":{"url":"https://cdn.test/blog/cat.png"}}"#,
    )
    .await;
    let client = ApiClient::new(base.clone(), Session::new(Some("tok".into())));
    let uploader = HttpImageUploader::new(client, format!("{base}/admin/blogs/images/upload"));

    let url = uploader
        .upload(ImageFile::new("cat.png", b"\x89PNG\r\n\x1a\nrest".to_vec()))
        .await
        .expect("upload");
    assert_eq!(url, "https://cdn.test/blog/cat.png");

    let request = server.await.expect("server");
    assert!(request.contains(r#"name="image"; filename="cat.png""#));
    assert!(request.to_ascii_lowercase().contains("content-type: image/png"));
}

#[tokio::test]
async fn uploader_maps_server_error() {
    let (base, _server) = serve_once("500 Internal Server Error", r#"{"message":"disk full"}"#).await;
    let uploader = HttpImageUploader::new(
        ApiClient::new(base.clone(), Session::anonymous()),
        format!("{base}/upload"),
    );
    let err = uploader
        .upload(ImageFile::new("a.png", vec![0u8; 8]))
        .await
        .expect_err("500 fails");
    assert_eq!(
        err,
        UploadError::Status {
            status: 500,
            message: "disk full".into()
        }
    );
}
