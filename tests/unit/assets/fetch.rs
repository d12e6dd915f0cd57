use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::*;

/// Answers every connection with `status` and `body`, then closes it.
async fn serve(status: &'static str, body: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let mut buf = vec![0u8; 4096];
            let mut read = 0;
            while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                match sock.read(&mut buf[read..]).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => read += n,
                }
            }
            let head = format!(
                "HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            );
            let _ = sock.write_all(head.as_bytes()).await;
            let _ = sock.write_all(body).await;
            let _ = sock.shutdown().await;
        }
    });
    addr
}

async fn fetch_blocking(fetcher: impl AssetFetcher + 'static, url: String) -> AdResult<Arc<[u8]>> {
    tokio::task::spawn_blocking(move || fetcher.fetch(&url))
        .await
        .unwrap()
}

#[test]
fn fs_fetcher_reads_relative_to_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("logo.png"), b"bytes").unwrap();

    let f = FsFetcher::with_root(dir.path());
    assert_eq!(&*f.fetch("logo.png").unwrap(), b"bytes");

    let abs = dir.path().join("logo.png");
    assert_eq!(&*FsFetcher::new().fetch(abs.to_str().unwrap()).unwrap(), b"bytes");
}

#[test]
fn fs_fetcher_missing_file_is_asset_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = FsFetcher::with_root(dir.path()).fetch("nope.png").unwrap_err();
    assert!(matches!(err, AdError::AssetResolution(_)), "{err}");
    assert!(FsFetcher::new().fetch("  ").is_err());
}

#[test]
fn memory_fetcher_insert_and_remove() {
    let f = MemoryFetcher::new().with("a", vec![1u8, 2]);
    assert_eq!(&*f.fetch("a").unwrap(), &[1, 2]);
    f.remove("a");
    assert!(matches!(f.fetch("a"), Err(AdError::AssetResolution(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn http_fetcher_returns_body_on_success() {
    let addr = serve("200 OK", b"png-bytes").await;
    let got = fetch_blocking(HttpFetcher::new(), format!("http://{addr}/logo.png"))
        .await
        .unwrap();
    assert_eq!(&*got, b"png-bytes");
}

#[tokio::test(flavor = "multi_thread")]
async fn http_fetcher_maps_non_success_status_to_asset_error() {
    let addr = serve("404 Not Found", b"missing").await;
    let err = fetch_blocking(HttpFetcher::new(), format!("http://{addr}/logo.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, AdError::AssetResolution(_)), "{err}");
    assert!(err.to_string().contains("404"), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn http_fetcher_maps_transport_error_to_asset_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let err = fetch_blocking(HttpFetcher::new(), format!("http://{addr}/gone.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, AdError::AssetResolution(_)), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn http_fetcher_rejects_oversized_body() {
    let addr = serve("200 OK", b"0123456789").await;
    let fetcher = HttpFetcher::new().with_max_body_bytes(4);
    let err = fetch_blocking(fetcher, format!("http://{addr}/big.png"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("exceeds"), "{err}");
}

#[test]
fn http_fetcher_works_outside_a_runtime() {
    let err = HttpFetcher::new().fetch("http://127.0.0.1:9/x.png").unwrap_err();
    assert!(matches!(err, AdError::AssetResolution(_)), "{err}");
    let err = HttpFetcher::new().fetch("logo.png").unwrap_err();
    assert!(err.to_string().contains("not an http(s) url"), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn routing_fetcher_sends_urls_to_http_and_paths_to_local() {
    let addr = serve("200 OK", b"remote").await;
    let local = MemoryFetcher::new().with("logo.png", b"local".to_vec());
    let routed = RoutingFetcher::new(Arc::new(local));

    let url = format!("HTTPS://{addr}/logo.png");
    assert!(is_url(&url));
    let routed = Arc::new(routed);
    let r = Arc::clone(&routed);
    let remote = tokio::task::spawn_blocking(move || r.fetch(&format!("http://{addr}/logo.png")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&*remote, b"remote");
    assert_eq!(&*routed.fetch("logo.png").unwrap(), b"local");
    assert!(!is_url("assets/http-logo.png"));
    assert!(!is_url("ftp://host/logo.png"));
}
