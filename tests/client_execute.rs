//! End-to-end tests of `HttpClient::execute` against local mock servers.

use std::sync::Arc;
use std::time::Duration;

use pooled_http_client::config::ClientConfig;
use pooled_http_client::http::HeaderValue;
use pooled_http_client::{Backend, ClientError, HttpClient, HttpRequest};

mod common;
use common::{closed_port, start_fixed, start_hangup, start_mock, MockResponse};

const BACKENDS: [Backend; 2] = [Backend::PerHost, Backend::Pooled];

fn client() -> HttpClient {
    HttpClient::new(ClientConfig::default()).unwrap()
}

#[tokio::test]
async fn get_ok_with_header_on_both_backends() {
    let server = start_fixed(MockResponse::new(200, "ok").header("X-Test", "1")).await;
    let client = client();

    for backend in BACKENDS {
        let request = HttpRequest::new(server.url("/hello")).force_backend(backend);
        let resp = client.execute(&request).await.unwrap();

        assert!(resp.error.is_none(), "{}: {:?}", backend, resp.error);
        assert_eq!(resp.backend, Some(backend));
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.text(), "ok");
        assert_eq!(resp.content_length, 2);
        assert_eq!(resp.headers.get("X-Test"), Some(&HeaderValue::Single("1".into())));
        assert!(resp.is_success());
    }

    let seen = server.requests();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|r| r.method == "GET" && r.target == "/hello"));
    assert!(seen.iter().all(|r| r.header("host") == Some(server.addr.to_string().as_str())));
}

#[tokio::test]
async fn default_backend_is_pooled() {
    let server = start_fixed(MockResponse::new(200, "ok")).await;
    let client = client();

    let resp = client.execute(&HttpRequest::new(server.url("/"))).await.unwrap();
    assert_eq!(resp.backend, Some(Backend::Pooled));
    assert!(client.direct_pool().is_empty());
    assert!(client.proxy_pool().is_empty());
}

#[tokio::test]
async fn sequential_gets_hit_the_direct_pool() {
    let server = start_fixed(MockResponse::new(200, "ok").keep_alive()).await;
    let client = client();
    let request = HttpRequest::new(server.url("/a")).force_backend(Backend::PerHost);

    client.execute(&request).await.unwrap();
    assert_eq!(client.direct_pool().len(), 1);

    let second = HttpRequest::new(server.url("/b?x=1")).force_backend(Backend::PerHost);
    let resp = client.execute(&second).await.unwrap();
    assert!(resp.error.is_none());
    assert_eq!(client.direct_pool().len(), 1);

    // Keep-alive connection reused as well.
    assert_eq!(server.connections(), 1);
    assert_eq!(server.requests()[1].target, "/b?x=1");
}

#[tokio::test]
async fn differing_attributes_allocate_until_capacity() {
    let server = start_fixed(MockResponse::new(200, "ok")).await;
    let mut config = ClientConfig::default();
    config.pools.direct_max_size = 2;
    let client = HttpClient::new(config).unwrap();

    let base = HttpRequest::new(server.url("/")).force_backend(Backend::PerHost);
    client.execute(&base).await.unwrap();
    assert_eq!(client.direct_pool().len(), 1);

    let other_timeout = base.clone().network_timeout(Duration::from_secs(5));
    client.execute(&other_timeout).await.unwrap();
    assert_eq!(client.direct_pool().len(), 2);

    // Known keys keep working when the registry is full.
    assert!(client.execute(&base).await.unwrap().error.is_none());

    let third = base.clone().concurrency(3);
    let err = client.execute(&third).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::CapacityExceeded { registry: "direct", current: 2, max: 2 }
    ));
    assert_eq!(client.direct_pool().len(), 2);
}

#[tokio::test]
async fn proxy_registry_capacity_propagates() {
    let proxy = start_fixed(MockResponse::new(200, "via proxy")).await;
    let mut config = ClientConfig::default();
    config.pools.proxy_max_size = 1;
    let client = HttpClient::new(config).unwrap();

    let first = HttpRequest::new("http://upstream.test/").proxy("127.0.0.1", proxy.port());
    let resp = client.execute(&first).await.unwrap();
    assert_eq!(resp.status_code, 200);
    assert_eq!(client.proxy_pool().len(), 1);

    let second = HttpRequest::new("http://upstream.test/").proxy("127.0.0.1", closed_port().await);
    let err = client.execute(&second).await.unwrap_err();
    assert!(err.is_capacity_exceeded());
}

#[tokio::test]
async fn auto_method_detection_on_both_backends() {
    let server = start_fixed(MockResponse::new(200, "done")).await;
    let client = client();

    for backend in BACKENDS {
        let with_body = HttpRequest::new(server.url("/")).body("payload").force_backend(backend);
        client.execute(&with_body).await.unwrap();

        let without_body = HttpRequest::new(server.url("/")).force_backend(backend);
        client.execute(&without_body).await.unwrap();

        let empty_body = HttpRequest::new(server.url("/")).body("").force_backend(backend);
        client.execute(&empty_body).await.unwrap();
    }

    let seen = server.requests();
    assert_eq!(seen.len(), 6);
    for chunk in seen.chunks(3) {
        assert_eq!(chunk[0].method, "POST");
        assert_eq!(chunk[0].body, b"payload");
        assert_eq!(chunk[1].method, "GET");
        assert_eq!(chunk[2].method, "GET");
    }
}

#[tokio::test]
async fn patch_unsupported_on_per_host_but_fine_on_pooled() {
    let server = start_fixed(MockResponse::new(200, "patched")).await;
    let client = client();
    let request = HttpRequest::new(server.url("/item")).method("PATCH").body("{}");

    let resp = client
        .execute(&request.clone().force_backend(Backend::PerHost))
        .await
        .unwrap();
    assert!(matches!(
        resp.error,
        Some(ClientError::UnsupportedMethod { backend: Backend::PerHost, .. })
    ));
    assert_eq!(resp.status_code, 0);
    assert_eq!(server.hits(), 0);

    let resp = client
        .execute(&request.force_backend(Backend::Pooled))
        .await
        .unwrap();
    assert!(resp.error.is_none());
    assert_eq!(resp.status_code, 200);
    assert_eq!(server.requests()[0].method, "PATCH");
    assert_eq!(server.requests()[0].body, b"{}");
}

#[tokio::test]
async fn general_timeout_cancels_slow_calls() {
    let server = start_fixed(MockResponse::new(200, "late").delay(Duration::from_secs(3))).await;
    let client = client();
    let deadline = Duration::from_millis(300);

    for backend in BACKENDS {
        let request = HttpRequest::new(server.url("/slow"))
            .general_timeout(deadline)
            .force_backend(backend);
        let resp = client.execute(&request).await.unwrap();

        match &resp.error {
            Some(ClientError::Timeout { general_timeout }) => assert_eq!(*general_timeout, deadline),
            other => panic!("{}: expected timeout, got {:?}", backend, other),
        }
        assert!(resp.error.as_ref().unwrap().to_string().contains("general_timeout_sec=0.300"));
        assert!(resp.elapsed >= deadline, "{:?}", resp.elapsed);
        assert!(resp.elapsed < deadline + Duration::from_millis(1500), "{:?}", resp.elapsed);
        assert_eq!(resp.status_code, 0);
        assert!(resp.body.is_empty());
        assert!(resp.headers.is_empty());
        assert_eq!(resp.backend, Some(backend));
    }
}

#[tokio::test]
async fn fast_calls_beat_the_deadline() {
    let server = start_fixed(MockResponse::new(200, "quick").delay(Duration::from_millis(50))).await;
    let client = client();

    for backend in BACKENDS {
        let request = HttpRequest::new(server.url("/"))
            .general_timeout(Duration::from_secs(5))
            .force_backend(backend);
        let resp = client.execute(&request).await.unwrap();
        assert!(resp.error.is_none(), "{:?}", resp.error);
        assert!(resp.elapsed >= Duration::from_millis(50));
    }
}

#[tokio::test]
async fn network_timeout_is_reported() {
    let server = start_fixed(MockResponse::new(200, "late").delay(Duration::from_secs(3))).await;
    let client = client();

    for backend in BACKENDS {
        let request = HttpRequest::new(server.url("/"))
            .network_timeout(Duration::from_millis(200))
            .general_timeout(Duration::from_secs(5))
            .force_backend(backend);
        let resp = client.execute(&request).await.unwrap();
        assert!(
            matches!(resp.error, Some(ClientError::NetworkTimeout(_))),
            "{}: {:?}",
            backend,
            resp.error
        );
        assert!(resp.elapsed < Duration::from_secs(2));
    }
}

#[tokio::test]
async fn content_length_resolution() {
    let client = client();

    // HEAD: reported length wins on per-host, pooled uses the empty body.
    let server = start_fixed(MockResponse::new(200, "0123456789")).await;
    let head = HttpRequest::new(server.url("/")).method("HEAD");
    let resp = client.execute(&head.clone().force_backend(Backend::PerHost)).await.unwrap();
    assert!(resp.body.is_empty());
    assert_eq!(resp.content_length, 10);
    let resp = client.execute(&head.force_backend(Backend::Pooled)).await.unwrap();
    assert!(resp.body.is_empty());
    assert_eq!(resp.content_length, 0);

    // No reported length: body length.
    let server = start_fixed(MockResponse::new(200, "abc").without_content_length()).await;
    for backend in BACKENDS {
        let request = HttpRequest::new(server.url("/")).force_backend(backend);
        let resp = client.execute(&request).await.unwrap();
        assert_eq!(resp.text(), "abc");
        assert_eq!(resp.content_length, 3);
    }

    // Empty body, no reported length: zero.
    let server = start_fixed(MockResponse::new(204, "").without_content_length()).await;
    for backend in BACKENDS {
        let request = HttpRequest::new(server.url("/")).force_backend(backend);
        let resp = client.execute(&request).await.unwrap();
        assert_eq!(resp.status_code, 204);
        assert_eq!(resp.content_length, 0);
    }
}

#[tokio::test]
async fn repeated_response_headers_are_merged() {
    let server = start_fixed(
        MockResponse::new(200, "ok")
            .header("Set-Cookie", "a=1")
            .header("Set-Cookie", "b=2")
            .header("Set-Cookie", "c=3"),
    )
    .await;
    let client = client();

    for backend in BACKENDS {
        let resp = client
            .execute(&HttpRequest::new(server.url("/")).force_backend(backend))
            .await
            .unwrap();
        assert_eq!(
            resp.headers.get("set-cookie"),
            Some(&HeaderValue::Multi(vec!["a=1".into(), "b=2".into(), "c=3".into()]))
        );
    }
}

#[tokio::test]
async fn request_headers_are_forwarded() {
    let server = start_fixed(MockResponse::new(200, "ok")).await;
    let client = client();

    for backend in BACKENDS {
        let request = HttpRequest::new(server.url("/"))
            .header("X-Token", "abc")
            .header("Accept", "text/plain")
            .force_backend(backend);
        client.execute(&request).await.unwrap();
    }

    for seen in server.requests() {
        assert_eq!(seen.header("x-token"), Some("abc"));
        assert_eq!(seen.header("accept"), Some("text/plain"));
    }
}

#[tokio::test]
async fn redirects_are_not_followed() {
    let server = start_mock(|req| {
        if req.target == "/start" {
            MockResponse::new(302, "").header("Location", "/end")
        } else {
            MockResponse::new(200, "end")
        }
    })
    .await;
    let client = client();

    for backend in BACKENDS {
        let resp = client
            .execute(&HttpRequest::new(server.url("/start")).force_backend(backend))
            .await
            .unwrap();
        assert_eq!(resp.status_code, 302);
        assert_eq!(resp.headers.get("location").unwrap().first(), "/end");
    }
    assert!(server.requests().iter().all(|r| r.target == "/start"));
}

#[tokio::test]
async fn plain_http_through_proxy_on_both_backends() {
    let proxy = start_fixed(MockResponse::new(200, "from proxy")).await;
    let client = client();

    for backend in BACKENDS {
        let request = HttpRequest::new("http://upstream.test:8080/path?q=1")
            .proxy("127.0.0.1", proxy.port())
            .force_backend(backend);
        let resp = client.execute(&request).await.unwrap();
        assert!(resp.error.is_none(), "{}: {:?}", backend, resp.error);
        assert_eq!(resp.text(), "from proxy");
    }

    for seen in proxy.requests() {
        assert_eq!(seen.target, "http://upstream.test:8080/path?q=1");
        assert_eq!(seen.header("host"), Some("upstream.test:8080"));
    }
    assert_eq!(client.direct_pool().len(), 1);
    assert_eq!(client.proxy_pool().len(), 1);
}

#[tokio::test]
async fn https_with_proxy_selects_pooled_unless_forced() {
    let client = client();
    let port = closed_port().await;

    let request = HttpRequest::new("https://upstream.test/")
        .proxy("127.0.0.1", port)
        .general_timeout(Duration::from_secs(5));
    let resp = client.execute(&request).await.unwrap();
    assert_eq!(resp.backend, Some(Backend::Pooled));
    assert!(resp.error.is_some());

    let forced = request.force_backend(Backend::PerHost);
    let resp = client.execute(&forced).await.unwrap();
    assert_eq!(resp.backend, Some(Backend::PerHost));
    assert!(matches!(resp.error, Some(ClientError::Connect(_))));
}

#[tokio::test]
async fn connection_refused_is_recorded() {
    let client = client();
    let port = closed_port().await;

    for backend in BACKENDS {
        let request = HttpRequest::new(format!("http://127.0.0.1:{}/", port))
            .general_timeout(Duration::from_secs(5))
            .force_backend(backend);
        let resp = client.execute(&request).await.unwrap();
        assert!(resp.error.is_some(), "{}", backend);
        assert!(!resp.error.as_ref().unwrap().is_timeout());
        assert_eq!(resp.status_code, 0);
        assert!(resp.elapsed < Duration::from_secs(5));
    }
}

#[tokio::test]
async fn insecure_flag_does_not_change_pooled_clients() {
    let server = start_fixed(MockResponse::new(200, "ok")).await;
    let client = client();

    let request = HttpRequest::new(server.url("/")).insecure(true);
    let resp = client.execute(&request).await.unwrap();
    assert_eq!(resp.backend, Some(Backend::Pooled));
    assert!(resp.error.is_none(), "{:?}", resp.error);
    assert!(client.direct_pool().is_empty());
    assert!(client.proxy_pool().is_empty());
}

#[tokio::test]
async fn hangup_without_reply_is_no_response() {
    let server = start_hangup().await;
    let client = client();

    let request = HttpRequest::new(server.url("/silent"))
        .general_timeout(Duration::from_secs(5))
        .force_backend(Backend::PerHost);
    let resp = client.execute(&request).await.unwrap();
    assert!(matches!(resp.error, Some(ClientError::NoResponse)), "{:?}", resp.error);
    assert_eq!(resp.error.as_ref().unwrap().to_string(), "No response from http");
    assert_eq!(resp.status_code, 0);
    assert!(resp.body.is_empty());
    assert!(resp.elapsed > Duration::ZERO);
    assert!(resp.elapsed < Duration::from_secs(5));

    // The pooled backend reports its own transport error for the same hangup.
    let resp = client
        .execute(&request.clone().force_backend(Backend::Pooled))
        .await
        .unwrap();
    assert!(matches!(resp.error, Some(ClientError::Request(_))), "{:?}", resp.error);
    assert_eq!(resp.status_code, 0);

    assert!(server.hits() >= 2);
    assert_eq!(server.requests()[0].target, "/silent");
}

#[tokio::test]
async fn concurrent_calls_share_one_per_host_client() {
    let server = start_fixed(
        MockResponse::new(200, "ok")
            .keep_alive()
            .delay(Duration::from_millis(20)),
    )
    .await;
    let client = Arc::new(client());

    let mut handles = Vec::new();
    for i in 0..10 {
        let client = client.clone();
        let url = server.url(&format!("/{}", i));
        handles.push(tokio::spawn(async move {
            let request = HttpRequest::new(url)
                .concurrency(2)
                .force_backend(Backend::PerHost);
            client.execute(&request).await.unwrap()
        }));
    }

    for h in handles {
        let resp = h.await.unwrap();
        assert!(resp.error.is_none(), "{:?}", resp.error);
        assert_eq!(resp.status_code, 200);
    }

    assert_eq!(client.direct_pool().len(), 1);
    assert_eq!(server.hits(), 10);
    assert!(server.connections() <= 2, "opened {}", server.connections());
}
