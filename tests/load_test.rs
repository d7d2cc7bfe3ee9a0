//! Concurrency tests: many simultaneous TLS connections, one payload.

use std::time::{Duration, Instant};

use tls13_zone::config::{AdmissionConfig, ServerConfiguration};

mod common;

const CONNECTIONS: usize = 32;
const REQUESTS_PER_CONNECTION: usize = 4;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connections_all_get_the_payload() {
    let id = common::identity(common::HOSTNAME);
    let payload: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
    let configuration = ServerConfiguration::builder(common::HOSTNAME)
        .certificate_chain(id.cert_pem.clone())
        .private_key(id.key_pem.clone())
        .payload(payload.clone())
        .build()
        .unwrap();
    let server = common::start_server(&configuration, AdmissionConfig::default()).await;

    let start = Instant::now();
    let mut clients = Vec::with_capacity(CONNECTIONS);
    for i in 0..CONNECTIONS {
        let addr = server.addr;
        let cert = id.cert_der.clone();
        clients.push(tokio::spawn(async move {
            if i % 2 == 0 {
                let tls = common::connect(addr, common::client_config(&cert, &["h2"])).await;
                common::get_h2(tls, REQUESTS_PER_CONNECTION).await
            } else {
                let tls = common::connect(addr, common::client_config(&cert, &["http/1.1"])).await;
                common::get_http1(tls, REQUESTS_PER_CONNECTION).await
            }
        }));
    }

    let mut bodies = 0;
    for client in clients {
        let responses = tokio::time::timeout(Duration::from_secs(30), client)
            .await
            .expect("client timed out")
            .unwrap();
        for (status, body) in responses {
            assert_eq!(status, 200);
            assert_eq!(body.as_ref(), payload.as_slice());
            bodies += 1;
        }
    }

    assert_eq!(bodies, CONNECTIONS * REQUESTS_PER_CONNECTION);
    println!(
        "{} connections x {} requests in {:?}",
        CONNECTIONS,
        REQUESTS_PER_CONNECTION,
        start.elapsed()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tracker_returns_to_zero_after_clients_leave() {
    let id = common::identity(common::HOSTNAME);
    let configuration = ServerConfiguration::builder(common::HOSTNAME)
        .certificate_chain(id.cert_pem.clone())
        .private_key(id.key_pem.clone())
        .build()
        .unwrap();
    let server = common::start_server(&configuration, AdmissionConfig::default()).await;

    let mut open = Vec::new();
    for _ in 0..5 {
        open.push(common::connect(server.addr, common::client_config(&id.cert_der, &["h2"])).await);
    }
    assert!(common::eventually(|| server.tracker.active_count() == 5).await);

    drop(open);
    assert!(common::eventually(|| server.tracker.active_count() == 0).await);
}
