use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use trifetch::base::neterror::NetError;
use trifetch::download::retry::RetryConfig;
use trifetch::download::{DownloadConfig, DownloadCoordinator, StrategyKind};
use trifetch::http::{Outcome, Target};

/// Serve `response` to every connection, counting accepted connections.
async fn serve_forever(response: &'static [u8]) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let mut head = Vec::new();
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, accepted)
}

#[tokio::test]
async fn test_one_failure_does_not_cancel_siblings() {
    let (good, _) = serve_forever(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await;
    let (bad, _) = serve_forever(b"HTTP/1.1 200 OK\r\n\r\nno length").await;

    for kind in StrategyKind::ALL {
        let config = DownloadConfig {
            strategy: kind,
            ..Default::default()
        };
        let coordinator = DownloadCoordinator::from_config(&config);
        assert_eq!(coordinator.strategy_name(), kind.as_str());

        let report = coordinator
            .run(vec![
                Target::new(good, "localhost", "/file1"),
                Target::new(bad, "localhost", "/file2"),
                Target::new(good, "localhost", "/file3"),
            ])
            .await;

        assert_eq!(report.len(), 3);
        assert_eq!(report.failure_count(), 1, "strategy {kind}");
        let outcomes = report.outcomes();
        assert_eq!(outcomes[0], &Outcome::Completed(Bytes::from_static(b"ok")));
        assert_eq!(outcomes[1], &Outcome::Failed(NetError::MissingContentLength));
        assert_eq!(outcomes[2], &Outcome::Completed(Bytes::from_static(b"ok")));

        let indices: Vec<_> = report.transactions().iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(report.transactions()[1].target.path(), "/file2");

        let errors = report.into_result().unwrap_err();
        assert_eq!(errors, vec![(1, NetError::MissingContentLength)]);
    }
}

#[tokio::test]
async fn test_run_repeated() {
    let (addr, accepted) =
        serve_forever(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").await;
    let coordinator = DownloadCoordinator::from_config(&DownloadConfig {
        strategy: StrategyKind::Chained,
        ..Default::default()
    });

    let report = coordinator
        .run_repeated(Target::new(addr, "localhost", "/file1"), 8)
        .await;

    assert!(report.all_succeeded());
    assert_eq!(accepted.load(Ordering::SeqCst), 8);
    let bodies = report.into_result().unwrap();
    assert_eq!(bodies.len(), 8);
    assert!(bodies.iter().all(|b| b.as_ref() == b"hello"));
}

#[tokio::test]
async fn test_empty_run() {
    let coordinator = DownloadCoordinator::from_config(&DownloadConfig::default());
    let report = coordinator.run(Vec::new()).await;
    assert!(report.is_empty());
    assert!(report.all_succeeded());
}

#[tokio::test]
async fn test_retry_connect_refused_until_listener_appears() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let retry = RetryConfig {
        max_attempts: 20,
        base_delay_ms: 20,
        max_delay_ms: 50,
        jitter_factor: 0.0,
    };
    let coordinator = DownloadCoordinator::from_config(&DownloadConfig {
        strategy: StrategyKind::Callback,
        retry,
        ..Default::default()
    });

    let late_server = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        let listener = TcpListener::bind(addr).await.unwrap();
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await.unwrap();
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nlate")
            .await
            .unwrap();
    });

    let report = coordinator
        .run(vec![Target::new(addr, "localhost", "/file1")])
        .await;
    late_server.await.unwrap();

    let transaction = &report.transactions()[0];
    assert_eq!(transaction.outcome, Outcome::Completed(Bytes::from_static(b"late")));
    assert!(transaction.attempts > 1);
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let report = DownloadCoordinator::from_config(&DownloadConfig::default())
        .run(vec![Target::new(addr, "localhost", "/file1")])
        .await;

    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.transactions()[0].attempts, 1);
}
