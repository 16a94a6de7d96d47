//! Concurrent dispatch with randomized completion order and timing.

mod support;

use rand::seq::SliceRandom;
use rand::Rng;
use rest_client_base::{HttpResponse, RestClient, ShutdownReport, TransportError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use support::{config, request, MockSession, ScriptedTransport};

const ROUNDS: usize = 5;
const REQUESTS: usize = 64;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_random_completion_order_leaves_tracker_at_zero() {
    let session = MockSession::with_token("token");
    let (transport, mut calls) = ScriptedTransport::new();
    let client = Arc::new(
        RestClient::new(
            session,
            transport,
            config(false).with_termination_timeout(Duration::from_secs(5)),
        )
        .unwrap(),
    );

    for _ in 0..ROUNDS {
        client.start().await.unwrap();

        let completed = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(HashSet::new()));
        let (all_done_tx, all_done_rx) = tokio::sync::oneshot::channel();
        let all_done_tx = Arc::new(Mutex::new(Some(all_done_tx)));

        // dispatch from many callers at once
        let mut dispatchers = Vec::new();
        for _ in 0..REQUESTS {
            let client = Arc::clone(&client);
            let completed = Arc::clone(&completed);
            let seen = Arc::clone(&seen);
            let all_done_tx = Arc::clone(&all_done_tx);
            dispatchers.push(tokio::spawn(async move {
                client
                    .do_http_request(request(), move |completion| {
                        assert!(seen.lock().unwrap().insert(completion.request_id));
                        if completed.fetch_add(1, Ordering::SeqCst) + 1 == REQUESTS {
                            if let Some(tx) = all_done_tx.lock().unwrap().take() {
                                let _ = tx.send(());
                            }
                        }
                    })
                    .unwrap()
            }));
        }
        for d in futures::future::join_all(dispatchers).await {
            d.unwrap();
        }

        let mut pending = Vec::with_capacity(REQUESTS);
        for _ in 0..REQUESTS {
            pending.push(calls.recv().await.unwrap());
        }

        // ThreadRng is not Send; decide the schedule before spawning.
        let schedule: Vec<(u64, bool)> = {
            let mut rng = rand::thread_rng();
            pending.shuffle(&mut rng);
            (0..REQUESTS)
                .map(|_| (rng.gen_range(0..5), rng.gen_bool(0.2)))
                .collect()
        };

        let mut completers = Vec::new();
        for (call, (delay_ms, fail)) in pending.into_iter().zip(schedule) {
            completers.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                if fail {
                    call.fail(TransportError::Other("connection reset".into()));
                } else {
                    call.respond(HttpResponse::new(200));
                }
            }));
        }
        for c in futures::future::join_all(completers).await {
            c.unwrap();
        }

        all_done_rx.await.unwrap();
        assert_eq!(completed.load(Ordering::SeqCst), REQUESTS);
        assert_eq!(seen.lock().unwrap().len(), REQUESTS);
        assert_eq!(client.signals().inflight.unwrap().in_flight, 0);

        let report = client.stop().await;
        assert!(matches!(report, ShutdownReport::Drained { .. }), "{report:?}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_waits_for_requests_completing_during_drain() {
    let session = MockSession::with_token("token");
    let (transport, mut calls) = ScriptedTransport::new();
    let client = Arc::new(
        RestClient::new(
            session,
            transport,
            config(false).with_termination_timeout(Duration::from_secs(5)),
        )
        .unwrap(),
    );
    client.start().await.unwrap();

    for _ in 0..REQUESTS {
        client.do_http_request(request(), |_| {}).unwrap();
    }
    let mut pending = Vec::with_capacity(REQUESTS);
    for _ in 0..REQUESTS {
        pending.push(calls.recv().await.unwrap());
    }

    let delays: Vec<u64> = {
        let mut rng = rand::thread_rng();
        (0..REQUESTS).map(|_| rng.gen_range(10..60)).collect()
    };
    for (call, delay_ms) in pending.into_iter().zip(delays) {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            call.respond(HttpResponse::new(200));
        });
    }

    let report = client.stop().await;
    match report {
        ShutdownReport::Drained { elapsed } => {
            assert!(elapsed >= Duration::from_millis(10));
            assert!(elapsed < Duration::from_secs(2), "drain took {elapsed:?}");
        }
        other => panic!("expected drain, got {other:?}"),
    }
}
