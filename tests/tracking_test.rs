use food_rescue::tracking::mock::{ChannelTransport, MockBehaviour};
use food_rescue::tracking::{
    spawn_session, BroadcastReport, HubConfig, SessionEnd, SubscriberState, TrackingHub,
};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_two_subscribers_receive_driver_position() {
    let (hub, client) = TrackingHub::new(HubConfig::default());
    tokio::spawn(hub.run());

    let (first, mut first_peer) = ChannelTransport::pair();
    let (second, mut second_peer) = ChannelTransport::pair();
    client.connect("D1", first).await.unwrap();
    client.connect("D1", second).await.unwrap();

    let report = client.broadcast("D1", "37.1,-122.4").await.unwrap();
    assert_eq!(report, BroadcastReport { delivered: 2, evicted: 0 });
    assert_eq!(first_peer.recv().await.as_deref(), Some("Driver D1 is at: 37.1,-122.4"));
    assert_eq!(second_peer.recv().await.as_deref(), Some("Driver D1 is at: 37.1,-122.4"));
}

#[tokio::test]
async fn test_broadcast_to_unknown_driver_is_noop() {
    let (hub, client) = TrackingHub::new(HubConfig::default());
    tokio::spawn(hub.run());

    let report = client.broadcast("ghost", "0,0").await.unwrap();
    assert_eq!(report, BroadcastReport::default());
}

/// N concurrent connects give N deliveries; after one disconnect, N - 1.
#[tokio::test]
async fn test_concurrent_connects_then_disconnect() {
    const N: usize = 16;
    let (hub, client) = TrackingHub::new(HubConfig::default());
    tokio::spawn(hub.run());

    let mut connects = Vec::with_capacity(N);
    for _ in 0..N {
        let client = client.clone();
        connects.push(tokio::spawn(async move {
            let (transport, peer) = ChannelTransport::pair();
            let handle = client.connect("D1", transport).await.unwrap();
            (handle, peer)
        }));
    }
    let mut subscribers = Vec::with_capacity(N);
    for connect in connects {
        subscribers.push(connect.await.unwrap());
    }

    let report = client.broadcast("D1", "1,1").await.unwrap();
    assert_eq!(report.delivered, N);
    for (_, peer) in subscribers.iter_mut() {
        assert_eq!(peer.drain(), vec!["Driver D1 is at: 1,1".to_string()]);
    }

    let (leaving, mut leaving_peer) = subscribers.pop().unwrap();
    assert!(client.disconnect(&leaving).await.unwrap());
    assert_eq!(leaving.state(), SubscriberState::Closed);

    let report = client.broadcast("D1", "2,2").await.unwrap();
    assert_eq!(report.delivered, N - 1);
    assert!(leaving_peer.drain().is_empty());
    for (_, peer) in subscribers.iter_mut() {
        assert_eq!(peer.drain(), vec!["Driver D1 is at: 2,2".to_string()]);
    }
}

/// Reports from one sender arrive in the order they were sent.
#[tokio::test]
async fn test_reports_keep_sender_order() {
    let (hub, client) = TrackingHub::new(HubConfig::default());
    tokio::spawn(hub.run());

    let (transport, mut peer) = ChannelTransport::pair();
    client.connect("D1", transport).await.unwrap();
    for step in 0..10 {
        client.broadcast("D1", &format!("{step},{step}")).await.unwrap();
    }

    let expected: Vec<String> =
        (0..10).map(|step| format!("Driver D1 is at: {step},{step}")).collect();
    assert_eq!(peer.drain(), expected);
}

/// A slow subscriber only holds up its own deliveries, not the driver's other followers.
#[tokio::test]
async fn test_slow_subscriber_does_not_delay_others() {
    let config = HubConfig { send_timeout_ms: 5_000, ..Default::default() };
    let (hub, client) = TrackingHub::new(config);
    tokio::spawn(hub.run());

    let (fast, mut fast_peer) = ChannelTransport::pair();
    let (slow, mut slow_peer) = ChannelTransport::pair_with(MockBehaviour {
        latency: Duration::from_millis(400),
        ..Default::default()
    });
    client.connect("D1", fast).await.unwrap();
    client.connect("D1", slow).await.unwrap();

    let (driver, mut driver_peer) = ChannelTransport::pair();
    let started = Instant::now();
    let session = spawn_session(client.clone(), "D1", driver);
    for step in 1..=3 {
        driver_peer.push(step.to_string());
    }

    for step in 1..=3 {
        let message = tokio::time::timeout(Duration::from_millis(300), fast_peer.recv())
            .await
            .unwrap();
        assert_eq!(message, Some(format!("Driver D1 is at: {step}")));
    }
    assert!(started.elapsed() < Duration::from_millis(400));

    // The slow follower still gets every report, in order.
    for step in 1..=3 {
        assert_eq!(slow_peer.recv().await, Some(format!("Driver D1 is at: {step}")));
    }

    driver_peer.hang_up();
    let summary = session.await.unwrap().unwrap();
    assert_eq!(summary.relayed, 3);
    assert_eq!(summary.end, SessionEnd::PeerClosed);
    assert_eq!(client.subscriber_count("D1").await.unwrap(), 2);
}
