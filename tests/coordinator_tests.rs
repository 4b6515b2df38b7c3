use hypon_rs::api::{self, AuthSession};
use hypon_rs::metric_collector::MetricCollector;
use hypon_rs::model::{AuthToken, Credentials, Field};
use hypon_rs::settings::CoordinatorConfig;
use hypon_rs::{Coordinator, CycleState, Error, Status};
use mockito::{Mock, Server, ServerGuard};
use serde_json::json;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

const PLANT: &str = "1332746207645638656";

fn config(server: &ServerGuard) -> CoordinatorConfig {
    CoordinatorConfig {
        api_url: server.url(),
        credentials: Credentials::new("solar@example.com", "secret", PLANT).unwrap(),
        interval: Duration::from_secs(60),
        timeout: Duration::from_secs(5),
    }
}

fn session(server: &ServerGuard, token: &str) -> AuthSession {
    let api = api::api(&server.url(), Duration::from_secs(5)).unwrap();
    AuthSession::new(
        api,
        Credentials::new("solar@example.com", "secret", PLANT).unwrap(),
    )
    .with_token(AuthToken::new(token))
}

async fn login_mock(server: &mut ServerGuard, token: &str, hits: usize) -> Mock {
    server
        .mock("POST", "/login")
        .with_status(200)
        .with_body(json!({"data": {"token": token}}).to_string())
        .expect(hits)
        .create_async()
        .await
}

async fn overview_mock(server: &mut ServerGuard, token: &str) -> Mock {
    server
        .mock("GET", "/plant/overview")
        .match_header("authorization", format!("Bearer {}", token).as_str())
        .with_status(200)
        .with_body(
            json!({"data": {
                "e_total": 10456.7,
                "e_today": 12.4,
                "power": 2340,
                "normal_dev_num": 1,
                "earning": [{"today": 2.11, "total": 1882.2}],
            }})
            .to_string(),
        )
        .create_async()
        .await
}

async fn production_mock(server: &mut ServerGuard, token: &str) -> Mock {
    server
        .mock("GET", format!("/plant/{}/production2", PLANT).as_str())
        .match_header("authorization", format!("Bearer {}", token).as_str())
        .with_status(200)
        .with_body(
            json!({"data": {
                "today_generation": 12.4,
                "month_revenue": 51.26,
                "co2": 10.42,
            }})
            .to_string(),
        )
        .create_async()
        .await
}

#[tokio::test]
async fn setup_publishes_first_snapshot() {
    let mut server = Server::new_async().await;
    let login = login_mock(&mut server, "abc", 1).await;
    let overview = overview_mock(&mut server, "abc").await;
    let production = production_mock(&mut server, "abc").await;

    let coordinator = Coordinator::setup(&config(&server)).await.unwrap();

    let snapshot = coordinator.snapshot().unwrap();
    assert_eq!(Field::ALL.len(), snapshot.iter().count());
    assert_eq!(2.34, snapshot.get(Field::Power));
    assert_eq!(10456.7, snapshot.get(Field::ETotal));
    assert_eq!(1882.2, snapshot.get(Field::EarningTotal));
    assert_eq!(51.26, snapshot.get(Field::MonthRevenue));
    assert_eq!(10.42, snapshot.get(Field::Co2Saved));
    assert_eq!(0.0, snapshot.get(Field::WaitDevNum));
    assert_eq!(0.0, snapshot.get(Field::TotalRevenue));

    let status = coordinator.status();
    assert!(status.available);
    assert_eq!(CycleState::Published, status.state);
    assert_eq!(0, status.consecutive_failures);

    login.assert_async().await;
    overview.assert_async().await;
    production.assert_async().await;
}

#[tokio::test]
async fn token_is_reused_across_cycles() {
    let mut server = Server::new_async().await;
    let login = login_mock(&mut server, "abc", 1).await;
    overview_mock(&mut server, "abc").await;
    production_mock(&mut server, "abc").await;

    let mut coordinator = Coordinator::setup(&config(&server)).await.unwrap();
    coordinator.refresh().await.unwrap();
    coordinator.refresh().await.unwrap();

    login.assert_async().await;
}

#[tokio::test]
async fn setup_fails_when_login_is_rejected() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/login")
        .with_status(401)
        .create_async()
        .await;

    match Coordinator::setup(&config(&server)).await {
        Err(Error::NotReady(reason)) => assert!(reason.contains("401")),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("setup succeeded without a login"),
    }
}

#[tokio::test]
async fn setup_fails_when_a_fetch_fails() {
    let mut server = Server::new_async().await;
    login_mock(&mut server, "abc", 1).await;
    overview_mock(&mut server, "abc").await;
    server
        .mock("GET", format!("/plant/{}/production2", PLANT).as_str())
        .with_status(502)
        .create_async()
        .await;

    let mut coordinator = Coordinator::new(&config(&server)).unwrap();
    let result = coordinator.first_refresh().await;

    assert!(matches!(result, Err(Error::NotReady(_))));
    assert!(coordinator.snapshot().is_none());
    assert!(!coordinator.available());
}

#[tokio::test]
async fn expired_token_is_renewed_once() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/plant/overview")
        .match_header("authorization", "Bearer stale")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let login = login_mock(&mut server, "fresh", 1).await;
    let overview = overview_mock(&mut server, "fresh").await;
    let production = production_mock(&mut server, "fresh").await;

    let mut coordinator = Coordinator::with_session(session(&server, "stale"), Duration::from_secs(60));
    let snapshot = coordinator.refresh().await.unwrap();

    assert_eq!(2.34, snapshot.get(Field::Power));
    rejected.assert_async().await;
    login.assert_async().await;
    overview.assert_async().await;
    production.assert_async().await;
}

#[tokio::test]
async fn second_rejection_fails_the_cycle() {
    let mut server = Server::new_async().await;
    let login = login_mock(&mut server, "abc", 2).await;
    let overview = server
        .mock("GET", "/plant/overview")
        .with_status(401)
        .expect(2)
        .create_async()
        .await;
    let production = server
        .mock("GET", format!("/plant/{}/production2", PLANT).as_str())
        .expect(0)
        .create_async()
        .await;

    let mut coordinator = Coordinator::new(&config(&server)).unwrap();
    let result = coordinator.refresh().await;

    assert_eq!(Err(Error::Unauthorized), result.map(|_| ()));
    let status = coordinator.status();
    assert_eq!(CycleState::Failed, status.state);
    assert_eq!(1, status.consecutive_failures);

    login.assert_async().await;
    overview.assert_async().await;
    production.assert_async().await;
}

#[tokio::test]
async fn only_one_reauthentication_per_cycle() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/plant/overview")
        .match_header("authorization", "Bearer stale")
        .with_status(401)
        .create_async()
        .await;
    let login = login_mock(&mut server, "fresh", 1).await;
    overview_mock(&mut server, "fresh").await;
    let production = server
        .mock("GET", format!("/plant/{}/production2", PLANT).as_str())
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let mut coordinator = Coordinator::with_session(session(&server, "stale"), Duration::from_secs(60));
    let result = coordinator.refresh().await;

    assert_eq!(Err(Error::Unauthorized), result.map(|_| ()));
    login.assert_async().await;
    production.assert_async().await;
}

#[tokio::test]
async fn failure_keeps_last_snapshot() {
    let mut server = Server::new_async().await;
    login_mock(&mut server, "abc", 1).await;
    let overview = overview_mock(&mut server, "abc").await;
    production_mock(&mut server, "abc").await;

    let mut coordinator = Coordinator::setup(&config(&server)).await.unwrap();
    let mut updates = coordinator.subscribe();
    let before = coordinator.snapshot().unwrap();

    overview.remove_async().await;
    server
        .mock("GET", "/plant/overview")
        .with_status(503)
        .create_async()
        .await;

    let result = coordinator.refresh().await;
    assert!(matches!(result, Err(Error::FetchError(_))));

    let status = coordinator.status();
    assert!(!status.available);
    assert_eq!(CycleState::Failed, status.state);
    assert_eq!(1, status.consecutive_failures);
    assert!(status.last_error.is_some());
    assert_eq!(*before, *status.snapshot.unwrap());

    assert!(updates.has_changed().unwrap());
    assert!(!updates.borrow_and_update().available);
}

#[tokio::test]
async fn success_resets_failure_count() {
    let mut server = Server::new_async().await;
    login_mock(&mut server, "abc", 1).await;
    overview_mock(&mut server, "abc").await;
    let production = server
        .mock("GET", format!("/plant/{}/production2", PLANT).as_str())
        .with_status(500)
        .create_async()
        .await;

    let mut coordinator = Coordinator::new(&config(&server)).unwrap();
    assert!(coordinator.refresh().await.is_err());
    assert!(coordinator.refresh().await.is_err());
    assert_eq!(2, coordinator.status().consecutive_failures);

    production.remove_async().await;
    production_mock(&mut server, "abc").await;

    coordinator.refresh().await.unwrap();
    let status = coordinator.status();
    assert!(status.available);
    assert_eq!(0, status.consecutive_failures);
    assert!(status.last_error.is_none());
}

struct Recorder(mpsc::UnboundedSender<Status>);

impl MetricCollector for Recorder {
    fn publish(&mut self, status: &Status) {
        let _ = self.0.send(status.clone());
    }
}

async fn next_with_state(
    updates: &mut mpsc::UnboundedReceiver<Status>,
    state: CycleState,
) -> Status {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match updates.recv().await {
                Some(status) if status.state == state => return status,
                Some(_) => continue,
                None => panic!("refresh loop stopped before reaching {:?}", state),
            }
        }
    })
    .await
    .expect("no matching status in time")
}

#[tokio::test]
async fn scheduled_loop_survives_failures_and_stops_on_shutdown() {
    let mut server = Server::new_async().await;
    let login = login_mock(&mut server, "abc", 1).await;
    overview_mock(&mut server, "abc").await;
    let production = production_mock(&mut server, "abc").await;

    let config = CoordinatorConfig {
        interval: Duration::from_millis(100),
        ..config(&server)
    };
    let coordinator = Coordinator::setup(&config).await.unwrap();
    let before = coordinator.snapshot().unwrap();

    production.remove_async().await;
    let failing = server
        .mock("GET", format!("/plant/{}/production2", PLANT).as_str())
        .with_status(500)
        .create_async()
        .await;

    let (tx, mut updates) = mpsc::unbounded_channel();
    let (stop, stopped) = oneshot::channel::<()>();
    let collectors: Vec<Box<dyn MetricCollector>> = vec![Box::new(Recorder(tx))];
    let worker = tokio::spawn(coordinator.run(collectors, async move {
        let _ = stopped.await;
    }));

    /* the loop announces the setup result before its first tick */
    let initial = updates.recv().await.unwrap();
    assert_eq!(CycleState::Published, initial.state);

    let failed = next_with_state(&mut updates, CycleState::Failed).await;
    assert!(!failed.available);
    assert!(failed.consecutive_failures >= 1);
    assert_eq!(*before, *failed.snapshot.unwrap());

    failing.remove_async().await;
    production_mock(&mut server, "abc").await;

    let recovered = next_with_state(&mut updates, CycleState::Published).await;
    assert!(recovered.available);
    assert_eq!(0, recovered.consecutive_failures);

    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .expect("refresh loop ignored shutdown")
        .unwrap();
    login.assert_async().await;
}
