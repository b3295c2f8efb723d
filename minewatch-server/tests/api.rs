use minewatch_devkit::test_utils::{assert_exact_keys, assert_field_equals};
use minewatch_devkit::{closed_port, fixtures::expected, TestHarness};
use minewatch_server::{build_router, AppState, MonitorConfig};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

async fn spawn_app(cfg: MonitorConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(AppState::new(cfg));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(harness: &TestHarness) -> MonitorConfig {
    MonitorConfig {
        remote_host: harness.remote_host().into(),
        metrics_port: harness.metrics_port(),
        game_port: harness.game_port(),
        fetch_timeout_ms: 2000,
        probe_timeout_ms: 1000,
        ..MonitorConfig::default()
    }
}

async fn get_json(addr: SocketAddr, path: &str) -> (u16, Value) {
    let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
    let status = response.status().as_u16();
    let text = response.text().await.unwrap();
    (status, serde_json::from_str(&text).unwrap())
}

#[tokio::test]
async fn test_health_is_always_ok() {
    let addr = spawn_app(MonitorConfig::default()).await;

    let (status, first) = get_json(addr, "/api/health").await;
    assert_eq!(status, 200);
    assert_eq!(first["status"], json!("ok"));
    assert_exact_keys(&first, "", &["status", "timestamp"]).unwrap();

    let (_, second) = get_json(addr, "/api/health").await;
    assert!(second["timestamp"].as_u64().unwrap() >= first["timestamp"].as_u64().unwrap());
}

#[tokio::test]
async fn test_stats_online() {
    let harness = TestHarness::start().await.unwrap();
    let addr = spawn_app(config_for(&harness)).await;

    let (status, body) = get_json(addr, "/api/stats").await;
    assert_eq!(status, 200);
    assert_exact_keys(&body, "", &["timestamp", "minecraft", "system", "serverStatus"]).unwrap();
    assert!(body["timestamp"].as_u64().unwrap() > 0);

    assert_field_equals(&body, "minecraft.online", &json!(true)).unwrap();
    assert_field_equals(&body, "minecraft.tps", &json!(expected::TPS)).unwrap();
    assert_field_equals(&body, "minecraft.players.online", &json!(expected::PLAYERS_ONLINE)).unwrap();
    assert_field_equals(&body, "minecraft.players.max", &json!(expected::PLAYERS_MAX)).unwrap();
    assert_field_equals(&body, "minecraft.memory.used", &json!(expected::HEAP_USED_GIB)).unwrap();
    assert_field_equals(&body, "minecraft.memory.max", &json!(expected::HEAP_MAX_GIB)).unwrap();
    assert_field_equals(&body, "minecraft.memory.free", &json!(expected::HEAP_FREE_GIB)).unwrap();
    assert_field_equals(&body, "minecraft.world.entities", &json!(expected::ENTITIES)).unwrap();
    assert_field_equals(&body, "minecraft.world.chunks", &json!(expected::CHUNKS)).unwrap();
    assert_field_equals(
        &body,
        "minecraft.jvm.gc.totalCollections",
        &json!(expected::GC_TOTAL_COLLECTIONS),
    )
    .unwrap();
    assert_field_equals(&body, "minecraft.jvm.gc.totalTimeSeconds", &json!(expected::GC_TOTAL_TIME))
        .unwrap();
    assert_field_equals(
        &body,
        "minecraft.system.fileDescriptors.percentUsed",
        &json!(expected::FDS_PERCENT_USED),
    )
    .unwrap();
    assert_field_equals(&body, "minecraft.connections.statusPings", &json!(expected::STATUS_PINGS))
        .unwrap();
    assert_field_equals(&body, "minecraft.connections.logins", &json!(expected::LOGINS)).unwrap();

    let uptime = body["minecraft"]["uptime"].as_u64().unwrap();
    assert!((expected::UPTIME_SECONDS..expected::UPTIME_SECONDS + 5).contains(&uptime));

    assert_field_equals(&body, "serverStatus.reachable", &json!(true)).unwrap();
    assert!(body["system"]["cpu"]["cores"].as_u64().unwrap() > 0);
    assert_field_equals(&body, "system.platform", &json!(std::env::consts::OS)).unwrap();

    assert_eq!(harness.metrics.request_count(), 1);
}

#[tokio::test]
async fn test_every_call_scrapes_again() {
    let harness = TestHarness::start().await.unwrap();
    let addr = spawn_app(config_for(&harness)).await;

    get_json(addr, "/api/stats").await;
    harness.metrics.set_body("minecraft_tps 12.5\n");
    let (_, body) = get_json(addr, "/api/stats").await;

    assert_eq!(harness.metrics.request_count(), 2);
    assert_field_equals(&body, "minecraft.tps", &json!(12.5)).unwrap();
    assert_field_equals(&body, "minecraft.memory.used", &json!("0.00")).unwrap();
}

#[tokio::test]
async fn test_stats_offline_on_error_status() {
    let harness = TestHarness::start().await.unwrap();
    harness.metrics.set_status(500);
    let addr = spawn_app(config_for(&harness)).await;

    let (status, body) = get_json(addr, "/api/stats").await;
    assert_eq!(status, 200);
    assert_exact_keys(&body, "minecraft", &["online", "error"]).unwrap();
    assert_field_equals(&body, "minecraft.online", &json!(false)).unwrap();
    assert!(body["minecraft"]["error"].as_str().unwrap().contains("500"));

    // the other branches are unaffected
    assert_field_equals(&body, "serverStatus.reachable", &json!(true)).unwrap();
    assert!(body["system"].is_object());
}

#[tokio::test]
async fn test_stats_offline_on_fetch_timeout() {
    let harness = TestHarness::start().await.unwrap();
    harness.metrics.set_delay(Duration::from_secs(3));
    let cfg = MonitorConfig {
        fetch_timeout_ms: 300,
        ..config_for(&harness)
    };
    let addr = spawn_app(cfg).await;

    let (status, body) = get_json(addr, "/api/stats").await;
    assert_eq!(status, 200);
    assert_field_equals(&body, "minecraft.online", &json!(false)).unwrap();
    assert_field_equals(&body, "minecraft.error", &json!("request timed out")).unwrap();
}

#[tokio::test]
async fn test_stats_with_nothing_listening() {
    let cfg = MonitorConfig {
        remote_host: "127.0.0.1".into(),
        metrics_port: closed_port().unwrap(),
        game_port: closed_port().unwrap(),
        fetch_timeout_ms: 1000,
        probe_timeout_ms: 500,
        ..MonitorConfig::default()
    };
    let addr = spawn_app(cfg).await;

    let (status, body) = get_json(addr, "/api/stats").await;
    assert_eq!(status, 200);
    assert_exact_keys(&body, "minecraft", &["online", "error"]).unwrap();
    assert_field_equals(&body, "serverStatus", &json!({ "reachable": false })).unwrap();
}

#[tokio::test]
async fn test_dashboard_is_served_from_static_dir() {
    let addr = spawn_app(MonitorConfig::default()).await;

    let index = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(index.status().as_u16(), 200);
    assert!(index.text().await.unwrap().contains("/api/stats"));

    let missing = reqwest::get(format!("http://{addr}/nope.js")).await.unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}
