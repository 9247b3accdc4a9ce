use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{Value, json};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

struct TestServer {
    base_url: String,
    store_path: PathBuf,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static MATCHES_SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::Mutex;
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PIDS: Mutex<Vec<i32>> = Mutex::new(Vec::new());

    pub fn register(pid: u32) {
        if let Ok(mut pids) = PIDS.lock() {
            pids.push(pid as i32);
        }
        REGISTER.call_once(|| unsafe {
            libc::atexit(on_exit);
        });
    }

    extern "C" fn on_exit() {
        if let Ok(pids) = PIDS.lock() {
            for pid in pids.iter().filter(|pid| **pid > 0) {
                unsafe {
                    libc::kill(*pid, libc::SIGTERM);
                }
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_path(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("figure_friday_{label}_{}_{}.json", std::process::id(), nanos));
    path
}

fn matches_dataset() -> Value {
    json!([
        {
            "home_team": 1, "team_id": 1, "team_name": "A", "opponent_id": 10,
            "opponent_name": "X", "attendance": "500", "date": "2024-01-01",
            "tier": 1, "match_name": "A v X"
        },
        {
            "home_team": 1, "team_id": 2, "team_name": "B", "opponent_id": 20,
            "opponent_name": "Y", "attendance": "1,500", "date": "2024-06-01",
            "tier": 2, "match_name": "B v Y"
        },
        {
            "home_team": 0, "team_id": 10, "team_name": "X", "opponent_id": 1,
            "opponent_name": "A", "attendance": "500", "date": "2024-01-01",
            "tier": 1, "match_name": "A v X"
        }
    ])
}

fn investments_dataset() -> Value {
    json!([
        { "County FIPS": "'6001'", "Investment Dollars": "1,000", "Number of Investments": "2" },
        { "County FIPS": "6003", "Investment Dollars": "2,500", "Number of Investments": "" }
    ])
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/state")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server(variant: &str, dataset: Value) -> TestServer {
    let port = pick_free_port();
    let store_path = unique_path("store");
    let dataset_path = unique_path(variant);
    std::fs::write(&dataset_path, serde_json::to_vec(&dataset).unwrap()).expect("write dataset");

    let child = Command::new(env!("CARGO_BIN_EXE_figure_friday"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", &store_path)
        .env("APP_DATASET_PATHS", &dataset_path)
        .env("DASHBOARD_VARIANT", variant)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        store_path,
        child,
    }
}

async fn matches_server() -> Arc<TestServer> {
    let mut guard = MATCHES_SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server("matches", matches_dataset()).await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn send(client: &Client, server: &TestServer, event: Value) -> Value {
    let response = client
        .post(format!("{}/api/events", server.base_url))
        .json(&event)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success(), "event {event} failed");
    response.json().await.unwrap()
}

fn filters(range: [f64; 2], tier: &str) -> Value {
    json!({
        "type": "filters",
        "range": range,
        "date_range": ["2024-01-01", "2024-12-31"],
        "tier": tier,
        "home": [],
        "away": null
    })
}

fn card_ids(state: &Value) -> Vec<u64> {
    state["cards"]["cards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|card| card["id"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn http_filters_project_selected_rows() {
    let _guard = TEST_LOCK.lock().await;
    let server = matches_server().await;
    let client = Client::new();

    let options: Value = client
        .get(format!("{}/api/options", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(options["home_teams"], json!(["A", "B"]));
    assert_eq!(options["range"], json!([500.0, 1500.0]));

    let state = send(&client, &server, filters([0.0, 1000.0], "All")).await;
    let indicator = &state["figures"]["extremum"]["data"][0];
    assert_eq!(indicator["value"].as_f64(), Some(500.0));
    assert_eq!(indicator["title"]["text"], "A v X<br>(2024-01-01)");

    let state = send(&client, &server, filters([0.0, 2000.0], "2")).await;
    let axis = &state["figures"]["primary"]["layout"]["coloraxis"];
    assert_eq!(axis["cmin"].as_f64(), Some(500.0));
    assert_eq!(axis["cmax"].as_f64(), Some(1500.0));
    assert_eq!(state["figures"]["extremum"]["data"][0]["value"].as_f64(), Some(1500.0));
}

#[tokio::test]
async fn http_bad_filters_keep_last_figures() {
    let _guard = TEST_LOCK.lock().await;
    let server = matches_server().await;
    let client = Client::new();

    let good = send(&client, &server, filters([0.0, 2000.0], "All")).await;
    let mut malformed = filters([0.0, 2000.0], "All");
    malformed["range"] = json!([0.0]);
    let after_malformed = send(&client, &server, malformed).await;
    assert_eq!(after_malformed["figures"], good["figures"]);

    let after_empty = send(&client, &server, filters([0.0, 10.0], "All")).await;
    assert_eq!(after_empty["figures"], good["figures"]);
}

#[tokio::test]
async fn http_theme_toggle_persists_and_keeps_data() {
    let _guard = TEST_LOCK.lock().await;
    let server = matches_server().await;
    let client = Client::new();

    let light = send(&client, &server, json!({ "type": "toggle_theme", "dark": false })).await;
    let dark = send(&client, &server, json!({ "type": "toggle_theme", "dark": true })).await;
    assert_eq!(dark["grid_class"], "ag-theme-alpine-dark");
    for figure in ["primary", "secondary", "extremum"] {
        assert_eq!(dark["figures"][figure]["data"], light["figures"][figure]["data"]);
        assert_eq!(dark["figures"][figure]["layout"]["template"], "plotly_dark");
    }

    let stored: Value = serde_json::from_slice(&std::fs::read(&server.store_path).unwrap()).unwrap();
    assert_eq!(stored["theme_dark"], true);

    let painted = send(&client, &server, json!({ "type": "first_paint", "os_prefers_dark": false })).await;
    assert_eq!(painted["theme"], "dark");
}

#[tokio::test]
async fn http_cards_add_remove_save_and_load() {
    let server = spawn_server("investments", investments_dataset()).await;
    let client = Client::new();

    send(&client, &server, json!({ "type": "add_card" })).await;
    let state = send(&client, &server, json!({ "type": "add_card" })).await;
    assert_eq!(card_ids(&state), vec![1, 2]);

    let state = send(&client, &server, json!({ "type": "remove_card", "id": 1, "n_clicks": 0 })).await;
    assert_eq!(card_ids(&state), vec![1, 2]);
    let state = send(&client, &server, json!({ "type": "remove_card", "id": 1, "n_clicks": 1 })).await;
    assert_eq!(card_ids(&state), vec![2]);

    let state = send(&client, &server, json!({ "type": "edit_card", "id": 2, "n_clicks": 1 })).await;
    assert_eq!(state["editor"]["opened"], true);
    assert_eq!(state["editor"]["chart_id"], 2);

    let figure = json!({
        "data": [{
            "type": "bar",
            "x": ["06001", "06003"],
            "xsrc": "County FIPS",
            "y": [1000, 2500],
            "ysrc": "Investment Dollars"
        }],
        "layout": { "title": { "text": "Dollars by county" } }
    });
    let state = send(&client, &server, json!({ "type": "save_editor", "figure": figure, "close": true })).await;
    assert_eq!(state["editor"]["opened"], false);
    assert_eq!(state["cards"]["cards"][0]["figure"], figure);

    let replay = send(&client, &server, json!({ "type": "edit_card", "id": 2, "n_clicks": 1 })).await;
    assert_eq!(replay["editor"]["opened"], false);

    send(&client, &server, json!({ "type": "save_charts" })).await;
    let stored: Value = serde_json::from_slice(&std::fs::read(&server.store_path).unwrap()).unwrap();
    let saved_trace = &stored["saved_charts"][0]["data"][0];
    assert!(saved_trace.get("x").is_none());
    assert_eq!(saved_trace["xsrc"], "County FIPS");

    send(&client, &server, json!({ "type": "add_card" })).await;
    let loaded = send(&client, &server, json!({ "type": "load_charts" })).await;
    assert_eq!(card_ids(&loaded), vec![1]);
    assert_eq!(loaded["cards"]["cards"][0]["figure"]["data"][0]["x"], json!(["06001", "06003"]));
    assert_eq!(loaded["cards"]["cards"][0]["figure"]["data"][0]["y"], json!([1000, 2500]));

    let state = send(&client, &server, json!({ "type": "add_card" })).await;
    assert_eq!(card_ids(&state), vec![1, 2]);
}

#[tokio::test]
async fn http_quick_filter_narrows_raw_data() {
    let server = spawn_server("investments", investments_dataset()).await;
    let client = Client::new();

    send(&client, &server, json!({ "type": "quick_filter", "text": "06003" })).await;
    let grids: Value = client
        .get(format!("{}/api/data", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rows = grids[0]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["Investment Dollars"], 2500);
    assert_eq!(rows[0]["Number of Investments"], Value::Null);

    let response = client
        .post(format!("{}/api/events", server.base_url))
        .json(&json!({ "type": "no_such_event" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}
