/// End-to-end worker tests
///
/// Drives the HTTP surface, the job queue and the worker together against an
/// in-memory database and a scripted cost source:
/// - refresh request -> job processed -> cached report served
/// - unknown job types fail without stopping the worker
/// - duplicate refreshes collapse onto the active job
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use fleet_savings::app::create_app;
use fleet_savings::db::connect_in_memory;
use fleet_savings::external::scripted::ScriptedCostSource;
use fleet_savings::jobs::worker::{JobDependencies, WorkOutcome, Worker, WorkerConfig};
use fleet_savings::models::{ClusterInput, CreateOrganization, JobStatus, ReportMonth};
use fleet_savings::services::inventory_service;
use fleet_savings::AppState;

struct Harness {
    app: Router,
    state: AppState,
    worker: Worker,
    tenant_id: i64,
}

fn month(year: i32, m: u32) -> ReportMonth {
    ReportMonth::new(year, m).unwrap()
}

fn cost_source() -> ScriptedCostSource {
    ScriptedCostSource::new()
        .with_efficiency(
            "c-1",
            month(2024, 1),
            json!({"summary": {
                "costPerCpuProvisioned": 0.05,
                "costPerRamGibProvisioned": 0.01,
                "costPerStorageGibProvisioned": "0.001"
            }}),
        )
        .with_efficiency(
            "c-1",
            month(2024, 2),
            json!({"summary": {
                "costPerCpuProvisioned": 0.04,
                "costPerRamGibProvisioned": 0.008,
                "costPerStorageGibProvisioned": 0.001
            }}),
        )
        .with_usage(
            "c-1",
            month(2024, 2),
            json!({"items": [
                {"cpuProvisioned": 200.0, "cpuRequested": 100.0, "cpuUsed": 50.0,
                 "ramRequested": 200.0, "requestedStorageGib": 300.0},
                {"cpuProvisioned": "90", "cpuRequested": "45", "cpuUsed": 50.0,
                 "ramRequested": 90.0, "storageRequested": 280.0}
            ]}),
        )
}

async fn harness() -> Harness {
    let pool = connect_in_memory().await.unwrap();
    let org = inventory_service::create_organization(
        &pool,
        CreateOrganization {
            name: "Acme Ops".into(),
            api_key: "secret".into(),
        },
    )
    .await
    .unwrap();
    inventory_service::store_clusters(
        &pool,
        org.id,
        &[
            ClusterInput::new("c-1", "prod", Some("2024-01-15")),
            ClusterInput::new("c-2", "fresh", Some("2024-03-01")),
            ClusterInput::new("c-3", "undated", None),
        ],
    )
    .await
    .unwrap();

    let state = AppState::new(pool.clone());
    let worker = Worker::new(
        state.queue.clone(),
        JobDependencies {
            pool,
            cost_source: Arc::new(cost_source()),
            output_dir: None,
            clock: Arc::new(|| NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()),
        },
        WorkerConfig {
            idle_interval: Duration::from_millis(20),
            job_timeout: Some(Duration::from_secs(30)),
        },
    );

    Harness {
        app: create_app(state.clone()),
        state,
        worker,
        tenant_id: org.id,
    }
}

async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn refresh_is_processed_and_served_from_cache() {
    let h = harness().await;
    let base = format!("/api/orgs/{}/monthly-savings", h.tenant_id);

    let (status, queued) = call(&h.app, Method::POST, &format!("{}/refresh", base)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = queued["jobId"].as_i64().unwrap();

    let (_, polled) = call(&h.app, Method::GET, &format!("/api/jobs/{}", job_id)).await;
    assert_eq!(polled["status"], "pending");

    assert_eq!(h.worker.run_once().await.unwrap(), WorkOutcome::Completed(job_id));

    let (_, polled) = call(&h.app, Method::GET, &format!("/api/jobs/{}", job_id)).await;
    assert_eq!(polled["status"], "completed");
    assert!(polled["completedAt"].is_string());

    let (status, report) = call(&h.app, Method::GET, &base).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "ready");

    // Only c-1 has a completed month after connecting; c-2 connected this month.
    let savings = report["monthlySavingsReport"].as_array().unwrap();
    assert_eq!(savings.len(), 1);
    let feb = &savings[0];
    assert_eq!(feb["clusterid"], "c-1");
    assert_eq!(feb["month"], "2024-02");
    assert_eq!(feb["cpu_requested"], "145.00");
    assert_eq!(feb["storage_requested"], "580.00");
    assert_eq!(feb["savings_per_month_cpu"], "46.80");
    assert_eq!(feb["total_savings_per_month"], "66.48");

    assert_eq!(report["resourceCosts"].as_array().unwrap().len(), 3);
    let skipped = report["skippedClusters"].as_array().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["cluster_id"], "c-3");
}

#[tokio::test]
async fn unknown_job_type_does_not_block_the_queue() {
    let h = harness().await;
    let bogus = h.state.queue.enqueue(h.tenant_id, "bogus").await.unwrap().job_id();
    let (_, queued) = call(
        &h.app,
        Method::POST,
        &format!("/api/orgs/{}/monthly-savings/refresh", h.tenant_id),
    )
    .await;
    let report_job = queued["jobId"].as_i64().unwrap();

    assert!(matches!(
        h.worker.run_once().await.unwrap(),
        WorkOutcome::Failed { job_id, .. } if job_id == bogus
    ));
    assert_eq!(h.worker.run_once().await.unwrap(), WorkOutcome::Completed(report_job));

    let (_, failed) = call(&h.app, Method::GET, &format!("/api/jobs/{}", bogus)).await;
    assert_eq!(failed["status"], "error");
    assert!(failed["error"].as_str().unwrap().contains("bogus"));
}

#[tokio::test]
async fn duplicate_refresh_while_pending_returns_same_job() {
    let h = harness().await;
    let uri = format!("/api/admin/refresh/{}", h.tenant_id);

    let (first_status, first) = call(&h.app, Method::POST, &uri).await;
    let (second_status, second) = call(&h.app, Method::POST, &uri).await;
    assert_eq!(first_status, StatusCode::ACCEPTED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["jobId"], second["jobId"]);
    assert_eq!(second["created"], false);

    let jobs = h.state.queue.recent(10).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Pending);
}

#[tokio::test]
async fn background_worker_drains_queue_until_shutdown() {
    let h = harness().await;
    let (tx, rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(h.worker.run(rx));

    let (_, queued) = call(
        &h.app,
        Method::GET,
        &format!("/api/orgs/{}/monthly-savings?refresh=true", h.tenant_id),
    )
    .await;
    assert_eq!(queued["status"], "processing");
    let job_id = queued["jobId"].as_i64().unwrap();

    let status = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let job = h.state.queue.status(job_id).await.unwrap().unwrap();
            if job.status.is_terminal() {
                return job.status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(status, JobStatus::Completed);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn health_check() {
    let h = harness().await;
    let response = h
        .app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
