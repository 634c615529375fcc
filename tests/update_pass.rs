//! Update pass end-to-end tests against an in-memory runtime

mod helper;

use std::sync::Arc;

use argus::update::filter::MonitoringFilters;
use argus::update::orchestrator::{PassError, UpdateOptions};
use argus::version::policy::VersionPolicy;

use helper::{Call, FakeRuntime, FakeTagLister, RecordingReporter, create_updater, image};

fn options() -> UpdateOptions {
    UpdateOptions {
        host: "unix:///var/run/docker.sock".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn failed_pull_skips_only_that_container() {
    let runtime = Arc::new(
        FakeRuntime::new()
            .with_container("c1", "web", "team/web:latest", image("sha256:web-old", &["team/web:latest"], &[]))
            .with_container("c2", "api", "team/api:latest", image("sha256:api-old", &["team/api:latest"], &[]))
            .with_container("c3", "worker", "team/worker:latest", image("sha256:worker-old", &["team/worker:latest"], &[]))
            .with_remote("team/web:latest", image("sha256:web-new", &["team/web:latest"], &[]))
            .with_failing_pull("team/api:latest")
            .with_remote("team/worker:latest", image("sha256:worker-new", &["team/worker:latest"], &[])),
    );
    let reporter = Arc::new(RecordingReporter::default());

    let summary = create_updater(runtime.clone(), FakeTagLister::new(), options())
        .with_reporter(reporter.clone())
        .run_pass()
        .await
        .unwrap();

    assert_eq!(summary.monitored, 3);
    assert_eq!(summary.updated(), 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].container, "api");
    assert_eq!(reporter.reported(), vec![(3, 2)]);

    assert_eq!(
        runtime.calls(),
        vec![
            Call::Pull("team/web:latest".to_string()),
            Call::Stop("c1".to_string()),
            Call::RemoveContainer("c1".to_string()),
            Call::Create {
                name: "web".to_string(),
                image: "team/web:latest".to_string()
            },
            Call::Start("new-1".to_string()),
            Call::Pull("team/api:latest".to_string()),
            Call::Pull("team/worker:latest".to_string()),
            Call::Stop("c3".to_string()),
            Call::RemoveContainer("c3".to_string()),
            Call::Create {
                name: "worker".to_string(),
                image: "team/worker:latest".to_string()
            },
            Call::Start("new-2".to_string()),
        ]
    );

    let mut running = runtime.running();
    running.sort();
    assert_eq!(
        running,
        vec![
            ("api".to_string(), "team/api:latest".to_string()),
            ("web".to_string(), "team/web:latest".to_string()),
            ("worker".to_string(), "team/worker:latest".to_string()),
        ]
    );
}

#[tokio::test]
async fn agent_container_is_never_monitored() {
    let runtime = Arc::new(
        FakeRuntime::new()
            .with_container("self", "argus", "ghcr.io/acme/argus:latest", image("sha256:self", &["ghcr.io/acme/argus:latest"], &[]))
            .with_container("c1", "web", "team/web:latest", image("sha256:web", &["team/web:latest"], &[])),
    );

    let summary = create_updater(runtime.clone(), FakeTagLister::new(), options())
        .run_pass()
        .await
        .unwrap();

    assert_eq!(summary.monitored, 1);
    assert_eq!(runtime.calls(), vec![Call::Pull("team/web:latest".to_string())]);
}

#[tokio::test]
async fn unchanged_digest_performs_no_mutation() {
    let current = image("sha256:same", &["team/web:latest"], &[]);
    let runtime = Arc::new(
        FakeRuntime::new()
            .with_container("c1", "web", "team/web:latest", current.clone())
            .with_remote("team/web:latest", current),
    );

    let summary = create_updater(
        runtime.clone(),
        FakeTagLister::new(),
        UpdateOptions {
            cleanup: true,
            ..options()
        },
    )
    .run_pass()
    .await
    .unwrap();

    assert_eq!(summary.monitored, 1);
    assert_eq!(summary.updated(), 0);
    assert!(!runtime.calls().iter().any(Call::is_mutation));
}

#[tokio::test]
async fn overlapping_filters_touch_nothing() {
    let runtime = Arc::new(FakeRuntime::new().with_container(
        "c1",
        "web",
        "team/web:latest",
        image("sha256:web", &["team/web:latest"], &[]),
    ));
    let reporter = Arc::new(RecordingReporter::default());

    let result = create_updater(
        runtime.clone(),
        FakeTagLister::new(),
        UpdateOptions {
            filters: MonitoringFilters::new(
                vec!["web".to_string(), "api".to_string()],
                vec!["api".to_string()],
            ),
            ..options()
        },
    )
    .with_reporter(reporter.clone())
    .run_pass()
    .await;

    assert!(matches!(result, Err(PassError::Config(_))));
    assert!(runtime.calls().is_empty());
    assert!(reporter.reported().is_empty());
}

#[tokio::test]
async fn include_filter_limits_monitoring_set() {
    let runtime = Arc::new(
        FakeRuntime::new()
            .with_container("c1", "web", "team/web:latest", image("sha256:web", &["team/web:latest"], &[]))
            .with_container("c2", "db", "postgres:16", image("sha256:db", &["postgres:16"], &[])),
    );

    let summary = create_updater(
        runtime.clone(),
        FakeTagLister::new(),
        UpdateOptions {
            filters: MonitoringFilters::new(vec!["db".to_string()], vec![]),
            ..options()
        },
    )
    .run_pass()
    .await
    .unwrap();

    assert_eq!(summary.monitored, 1);
    assert_eq!(runtime.calls(), vec![Call::Pull("postgres:latest".to_string())]);
}

#[tokio::test]
async fn semantic_policy_moves_to_newest_minor_and_cleans_up() {
    let runtime = Arc::new(
        FakeRuntime::new()
            .with_container(
                "c1",
                "app",
                "team/app:1.2.0",
                image("sha256:app-120", &["team/app:1.2.0"], &["team/app@sha256:app-120"]),
            )
            .with_remote(
                "team/app:1.3.1",
                image("sha256:app-131", &["team/app:1.3.1"], &["team/app@sha256:app-131"]),
            ),
    );
    let lister = FakeTagLister::new().with_tags(
        "team/app",
        &["1.2.0", "1.3.0", "1.3.1", "2.0.0", "latest"],
    );

    let summary = create_updater(
        runtime.clone(),
        lister,
        UpdateOptions {
            cleanup: true,
            policy: VersionPolicy::MinorAndPatch,
            ..options()
        },
    )
    .run_pass()
    .await
    .unwrap();

    assert_eq!(summary.updated(), 1);
    assert_eq!(summary.outcomes[0].new_image.id, "sha256:app-131");
    assert_eq!(
        runtime.calls(),
        vec![
            Call::Pull("team/app:1.3.1".to_string()),
            Call::Stop("c1".to_string()),
            Call::RemoveContainer("c1".to_string()),
            Call::Create {
                name: "app".to_string(),
                image: "team/app:1.3.1".to_string()
            },
            Call::Start("new-1".to_string()),
            Call::RemoveImage("team/app:1.2.0".to_string()),
        ]
    );
    assert_eq!(
        runtime.running(),
        vec![("app".to_string(), "team/app:1.3.1".to_string())]
    );
}

#[tokio::test]
async fn second_pass_after_update_is_a_no_op() {
    let runtime = Arc::new(
        FakeRuntime::new()
            .with_container("c1", "web", "team/web:latest", image("sha256:old", &["team/web:latest"], &[]))
            .with_remote("team/web:latest", image("sha256:new", &["team/web:latest"], &[])),
    );
    let updater = create_updater(runtime.clone(), FakeTagLister::new(), options());

    let first = updater.run_pass().await.unwrap();
    let second = updater.run_pass().await.unwrap();

    assert_eq!(first.updated(), 1);
    assert_eq!(second.updated(), 0);
    assert_eq!(second.monitored, 1);
}
