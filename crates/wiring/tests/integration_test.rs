use std::sync::Arc;
use wiring::mock::{Journal, MockContextService, MockService};
use wiring::{AppContext, Container, ContainerError, Declaration, GraphError, Identity};

// --- Test Types ---

struct Config {
    url: String,
}

struct Pool {
    url: String,
}

struct Repo {
    pool: Arc<Pool>,
}

struct Unrelated;

struct Web;
struct Worker;
struct Cron;

// --- Tests ---

#[tokio::test]
async fn test_builds_in_dependency_order_regardless_of_declaration_order() {
    let journal = Journal::new();
    let container = Container::new(AppContext::new());

    let (j1, j2, j3) = (journal.clone(), journal.clone(), journal.clone());
    container
        .register([
            Declaration::factory(move |_: Arc<Pool>| {
                j3.record("C");
                MockService::<Web>::tagged("C", &j3)
            })
            .service(),
            Declaration::factory(move |_: Arc<Config>| {
                j2.record("B");
                Pool {
                    url: "db://b".into(),
                }
            })
            .into(),
            Declaration::factory(move || {
                j1.record("A");
                Config {
                    url: "db://a".into(),
                }
            })
            .into(),
        ])
        .unwrap();

    container.build().await.unwrap();
    assert_eq!(journal.joined(), "A,B,C,up:C");

    container.down().await.unwrap();
    assert_eq!(journal.joined(), "A,B,C,up:C,down:C");
}

#[tokio::test]
async fn test_values_flow_into_factories() {
    let container = Container::new(AppContext::new());
    container
        .register([
            Declaration::factory(|pool: Arc<Pool>| Repo { pool }).into(),
            Declaration::factory(|c: Arc<Config>| Pool { url: c.url.clone() }).into(),
            Declaration::value(Config {
                url: "db://local".into(),
            }),
        ])
        .unwrap();

    container.build().await.unwrap();

    let repo = container.registry().resolve::<Repo>().unwrap();
    assert_eq!(repo.pool.url, "db://local");
    let url = container.inject(|r: Arc<Repo>| r.pool.url.clone()).unwrap();
    assert_eq!(url, "db://local");
}

#[tokio::test]
async fn test_cycle_fails_before_any_factory_runs() {
    struct X;
    struct Y;

    let journal = Journal::new();
    let (jx, jy) = (journal.clone(), journal.clone());
    let container = Container::new(AppContext::new());
    container
        .register([
            Declaration::factory(move |_: Arc<Y>| {
                jx.record("X");
                X
            })
            .into(),
            Declaration::from(Declaration::factory(move |_: Arc<X>| {
                jy.record("Y");
                Y
            })),
        ])
        .unwrap();

    let err = container.build().await.unwrap_err();
    assert!(err.is_cycle(), "unexpected error: {err}");
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn test_missing_provider_fails_when_consumer_runs() {
    struct X;
    struct Y;

    let container = Container::new(AppContext::new());
    container
        .register([Declaration::from(Declaration::factory(|_: Arc<X>| Y))])
        .unwrap();

    let err = container.build().await.unwrap_err();
    match &err {
        ContainerError::Initialize { identity, .. } => assert_eq!(*identity, Identity::of::<Y>()),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        err.root(),
        ContainerError::NotInitiated(id) if *id == Identity::of::<X>()
    ));
}

#[tokio::test]
async fn test_second_provider_of_a_type_conflicts() {
    let container = Container::new(AppContext::new());
    let err = container
        .register([
            Declaration::from(Declaration::factory(|| Config { url: "a".into() })),
            Declaration::from(Declaration::factory(|| Config { url: "b".into() })),
        ])
        .unwrap_err();
    assert!(matches!(err, ContainerError::AlreadyInitiated(id) if id == Identity::of::<Config>()));

    let err = container
        .register([Declaration::value(Config { url: "c".into() })])
        .unwrap_err();
    assert!(matches!(err, ContainerError::AlreadyInitiated(_)));
}

#[tokio::test]
async fn test_consumer_declared_after_value_does_not_conflict() {
    let container = Container::new(AppContext::new());
    container
        .register([
            Declaration::value(Config { url: "v".into() }),
            Declaration::factory(|c: Arc<Config>| Pool { url: c.url.clone() }).into(),
            Declaration::factory(|c: Arc<Config>| Repo {
                pool: Arc::new(Pool { url: c.url.clone() }),
            })
            .into(),
        ])
        .unwrap();

    container.build().await.unwrap();
    assert_eq!(container.registry().resolve::<Config>().unwrap().url, "v");
}

#[tokio::test]
async fn test_services_stop_in_reverse_start_order_and_failures_are_combined() {
    let journal = Journal::new();
    let (j1, j2, j3) = (journal.clone(), journal.clone(), journal.clone());
    let container = Container::new(AppContext::new());
    container
        .register([
            Declaration::factory(move |_: Arc<MockService<Worker>>| {
                MockService::<Cron>::tagged("cron", &j3).fail_down("still running")
            })
            .service(),
            Declaration::factory(move |_: Arc<MockService<Web>>| {
                MockService::<Worker>::tagged("worker", &j2)
            })
            .service(),
            Declaration::factory(move || MockService::<Web>::tagged("web", &j1).fail_down("port busy"))
                .service(),
        ])
        .unwrap();

    container.build().await.unwrap();
    assert_eq!(container.services().started().len(), 3);

    let err = container.down().await.unwrap_err();
    match err {
        ContainerError::Shutdown(errors) => {
            assert_eq!(errors.len(), 2);
            let text = errors.to_string();
            assert!(text.contains("still running"));
            assert!(text.contains("port busy"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        journal.joined(),
        "up:web,up:worker,up:cron,down:cron,down:worker,down:web"
    );
}

#[tokio::test]
async fn test_state_errors_are_distinct() {
    let container = Container::new(AppContext::new());
    container
        .register([Declaration::value(Config { url: "x".into() })])
        .unwrap();

    assert!(matches!(
        container.down().await,
        Err(ContainerError::NotRunning)
    ));

    container.build().await.unwrap();
    assert!(matches!(
        container.build().await,
        Err(ContainerError::AlreadyRunning)
    ));
    assert!(matches!(
        container.register([Declaration::value(Unrelated)]),
        Err(ContainerError::RegistrationClosed)
    ));

    container.down().await.unwrap();
    assert!(matches!(
        container.down().await,
        Err(ContainerError::NotRunning)
    ));
}

#[tokio::test]
async fn test_empty_container_has_nothing_to_sort() {
    let container = Container::new(AppContext::new());
    let err = container.build().await.unwrap_err();
    assert!(matches!(err, ContainerError::Graph(GraphError::Empty)));
}

#[tokio::test]
async fn test_invoke_builds_only_what_the_target_needs() {
    let journal = Journal::new();
    let container = Container::new(AppContext::new());
    let (ja, jb, jt, jw) = (
        journal.clone(),
        journal.clone(),
        journal.clone(),
        journal.clone(),
    );

    container
        .register([
            Declaration::factory(move || {
                ja.record("A");
                Config { url: "a".into() }
            })
            .into(),
            Declaration::factory(move |c: Arc<Config>| {
                jb.record("B");
                Pool { url: c.url.clone() }
            })
            .into(),
            Declaration::factory(move || MockService::<Web>::tagged("web", &jw)).service(),
        ])
        .unwrap();

    container
        .invoke(Declaration::task(move |pool: Arc<Pool>| {
            jt.record(format!("task:{}", pool.url));
        }))
        .await
        .unwrap();

    assert_eq!(journal.joined(), "A,B,task:a");
    assert!(container.services().started().is_empty());
    assert!(container
        .registry()
        .resolve::<MockService<Web>>()
        .is_err());

    container.down().await.unwrap();
    assert_eq!(journal.count("up:web"), 0);
}

#[tokio::test]
async fn test_tuple_factory_runs_once() {
    let journal = Journal::new();
    let j = journal.clone();
    let container = Container::new(AppContext::new());
    container
        .register([
            Declaration::factory(|c: Arc<Config>, p: Arc<Pool>| Repo {
                pool: Arc::new(Pool {
                    url: format!("{}+{}", c.url, p.url),
                }),
            })
            .into(),
            Declaration::factory_tuple(move || {
                j.record("tuple");
                (Config { url: "c".into() }, Pool { url: "p".into() })
            })
            .into(),
        ])
        .unwrap();

    container.build().await.unwrap();
    assert_eq!(journal.count("tuple"), 1);
    assert_eq!(
        container.registry().resolve::<Repo>().unwrap().pool.url,
        "c+p"
    );
}

#[tokio::test]
async fn test_tuple_factory_starts_its_service_after_inputs_and_stops_in_reverse() {
    let journal = Journal::new();
    let (jc, jt, jw) = (journal.clone(), journal.clone(), journal.clone());
    let container = Container::new(AppContext::new());
    container
        .register([
            Declaration::factory(move |_: Arc<Pool>| MockService::<Worker>::tagged("worker", &jw))
                .service(),
            Declaration::factory_tuple(move |c: Arc<Config>| {
                jt.record("tuple");
                (
                    MockService::<Web>::tagged("web", &jt),
                    Pool { url: c.url.clone() },
                )
            })
            .service::<MockService<Web>>()
            .into(),
            Declaration::factory(move || {
                jc.record("config");
                Config { url: "db".into() }
            })
            .into(),
        ])
        .unwrap();

    container.build().await.unwrap();
    assert_eq!(journal.joined(), "config,tuple,up:web,up:worker");
    assert_eq!(container.registry().resolve::<Pool>().unwrap().url, "db");

    container.down().await.unwrap();
    assert_eq!(
        journal.joined(),
        "config,tuple,up:web,up:worker,down:worker,down:web"
    );
}

#[tokio::test]
async fn test_failing_tuple_factory_aborts_build() {
    let container = Container::new(AppContext::new());
    container
        .register([
            Declaration::factory(|pool: Arc<Pool>| Repo { pool }).into(),
            Declaration::try_factory_tuple(|| Err::<(Config, Pool), _>("dns lookup failed"))
                .into(),
        ])
        .unwrap();

    let err = container.build().await.unwrap_err();
    assert!(err.to_string().contains("dns lookup failed"));
    assert!(matches!(err.root(), ContainerError::Factory(_)));
    assert!(container.registry().resolve::<Repo>().is_err());
}

#[tokio::test]
async fn test_service_mark_outside_the_tuple_is_rejected() {
    let container = Container::new(AppContext::new());
    let err = container
        .register([Declaration::from(
            Declaration::factory_tuple(|| (Config { url: "c".into() }, Pool { url: "p".into() }))
                .service::<MockService<Web>>(),
        )])
        .unwrap_err();
    assert!(matches!(
        err,
        ContainerError::NotAnOutput { ref identity, .. } if *identity == Identity::of::<MockService<Web>>()
    ));
}

#[tokio::test]
async fn test_shared_factory_is_injected_by_inner_type() {
    let pool = Arc::new(Pool {
        url: "db://shared".into(),
    });
    let handed = Arc::clone(&pool);
    let container = Container::new(AppContext::new());
    container
        .register([
            Declaration::factory(|pool: Arc<Pool>| Repo { pool }).into(),
            Declaration::shared_factory(move || Arc::clone(&handed)).into(),
        ])
        .unwrap();

    container.build().await.unwrap();
    let repo = container.registry().resolve::<Repo>().unwrap();
    assert!(Arc::ptr_eq(&repo.pool, &pool));
}

#[tokio::test]
async fn test_invoke_target_without_provider_fails_at_the_target() {
    let container = Container::new(AppContext::new());
    let target = Declaration::task(|_: Arc<Config>| {});
    let identity = target.identity().clone();

    let err = container.invoke(target).await.unwrap_err();
    match &err {
        ContainerError::Initialize { identity: failed, .. } => assert_eq!(*failed, identity),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        err.root(),
        ContainerError::NotInitiated(id) if *id == Identity::of::<Config>()
    ));
}

#[tokio::test]
async fn test_failing_factory_aborts_build_but_started_services_still_stop() {
    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct Refused;

    let journal = Journal::new();
    let j = journal.clone();
    let container = Container::new(AppContext::new());
    container
        .register([
            Declaration::factory(move || MockService::<Web>::tagged("web", &j)).service(),
            Declaration::try_factory(|_: Arc<MockService<Web>>| Err::<Pool, _>(Refused)).into(),
        ])
        .unwrap();

    let err = container.build().await.unwrap_err();
    assert!(err.to_string().contains("connection refused"));
    assert!(matches!(err.root(), ContainerError::Factory(_)));

    container.down().await.unwrap();
    assert_eq!(journal.joined(), "up:web,down:web");
}

#[tokio::test]
async fn test_service_that_fails_to_start_is_still_stopped() {
    let journal = Journal::new();
    let j = journal.clone();
    let container = Container::new(AppContext::new());
    container
        .register([
            Declaration::factory(move || MockService::<Web>::tagged("web", &j).fail_up("bind"))
                .service(),
        ])
        .unwrap();

    let err = container.build().await.unwrap_err();
    assert!(matches!(err, ContainerError::ServiceStart { .. }));

    container.down().await.unwrap();
    assert_eq!(journal.joined(), "up:web,down:web");
}

#[tokio::test]
async fn test_context_service_receives_the_shared_context() {
    let journal = Journal::new();
    let ticker = MockContextService::new("ticker", &journal);
    let handle = ticker.clone();

    let ctx = AppContext::new();
    let container = Container::new(ctx.clone());
    container
        .register([Declaration::factory(move || ticker.clone()).context_service()])
        .unwrap();

    container.build().await.unwrap();
    let seen = handle.context().expect("context service was not started");
    assert!(!seen.is_closed());

    ctx.close();
    assert!(seen.is_closed());

    container.down().await.unwrap();
    assert_eq!(journal.joined(), "up:ticker,down:ticker");
}
