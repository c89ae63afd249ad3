#![allow(missing_docs)]

use keystone::{Binding, ContainerBuilder, Dispose, Key, Lifecycle, Token, error::Error};
use std::sync::{Arc, Mutex};

type Journal = Arc<Mutex<Vec<&'static str>>>;

struct Pool {
    journal: Journal,
}

struct Repository {
    journal: Journal,
    _pool: Arc<Pool>,
}

struct Session {
    journal: Journal,
}

struct Broken;

impl Dispose for Pool {
    async fn dispose(&self) -> Result<(), Error> {
        self.journal.lock().unwrap().push("pool");
        Ok(())
    }
}

impl Dispose for Repository {
    async fn dispose(&self) -> Result<(), Error> {
        self.journal.lock().unwrap().push("repository");
        Ok(())
    }
}

impl Dispose for Session {
    async fn dispose(&self) -> Result<(), Error> {
        self.journal.lock().unwrap().push("session");
        Ok(())
    }
}

impl Dispose for Broken {
    async fn dispose(&self) -> Result<(), Error> {
        Err(Error::Other("socket already closed"))
    }
}

fn builder(journal: &Journal) -> ContainerBuilder {
    let mut builder = ContainerBuilder::new();

    let pool_journal = journal.clone();
    builder.register(
        Token::new(),
        Binding::factory(move || Pool { journal: pool_journal.clone() })
            .singleton()
            .disposable(),
    ).unwrap();

    let repo_journal = journal.clone();
    builder.register(
        Token::new(),
        Binding::factory(move |pool: Arc<Pool>| Ok(Repository { journal: repo_journal.clone(), _pool: pool }))
            .singleton()
            .disposable(),
    ).unwrap();

    let session_journal = journal.clone();
    builder.register(
        Token::new(),
        Binding::factory(move || Session { journal: session_journal.clone() })
            .scoped()
            .disposable(),
    ).unwrap();

    builder
}

#[tokio::test]
async fn it_disposes_in_reverse_construction_order() {
    let journal = Journal::default();
    let container = builder(&journal).build();

    let _repo = container.resolve_shared::<Repository>().await.unwrap();

    container.dispose().await.unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["repository", "pool"]);
}

#[tokio::test]
async fn it_disposes_only_once() {
    let journal = Journal::default();
    let container = builder(&journal).build();

    let _repo = container.resolve_shared::<Repository>().await.unwrap();

    container.dispose().await.unwrap();
    container.dispose().await.unwrap();

    assert_eq!(journal.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn it_disposes_scope_without_touching_singletons() {
    let journal = Journal::default();
    let container = builder(&journal).build();

    let scope = container.create_scope();
    let _session = scope.resolve_shared::<Session>().await.unwrap();
    let _pool = scope.resolve_shared::<Pool>().await.unwrap();

    scope.dispose().await.unwrap();
    assert_eq!(*journal.lock().unwrap(), vec!["session"]);

    scope.dispose().await.unwrap();
    assert_eq!(*journal.lock().unwrap(), vec!["session"]);

    container.dispose().await.unwrap();
    assert_eq!(*journal.lock().unwrap(), vec!["session", "pool"]);
}

#[tokio::test]
async fn it_disposes_scope_by_id() {
    let journal = Journal::default();
    let container = builder(&journal).build();

    let scope = container.create_scope();
    let id = scope.scope_id().unwrap();
    let _session = scope.resolve_shared::<Session>().await.unwrap();

    container.dispose_scope(id).await.unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["session"]);
    assert!(matches!(
        scope.resolve_shared::<Session>().await,
        Err(Error::ScopeDisposed(scope_id)) if scope_id == id
    ));
}

#[tokio::test]
async fn it_disposes_open_scopes_with_the_container() {
    let journal = Journal::default();
    let container = builder(&journal).build();

    let _pool = container.resolve_shared::<Pool>().await.unwrap();
    let scope = container.create_scope();
    let _session = scope.resolve_shared::<Session>().await.unwrap();

    container.dispose().await.unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["session", "pool"]);
    assert!(matches!(scope.resolve_shared::<Session>().await, Err(Error::ContainerDisposed)));
    assert!(scope.dispose().await.is_ok());
}

#[tokio::test]
async fn it_disposes_registered_instances() {
    let journal = Journal::default();
    let mut builder = ContainerBuilder::new();
    builder.register(
        Token::named("pool"),
        Binding::instance(Pool { journal: journal.clone() }).disposable(),
    ).unwrap();
    let container = builder.build();

    container.register(
        Token::named("session"),
        Binding::instance(Session { journal: journal.clone() }).disposable(),
    ).unwrap();

    container.dispose().await.unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["session", "pool"]);
}

#[tokio::test]
async fn it_keeps_disposing_after_a_failure() {
    let journal = Journal::default();
    let container = builder(&journal).build();
    container.register(
        Token::new(),
        Binding::factory(|| Broken).disposable().with_lifecycle(Lifecycle::Singleton),
    ).unwrap();

    let _pool = container.resolve_shared::<Pool>().await.unwrap();
    let _broken = container.resolve_shared::<Broken>().await.unwrap();
    let _repo = container.resolve_shared::<Repository>().await.unwrap();

    let err = container.dispose().await.unwrap_err();

    assert_eq!(*journal.lock().unwrap(), vec!["repository", "pool"]);
    match err {
        Error::DisposalAggregate(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].token, Key::of::<Broken>());
            assert!(matches!(failures[0].error, Error::Other("socket already closed")));
        }
        _ => panic!("Expected DisposalAggregate error"),
    }

    assert!(container.dispose().await.is_ok());
}

fn session_binding(journal: &Journal) -> Binding<Session> {
    let journal = journal.clone();
    Binding::factory(move || Session { journal: journal.clone() }).disposable()
}

#[tokio::test]
async fn it_disposes_scoped_services_of_dropped_scopes() {
    let journal = Journal::default();
    let mut builder = ContainerBuilder::new();
    builder.register(Token::new(), session_binding(&journal).scoped()).unwrap();
    let container = builder.build();

    let scope = container.create_scope();
    scope.resolve_shared::<Session>().await.unwrap();
    drop(scope);

    container.dispose().await.unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["session"]);
}

#[tokio::test]
async fn it_disposes_scoped_services_resolved_from_root() {
    let journal = Journal::default();
    let mut builder = ContainerBuilder::new();
    builder.register(Token::new(), session_binding(&journal).scoped()).unwrap();
    let container = builder.build();

    drop(container.resolve_shared::<Session>().await.unwrap());

    container.dispose().await.unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["session"]);
}

#[tokio::test]
async fn it_disposes_replaced_singletons() {
    let journal = Journal::default();
    let mut builder = ContainerBuilder::new();
    builder.register(Token::new(), session_binding(&journal).singleton()).unwrap();
    let container = builder.build();

    drop(container.resolve_shared::<Session>().await.unwrap());
    container.register(Token::new(), session_binding(&journal).singleton()).unwrap();
    drop(container.resolve_shared::<Session>().await.unwrap());

    container.dispose().await.unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["session", "session"]);
}

#[tokio::test]
async fn it_disposes_live_transients_only() {
    let journal = Journal::default();
    let mut builder = ContainerBuilder::new();
    builder.register(Token::new(), session_binding(&journal)).unwrap();
    let container = builder.build();

    let kept = container.resolve_shared::<Session>().await.unwrap();
    drop(container.resolve_shared::<Session>().await.unwrap());

    container.dispose().await.unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["session"]);
    drop(kept);
}
