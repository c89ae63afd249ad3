#![allow(missing_docs)]
#![cfg(feature = "http")]

use http::Request;
use keystone::{Container, ContainerBuilder, error::Error};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

struct RequestContext {
    id: usize,
}

#[tokio::test]
async fn it_resolves_scoped_services_per_request() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut builder = ContainerBuilder::new();
    builder.register_scoped_factory(move || RequestContext { id: counter.fetch_add(1, Ordering::SeqCst) });
    let container = builder.build();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let mut req = Request::get("/").body(()).unwrap();
        req.extensions_mut().insert(container.create_scope());

        let scope = Container::try_from(req.extensions()).unwrap();
        let first = scope.resolve_shared::<RequestContext>().await.unwrap();
        let second = scope.resolve_shared::<RequestContext>().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        ids.push(first.id);

        scope.dispose().await.unwrap();
    }

    assert_ne!(ids[0], ids[1]);
}

#[test]
fn it_borrows_container_from_extensions() {
    let container = ContainerBuilder::new().build().create_scope();
    let id = container.scope_id();

    let mut req = Request::get("/").body(()).unwrap();
    req.extensions_mut().insert(container);

    let container: &Container = req.extensions().try_into().unwrap();

    assert_eq!(container.scope_id(), id);
}

#[test]
fn it_reports_missing_container() {
    let req = Request::get("/").body(()).unwrap();
    let (parts, _) = req.into_parts();

    let err = Container::try_from(&parts).unwrap_err();

    assert!(matches!(err, Error::ContainerMissing));
    assert_eq!(err.to_string(), "Services Error: DI container is missing");
}
