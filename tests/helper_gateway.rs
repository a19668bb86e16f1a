//! End-to-end tests driving the engine through the subprocess gateway.
//!
//! The helper is a shell script that keeps zones in a temp directory and
//! logs every invocation, standing in for the privileged helper.

mod common;

use std::sync::Arc;

use common::*;
use zone_edit::config::EngineConfig;
use zone_edit::{
    BatchOutcome, BindZoneCodec, ChangeOutcome, GatewayError, HelperGateway, MutationRequest,
    NamedLocks, ZoneCodec, ZoneEngine, ZoneError,
};

fn helper_engine(helper: &FakeHelper) -> ZoneEngine {
    let gateway = HelperGateway::new(&helper.gateway_config()).unwrap();
    ZoneEngine::with_parts(
        EngineConfig::default(),
        Arc::new(gateway),
        Arc::new(BindZoneCodec),
        NamedLocks::new(),
    )
}

#[tokio::test]
async fn test_add_fetches_then_stores_through_helper() {
    let helper = FakeHelper::new();
    helper.put_zone(ZONE, &zone_text(BASE_SERIAL));
    let engine = helper_engine(&helper);

    let outcome = engine.add(ZONE, "www", "A", "10.0.0.5").await.unwrap();
    assert_eq!(outcome, ChangeOutcome::Updated { serial: BASE_SERIAL + 1 });
    assert_eq!(
        helper.calls(),
        vec!["NAMED_GET example.com", "NAMED_SET example.com"]
    );

    let zone = BindZoneCodec.parse(&helper.zone_text(ZONE)).unwrap();
    assert_eq!(zone.soa.serial, BASE_SERIAL + 1);
    assert_eq!(zone.a[0].ip, "10.0.0.5");
    assert_eq!(zone.ns.len(), 1);
}

#[tokio::test]
async fn test_unchanged_add_only_fetches() {
    let helper = FakeHelper::new();
    helper.put_zone(ZONE, &zone_text(BASE_SERIAL));
    let engine = helper_engine(&helper);

    let outcome = engine
        .add(ZONE, "@", "NS", "ns1.example.com.")
        .await
        .unwrap();
    assert_eq!(outcome, ChangeOutcome::Unchanged);
    assert_eq!(helper.calls(), vec!["NAMED_GET example.com"]);
    assert_eq!(helper.zone_text(ZONE), zone_text(BASE_SERIAL));
}

#[tokio::test]
async fn test_batch_stores_regenerated_text() {
    let helper = FakeHelper::new();
    helper.put_zone(ZONE, &zone_text(BASE_SERIAL));
    let engine = helper_engine(&helper);

    let outcome = engine
        .apply_set(
            ZONE,
            vec![
                MutationRequest::add("mail", "MX", "10 mail.example.com."),
                MutationRequest::add("@", "CAA", "0 issue \"letsencrypt.org\""),
                MutationRequest::add("_sip._tcp", "SRV", "10 60 5060 sip.example.com."),
            ],
        )
        .await
        .unwrap();

    let BatchOutcome::Updated { changes, text, .. } = outcome else {
        panic!("batch did not update");
    };
    assert_eq!(changes, 3);
    assert_eq!(text, helper.zone_text(ZONE));

    let zone = BindZoneCodec.parse(&text).unwrap();
    assert_eq!(zone.mx[0].preference, 10);
    assert_eq!(zone.caa[0].value, "letsencrypt.org");
    assert_eq!(zone.srv[0].port, 5060);
}

#[tokio::test]
async fn test_helper_failure_surfaces_stderr() {
    let helper = FakeHelper::new();
    let engine = helper_engine(&helper);

    let err = engine.show("missing.example").await.unwrap_err();
    match err {
        ZoneError::PrivilegedOperation(GatewayError::Failed { stderr, .. }) => {
            assert!(stderr.contains("zone missing.example not found"), "{}", stderr);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_resync_invokes_sync_verb() {
    let helper = FakeHelper::new();
    helper.put_zone(ZONE, &zone_text(BASE_SERIAL));
    let engine = helper_engine(&helper);

    engine.resync(ZONE).await.unwrap();
    assert_eq!(helper.calls(), vec!["NAMED_SYNC example.com"]);
}
