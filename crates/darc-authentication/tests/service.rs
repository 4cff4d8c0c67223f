//! End-to-end behaviour of the policy service API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_matches::assert_matches;
use darc_authentication::{
    AddPolicy, Auth, AuthenticationService, GetPolicy, ServiceConfig, UpdatePolicy,
    UpdatePolicyPin, UpdatePolicyPinReply,
};
use darc_core::{Darc, DarcError, Ed25519Scheme, Entry, Rule, SignatureScheme};
use darc_recovery::PinState;
use darc_testkit::{init_tracing, signed_by, CapturingPinSink, KeyFixture, SeededRandom};
use std::sync::Arc;

struct Node {
    server: KeyFixture,
    sink: Arc<CapturingPinSink>,
    service: AuthenticationService,
}

fn node() -> Node {
    init_tracing();
    let server = KeyFixture::from_seed_string("server");
    let sink = Arc::new(CapturingPinSink::new());
    let service = AuthenticationService::new(
        ServiceConfig::default(),
        server.pair().clone(),
        Arc::new(Ed25519Scheme),
        Arc::new(SeededRandom::new(42)),
        sink.clone(),
    )
    .unwrap();
    Node {
        server,
        sink,
        service,
    }
}

fn rule(s: &str) -> Rule {
    Rule::parse(s).unwrap()
}

#[test]
fn identity_create_skipchain_scenario() {
    let node = node();
    let key_a = KeyFixture::from_seed_string("key-a");
    let key_b = KeyFixture::from_seed_string("key-b");
    let message = b"create skipchain";

    let record = Darc::new(
        rule("Identity.CreateSkipchain"),
        vec![Entry::Key(node.server.public())],
        vec![Entry::Key(key_a.public())],
    );
    let reply = node
        .service
        .update_policy(UpdatePolicy {
            signatures: signed_by(&record, &[&node.server]),
            new_darc: record.clone(),
        })
        .unwrap();
    assert_eq!(reply.id, record.id());
    assert_eq!(reply.version, 0);

    node.service
        .verify("Identity", "CreateSkipchain", message, &key_a.sign(message))
        .unwrap();
    assert_matches!(
        node.service
            .verify("Identity", "CreateSkipchain", message, &key_b.sign(message)),
        Err(DarcError::Unauthorized { .. })
    );
    // Falls back through Identity to the root record, which only lists the server.
    assert_matches!(
        node.service
            .verify("Identity", "OtherMethod", message, &key_a.sign(message)),
        Err(DarcError::Unauthorized { .. })
    );
    node.service
        .verify_auth(
            "Identity",
            "OtherMethod",
            message,
            &Auth {
                signature: node.server.sign(message),
            },
        )
        .unwrap();
}

#[test]
fn forged_signature_is_reported_separately() {
    let node = node();
    let mut forged = node.server.sign(b"original");
    forged.bytes[0] ^= 0xff;
    assert_matches!(
        node.service.verify("Identity", "Create", b"original", &forged),
        Err(DarcError::BadSignature { .. })
    );
}

#[test]
fn get_policy_falls_back_to_broader_rules() {
    let node = node();
    let reply = node
        .service
        .get_policy(&GetPolicy {
            rule: Some(rule("Identity.CreateSkipchain")),
        })
        .unwrap();
    assert!(!reply.exact);
    assert!(reply.latest.rule().is_root());
    assert_eq!(reply.latest.users(), &[Entry::Key(node.server.public())]);

    let service_record = Darc::new(rule("Identity"), vec![], vec![]);
    node.service
        .add_policy(AddPolicy {
            signatures: signed_by(&service_record, &[&node.server]),
            new_darc: service_record.clone(),
        })
        .unwrap();

    let reply = node
        .service
        .get_policy(&GetPolicy {
            rule: Some(rule("Identity.CreateSkipchain")),
        })
        .unwrap();
    assert_eq!(reply.latest.id(), service_record.id());

    let reply = node
        .service
        .get_policy(&GetPolicy {
            rule: Some(rule("Identity")),
        })
        .unwrap();
    assert!(reply.exact);
}

#[test]
fn get_policy_without_rule_returns_root() {
    let node = node();
    let reply = node.service.get_policy(&GetPolicy::default()).unwrap();
    assert!(reply.exact);
    assert!(reply.latest.rule().is_root());
    assert_eq!(reply.latest.owners(), &[Entry::Key(node.server.public())]);

    let decoded: GetPolicy = serde_json::from_str("{}").unwrap();
    assert_eq!(decoded, GetPolicy { rule: None });
}

#[test]
fn add_policy_requires_root_authority_and_a_new_lineage() {
    let node = node();
    let admin = KeyFixture::from_seed_string("admin");
    let record = Darc::new(rule("Skipchain"), vec![Entry::Key(admin.public())], vec![]);

    assert_matches!(
        node.service.add_policy(AddPolicy {
            signatures: signed_by(&record, &[&admin]),
            new_darc: record.clone(),
        }),
        Err(DarcError::Unauthorized { .. })
    );

    let reply = node
        .service
        .add_policy(AddPolicy {
            signatures: signed_by(&record, &[&node.server]),
            new_darc: record.clone(),
        })
        .unwrap();
    assert_eq!(reply.id, record.id());

    let again = Darc::new(rule("Skipchain"), vec![], vec![]);
    assert_matches!(
        node.service.add_policy(AddPolicy {
            signatures: signed_by(&again, &[&node.server]),
            new_darc: again,
        }),
        Err(DarcError::StaleVersion { .. })
    );

    let next = record.evolve(record.owners().to_vec(), vec![]);
    assert_matches!(
        node.service.add_policy(AddPolicy {
            signatures: signed_by(&next, &[&admin]),
            new_darc: next,
        }),
        Err(DarcError::Invalid { .. })
    );
}

#[test]
fn update_policy_pin_issues_then_commits() {
    let node = node();
    let admin = KeyFixture::from_seed_string("admin");
    let target = rule("Identity.CreateSkipchain");
    let record = Darc::new(target.clone(), vec![Entry::Key(admin.public())], vec![]);

    let issued = node
        .service
        .update_policy_pin(UpdatePolicyPin {
            new_darc: record.clone(),
            pin: String::new(),
        })
        .unwrap();
    assert_eq!(
        issued,
        UpdatePolicyPinReply::PinIssued {
            rule: target.clone()
        }
    );
    let pin = node.sink.last_pin(&target).unwrap();
    assert!(!serde_json::to_string(&issued).unwrap().contains(&pin));

    let committed = node
        .service
        .update_policy_pin(UpdatePolicyPin {
            new_darc: record.clone(),
            pin: pin.clone(),
        })
        .unwrap();
    let UpdatePolicyPinReply::Committed {
        id,
        server_signature,
    } = committed
    else {
        panic!("expected a commit, got {:?}", committed);
    };
    assert_eq!(id, record.id());
    assert!(Ed25519Scheme.verify(
        &node.service.server_public_key(),
        id.as_bytes(),
        &server_signature
    ));
    assert_eq!(node.service.recovery().state(&target), PinState::Consumed);
    assert_eq!(node.service.store().get(&target).unwrap().id(), record.id());

    assert_matches!(
        node.service.update_policy_pin(UpdatePolicyPin {
            new_darc: record,
            pin,
        }),
        Err(DarcError::WrongState { .. })
    );
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let server = KeyFixture::from_seed_string("server");
    let config = ServiceConfig {
        max_reference_depth: 0,
        ..ServiceConfig::default()
    };
    let result = AuthenticationService::new(
        config,
        server.pair().clone(),
        Arc::new(Ed25519Scheme),
        Arc::new(SeededRandom::new(1)),
        Arc::new(CapturingPinSink::new()),
    );
    assert_matches!(result, Err(DarcError::Config { .. }));
}

#[test]
fn from_config_loads_persisted_server_key() {
    let dir = tempfile::tempdir().unwrap();
    let server = KeyFixture::from_seed_string("persisted");
    let key_path = dir.path().join("server.key");
    std::fs::write(&key_path, server.secret_hex()).unwrap();

    let service = AuthenticationService::from_config(ServiceConfig {
        server_key_path: Some(key_path),
        ..ServiceConfig::default()
    })
    .unwrap();
    assert_eq!(service.server_public_key(), server.public());
    assert_eq!(
        service.store().root().unwrap().owners(),
        &[Entry::Key(server.public())]
    );
}
