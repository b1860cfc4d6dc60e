//! Regression tests for object-level authorization bypasses.
//!
//! Each test encodes an attack that authentication alone would let through:
//! a genuine, in-date token presented against a resource id the caller does
//! not own. None of them may ever reach data or mutate state.

use warden_core::{
    Dispatcher, ExistencePolicy, Method, Resource, ResourceKind, Role, SigningSecret, TokenCodec,
    WardenConfig,
};

fn demo() -> Dispatcher {
    Dispatcher::with_demo_seed(SigningSecret::from_bytes([7u8; 32]), WardenConfig::default())
}

const SUBJECTS: [&str; 3] = ["1", "2", "3"];

fn seeded_resources() -> Vec<(ResourceKind, &'static str, &'static str)> {
    vec![
        (ResourceKind::Profile, "1", "1"),
        (ResourceKind::Profile, "2", "2"),
        (ResourceKind::Profile, "3", "3"),
        (ResourceKind::Profile, "999", "999"),
        (ResourceKind::Order, "1001", "1"),
        (ResourceKind::Order, "1002", "2"),
        (ResourceKind::Order, "1003", "3"),
    ]
}

#[test]
fn a_valid_token_never_opens_a_foreign_resource() {
    let dispatcher = demo();
    for subject in SUBJECTS {
        let token = dispatcher.login(subject).unwrap();
        for (kind, id, owner) in seeded_resources() {
            if owner == subject {
                continue;
            }
            for method in [Method::Get, Method::Put] {
                let payload = matches!(method, Method::Put).then_some(r#"{"name":"pwned"}"#);
                let response = dispatcher.dispatch(method, kind, id, Some(&token), payload);
                assert_eq!(
                    response.status, 403,
                    "subject {subject} got through with {method} {kind} {id}"
                );
                assert_eq!(response.body["error_code"], "FORBIDDEN");
                // The denial body carries no resource data.
                assert!(response.body.get("name").is_none());
                assert!(response.body.get("ownerId").is_none());
            }
        }
    }
}

#[test]
fn denied_writes_leave_the_store_untouched() {
    let dispatcher = demo();
    let before: Vec<Resource> = seeded_resources()
        .iter()
        .map(|(kind, id, _)| dispatcher.store().get(*kind, id).unwrap())
        .collect();

    for subject in SUBJECTS {
        let token = dispatcher.login(subject).unwrap();
        for (kind, id, owner) in seeded_resources() {
            if owner == subject {
                continue;
            }
            dispatcher.dispatch(
                Method::Put,
                kind,
                id,
                Some(&token),
                Some(r#"{"name":"pwned","ownerId":"2","email":"evil@example.com"}"#),
            );
        }
    }

    for (snapshot, (kind, id, _)) in before.iter().zip(seeded_resources()) {
        assert_eq!(
            &dispatcher.store().get(kind, id).unwrap(),
            snapshot,
            "{kind} {id} was mutated by a denied write"
        );
    }
}

#[test]
fn ownership_cannot_be_transferred_even_by_the_owner() {
    let dispatcher = demo();
    let token = dispatcher.login("2").unwrap();
    let response = dispatcher.dispatch(
        Method::Put,
        ResourceKind::Profile,
        "2",
        Some(&token),
        Some(r#"{"ownerId":"999"}"#),
    );
    assert_eq!(response.status, 200);
    assert_eq!(
        dispatcher.store().get(ResourceKind::Profile, "2").unwrap().owner_id,
        "2"
    );
}

#[test]
fn a_self_signed_admin_token_is_unauthenticated_not_forbidden() {
    let dispatcher = demo();
    // The attacker controls everything about this token except the key.
    let forged = TokenCodec::new(SigningSecret::from_bytes([0xEE; 32])).issue("999", Role::Admin);
    let response =
        dispatcher.dispatch(Method::Get, ResourceKind::Profile, "1", Some(&forged), None);
    assert_eq!(response.status, 401);
    assert_eq!(response.body["error_code"], "NOT_AUTHENTICATED");
}

#[test]
fn a_valid_token_for_an_unknown_subject_grants_nothing() {
    let dispatcher = demo();
    // Properly signed, but the subject owns no resources.
    let token = dispatcher.issue_token("777", Role::User);
    let foreign =
        dispatcher.dispatch(Method::Get, ResourceKind::Profile, "2", Some(&token), None);
    assert_eq!(foreign.status, 403);
    let own = dispatcher.dispatch(Method::Get, ResourceKind::Profile, "777", Some(&token), None);
    assert_eq!(own.status, 404);
}

#[test]
fn admins_override_ownership_everywhere() {
    let dispatcher = demo();
    let token = dispatcher.login("999").unwrap();
    for (kind, id, _) in seeded_resources() {
        let read = dispatcher.dispatch(Method::Get, kind, id, Some(&token), None);
        assert_eq!(read.status, 200, "admin read {kind} {id}");
        let write = dispatcher.dispatch(
            Method::Put,
            kind,
            id,
            Some(&token),
            Some(r#"{"reviewed":true}"#),
        );
        assert_eq!(write.status, 200, "admin write {kind} {id}");
        assert_eq!(write.body["reviewed"], true);
    }
}

#[test]
fn unauthenticated_probing_cannot_distinguish_ids() {
    let dispatcher = demo();
    let existing = dispatcher.dispatch(Method::Get, ResourceKind::Profile, "2", None, None);
    let missing = dispatcher.dispatch(Method::Get, ResourceKind::Profile, "no-such", None, None);
    assert_eq!(existing.status, 401);
    assert_eq!(existing.status, missing.status);
    assert_eq!(existing.body, missing.body);
}

#[test]
fn masked_denials_are_uniform_for_non_admins() {
    let config = WardenConfig::default().with_existence_policy(ExistencePolicy::Mask);
    let dispatcher = Dispatcher::with_demo_seed(SigningSecret::from_bytes([7u8; 32]), config);
    let token = dispatcher.login("2").unwrap();

    let foreign = dispatcher.dispatch(Method::Get, ResourceKind::Profile, "1", Some(&token), None);
    let missing =
        dispatcher.dispatch(Method::Get, ResourceKind::Profile, "no-such", Some(&token), None);
    assert_eq!(foreign.status, 403);
    assert_eq!(foreign.status, missing.status);
    assert_eq!(foreign.body, missing.body);
}

#[test]
fn an_expired_token_cannot_write() {
    let dispatcher = demo();
    let t0 = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let token = dispatcher.login_at(t0, "2").unwrap();
    let late = t0 + chrono::Duration::seconds(3601);

    let before = dispatcher.store().get(ResourceKind::Profile, "2").unwrap();
    let response = dispatcher.dispatch_at(
        late,
        Method::Put,
        ResourceKind::Profile,
        "2",
        Some(&token),
        Some(r#"{"name":"late"}"#),
    );
    assert_eq!(response.status, 401);
    assert_eq!(dispatcher.store().get(ResourceKind::Profile, "2").unwrap(), before);
}
