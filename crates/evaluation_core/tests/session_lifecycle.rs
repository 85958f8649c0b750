use std::sync::Arc;

use evaluation_core::{
    InMemorySessionStore, InvalidationReason, SessionManager, SessionStatus, TAB_SWITCH_VIOLATION,
};
use uuid::Uuid;

#[derive(Clone, Copy, Debug)]
enum Call {
    Validate,
    Heartbeat,
    TabSwitch,
    Invalidate,
    Complete,
}

const CALLS: [Call; 5] = [
    Call::Validate,
    Call::Heartbeat,
    Call::TabSwitch,
    Call::Invalidate,
    Call::Complete,
];

async fn apply(manager: &SessionManager, id: Uuid, call: Call) {
    match call {
        Call::Validate => {
            manager.validate_session(id).await;
        }
        Call::Heartbeat => manager.update_activity(id).await,
        Call::TabSwitch => {
            manager.record_tab_switch(id).await;
        }
        Call::Invalidate => {
            manager
                .invalidate_session(id, InvalidationReason::from("manual_abort"))
                .await
        }
        Call::Complete => manager.complete_session(id).await,
    }
}

/// Every three-call sequence: once a session leaves `Active` it never comes back,
/// the tab-switch counter never decreases, and the two terminal shapes never mix.
#[tokio::test]
async fn terminal_states_are_final_for_every_call_sequence() {
    let store = Arc::new(InMemorySessionStore::new());
    let manager = SessionManager::new(store);

    for a in CALLS {
        for b in CALLS {
            for c in CALLS {
                let id = manager
                    .create_session(Uuid::new_v4(), Uuid::new_v4(), "css", "basic", vec![])
                    .await
                    .unwrap();

                let mut was_terminal = false;
                let mut last_switches = 0;
                for call in [a, b, c] {
                    apply(&manager, id, call).await;
                    let session = manager.get_session(id).await.unwrap();

                    if was_terminal {
                        assert!(!session.is_active, "{:?} reactivated session", [a, b, c]);
                    }
                    was_terminal |= !session.is_active;

                    assert!(session.tab_switches >= last_switches);
                    last_switches = session.tab_switches;

                    match session.status() {
                        SessionStatus::Active => assert!(session.is_active),
                        SessionStatus::Completed => {
                            assert!(session.invalidation_reason.is_none());
                            assert!(session.invalidated_at.is_none());
                        }
                        SessionStatus::Invalidated => {
                            assert!(session.completed_at.is_none());
                            assert!(session.invalidation_reason.is_some());
                        }
                    }
                }
            }
        }
    }
}

#[tokio::test]
async fn full_attempt_flow() {
    let store = Arc::new(InMemorySessionStore::new());
    let manager = SessionManager::new(store);
    let user = Uuid::new_v4();

    let seen = manager.get_user_seen_questions(user, "react", "mid").await;
    assert!(seen.is_empty());

    let first = manager
        .create_session(
            user,
            Uuid::new_v4(),
            "react",
            "mid",
            vec!["hooks-1".into(), "jsx-4".into()],
        )
        .await
        .unwrap();
    assert!(manager.validate_session(first).await);
    assert_eq!(manager.record_tab_switch(first).await, 1);
    manager.complete_session(first).await;
    assert!(!manager.validate_session(first).await);

    let seen = manager.get_user_seen_questions(user, "react", "mid").await;
    let second = manager
        .create_session(
            user,
            Uuid::new_v4(),
            "react",
            "mid",
            vec!["jsx-4".into(), "state-2".into()],
        )
        .await
        .unwrap();
    assert_eq!(seen.len(), 2);

    for expected in [1, 2] {
        assert_eq!(manager.record_tab_switch(second).await, expected);
    }
    assert_eq!(manager.record_tab_switch(second).await, TAB_SWITCH_VIOLATION);

    let record = manager.get_session(second).await.unwrap();
    assert_eq!(record.status(), SessionStatus::Invalidated);

    let seen = manager.get_user_seen_questions(user, "react", "mid").await;
    let seen: Vec<_> = seen.into_iter().collect();
    assert_eq!(seen, vec!["hooks-1", "jsx-4", "state-2"]);
}
