//! End-to-end scheduler behavior over a mock transport.
//!
//! Every test runs under paused time, so deadlines fire exactly when
//! the test advances (or auto-advances) the clock.

use aerolink_catalog::{
    Catalog, Event, EventPattern, FieldKind, MessageDescriptor, Template, TemplatePattern,
};
use aerolink_expect::{ExpectNode, NodeState};
use aerolink_session::{
    MockLog, MockMode, MockTransport, Session, SessionConfig, SessionError, TransportHook,
};
use aerolink_types::{MessageId, ParamValue, Policy};
use std::sync::Arc;
use std::time::Duration;

const TILT: MessageId = MessageId::new(0x0102);
const TILT_CHANGED: MessageId = MessageId::new(0x0202);
const STATE_CHANGED: MessageId = MessageId::new(0x0401);
const TAKEOFF: MessageId = MessageId::new(0x0101);

fn catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::builder()
            .message(
                MessageDescriptor::command(TILT, "ardrone3.MaxTilt")
                    .field("current", FieldKind::F64)
                    .default_timeout(Duration::from_secs(1))
                    .template(Template::Pattern(
                        TemplatePattern::new("ardrone3.MaxTiltChanged")
                            .from_command("current", "current"),
                    )),
            )
            .message(
                MessageDescriptor::event(TILT_CHANGED, "ardrone3.MaxTiltChanged")
                    .field("current", FieldKind::F64)
                    .default_timeout(Duration::from_secs(2)),
            )
            .message(
                MessageDescriptor::event(STATE_CHANGED, "ardrone3.FlyingStateChanged")
                    .field("state", FieldKind::Enum)
                    .default_timeout(Duration::from_secs(5)),
            )
            .message(
                MessageDescriptor::command(TAKEOFF, "ardrone3.TakeOff")
                    .default_timeout(Duration::from_secs(1)),
            )
            .build()
            .unwrap(),
    )
}

/// Routes scheduler logs through the capture-aware test writer.
/// `RUST_LOG` overrides the default filter when set.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("aerolink_session=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn spawn(mode: MockMode) -> (Session, TransportHook, MockLog, Arc<Catalog>) {
    init_tracing();
    let catalog = catalog();
    let log = MockLog::default();
    let (session, hook) = Session::spawn(Arc::clone(&catalog), SessionConfig::default(), {
        let log = log.clone();
        move |hook| MockTransport::new(hook, log, mode)
    });
    (session, hook, log, catalog)
}

fn flying(state: &str) -> Event {
    Event::new(STATE_CHANGED).arg("state", ParamValue::enum_value(state))
}

fn state_pattern(catalog: &Catalog, state: &str) -> EventPattern {
    catalog
        .event_pattern("ardrone3.FlyingStateChanged")
        .unwrap()
        .arg("state", ParamValue::enum_value(state))
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn command_resolves_when_the_expected_event_arrives() {
    let (session, hook, log, catalog) = spawn(MockMode::AckAll);
    let command = catalog
        .command("ardrone3.MaxTilt")
        .unwrap()
        .arg("current", 10.0_f64)
        .unwrap();

    let expectation = session.send(command).await.unwrap();
    assert_eq!(log.len(), 1);

    hook.event(Event::new(TILT_CHANGED).arg("current", 10.0_f64));
    let outcome = expectation.wait().await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn command_times_out_without_the_expected_event() {
    let (session, _hook, log, catalog) = spawn(MockMode::AckAll);
    let command = catalog
        .command("ardrone3.MaxTilt")
        .unwrap()
        .arg("current", 10.0_f64)
        .unwrap();

    let expectation = session.send(command).await.unwrap();
    // Paused time auto-advances to the pattern deadline.
    let outcome = expectation.wait().await.unwrap();
    assert_eq!(outcome.state, NodeState::TimedOut);
    assert_eq!(log.len(), 1);

    let text = outcome.explain.to_string();
    assert!(text.contains("deadline elapsed"), "explain was:\n{text}");
}

#[tokio::test(start_paused = true)]
async fn wrong_event_value_does_not_satisfy_the_template() {
    let (session, hook, _log, catalog) = spawn(MockMode::AckAll);
    let command = catalog
        .command("ardrone3.MaxTilt")
        .unwrap()
        .arg("current", 10.0_f64)
        .unwrap();

    let expectation = session.send(command).await.unwrap();
    hook.event(Event::new(TILT_CHANGED).arg("current", 4.0_f64));

    let outcome = expectation.wait().await.unwrap();
    assert_eq!(outcome.state, NodeState::TimedOut);

    // The non-matching event was still cached.
    let cached = session
        .get_state(catalog.event_pattern("ardrone3.MaxTiltChanged").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.get("current"), Some(&ParamValue::F64(4.0)));
}

#[tokio::test(start_paused = true)]
async fn takeoff_sequence_resolves_step_by_step() {
    let (session, hook, log, catalog) = spawn(MockMode::AckAll);

    let node = ExpectNode::command(catalog.command("ardrone3.TakeOff").unwrap())
        .then(ExpectNode::event_with(
            state_pattern(&catalog, "motor_ramping"),
            Policy::Wait,
        ))
        .then(ExpectNode::event_with(
            state_pattern(&catalog, "takingoff"),
            Policy::Wait,
        ));
    let expectation = session.submit(node).await.unwrap();
    assert_eq!(log.len(), 1);

    hook.event(flying("motor_ramping"));
    hook.event(flying("takingoff"));
    let outcome = expectation.wait().await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn or_over_a_satisfied_check_never_sends_the_alternative() {
    let (session, hook, log, catalog) = spawn(MockMode::AckAll);

    hook.event(flying("hovering"));
    let _ = session
        .get_state(state_pattern(&catalog, "hovering"))
        .await
        .unwrap();

    // Already hovering: the check branch wins at activation and the
    // takeoff branch is never started.
    let node = ExpectNode::event_with(state_pattern(&catalog, "hovering"), Policy::Check).or(
        ExpectNode::command(catalog.command("ardrone3.TakeOff").unwrap()).then(
            ExpectNode::event_with(state_pattern(&catalog, "hovering"), Policy::Wait),
        ),
    );
    let outcome = session.submit(node).await.unwrap().wait().await.unwrap();
    assert!(outcome.is_success());
    assert!(log.is_empty());
}

#[tokio::test(start_paused = true)]
async fn read_state_honors_each_policy() {
    let (session, hook, _log, catalog) = spawn(MockMode::AckAll);

    hook.event(flying("hovering"));
    let _ = session
        .get_state(state_pattern(&catalog, "hovering"))
        .await
        .unwrap();

    // check and check_wait are answered from the cache.
    let got = session
        .read_state(
            state_pattern(&catalog, "hovering"),
            Policy::Check,
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert!(got.is_some());
    let got = session
        .read_state(
            state_pattern(&catalog, "hovering"),
            Policy::CheckWait,
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert!(got.is_some());

    // wait needs a fresh event and the cache does not count.
    let got = session
        .read_state(
            state_pattern(&catalog, "hovering"),
            Policy::Wait,
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert!(got.is_none());

    // check on a never-observed state misses without waiting.
    let got = session
        .read_state(
            state_pattern(&catalog, "landed"),
            Policy::Check,
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert!(got.is_none());
}

#[tokio::test(start_paused = true)]
async fn synchronous_send_rejection_folds_into_timeout() {
    let (session, _hook, log, catalog) = spawn(MockMode::RejectAll);
    let command = catalog
        .command("ardrone3.MaxTilt")
        .unwrap()
        .arg("current", 10.0_f64)
        .unwrap();

    let outcome = session.send(command).await.unwrap().wait().await.unwrap();
    assert_eq!(outcome.state, NodeState::TimedOut);
    assert!(log.is_empty());
    assert!(outcome.explain.to_string().contains("send failed"));
}

#[tokio::test(start_paused = true)]
async fn asynchronous_send_failure_folds_into_timeout() {
    let (session, _hook, log, catalog) = spawn(MockMode::FailAll);
    let command = catalog
        .command("ardrone3.MaxTilt")
        .unwrap()
        .arg("current", 10.0_f64)
        .unwrap();

    let outcome = session.send(command).await.unwrap().wait().await.unwrap();
    assert_eq!(outcome.state, NodeState::TimedOut);
    assert_eq!(log.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn check_policy_is_answered_from_the_cache() {
    let (session, hook, _log, catalog) = spawn(MockMode::AckAll);

    hook.event(flying("hovering"));
    // A state read syncs with the scheduler, so the event is applied.
    let cached = session
        .get_state(state_pattern(&catalog, "hovering"))
        .await
        .unwrap();
    assert!(cached.is_some());

    let node = ExpectNode::event_with(state_pattern(&catalog, "hovering"), Policy::Check);
    let outcome = session.submit(node).await.unwrap().wait().await.unwrap();
    assert!(outcome.is_success());

    // A check for a state never observed resolves timed out at once.
    let node = ExpectNode::event_with(state_pattern(&catalog, "landed"), Policy::Check);
    let outcome = session.submit(node).await.unwrap().wait().await.unwrap();
    assert_eq!(outcome.state, NodeState::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn wait_policy_ignores_the_cache() {
    let (session, hook, _log, catalog) = spawn(MockMode::AckAll);

    hook.event(flying("hovering"));
    assert!(session
        .check_state(state_pattern(&catalog, "hovering"))
        .await
        .unwrap());

    let node = ExpectNode::event_with(state_pattern(&catalog, "hovering"), Policy::Wait);
    let outcome = session.submit(node).await.unwrap().wait().await.unwrap();
    // No fresh event arrived, so the cached one does not count.
    assert_eq!(outcome.state, NodeState::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn one_event_fans_out_to_every_pending_tree() {
    let (session, hook, _log, catalog) = spawn(MockMode::AckAll);

    let first = session
        .submit(ExpectNode::event_with(
            state_pattern(&catalog, "hovering"),
            Policy::Wait,
        ))
        .await
        .unwrap();
    let second = session
        .submit(ExpectNode::event_with(
            state_pattern(&catalog, "hovering"),
            Policy::Wait,
        ))
        .await
        .unwrap();

    hook.event(flying("hovering"));
    assert!(first.wait().await.unwrap().is_success());
    assert!(second.wait().await.unwrap().is_success());
}

#[tokio::test(start_paused = true)]
async fn or_combinator_resolves_on_either_branch() {
    let (session, hook, _log, catalog) = spawn(MockMode::AckAll);

    let node = ExpectNode::event_with(state_pattern(&catalog, "hovering"), Policy::Wait).or(
        ExpectNode::event_with(state_pattern(&catalog, "landed"), Policy::Wait),
    );
    let expectation = session.submit(node).await.unwrap();

    hook.event(flying("landed"));
    let outcome = expectation.wait().await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn link_loss_forces_pending_expectations_out() {
    let (session, hook, _log, catalog) = spawn(MockMode::AckAll);

    let expectation = session
        .submit(ExpectNode::event_with(
            state_pattern(&catalog, "hovering"),
            Policy::Wait,
        ))
        .await
        .unwrap();

    hook.link_lost();
    let outcome = expectation.wait().await.unwrap();
    assert_eq!(outcome.state, NodeState::TimedOut);
    assert!(outcome.explain.to_string().contains("link lost"));
}

#[tokio::test(start_paused = true)]
async fn sends_fail_while_the_link_is_down() {
    let (session, hook, log, catalog) = spawn(MockMode::AckAll);

    hook.link_lost();
    // Sync with the scheduler so the transition is applied.
    let _ = session
        .get_state(state_pattern(&catalog, "hovering"))
        .await
        .unwrap();

    let command = catalog
        .command("ardrone3.MaxTilt")
        .unwrap()
        .arg("current", 10.0_f64)
        .unwrap();
    let outcome = session.send(command).await.unwrap().wait().await.unwrap();
    assert_eq!(outcome.state, NodeState::TimedOut);
    assert!(log.is_empty());
}

#[tokio::test(start_paused = true)]
async fn reconnection_resets_the_cache() {
    let (session, hook, _log, catalog) = spawn(MockMode::AckAll);

    hook.event(flying("hovering"));
    assert!(session
        .check_state(state_pattern(&catalog, "hovering"))
        .await
        .unwrap());

    hook.link_lost();
    hook.link_up();
    assert!(!session
        .check_state(state_pattern(&catalog, "hovering"))
        .await
        .unwrap());
}

#[tokio::test(start_paused = true)]
async fn query_state_needs_a_fresh_event() {
    let (session, hook, _log, catalog) = spawn(MockMode::AckAll);

    // The cached observation must not answer a query.
    hook.event(flying("hovering"));
    let _ = session
        .get_state(state_pattern(&catalog, "hovering"))
        .await
        .unwrap();
    let got = session
        .query_state(state_pattern(&catalog, "hovering"), Duration::from_secs(1))
        .await
        .unwrap();
    assert!(got.is_none());

    // A fresh event during the query does.
    let querier = {
        let session = session.clone();
        let pattern = state_pattern(&catalog, "hovering");
        tokio::spawn(async move { session.query_state(pattern, Duration::from_secs(1)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    hook.event(flying("hovering"));
    let got = querier.await.unwrap().unwrap();
    assert_eq!(
        got.unwrap().get("state"),
        Some(&ParamValue::enum_value("hovering"))
    );
}

#[tokio::test(start_paused = true)]
async fn outer_wait_bound_gives_up_without_cancelling() {
    let (session, hook, _log, catalog) = spawn(MockMode::AckAll);

    let expectation = session
        .submit(ExpectNode::event_with(
            state_pattern(&catalog, "hovering"),
            Policy::Wait,
        ))
        .await
        .unwrap();
    let id = expectation.id();

    let err = expectation
        .wait_timeout(Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::WaitTimeout(Duration::from_secs(1)));

    // The tree is still pending in the scheduler.
    let snapshot = session.explain(id).await.unwrap().unwrap();
    assert_eq!(snapshot.state, NodeState::Pending);

    hook.event(flying("hovering"));
    // Resolved trees are collected and no longer explainable.
    let _ = session
        .get_state(state_pattern(&catalog, "hovering"))
        .await
        .unwrap();
    assert!(session.explain(id).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn event_stream_broadcasts_every_notification() {
    let (session, hook, _log, _catalog) = spawn(MockMode::AckAll);

    let mut events = session.events().await.unwrap();
    hook.event(flying("takingoff"));
    hook.event(flying("hovering"));

    let first = events.recv().await.unwrap();
    let second = events.recv().await.unwrap();
    assert_eq!(first.get("state"), Some(&ParamValue::enum_value("takingoff")));
    assert_eq!(second.get("state"), Some(&ParamValue::enum_value("hovering")));
}

#[tokio::test(start_paused = true)]
async fn close_rejects_later_requests() {
    let (session, _hook, _log, catalog) = spawn(MockMode::AckAll);

    session.close().await;
    let err = session
        .get_state(state_pattern(&catalog, "hovering"))
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::Closed);
}
