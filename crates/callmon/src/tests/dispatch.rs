use std::io;
use std::sync::{Arc, Mutex};

use rstest::{fixture, rstest};
use time::macros::datetime;

use crate::dispatch::{Dispatcher, FailureReason, Subscription, UnknownTopic};
use crate::event::{CallRecord, EventKind, PhoneEvent};

type Log = Arc<Mutex<Vec<String>>>;

fn event(record: CallRecord) -> PhoneEvent {
    PhoneEvent {
        date: datetime!(2023-02-01 10:11:12),
        connection_id: Some(5),
        raw_data: String::new(),
        record,
    }
}

fn ring() -> PhoneEvent {
    event(CallRecord::Ring {
        caller: String::from("+491701234567"),
        callee: String::from("01234567"),
    })
}

fn hang_up() -> PhoneEvent {
    event(CallRecord::HangUp {
        call_duration: Some(42),
    })
}

fn recorder(log: &Log, label: &'static str) -> impl FnMut(&PhoneEvent) + Send + 'static {
    let sink = Arc::clone(log);
    move |event| {
        sink.lock()
            .expect("log lock")
            .push(format!("{label}:{}", event.kind()));
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().expect("log lock").clone()
}

#[fixture]
fn log() -> Log {
    Arc::default()
}

#[rstest]
fn catch_all_runs_before_kind_handlers_in_registration_order(log: Log) {
    let mut dispatcher = Dispatcher::new();
    dispatcher.on(EventKind::Ring.into(), recorder(&log, "ring-1"));
    dispatcher.on(Subscription::Any, recorder(&log, "phone-1"));
    dispatcher.on(EventKind::Ring.into(), recorder(&log, "ring-2"));
    dispatcher.on(Subscription::Any, recorder(&log, "phone-2"));
    dispatcher.on(EventKind::Call.into(), recorder(&log, "call"));
    dispatcher.on(EventKind::PickUp.into(), recorder(&log, "pickup"));
    dispatcher.on(EventKind::HangUp.into(), recorder(&log, "hangup"));

    let delivered = dispatcher.publish(&ring()).expect("all handlers succeed");

    assert_eq!(delivered, 4);
    assert_eq!(
        entries(&log),
        ["phone-1:ring", "phone-2:ring", "ring-1:ring", "ring-2:ring"]
    );
}

#[rstest]
fn failing_handlers_do_not_stop_the_rest(log: Log) {
    let mut dispatcher = Dispatcher::new();
    let erroring = dispatcher.subscribe(Subscription::Any, |_| {
        Err(io::Error::other("handler refused").into())
    });
    let panicking = dispatcher.on(EventKind::HangUp.into(), |_| panic!("handler exploded"));
    dispatcher.on(EventKind::HangUp.into(), recorder(&log, "after"));

    let error = dispatcher
        .publish(&hang_up())
        .expect_err("failures are reported");

    assert_eq!(error.kind, "hangup");
    assert_eq!(error.delivered, 1);
    assert_eq!(error.failures.len(), 2);
    let [first, second] = error.failures.as_slice() else {
        panic!("expected two failures, got {:?}", error.failures);
    };
    assert_eq!(first.subscription, erroring);
    assert!(matches!(
        &first.reason,
        FailureReason::Error(inner) if inner.to_string() == "handler refused"
    ));
    assert_eq!(second.subscription, panicking);
    assert!(matches!(
        &second.reason,
        FailureReason::Panic(message) if message == "handler exploded"
    ));
    assert_eq!(entries(&log), ["after:hangup"]);
    assert_eq!(error.to_string(), "2 handler(s) failed for 'hangup' event");
}

#[rstest]
fn late_subscribers_see_only_later_events(log: Log) {
    let mut dispatcher = Dispatcher::new();
    dispatcher.publish(&ring()).expect("no handlers");
    dispatcher.on(Subscription::Any, recorder(&log, "late"));
    dispatcher.publish(&hang_up()).expect("late handler succeeds");

    assert_eq!(entries(&log), ["late:hangup"]);
}

#[rstest]
fn unsubscribed_handlers_stop_receiving(log: Log) {
    let mut dispatcher = Dispatcher::new();
    let id = dispatcher.on(EventKind::Ring.into(), recorder(&log, "ring"));
    assert_eq!(dispatcher.publish(&ring()).expect("handler succeeds"), 1);

    assert!(dispatcher.unsubscribe(id));
    assert!(!dispatcher.unsubscribe(id));

    assert_eq!(dispatcher.publish(&ring()).expect("no handlers"), 0);
    assert_eq!(entries(&log), ["ring:ring"]);
}

#[test]
fn publish_counts_catch_all_and_specific_handlers() {
    let mut dispatcher: Dispatcher<PhoneEvent> = Dispatcher::new();
    dispatcher.on(Subscription::Any, |_| {});
    dispatcher.on(EventKind::Ring.into(), |_| {});

    assert_eq!(dispatcher.publish(&ring()).expect("handlers succeed"), 2);
    assert_eq!(dispatcher.publish(&hang_up()).expect("handlers succeed"), 1);
}

#[rstest]
#[case("phone", Subscription::Any)]
#[case("any", Subscription::Any)]
#[case("ring", Subscription::Kind(EventKind::Ring))]
#[case("CALL", Subscription::Kind(EventKind::Call))]
#[case("pickup", Subscription::Kind(EventKind::PickUp))]
#[case("pick_up", Subscription::Kind(EventKind::PickUp))]
#[case("hangUp", Subscription::Kind(EventKind::HangUp))]
fn parses_subscription_names(#[case] name: &str, #[case] expected: Subscription<EventKind>) {
    assert_eq!(name.parse::<Subscription<EventKind>>(), Ok(expected));
}

#[test]
fn rejects_unknown_subscription_names() {
    assert_eq!(
        "connect".parse::<Subscription<EventKind>>(),
        Err(UnknownTopic(String::from("connect")))
    );
}

#[rstest]
#[case(Subscription::Any, "phone")]
#[case(Subscription::Kind(EventKind::PickUp), "pickup")]
#[case(Subscription::Kind(EventKind::HangUp), "hangup")]
fn subscriptions_display_their_names(
    #[case] subscription: Subscription<EventKind>,
    #[case] expected: &str,
) {
    assert_eq!(subscription.to_string(), expected);
}
