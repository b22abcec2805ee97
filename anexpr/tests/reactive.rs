mod common;

use std::thread;

use anexpr::prelude::*;
use common::{MockConnection, evaluate, parser_for, recorder};

const NO_LVAR: &str = "LVar does not exist";

#[test]
fn and_short_circuits_on_false_operand() {
    // L:Var1 never reports anything
    let connection = MockConnection::silent();
    let node = parser_for(connection).parse("L:Var1 > 3 AND 1 == 0");
    assert_eq!(evaluate(&node), Some(Value::Boolean(false)));

    let connection = MockConnection::with_fallback(Value::error(NO_LVAR));
    let node = parser_for(connection).parse("L:Var1 > 3 AND 1 == 0");
    assert_eq!(evaluate(&node), Some(Value::Boolean(false)));
}

#[test]
fn and_with_true_operand_depends_on_the_other_side() {
    let connection = MockConnection::with_fallback(Value::error(NO_LVAR));
    let node = parser_for(connection).parse("L:Var1 > 3 AND 1 == 1");
    assert_eq!(evaluate(&node), Some(Value::error(NO_LVAR)));

    let connection = MockConnection::silent();
    let node = parser_for(connection).parse("L:Var1 > 3 AND 1 == 1");
    assert_eq!(evaluate(&node), None);
}

#[test]
fn or_mirrors_and() {
    let connection = MockConnection::with_fallback(Value::error(NO_LVAR));
    let parser = parser_for(connection);
    assert_eq!(
        evaluate(&parser.parse("L:Var1 > 3 OR 1 == 1")),
        Some(Value::Boolean(true))
    );
    assert_eq!(
        evaluate(&parser.parse("1 == 1 OR L:Var1 > 3")),
        Some(Value::Boolean(true))
    );
    assert_eq!(
        evaluate(&parser.parse("L:Var1 > 3 OR 1 == 0")),
        Some(Value::error(NO_LVAR))
    );

    let parser = parser_for(MockConnection::silent());
    assert_eq!(
        evaluate(&parser.parse("L:Var1 > 3 OR 1 == 1")),
        Some(Value::Boolean(true))
    );
}

#[test]
fn errors_propagate_left_first() {
    let connection = MockConnection::silent();
    connection.set("L:A", Value::error("left"));
    connection.set("L:B", Value::error("right"));
    let parser = parser_for(connection.clone());

    assert_eq!(evaluate(&parser.parse("L:A + L:B")), Some(Value::error("left")));
    assert_eq!(evaluate(&parser.parse("L:B < L:A")), Some(Value::error("right")));
    assert_eq!(evaluate(&parser.parse("-L:A")), Some(Value::error("left")));
    assert_eq!(
        evaluate(&parser.parse("NOT L:A == 1")),
        Some(Value::error("left"))
    );
}

#[test]
fn values_flow_up_on_change_only() {
    let connection = MockConnection::silent();
    let node = parser_for(connection.clone()).parse("L:A + 1 > 2");
    let (listener, seen) = recorder();
    node.subscribe(listener.clone());
    assert!(seen.lock().is_empty());

    connection.set("L:A", Value::Number(5.0));
    connection.set("L:A", Value::Number(6.0));
    connection.set("L:A", Value::Number(6.0));
    connection.set("L:A", Value::Number(0.0));
    connection.set("L:A", Value::error(NO_LVAR));
    connection.set("L:A", Value::error(NO_LVAR));

    assert_eq!(
        *seen.lock(),
        vec![
            Value::Boolean(true),
            Value::Boolean(false),
            Value::error(NO_LVAR)
        ]
    );
    node.unsubscribe(&listener);
}

#[test]
fn late_subscribers_receive_the_last_value_immediately() {
    let connection = MockConnection::silent();
    connection.set("L:A", Value::Number(5.0));
    let node = parser_for(connection.clone()).parse("L:A + 1 > 2");

    let (first, first_seen) = recorder();
    node.subscribe(first.clone());
    assert_eq!(*first_seen.lock(), vec![Value::Boolean(true)]);

    let (second, second_seen) = recorder();
    node.subscribe(second.clone());
    assert_eq!(*second_seen.lock(), vec![Value::Boolean(true)]);
    // The first listener is not notified again
    assert_eq!(first_seen.lock().len(), 1);

    connection.set("L:A", Value::Number(0.0));
    assert_eq!(first_seen.lock().last(), Some(&Value::Boolean(false)));
    assert_eq!(second_seen.lock().last(), Some(&Value::Boolean(false)));

    node.unsubscribe(&first);
    node.unsubscribe(&second);
}

#[test]
fn connection_subscription_is_reference_counted() {
    let connection = MockConnection::silent();
    let parser = parser_for(connection.clone());

    // Two independently parsed trees share one source subscription
    let a = parser.parse("L:A == 1");
    let b = parser.parse("L:A > 0 OR L:B == 1");
    let listeners: Vec<_> = (0..3).map(|_| recorder().0).collect();

    a.subscribe(listeners[0].clone());
    a.subscribe(listeners[1].clone());
    b.subscribe(listeners[2].clone());
    assert_eq!(connection.subscribed(), vec!["L:A", "L:B"]);
    assert_eq!(connection.listener_count("L:A"), 2);

    a.unsubscribe(&listeners[0]);
    assert!(connection.released().is_empty());
    a.unsubscribe(&listeners[1]);
    assert!(connection.released().is_empty());
    assert_eq!(connection.listener_count("L:A"), 1);

    b.unsubscribe(&listeners[2]);
    let mut released = connection.released();
    released.sort();
    assert_eq!(released, vec!["L:A", "L:B"]);

    // Unknown listeners are ignored
    b.unsubscribe(&listeners[2]);
    assert_eq!(connection.released().len(), 2);
}

#[test]
fn resubscribing_starts_from_scratch() {
    let connection = MockConnection::silent();
    let node = parser_for(connection.clone()).parse("L:A == 1");
    let (listener, seen) = recorder();

    node.subscribe(listener.clone());
    connection.set("L:A", Value::Number(1.0));
    node.unsubscribe(&listener);

    // Changes while detached are not observed
    connection.set("L:A", Value::Number(2.0));
    assert_eq!(*seen.lock(), vec![Value::Boolean(true)]);

    let (again, again_seen) = recorder();
    node.subscribe(again.clone());
    assert_eq!(*again_seen.lock(), vec![Value::Boolean(false)]);
    assert_eq!(connection.subscribed(), vec!["L:A", "L:A"]);
    node.unsubscribe(&again);
}

#[test]
fn equality_is_exact() {
    let parser = parser_for(MockConnection::silent());
    assert_eq!(evaluate(&parser.parse("1 == 1.0")), Some(Value::Boolean(true)));
    assert_eq!(
        evaluate(&parser.parse("0.1 + 0.2 == 0.3")),
        Some(Value::Boolean(false))
    );
    assert_eq!(evaluate(&parser.parse("1 != 1.0")), Some(Value::Boolean(false)));
}

#[test]
fn booleans_compare_as_numbers() {
    let parser = parser_for(MockConnection::silent());
    assert_eq!(evaluate(&parser.parse("ON == 1")), Some(Value::Boolean(true)));
    assert_eq!(evaluate(&parser.parse("OFF < ON")), Some(Value::Boolean(true)));
    assert_eq!(
        evaluate(&parser.parse("(1 < 2) > 0.5")),
        Some(Value::Boolean(true))
    );
}

#[test]
fn error_nodes_never_fire() {
    let parser = parser_for(MockConnection::silent());
    let node = parser.parse("(1 +");
    assert_eq!(evaluate(&node), None);
}

#[test]
fn listeners_may_subscribe_from_a_notification() {
    let connection = MockConnection::silent();
    let parser = parser_for(connection.clone());
    let outer = parser.parse("L:A == 1");
    let inner = parser.parse("L:A == 1 AND L:B == 2");

    let (inner_listener, inner_seen) = recorder();
    let nested = inner.clone();
    let hook = listener(move |value| {
        if value == &Value::Boolean(true) {
            nested.subscribe(inner_listener.clone());
        }
    });
    outer.subscribe(hook.clone());

    connection.set("L:B", Value::Number(2.0));
    connection.set("L:A", Value::Number(1.0));
    assert_eq!(*inner_seen.lock(), vec![Value::Boolean(true)]);
    assert_eq!(connection.listener_count("L:A"), 2);
    outer.unsubscribe(&hook);
}

#[test]
fn values_may_arrive_from_other_threads() {
    let connection = MockConnection::silent();
    let node = parser_for(connection.clone()).parse("L:A * 2 >= 10");
    let (listener, seen) = recorder();
    node.subscribe(listener.clone());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let connection = connection.clone();
            thread::spawn(move || connection.set("L:A", Value::Number(5.0 + i as f64)))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(*seen.lock(), vec![Value::Boolean(true)]);
    node.unsubscribe(&listener);
    assert_eq!(connection.released(), vec!["L:A"]);
}

#[test]
fn light_expressions_wrap_the_root() {
    let connection = MockConnection::silent();
    let parser = parser_for(connection.clone());
    let light = LightExpression::new("HDG", parser.parse("L:HDG == 1"), true);
    assert_eq!(light.name(), "HDG");
    assert_eq!(light.to_string(), "(L:HDG == 1)");

    let (first, first_seen) = recorder();
    light.subscribe(first.clone());
    connection.set("L:HDG", Value::Number(1.0));
    assert_eq!(*first_seen.lock(), vec![Value::Boolean(true)]);

    let (second, second_seen) = recorder();
    light.subscribe(second.clone());
    assert_eq!(*second_seen.lock(), vec![Value::Boolean(true)]);
    assert_eq!(connection.listener_count("L:HDG"), 1);

    light.unsubscribe(&first);
    light.unsubscribe(&second);
    assert_eq!(connection.released(), vec!["L:HDG"]);

    let numeric = LightExpression::new("NAV", parser.parse("L:NAV + 1"), true);
    assert_eq!(
        numeric.error_text(),
        Some("A boolean expression is needed to drive a light, not a numeric one.")
    );
    assert!(numeric.variables().is_empty());
    assert_eq!(numeric.root().value_type(), NodeDataType::Double);
}
