use std::sync::Arc;

use anexpr::prelude::*;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use parking_lot::Mutex;

/// Single-variable connection whose value is pushed by the benchmark loop.
#[derive(Default)]
struct Feed {
    listeners: Mutex<ListenerRegistry<String>>,
}

impl Feed {
    fn push(&self, variable: &str, value: f64) {
        let listeners = self.listeners.lock().listeners(&variable.to_string());
        let value = Value::Number(value);
        for listener in listeners {
            listener(&value);
        }
    }
}

impl Connection for Feed {
    fn add_listener(&self, variable: &Variable, listener: &Listener) {
        self.listeners
            .lock()
            .add(variable.identifier(), listener.clone());
    }

    fn remove_listener(&self, variable: &Variable, listener: &Listener) {
        self.listeners
            .lock()
            .remove(&variable.identifier(), listener);
    }
}

fn parser(feed: Arc<Feed>) -> ExpressionParser {
    let connections = Connections::new()
        .with(Dialect::Local, feed.clone())
        .with(Dialect::Simulator, feed);
    ExpressionParser::new(connections)
}

const SIMPLE: &str = "L:A > 3 AND L:B == 1";
const WIDE: &str = "(L:A + L:B * 2 >= 10 AND NOT L:C == 0) OR ((L:D & 4) == 4 AND \
                    A:GENERAL ENG FIRE DETECTED:1, bool == 1) OR -L:E < L:A - L:B";

fn bench_parse(c: &mut Criterion) {
    let parser = parser(Arc::default());

    c.bench_function("parse_simple", |b| {
        b.iter(|| black_box(parser.parse(black_box(SIMPLE))))
    });
    c.bench_function("parse_wide", |b| {
        b.iter(|| black_box(parser.parse(black_box(WIDE))))
    });
    c.bench_function("parse_and_optimize_master_enable", |b| {
        b.iter(|| {
            black_box(optimize(parser.parse(black_box(
                "L:MasterEnable == 1 AND (ON AND (L:A > 3 OR OFF))",
            ))))
        })
    });
}

fn bench_propagation(c: &mut Criterion) {
    let feed = Arc::new(Feed::default());
    let parser = parser(feed.clone());

    for (label, src) in [("propagate_simple", SIMPLE), ("propagate_wide", WIDE)] {
        let node = parser.parse(src);
        let sink = listener(|value| {
            black_box(value);
        });
        node.subscribe(sink.clone());
        for name in ["L:B", "L:C", "L:D", "L:E", "A:GENERAL ENG FIRE DETECTED:1, bool"] {
            feed.push(name, 1.0);
        }

        let mut tick = 0.0;
        c.bench_function(label, |b| {
            b.iter(|| {
                // Alternates the result so every push reaches the root
                tick = if tick > 5.0 { 0.0 } else { 20.0 };
                feed.push("L:A", tick);
            })
        });
        node.unsubscribe(&sink);
    }
}

fn bench_fan_out(c: &mut Criterion) {
    let feed = Arc::new(Feed::default());
    let parser = parser(feed.clone());
    let node = parser.parse(SIMPLE);
    let sinks: Vec<_> = (0..64)
        .map(|_| {
            listener(|value| {
                black_box(value);
            })
        })
        .collect();
    for sink in &sinks {
        node.subscribe(sink.clone());
    }
    feed.push("L:B", 1.0);

    let mut tick = 0.0;
    c.bench_function("fan_out_64_listeners", |b| {
        b.iter(|| {
            tick = if tick > 3.0 { 0.0 } else { 4.0 };
            feed.push("L:A", tick);
        })
    });
    for sink in &sinks {
        node.unsubscribe(sink);
    }
}

criterion_group!(benches, bench_parse, bench_propagation, bench_fan_out);
criterion_main!(benches);
