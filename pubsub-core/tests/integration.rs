//! Integration Tests for Scoped Stores
//!
//! These tests drive factories, providers and subscriptions together the
//! way a rendering host would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use pubsub_core::store::patch_from;
use pubsub_core::{callback, store_data, PubSub, Record};
use serde_json::{json, Value};

store_data! {
    #[derive(Debug, Clone, PartialEq)]
    struct Name => NamePatch {
        name: String,
    }
}

store_data! {
    #[derive(Debug, Clone, PartialEq)]
    struct Flag => FlagPatch {
        flag: bool,
    }
}

store_data! {
    #[derive(Debug, Clone, PartialEq)]
    struct Quantity => QuantityPatch {
        quantity: i32,
    }
}

store_data! {
    #[derive(Debug, Clone, PartialEq)]
    struct Numbers => NumbersPatch {
        numbers: Vec<i32>,
    }
}

store_data! {
    #[derive(Debug, Clone, PartialEq)]
    struct Address => AddressPatch {
        street1: String,
        street2: Option<String>,
        city: String,
        state: String,
        zipcode: u32,
    }
}

store_data! {
    #[derive(Debug, Clone, PartialEq)]
    struct Node => NodePatch {
        value: i32,
        left: Option<Box<Node>>,
        right: Option<Box<Node>>,
    }
}

fn hack() -> Address {
    Address {
        street1: "1 hack drive".into(),
        street2: None,
        city: "menlo park".into(),
        state: "CA".into(),
        zipcode: 94025,
    }
}

fn leaf(value: i32) -> Option<Box<Node>> {
    Some(Box::new(Node {
        value,
        left: None,
        right: None,
    }))
}

fn branch(value: i32, left: Option<Box<Node>>, right: Option<Box<Node>>) -> Option<Box<Node>> {
    Some(Box::new(Node { value, left, right }))
}

fn value_of(node: &Option<Box<Node>>) -> Option<i32> {
    node.as_ref().map(|n| n.value)
}

// ----------------------------------------------------------------------------
// Single key/value
// ----------------------------------------------------------------------------

/// Scenario A: a scalar field is replaced.
#[test]
fn string_field_is_replaced() {
    let pubsub = PubSub::new(Name { name: String::new() });

    pubsub.wrap(|| {
        let name = pubsub.use_sub(|s: &Name| s.name.clone());
        assert_eq!(name.data(), "");

        name.set_data(NamePatch {
            name: Some("peter pan".into()),
        });
        assert_eq!(name.data(), "peter pan");
        assert_eq!(name.store().get().name, "peter pan");
    });
}

#[test]
fn boolean_field_is_replaced() {
    let pubsub = PubSub::new(Flag { flag: false });

    pubsub.wrap(|| {
        let flag = pubsub.use_sub(|s: &Flag| s.flag);
        assert!(!flag.data());

        flag.set_data(FlagPatch { flag: Some(true) });
        assert!(flag.data());
    });
}

#[test]
fn number_field_follows_every_write() {
    let pubsub = PubSub::new(Quantity { quantity: 0 });

    pubsub.wrap(|| {
        let quantity = pubsub.use_sub(|s: &Quantity| s.quantity);
        assert_eq!(quantity.data(), 0);

        for value in [10, 20, -3] {
            quantity.set_data(QuantityPatch {
                quantity: Some(value),
            });
            assert_eq!(quantity.data(), value);
        }
        assert_eq!(quantity.render_count(), 4);
    });
}

/// Scenario B: lists are replaced whole; appending goes through a read.
#[test]
fn list_field_is_replaced_whole() {
    let pubsub = PubSub::new(Numbers { numbers: vec![] });

    pubsub.wrap(|| {
        let numbers = pubsub.use_sub(|s: &Numbers| s.numbers.clone());
        assert_eq!(numbers.data(), Vec::<i32>::new());

        numbers.set_data(NumbersPatch {
            numbers: Some(vec![10]),
        });
        numbers.update(|current| {
            let mut next = current.numbers.clone();
            next.push(20);
            NumbersPatch {
                numbers: Some(next),
            }
        });
        assert_eq!(numbers.data(), vec![10, 20]);

        numbers.set_data(NumbersPatch {
            numbers: Some(vec![-3, 3]),
        });
        assert_eq!(numbers.data(), vec![-3, 3]);
    });
}

#[test]
fn lookup_keys_accumulate() {
    type Lookup = HashMap<String, i32>;
    let pubsub = PubSub::new(Lookup::new());

    pubsub.wrap(|| {
        let lookup = pubsub.use_sub(|s: &Lookup| s.clone());
        assert!(lookup.data().is_empty());

        lookup.set_data(HashMap::from([("peter_pan".to_string(), 10)]));
        assert_eq!(lookup.data()["peter_pan"], 10);

        lookup.set_data(HashMap::from([("tinker_bell".to_string(), 20)]));
        lookup.set_data(HashMap::from([("tiger_lily".to_string(), -3)]));

        let data = lookup.data();
        assert_eq!(data["peter_pan"], 10);
        assert_eq!(data["tinker_bell"], 20);
        assert_eq!(data["tiger_lily"], -3);
    });
}

// ----------------------------------------------------------------------------
// Multiple key/value
// ----------------------------------------------------------------------------

/// Scenario C: a partial touching one field leaves the rest alone.
#[test]
fn partial_keeps_other_fields() {
    let pubsub = PubSub::new(hack());

    pubsub.wrap(|| {
        let address = pubsub.use_sub(|s: &Address| s.clone());
        assert_eq!(address.data(), hack());

        address.set_data(AddressPatch {
            street2: Some(Some("PO Box 123".into())),
            ..Default::default()
        });

        assert_eq!(
            address.data(),
            Address {
                street2: Some("PO Box 123".into()),
                ..hack()
            }
        );
    });
}

/// Selector isolation: writes to another field do not change the slice.
#[test]
fn unrelated_write_does_not_change_slice() {
    let pubsub = PubSub::new(hack());

    pubsub.wrap(|| {
        let street1 = pubsub.use_sub(|s: &Address| s.street1.clone());

        street1.set_data(AddressPatch {
            street2: Some(Some("PO Box 123".into())),
            ..Default::default()
        });

        assert_eq!(street1.data(), "1 hack drive");
        assert_eq!(street1.notification_count(), 1);
        assert_eq!(street1.render_count(), 1);
    });
}

#[test]
fn dynamic_record_stores_extra_fields() {
    let initial = patch_from(&json!({
        "street1": "1 hack drive",
        "city": "menlo park",
        "state": "CA",
        "zipcode": 94025,
    }))
    .unwrap();
    let pubsub = PubSub::new(initial);

    pubsub.wrap(|| {
        let address = pubsub.use_sub(|s: &Record| Value::Object(s.clone()));
        address.set_data(patch_from(&json!({ "street2": "PO Box 123" })).unwrap());

        assert_eq!(
            address.data(),
            json!({
                "street1": "1 hack drive",
                "city": "menlo park",
                "state": "CA",
                "zipcode": 94025,
                "street2": "PO Box 123",
            })
        );
    });
}

// ----------------------------------------------------------------------------
// Nested key/value
// ----------------------------------------------------------------------------

#[test]
fn tree_edits_replace_whole_branches() {
    //    0
    //  /   \
    // -5    3
    //        \
    //         6
    let pubsub = PubSub::new(Node {
        value: 0,
        left: leaf(-5),
        right: branch(3, None, leaf(6)),
    });

    pubsub.wrap(|| {
        let tree = pubsub.use_sub(|s: &Node| s.clone());

        // add -7 under -5
        tree.set_data(NodePatch {
            left: Some(branch(-5, leaf(-7), None)),
            ..Default::default()
        });
        let data = tree.data();
        assert_eq!(data.value, 0);
        assert_eq!(value_of(&data.left), Some(-5));
        assert_eq!(data.left.as_ref().and_then(|n| value_of(&n.left)), Some(-7));
        assert_eq!(value_of(&data.right), Some(3));

        // add 2 under 3, then change 6 to 8
        tree.update(|current| {
            let right = current.right.as_ref().map(|n| n.right.clone()).unwrap_or_default();
            NodePatch {
                right: Some(branch(3, leaf(2), right)),
                ..Default::default()
            }
        });
        tree.update(|current| {
            let left = current.right.as_ref().map(|n| n.left.clone()).unwrap_or_default();
            NodePatch {
                right: Some(branch(3, left, leaf(8))),
                ..Default::default()
            }
        });
        let data = tree.data();
        let right = data.right.as_ref().map(|n| (value_of(&n.left), value_of(&n.right)));
        assert_eq!(right, Some((Some(2), Some(8))));

        // delete -7
        tree.update(|current| {
            let mut left = current.left.clone();
            if let Some(node) = left.as_mut() {
                node.left = None;
            }
            NodePatch {
                left: Some(left),
                ..Default::default()
            }
        });
        let data = tree.data();
        assert_eq!(value_of(&data.left), Some(-5));
        assert_eq!(data.left.as_ref().and_then(|n| value_of(&n.left)), None);
        assert_eq!(value_of(&data.right), Some(3));
    });
}

// ----------------------------------------------------------------------------
// Scopes
// ----------------------------------------------------------------------------

/// Scenario D: without a provider, writes vanish.
#[test]
fn no_provider_keeps_initial_value() {
    let pubsub = PubSub::new(Name {
        name: "wendy".into(),
    });

    let name = pubsub.use_sub(|s: &Name| s.name.clone());
    name.set_data(NamePatch {
        name: Some("peter pan".into()),
    });

    assert_eq!(name.data(), "wendy");
    assert!(name.store().is_detached());
    assert_eq!(pubsub.resolve().get().name, "wendy");
}

/// Scenario E: separate providers do not share state.
#[test]
fn separate_providers_are_independent() {
    let pubsub = PubSub::new(Quantity { quantity: 0 });
    let first = pubsub.provider();
    let second = pubsub.provider();

    let a = first.use_sub(|s: &Quantity| s.quantity);
    let b = second.use_sub(|s: &Quantity| s.quantity);

    a.set_data(QuantityPatch { quantity: Some(5) });

    assert_eq!(a.data(), 5);
    assert_eq!(b.data(), 0);
    assert_eq!(b.notification_count(), 0);
}

#[test]
fn nested_provider_does_not_inherit() {
    let pubsub = PubSub::new(Quantity { quantity: 0 });

    pubsub.wrap(|| {
        let outer = pubsub.use_sub(|s: &Quantity| s.quantity);
        outer.set_data(QuantityPatch { quantity: Some(7) });

        pubsub.wrap(|| {
            let inner = pubsub.use_sub(|s: &Quantity| s.quantity);
            assert_eq!(inner.data(), 0);

            inner.set_data(QuantityPatch { quantity: Some(1) });
            assert_eq!(inner.data(), 1);
        });

        assert_eq!(outer.data(), 7);
        assert_eq!(pubsub.use_sub(|s: &Quantity| s.quantity).data(), 7);
    });
}

#[test]
fn new_provider_starts_fresh_after_teardown() {
    let pubsub = PubSub::new(Quantity { quantity: 0 });

    pubsub.wrap(|| {
        pubsub
            .use_sub(|s: &Quantity| s.quantity)
            .set_data(QuantityPatch { quantity: Some(3) });
    });

    let after = pubsub.wrap(|| pubsub.use_sub(|s: &Quantity| s.quantity).data());
    assert_eq!(after, 0);
}

#[test]
fn consumers_under_one_provider_share_the_store() {
    let pubsub = PubSub::new(hack());

    pubsub.wrap(|| {
        let city = pubsub.use_sub(|s: &Address| s.city.clone());
        let zipcode = pubsub.use_sub(|s: &Address| s.zipcode);

        zipcode.set_data(AddressPatch {
            city: Some("palo alto".into()),
            zipcode: Some(94301),
            ..Default::default()
        });

        assert_eq!(city.data(), "palo alto");
        assert_eq!(zipcode.data(), 94301);
    });
}

// ----------------------------------------------------------------------------
// Subscriber registry through the store
// ----------------------------------------------------------------------------

#[test]
fn same_callback_registered_twice_fires_once() {
    let pubsub = PubSub::new(Quantity { quantity: 0 });
    let provider = pubsub.provider();
    let calls = Arc::new(AtomicI32::new(0));
    let calls_clone = calls.clone();

    let cb = callback(move || {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });
    let first = provider.store().subscribe(&cb);
    let _second = provider.store().subscribe(&cb);

    provider.store().set(QuantityPatch { quantity: Some(1) });
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    first.unsubscribe();
    first.unsubscribe();
    provider.store().set(QuantityPatch { quantity: Some(2) });
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn write_from_one_consumer_reaches_the_others_before_returning() {
    let pubsub = PubSub::new(Numbers { numbers: vec![] });
    let provider = pubsub.provider();

    let readers: Vec<_> = (0..5)
        .map(|_| provider.use_sub(|s: &Numbers| s.numbers.len()))
        .collect();
    let writer = provider.use_sub(|s: &Numbers| s.numbers.clone());

    writer.set_data(NumbersPatch {
        numbers: Some(vec![1, 2, 3]),
    });

    for reader in &readers {
        assert_eq!(reader.data(), 3);
    }
    assert_eq!(provider.store().subscriber_count(), 6);
}
