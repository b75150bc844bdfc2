use std::cell::RefCell;
use std::rc::Rc;

use chrono::{Duration, TimeZone, Utc};
use stockpile_core::{Clock, Entity, ManualClock, StoreError};
use stockpile_inventory::{
    Constraint, Inventory, InventoryChangeKind, InventoryConfig, ModificationResults, Stack,
};
use stockpile_items::{ItemChanged, ItemStore};
use stockpile_validation::{Filter, Operator, Validation, ValidationStore};

fn store_with_clock() -> (ItemStore, Rc<ManualClock>) {
    stockpile_observability::init_for_tests();
    let clock = Rc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()));
    let store = ItemStore::with_clock(Box::new(Rc::clone(&clock)))
        .with_modifier(InventoryConfig::default().count_modifier());
    (store, clock)
}

#[test]
fn deposit_withdraw_and_transfer_keep_item_properties_in_step() {
    let (mut store, clock) = store_with_clock();
    let sword = store.create_with(|item| {
        item.set("name", "sword").set("durability", 0.75);
    });
    let arrow = store.create_with(|item| {
        item.set("name", "arrow");
    });

    let item_events: Rc<RefCell<Vec<ItemChanged>>> = Rc::default();
    let sink = Rc::clone(&item_events);
    store.subscribe(move |e| sink.borrow_mut().push(e.clone()));

    let mut backpack = Inventory::new(&mut store);
    let mut chest = Inventory::new(&mut store);
    assert_ne!(backpack.id(), chest.id());
    assert!(backpack.id().raw() > arrow.raw());

    clock.advance(Duration::seconds(5));
    backpack
        .deposit(&mut store, &[Stack::new(sword, 1), Stack::new(arrow, 20)])
        .unwrap();
    assert_eq!(Entity::last_updated(&backpack), clock.now());
    assert_eq!(item_events.borrow().len(), 2);

    let transfer = Inventory::transfer(
        &mut backpack,
        &mut chest,
        &mut store,
        &[Stack::new(arrow, 15), Stack::new(sword, 2)],
    )
    .unwrap();

    assert_eq!(transfer.withdrawal.underflow, vec![Stack::new(sword, 1)]);
    assert_eq!(backpack.stacks(), &[Stack::new(arrow, 5)]);
    assert_eq!(chest.stacks(), &[Stack::new(arrow, 15), Stack::new(sword, 1)]);

    let arrow_item = store.first(arrow).unwrap();
    assert_eq!(arrow_item.value::<u64>("inventory"), Some(chest.id().raw()));
    assert_eq!(arrow_item.value::<u64>("count"), Some(15));
    assert_eq!(store.first(sword).unwrap().value::<u64>("inventory"), Some(chest.id().raw()));
}

#[test]
fn constrained_pouch_respects_filters() {
    let (mut store, _) = store_with_clock();
    let operators = ValidationStore::with_builtin_operators();
    let gem = store.create_with(|item| {
        item.set("name", "ruby").set("precious", true);
    });
    let coin = store.create_with(|item| {
        item.set("name", "coin");
    });

    let precious = Filter::builder()
        .all(Validation::bool("precious", Operator::EqualTo, [true]))
        .build();
    operators.verify_filter(&precious).unwrap();
    let constraint = Constraint::builder().limit(50).restrict(precious, 2).build();

    let mut pouch = Inventory::new(&mut store);
    let outcome = pouch
        .deposit_constrained(
            &mut store,
            &operators,
            &constraint,
            &[Stack::new(gem, 5), Stack::new(coin, 60)],
        )
        .unwrap();

    assert_eq!(outcome.deposited, vec![Stack::new(gem, 2), Stack::new(coin, 48)]);
    assert_eq!(outcome.overflow, vec![Stack::new(gem, 3), Stack::new(coin, 12)]);
    assert_eq!(pouch.total_count(), 50);

    let second = pouch
        .deposit_constrained(&mut store, &operators, &constraint, &[Stack::new(coin, 1)])
        .unwrap();
    assert_eq!(second.results, ModificationResults::NONE);
    assert_eq!(second.overflow, vec![Stack::new(coin, 1)]);
}

#[test]
fn events_report_signed_deltas() {
    let (mut store, _) = store_with_clock();
    let apple = store.create();
    let mut basket = Inventory::new(&mut store);

    let seen: Rc<RefCell<Vec<(InventoryChangeKind, i64)>>> = Rc::default();
    let sink = Rc::clone(&seen);
    basket.subscribe(move |e| {
        for d in &e.deltas {
            sink.borrow_mut().push((e.kind, d.delta()));
        }
    });

    basket.deposit(&mut store, &[Stack::new(apple, 4)]).unwrap();
    basket.remove(&mut store, &[Stack::new(apple, 1)]).unwrap();
    basket.destroy(&mut store).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            (InventoryChangeKind::Addition, 4),
            (InventoryChangeKind::Removal, -1),
            (InventoryChangeKind::Destroyed, -3),
        ]
    );
}

#[test]
fn negative_requests_are_rejected_at_construction() {
    let (mut store, _) = store_with_clock();
    let apple = store.create();
    assert!(matches!(
        Stack::try_from_signed(apple, -2),
        Err(StoreError::InvalidArgument(_))
    ));
    assert!(matches!(
        Constraint::try_from_signed(10, -1, Vec::new()),
        Err(StoreError::Configuration(_))
    ));
}
