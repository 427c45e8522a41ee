use feed_history::{AppendOutcome, RetentionLimit};

use crate::support::Harness;

#[test]
fn limit_two_keeps_the_newest_pair() {
    let h = Harness::new();
    h.store.set_limit(2).unwrap();

    for id in ["A", "B", "C"] {
        h.store.append(h.snapshot(id)).unwrap();
    }
    assert_eq!(h.ids(), vec!["B", "C"]);

    // B again: no-op
    assert_eq!(h.store.append(h.snapshot("B")).unwrap(), AppendOutcome::Duplicate);
    assert_eq!(h.ids(), vec!["B", "C"]);

    h.store.clear().unwrap();
    assert!(h.ids().is_empty());
}

#[test]
fn lowering_the_limit_evicts_oldest() {
    let h = Harness::new();
    h.store.append(h.snapshot("X")).unwrap();
    h.store.append(h.snapshot("Y")).unwrap();

    assert_eq!(h.store.set_limit(1).unwrap().get(), 1);
    assert_eq!(h.ids(), vec!["Y"]);
}

#[test]
fn raising_the_limit_keeps_everything() {
    let h = Harness::new();
    h.store.set_limit(1).unwrap();
    h.store.append(h.snapshot("X")).unwrap();
    h.store.set_limit(10).unwrap();
    h.store.append(h.snapshot("Y")).unwrap();
    assert_eq!(h.ids(), vec!["X", "Y"]);
}

#[test]
fn out_of_range_limits_are_clamped() {
    let h = Harness::new();
    assert_eq!(h.store.set_limit(-40).unwrap().get(), RetentionLimit::MIN as usize);
    assert_eq!(h.store.set_limit(i64::MAX).unwrap().get(), RetentionLimit::MAX as usize);
}

#[test]
fn default_limit_is_a_thousand() {
    let h = Harness::new();
    for i in 0..1005 {
        h.store.append(h.snapshot(&format!("card_{}", i))).unwrap();
    }
    let ids = h.ids();
    assert_eq!(ids.len(), 1000);
    assert_eq!(ids.first().map(String::as_str), Some("card_5"));
    assert_eq!(ids.last().map(String::as_str), Some("card_1004"));
}

#[test]
fn newest_first_reverses_capture_order() {
    let h = Harness::new();
    for id in ["A", "B", "C"] {
        h.store.append(h.snapshot(id)).unwrap();
    }
    let newest: Vec<String> = h
        .store
        .newest_first()
        .unwrap()
        .iter()
        .map(|s| s.id().to_string())
        .collect();
    assert_eq!(newest, vec!["C", "B", "A"]);

    let times: Vec<_> = h.store.snapshots().unwrap().iter().map(|s| s.captured_at()).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
}
