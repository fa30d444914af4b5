//! Registry snapshot swapping and resolution across snapshots

use splitkit_registry::{AssignmentResolver, RegistryHandle, Split, SplitRegistry};
use std::sync::Arc;

fn snapshot(weight_a: u32) -> SplitRegistry {
    SplitRegistry::new().with_split(Split::new(
        "flip",
        [("a", weight_a), ("b", 100 - weight_a)],
    ))
}

#[test]
fn readers_never_observe_partial_snapshots() {
    let handle = Arc::new(RegistryHandle::with_registry(snapshot(100)));
    let resolver = AssignmentResolver::new();

    std::thread::scope(|scope| {
        let writer = Arc::clone(&handle);
        scope.spawn(move || {
            for i in 0..200 {
                writer.replace(snapshot(if i % 2 == 0 { 0 } else { 100 }));
            }
        });

        for reader_idx in 0..4 {
            let reader = Arc::clone(&handle);
            scope.spawn(move || {
                for i in 0..200 {
                    let registry = reader.snapshot().expect("registry is always loaded");
                    let split = registry.split("flip").expect("split survives swaps");
                    assert!(split.validate().is_ok());

                    let visitor = format!("visitor-{reader_idx}-{i}");
                    let first = resolver.resolve(&visitor, "flip", Some(&registry)).unwrap();
                    let again = resolver.resolve(&visitor, "flip", Some(&registry)).unwrap();
                    assert_eq!(first, again);
                }
            });
        }
    });
}

#[test]
fn resolution_is_stable_across_equal_snapshots() {
    let resolver = AssignmentResolver::new();
    let first = SplitRegistry::from_json(r#"{"time":{"hammertime":50,"clobberin_time":50}}"#)
        .unwrap()
        .unwrap();
    let second = SplitRegistry::new().with_split(Split::new(
        "time",
        [("clobberin_time", 50), ("hammertime", 50)],
    ));

    for i in 0..100 {
        let visitor = i.to_string();
        assert_eq!(
            resolver.resolve(&visitor, "time", Some(&first)).unwrap(),
            resolver.resolve(&visitor, "time", Some(&second)).unwrap()
        );
    }
}
