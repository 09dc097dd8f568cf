//! Catalog validation properties

use proptest::prelude::*;
use stagehand_core::{CatalogConfig, CatalogError, ResourceCatalog, SimulatedProvider};
use stagehand_test_utils::{fixture_provider, A1, B2, SCENE_PATHS};
use std::sync::Arc;

fn fixture_catalog() -> ResourceCatalog {
    ResourceCatalog::scan(fixture_provider(), &CatalogConfig::default()).unwrap()
}

fn recase(name: &str, flips: &[bool]) -> String {
    name.chars()
        .zip(flips.iter().cycle())
        .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
        .collect()
}

#[test]
fn fixture_catalog_has_every_scene() {
    let catalog = fixture_catalog();
    assert_eq!(catalog.len(), SCENE_PATHS.len());
    assert_eq!(catalog.get(A1).unwrap().path(), SCENE_PATHS[0]);
    assert_eq!(catalog.get(B2).unwrap().index(), 3);
    assert!(!catalog.validate("InitTestScene0"));
}

#[test]
fn custom_naming_rule() {
    let provider = Arc::new(SimulatedProvider::default());
    provider.register("content/levels/Forest.level");
    provider.register("content/Cave.LEVEL");

    let catalog = ResourceCatalog::scan(provider, &CatalogConfig::new("content", "level")).unwrap();
    let names: Vec<&str> = catalog.entries().map(|entry| entry.name()).collect();
    assert_eq!(names, vec!["Forest", "Cave"]);
}

#[test]
fn duplicate_across_directories_is_rejected() {
    let provider = Arc::new(SimulatedProvider::default());
    provider.register("Assets/Day/Town.unity");
    provider.register("Assets/Night/town.unity");

    let err = ResourceCatalog::scan(provider, &CatalogConfig::default()).unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateName { .. }));
}

proptest! {
    #[test]
    fn validation_ignores_case(
        name in "[A-Za-z][A-Za-z0-9_]{0,12}",
        flips in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let provider = Arc::new(SimulatedProvider::default());
        provider.register(format!("Assets/Scenes/{name}.unity"));
        let catalog = ResourceCatalog::scan(provider, &CatalogConfig::default()).unwrap();

        let variant = recase(&name, &flips);
        prop_assert!(catalog.validate(&variant));
        prop_assert_eq!(catalog.get(&variant).unwrap().name(), name.as_str());
    }

    #[test]
    fn validation_is_independent_of_call_order(
        queries in prop::collection::vec("TestScene_[A-Ca-c][1-3]", 0..16),
    ) {
        let catalog = fixture_catalog();
        let forward: Vec<bool> = queries.iter().map(|q| catalog.validate(q)).collect();
        let mut backward: Vec<bool> = queries.iter().rev().map(|q| catalog.validate(q)).collect();
        backward.reverse();

        prop_assert_eq!(&forward, &backward);
        for (query, valid) in queries.iter().zip(&forward) {
            let expected = SCENE_PATHS
                .iter()
                .any(|path| path.to_lowercase().ends_with(&format!("/{}.unity", query.to_lowercase())));
            prop_assert_eq!(*valid, expected);
        }
    }
}
