//! Anchor search order

use glam::Vec3;
use pretty_assertions::assert_eq;
use stagehand_core::simulator::{EntityNode, ResourceLayout, SimulatedProvider};
use stagehand_core::{Anchor, AnchorLocator, Pose};

const SPAWN: &str = "Spawn";

fn spawn_at(x: f32) -> Anchor {
    Anchor::new(SPAWN, Pose::at(Vec3::new(x, 0.0, 0.0)))
}

fn resolve_x(provider: &SimulatedProvider) -> Option<f32> {
    let resolution = AnchorLocator::new(provider).resolve_loaded(SPAWN);
    resolution.found.then_some(resolution.pose.position.x)
}

#[test]
fn root_is_checked_before_its_descendants() {
    let provider = SimulatedProvider::default();
    provider.set_layout(
        "Hall",
        ResourceLayout::new(vec![EntityNode::new("Root")
            .with_anchor(spawn_at(1.0))
            .with_child(EntityNode::new("Child").with_anchor(spawn_at(2.0)))]),
    );
    provider.preload("Hall");

    assert_eq!(resolve_x(&provider), Some(1.0));
}

#[test]
fn descendants_of_earlier_root_win_over_later_root() {
    let provider = SimulatedProvider::default();
    provider.set_layout(
        "Hall",
        ResourceLayout::new(vec![
            EntityNode::new("First").with_child(EntityNode::new("Deep").with_anchor(spawn_at(1.0))),
            EntityNode::new("Second").with_anchor(spawn_at(2.0)),
        ]),
    );
    provider.preload("Hall");

    assert_eq!(resolve_x(&provider), Some(1.0));
}

#[test]
fn descendants_are_searched_depth_first() {
    let provider = SimulatedProvider::default();
    provider.set_layout(
        "Hall",
        ResourceLayout::new(vec![EntityNode::new("Root")
            .with_child(
                EntityNode::new("Left")
                    .with_child(EntityNode::new("LeftLeaf").with_anchor(spawn_at(1.0))),
            )
            .with_child(EntityNode::new("Right").with_anchor(spawn_at(2.0)))]),
    );
    provider.preload("Hall");

    assert_eq!(resolve_x(&provider), Some(1.0));
}

#[test]
fn earlier_resource_wins() {
    let provider = SimulatedProvider::default();
    provider.set_layout("Second", ResourceLayout::new(vec![EntityNode::new("R").with_anchor(spawn_at(2.0))]));
    provider.set_layout("First", ResourceLayout::new(vec![EntityNode::new("R").with_anchor(spawn_at(1.0))]));
    provider.preload("First");
    provider.preload("Second");

    let resolution = AnchorLocator::new(&provider).resolve_loaded(SPAWN);
    assert_eq!(resolution.resource.as_deref(), Some("First"));
    assert_eq!(resolution.pose.position.x, 1.0);
}

#[test]
fn other_names_are_ignored() {
    let provider = SimulatedProvider::default();
    provider.set_layout(
        "Hall",
        ResourceLayout::new(vec![EntityNode::new("Door").with_anchor(Anchor::new("Door", Pose::at(Vec3::X)))]),
    );
    provider.preload("Hall");

    let resolution = AnchorLocator::new(&provider).resolve_loaded(SPAWN);
    assert!(!resolution.found);
    assert_eq!(resolution.pose, Pose::ORIGIN);
    assert_eq!(resolution.resource, None);
}

#[test]
fn nothing_loaded_resolves_to_origin() {
    let provider = SimulatedProvider::default();
    let resolution = AnchorLocator::new(&provider).resolve(&[], SPAWN);
    assert!(!resolution.found);
    assert_eq!(resolution.pose, Pose::ORIGIN);
}
