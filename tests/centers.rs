//! Center listings per audience

mod common;

use common::graph_builder::{OTHER_USER, OWNER};
use common::AbcGraph;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;
use trellis::{ElementId, EngineConfig, FriendRegistry, GraphEngine, ShareLevel, TagSpec};

/// Center `ids` in order, far enough apart that dates differ
fn center_in_order(g: &AbcGraph, ids: &[&ElementId]) {
    for id in ids {
        g.engine.update_last_center_date(id).unwrap();
        sleep(Duration::from_millis(5));
    }
}

fn ids(entries: &[trellis::CenterEntry]) -> Vec<ElementId> {
    entries.iter().map(|e| e.id().clone()).collect()
}

fn befriend(registry: &FriendRegistry, a: &str, b: &str) {
    registry.add(a, b);
    assert!(registry.confirm(b, a));
}

#[test]
fn owner_centers_are_listed_newest_first() {
    let g = AbcGraph::new();
    center_in_order(&g, &[&g.a, &g.c, &g.b]);

    let entries = g.engine.centers().for_owner(OWNER).unwrap();
    assert_eq!(ids(&entries), vec![g.b.clone(), g.c.clone(), g.a.clone()]);
}

#[test]
fn elements_never_centered_are_not_listed() {
    let g = AbcGraph::new();
    g.engine.update_last_center_date(&g.b).unwrap();
    g.engine.update_last_center_date(&g.foreign).unwrap();

    let entries = g.engine.centers().for_owner(OWNER).unwrap();
    assert_eq!(ids(&entries), vec![g.b.clone()]);
}

#[test]
fn centering_is_not_an_edit() {
    let g = AbcGraph::new();
    let before = g.vertex(&g.a).data.modified_at;
    g.engine.update_last_center_date(&g.a).unwrap();
    let after = g.vertex(&g.a);
    assert_eq!(after.data.modified_at, before);
    assert!(after.data.last_center_date.is_some());
}

#[test]
fn visits_are_counted() {
    let g = AbcGraph::new();
    assert_eq!(g.engine.increment_number_of_visits(&g.a).unwrap(), 1);
    assert_eq!(g.engine.increment_number_of_visits(&g.a).unwrap(), 2);
    g.engine.update_last_center_date(&g.a).unwrap();

    let entries = g.engine.centers().for_owner(OWNER).unwrap();
    assert_eq!(entries[0].nb_visits, 2);
}

#[test]
fn owners_see_every_neighbor_count() {
    let g = AbcGraph::new();
    g.engine.make_public(&g.c).unwrap();
    g.engine.update_last_center_date(&g.b).unwrap();

    let entry = &g.engine.centers().for_owner(OWNER).unwrap()[0];
    assert_eq!(entry.nb_public_neighbors, Some(1));
    assert_eq!(entry.nb_friend_neighbors, Some(0));
    assert_eq!(entry.nb_neighbors_total, Some(2));
    assert_eq!(entry.context.len(), 2);
    assert_eq!(entry.context[&g.a], "vertex A");
}

#[test]
fn public_listing_hides_private_centers_and_counts() {
    let g = AbcGraph::new();
    g.engine.make_public(&g.b).unwrap();
    g.engine.make_public(&g.c).unwrap();
    center_in_order(&g, &[&g.a, &g.b]);

    let entries = g.engine.centers().public().unwrap();
    assert_eq!(ids(&entries), vec![g.b.clone()]);
    let entry = &entries[0];
    assert_eq!(entry.nb_public_neighbors, Some(1));
    assert_eq!(entry.nb_friend_neighbors, None);
    assert_eq!(entry.nb_neighbors_total, None);
    // Only the public neighbor's label leaks
    assert_eq!(entry.context.keys().collect::<Vec<_>>(), vec![&g.c]);
}

#[test]
fn public_listing_of_one_user() {
    let g = AbcGraph::new();
    g.engine.make_public(&g.a).unwrap();
    g.engine.make_public(&g.foreign).unwrap();
    center_in_order(&g, &[&g.a, &g.foreign]);

    assert_eq!(ids(&g.engine.centers().public().unwrap()).len(), 2);
    let entries = g.engine.centers().public_of_user(OTHER_USER).unwrap();
    assert_eq!(ids(&entries), vec![g.foreign.clone()]);
}

#[test]
fn pattern_listing_shows_only_centered_patterns() {
    let g = AbcGraph::new();
    g.engine.make_pattern(&g.a).unwrap();
    center_in_order(&g, &[&g.a, &g.b]);

    let entries = g.engine.centers().patterns().unwrap();
    assert_eq!(ids(&entries), vec![g.a.clone()]);
    assert_eq!(entries[0].nb_neighbors_total, None);
}

#[test]
fn listings_are_paged() {
    let g = AbcGraph::new();
    let d = g.add_d();
    center_in_order(&g, &[&g.a, &g.b, &g.c, &d]);

    let first = g.engine.centers().limit(2).for_owner(OWNER).unwrap();
    assert_eq!(ids(&first), vec![d.clone(), g.c.clone()]);
    let second = g.engine.centers().limit(2).skip(2).for_owner(OWNER).unwrap();
    assert_eq!(ids(&second), vec![g.b.clone(), g.a.clone()]);
    let past_end = g.engine.centers().skip(10).for_owner(OWNER).unwrap();
    assert!(past_end.is_empty());
}

#[test]
fn default_page_size_comes_from_config() {
    let config = EngineConfig {
        center_page_limit: 1,
        ..EngineConfig::default()
    };
    let g = AbcGraph::on(GraphEngine::in_memory().with_config(config));
    center_in_order(&g, &[&g.a, &g.b]);

    assert_eq!(g.engine.centers().for_owner(OWNER).unwrap().len(), 1);
}

#[test]
fn context_is_capped_by_config() {
    let config = EngineConfig {
        context_size: 1,
        ..EngineConfig::default()
    };
    let g = AbcGraph::on(GraphEngine::in_memory().with_config(config));
    g.engine.update_last_center_date(&g.b).unwrap();

    let entry = &g.engine.centers().for_owner(OWNER).unwrap()[0];
    assert_eq!(entry.context.len(), 1);
}

#[test]
fn friend_listing_needs_a_confirmed_friendship() {
    let registry = Arc::new(FriendRegistry::new());
    let g = AbcGraph::on(GraphEngine::in_memory().with_friend_oracle(registry.clone()));
    g.engine.set_share_level(&g.b, ShareLevel::Friends).unwrap();
    g.engine.update_last_center_date(&g.b).unwrap();

    assert!(g.engine.centers().for_friend(OTHER_USER, OWNER).unwrap().is_empty());

    registry.add(OTHER_USER, OWNER);
    assert!(g.engine.centers().for_friend(OTHER_USER, OWNER).unwrap().is_empty());

    assert!(registry.confirm(OWNER, OTHER_USER));
    let entries = g.engine.centers().for_friend(OTHER_USER, OWNER).unwrap();
    assert_eq!(ids(&entries), vec![g.b.clone()]);
}

#[test]
fn friends_see_friend_counts_but_no_totals() {
    let registry = Arc::new(FriendRegistry::new());
    befriend(&registry, OWNER, OTHER_USER);
    let g = AbcGraph::on(GraphEngine::in_memory().with_friend_oracle(registry));
    g.engine.make_public(&g.b).unwrap();
    g.engine.set_share_level(&g.c, ShareLevel::Friends).unwrap();
    center_in_order(&g, &[&g.a, &g.b]);

    let entries = g.engine.centers().for_friend(OTHER_USER, OWNER).unwrap();
    assert_eq!(ids(&entries), vec![g.b.clone()]);
    let entry = &entries[0];
    assert_eq!(entry.nb_public_neighbors, Some(0));
    assert_eq!(entry.nb_friend_neighbors, Some(1));
    assert_eq!(entry.nb_neighbors_total, None);
    assert_eq!(entry.context.keys().collect::<Vec<_>>(), vec![&g.c]);
}

#[test]
fn friends_feed_merges_every_confirmed_friend() {
    let registry = Arc::new(FriendRegistry::new());
    befriend(&registry, OWNER, OTHER_USER);
    let g = AbcGraph::on(GraphEngine::in_memory().with_friend_oracle(registry));
    let stranger = g.engine.create_vertex("brigitte").unwrap();
    for id in [&g.a, &g.foreign, stranger.id()] {
        g.engine.make_public(id).unwrap();
    }
    center_in_order(&g, &[&g.a, stranger.id(), &g.foreign]);

    let feed = g.engine.centers().friends_feed(OTHER_USER).unwrap();
    assert_eq!(ids(&feed), vec![g.a.clone()]);
}

#[test]
fn friend_listings_are_empty_without_an_oracle() {
    let g = AbcGraph::new();
    g.engine.make_public(&g.a).unwrap();
    g.engine.update_last_center_date(&g.a).unwrap();
    assert!(g.engine.centers().friends_feed(OTHER_USER).unwrap().is_empty());
    assert!(g.engine.centers().for_friend(OTHER_USER, OWNER).unwrap().is_empty());
}

#[test]
fn tag_centers_report_their_references() {
    let g = AbcGraph::new();
    let tag = g
        .engine
        .add_tag(&g.a, &TagSpec::new("http://example.org/location"))
        .unwrap();
    g.engine.add_tag(&g.b, &TagSpec::new("http://example.org/location")).unwrap();
    g.engine.update_last_center_date(tag.id()).unwrap();

    let entry = &g.engine.centers().for_owner(OWNER).unwrap()[0];
    assert_eq!(entry.id(), tag.id());
    assert_eq!(entry.nb_references, Some(2));
    assert_eq!(entry.nb_neighbors_total, Some(2));
    assert!(entry.context.is_empty());
}

#[test]
fn entries_serialize_without_hidden_counts() {
    let g = AbcGraph::new();
    g.engine.make_public(&g.a).unwrap();
    g.engine.update_last_center_date(&g.a).unwrap();

    let entries = g.engine.centers().public().unwrap();
    let json = serde_json::to_value(&entries[0]).unwrap();
    assert_eq!(json["nb_public_neighbors"], 0);
    assert!(json.get("nb_neighbors_total").is_none());
    assert!(json.get("nb_friend_neighbors").is_none());
}
