//! Integration tests for the traversal pipeline
//!
//! Runs filtering, expansion, set algebra, bookmarks and batch mutation over a
//! small movie graph.

use samyama_gremlin::graph::SequentialIds;
use samyama_gremlin::{
    merge, property_map, Branch, Element, Graph, GraphError, MemoryStore, NodeId, PropertyMap,
    PropertyValue, Traversal,
};
use std::sync::Arc;

struct Movies {
    graph: Graph,
    tom: NodeId,
    meg: NodeId,
    rita: NodeId,
    gump: NodeId,
    sleepless: NodeId,
}

fn id_of(traversal: &Traversal) -> NodeId {
    traversal.first().unwrap().unwrap().id().unwrap().clone()
}

fn ids(elements: &[Element]) -> Vec<NodeId> {
    elements.iter().filter_map(|e| e.id().cloned()).collect()
}

fn names(elements: &[Element]) -> Vec<String> {
    elements
        .iter()
        .filter_map(|e| e.field("name").and_then(|v| v.as_string().map(str::to_string)))
        .collect()
}

/// tom -actedIn-> gump, tom -actedIn-> sleepless, meg -actedIn-> sleepless,
/// tom -knows-> meg, rita -knows-> tom
async fn movies() -> Movies {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let graph = Graph::with_store(Arc::new(MemoryStore::new()), Arc::new(SequentialIds::new("n")));

    let add = |props: PropertyMap| {
        let graph = graph.clone();
        async move { graph.add_vertex(props).await.unwrap() }
    };
    let tom = add(property_map([
        ("name", PropertyValue::from("Tom Hanks")),
        ("born", PropertyValue::from(1956i64)),
    ]))
    .await;
    let meg = add(property_map([
        ("name", PropertyValue::from("Meg Ryan")),
        ("born", PropertyValue::from(1961i64)),
    ]))
    .await;
    let rita = add(property_map([
        ("name", PropertyValue::from("Rita Wilson")),
        ("born", PropertyValue::from(1956i64)),
    ]))
    .await;
    let gump = add(property_map([("name", "Forest Gump")])).await;
    let sleepless = add(property_map([("name", "Sleepless in Seattle")])).await;

    for (from, to, label) in [
        (&tom, &gump, "actedIn"),
        (&tom, &sleepless, "actedIn"),
        (&meg, &sleepless, "actedIn"),
        (&tom, &meg, "knows"),
        (&rita, &tom, "knows"),
    ] {
        graph
            .add_edge(from, to, label, PropertyMap::new())
            .await
            .unwrap();
    }

    Movies {
        tom: id_of(&tom),
        meg: id_of(&meg),
        rita: id_of(&rita),
        gump: id_of(&gump),
        sleepless: id_of(&sleepless),
        graph,
    }
}

#[tokio::test]
async fn test_actor_of_movie() {
    let m = movies().await;
    let actors = m
        .graph
        .v()
        .has([("name", "Forest Gump")])
        .in_e("actedIn")
        .out_v()
        .to_array()
        .await
        .unwrap();
    assert_eq!(names(&actors), vec!["Tom Hanks"]);
}

#[tokio::test]
async fn test_out_then_in_expansion() {
    let m = movies().await;
    let edges = m
        .graph
        .v_ids(&m.tom)
        .out("actedIn")
        .in_e("actedIn")
        .to_array()
        .await
        .unwrap();
    assert_eq!(edges.len(), 3);

    // The batched endpoint resolve collapses repeated tails
    let co_stars = m
        .graph
        .v_ids(&m.tom)
        .out("actedIn")
        .in_("actedIn")
        .to_array()
        .await
        .unwrap();
    assert_eq!(ids(&co_stars), vec![m.tom.clone(), m.meg.clone()]);
}

#[tokio::test]
async fn test_expansion_skips_non_matching_kinds() {
    let m = movies().await;
    // out_v over vertices and out_e over edges yield nothing
    assert!(m.graph.v().out_v().to_array().await.unwrap().is_empty());
    assert!(m.graph.e().out_e("knows").to_array().await.unwrap().is_empty());
    assert!(m.graph.v_ids(&m.gump).out("knows").to_array().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dedup_is_idempotent() {
    let m = movies().await;
    let base = m.graph.v().both("knows");
    let once = base.dedup().to_array().await.unwrap();
    let twice = base.dedup().dedup().to_array().await.unwrap();
    assert_eq!(once, twice);
    assert_eq!(base.to_array().await.unwrap().len(), 4);
    assert_eq!(once.len(), 3);
}

#[tokio::test]
async fn test_empty_pattern_is_identity() {
    let m = movies().await;
    let all = m.graph.v().to_array().await.unwrap();
    let filtered = m.graph.v().has(PropertyMap::new()).to_array().await.unwrap();
    assert_eq!(all, filtered);
    assert!(m.graph.v().has_not(PropertyMap::new()).to_array().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_has_matches_document_fields() {
    let m = movies().await;
    let born_1956 = m
        .graph
        .v()
        .has([("born", 1956i64)])
        .to_array()
        .await
        .unwrap();
    assert_eq!(ids(&born_1956), vec![m.tom.clone(), m.rita.clone()]);

    let not_1956 = m.graph.v().has_not([("born", 1956i64)]).to_array().await.unwrap();
    assert_eq!(not_1956.len(), 3);

    let knows_edges = m.graph.e().has([("label", "knows")]).to_array().await.unwrap();
    assert_eq!(knows_edges.len(), 2);
    assert!(knows_edges.iter().all(Element::is_edge));

    let from_tom = m
        .graph
        .e()
        .has([("out", m.tom.as_str())])
        .to_array()
        .await
        .unwrap();
    assert_eq!(from_tom.len(), 3);
}

#[tokio::test]
async fn test_both_concatenates_out_then_in() {
    let m = movies().await;
    let both = m.graph.v_ids(&m.tom).both("knows").to_array().await.unwrap();
    assert_eq!(ids(&both), vec![m.meg.clone(), m.rita.clone()]);

    let edges = m.graph.v_ids(&m.tom).both_e("knows").to_array().await.unwrap();
    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].as_edge().unwrap().in_, m.meg);
    assert_eq!(edges[1].as_edge().unwrap().out, m.rita);

    let ends = m
        .graph
        .v_ids(&m.tom)
        .out_e("knows")
        .both_v()
        .to_array()
        .await
        .unwrap();
    assert_eq!(ids(&ends), vec![m.tom.clone(), m.meg.clone()]);
}

#[tokio::test]
async fn test_set_algebra() {
    let m = movies().await;
    let in_sleepless = m.graph.v_ids(&m.sleepless).in_("actedIn");
    let born_1956 = m.graph.v().has([("born", 1956i64)]);

    let both = m
        .graph
        .v()
        .and([Branch::from(&in_sleepless), Branch::from(&born_1956)])
        .to_array()
        .await
        .unwrap();
    assert_eq!(ids(&both), vec![m.tom.clone()]);

    let either = m
        .graph
        .v()
        .or([Branch::from(&in_sleepless), Branch::from(&born_1956)])
        .to_array()
        .await
        .unwrap();
    assert_eq!(ids(&either), vec![m.tom.clone(), m.meg.clone(), m.rita.clone()]);

    let neither = m
        .graph
        .v()
        .except([Branch::from(&in_sleepless), Branch::from(&born_1956)])
        .to_array()
        .await
        .unwrap();
    assert_eq!(ids(&neither), vec![m.gump.clone(), m.sleepless.clone()]);

    let retained = m
        .graph
        .v()
        .retain([Branch::from(&in_sleepless), Branch::from(&born_1956)])
        .to_array()
        .await
        .unwrap();
    assert_eq!(ids(&retained), ids(&either));

    // No conditions: and keeps everything, or keeps nothing
    assert_eq!(m.graph.v().and(Vec::<Branch>::new()).to_array().await.unwrap().len(), 5);
    assert!(m.graph.v().or(Vec::<Branch>::new()).to_array().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_except_is_noop_when_already_excluded() {
    let m = movies().await;
    let actors = m.graph.v().has([("born", 1956i64)]);
    let rest = m.graph.v().except([Branch::from(&actors)]);

    let once = rest.to_array().await.unwrap();
    let again = rest.except([Branch::from(&actors)]).to_array().await.unwrap();
    assert_eq!(once, again);
}

#[tokio::test]
async fn test_condition_built_from_current_stage() {
    let m = movies().await;
    // Vertices that know someone
    let knowers = m
        .graph
        .v()
        .and([Branch::from_fn(|current| current.out("knows").in_("knows"))])
        .to_array()
        .await
        .unwrap();
    assert_eq!(ids(&knowers), vec![m.tom.clone(), m.rita.clone()]);
}

#[tokio::test]
async fn test_select_collects_bookmarks() {
    let m = movies().await;
    let selected = m
        .graph
        .v_ids(&m.tom)
        .as_("actor")
        .out("actedIn")
        .has([("name", "Sleepless in Seattle")])
        .as_("movie")
        .select(Vec::<String>::new())
        .to_array()
        .await
        .unwrap();

    assert_eq!(selected.len(), 1);
    let selection = selected[0].as_selection().unwrap();
    assert_eq!(selection.keys().collect::<Vec<_>>(), vec!["actor", "movie"]);
    assert_eq!(ids(&selection["actor"]), vec![m.tom.clone()]);
    assert_eq!(ids(&selection["movie"]), vec![m.sleepless.clone()]);

    let only_movie = m
        .graph
        .v_ids(&m.tom)
        .as_("actor")
        .out("actedIn")
        .as_("movie")
        .select(["movie"])
        .to_array()
        .await
        .unwrap();
    let selection = only_movie[0].as_selection().unwrap();
    assert_eq!(selection.len(), 1);
    assert_eq!(ids(&selection["movie"]), vec![m.gump.clone(), m.sleepless.clone()]);
}

#[tokio::test]
async fn test_repeated_bookmark_keeps_latest() {
    let m = movies().await;
    let selected = m
        .graph
        .v_ids(&m.rita)
        .as_("x")
        .out("knows")
        .as_("x")
        .select(["x"])
        .to_array()
        .await
        .unwrap();
    let selection = selected[0].as_selection().unwrap();
    assert_eq!(ids(&selection["x"]), vec![m.tom.clone()]);
}

#[tokio::test]
async fn test_back_returns_nearest_bookmark() {
    let m = movies().await;
    let pipeline = m
        .graph
        .v_ids(&m.tom)
        .as_("start")
        .out("knows")
        .as_("friend")
        .out("actedIn");

    let friend = pipeline.back("friend").unwrap();
    assert_eq!(friend.name(), Some("friend"));
    assert_eq!(ids(&friend.to_array().await.unwrap()), vec![m.meg.clone()]);

    let start = pipeline.back("start").unwrap();
    assert_eq!(ids(&start.to_array().await.unwrap()), vec![m.tom.clone()]);

    assert!(pipeline.back("missing").is_none());
    assert_eq!(start.back("start").unwrap().depth(), start.depth());
}

#[tokio::test]
async fn test_map_projects_fields() {
    let m = movies().await;
    let projected = m
        .graph
        .v_ids(&m.meg)
        .map(["name"])
        .to_array()
        .await
        .unwrap();

    let json = projected[0].to_json();
    assert_eq!(json["name"], "Meg Ryan");
    assert_eq!(json["id"], m.meg.as_str());
    assert_eq!(json["kind"], "VERTEX");
    assert!(json.get("born").is_none());
}

#[tokio::test]
async fn test_interval_is_half_open() {
    let m = movies().await;
    let born = m
        .graph
        .v()
        .interval("born", 1956i64, 1961i64)
        .to_array()
        .await
        .unwrap();
    assert_eq!(ids(&born), vec![m.tom.clone(), m.rita.clone()]);

    let with_float_bounds = m
        .graph
        .v()
        .interval("born", 1955.5, 1961.5)
        .to_array()
        .await
        .unwrap();
    assert_eq!(with_float_bounds.len(), 3);
}

#[tokio::test]
async fn test_random_extremes() {
    let m = movies().await;
    assert!(m.graph.v().random(0.0).to_array().await.unwrap().is_empty());
    assert_eq!(m.graph.v().random(1.0).to_array().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_filter_with_predicate() {
    let m = movies().await;
    let hubs = m
        .graph
        .v()
        .filter(|e| e.as_vertex().is_some_and(|v| v.degree() >= 3))
        .to_array()
        .await
        .unwrap();
    assert_eq!(ids(&hubs), vec![m.tom.clone()]);
}

#[tokio::test]
async fn test_first_requires_materialized_stage() {
    let m = movies().await;
    let lazy = m.graph.v();
    assert!(matches!(lazy.first(), Err(GraphError::NotMaterialized)));

    let materialized = lazy.materialize().await.unwrap();
    assert_eq!(materialized.first().unwrap().unwrap().id(), Some(&m.tom));

    let empty = m.graph.v_ids("missing").materialize().await.unwrap();
    assert!(empty.first().unwrap().is_none());
}

#[tokio::test]
async fn test_traversal_add_edge_is_cartesian() {
    let m = movies().await;
    let actors = m.graph.v().has([("born", 1956i64)]);
    let movies = m.graph.v().has_not([("born", 1956i64)]).has_not([("born", 1961i64)]);

    let created = actors
        .add_edge("watched", &movies, property_map([("rating", 5i64)]))
        .await
        .unwrap();
    assert!(created.is_materialized());
    let edges = created.to_array().await.unwrap();
    assert_eq!(edges.len(), 4);
    assert!(edges
        .iter()
        .all(|e| e.field("rating") == Some(PropertyValue::Integer(5))));

    let watched = m.graph.v_ids(&m.rita).out("watched").to_array().await.unwrap();
    assert_eq!(ids(&watched), vec![m.gump.clone(), m.sleepless.clone()]);
}

#[tokio::test]
async fn test_remove_detaches_every_node() {
    let m = movies().await;
    let removed = m.graph.v().has([("born", 1956i64)]).remove().await.unwrap();
    assert!(removed.to_array().await.unwrap().is_empty());

    let remaining = m.graph.v().to_array().await.unwrap();
    assert_eq!(ids(&remaining), vec![m.meg.clone(), m.gump.clone(), m.sleepless.clone()]);

    // Only meg -actedIn-> sleepless survives
    let edges = m.graph.e().to_array().await.unwrap();
    assert_eq!(edges.len(), 1);
    for element in &edges {
        let edge = element.as_edge().unwrap();
        assert_ne!(edge.out, m.tom);
        assert_ne!(edge.in_, m.tom);
    }

    let meg = m.graph.v_ids(&m.meg).to_array().await.unwrap();
    assert!(meg[0].field("in_knows").is_none());
}

#[tokio::test]
async fn test_remove_of_vertices_and_their_edges_skips_removed() {
    let m = movies().await;
    // Tom comes first; his edges are gone by the time they are reached
    let pipeline = merge(
        &m.graph.v_ids(&m.tom),
        [Branch::from_fn(|t| t.clone()), Branch::from_fn(|t| t.out_e("knows"))],
    )
    .materialize()
    .await
    .unwrap();
    pipeline.remove().await.unwrap();
    assert_eq!(m.graph.e().to_array().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_merge_concatenates_branches() {
    let m = movies().await;
    let start = m.graph.v_ids(&m.tom);
    let merged = merge(
        &start,
        [
            Branch::from(m.graph.v_ids(&m.rita)),
            Branch::from_fn(|t| t.out("knows")),
            Branch::from_fn(|t| t.out("knows")),
        ],
    );
    assert_eq!(merged.parent().unwrap().depth(), start.depth());
    let elements = merged.to_array().await.unwrap();
    assert_eq!(ids(&elements), vec![m.rita.clone(), m.meg.clone(), m.meg.clone()]);
}

#[tokio::test]
async fn test_stage_can_be_run_twice() {
    let m = movies().await;
    let friends = m.graph.v().out("knows");
    let first = friends.to_array().await.unwrap();
    let second = friends.to_array().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(ids(&first), vec![m.meg.clone(), m.tom.clone()]);
}

/// Tom as a vertex followed by Meg as a projection
fn vertex_then_projection(m: &Movies) -> Traversal {
    merge(
        &m.graph.v_ids(&m.tom),
        [
            Branch::from_fn(|t| t.clone()),
            Branch::from(m.graph.v_ids(&m.meg).map(["name"])),
        ],
    )
}

#[tokio::test]
async fn test_traversal_add_edge_validates_before_writing() {
    let m = movies().await;
    let mixed = vertex_then_projection(&m);
    let gump = m.graph.v_ids(&m.gump);

    let err = mixed
        .add_edge("likes", &gump, PropertyMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidInput { expected: "vertex", .. }));

    let err = gump
        .add_edge("likes", &mixed, PropertyMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidInput { expected: "vertex", .. }));

    let likes = m.graph.e().has([("label", "likes")]).to_array().await.unwrap();
    assert!(likes.is_empty());
}

#[tokio::test]
async fn test_traversal_remove_validates_before_writing() {
    let m = movies().await;
    let err = vertex_then_projection(&m).remove().await.unwrap_err();
    assert!(matches!(
        err,
        GraphError::InvalidInput {
            expected: "vertex or edge",
            ..
        }
    ));

    assert_eq!(m.graph.v().to_array().await.unwrap().len(), 5);
    assert_eq!(m.graph.e().to_array().await.unwrap().len(), 5);
}
