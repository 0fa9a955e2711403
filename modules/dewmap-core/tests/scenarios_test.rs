//! End-to-end scenarios over the public core API, driven by the in-memory
//! mocks from `dewmap_core::testing`.

use std::sync::Arc;
use std::time::Duration;

use dewmap_client::{ClientError, DewClient};
use dewmap_common::{FindId, ImageAttachment, NewFind};
use dewmap_core::aggregate::{flavor_count, latest_n, top_flavors};
use dewmap_core::decluster::jitter_radius;
use dewmap_core::testing::{find_at, GatedSource, MockAdminApi, MockFindSource};
use dewmap_core::{
    decluster, filter_finds, AdminConsole, DataLoader, DeleteOutcome, LoadOutcome, MapBoard,
    Resource,
};

fn scenario_a_finds() -> Vec<dewmap_common::Find> {
    vec![
        find_at("1", "Code Red", 40.00000, -75.00000),
        find_at("2", "Baja Blast", 40.00000, -75.00000),
    ]
}

#[test]
fn scenario_a_shared_point_spreads_into_two_markers() {
    let finds = scenario_a_finds();
    let placed = decluster(&finds);

    assert_eq!(placed.len(), 2);
    assert_ne!(placed[0].render, placed[1].render);
    for p in &placed {
        let d = p.render.degree_distance(&p.find.point());
        assert!(d > 0.0);
        assert!(d <= jitter_radius(2) + 1e-12, "marker {} too far: {d}", p.find.id);
    }
    assert_eq!(flavor_count(&finds), 2);

    // Same input order, same layout.
    assert_eq!(decluster(&finds), placed);
}

#[tokio::test]
async fn scenario_b_narrowing_query_drops_selection() {
    let source = Arc::new(MockFindSource::new().with_finds(scenario_a_finds()));
    let (mut board, feed) = MapBoard::new(source);
    board.load().await;

    board.select(&FindId::from("1"));
    assert_eq!(board.selected(), Some(&FindId::from("1")));

    board.set_query("baja");
    let ids: Vec<&str> = board.filtered().iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["2"]);
    assert!(board.selected().is_none());
    assert!(feed.borrow().is_none());
}

#[tokio::test]
async fn scenario_c_delete_confirmed_then_rejected() {
    let rows = vec![
        find_at("3", "Voltage", 1.0, 1.0),
        find_at("2", "Baja Blast", 2.0, 2.0),
        find_at("1", "Code Red", 3.0, 3.0),
    ];

    // Confirmed.
    let api = Arc::new(MockAdminApi::new("admin", "pw").signed_in().with_rows(rows.clone()));
    let console = AdminConsole::new(api.clone(), 25);
    console.bootstrap().await;

    let outcome = console.delete(&FindId::from("2")).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Removed);
    let ids: Vec<String> = console.store().finds().iter().map(|f| f.id.to_string()).collect();
    assert_eq!(ids, vec!["3", "1"]);

    // Rejected by the server.
    let api = Arc::new(MockAdminApi::new("admin", "pw").signed_in().with_rows(rows));
    api.fail_delete(
        "2",
        ClientError::Api {
            status: 503,
            message: "request failed (status 503)".to_string(),
        },
    );
    let console = AdminConsole::new(api.clone(), 25);
    console.bootstrap().await;

    let err = console.delete(&FindId::from("2")).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(console.store().finds().len(), 3);
    assert!(console.store().error().unwrap().contains("503"));
    assert!(console.stage().is_authed());
}

fn bmp_form() -> NewFind {
    NewFind {
        flavor: "Code Red".to_string(),
        size: "20oz".to_string(),
        location_name: "Gas N Go".to_string(),
        address: "12 Route 9".to_string(),
        image_url: None,
        image: Some(ImageAttachment {
            file_name: "photo.bmp".to_string(),
            content_type: "image/bmp".to_string(),
            bytes: vec![0; 1024 * 1024],
        }),
    }
}

#[tokio::test]
async fn scenario_d_bmp_upload_rejected_before_any_request() {
    // Nothing listens on the discard port; a request would fail with Network.
    let client = DewClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
    let err = client.submit_find(&bmp_form()).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(err.to_string(), "only png, jpg, webp, or gif files are allowed");

    let source = Arc::new(MockFindSource::new());
    let (mut board, _feed) = MapBoard::new(source.clone());
    assert!(board.submit(bmp_form()).await.is_err());
    assert!(source.submitted().is_empty());
}

#[tokio::test]
async fn scenario_e_later_load_wins_regardless_of_completion_order() {
    let (source, gates) = GatedSource::new(2);
    let loader = DataLoader::new(Arc::new(source));
    let mut gates = gates.into_iter();
    let (gate_a, gate_b) = (gates.next().unwrap(), gates.next().unwrap());

    let (a, b, ()) = tokio::join!(loader.load_finds(), loader.load_finds(), async {
        let _ = gate_b.send(Ok(vec![find_at("b", "Baja Blast", 1.0, 1.0)]));
        tokio::task::yield_now().await;
        let _ = gate_a.send(Ok(vec![find_at("a", "Code Red", 2.0, 2.0)]));
    });

    assert_eq!(a, LoadOutcome::Discarded);
    assert_eq!(b, LoadOutcome::Applied);
    let finds = loader.finds();
    assert_eq!(finds.len(), 1);
    assert_eq!(finds[0].id, FindId::from("b"));
    assert_eq!(loader.generation(Resource::Finds), 2);
}

#[test]
fn filter_properties_hold() {
    let finds = vec![
        find_at("1", "Code Red", 1.0, 1.0),
        find_at("2", "Baja Blast", 2.0, 2.0),
        find_at("3", "Code Red Zero", 3.0, 3.0),
        find_at("4", "Voltage", 4.0, 4.0),
    ];

    assert_eq!(filter_finds("", &finds), finds);
    assert_eq!(filter_finds("   ", &finds), finds);

    let hits = filter_finds("code", &finds);
    assert!(hits.iter().all(|h| finds.contains(h)));
    let ids: Vec<&str> = hits.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[test]
fn aggregates_match_filtered_set() {
    let finds = vec![
        find_at("1", "Code Red", 1.0, 1.0),
        find_at("2", "Baja Blast", 2.0, 2.0),
        find_at("3", "Code Red", 3.0, 3.0),
    ];

    let top = top_flavors(&finds, 5);
    assert_eq!(top.iter().map(|f| f.count).sum::<usize>(), finds.len());
    assert_eq!(latest_n(&finds, 5).len(), 3);
    assert_eq!(latest_n(&finds, 2).len(), 2);
}
