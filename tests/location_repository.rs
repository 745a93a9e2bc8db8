//! Location repository reads, derived views and invalidation.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use stockpoint::application::locations::LocationRepository;
use stockpoint::application::repos::RepoError;
use stockpoint::cache::{CacheConfig, CacheManager, EventKind, InvalidationObserver, SharedCache};
use stockpoint::domain::location::{LOCATION_ENTITY_TYPE, LocationId, LocationType, RawLocation};
use stockpoint::domain::shipping::{DEFAULT_ZONE_ID, ShippingMethodInstance, ShippingZone};
use stockpoint::infra::memory::{InMemoryLocationSource, MemorySharedCache, StaticZoneRegistry};

fn raw(id: LocationId, title: &str, location_type: &str, status: &str) -> RawLocation {
    RawLocation {
        id,
        entity_type: LOCATION_ENTITY_TYPE.to_string(),
        status: status.to_string(),
        title: Some(title.to_string()),
        location_type: Some(location_type.to_string()),
        ..Default::default()
    }
}

fn linked(mut location: RawLocation, instances: &[u64]) -> RawLocation {
    location.shipping_instances = Some(json!(instances));
    location
}

fn method(instance_id: u64, method_id: &str) -> ShippingMethodInstance {
    ShippingMethodInstance {
        instance_id,
        method_id: method_id.to_string(),
        title: format!("{method_id} #{instance_id}"),
    }
}

fn zones() -> StaticZoneRegistry {
    StaticZoneRegistry::new(
        vec![
            ShippingZone {
                id: 1,
                name: "Metro".to_string(),
                methods: vec![method(10, "local_pickup"), method(11, "flat_rate")],
            },
            ShippingZone {
                id: 2,
                name: "Regional".to_string(),
                methods: vec![method(20, "local_pickup")],
            },
        ],
        ShippingZone {
            id: DEFAULT_ZONE_ID,
            name: "Everywhere else".to_string(),
            methods: vec![method(30, "local_pickup")],
        },
    )
}

fn seeded_source() -> Arc<InMemoryLocationSource> {
    Arc::new(InMemoryLocationSource::with_entities([
        linked(raw(12, "Harbor", "store", "publish"), &[20, 30]),
        linked(raw(3, "Central Depot", "distribution_center", "publish"), &[11, 20]),
        linked(raw(7, "Airport", "physical_store", "publish"), &[30]),
        raw(8, "North Warehouse", "dc", "publish"),
        raw(9, "Closed Outlet", "store", "draft"),
        raw(10, "Binned", "store", "trash"),
        RawLocation {
            id: 11,
            entity_type: "product".to_string(),
            status: "publish".to_string(),
            title: Some("Not a location".to_string()),
            ..Default::default()
        },
        linked(raw(15, "Lakeside", "", "publish"), &[99]),
    ]))
}

fn repository(source: &Arc<InMemoryLocationSource>) -> LocationRepository {
    LocationRepository::new(source.clone(), Arc::new(zones()))
}

fn cache() -> CacheManager {
    CacheManager::local_only(Arc::new(CacheConfig::default()))
}

#[tokio::test]
async fn published_list_is_title_ordered_and_filtered() {
    let source = seeded_source();
    let repo = repository(&source);
    let mut cache = cache();

    let published = repo.get_published_stores(&mut cache).await.expect("list");

    let titles: Vec<&str> = published.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Airport", "Central Depot", "Harbor", "Lakeside", "North Warehouse"]
    );
    assert!(!published.contains(9));
    assert!(!published.contains(10));
    assert!(!published.contains(11));
}

#[tokio::test]
async fn published_list_is_cached() {
    let source = seeded_source();
    let repo = repository(&source);
    let mut cache = cache();

    repo.get_published_stores(&mut cache).await.expect("list");
    let finds = source.find_calls();
    repo.get_physical_stores(&mut cache).await.expect("stores");
    repo.get_distribution_centers(&mut cache).await.expect("dcs");
    repo.format_for_select(&mut cache).await.expect("select");

    assert_eq!(source.listing_calls(), 1);
    assert_eq!(source.find_calls(), finds);
}

#[tokio::test]
async fn type_views_partition_published_locations() {
    let source = seeded_source();
    let repo = repository(&source);
    let mut cache = cache();

    let published: HashSet<LocationId> = repo
        .get_published_stores(&mut cache)
        .await
        .expect("list")
        .ids()
        .into_iter()
        .collect();
    let centers: HashSet<LocationId> = repo
        .get_distribution_centers(&mut cache)
        .await
        .expect("dcs")
        .ids()
        .into_iter()
        .collect();
    let stores: HashSet<LocationId> = repo
        .get_physical_stores(&mut cache)
        .await
        .expect("stores")
        .ids()
        .into_iter()
        .collect();

    assert_eq!(centers, HashSet::from([3, 8]));
    assert!(centers.is_disjoint(&stores));
    assert_eq!(&centers | &stores, published);

    let by_type = repo
        .get_stores_by_type(&mut cache, LocationType::Store)
        .await
        .expect("by type");
    assert_eq!(by_type.ids().into_iter().collect::<HashSet<_>>(), stores);
}

#[tokio::test]
async fn shipping_instance_view() {
    let source = seeded_source();
    let repo = repository(&source);
    let mut cache = cache();

    let linked = repo
        .get_stores_by_shipping_instance(&mut cache, 20)
        .await
        .expect("by instance");
    assert_eq!(linked.ids(), vec![3, 12]);

    let none = repo
        .get_stores_by_shipping_instance(&mut cache, 12345)
        .await
        .expect("by instance");
    assert!(none.is_empty());
}

#[tokio::test]
async fn unpublish_event_hides_location() {
    let source = seeded_source();
    let repo = repository(&source);
    let shared: Arc<dyn SharedCache> = Arc::new(MemorySharedCache::new());
    let mut cache = CacheManager::new(Arc::new(CacheConfig::default()), Some(shared.clone()));

    let harbor = repo.get_store_by_id(&mut cache, 12).await.expect("read");
    assert_eq!(harbor.map(|l| l.title), Some("Harbor".to_string()));
    assert!(repo.get_published_stores(&mut cache).await.expect("list").contains(12));

    source.set_status(12, "draft");
    // Still served from cache until invalidated.
    assert!(repo.exists(&mut cache, 12).await.expect("exists"));

    cache
        .notify(EventKind::LocationUnpublished { location_id: 12 })
        .await;

    assert!(repo.get_store_by_id(&mut cache, 12).await.expect("read").is_none());
    assert!(!repo.get_published_stores(&mut cache).await.expect("list").contains(12));

    // A fresh context sharing the backend sees the same state.
    let mut other = CacheManager::new(Arc::new(CacheConfig::default()), Some(shared));
    assert!(!repo.exists(&mut other, 12).await.expect("exists"));
}

#[tokio::test]
async fn location_changed_refreshes_entity_and_aggregate() {
    let source = seeded_source();
    let repo = repository(&source);
    let mut cache = cache();

    repo.get_published_stores(&mut cache).await.expect("list");
    source.upsert(raw(12, "Harbor Front", "dc", "publish"));

    repo.location_changed(&mut cache, 12).await;

    let harbor = repo
        .get_store_by_id(&mut cache, 12)
        .await
        .expect("read")
        .expect("published");
    assert_eq!(harbor.title, "Harbor Front");
    assert!(repo.is_distribution_center(&mut cache, 12).await.expect("dc"));
    assert!(repo
        .get_distribution_centers(&mut cache)
        .await
        .expect("dcs")
        .contains(12));
}

#[tokio::test]
async fn bulk_load_matches_individual_resolution() {
    let source = seeded_source();
    let repo = repository(&source);
    let ids = [12, 3, 9, 10, 11, 404, 0, -5, 12, 8];

    let mut warm = cache();
    repo.get_store_by_id(&mut warm, 3).await.expect("warm");
    let before = source.find_many_calls();
    let bulk = repo.bulk_load(&mut warm, &ids).await.expect("bulk");
    assert_eq!(source.find_many_calls(), before + 1);

    let mut individual = cache();
    let mut expected = std::collections::HashMap::new();
    for id in ids {
        if let Some(location) = repo.get_store_by_id(&mut individual, id).await.expect("read") {
            expected.insert(id, location);
        }
    }

    assert_eq!(bulk, expected);
    assert_eq!(
        bulk.keys().copied().collect::<HashSet<_>>(),
        HashSet::from([3, 8, 12])
    );
}

#[tokio::test]
async fn bulk_load_of_cached_ids_skips_backend() {
    let source = seeded_source();
    let repo = repository(&source);
    let mut cache = cache();

    repo.bulk_load(&mut cache, &[12, 7]).await.expect("first");
    let batches = source.find_many_calls();
    let finds = source.find_calls();

    let again = repo.bulk_load(&mut cache, &[7, 12]).await.expect("second");

    assert_eq!(again.len(), 2);
    assert_eq!(source.find_many_calls(), batches);
    assert_eq!(source.find_calls(), finds);
}

#[tokio::test]
async fn shipping_lookup_takes_first_zone_then_default() {
    let source = seeded_source();
    let repo = repository(&source);
    let mut cache = cache();

    // Linked to 20 (Regional) and 30 (default): Regional wins.
    let harbor = repo
        .get_shipping_method_for_store(&mut cache, 12)
        .await
        .expect("lookup")
        .expect("linked");
    assert_eq!((harbor.zone_id, harbor.instance_id), (2, 20));

    // Linked to 11 (Metro) and 20 (Regional): zone order decides.
    let depot = repo
        .get_shipping_method_for_store(&mut cache, 3)
        .await
        .expect("lookup")
        .expect("linked");
    assert_eq!((depot.zone_id, depot.instance_id), (1, 11));
    assert_eq!(depot.zone_name, "Metro");
    assert_eq!(depot.method_id, "flat_rate");

    // Only the default zone matches.
    let airport = repo
        .get_shipping_method_for_store(&mut cache, 7)
        .await
        .expect("lookup")
        .expect("linked");
    assert_eq!((airport.zone_id, airport.instance_id), (DEFAULT_ZONE_ID, 30));

    // Linked to an instance no zone offers, not linked at all, or unknown.
    for id in [15, 8, 404] {
        assert!(repo
            .get_shipping_method_for_store(&mut cache, id)
            .await
            .expect("lookup")
            .is_none());
    }
}

#[tokio::test]
async fn select_options_follow_title_order() {
    let source = seeded_source();
    let repo = repository(&source);
    let mut cache = cache();

    let options = repo.format_for_select(&mut cache).await.expect("options");

    let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "Airport (#7) — Physical Store",
            "Central Depot (#3) — Distribution Center",
            "Harbor (#12) — Physical Store",
            "Lakeside (#15) — Physical Store",
            "North Warehouse (#8) — Distribution Center",
        ]
    );
}

#[tokio::test]
async fn invalid_ids_never_reach_the_backend() {
    let source = seeded_source();
    let repo = repository(&source);
    let mut cache = cache();

    assert!(repo.get_store_by_id(&mut cache, 0).await.expect("read").is_none());
    assert!(repo.get_store_by_id(&mut cache, -1).await.expect("read").is_none());
    assert!(!repo.is_distribution_center(&mut cache, 0).await.expect("dc"));
    assert!(repo.bulk_load(&mut cache, &[0, -3]).await.expect("bulk").is_empty());

    assert_eq!(source.find_calls(), 0);
    assert_eq!(source.find_many_calls(), 0);
}

#[tokio::test]
async fn defaults_fill_missing_attributes() {
    let source = seeded_source();
    let repo = repository(&source);
    let mut cache = cache();

    let lakeside = repo
        .get_store_by_id(&mut cache, 15)
        .await
        .expect("read")
        .expect("published");

    assert_eq!(lakeside.location_type, LocationType::Store);
    assert_eq!(lakeside.slug, "lakeside");
    assert_eq!(lakeside.prep_time_minutes, 60);
    assert_eq!(lakeside.contact.email, "");
}

#[tokio::test]
async fn backend_failures_propagate() {
    let source = seeded_source();
    let repo = repository(&source);
    let mut cache = cache();
    source.set_available(false);

    let err = repo.get_store_by_id(&mut cache, 12).await.unwrap_err();
    assert!(matches!(err, RepoError::Persistence(_)));
    assert!(repo.get_published_stores(&mut cache).await.is_err());
}
