use std::collections::HashSet;
use std::sync::Arc;

use metrics_util::debugging::DebuggingRecorder;
use stockpoint::application::locations::LocationRepository;
use stockpoint::cache::{CacheConfig, CacheManager, SharedCache, TtlBand};
use stockpoint::domain::location::{LOCATION_ENTITY_TYPE, RawLocation};
use stockpoint::domain::shipping::ShippingZone;
use stockpoint::infra::memory::{InMemoryLocationSource, MemorySharedCache, StaticZoneRegistry};
use stockpoint::infra::telemetry;

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let shared = Arc::new(MemorySharedCache::without_pattern_support());
    let backend: Arc<dyn SharedCache> = shared.clone();
    let config = Arc::new(CacheConfig::default());

    // Miss, local hit, shared hit.
    let mut first = CacheManager::new(config.clone(), Some(backend.clone()));
    assert_eq!(first.get::<u32>("k").await, None);
    first.set("k", &1_u32, TtlBand::Short).await;
    assert_eq!(first.get::<u32>("k").await, Some(1));
    let mut second = CacheManager::new(config.clone(), Some(backend));
    assert_eq!(second.get::<u32>("k").await, Some(1));

    // Group flush fallback, then a failing shared tier.
    second.delete_pattern("stockpoint_stock_*").await;
    shared.set_available(false);
    second.set("k", &2_u32, TtlBand::Short).await;
    shared.set_available(true);

    // Location list rebuild.
    let source = Arc::new(InMemoryLocationSource::with_entities([RawLocation {
        id: 1,
        entity_type: LOCATION_ENTITY_TYPE.to_string(),
        status: "publish".to_string(),
        title: Some("Depot".to_string()),
        ..Default::default()
    }]));
    let zones = StaticZoneRegistry::new(
        Vec::new(),
        ShippingZone {
            id: 0,
            name: "Everywhere".to_string(),
            methods: Vec::new(),
        },
    );
    let repo = LocationRepository::new(source, Arc::new(zones));
    let mut cache = CacheManager::local_only(config);
    assert_eq!(repo.get_published_stores(&mut cache).await.expect("list").len(), 1);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "stockpoint_cache_local_hit_total",
        "stockpoint_cache_shared_hit_total",
        "stockpoint_cache_miss_total",
        "stockpoint_cache_shared_error_total",
        "stockpoint_cache_group_flush_total",
        "stockpoint_location_rebuild_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
