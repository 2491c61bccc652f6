use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vmsync_core::{AttributeMap, ErrorPolicy, SkipReason};
use vmsync_storage::{
    AccountRef, HostRecord, HostStore, InventoryConfig, InventoryReport, InventorySink,
    MemoryHostStore, StoreError,
};
use vmsync_sync::{Importer, IngestMode, Ingestor};
use vmsync_vsphere::{
    CollectFilter, Collector, CollectorSettings, CustomFieldDef, ManagedRef, ParentEntity,
    SnapshotSource, SourceApi, SourceError, TagInfo, VmDetails, VmSummary,
};

fn data(pairs: &[(&str, &str)]) -> AttributeMap {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

fn config() -> InventoryConfig {
    InventoryConfig::new("lab", "vmware_vcenter")
}

fn pairs() -> Vec<(String, AttributeMap)> {
    vec![
        ("web01".into(), data(&[("cpu_count", "2"), ("power_state", "POWERED_ON")])),
        ("db01".into(), data(&[("cpu_count", "8")])),
        ("ghost".into(), data(&[("cpu_count", "1")])),
        (" ".into(), data(&[("cpu_count", "1")])),
        ("app01".into(), AttributeMap::new()),
    ]
}

async fn seeded_store() -> Arc<MemoryHostStore> {
    let store = Arc::new(MemoryHostStore::new());
    store
        .insert_all(["web01", "db01", "app01"].map(HostRecord::new))
        .await;
    store
}

/// Wraps a store and counts sink calls.
struct CountingSink {
    inner: Arc<MemoryHostStore>,
    bulk_calls: AtomicUsize,
    single_calls: AtomicUsize,
}

impl CountingSink {
    fn new(inner: Arc<MemoryHostStore>) -> Self {
        Self {
            inner,
            bulk_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl InventorySink for CountingSink {
    async fn bulk_submit(
        &self,
        config: &InventoryConfig,
        pairs: Vec<(String, AttributeMap)>,
    ) -> Result<InventoryReport, StoreError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.bulk_submit(config, pairs).await
    }

    async fn submit_one(
        &self,
        record: &mut HostRecord,
        data: AttributeMap,
        key: &str,
        config: &InventoryConfig,
    ) -> Result<bool, StoreError> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.submit_one(record, data, key, config).await
    }
}

async fn ingest(mode: IngestMode) -> (Arc<MemoryHostStore>, Arc<CountingSink>) {
    let store = seeded_store().await;
    let sink = Arc::new(CountingSink::new(store.clone()));
    let summary = Ingestor::new(store.clone(), sink.clone())
        .with_progress_every(1)
        .run(&config(), pairs(), mode)
        .await
        .unwrap();

    assert_eq!(summary.updated, 2);
    assert_eq!(summary.skipped_for(SkipReason::NotFoundInStore), 1);
    assert_eq!(summary.skipped_for(SkipReason::BlankName), 1);
    assert_eq!(summary.skipped_for(SkipReason::NoAttributes), 1);
    assert_eq!(summary.failed, 0);
    (store, sink)
}

#[tokio::test]
async fn test_bulk_and_individual_reach_the_same_state() {
    let (bulk_store, bulk_sink) = ingest(IngestMode::Bulk).await;
    let (single_store, single_sink) = ingest(IngestMode::Individual).await;

    for hostname in ["web01", "db01", "app01"] {
        let bulk = bulk_store.get_host(hostname).await.unwrap();
        let single = single_store.get_host(hostname).await.unwrap();
        assert_eq!(bulk, single, "{hostname} differs");
    }
    assert!(bulk_store.get_host("ghost").await.unwrap().is_none());
    assert!(single_store.get_host("ghost").await.unwrap().is_none());

    let web = bulk_store.get_host("web01").await.unwrap().unwrap();
    assert_eq!(
        web.all_attributes().get_text("vmware_vcenter__cpu_count").as_deref(),
        Some("2")
    );

    assert_eq!(bulk_sink.bulk_calls.load(Ordering::SeqCst), 1);
    assert_eq!(bulk_sink.single_calls.load(Ordering::SeqCst), 0);
    assert_eq!(single_sink.bulk_calls.load(Ordering::SeqCst), 0);
    assert_eq!(single_sink.single_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_repeated_ingestion_is_unchanged() {
    for mode in [IngestMode::Bulk, IngestMode::Individual] {
        let store = seeded_store().await;
        let ingestor = Ingestor::new(store.clone(), store.clone());
        ingestor.run(&config(), pairs(), mode).await.unwrap();

        let summary = ingestor.run(&config(), pairs(), mode).await.unwrap();
        assert_eq!(summary.updated, 0, "{mode}");
        assert_eq!(summary.unchanged, 2, "{mode}");
    }
}

struct FailingSink;

#[async_trait]
impl InventorySink for FailingSink {
    async fn bulk_submit(
        &self,
        _config: &InventoryConfig,
        _pairs: Vec<(String, AttributeMap)>,
    ) -> Result<InventoryReport, StoreError> {
        Err(StoreError::io("inventory", "disk full"))
    }

    async fn submit_one(
        &self,
        _record: &mut HostRecord,
        _data: AttributeMap,
        _key: &str,
        _config: &InventoryConfig,
    ) -> Result<bool, StoreError> {
        Err(StoreError::io("inventory", "disk full"))
    }
}

#[tokio::test]
async fn test_sink_failures_follow_the_error_policy() {
    let store = seeded_store().await;

    let ingestor = Ingestor::new(store.clone(), Arc::new(FailingSink));
    let bulk = ingestor.run(&config(), pairs(), IngestMode::Bulk).await.unwrap();
    assert_eq!(bulk.failed, 3);
    let single = ingestor
        .run(&config(), pairs(), IngestMode::Individual)
        .await
        .unwrap();
    assert_eq!(single.failed, 2);
    assert_eq!(single.skipped_for(SkipReason::NotFoundInStore), 1);

    let ingestor = Ingestor::new(store, Arc::new(FailingSink)).with_policy(ErrorPolicy::new(true));
    assert!(
        ingestor
            .run(&config(), pairs(), IngestMode::Individual)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_import_creates_updates_and_skips() {
    let store = Arc::new(MemoryHostStore::new());
    let mut foreign = HostRecord::new("shared01");
    foreign.account = Some("prod".into());
    let mut unowned = HostRecord::new("legacy01");
    unowned.labels = data(&[("power_state", "POWERED_ON")]);
    store.insert_all([foreign, unowned]).await;

    let importer = Importer::new(store.clone(), AccountRef::new("lab"));
    let objects = vec![
        ("web01".to_string(), data(&[("power_state", "POWERED_ON")])),
        ("  ".to_string(), data(&[("power_state", "POWERED_OFF")])),
        ("shared01".to_string(), data(&[("power_state", "POWERED_ON")])),
        ("legacy01".to_string(), data(&[("power_state", "POWERED_ON")])),
    ];

    let summary = importer.run(objects.clone()).await.unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.skipped_for(SkipReason::BlankName), 1);
    assert_eq!(summary.skipped_for(SkipReason::ForeignAccount), 1);

    let web = store.get_host("web01").await.unwrap().unwrap();
    assert_eq!(web.account.as_deref(), Some("lab"));
    let legacy = store.get_host("legacy01").await.unwrap().unwrap();
    assert_eq!(legacy.account.as_deref(), Some("lab"));
    let shared = store.get_host("shared01").await.unwrap().unwrap();
    assert_eq!(shared.account.as_deref(), Some("prod"));
    assert!(shared.labels.is_empty());

    let summary = importer.run(objects).await.unwrap();
    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.unchanged, 2);

    let summary = importer
        .run(vec![("web01".to_string(), data(&[("power_state", "POWERED_OFF")]))])
        .await
        .unwrap();
    assert_eq!(summary.updated, 1);
}

const LAB: &str = r#"{
    "endpoint": "vc.lab",
    "vms": [
        { "vm": "vm-1", "name": "web01", "config": { "num_cpu": 2, "template": false } },
        { "vm": "vm-2", "name": "db01", "config": { "num_cpu": 8, "template": false } },
        { "vm": "vm-3", "name": "app01", "config": { "num_cpu": 4, "template": false } }
    ]
}"#;

type Events = Arc<Mutex<Vec<String>>>;

fn log(events: &Events, event: String) {
    events.lock().unwrap().push(event);
}

/// Logs every detail fetch of the wrapped source.
struct TracedSource {
    inner: SnapshotSource,
    events: Events,
}

#[async_trait]
impl SourceApi for TracedSource {
    async fn list_objects(&self) -> Result<Vec<VmSummary>, SourceError> {
        self.inner.list_objects().await
    }

    async fn object_details(&self, vm: &ManagedRef) -> Result<VmDetails, SourceError> {
        log(&self.events, format!("details:{}", vm.id));
        self.inner.object_details(vm).await
    }

    async fn parent_of(&self, entity: &ManagedRef) -> Result<Option<ParentEntity>, SourceError> {
        self.inner.parent_of(entity).await
    }

    async fn custom_field_catalog(&self) -> Result<Vec<CustomFieldDef>, SourceError> {
        self.inner.custom_field_catalog().await
    }

    async fn list_tags(&self) -> Result<Vec<String>, SourceError> {
        self.inner.list_tags().await
    }

    async fn tag_attachments(&self, tag_id: &str) -> Result<Vec<ManagedRef>, SourceError> {
        self.inner.tag_attachments(tag_id).await
    }

    async fn tag_info(&self, tag_id: &str) -> Result<TagInfo, SourceError> {
        self.inner.tag_info(tag_id).await
    }

    async fn set_custom_value(
        &self,
        vm: &ManagedRef,
        name: &str,
        value: &str,
    ) -> Result<(), SourceError> {
        self.inner.set_custom_value(vm, name, value).await
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }

    async fn check_connection(&self) -> Result<(), SourceError> {
        self.inner.check_connection().await
    }
}

/// Logs every submission before passing it to the wrapped store.
struct TracedSink {
    inner: Arc<MemoryHostStore>,
    events: Events,
}

#[async_trait]
impl InventorySink for TracedSink {
    async fn bulk_submit(
        &self,
        config: &InventoryConfig,
        pairs: Vec<(String, AttributeMap)>,
    ) -> Result<InventoryReport, StoreError> {
        log(&self.events, format!("bulk:{}", pairs.len()));
        self.inner.bulk_submit(config, pairs).await
    }

    async fn submit_one(
        &self,
        record: &mut HostRecord,
        data: AttributeMap,
        key: &str,
        config: &InventoryConfig,
    ) -> Result<bool, StoreError> {
        log(&self.events, format!("submit:{}", record.hostname));
        self.inner.submit_one(record, data, key, config).await
    }
}

async fn collect_and_ingest(mode: IngestMode) -> Vec<String> {
    let events = Events::default();
    let source = TracedSource {
        inner: SnapshotSource::from_json(LAB).unwrap(),
        events: events.clone(),
    };
    let collector = Collector::new(
        Arc::new(source),
        CollectorSettings::default(),
        ErrorPolicy::default(),
    );
    let store = seeded_store().await;
    let sink = TracedSink {
        inner: store.clone(),
        events: events.clone(),
    };
    let ingestor = Ingestor::new(store.clone(), Arc::new(sink));
    let inventory = config();

    let filter = CollectFilter::all();
    let mut collection = collector.start(&filter).await.unwrap();
    assert_eq!(collection.listed(), 3);
    let mut session = ingestor.session(&inventory, mode, collection.listed());
    while let Some(object) = collection.next().await.unwrap() {
        session.push(object.name, object.attributes).await.unwrap();
    }
    let summary = session.finish().await.unwrap();
    assert_eq!(summary.updated, 3);
    assert_eq!(collection.into_summary().total(), 0);

    let app = store.get_host("app01").await.unwrap().unwrap();
    assert_eq!(
        app.all_attributes().get_text("vmware_vcenter__name").as_deref(),
        Some("app01")
    );

    let events = events.lock().unwrap().clone();
    events
}

#[tokio::test]
async fn test_individual_ingestion_submits_while_collecting() {
    let events = collect_and_ingest(IngestMode::Individual).await;
    assert_eq!(
        events,
        [
            "details:vm-1",
            "submit:web01",
            "details:vm-2",
            "submit:db01",
            "details:vm-3",
            "submit:app01",
        ]
    );

    let first_submit = events.iter().position(|e| e.starts_with("submit:")).unwrap();
    let last_details = events.iter().rposition(|e| e.starts_with("details:")).unwrap();
    assert!(first_submit < last_details);
}

#[tokio::test]
async fn test_bulk_ingestion_submits_once_after_collecting() {
    let events = collect_and_ingest(IngestMode::Bulk).await;
    assert_eq!(
        events,
        ["details:vm-1", "details:vm-2", "details:vm-3", "bulk:3"]
    );
}
