//! Attribute collection.
//!
//! [`Collector`] turns the nested source data of every VM into one flat
//! [`AttributeMap`]. Lookups that would otherwise repeat per object are done once per
//! [`collect`](AttributeCollector::collect) call or [`CollectionRun`]:
//!
//! - the custom field catalog is fetched once,
//! - tags are indexed once (one attachment listing per tag, one info call per
//!   attached tag),
//! - parent lookups are cached, so VMs sharing a folder resolve it once.
//!
//! Sections that cannot be read are left out of the map. Only a connectivity failure
//! while fetching an object's details counts as a per-object error.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use vmsync_core::{
    AttributeMap, AttributeValue, ErrorPolicy, ObjectOutcome, RunSummary, SkipReason, SyncError,
};

use crate::error::SourceError;
use crate::model::{ManagedRef, ParentEntity, TagInfo, VmDetails, VmSummary};
use crate::source::DynSourceApi;

pub const FOLDER_DELIMITER: &str = " > ";

/// Collection policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorSettings {
    /// Collect templates as well (default: false).
    pub include_templates: bool,
    /// Attach tag names and descriptions (default: false).
    pub collect_tags: bool,
    /// Maximum number of containers walked for `folder_hierarchy` (default: 9).
    pub max_folder_depth: usize,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            include_templates: false,
            collect_tags: false,
            max_folder_depth: 9,
        }
    }
}

/// Restricts one collection run.
#[derive(Debug, Clone, Default)]
pub struct CollectFilter {
    /// Overrides [`CollectorSettings::include_templates`].
    pub include_templates: Option<bool>,
    /// Only collect objects with these names.
    pub names: Option<BTreeSet<String>>,
}

impl CollectFilter {
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_templates(mut self, include: bool) -> Self {
        self.include_templates = Some(include);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectedObject {
    pub identity: ManagedRef,
    pub name: String,
    pub attributes: AttributeMap,
}

/// Result of one collection run. `summary` only counts skipped and failed objects.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub objects: Vec<CollectedObject>,
    pub summary: RunSummary,
}

impl Collection {
    /// Indexes the collected objects by name. A later duplicate name wins.
    pub fn into_index(self) -> HashMap<String, CollectedObject> {
        self.objects
            .into_iter()
            .map(|object| (object.name.clone(), object))
            .collect()
    }
}

/// Produces one normalized attribute map per source object.
#[async_trait]
pub trait AttributeCollector: Send + Sync {
    async fn collect(&self, filter: &CollectFilter) -> Result<Collection, SyncError>;
}

pub type DynAttributeCollector = Arc<dyn AttributeCollector>;

pub type TagIndex = HashMap<String, Vec<TagInfo>>;

/// Lookups shared by every object of one run.
#[derive(Default)]
struct RunCache {
    fields: HashMap<i32, String>,
    tags: Option<TagIndex>,
    parents: HashMap<ManagedRef, Option<ParentEntity>>,
}

/// [`AttributeCollector`] over any [`SourceApi`](crate::SourceApi).
pub struct Collector {
    source: DynSourceApi,
    settings: CollectorSettings,
    policy: ErrorPolicy,
}

impl Collector {
    pub fn new(source: DynSourceApi, settings: CollectorSettings, policy: ErrorPolicy) -> Self {
        Self {
            source,
            settings,
            policy,
        }
    }

    /// Collects a single object with fresh lookups.
    pub async fn collect_one(&self, summary: &VmSummary) -> Result<AttributeMap, SyncError> {
        let mut run = RunCache {
            fields: self.field_catalog().await,
            ..RunCache::default()
        };
        let details = self.source.object_details(&summary.reference()).await?;
        Ok(self.build(summary, Some(&details), &mut run).await)
    }

    /// Maps VM ids to the tags attached to them.
    pub async fn tag_index(&self) -> Result<TagIndex, SourceError> {
        let mut index: TagIndex = HashMap::new();
        let tag_ids = self.source.list_tags().await?;

        for tag_id in &tag_ids {
            let attached = self.source.tag_attachments(tag_id).await?;
            let vms: Vec<&ManagedRef> = attached.iter().filter(|r| r.is_vm()).collect();
            if vms.is_empty() {
                continue;
            }
            let info = self.source.tag_info(tag_id).await?;
            for vm in vms {
                index.entry(vm.id.clone()).or_default().push(info.clone());
            }
        }

        tracing::debug!(
            endpoint = %self.source.endpoint(),
            tags = tag_ids.len(),
            tagged = index.len(),
            "indexed tags"
        );
        Ok(index)
    }

    async fn field_catalog(&self) -> HashMap<i32, String> {
        match self.source.custom_field_catalog().await {
            Ok(fields) => fields.into_iter().map(|f| (f.key, f.name)).collect(),
            Err(e) => {
                tracing::debug!(error = %e, "custom field catalog unavailable");
                HashMap::new()
            }
        }
    }

    async fn tags_for(&self, run: &mut RunCache, vm_id: &str) -> Vec<TagInfo> {
        if run.tags.is_none() {
            let index = match self.tag_index().await {
                Ok(index) => index,
                Err(e) => {
                    tracing::warn!(error = %e, "tag lookup failed, collecting without tags");
                    HashMap::new()
                }
            };
            run.tags = Some(index);
        }
        run.tags
            .as_ref()
            .and_then(|index| index.get(vm_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Walks the container chain upwards and joins the names root-first.
    async fn folder_hierarchy(&self, vm: &ManagedRef, run: &mut RunCache) -> Option<String> {
        let mut chain = VecDeque::new();
        let mut current = vm.clone();

        for _ in 0..self.settings.max_folder_depth {
            let cached = run.parents.get(&current).cloned();
            let parent = match cached {
                Some(cached) => cached,
                None => match self.source.parent_of(&current).await {
                    Ok(parent) => {
                        run.parents.insert(current.clone(), parent.clone());
                        parent
                    }
                    Err(e) => {
                        tracing::debug!(entity = %current, error = %e, "parent lookup failed");
                        break;
                    }
                },
            };

            let Some(parent) = parent else { break };
            if parent.name.trim().is_empty() {
                break;
            }
            chain.push_front(parent.name);
            current = parent.reference;
        }

        (!chain.is_empty()).then(|| Vec::from(chain).join(FOLDER_DELIMITER))
    }

    async fn build(
        &self,
        summary: &VmSummary,
        details: Option<&VmDetails>,
        run: &mut RunCache,
    ) -> AttributeMap {
        let reference = summary.reference();
        let mut attrs = AttributeMap::new();

        attrs.set("name", summary.name.trim());
        if let Some(path) = self.folder_hierarchy(&reference, run).await {
            attrs.set("folder_hierarchy", path);
        }

        let Some(details) = details else {
            summary_fallback(&mut attrs, summary);
            return attrs;
        };

        if self.settings.collect_tags && details.config.is_some() {
            let tags: Vec<AttributeValue> = self
                .tags_for(run, &summary.vm)
                .await
                .into_iter()
                .map(|tag| {
                    AttributeValue::record([("name", tag.name), ("description", tag.description)])
                })
                .collect();
            attrs.set("tags", tags);
        }

        if let Some(guest) = &details.guest {
            attrs.set_opt("ip_address", guest.ip_address.as_deref());
            attrs.set_opt("hostname", guest.host_name.as_deref());
            attrs.set_opt("full_name", guest.full_name.as_deref());
            attrs.set_opt("tools_status", guest.tools_status.as_deref());
        }

        if let Some(config) = &details.config {
            attrs.set_opt("cpu_count", config.num_cpu);
            attrs.set_opt("memory_mb", config.memory_mb);
            attrs.set_opt("guest_os", config.guest_full_name.as_deref());
            attrs.set_opt("uuid", config.uuid.as_deref());
            attrs.set_opt("guest_id", config.guest_id.as_deref());
            attrs.set_opt("annotation", config.annotation.as_deref());
            attrs.set_opt("is_template", config.template);
            attrs.set_opt("vm_path_name", config.vm_path_name.as_deref());
            attrs.set_opt("instance_uuid", config.instance_uuid.as_deref());
        }

        if let Some(runtime) = &details.runtime {
            attrs.set_opt("power_state", runtime.power_state.as_deref());
            attrs.set_opt("runtime_host", runtime.host.as_ref().map(ToString::to_string));
            attrs.set_opt("boot_time", runtime.boot_time.as_deref());
            attrs.set_opt("esxi_host_name", runtime.host_name.as_deref());
        }

        attrs.set("networks", named_records(&details.networks));
        attrs.set("datastores", named_records(&details.datastores));

        summary_fallback(&mut attrs, summary);

        // Custom fields go last and win over built-in names.
        for custom in &details.custom_values {
            let name = run
                .fields
                .get(&custom.key)
                .cloned()
                .unwrap_or_else(|| format!("custom_{}", custom.key));
            attrs.set(name, custom.value.as_str());
        }

        attrs
    }
}

fn named_records(names: &[String]) -> Vec<AttributeValue> {
    names
        .iter()
        .map(|name| AttributeValue::record([("name", name.as_str())]))
        .collect()
}

/// Fills power state, CPU count and memory from the listing row where the detail
/// sections did not provide them.
fn summary_fallback(attrs: &mut AttributeMap, summary: &VmSummary) {
    if !attrs.contains_key("power_state") {
        attrs.set_opt("power_state", summary.power_state.as_deref());
    }
    if !attrs.contains_key("cpu_count") {
        attrs.set_opt("cpu_count", summary.cpu_count);
    }
    if !attrs.contains_key("memory_mb") {
        attrs.set_opt("memory_mb", summary.memory_size_mib);
    }
}

/// A collection run that yields one object at a time.
///
/// Lookups are cached for the lifetime of the run, like [`Collector::collect`]. Skipped
/// and failed objects are counted in [`summary`](Self::summary).
pub struct CollectionRun<'a> {
    collector: &'a Collector,
    filter: &'a CollectFilter,
    include_templates: bool,
    vms: std::vec::IntoIter<VmSummary>,
    listed: usize,
    collected: usize,
    finished: bool,
    run: RunCache,
    summary: RunSummary,
}

impl Collector {
    /// Lists the source objects and starts a run over them.
    pub async fn start<'a>(
        &'a self,
        filter: &'a CollectFilter,
    ) -> Result<CollectionRun<'a>, SyncError> {
        let vms = self.source.list_objects().await?;
        let include_templates = filter
            .include_templates
            .unwrap_or(self.settings.include_templates);
        let run = RunCache {
            fields: self.field_catalog().await,
            ..RunCache::default()
        };
        Ok(CollectionRun {
            collector: self,
            filter,
            include_templates,
            listed: vms.len(),
            vms: vms.into_iter(),
            collected: 0,
            finished: false,
            run,
            summary: RunSummary::new(),
        })
    }
}

impl CollectionRun<'_> {
    /// Number of objects the source listed.
    pub fn listed(&self) -> usize {
        self.listed
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn into_summary(self) -> RunSummary {
        self.summary
    }

    /// Collects the next object, or `None` once every listed object was visited.
    pub async fn next(&mut self) -> Result<Option<CollectedObject>, SyncError> {
        let collector = self.collector;
        while let Some(summary) = self.vms.next() {
            let name = summary.name.trim();
            if name.is_empty() {
                tracing::warn!(vm = %summary.vm, "VM without name ignored");
                self.summary
                    .record(&summary.vm, &ObjectOutcome::Skipped(SkipReason::BlankName));
                continue;
            }
            if let Some(names) = &self.filter.names
                && !names.contains(name)
            {
                continue;
            }

            let details = match collector.source.object_details(&summary.reference()).await {
                Ok(details) => Some(details),
                Err(e) if e.is_connectivity() => {
                    let outcome = collector.policy.handle(name, e.into())?;
                    self.summary.record(name, &outcome);
                    continue;
                }
                Err(e) => {
                    tracing::debug!(object = %name, error = %e, "details unavailable");
                    None
                }
            };

            if !self.include_templates && details.as_ref().is_some_and(VmDetails::is_template) {
                tracing::debug!(object = %name, "skipping template");
                self.summary
                    .record(name, &ObjectOutcome::Skipped(SkipReason::Template));
                continue;
            }

            let attributes = collector
                .build(&summary, details.as_ref(), &mut self.run)
                .await;
            self.collected += 1;
            return Ok(Some(CollectedObject {
                identity: summary.reference(),
                name: name.to_string(),
                attributes,
            }));
        }

        if !self.finished {
            self.finished = true;
            tracing::info!(
                endpoint = %collector.source.endpoint(),
                listed = self.listed,
                collected = self.collected,
                skipped = self.summary.skipped_total(),
                failed = self.summary.failed,
                "collection finished"
            );
        }
        Ok(None)
    }
}

#[async_trait]
impl AttributeCollector for Collector {
    async fn collect(&self, filter: &CollectFilter) -> Result<Collection, SyncError> {
        let mut run = self.start(filter).await?;
        let mut objects = Vec::new();
        while let Some(object) = run.next().await? {
            objects.push(object);
        }
        Ok(Collection {
            objects,
            summary: run.into_summary(),
        })
    }
}
