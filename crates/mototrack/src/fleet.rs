//! Fleet service: the app's view of the motorcycle collection.
//!
//! [`FleetService`] reads through the query caches and writes straight to the
//! backend. Every successful write invalidates the affected queries and
//! records a [`FleetEvent`] in the outbox; callers drain the outbox and pass
//! the events on (usually to the notification dispatcher).

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tracing::{info, warn};

use crate::cache::{QueryCache, QueryKey, QueryStatus};
use crate::client::FleetApi;
use crate::error::Result;
use crate::i18n::Language;
use crate::motorcycle::{
    Branch, Catalog, FleetStats, Model, Motorcycle, MotorcycleId, MotorcycleStatus, NewMotorcycle,
};
use crate::outbox::{FleetEvent, Outbox};
use crate::validation::{self, ValidationErrors};
use crate::wire::{motorcycle_from_dto, motorcycle_to_dto, new_motorcycle_to_dto};

/// Reads and writes the fleet.
pub struct FleetService {
    api: Arc<dyn FleetApi>,
    catalog: Arc<Catalog>,
    language: Language,
    list: QueryCache<Vec<Motorcycle>>,
    details: QueryCache<Motorcycle>,
    branches: QueryCache<Vec<Branch>>,
    outbox: Outbox,
}

impl std::fmt::Debug for FleetService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetService")
            .field("language", &self.language)
            .field("stale_time", &self.list.stale_time())
            .field("pending_events", &self.outbox.len())
            .finish_non_exhaustive()
    }
}

impl FleetService {
    /// Create a service over `api`, naming foreign keys from `catalog`.
    #[must_use]
    pub fn new(
        api: Arc<dyn FleetApi>,
        catalog: Arc<Catalog>,
        language: Language,
        stale_time: Duration,
    ) -> Self {
        Self {
            api,
            catalog,
            language,
            list: QueryCache::new(stale_time),
            details: QueryCache::new(stale_time),
            branches: QueryCache::new(stale_time),
            outbox: Outbox::new(),
        }
    }

    /// Language used for validation messages.
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    fn fetch_list(&self) -> BoxFuture<'static, Result<Vec<Motorcycle>>> {
        let api = Arc::clone(&self.api);
        let catalog = Arc::clone(&self.catalog);
        async move {
            let dtos = api.list_motorcycles().await?;
            let motorcycles = dtos
                .into_iter()
                .filter_map(|dto| match motorcycle_from_dto(dto, &catalog) {
                    Ok(motorcycle) => Some(motorcycle),
                    Err(err) => {
                        warn!(error = %err, "skipping motorcycle record");
                        None
                    }
                })
                .collect();
            Ok(motorcycles)
        }
        .boxed()
    }

    fn fetch_detail(&self, id: MotorcycleId) -> BoxFuture<'static, Result<Motorcycle>> {
        let api = Arc::clone(&self.api);
        let catalog = Arc::clone(&self.catalog);
        async move { motorcycle_from_dto(api.get_motorcycle(id).await?, &catalog) }.boxed()
    }

    fn fetch_branches(&self) -> BoxFuture<'static, Result<Vec<Branch>>> {
        let api = Arc::clone(&self.api);
        async move {
            api.list_branches()
                .await?
                .into_iter()
                .map(Branch::try_from)
                .collect()
        }
        .boxed()
    }

    // === Reads ===

    /// Every motorcycle, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Returns the backend error if a fetch was needed and failed.
    pub async fn motorcycles(&self) -> Result<Vec<Motorcycle>> {
        self.list
            .get_or_fetch(QueryKey::MotorcycleList, || self.fetch_list())
            .await
    }

    /// One motorcycle, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Returns the backend error, e.g. HTTP 404 for an unknown id.
    pub async fn motorcycle(&self, id: MotorcycleId) -> Result<Motorcycle> {
        self.details
            .get_or_fetch(QueryKey::MotorcycleDetail(id), || self.fetch_detail(id))
            .await
    }

    /// Motorcycles whose model, plate or branch contains `query`
    /// (case-insensitive), optionally restricted to one status.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the list had to be fetched and failed.
    pub async fn search(
        &self,
        query: &str,
        status: Option<MotorcycleStatus>,
    ) -> Result<Vec<Motorcycle>> {
        Ok(self
            .motorcycles()
            .await?
            .into_iter()
            .filter(|m| m.matches(query))
            .filter(|m| status.map_or(true, |status| m.status == status))
            .collect())
    }

    /// Counts per status over the current list.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the list had to be fetched and failed.
    pub async fn stats(&self) -> Result<FleetStats> {
        Ok(FleetStats::from_motorcycles(&self.motorcycles().await?))
    }

    /// Models from the local catalog.
    #[must_use]
    pub fn models(&self) -> &[Model] {
        self.catalog.models()
    }

    /// Branches from the local catalog.
    #[must_use]
    pub fn branches(&self) -> &[Branch] {
        self.catalog.branches()
    }

    /// Loading state of the motorcycle list.
    #[must_use]
    pub fn list_status(&self) -> QueryStatus {
        self.list.status(QueryKey::MotorcycleList)
    }

    /// Reload the motorcycle list regardless of freshness.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn refetch(&self) -> Result<Vec<Motorcycle>> {
        self.list
            .refetch(QueryKey::MotorcycleList, || self.fetch_list())
            .await
    }

    /// Last known version of a motorcycle, without fetching.
    ///
    /// The detail and list caches are both consulted; the more recently
    /// fetched copy wins.
    #[must_use]
    pub fn cached(&self, id: MotorcycleId) -> Option<Motorcycle> {
        let detail_key = QueryKey::MotorcycleDetail(id);
        let from_detail = self
            .details
            .peek(detail_key)
            .map(|m| (self.details.status(detail_key).updated_at, m));
        let from_list = self
            .list
            .peek(QueryKey::MotorcycleList)
            .and_then(|list| list.into_iter().find(|m| m.id == id))
            .map(|m| (self.list.status(QueryKey::MotorcycleList).updated_at, m));

        match (from_detail, from_list) {
            (Some((detail_at, detail)), Some((list_at, list))) => {
                Some(if list_at > detail_at { list } else { detail })
            }
            (Some((_, m)), None) | (None, Some((_, m))) => Some(m),
            (None, None) => None,
        }
    }

    // === Writes ===

    /// Register a motorcycle.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] before any request if the draft is
    /// invalid, otherwise the backend error.
    pub async fn add(&self, draft: &NewMotorcycle) -> Result<Motorcycle> {
        validation::validate_new_motorcycle(draft, self.language)?;

        let result = self.api.create_motorcycle(&new_motorcycle_to_dto(draft)).await;
        if write_committed(&result) {
            self.list.invalidate(QueryKey::MotorcycleList);
        }
        let mut created = motorcycle_from_dto(result?, &self.catalog)?;
        created.notes.clone_from(&draft.notes);
        created.year = draft.year;
        created.color.clone_from(&draft.color);

        info!(id = created.id, plate = %created.plate, "motorcycle registered");
        self.outbox.push(FleetEvent::Created {
            motorcycle: created.clone(),
        });
        Ok(created)
    }

    /// Save an edited motorcycle.
    ///
    /// The previous version is taken from the caches as they were before the
    /// save; nothing is fetched to find it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] before any request if the record is
    /// invalid, otherwise the backend error.
    pub async fn update(&self, motorcycle: &Motorcycle) -> Result<Motorcycle> {
        validation::validate_motorcycle(motorcycle, self.language)?;
        self.save(motorcycle).await
    }

    /// Change only the status of a motorcycle.
    ///
    /// The record is saved as loaded, without form validation.
    ///
    /// # Errors
    ///
    /// Returns the backend error from loading or saving the record.
    pub async fn set_status(&self, id: MotorcycleId, status: MotorcycleStatus) -> Result<Motorcycle> {
        let mut motorcycle = self.motorcycle(id).await?;
        motorcycle.status = status;
        self.save(&motorcycle).await
    }

    async fn save(&self, motorcycle: &Motorcycle) -> Result<Motorcycle> {
        let previous = self.cached(motorcycle.id);
        let result = self
            .api
            .update_motorcycle(motorcycle.id, &motorcycle_to_dto(motorcycle))
            .await;
        if write_committed(&result) {
            self.list.invalidate(QueryKey::MotorcycleList);
            self.details.invalidate(QueryKey::MotorcycleDetail(motorcycle.id));
        }

        let mut current = motorcycle_from_dto(result?, &self.catalog)?;
        current.position = motorcycle.position.clone();
        current.notes.clone_from(&motorcycle.notes);
        current.year = motorcycle.year;
        current.color.clone_from(&motorcycle.color);
        current.created_at = motorcycle.created_at;

        info!(id = current.id, status = %current.status, "motorcycle updated");
        self.outbox.push(FleetEvent::Updated {
            previous,
            current: current.clone(),
        });
        Ok(current)
    }

    /// Remove a motorcycle.
    ///
    /// On failure nothing local changes: caches keep their entries and no
    /// event is recorded.
    ///
    /// # Errors
    ///
    /// Returns the backend error, e.g. HTTP 404 for an unknown id.
    pub async fn delete(&self, id: MotorcycleId) -> Result<()> {
        self.api.delete_motorcycle(id).await?;

        self.list.invalidate(QueryKey::MotorcycleList);
        self.details.invalidate(QueryKey::MotorcycleDetail(id));
        info!(id, "motorcycle deleted");
        self.outbox.push(FleetEvent::Deleted { id });
        Ok(())
    }

    /// Hand over the events recorded since the last drain.
    #[must_use]
    pub fn drain_events(&self) -> Vec<FleetEvent> {
        self.outbox.drain()
    }

    // === Branches ===

    /// Branches as the backend knows them.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn remote_branches(&self) -> Result<Vec<Branch>> {
        self.branches
            .get_or_fetch(QueryKey::BranchList, || self.fetch_branches())
            .await
    }

    /// One branch from the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn branch(&self, id: i64) -> Result<Branch> {
        Branch::try_from(self.api.get_branch(id).await?)
    }

    fn check_branch_name(&self, name: &str) -> Result<()> {
        let mut errors = ValidationErrors::new();
        if name.trim().is_empty() {
            errors.add("name", self.language.messages().field_required);
        }
        errors.into_result()
    }

    /// Create a branch.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] for a blank name, otherwise the
    /// backend error.
    pub async fn add_branch(&self, name: &str) -> Result<Branch> {
        self.check_branch_name(name)?;
        let branch = Branch::try_from(self.api.create_branch(name.trim()).await?)?;
        self.branches.invalidate(QueryKey::BranchList);
        Ok(branch)
    }

    /// Rename a branch.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] for a blank name, otherwise the
    /// backend error.
    pub async fn rename_branch(&self, id: i64, name: &str) -> Result<Branch> {
        self.check_branch_name(name)?;
        let branch = Branch::try_from(self.api.update_branch(id, name.trim()).await?)?;
        self.branches.invalidate(QueryKey::BranchList);
        Ok(branch)
    }

    /// Delete a branch.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn delete_branch(&self, id: i64) -> Result<()> {
        self.api.delete_branch(id).await?;
        self.branches.invalidate(QueryKey::BranchList);
        Ok(())
    }
}

/// Whether a write reached the backend and was accepted.
///
/// A 2xx answer whose body cannot be decoded still changed the server.
fn write_committed<T>(result: &Result<T>) -> bool {
    match result {
        Ok(_) => true,
        Err(err) => err.is_decode(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DEFAULT_STALE_TIME;
    use crate::testing::FakeFleetApi;
    use crate::Error;

    fn service_with(api: Arc<FakeFleetApi>) -> FleetService {
        FleetService::new(api, Arc::new(Catalog::default()), Language::Pt, DEFAULT_STALE_TIME)
    }

    fn seeded() -> Arc<FakeFleetApi> {
        let api = FakeFleetApi::new();
        api.seed(1, 1, 1, "ABC1234", "DISPONIVEL", 1200);
        api.seed(2, 2, 3, "XYZ9A87", "EM_USO", 4600);
        Arc::new(api)
    }

    fn draft() -> NewMotorcycle {
        NewMotorcycle {
            model_id: 3,
            branch_id: 2,
            plate: "BRA2E19".to_string(),
            mileage: 4700,
            notes: Some("baú novo".to_string()),
            ..NewMotorcycle::default()
        }
    }

    #[tokio::test]
    async fn test_list_is_enriched_from_catalog() {
        let service = service_with(seeded());
        let motorcycles = service.motorcycles().await.unwrap();
        assert_eq!(motorcycles.len(), 2);
        assert_eq!(motorcycles[1].model_name, "Yamaha Factor 150");
        assert_eq!(motorcycles[1].branch_name, "Filial Sul");
        assert_eq!(motorcycles[1].status, MotorcycleStatus::InUse);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_list_reads_coalesce() {
        let api = Arc::new(FakeFleetApi::with_list_delay(Duration::from_millis(200)));
        api.seed(1, 1, 1, "ABC1234", "DISPONIVEL", 0);
        let service = service_with(Arc::clone(&api));

        let (a, b) = tokio::join!(service.motorcycles(), service.motorcycles());
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(FakeFleetApi::calls(&api.list_calls), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        service.motorcycles().await.unwrap();
        assert_eq!(FakeFleetApi::calls(&api.list_calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_refetched_after_stale_time() {
        let api = seeded();
        let service = service_with(Arc::clone(&api));
        service.motorcycles().await.unwrap();

        tokio::time::advance(DEFAULT_STALE_TIME + Duration::from_secs(1)).await;
        service.motorcycles().await.unwrap();
        assert_eq!(FakeFleetApi::calls(&api.list_calls), 2);
    }

    #[tokio::test]
    async fn test_add_invalidates_list_and_records_event() {
        let api = seeded();
        let service = service_with(Arc::clone(&api));
        service.motorcycles().await.unwrap();

        let created = service.add(&draft()).await.unwrap();
        assert_eq!(created.model_name, "Honda Biz 125");
        assert_eq!(created.notes.as_deref(), Some("baú novo"));
        assert_eq!(api.stored(created.id).unwrap().placa, "BRA2E19");

        let motorcycles = service.motorcycles().await.unwrap();
        assert_eq!(motorcycles.len(), 3);
        assert_eq!(FakeFleetApi::calls(&api.list_calls), 2);

        let events = service.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], FleetEvent::Created { motorcycle } if motorcycle.id == created.id));
        assert!(service.drain_events().is_empty());
    }

    #[tokio::test]
    async fn test_add_invalid_draft_never_reaches_backend() {
        let api = seeded();
        let service = service_with(Arc::clone(&api));
        let mut bad = draft();
        bad.plate = "??".to_string();

        let err = service.add(&bad).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(FakeFleetApi::calls(&api.create_calls), 0);
        assert!(service.drain_events().is_empty());
    }

    #[tokio::test]
    async fn test_update_records_previous_from_cache() {
        let api = seeded();
        let service = service_with(Arc::clone(&api));
        let mut moto = service.motorcycles().await.unwrap().remove(0);
        let gets_before = FakeFleetApi::calls(&api.get_calls);

        moto.status = MotorcycleStatus::Maintenance;
        moto.mileage = 1300;
        let saved = service.update(&moto).await.unwrap();
        assert_eq!(saved.status, MotorcycleStatus::Maintenance);
        assert_eq!(FakeFleetApi::calls(&api.get_calls), gets_before);
        assert_eq!(api.stored(1).unwrap().status, "MANUTENCAO");

        match service.drain_events().as_slice() {
            [FleetEvent::Updated { previous: Some(previous), current }] => {
                assert_eq!(previous.status, MotorcycleStatus::Available);
                assert_eq!(current.status, MotorcycleStatus::Maintenance);
            }
            other => panic!("unexpected events: {other:?}"),
        }

        let reloaded = service.motorcycles().await.unwrap();
        assert_eq!(reloaded[0].status, MotorcycleStatus::Maintenance);
        assert_eq!(FakeFleetApi::calls(&api.list_calls), 2);
    }

    #[tokio::test]
    async fn test_update_without_cache_has_no_previous() {
        let api = seeded();
        let service = service_with(Arc::clone(&api));
        let moto = crate::motorcycle::sample_motorcycle(2, MotorcycleStatus::Reserved, 4600);

        service.update(&moto).await.unwrap();
        let events = service.drain_events();
        assert!(matches!(&events[0], FleetEvent::Updated { previous: None, .. }));
    }

    #[tokio::test]
    async fn test_update_keeps_local_only_fields() {
        let service = service_with(seeded());
        let mut moto = service.motorcycle(1).await.unwrap();
        moto.color = Some("Vermelha".to_string());
        moto.position.row = "C".to_string();

        let saved = service.update(&moto).await.unwrap();
        assert_eq!(saved.color.as_deref(), Some("Vermelha"));
        assert_eq!(saved.position.row, "C");
    }

    #[tokio::test]
    async fn test_set_status() {
        let api = seeded();
        let service = service_with(Arc::clone(&api));

        let saved = service.set_status(2, MotorcycleStatus::Available).await.unwrap();
        assert_eq!(saved.status, MotorcycleStatus::Available);
        assert_eq!(api.stored(2).unwrap().status, "DISPONIVEL");

        match service.drain_events().as_slice() {
            [FleetEvent::Updated { previous: Some(previous), .. }] => {
                assert_eq!(previous.status, MotorcycleStatus::InUse);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_set_status_on_record_the_form_would_reject() {
        let api = FakeFleetApi::new();
        api.seed(5, 1, 1, "MOTO01", "DISPONIVEL", 100);
        let api = Arc::new(api);
        let service = service_with(Arc::clone(&api));

        let saved = service
            .set_status(5, MotorcycleStatus::Maintenance)
            .await
            .unwrap();
        assert_eq!(saved.status, MotorcycleStatus::Maintenance);
        assert_eq!(saved.plate, "MOTO01");
        assert_eq!(api.stored(5).unwrap().status, "MANUTENCAO");
        assert_eq!(FakeFleetApi::calls(&api.update_calls), 1);
        assert_eq!(service.drain_events().len(), 1);

        let err = service.update(&saved).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(FakeFleetApi::calls(&api.update_calls), 1);
    }

    #[tokio::test]
    async fn test_delete_nonexistent_leaves_cache_untouched() {
        let api = seeded();
        let service = service_with(Arc::clone(&api));
        let before = service.motorcycles().await.unwrap();

        let err = service.delete(404).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(service.drain_events().is_empty());
        assert!(!service.list_status().is_stale);
        assert_eq!(service.motorcycles().await.unwrap(), before);
        assert_eq!(FakeFleetApi::calls(&api.list_calls), 1);
    }

    #[tokio::test]
    async fn test_delete_invalidates_and_records_event() {
        let api = seeded();
        let service = service_with(Arc::clone(&api));
        service.motorcycles().await.unwrap();
        service.motorcycle(1).await.unwrap();

        service.delete(1).await.unwrap();
        assert_eq!(service.drain_events(), vec![FleetEvent::Deleted { id: 1 }]);
        assert_eq!(service.motorcycles().await.unwrap().len(), 1);

        let err = service.motorcycle(1).await.unwrap_err();
        assert!(matches!(err, Error::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_search_and_stats() {
        let service = service_with(seeded());

        let by_model = service.search("yamaha", None).await.unwrap();
        assert_eq!(by_model.len(), 1);
        assert_eq!(by_model[0].id, 2);

        let by_branch = service.search("centro", Some(MotorcycleStatus::Available)).await.unwrap();
        assert_eq!(by_branch.len(), 1);
        assert!(service
            .search("centro", Some(MotorcycleStatus::Reserved))
            .await
            .unwrap()
            .is_empty());

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.available, 1);
        assert_eq!(stats.in_use, 1);
    }

    #[tokio::test]
    async fn test_refetch_always_calls_backend() {
        let api = seeded();
        let service = service_with(Arc::clone(&api));
        service.motorcycles().await.unwrap();
        service.refetch().await.unwrap();
        assert_eq!(FakeFleetApi::calls(&api.list_calls), 2);
    }

    #[tokio::test]
    async fn test_catalog_lookups() {
        let service = service_with(seeded());
        assert_eq!(service.models().len(), 3);
        assert_eq!(service.branches()[0].name, "Filial Centro");
    }

    #[tokio::test]
    async fn test_branch_crud() {
        let service = service_with(seeded());

        let created = service.add_branch("  Filial Leste ").await.unwrap();
        assert_eq!(created.name, "Filial Leste");
        assert_eq!(service.remote_branches().await.unwrap().len(), 1);

        let renamed = service.rename_branch(created.id, "Filial Oeste").await.unwrap();
        assert_eq!(renamed.name, "Filial Oeste");
        assert_eq!(service.branch(created.id).await.unwrap().name, "Filial Oeste");
        assert_eq!(service.remote_branches().await.unwrap()[0].name, "Filial Oeste");

        service.delete_branch(created.id).await.unwrap();
        assert!(service.remote_branches().await.unwrap().is_empty());
        assert!(service.delete_branch(created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_blank_branch_name_rejected() {
        let service = service_with(seeded());
        assert!(service.add_branch("   ").await.unwrap_err().is_validation());
    }
}
