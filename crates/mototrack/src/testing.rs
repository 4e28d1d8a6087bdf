//! In-memory fakes shared by unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::FleetApi;
use crate::error::{Error, Result};
use crate::motorcycle::MotorcycleId;
use crate::wire::{BranchDto, MotoDto};

/// Backend double keeping motorcycles and branches in maps.
#[derive(Default)]
pub(crate) struct FakeFleetApi {
    motos: Mutex<BTreeMap<i64, MotoDto>>,
    branches: Mutex<BTreeMap<i64, String>>,
    next_id: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub list_delay: Option<Duration>,
}

fn not_found(path: String) -> Error {
    Error::Http {
        method: reqwest::Method::GET,
        path,
        status: 404,
        message: Some("Registro não encontrado".to_string()),
    }
}

impl FakeFleetApi {
    pub fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(100),
            ..Self::default()
        }
    }

    pub fn with_list_delay(delay: Duration) -> Self {
        Self {
            list_delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn seed(&self, id: i64, model: i64, branch: i64, plate: &str, status: &str, km: u32) {
        self.motos.lock().insert(
            id,
            MotoDto {
                id: Some(id),
                id_modelo: model,
                id_filial: branch,
                placa: plate.to_string(),
                status: status.to_string(),
                km_rodado: km,
            },
        );
    }

    pub fn stored(&self, id: i64) -> Option<MotoDto> {
        self.motos.lock().get(&id).cloned()
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn allocate_id(&self) -> i64 {
        i64::try_from(self.next_id.fetch_add(1, Ordering::SeqCst)).unwrap_or(i64::MAX)
    }
}

#[async_trait]
impl FleetApi for FakeFleetApi {
    async fn list_motorcycles(&self) -> Result<Vec<MotoDto>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.motos.lock().values().cloned().collect())
    }

    async fn get_motorcycle(&self, id: MotorcycleId) -> Result<MotoDto> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.stored(id)
            .ok_or_else(|| not_found(format!("/api/motos/{id}")))
    }

    async fn create_motorcycle(&self, dto: &MotoDto) -> Result<MotoDto> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = dto.id.unwrap_or_else(|| self.allocate_id());
        let stored = MotoDto {
            id: Some(id),
            ..dto.clone()
        };
        self.motos.lock().insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_motorcycle(&self, id: MotorcycleId, dto: &MotoDto) -> Result<MotoDto> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut motos = self.motos.lock();
        let slot = motos
            .get_mut(&id)
            .ok_or_else(|| not_found(format!("/api/motos/{id}")))?;
        *slot = MotoDto {
            id: Some(id),
            ..dto.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_motorcycle(&self, id: MotorcycleId) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.motos
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("/api/motos/{id}")))
    }

    async fn list_branches(&self) -> Result<Vec<BranchDto>> {
        Ok(self
            .branches
            .lock()
            .iter()
            .map(|(id, name)| BranchDto {
                id_filial_departamento: Some(*id),
                nome_filial_departamento: name.clone(),
            })
            .collect())
    }

    async fn get_branch(&self, id: i64) -> Result<BranchDto> {
        self.branches
            .lock()
            .get(&id)
            .map(|name| BranchDto {
                id_filial_departamento: Some(id),
                nome_filial_departamento: name.clone(),
            })
            .ok_or_else(|| not_found(format!("/api/filiais/{id}")))
    }

    async fn create_branch(&self, name: &str) -> Result<BranchDto> {
        let id = self.allocate_id();
        self.branches.lock().insert(id, name.to_string());
        Ok(BranchDto {
            id_filial_departamento: Some(id),
            nome_filial_departamento: name.to_string(),
        })
    }

    async fn update_branch(&self, id: i64, name: &str) -> Result<BranchDto> {
        let mut branches = self.branches.lock();
        let slot = branches
            .get_mut(&id)
            .ok_or_else(|| not_found(format!("/api/filiais/{id}")))?;
        *slot = name.to_string();
        Ok(BranchDto {
            id_filial_departamento: Some(id),
            nome_filial_departamento: name.to_string(),
        })
    }

    async fn delete_branch(&self, id: i64) -> Result<()> {
        self.branches
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("/api/filiais/{id}")))
    }
}
