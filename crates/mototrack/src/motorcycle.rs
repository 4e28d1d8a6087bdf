//! Core fleet types for mototrack.
//!
//! This module defines the in-app shape of a motorcycle and the lookup
//! entities (models and branches) used to give foreign keys a name.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend identifier of a motorcycle.
pub type MotorcycleId = i64;

/// Operational status of a motorcycle.
///
/// Serialized with the Portuguese labels used across the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MotorcycleStatus {
    /// Ready to be rented.
    #[default]
    #[serde(rename = "Disponível")]
    Available,
    /// Currently out with a rider.
    #[serde(rename = "Em Uso")]
    InUse,
    /// In the workshop.
    #[serde(rename = "Manutenção")]
    Maintenance,
    /// Held for an upcoming rental.
    #[serde(rename = "Reservada")]
    Reserved,
}

impl MotorcycleStatus {
    /// Every status, in display order.
    pub const ALL: [Self; 4] = [Self::Available, Self::InUse, Self::Maintenance, Self::Reserved];

    /// Label shown to users.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Available => "Disponível",
            Self::InUse => "Em Uso",
            Self::Maintenance => "Manutenção",
            Self::Reserved => "Reservada",
        }
    }

    /// Emoji used in status-change notification titles.
    #[must_use]
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Available => "✅",
            Self::InUse => "🚦",
            Self::Maintenance => "🔧",
            Self::Reserved => "📅",
        }
    }
}

impl fmt::Display for MotorcycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MotorcycleStatus {
    type Err = String;

    /// Accepts the display label, the wire code or a short English name.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "disponível" | "disponivel" | "available" => Ok(Self::Available),
            "em uso" | "in use" => Ok(Self::InUse),
            "manutenção" | "manutencao" | "maintenance" => Ok(Self::Maintenance),
            "reservada" | "reserved" => Ok(Self::Reserved),
            _ => Err(format!("unknown motorcycle status: {s}")),
        }
    }
}

/// Parking spot in the yard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Row letter.
    pub row: String,
    /// Spot number within the row.
    pub spot: String,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            row: "A".to_string(),
            spot: "1".to_string(),
        }
    }
}

/// A motorcycle as the app sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Motorcycle {
    /// Backend identifier.
    pub id: MotorcycleId,
    /// Foreign key to the model catalog.
    pub model_id: i64,
    /// Resolved model name.
    pub model_name: String,
    /// Foreign key to the branch catalog.
    pub branch_id: i64,
    /// Resolved branch name.
    pub branch_name: String,
    /// License plate.
    pub plate: String,
    /// Current status.
    pub status: MotorcycleStatus,
    /// Odometer reading in km.
    pub mileage: u32,
    /// Yard position.
    pub position: Position,
    /// Free-form notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Model year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    /// Paint color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// When this record was loaded into the app.
    pub created_at: DateTime<Utc>,
}

impl Motorcycle {
    /// Case-insensitive match of `query` against model, plate and branch.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.model_name.to_lowercase().contains(&query)
            || self.plate.to_lowercase().contains(&query)
            || self.branch_name.to_lowercase().contains(&query)
    }
}

/// Input for registering a motorcycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMotorcycle {
    /// Identifier chosen by the operator; the backend assigns one when absent.
    pub id: Option<MotorcycleId>,
    /// Model foreign key.
    pub model_id: i64,
    /// Branch foreign key.
    pub branch_id: i64,
    /// License plate.
    pub plate: String,
    /// Initial status.
    pub status: MotorcycleStatus,
    /// Odometer reading in km.
    pub mileage: u32,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Model year.
    pub year: Option<u16>,
    /// Paint color.
    pub color: Option<String>,
}

/// Counts per status over a list of motorcycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetStats {
    /// Total motorcycles.
    pub total: usize,
    /// Motorcycles available.
    pub available: usize,
    /// Motorcycles in use.
    pub in_use: usize,
    /// Motorcycles in maintenance.
    pub maintenance: usize,
    /// Motorcycles reserved.
    pub reserved: usize,
}

impl FleetStats {
    /// Tally the given motorcycles.
    #[must_use]
    pub fn from_motorcycles(motorcycles: &[Motorcycle]) -> Self {
        motorcycles
            .iter()
            .fold(Self::default(), |mut stats, motorcycle| {
                stats.total += 1;
                match motorcycle.status {
                    MotorcycleStatus::Available => stats.available += 1,
                    MotorcycleStatus::InUse => stats.in_use += 1,
                    MotorcycleStatus::Maintenance => stats.maintenance += 1,
                    MotorcycleStatus::Reserved => stats.reserved += 1,
                }
                stats
            })
    }
}

/// A motorcycle model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Identifier.
    pub id: i64,
    /// Commercial name.
    pub name: String,
}

/// A branch (yard) of the rental company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Identifier.
    pub id: i64,
    /// Branch name.
    pub name: String,
}

/// Name used when a model id is not in the catalog.
pub const UNKNOWN_MODEL: &str = "Modelo Desconhecido";

/// Name used when a branch id is not in the catalog.
pub const UNKNOWN_BRANCH: &str = "Filial Desconhecida";

/// Local lookup tables for models and branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    models: Vec<Model>,
    branches: Vec<Branch>,
}

impl Default for Catalog {
    fn default() -> Self {
        let model = |id, name: &str| Model {
            id,
            name: name.to_string(),
        };
        let branch = |id, name: &str| Branch {
            id,
            name: name.to_string(),
        };
        Self {
            models: vec![
                model(1, "Honda CG 160"),
                model(2, "Yamaha Factor 150"),
                model(3, "Honda Biz 125"),
            ],
            branches: vec![
                branch(1, "Filial Centro"),
                branch(2, "Filial Norte"),
                branch(3, "Filial Sul"),
            ],
        }
    }
}

impl Catalog {
    /// Build a catalog from explicit tables.
    #[must_use]
    pub fn new(models: Vec<Model>, branches: Vec<Branch>) -> Self {
        Self { models, branches }
    }

    /// All known models.
    #[must_use]
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// All known branches.
    #[must_use]
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Name of the model with the given id, or [`UNKNOWN_MODEL`].
    #[must_use]
    pub fn model_name(&self, id: i64) -> &str {
        self.models
            .iter()
            .find(|m| m.id == id)
            .map_or(UNKNOWN_MODEL, |m| m.name.as_str())
    }

    /// Name of the branch with the given id, or [`UNKNOWN_BRANCH`].
    #[must_use]
    pub fn branch_name(&self, id: i64) -> &str {
        self.branches
            .iter()
            .find(|b| b.id == id)
            .map_or(UNKNOWN_BRANCH, |b| b.name.as_str())
    }
}

#[cfg(test)]
pub(crate) fn sample_motorcycle(id: MotorcycleId, status: MotorcycleStatus, mileage: u32) -> Motorcycle {
    Motorcycle {
        id,
        model_id: 1,
        model_name: "Honda CG 160".to_string(),
        branch_id: 1,
        branch_name: "Filial Centro".to_string(),
        plate: format!("ABC{:04}", id),
        status,
        mileage,
        position: Position::default(),
        notes: None,
        year: None,
        color: None,
        created_at: Utc::now(),
    }
}
