//! Wire-level shapes of the fleet REST API.
//!
//! The backend speaks Portuguese field names and upper-case status codes.
//! This module owns the translation to and from the app vocabulary in
//! [`crate::motorcycle`]. Outgoing payloads always use one shape
//! (`id`, `idModelo`, `idFilial`, `placa`, `status`, `kmRodado`); incoming
//! payloads also accept the older field names (`idMoto`,
//! `idFilialDepartamento`, `statusMoto`).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::motorcycle::{Branch, Catalog, Motorcycle, MotorcycleStatus, NewMotorcycle, Position};

/// Motorcycle as sent to and received from `/api/motos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotoDto {
    /// Backend id; absent when the backend should assign one.
    #[serde(default, alias = "idMoto", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Model foreign key.
    pub id_modelo: i64,
    /// Branch foreign key.
    #[serde(alias = "idFilialDepartamento")]
    pub id_filial: i64,
    /// License plate.
    pub placa: String,
    /// Status code, see [`status_to_api`].
    #[serde(alias = "statusMoto")]
    pub status: String,
    /// Odometer reading in km.
    #[serde(default)]
    pub km_rodado: u32,
}

/// Branch as sent to and received from `/api/filiais`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchDto {
    /// Backend id; absent on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_filial_departamento: Option<i64>,
    /// Branch name.
    pub nome_filial_departamento: String,
}

/// Wire code for a status.
#[must_use]
pub fn status_to_api(status: MotorcycleStatus) -> &'static str {
    match status {
        MotorcycleStatus::Available => "DISPONIVEL",
        MotorcycleStatus::InUse => "EM_USO",
        MotorcycleStatus::Maintenance => "MANUTENCAO",
        MotorcycleStatus::Reserved => "RESERVADA",
    }
}

/// Status for a wire code.
///
/// Unknown codes are read as [`MotorcycleStatus::Available`] so that a record
/// always carries one of the four statuses.
#[must_use]
pub fn status_from_api(code: &str) -> MotorcycleStatus {
    match code {
        "DISPONIVEL" => MotorcycleStatus::Available,
        "EM_USO" => MotorcycleStatus::InUse,
        "MANUTENCAO" => MotorcycleStatus::Maintenance,
        "RESERVADA" => MotorcycleStatus::Reserved,
        other => {
            warn!(code = other, "unknown status code from backend, using DISPONIVEL");
            MotorcycleStatus::Available
        }
    }
}

/// Map a backend record to the app shape, resolving names from the catalog.
///
/// # Errors
///
/// Returns [`Error::InvalidId`] if the record carries no id.
pub fn motorcycle_from_dto(dto: MotoDto, catalog: &Catalog) -> Result<Motorcycle> {
    let id = dto
        .id
        .ok_or_else(|| Error::InvalidId(format!("motorcycle {} has no id", dto.placa)))?;
    Ok(Motorcycle {
        id,
        model_id: dto.id_modelo,
        model_name: catalog.model_name(dto.id_modelo).to_string(),
        branch_id: dto.id_filial,
        branch_name: catalog.branch_name(dto.id_filial).to_string(),
        plate: dto.placa,
        status: status_from_api(&dto.status),
        mileage: dto.km_rodado,
        position: Position::default(),
        notes: None,
        year: None,
        color: None,
        created_at: Utc::now(),
    })
}

/// Payload for updating an existing motorcycle.
#[must_use]
pub fn motorcycle_to_dto(motorcycle: &Motorcycle) -> MotoDto {
    MotoDto {
        id: Some(motorcycle.id),
        id_modelo: motorcycle.model_id,
        id_filial: motorcycle.branch_id,
        placa: motorcycle.plate.trim().to_uppercase(),
        status: status_to_api(motorcycle.status).to_string(),
        km_rodado: motorcycle.mileage,
    }
}

/// Payload for registering a motorcycle.
#[must_use]
pub fn new_motorcycle_to_dto(draft: &NewMotorcycle) -> MotoDto {
    MotoDto {
        id: draft.id,
        id_modelo: draft.model_id,
        id_filial: draft.branch_id,
        placa: draft.plate.trim().to_uppercase(),
        status: status_to_api(draft.status).to_string(),
        km_rodado: draft.mileage,
    }
}

impl TryFrom<BranchDto> for Branch {
    type Error = Error;

    fn try_from(dto: BranchDto) -> Result<Self> {
        let id = dto.id_filial_departamento.ok_or_else(|| {
            Error::InvalidId(format!("branch {} has no id", dto.nome_filial_departamento))
        })?;
        Ok(Self {
            id,
            name: dto.nome_filial_departamento,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for code in ["DISPONIVEL", "EM_USO", "MANUTENCAO", "RESERVADA"] {
            assert_eq!(status_to_api(status_from_api(code)), code);
        }
    }

    #[test]
    fn test_unknown_status_reads_as_available() {
        assert_eq!(status_from_api("QUEBRADA"), MotorcycleStatus::Available);
        assert_eq!(status_from_api(""), MotorcycleStatus::Available);
    }

    #[test]
    fn test_decode_current_shape() {
        let json = r#"{"id":7,"idModelo":2,"idFilial":3,"placa":"ABC1234","status":"EM_USO","kmRodado":4500}"#;
        let dto: MotoDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.id, Some(7));
        assert_eq!(dto.id_filial, 3);

        let moto = motorcycle_from_dto(dto, &Catalog::default()).unwrap();
        assert_eq!(moto.model_name, "Yamaha Factor 150");
        assert_eq!(moto.branch_name, "Filial Sul");
        assert_eq!(moto.status, MotorcycleStatus::InUse);
        assert_eq!(moto.mileage, 4500);
        assert_eq!(moto.position, Position::default());
    }

    #[test]
    fn test_decode_legacy_shape() {
        let json = r#"{"idMoto":9,"idModelo":1,"idFilialDepartamento":1,"placa":"XYZ9A87","statusMoto":"RESERVADA","kmRodado":10}"#;
        let dto: MotoDto = serde_json::from_str(json).unwrap();
        let moto = motorcycle_from_dto(dto, &Catalog::default()).unwrap();
        assert_eq!(moto.id, 9);
        assert_eq!(moto.branch_id, 1);
        assert_eq!(moto.status, MotorcycleStatus::Reserved);
    }

    #[test]
    fn test_decode_unknown_foreign_keys() {
        let json = r#"{"id":1,"idModelo":42,"idFilial":42,"placa":"ABC1234","status":"DISPONIVEL"}"#;
        let dto: MotoDto = serde_json::from_str(json).unwrap();
        let moto = motorcycle_from_dto(dto, &Catalog::default()).unwrap();
        assert_eq!(moto.model_name, crate::motorcycle::UNKNOWN_MODEL);
        assert_eq!(moto.branch_name, crate::motorcycle::UNKNOWN_BRANCH);
        assert_eq!(moto.mileage, 0);
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let dto = MotoDto {
            id: None,
            id_modelo: 1,
            id_filial: 1,
            placa: "ABC1234".to_string(),
            status: "DISPONIVEL".to_string(),
            km_rodado: 0,
        };
        let err = motorcycle_from_dto(dto, &Catalog::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidId(_)));
    }

    #[test]
    fn test_encode_uses_current_field_names() {
        let moto = crate::motorcycle::sample_motorcycle(5, MotorcycleStatus::Maintenance, 321);
        let value = serde_json::to_value(motorcycle_to_dto(&moto)).unwrap();
        assert_eq!(value["id"], 5);
        assert_eq!(value["idModelo"], 1);
        assert_eq!(value["idFilial"], 1);
        assert_eq!(value["status"], "MANUTENCAO");
        assert_eq!(value["kmRodado"], 321);
        assert!(value.get("statusMoto").is_none());
    }

    #[test]
    fn test_new_motorcycle_without_id_omits_it() {
        let draft = NewMotorcycle {
            model_id: 3,
            branch_id: 2,
            plate: " abc1d23 ".to_string(),
            ..NewMotorcycle::default()
        };
        let value = serde_json::to_value(new_motorcycle_to_dto(&draft)).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["placa"], "ABC1D23");
        assert_eq!(value["status"], "DISPONIVEL");
    }

    #[test]
    fn test_branch_dto() {
        let json = r#"{"idFilialDepartamento":4,"nomeFilialDepartamento":"Filial Leste"}"#;
        let dto: BranchDto = serde_json::from_str(json).unwrap();
        let branch = Branch::try_from(dto).unwrap();
        assert_eq!(branch.id, 4);
        assert_eq!(branch.name, "Filial Leste");

        let create = BranchDto {
            id_filial_departamento: None,
            nome_filial_departamento: "Nova".to_string(),
        };
        let value = serde_json::to_value(create).unwrap();
        assert!(value.get("idFilialDepartamento").is_none());
    }
}
