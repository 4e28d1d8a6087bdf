//! User-facing text in the two supported languages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::motorcycle::MotorcycleStatus;

/// Display language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Portuguese.
    #[default]
    Pt,
    /// Spanish.
    Es,
}

impl Language {
    /// The persisted code (`pt` or `es`).
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Pt => "pt",
            Self::Es => "es",
        }
    }

    /// The other language.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Pt => Self::Es,
            Self::Es => Self::Pt,
        }
    }

    /// Message table for this language.
    #[must_use]
    pub fn messages(self) -> &'static Messages {
        match self {
            Self::Pt => &PT,
            Self::Es => &ES,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pt" | "pt-br" => Ok(Self::Pt),
            "es" => Ok(Self::Es),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// Static strings for one language.
#[allow(missing_docs)]
#[derive(Debug)]
pub struct Messages {
    pub email_required: &'static str,
    pub email_invalid: &'static str,
    pub password_required: &'static str,
    pub password_min: &'static str,
    pub password_mismatch: &'static str,
    pub field_required: &'static str,
    pub id_positive: &'static str,
    pub plate_invalid: &'static str,
    pub mileage_range: &'static str,
    pub year_range: &'static str,

    pub user_not_found: &'static str,
    pub wrong_password: &'static str,
    pub user_disabled: &'static str,
    pub too_many_requests: &'static str,
    pub network_request_failed: &'static str,
    pub invalid_credential: &'static str,
    pub email_in_use: &'static str,
    pub weak_password: &'static str,
    pub login_failed: &'static str,
    pub register_failed: &'static str,

    pub maintenance_title: &'static str,
    pub new_motorcycle_title: &'static str,
    pub status_updated_title: &'static str,
    pub daily_summary_title: &'static str,

    pub status_available: &'static str,
    pub status_in_use: &'static str,
    pub status_maintenance: &'static str,
    pub status_reserved: &'static str,

    pub server_error: &'static str,
    pub not_found: &'static str,
    pub unknown_error: &'static str,
}

impl Messages {
    /// Localized label for a status.
    #[must_use]
    pub fn status_label(&self, status: MotorcycleStatus) -> &'static str {
        match status {
            MotorcycleStatus::Available => self.status_available,
            MotorcycleStatus::InUse => self.status_in_use,
            MotorcycleStatus::Maintenance => self.status_maintenance,
            MotorcycleStatus::Reserved => self.status_reserved,
        }
    }

    /// Short message for an error, suitable for an alert.
    #[must_use]
    pub fn describe_error(&self, err: &crate::Error) -> String {
        if err.is_network() {
            return self.network_request_failed.to_string();
        }
        if let Some(message) = err.server_message() {
            return message.to_string();
        }
        match err.http_status() {
            Some(404) => self.not_found.to_string(),
            Some(status) => format!("{} ({status})", self.server_error),
            None => match err {
                crate::Error::Validation(_) | crate::Error::Auth { .. } => err.to_string(),
                _ => self.unknown_error.to_string(),
            },
        }
    }
}

/// Portuguese strings.
pub static PT: Messages = Messages {
    email_required: "Email é obrigatório",
    email_invalid: "Email inválido",
    password_required: "Senha é obrigatória",
    password_min: "A senha deve ter pelo menos 6 caracteres",
    password_mismatch: "As senhas não coincidem",
    field_required: "Campo obrigatório",
    id_positive: "Informe um identificador válido",
    plate_invalid: "Placa inválida (ex.: ABC1234 ou ABC1D23)",
    mileage_range: "Quilometragem fora do intervalo permitido",
    year_range: "Ano fora do intervalo permitido",

    user_not_found: "Usuário não encontrado",
    wrong_password: "Senha incorreta",
    user_disabled: "Usuário desabilitado",
    too_many_requests: "Muitas tentativas. Tente novamente mais tarde",
    network_request_failed: "Erro de conexão. Verifique sua internet",
    invalid_credential: "Email ou senha incorretos",
    email_in_use: "Este email já está em uso",
    weak_password: "A senha deve ter pelo menos 6 caracteres",
    login_failed: "Erro ao fazer login",
    register_failed: "Erro ao criar conta",

    maintenance_title: "🔧 Manutenção Necessária",
    new_motorcycle_title: "🏍️ Nova Moto Cadastrada",
    status_updated_title: "Status Atualizado",
    daily_summary_title: "📊 Resumo Diário - Moto Manager",

    status_available: "Disponível",
    status_in_use: "Em Uso",
    status_maintenance: "Manutenção",
    status_reserved: "Reservada",

    server_error: "Erro no servidor",
    not_found: "Registro não encontrado",
    unknown_error: "Erro desconhecido",
};

/// Spanish strings.
pub static ES: Messages = Messages {
    email_required: "El email es obligatorio",
    email_invalid: "Email inválido",
    password_required: "La contraseña es obligatoria",
    password_min: "La contraseña debe tener al menos 6 caracteres",
    password_mismatch: "Las contraseñas no coinciden",
    field_required: "Campo obligatorio",
    id_positive: "Ingrese un identificador válido",
    plate_invalid: "Placa inválida (ej.: ABC1234 o ABC1D23)",
    mileage_range: "Kilometraje fuera del rango permitido",
    year_range: "Año fuera del rango permitido",

    user_not_found: "Usuario no encontrado",
    wrong_password: "Contraseña incorrecta",
    user_disabled: "Usuario deshabilitado",
    too_many_requests: "Demasiados intentos. Inténtelo más tarde",
    network_request_failed: "Error de conexión. Verifique su internet",
    invalid_credential: "Email o contraseña incorrectos",
    email_in_use: "Este email ya está en uso",
    weak_password: "La contraseña debe tener al menos 6 caracteres",
    login_failed: "Error al iniciar sesión",
    register_failed: "Error al crear la cuenta",

    maintenance_title: "🔧 Mantenimiento Necesario",
    new_motorcycle_title: "🏍️ Nueva Moto Registrada",
    status_updated_title: "Estado Actualizado",
    daily_summary_title: "📊 Resumen Diario - Moto Manager",

    status_available: "Disponible",
    status_in_use: "En Uso",
    status_maintenance: "Mantenimiento",
    status_reserved: "Reservada",

    server_error: "Error en el servidor",
    not_found: "Registro no encontrado",
    unknown_error: "Error desconocido",
};
