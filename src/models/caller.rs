//! Identidad del llamante
//!
//! La autenticación ocurre fuera del núcleo; las operaciones mutantes
//! solo reciben quién llama y con qué rol para decidir permisos.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    Admin,
    Dispatcher,
    Driver,
}

impl CallerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerRole::Admin => "admin",
            CallerRole::Dispatcher => "dispatcher",
            CallerRole::Driver => "driver",
        }
    }
}

impl FromStr for CallerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(CallerRole::Admin),
            "dispatcher" => Ok(CallerRole::Dispatcher),
            "driver" => Ok(CallerRole::Driver),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub role: CallerRole,
}

impl CallerIdentity {
    pub fn new(user_id: Uuid, role: CallerRole) -> Self {
        Self { user_id, role }
    }

    /// Identidad interna para tareas del sistema (seeds, herramientas)
    pub fn system() -> Self {
        Self {
            user_id: Uuid::nil(),
            role: CallerRole::Admin,
        }
    }
}
