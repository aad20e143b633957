// src/models/user.rs
use super::{ps_number::PsNumber, Row};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Perfil de acesso. Qualquer valor desconhecido é tratado como `Coach`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Credential {
    Admin,
    #[default]
    Coach,
}

impl Credential {
    pub const OPTIONS: [&'static str; 2] = ["Coach", "Admin"];

    pub fn as_str(self) -> &'static str {
        match self {
            Credential::Admin => "Admin",
            Credential::Coach => "Coach",
        }
    }

    pub fn is_admin(self) -> bool {
        self == Credential::Admin
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Credential::from(value.as_str())
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("admin") {
            Credential::Admin
        } else {
            Credential::Coach
        }
    }
}

impl From<Credential> for String {
    fn from(value: Credential) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Representa um registo de users.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub ps_number: PsNumber,
    /// Hash bcrypt. Valores antigos em texto simples ainda existem até ao próximo login.
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub credential: Credential,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Row,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.credential.is_admin()
    }

    /// Nome a mostrar; cai para o PS number quando o nome está vazio.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.ps_number.as_str()
        } else {
            &self.name
        }
    }
}

// Struct para dados do formulário de login
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(rename = "username")] // Mapeia do HTML 'username'
    pub ps_number: String,
    pub password: String,
}

/// O utilizador autenticado, posto nas extensões da requisição pelo `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub ps_number: PsNumber,
    pub name: String,
    pub credential: Credential,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.credential.is_admin()
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            ps_number: user.ps_number.clone(),
            name: user.display_name().to_string(),
            credential: user.credential,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_credentials_fall_back_to_coach() {
        assert_eq!(Credential::from("admin"), Credential::Admin);
        assert_eq!(Credential::from("Admin"), Credential::Admin);
        assert_eq!(Credential::from("Coordinator"), Credential::Coach);
        assert_eq!(Credential::from(""), Credential::Coach);
    }

    #[test]
    fn extra_fields_survive_a_round_trip() {
        let raw = json!({
            "ps_number": "PS10", "password": "x", "credential": "Coach", "name": "Ana", "phone": "123"
        });
        let user: User = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(user.extra["phone"], json!("123"));
        assert_eq!(serde_json::to_value(&user).unwrap(), raw);
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let user: User = serde_json::from_value(json!({"ps_number": "ps7"})).unwrap();
        assert_eq!(user.ps_number.as_str(), "PS7");
        assert_eq!(user.credential, Credential::Coach);
        assert_eq!(user.display_name(), "PS7");
    }
}
