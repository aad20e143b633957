// src/templates.rs
use crate::models::user::CurrentUser;
use askama::Template;

// --- Peças partilhadas pelo layout (templates/base.html) ---

/// Mensagens vindas da query string (Post/Redirect/Get).
#[derive(Debug, Clone, Default)]
pub struct Flash {
    pub success: Option<String>,
    pub warning: Option<String>,
    pub error: Option<String>,
}

/// Dados do utilizador para o menu.
#[derive(Debug, Clone)]
pub struct Nav {
    pub name: String,
    pub ps_number: String,
    pub credential: String,
    pub is_admin: bool,
}

impl From<&CurrentUser> for Nav {
    fn from(user: &CurrentUser) -> Self {
        Self {
            name: user.name.clone(),
            ps_number: user.ps_number.to_string(),
            credential: user.credential.to_string(),
            is_admin: user.is_admin(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self { value: value.into(), label: label.into(), selected }
    }

    /// Opções simples (valor = rótulo), marcando `current` como selecionada.
    pub fn list<S: AsRef<str>>(values: &[S], current: &str) -> Vec<SelectOption> {
        values
            .iter()
            .map(|v| SelectOption::new(v.as_ref(), v.as_ref(), v.as_ref() == current))
            .collect()
    }
}

/// Caixa "Confirm deletion of N ...".
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmView {
    pub message: String,
    pub preview: Vec<String>,
    pub more: usize,
    pub confirm_action: String,
    pub cancel_action: String,
}

// --- Páginas ---

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub error: Option<String>,
}

/// Página de erro usada pelo `IntoResponse` do `AppError`.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub status_code: u16,
    pub message: String,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub nav: Nav,
    pub flash: Flash,
    pub school_count: usize,
    pub pending_count: usize,
    pub unsynced_count: usize,
    pub remote_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct BatchItemView {
    pub school: String,
    pub category: String,
    pub material: String,
    pub quantity: i64,
}

#[derive(Template)]
#[template(path = "request_new.html")]
pub struct RequestNewPage {
    pub nav: Nav,
    pub flash: Flash,
    pub schools: Vec<SelectOption>,
    pub categories: Vec<SelectOption>,
    pub category: String,
    pub materials: Vec<SelectOption>,
    pub batch: Vec<BatchItemView>,
}

#[derive(Debug, Clone)]
pub struct RequestRowView {
    pub idx: usize,
    pub id: String,
    pub school: String,
    pub requester: String,
    pub ps_number: String,
    pub category: String,
    pub material: String,
    pub quantity: i64,
    pub status: String,
    pub status_options: Vec<SelectOption>,
    pub date: String,
}

#[derive(Template)]
#[template(path = "requests.html")]
pub struct RequestsPage {
    pub nav: Nav,
    pub flash: Flash,
    pub schools: Vec<SelectOption>,
    pub school_filter: String,
    pub pending: Vec<RequestRowView>,
    pub finalized: Vec<RequestRowView>,
    pub batch_status_options: Vec<SelectOption>,
    pub unsynced_count: usize,
    pub confirm: Option<ConfirmView>,
}

#[derive(Debug, Clone)]
pub struct SchoolRowView {
    pub idx: usize,
    pub id: String,
    pub nome: String,
    pub city: String,
    pub coaches: String,
    pub is_new: bool,
}

#[derive(Template)]
#[template(path = "admin_schools.html")]
pub struct AdminSchoolsPage {
    pub nav: Nav,
    pub flash: Flash,
    pub rows: Vec<SchoolRowView>,
    pub confirm: Option<ConfirmView>,
}

#[derive(Debug, Clone)]
pub struct UserRowView {
    pub idx: usize,
    pub ps_number: String,
    pub name: String,
    pub credential_options: Vec<SelectOption>,
    pub is_new: bool,
    /// Ainda em texto simples (será convertida no próximo login).
    pub legacy_password: bool,
}

#[derive(Template)]
#[template(path = "admin_users.html")]
pub struct AdminUsersPage {
    pub nav: Nav,
    pub flash: Flash,
    pub rows: Vec<UserRowView>,
    pub confirm: Option<ConfirmView>,
}

#[derive(Debug, Clone)]
pub struct MaterialRowView {
    pub idx: usize,
    pub category: String,
    pub subcategory: String,
    pub item: String,
}

#[derive(Template)]
#[template(path = "admin_materials.html")]
pub struct AdminMaterialsPage {
    pub nav: Nav,
    pub flash: Flash,
    pub rows: Vec<MaterialRowView>,
}

#[derive(Debug, Clone)]
pub struct StockLineView {
    pub kind: String,
    pub size: String,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct StockProjectView {
    pub project: String,
    pub lines: Vec<StockLineView>,
}

#[derive(Debug, Clone)]
pub struct StockRowView {
    pub idx: usize,
    pub id: String,
    pub school_id: String,
    pub project_options: Vec<SelectOption>,
    pub kind: String,
    pub size: String,
    pub quantity: String,
}

#[derive(Template)]
#[template(path = "stock.html")]
pub struct StockPage {
    pub nav: Nav,
    pub flash: Flash,
    pub schools: Vec<SelectOption>,
    pub school_filter: String,
    pub summary: Vec<StockProjectView>,
    pub rows: Vec<StockRowView>,
}

#[derive(Debug, Clone)]
pub struct SyncLineView {
    pub message: String,
    pub notes: Vec<String>,
    pub is_error: bool,
}

#[derive(Template)]
#[template(path = "sync.html")]
pub struct SyncPage {
    pub nav: Nav,
    pub flash: Flash,
    pub remote_name: Option<String>,
    pub summary: Option<String>,
    pub lines: Vec<SyncLineView>,
}
