use crate::domain::model::{
    AbilityLevel, BootSummary, Customer, EquipmentDescriptor, EquipmentSummary, NewCustomer,
    SkiModel,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A classified customer search; the variant picks the server-side filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerQuery {
    Email(String),
    Phone(String),
    Name(String),
}

impl CustomerQuery {
    pub fn param(&self) -> (&'static str, &str) {
        match self {
            CustomerQuery::Email(value) => ("email", value),
            CustomerQuery::Phone(value) => ("phone", value),
            CustomerQuery::Name(value) => ("name", value),
        }
    }
}

/// Body of the primary create-work-order call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderRequest {
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub email: String,
    pub phone: String,
    pub equipment: Vec<EquipmentItemPayload>,
    #[serde(flatten)]
    pub agreement: Option<AgreementPayload>,
}

/// One item of the request. Fields that do not apply are left out entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentItemPayload {
    pub service_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_equipment: Option<EquipmentDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bsl: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_inches: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ski_ability_level: Option<AbilityLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementPayload {
    pub agreement_accepted: bool,
    pub agreement_version: String,
    pub signed_name: String,
    pub signature_image_base64: String,
    pub agreement_accepted_at: chrono::DateTime<chrono::Utc>,
}

/// Result of the primary create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created { work_order_id: i64 },
    /// The shop's daily submission quota is exhausted.
    LimitReached { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignAgreementRequest {
    pub signature_name: String,
    pub email: String,
    pub phone: String,
    pub signature_image_base64: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignAgreementReceipt {
    #[serde(default)]
    pub agreement_id: Option<i64>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub signed_at: Option<String>,
}

/// Network operations consumed by the intake workflow.
#[async_trait]
pub trait IntakeApi: Send + Sync {
    async fn search_customers(&self, query: &CustomerQuery) -> Result<Vec<Customer>>;
    async fn lookup_customer(&self, email: &str, phone: &str) -> Result<Option<Customer>>;
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer>;
    async fn customer_equipment(&self, customer_id: i64) -> Result<Vec<EquipmentSummary>>;
    async fn customer_boots(&self, customer_id: i64) -> Result<Vec<BootSummary>>;
    async fn ski_models(&self) -> Result<Vec<SkiModel>>;
    async fn equipment_boots(&self, equipment_id: i64) -> Result<Vec<BootSummary>>;
    async fn create_work_order(&self, request: &WorkOrderRequest) -> Result<CreateOutcome>;
    async fn sign_agreement(
        &self,
        work_order_id: i64,
        request: &SignAgreementRequest,
    ) -> Result<SignAgreementReceipt>;
}

/// Client-side key-value store. Used only as a cache; never authoritative.
pub trait DraftStore: Send + Sync {
    fn load(&self, key: &str) -> impl std::future::Future<Output = Result<Option<String>>> + Send;
    fn save(&self, key: &str, value: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}
