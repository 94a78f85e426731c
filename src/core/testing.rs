//! In-memory `IntakeApi` used by the unit tests.

use crate::domain::model::{
    AbilityLevel, BootSummary, Condition, Customer, EquipmentSummary, NewCustomer, SkiModel,
};
use crate::domain::ports::{
    CreateOutcome, CustomerQuery, IntakeApi, SignAgreementReceipt, SignAgreementRequest,
    WorkOrderRequest,
};
use crate::utils::error::{IntakeError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct State {
    calls: HashMap<&'static str, usize>,
    search_results: Vec<Customer>,
    lookup: Option<Customer>,
    equipment: Vec<EquipmentSummary>,
    boots: Vec<BootSummary>,
    models: Option<Vec<SkiModel>>,
    equipment_boots: HashMap<i64, Vec<BootSummary>>,
    create_outcome: Option<CreateOutcome>,
    create_failure: Option<u16>,
    create_delay: Option<Duration>,
    sign_failure: bool,
    work_orders: Vec<WorkOrderRequest>,
    signatures: Vec<(i64, SignAgreementRequest)>,
}

#[derive(Clone, Default)]
pub struct MockApi {
    state: Arc<Mutex<State>>,
}

impl MockApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.with(|s| s.models = Some(Vec::new()));
        api
    }

    pub fn jane() -> Customer {
        Customer {
            id: Some(7),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@x.com".to_string(),
            phone: "5551234567".to_string(),
        }
    }

    pub fn skis() -> EquipmentSummary {
        EquipmentSummary {
            id: 42,
            brand: "Atomic".to_string(),
            model: "Bent 100".to_string(),
            length: Some(180),
            condition: Some(Condition::Used),
            ability_level: Some(AbilityLevel::Advanced),
        }
    }

    pub fn boot(id: i64) -> BootSummary {
        BootSummary {
            id,
            brand: "Tecnica".to_string(),
            model: "Mach1".to_string(),
            bsl: Some(305),
            height_inches: Some(70),
            weight: Some(165),
            age: Some(30),
            ability_level: Some(AbilityLevel::Advanced),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    fn record(&self, name: &'static str) {
        self.with(|s| *s.calls.entry(name).or_default() += 1);
    }

    pub fn calls(&self, name: &str) -> usize {
        self.with(|s| s.calls.get(name).copied().unwrap_or(0))
    }

    pub fn set_search_results(&self, customers: Vec<Customer>) {
        self.with(|s| s.search_results = customers);
    }

    pub fn set_lookup(&self, customer: Option<Customer>) {
        self.with(|s| s.lookup = customer);
    }

    pub fn set_equipment(&self, equipment: Vec<EquipmentSummary>, boots: Vec<BootSummary>) {
        self.with(|s| {
            s.equipment = equipment;
            s.boots = boots;
        });
    }

    pub fn set_models(&self, models: Option<Vec<SkiModel>>) {
        self.with(|s| s.models = models);
    }

    pub fn set_equipment_boots(&self, equipment_id: i64, boots: Vec<BootSummary>) {
        self.with(|s| {
            s.equipment_boots.insert(equipment_id, boots);
        });
    }

    pub fn set_create_outcome(&self, outcome: CreateOutcome) {
        self.with(|s| s.create_outcome = Some(outcome));
    }

    pub fn fail_create(&self, status: Option<u16>) {
        self.with(|s| s.create_failure = status);
    }

    pub fn delay_create(&self, delay: Duration) {
        self.with(|s| s.create_delay = Some(delay));
    }

    pub fn fail_sign(&self) {
        self.with(|s| s.sign_failure = true);
    }

    pub fn work_orders(&self) -> Vec<WorkOrderRequest> {
        self.with(|s| s.work_orders.clone())
    }

    pub fn signatures(&self) -> Vec<(i64, SignAgreementRequest)> {
        self.with(|s| s.signatures.clone())
    }
}

#[async_trait::async_trait]
impl IntakeApi for MockApi {
    async fn search_customers(&self, _query: &CustomerQuery) -> Result<Vec<Customer>> {
        self.record("search_customers");
        Ok(self.with(|s| s.search_results.clone()))
    }

    async fn lookup_customer(&self, _email: &str, _phone: &str) -> Result<Option<Customer>> {
        self.record("lookup_customer");
        Ok(self.with(|s| s.lookup.clone()))
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        self.record("create_customer");
        Ok(Customer {
            id: Some(100),
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
        })
    }

    async fn customer_equipment(&self, _customer_id: i64) -> Result<Vec<EquipmentSummary>> {
        self.record("customer_equipment");
        Ok(self.with(|s| s.equipment.clone()))
    }

    async fn customer_boots(&self, _customer_id: i64) -> Result<Vec<BootSummary>> {
        self.record("customer_boots");
        Ok(self.with(|s| s.boots.clone()))
    }

    async fn ski_models(&self) -> Result<Vec<SkiModel>> {
        self.record("ski_models");
        self.with(|s| s.models.clone()).ok_or_else(|| IntakeError::Api {
            status: 404,
            message: "Not Found".to_string(),
        })
    }

    async fn equipment_boots(&self, equipment_id: i64) -> Result<Vec<BootSummary>> {
        self.record("equipment_boots");
        Ok(self.with(|s| s.equipment_boots.get(&equipment_id).cloned().unwrap_or_default()))
    }

    async fn create_work_order(&self, request: &WorkOrderRequest) -> Result<CreateOutcome> {
        self.record("create_work_order");
        if let Some(delay) = self.with(|s| s.create_delay) {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = self.with(|s| s.create_failure) {
            return Err(IntakeError::Api {
                status,
                message: "Failed to create work order".to_string(),
            });
        }
        self.with(|s| {
            s.work_orders.push(request.clone());
            Ok(s.create_outcome.clone().unwrap_or(CreateOutcome::Created {
                work_order_id: 501,
            }))
        })
    }

    async fn sign_agreement(
        &self,
        work_order_id: i64,
        request: &SignAgreementRequest,
    ) -> Result<SignAgreementReceipt> {
        self.record("sign_agreement");
        if self.with(|s| s.sign_failure) {
            return Err(IntakeError::Api {
                status: 500,
                message: "PDF generation failed".to_string(),
            });
        }
        self.with(|s| s.signatures.push((work_order_id, request.clone())));
        Ok(SignAgreementReceipt {
            agreement_id: Some(9),
            pdf_url: Some("https://files.example.com/agreement.pdf".to_string()),
            signed_at: None,
        })
    }
}
