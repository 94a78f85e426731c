use crate::config::{AgreementConfig, IntakeConfig};
use crate::core::agreement::{AgreementDraftCache, AgreementGate};
use crate::core::assembler::{SubmissionOutcome, WorkOrderAssembler};
use crate::core::customer::{CustomerResolver, DuplicateChoice};
use crate::core::equipment::EquipmentItemBuilder;
use crate::core::search::{LiveSearch, SearchRequest};
use crate::core::signature::{BitmapEncoder, SignatureEncoder};
use crate::domain::model::{Customer, NewCustomer, ServiceItem};
use crate::domain::ports::{DraftStore, IntakeApi};
use crate::domain::work_order::{requires_agreement, Agreement, WorkOrder};
use crate::utils::error::{IntakeError, Result};
use chrono::{DateTime, Utc};
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Customer,
    Equipment,
    Agreement,
    Review,
    Submitted,
    LimitReached,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Customer => "customer",
            Step::Equipment => "equipment",
            Step::Agreement => "agreement",
            Step::Review => "review",
            Step::Submitted => "submitted",
            Step::LimitReached => "limit_reached",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::Submitted | Step::LimitReached)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardEvent {
    CustomerResolved,
    ItemsFinalized { agreement_required: bool },
    AgreementAccepted,
    Submitted,
    LimitReached,
    Back { agreement_required: bool },
}

impl WizardEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardEvent::CustomerResolved => "customer_resolved",
            WizardEvent::ItemsFinalized { .. } => "items_finalized",
            WizardEvent::AgreementAccepted => "agreement_accepted",
            WizardEvent::Submitted => "submitted",
            WizardEvent::LimitReached => "limit_reached",
            WizardEvent::Back { .. } => "back",
        }
    }
}

/// Transition table for the intake steps.
pub fn next_step(step: Step, event: WizardEvent) -> Result<Step> {
    use WizardEvent as E;

    let next = match (step, event) {
        (Step::Customer, E::CustomerResolved) => Step::Equipment,
        (Step::Equipment, E::ItemsFinalized { agreement_required: true }) => Step::Agreement,
        (Step::Equipment, E::ItemsFinalized { agreement_required: false }) => Step::Review,
        (Step::Agreement, E::AgreementAccepted) => Step::Review,
        (Step::Review, E::Submitted) => Step::Submitted,
        (Step::Review, E::LimitReached) => Step::LimitReached,
        (Step::Equipment, E::Back { .. }) => Step::Customer,
        (Step::Agreement, E::Back { .. }) => Step::Equipment,
        (Step::Review, E::Back { agreement_required: true }) => Step::Agreement,
        (Step::Review, E::Back { agreement_required: false }) => Step::Equipment,
        _ => {
            return Err(IntakeError::InvalidTransition {
                from: step.as_str().to_string(),
                event: event.as_str().to_string(),
            })
        }
    };
    Ok(next)
}

/// The in-progress work order, owned by the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOrderDraft {
    customer: Option<Customer>,
    items: Vec<ServiceItem>,
    agreement: Agreement,
}

impl WorkOrderDraft {
    fn new(version: &str) -> Self {
        Self {
            customer: None,
            items: Vec::new(),
            agreement: Agreement::not_required(version),
        }
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn items(&self) -> &[ServiceItem] {
        &self.items
    }

    pub fn agreement(&self) -> &Agreement {
        &self.agreement
    }

    pub fn agreement_required(&self) -> bool {
        requires_agreement(&self.items)
    }

    fn to_work_order(&self) -> Result<WorkOrder> {
        let customer = self
            .customer
            .clone()
            .ok_or_else(|| IntakeError::validation("customer", "Select or create a customer"))?;
        WorkOrder::new(customer, self.items.clone(), self.agreement.clone())
    }
}

/// Drives one intake session from customer lookup to submission.
pub struct IntakeWizard<A: IntakeApi + Clone, S: DraftStore> {
    step: Step,
    draft: WorkOrderDraft,
    agreement_config: AgreementConfig,
    resolver: CustomerResolver<A>,
    search: LiveSearch,
    builder: Option<EquipmentItemBuilder>,
    gate: Option<AgreementGate>,
    assembler: WorkOrderAssembler<A>,
    cache: AgreementDraftCache<S>,
    encoder: Box<dyn SignatureEncoder>,
}

impl<A: IntakeApi + Clone, S: DraftStore> IntakeWizard<A, S> {
    pub fn new(api: A, store: S, config: &IntakeConfig) -> Self {
        Self {
            step: Step::Customer,
            draft: WorkOrderDraft::new(&config.agreement.version),
            agreement_config: config.agreement.clone(),
            resolver: CustomerResolver::new(api.clone()),
            search: LiveSearch::new(&config.search),
            builder: None,
            gate: None,
            assembler: WorkOrderAssembler::new(api),
            cache: AgreementDraftCache::new(store, &config.draft),
            encoder: Box::new(BitmapEncoder::default()),
        }
    }

    pub fn with_encoder(mut self, encoder: Box<dyn SignatureEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &WorkOrderDraft {
        &self.draft
    }

    pub fn agreement_title(&self) -> &str {
        &self.agreement_config.title
    }

    pub fn resolver(&self) -> &CustomerResolver<A> {
        &self.resolver
    }

    pub fn search(&self) -> &LiveSearch {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut LiveSearch {
        &mut self.search
    }

    /// Issues a debounced search and applies its response. Holds the wizard
    /// for the whole round trip; use `search_task` to keep taking input.
    pub async fn run_search(&mut self, request: SearchRequest) -> bool {
        self.search.run(&self.resolver, request).await
    }

    /// Detaches an issued search from the wizard. The host awaits (or spawns)
    /// the future while input keeps flowing, then hands the output to
    /// `search_mut().apply`, which drops it if newer input superseded it.
    pub fn search_task(
        &self,
        request: SearchRequest,
    ) -> impl Future<Output = (u64, Result<Vec<Customer>>)> + Send + 'static
    where
        A: 'static,
    {
        let resolver = CustomerResolver::new(self.resolver.api().clone());
        async move {
            let response = resolver.search(&request.query).await;
            (request.seq, response)
        }
    }

    pub fn assembler(&self) -> &WorkOrderAssembler<A> {
        &self.assembler
    }

    fn expect_step(&self, expected: Step, event: WizardEvent) -> Result<()> {
        if self.step == expected {
            Ok(())
        } else {
            Err(IntakeError::InvalidTransition {
                from: self.step.as_str().to_string(),
                event: event.as_str().to_string(),
            })
        }
    }

    fn advance(&mut self, event: WizardEvent) -> Result<Step> {
        let next = next_step(self.step, event)?;
        tracing::debug!("Wizard {} -> {}", self.step.as_str(), next.as_str());
        self.step = next;
        Ok(next)
    }

    pub fn builder(&self) -> Option<&EquipmentItemBuilder> {
        self.builder.as_ref()
    }

    /// Item editing is only possible on the equipment step.
    pub fn builder_mut(&mut self) -> Result<&mut EquipmentItemBuilder> {
        if self.step != Step::Equipment {
            return Err(IntakeError::InvalidTransition {
                from: self.step.as_str().to_string(),
                event: "edit_items".to_string(),
            });
        }
        self.builder
            .as_mut()
            .ok_or_else(|| IntakeError::validation("customer", "Select or create a customer"))
    }

    pub fn gate(&self) -> Option<&AgreementGate> {
        self.gate.as_ref()
    }

    pub fn gate_mut(&mut self) -> Result<&mut AgreementGate> {
        if self.step != Step::Agreement {
            return Err(IntakeError::InvalidTransition {
                from: self.step.as_str().to_string(),
                event: "edit_agreement".to_string(),
            });
        }
        self.gate
            .as_mut()
            .ok_or_else(|| IntakeError::validation("agreement", "No agreement is open"))
    }

    /// Uses `customer` for this work order and loads their equipment context.
    pub async fn select_customer(&mut self, customer: Customer) -> Result<Step> {
        self.expect_step(Step::Customer, WizardEvent::CustomerResolved)?;
        let builder = EquipmentItemBuilder::load(self.resolver.api(), &customer).await?;

        tracing::info!("Customer {} selected", customer.full_name());
        self.search.cancel();
        self.builder = Some(builder);
        self.draft.customer = Some(customer);
        self.advance(WizardEvent::CustomerResolved)
    }

    /// Creates a customer and selects it. A duplicate is returned as an error
    /// for [`Self::resolve_duplicate`].
    pub async fn create_customer(&mut self, customer: &NewCustomer) -> Result<Step> {
        self.expect_step(Step::Customer, WizardEvent::CustomerResolved)?;
        let created = self.resolver.create(customer).await?;
        self.select_customer(created).await
    }

    pub async fn resolve_duplicate(
        &mut self,
        existing: Customer,
        choice: DuplicateChoice,
    ) -> Result<Step> {
        match CustomerResolver::<A>::resolve_duplicate(existing, choice) {
            Some(customer) => self.select_customer(customer).await,
            None => Ok(self.step),
        }
    }

    /// Validates the items and moves on, opening the agreement when a mount is present.
    pub async fn finish_items(&mut self) -> Result<Step> {
        self.expect_step(
            Step::Equipment,
            WizardEvent::ItemsFinalized {
                agreement_required: false,
            },
        )?;
        let items = self.builder_mut()?.finalize()?;
        let agreement_required = requires_agreement(&items);
        self.draft.items = items;

        if agreement_required {
            // Changed items need a fresh acceptance.
            self.draft.agreement = Agreement::pending(self.agreement_config.version.clone());
            self.open_gate().await?;
        } else {
            self.gate = None;
            self.draft.agreement = Agreement::not_required(self.agreement_config.version.clone());
        }

        self.advance(WizardEvent::ItemsFinalized { agreement_required })
    }

    async fn open_gate(&mut self) -> Result<()> {
        if self.gate.is_some() {
            return Ok(());
        }
        let customer = self
            .draft
            .customer
            .as_ref()
            .ok_or_else(|| IntakeError::validation("customer", "Select or create a customer"))?;

        let mut gate = AgreementGate::new(customer, &self.agreement_config);
        if let Some(saved) = self.cache.load().await {
            gate.restore(saved);
        }
        self.gate = Some(gate);
        Ok(())
    }

    /// Writes the agreement inputs to the draft store.
    pub async fn save_agreement_draft(&self) {
        if let Some(gate) = &self.gate {
            self.cache.save(&gate.snapshot()).await;
        }
    }

    pub fn accept_agreement(&mut self, now: DateTime<Utc>) -> Result<Step> {
        self.expect_step(Step::Agreement, WizardEvent::AgreementAccepted)?;
        let gate = self
            .gate
            .as_ref()
            .ok_or_else(|| IntakeError::validation("agreement", "No agreement is open"))?;
        let agreement = gate.accept(self.encoder.as_ref(), now)?;
        self.draft.agreement = agreement;
        self.advance(WizardEvent::AgreementAccepted)
    }

    pub async fn back(&mut self) -> Result<Step> {
        let agreement_required = self.draft.agreement.required;
        let next = next_step(self.step, WizardEvent::Back { agreement_required })?;

        match next {
            Step::Customer => {
                self.builder = None;
                self.gate = None;
                self.draft = WorkOrderDraft::new(&self.agreement_config.version);
            }
            Step::Equipment if self.step == Step::Agreement => {
                self.save_agreement_draft().await;
                self.gate = None;
            }
            _ => {}
        }
        self.advance(WizardEvent::Back { agreement_required })
    }

    pub fn can_submit(&self) -> bool {
        self.step == Step::Review && self.assembler.can_submit()
    }

    /// Submits from the review step. Quota exhaustion ends the session on
    /// [`Step::LimitReached`]; other failures leave the draft for a retry.
    pub async fn submit(&mut self) -> Result<SubmissionOutcome> {
        self.expect_step(Step::Review, WizardEvent::Submitted)?;
        let order = self.draft.to_work_order()?;

        match self.assembler.submit(&order).await {
            Ok(outcome) => {
                self.cache.clear().await;
                self.advance(WizardEvent::Submitted)?;
                Ok(outcome)
            }
            Err(e @ IntakeError::QuotaExceeded { .. }) => {
                self.advance(WizardEvent::LimitReached)?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}
