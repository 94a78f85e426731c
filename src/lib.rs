pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{FileDraftStore, HttpIntakeApi, MemoryDraftStore};
pub use config::IntakeConfig;
pub use core::{
    AgreementGate, CustomerResolver, EquipmentItemBuilder, IntakeWizard, WorkOrderAssembler,
};
pub use domain::status::derive_status;
pub use domain::work_order::WorkOrder;
pub use utils::error::{IntakeError, Result};
