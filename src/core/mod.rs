// Core layer: the intake workflow itself, from customer lookup to submission.

pub mod agreement;
pub mod assembler;
pub mod customer;
pub mod equipment;
pub mod search;
pub mod signature;
pub mod wizard;

#[cfg(test)]
pub mod testing;

pub use agreement::{AgreementDraftCache, AgreementGate, GateCondition, GateState, ScrollMetrics};
pub use assembler::{FollowUp, SubmissionOutcome, SubmissionState, WorkOrderAssembler};
pub use customer::{CustomerResolver, DuplicateChoice, NewCustomerForm};
pub use equipment::{EquipmentItemBuilder, ModelCatalog};
pub use search::LiveSearch;
pub use signature::{BitmapEncoder, SignatureEncoder, SignaturePad};
pub use wizard::{next_step, IntakeWizard, Step, WizardEvent};
