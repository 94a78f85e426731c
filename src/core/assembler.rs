use crate::domain::model::{BootSource, EquipmentSource, Service, ServiceItem};
use crate::domain::ports::{
    AgreementPayload, CreateOutcome, EquipmentItemPayload, IntakeApi, SignAgreementReceipt,
    SignAgreementRequest, WorkOrderRequest,
};
use crate::domain::work_order::{Agreement, WorkOrder};
use crate::utils::error::{IntakeError, Result};
use crate::utils::validation::{normalize_email, normalize_phone};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    InFlight,
    Succeeded { work_order_id: i64 },
    /// Daily quota exhausted; nothing more can be submitted this session.
    LimitReached { message: String },
}

/// How the agreement-sign call after creation went. Never affects the creation itself.
#[derive(Debug)]
pub enum FollowUp {
    NotRequired,
    Signed(SignAgreementReceipt),
    Failed(IntakeError),
}

#[derive(Debug)]
pub struct SubmissionOutcome {
    pub work_order_id: i64,
    pub follow_up: FollowUp,
}

fn item_payload(item: &ServiceItem) -> EquipmentItemPayload {
    let mut payload = EquipmentItemPayload {
        service_type: item.service_type().as_str().to_string(),
        ..Default::default()
    };

    match &item.equipment {
        EquipmentSource::Existing(id) => payload.equipment_id = Some(*id),
        EquipmentSource::New(descriptor) => payload.new_equipment = Some(descriptor.clone()),
    }

    if let Service::Mount(mount) = &item.service {
        payload.binding_brand = Some(mount.binding.brand.clone());
        payload.binding_model = mount.binding.model.clone();
        match &mount.boot {
            BootSource::Existing(id) => payload.boot_id = Some(*id),
            BootSource::New { boot, profile } => {
                payload.boot_brand = Some(boot.brand.clone());
                payload.boot_model = Some(boot.model.clone());
                payload.bsl = Some(boot.bsl);
                payload.height_inches = Some(profile.height_inches);
                payload.weight = Some(profile.weight);
                payload.age = Some(profile.age);
                payload.ski_ability_level = Some(profile.ability_level);
            }
        }
    }
    payload
}

fn agreement_payload(agreement: &Agreement) -> Result<Option<AgreementPayload>> {
    if !agreement.required {
        return Ok(None);
    }

    match (
        agreement.accepted,
        &agreement.signature_name,
        &agreement.signature_image,
        agreement.accepted_at,
    ) {
        (true, Some(name), Some(image), Some(accepted_at)) => Ok(Some(AgreementPayload {
            agreement_accepted: true,
            agreement_version: agreement.version.clone(),
            signed_name: name.clone(),
            signature_image_base64: image.clone(),
            agreement_accepted_at: accepted_at,
        })),
        (accepted, name, image, accepted_at) => {
            let unmet = [
                ("acceptance", accepted),
                ("typed name", name.is_some()),
                ("signature", image.is_some()),
                ("acceptance time", accepted_at.is_some()),
            ]
            .into_iter()
            .filter(|(_, met)| !met)
            .map(|(label, _)| label.to_string())
            .collect();
            Err(IntakeError::AgreementIncomplete { unmet })
        }
    }
}

/// Request body for the create call. Fields that do not apply are left unset.
pub fn build_request(order: &WorkOrder) -> Result<WorkOrderRequest> {
    let customer = order.customer();
    Ok(WorkOrderRequest {
        customer_first_name: customer.first_name.trim().to_string(),
        customer_last_name: customer.last_name.trim().to_string(),
        email: normalize_email(&customer.email),
        phone: normalize_phone(&customer.phone),
        equipment: order.items().iter().map(item_payload).collect(),
        agreement: agreement_payload(order.agreement())?,
    })
}

/// Releases the in-flight slot if the submission future is dropped mid-call.
struct InFlight<'a> {
    state: &'a Mutex<SubmissionState>,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, next: SubmissionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) = SubmissionState::Idle;
        }
    }
}

/// Submits a finished work order, then the agreement signature as a follow-up.
///
/// At most one submission runs at a time, and a succeeded or quota-limited
/// assembler refuses further submissions.
pub struct WorkOrderAssembler<A: IntakeApi> {
    api: A,
    state: Mutex<SubmissionState>,
}

impl<A: IntakeApi> WorkOrderAssembler<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> SubmissionState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        self.state() == SubmissionState::Idle
    }

    fn begin(&self, order: &WorkOrder) -> Result<(WorkOrderRequest, InFlight<'_>)> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            SubmissionState::Idle => {}
            SubmissionState::InFlight => return Err(IntakeError::SubmissionInFlight),
            SubmissionState::Succeeded { .. } => return Err(IntakeError::AlreadySubmitted),
            SubmissionState::LimitReached { message } => {
                return Err(IntakeError::QuotaExceeded {
                    message: message.clone(),
                })
            }
        }

        let request = build_request(order)?;
        *state = SubmissionState::InFlight;
        Ok((
            request,
            InFlight {
                state: &self.state,
                settled: false,
            },
        ))
    }

    pub async fn submit(&self, order: &WorkOrder) -> Result<SubmissionOutcome> {
        let (request, in_flight) = self.begin(order)?;
        tracing::info!(
            "Submitting work order with {} item(s), agreement required: {}",
            request.equipment.len(),
            order.agreement().required
        );

        let work_order_id = match self.api.create_work_order(&request).await {
            Ok(CreateOutcome::Created { work_order_id }) => {
                in_flight.settle(SubmissionState::Succeeded { work_order_id });
                work_order_id
            }
            Ok(CreateOutcome::LimitReached { message }) => {
                tracing::warn!("Daily work order limit reached: {}", message);
                in_flight.settle(SubmissionState::LimitReached {
                    message: message.clone(),
                });
                return Err(IntakeError::QuotaExceeded { message });
            }
            Err(e) => {
                tracing::warn!("Work order submission failed: {}", e);
                in_flight.settle(SubmissionState::Idle);
                return Err(e);
            }
        };

        tracing::info!("Created work order {}", work_order_id);
        let follow_up = self.sign_agreement(work_order_id, order).await;
        Ok(SubmissionOutcome {
            work_order_id,
            follow_up,
        })
    }

    async fn sign_agreement(&self, work_order_id: i64, order: &WorkOrder) -> FollowUp {
        let agreement = order.agreement();
        let (Some(name), Some(image)) = (&agreement.signature_name, &agreement.signature_image)
        else {
            return FollowUp::NotRequired;
        };
        if !(agreement.required && agreement.accepted) {
            return FollowUp::NotRequired;
        }

        let customer = order.customer();
        let request = SignAgreementRequest {
            signature_name: name.clone(),
            email: normalize_email(&customer.email),
            phone: normalize_phone(&customer.phone),
            signature_image_base64: image.clone(),
        };

        match self.api.sign_agreement(work_order_id, &request).await {
            Ok(receipt) => {
                tracing::info!(
                    "Agreement signed for work order {} (agreement {:?})",
                    work_order_id,
                    receipt.agreement_id
                );
                FollowUp::Signed(receipt)
            }
            Err(e) => {
                tracing::error!(
                    "Failed to sign agreement for work order {}: {}",
                    work_order_id,
                    e
                );
                FollowUp::Failed(IntakeError::AgreementWorkflow {
                    work_order_id,
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::MockApi;
    use crate::domain::model::{
        AbilityLevel, Binding, BootDescriptor, Condition, EquipmentDescriptor, MountSpec,
        SkierProfile,
    };
    use chrono::Utc;
    use std::time::Duration;

    fn tune_order() -> WorkOrder {
        let item = ServiceItem::new(
            EquipmentSource::New(EquipmentDescriptor {
                brand: "Rossignol".to_string(),
                model: "Experience".to_string(),
                condition: Condition::Used,
                ability_level: AbilityLevel::Intermediate,
                length: None,
            }),
            Service::Tune,
        );
        WorkOrder::new(MockApi::jane(), vec![item], Agreement::not_required("v1")).unwrap()
    }

    fn mount_item() -> ServiceItem {
        ServiceItem::new(
            EquipmentSource::Existing(42),
            Service::Mount(MountSpec {
                boot: BootSource::New {
                    boot: BootDescriptor {
                        brand: "Tecnica".to_string(),
                        model: "Mach1".to_string(),
                        bsl: 305,
                    },
                    profile: SkierProfile {
                        height_inches: 70,
                        weight: 165,
                        age: 30,
                        ability_level: AbilityLevel::Advanced,
                    },
                },
                binding: Binding {
                    brand: "Marker".to_string(),
                    model: None,
                },
            }),
        )
    }

    fn signed_mount_order() -> WorkOrder {
        let agreement = Agreement::signed(
            "v1",
            "Jane Doe".to_string(),
            "data:image/x-portable-bitmap;base64,UDQK".to_string(),
            Utc::now(),
        );
        WorkOrder::new(MockApi::jane(), vec![mount_item()], agreement).unwrap()
    }

    #[test]
    fn test_tune_request_omits_mount_fields() {
        let request = build_request(&tune_order()).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        let item = json["equipment"][0].as_object().unwrap();

        assert_eq!(item["serviceType"], "TUNE");
        assert_eq!(item["newEquipment"]["condition"], "USED");
        assert_eq!(item["newEquipment"]["abilityLevel"], "INTERMEDIATE");
        for key in ["equipmentId", "bootId", "bootBrand", "bsl", "bindingBrand", "heightInches", "weight"] {
            assert!(!item.contains_key(key), "{key} should be omitted");
        }
        assert!(json.get("agreementAccepted").is_none());
        assert!(json.get("signedName").is_none());
    }

    #[test]
    fn test_mount_request_carries_boot_profile_and_agreement() {
        let json = serde_json::to_value(build_request(&signed_mount_order()).unwrap()).unwrap();
        let item = &json["equipment"][0];

        assert_eq!(item["equipmentId"], 42);
        assert_eq!(item["bootBrand"], "Tecnica");
        assert_eq!(item["bsl"], 305);
        assert_eq!(item["bindingBrand"], "Marker");
        assert!(item.get("bindingModel").is_none());
        assert_eq!(item["heightInches"], 70);
        assert_eq!(item["skiAbilityLevel"], "ADVANCED");
        assert!(item.get("newEquipment").is_none());

        assert_eq!(json["agreementAccepted"], true);
        assert_eq!(json["agreementVersion"], "v1");
        assert_eq!(json["signedName"], "Jane Doe");
        assert!(json["agreementAcceptedAt"].is_string());
    }

    #[tokio::test]
    async fn test_unaccepted_agreement_blocks_submission() {
        let api = MockApi::new();
        let assembler = WorkOrderAssembler::new(api.clone());
        let order = WorkOrder::new(MockApi::jane(), vec![mount_item()], Agreement::pending("v1")).unwrap();

        let err = assembler.submit(&order).await.unwrap_err();
        assert!(matches!(err, IntakeError::AgreementIncomplete { .. }));
        assert_eq!(api.calls("create_work_order"), 0);
        assert!(assembler.can_submit());
    }

    #[tokio::test]
    async fn test_success_signs_agreement_and_disables_resubmit() {
        let api = MockApi::new();
        let assembler = WorkOrderAssembler::new(api.clone());

        let outcome = assembler.submit(&signed_mount_order()).await.unwrap();
        assert_eq!(outcome.work_order_id, 501);
        assert!(matches!(outcome.follow_up, FollowUp::Signed(_)));

        let signatures = api.signatures();
        assert_eq!(signatures.len(), 1);
        assert_eq!(signatures[0].0, 501);
        assert_eq!(signatures[0].1.signature_name, "Jane Doe");
        assert_eq!(signatures[0].1.phone, "5551234567");

        assert_eq!(
            assembler.state(),
            SubmissionState::Succeeded { work_order_id: 501 }
        );
        assert!(!assembler.can_submit());
        assert!(matches!(
            assembler.submit(&signed_mount_order()).await,
            Err(IntakeError::AlreadySubmitted)
        ));
        assert_eq!(api.calls("create_work_order"), 1);
    }

    #[tokio::test]
    async fn test_tune_order_skips_follow_up() {
        let api = MockApi::new();
        let assembler = WorkOrderAssembler::new(api.clone());

        let outcome = assembler.submit(&tune_order()).await.unwrap();
        assert!(matches!(outcome.follow_up, FollowUp::NotRequired));
        assert_eq!(api.calls("sign_agreement"), 0);
    }

    #[tokio::test]
    async fn test_sign_failure_is_not_fatal() {
        let api = MockApi::new();
        api.fail_sign();
        let assembler = WorkOrderAssembler::new(api.clone());

        let outcome = assembler.submit(&signed_mount_order()).await.unwrap();
        assert_eq!(outcome.work_order_id, 501);
        match outcome.follow_up {
            FollowUp::Failed(IntakeError::AgreementWorkflow { work_order_id, .. }) => {
                assert_eq!(work_order_id, 501)
            }
            other => panic!("expected failed follow-up, got {:?}", other),
        }
        assert_eq!(
            assembler.state(),
            SubmissionState::Succeeded { work_order_id: 501 }
        );
    }

    #[tokio::test]
    async fn test_quota_is_terminal() {
        let api = MockApi::new();
        api.set_create_outcome(CreateOutcome::LimitReached {
            message: "Daily limit of 20 work orders reached".to_string(),
        });
        let assembler = WorkOrderAssembler::new(api.clone());

        let err = assembler.submit(&tune_order()).await.unwrap_err();
        assert!(matches!(err, IntakeError::QuotaExceeded { .. }));
        assert!(!err.is_retryable());
        assert!(!assembler.can_submit());

        assert!(matches!(
            assembler.submit(&tune_order()).await,
            Err(IntakeError::QuotaExceeded { .. })
        ));
        assert_eq!(api.calls("create_work_order"), 1);
    }

    #[tokio::test]
    async fn test_network_failure_allows_retry() {
        let api = MockApi::new();
        api.fail_create(Some(503));
        let assembler = WorkOrderAssembler::new(api.clone());

        let err = assembler.submit(&tune_order()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(assembler.can_submit());

        api.fail_create(None);
        assert!(assembler.submit(&tune_order()).await.is_ok());
        assert_eq!(api.work_orders().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submit_rejected() {
        let api = MockApi::new();
        api.delay_create(Duration::from_secs(2));
        let assembler = WorkOrderAssembler::new(api.clone());
        let order = tune_order();

        let (first, second) = tokio::join!(assembler.submit(&order), assembler.submit(&order));

        assert!(first.is_ok());
        assert!(matches!(second, Err(IntakeError::SubmissionInFlight)));
        assert_eq!(api.calls("create_work_order"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_submission_releases_slot() {
        let api = MockApi::new();
        api.delay_create(Duration::from_secs(60));
        let assembler = WorkOrderAssembler::new(api.clone());
        let order = tune_order();

        let timed_out =
            tokio::time::timeout(Duration::from_secs(1), assembler.submit(&order)).await;
        assert!(timed_out.is_err());
        assert!(assembler.can_submit());
    }
}
