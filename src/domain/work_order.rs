use crate::domain::model::{Customer, ItemStatus, ServiceItem, WorkOrderStatus};
use crate::domain::status::derive_status;
use crate::utils::error::{IntakeError, Result};
use chrono::{DateTime, Utc};

/// Legal-agreement state carried by a work order. Only the agreement gate
/// can produce an accepted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agreement {
    pub(crate) required: bool,
    pub(crate) accepted: bool,
    pub(crate) signature_name: Option<String>,
    /// Encoded signature as a data URL.
    pub(crate) signature_image: Option<String>,
    pub(crate) accepted_at: Option<DateTime<Utc>>,
    pub(crate) version: String,
}

impl Agreement {
    pub fn not_required(version: impl Into<String>) -> Self {
        Self {
            required: false,
            accepted: false,
            signature_name: None,
            signature_image: None,
            accepted_at: None,
            version: version.into(),
        }
    }

    pub fn pending(version: impl Into<String>) -> Self {
        Self {
            required: true,
            ..Self::not_required(version)
        }
    }

    pub(crate) fn signed(
        version: impl Into<String>,
        signature_name: String,
        signature_image: String,
        accepted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            required: true,
            accepted: true,
            signature_name: Some(signature_name),
            signature_image: Some(signature_image),
            accepted_at: Some(accepted_at),
            version: version.into(),
        }
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn accepted(&self) -> bool {
        self.accepted
    }

    pub fn signature_name(&self) -> Option<&str> {
        self.signature_name.as_deref()
    }

    pub fn signature_image(&self) -> Option<&str> {
        self.signature_image.as_deref()
    }

    pub fn accepted_at(&self) -> Option<DateTime<Utc>> {
        self.accepted_at
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Whether any item needs the mounting agreement.
pub fn requires_agreement(items: &[ServiceItem]) -> bool {
    items.iter().any(ServiceItem::is_mount)
}

/// A complete work order ready for submission. The aggregate status is never
/// stored; [`WorkOrder::status`] derives it from the items on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOrder {
    customer: Customer,
    items: Vec<ServiceItem>,
    agreement: Agreement,
}

impl WorkOrder {
    pub fn new(customer: Customer, items: Vec<ServiceItem>, agreement: Agreement) -> Result<Self> {
        if items.is_empty() {
            return Err(IntakeError::validation(
                "items",
                "At least one equipment item is required",
            ));
        }

        let mount_present = requires_agreement(&items);
        if agreement.required != mount_present {
            return Err(IntakeError::validation(
                "agreement.required",
                if mount_present {
                    "Mount services require the mounting agreement"
                } else {
                    "No mount service is present, so no agreement applies"
                },
            ));
        }
        if agreement.accepted && !agreement.required {
            return Err(IntakeError::validation(
                "agreement.accepted",
                "An agreement that is not required cannot be accepted",
            ));
        }

        Ok(Self {
            customer,
            items,
            agreement,
        })
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn items(&self) -> &[ServiceItem] {
        &self.items
    }

    pub fn agreement(&self) -> &Agreement {
        &self.agreement
    }

    pub fn status(&self) -> WorkOrderStatus {
        // `new` rejects empty item lists.
        derive_status(self.items.iter().map(|item| item.status)).unwrap_or(WorkOrderStatus::Pending)
    }

    pub fn set_item_status(&mut self, index: usize, status: ItemStatus) -> Result<()> {
        let item = self.items.get_mut(index).ok_or_else(|| {
            IntakeError::validation(format!("items[{}]", index), "No such item")
        })?;
        item.status = status;
        Ok(())
    }
}
