use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// Input for creating a customer; same identity fields, no id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    New,
    Used,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "NEW",
            Condition::Used => "USED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbilityLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Tune,
    Mount,
    Repair,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Tune => "TUNE",
            ServiceType::Mount => "MOUNT",
            ServiceType::Repair => "REPAIR",
        }
    }
}

/// Per-item lifecycle stage. Order matters: later variants are further along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    InProgress,
    Ready,
    Complete,
}

/// Aggregate work-order status, always derived from item statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    #[serde(alias = "RECEIVED")]
    Pending,
    InProgress,
    Ready,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentDescriptor {
    pub brand: String,
    pub model: String,
    pub condition: Condition,
    pub ability_level: AbilityLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
}

/// Either an equipment record on file or a description of one to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquipmentSource {
    Existing(i64),
    New(EquipmentDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootDescriptor {
    pub brand: String,
    pub model: String,
    /// Boot sole length in millimetres.
    pub bsl: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkierProfile {
    pub height_inches: u32,
    pub weight: u32,
    pub age: u32,
    pub ability_level: AbilityLevel,
}

/// A new boot always carries the skier profile; an existing boot already has one on file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootSource {
    Existing(i64),
    New {
        boot: BootDescriptor,
        profile: SkierProfile,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub boot: BootSource,
    pub binding: Binding,
}

/// Service requested for one item. Mount-only data lives inside `Mount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Service {
    Tune,
    Repair,
    Mount(MountSpec),
}

impl Service {
    pub fn service_type(&self) -> ServiceType {
        match self {
            Service::Tune => ServiceType::Tune,
            Service::Repair => ServiceType::Repair,
            Service::Mount(_) => ServiceType::Mount,
        }
    }

    pub fn mount(&self) -> Option<&MountSpec> {
        match self {
            Service::Mount(spec) => Some(spec),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceItem {
    pub equipment: EquipmentSource,
    pub service: Service,
    pub status: ItemStatus,
}

impl ServiceItem {
    pub fn new(equipment: EquipmentSource, service: Service) -> Self {
        Self {
            equipment,
            service,
            status: ItemStatus::Pending,
        }
    }

    pub fn service_type(&self) -> ServiceType {
        self.service.service_type()
    }

    pub fn is_mount(&self) -> bool {
        matches!(self.service, Service::Mount(_))
    }
}

/// Equipment already on file for a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentSummary {
    pub id: i64,
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub ability_level: Option<AbilityLevel>,
}

impl EquipmentSummary {
    pub fn label(&self) -> String {
        let mut label = format!("{} {}", self.brand, self.model);
        if let Some(length) = self.length {
            label.push_str(&format!(" ({}cm)", length));
        }
        if let Some(condition) = self.condition {
            label.push_str(" - ");
            label.push_str(condition.as_str());
        }
        label
    }
}

/// Boot already on file, with the skier profile recorded alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootSummary {
    pub id: i64,
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub bsl: Option<u32>,
    #[serde(default)]
    pub height_inches: Option<u32>,
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub ability_level: Option<AbilityLevel>,
}

/// One entry of the ski-model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkiModel {
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub length: Option<u32>,
}
