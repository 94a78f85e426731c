use crate::domain::model::{
    AbilityLevel, Binding, BootDescriptor, BootSource, BootSummary, Condition, Customer,
    EquipmentDescriptor, EquipmentSource, EquipmentSummary, MountSpec, Service, ServiceItem,
    ServiceType, SkiModel, SkierProfile,
};
use crate::domain::ports::IntakeApi;
use crate::utils::error::{IntakeError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range};

const BOOT_INFO_REQUIRED: &str = "All boot information is required for mount services";

/// Ski-model catalog used for brand/model pickers and length auto-fill.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: Vec<SkiModel>,
}

impl ModelCatalog {
    pub fn new(models: Vec<SkiModel>) -> Self {
        Self { models }
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Distinct brands in first-seen order.
    pub fn brands(&self) -> Vec<&str> {
        let mut brands: Vec<&str> = Vec::new();
        for model in &self.models {
            if !brands.contains(&model.brand.as_str()) {
                brands.push(&model.brand);
            }
        }
        brands
    }

    pub fn models_for<'a>(&'a self, brand: &'a str) -> impl Iterator<Item = &'a SkiModel> + 'a {
        self.models.iter().filter(move |m| m.brand == brand)
    }

    pub fn find(&self, brand: &str, model: &str) -> Option<&SkiModel> {
        self.models
            .iter()
            .find(|m| m.brand == brand && m.model == model)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEquipmentDraft {
    pub brand: String,
    pub model: String,
    pub condition: Option<Condition>,
    pub ability_level: Option<AbilityLevel>,
    pub length: Option<u32>,
}

/// Existing-vs-new equipment choice while the item is being filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EquipmentChoice {
    #[default]
    Unset,
    Existing(i64),
    New(NewEquipmentDraft),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBootDraft {
    pub brand: String,
    pub model: String,
    pub bsl: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BootChoice {
    #[default]
    Unset,
    Existing(i64),
    New(NewBootDraft),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub height_inches: Option<u32>,
    pub weight: Option<u32>,
    pub age: Option<u32>,
    pub ability_level: Option<AbilityLevel>,
}

/// One service item being filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    pub service_type: Option<ServiceType>,
    pub equipment: EquipmentChoice,
    pub boot: BootChoice,
    pub binding_brand: String,
    pub binding_model: String,
    pub profile: ProfileDraft,
}

fn field(index: usize, name: &str) -> String {
    format!("items[{}].{}", index, name)
}

impl ItemDraft {
    pub fn is_pristine(&self) -> bool {
        *self == ItemDraft::default()
    }

    /// Turns the draft into a typed item, reporting the first violation.
    pub fn build(&self, index: usize) -> Result<ServiceItem> {
        let service_type = self.service_type.ok_or_else(|| {
            IntakeError::validation(
                field(index, "serviceType"),
                "Please select a service type for all equipment items",
            )
        })?;

        let equipment = match &self.equipment {
            EquipmentChoice::Unset => {
                return Err(IntakeError::validation(
                    field(index, "equipment"),
                    "Please select existing equipment or create new equipment for all items",
                ))
            }
            EquipmentChoice::Existing(id) => EquipmentSource::Existing(*id),
            EquipmentChoice::New(draft) => EquipmentSource::New(EquipmentDescriptor {
                brand: draft.brand.trim().to_string(),
                model: draft.model.trim().to_string(),
                condition: draft.condition.ok_or_else(|| {
                    IntakeError::validation(
                        field(index, "newEquipment.condition"),
                        "Condition is required for new equipment",
                    )
                })?,
                ability_level: draft.ability_level.ok_or_else(|| {
                    IntakeError::validation(
                        field(index, "newEquipment.abilityLevel"),
                        "Ability level is required for new equipment",
                    )
                })?,
                length: draft.length,
            }),
        };

        let service = match service_type {
            ServiceType::Tune => Service::Tune,
            ServiceType::Repair => Service::Repair,
            ServiceType::Mount => Service::Mount(self.build_mount(index)?),
        };

        let item = ServiceItem::new(equipment, service);
        validate_item(&item, index)?;
        Ok(item)
    }

    fn build_mount(&self, index: usize) -> Result<MountSpec> {
        let binding_model = self.binding_model.trim();
        let binding = Binding {
            brand: self.binding_brand.trim().to_string(),
            model: (!binding_model.is_empty()).then(|| binding_model.to_string()),
        };

        let boot = match &self.boot {
            BootChoice::Unset => {
                return Err(IntakeError::validation(field(index, "boot"), BOOT_INFO_REQUIRED))
            }
            BootChoice::Existing(id) => BootSource::Existing(*id),
            BootChoice::New(draft) => {
                let missing = |name: &str| IntakeError::validation(field(index, name), BOOT_INFO_REQUIRED);
                let profile = &self.profile;
                BootSource::New {
                    boot: BootDescriptor {
                        brand: draft.brand.trim().to_string(),
                        model: draft.model.trim().to_string(),
                        bsl: draft.bsl.ok_or_else(|| missing("bsl"))?,
                    },
                    profile: SkierProfile {
                        height_inches: profile.height_inches.ok_or_else(|| missing("heightInches"))?,
                        weight: profile.weight.ok_or_else(|| missing("weight"))?,
                        age: profile.age.ok_or_else(|| missing("age"))?,
                        ability_level: profile
                            .ability_level
                            .ok_or_else(|| missing("skiAbilityLevel"))?,
                    },
                }
            }
        };

        Ok(MountSpec { boot, binding })
    }
}

/// Checks a typed item's contents. Runs on every add and again before submission.
pub fn validate_item(item: &ServiceItem, index: usize) -> Result<()> {
    if let EquipmentSource::New(descriptor) = &item.equipment {
        validate_non_empty_string(&field(index, "newEquipment.brand"), &descriptor.brand)?;
        validate_non_empty_string(&field(index, "newEquipment.model"), &descriptor.model)?;
    }

    if let Service::Mount(mount) = &item.service {
        if mount.binding.brand.trim().is_empty() {
            return Err(IntakeError::validation(
                field(index, "bindingBrand"),
                "Binding brand is required for mount services",
            ));
        }
        if let BootSource::New { boot, profile } = &mount.boot {
            let incomplete = boot.brand.trim().is_empty()
                || boot.model.trim().is_empty()
                || boot.bsl == 0
                || profile.height_inches == 0
                || profile.weight == 0
                || profile.age == 0;
            if incomplete {
                return Err(IntakeError::validation(field(index, "boot"), BOOT_INFO_REQUIRED));
            }
        }
    }
    Ok(())
}

/// Validates the whole list before the workflow may proceed.
pub fn validate_items(items: &[ServiceItem]) -> Result<()> {
    if items.is_empty() {
        return Err(IntakeError::validation(
            "items",
            "At least one equipment item is required",
        ));
    }
    items
        .iter()
        .enumerate()
        .try_for_each(|(index, item)| validate_item(item, index))
}

/// Collects the service items for one work order, one draft at a time.
#[derive(Debug, Clone, Default)]
pub struct EquipmentItemBuilder {
    catalog: ModelCatalog,
    existing_equipment: Vec<EquipmentSummary>,
    existing_boots: Vec<BootSummary>,
    draft: ItemDraft,
    items: Vec<(u64, ServiceItem)>,
    next_id: u64,
}

impl EquipmentItemBuilder {
    pub fn new(
        catalog: ModelCatalog,
        existing_equipment: Vec<EquipmentSummary>,
        existing_boots: Vec<BootSummary>,
    ) -> Self {
        Self {
            catalog,
            existing_equipment,
            existing_boots,
            ..Self::default()
        }
    }

    /// Loads the customer's equipment, boots and the model catalog.
    ///
    /// A missing catalog only disables auto-fill; equipment and boot lookups must succeed.
    pub async fn load<A: IntakeApi>(api: &A, customer: &Customer) -> Result<Self> {
        let (equipment, boots) = match customer.id {
            Some(id) => (api.customer_equipment(id).await?, api.customer_boots(id).await?),
            None => (Vec::new(), Vec::new()),
        };

        let models = match api.ski_models().await {
            Ok(models) => models,
            Err(e) => {
                tracing::info!("Ski models not available: {}", e);
                Vec::new()
            }
        };

        tracing::debug!(
            "Loaded {} equipment item(s), {} boot(s), {} catalog model(s)",
            equipment.len(),
            boots.len(),
            models.len()
        );
        Ok(Self::new(ModelCatalog::new(models), equipment, boots))
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn existing_equipment(&self) -> &[EquipmentSummary] {
        &self.existing_equipment
    }

    pub fn existing_boots(&self) -> &[BootSummary] {
        &self.existing_boots
    }

    pub fn draft(&self) -> &ItemDraft {
        &self.draft
    }

    pub fn items(&self) -> impl Iterator<Item = (u64, &ServiceItem)> {
        self.items.iter().map(|(id, item)| (*id, item))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn requires_agreement(&self) -> bool {
        self.items.iter().any(|(_, item)| item.is_mount())
    }

    fn draft_index(&self) -> usize {
        self.items.len()
    }

    fn require_service(&self) -> Result<ServiceType> {
        self.draft.service_type.ok_or_else(|| {
            IntakeError::validation(
                field(self.draft_index(), "serviceType"),
                "Select a service type first",
            )
        })
    }

    fn require_mount(&self, name: &str) -> Result<()> {
        if self.require_service()? != ServiceType::Mount {
            return Err(IntakeError::validation(
                field(self.draft_index(), name),
                "Only applies to mount services",
            ));
        }
        Ok(())
    }

    fn new_equipment_mut(&mut self) -> Result<&mut NewEquipmentDraft> {
        let index = self.draft_index();
        match &mut self.draft.equipment {
            EquipmentChoice::New(draft) => Ok(draft),
            _ => Err(IntakeError::validation(
                field(index, "newEquipment"),
                "Choose to create new equipment first",
            )),
        }
    }

    fn new_boot_mut(&mut self) -> Result<&mut NewBootDraft> {
        self.require_mount("boot")?;
        let index = self.draft_index();
        match &mut self.draft.boot {
            BootChoice::New(draft) => Ok(draft),
            _ => Err(IntakeError::validation(
                field(index, "boot"),
                "Choose to add a new boot first",
            )),
        }
    }

    fn profile_mut(&mut self) -> Result<&mut ProfileDraft> {
        self.require_mount("profile")?;
        if !matches!(self.draft.boot, BootChoice::New(_)) {
            return Err(IntakeError::validation(
                field(self.draft_index(), "profile"),
                "The skier profile is only collected for a new boot",
            ));
        }
        Ok(&mut self.draft.profile)
    }

    pub fn select_service(&mut self, service_type: ServiceType) {
        if service_type != ServiceType::Mount {
            self.draft.boot = BootChoice::Unset;
            self.draft.binding_brand.clear();
            self.draft.binding_model.clear();
            self.draft.profile = ProfileDraft::default();
        }
        self.draft.service_type = Some(service_type);
    }

    pub fn use_existing_equipment(&mut self, equipment_id: i64) -> Result<()> {
        self.require_service()?;
        if !self.existing_equipment.iter().any(|e| e.id == equipment_id) {
            return Err(IntakeError::validation(
                field(self.draft_index(), "equipmentId"),
                format!("Equipment {} is not on file for this customer", equipment_id),
            ));
        }
        self.draft.equipment = EquipmentChoice::Existing(equipment_id);
        Ok(())
    }

    pub fn start_new_equipment(&mut self) -> Result<()> {
        self.require_service()?;
        self.draft.equipment = EquipmentChoice::New(NewEquipmentDraft::default());
        Ok(())
    }

    /// Changing brand clears the model, and any length taken from the catalog.
    pub fn set_new_brand(&mut self, brand: &str) -> Result<()> {
        let catalog_driven = !self.catalog.is_empty();
        let draft = self.new_equipment_mut()?;
        draft.brand = brand.to_string();
        draft.model.clear();
        if catalog_driven {
            draft.length = None;
        }
        Ok(())
    }

    pub fn set_new_model(&mut self, model: &str) -> Result<()> {
        let catalog_length = {
            let brand = match &self.draft.equipment {
                EquipmentChoice::New(draft) => draft.brand.clone(),
                _ => String::new(),
            };
            self.catalog.find(&brand, model).map(|m| m.length)
        };
        let draft = self.new_equipment_mut()?;
        draft.model = model.to_string();
        if let Some(length) = catalog_length {
            draft.length = length;
        }
        Ok(())
    }

    /// Length is editable only when the catalog has no entry for the model.
    pub fn set_new_length(&mut self, length: Option<u32>) -> Result<()> {
        let index = self.draft_index();
        let locked = match &self.draft.equipment {
            EquipmentChoice::New(draft) => self.catalog.find(&draft.brand, &draft.model).is_some(),
            _ => false,
        };
        if locked {
            return Err(IntakeError::validation(
                field(index, "newEquipment.length"),
                "Length is set from the selected model",
            ));
        }
        self.new_equipment_mut()?.length = length;
        Ok(())
    }

    pub fn set_new_condition(&mut self, condition: Condition) -> Result<()> {
        self.new_equipment_mut()?.condition = Some(condition);
        Ok(())
    }

    pub fn set_new_ability_level(&mut self, ability_level: AbilityLevel) -> Result<()> {
        self.new_equipment_mut()?.ability_level = Some(ability_level);
        Ok(())
    }

    /// Boots offered for a mount: those tied to the chosen existing equipment,
    /// else the customer's boots.
    pub async fn mount_boot_options<A: IntakeApi>(&self, api: &A) -> Vec<BootSummary> {
        if let EquipmentChoice::Existing(equipment_id) = self.draft.equipment {
            match api.equipment_boots(equipment_id).await {
                Ok(boots) if !boots.is_empty() => return boots,
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to load boots for equipment {}: {}", equipment_id, e),
            }
        }
        self.existing_boots.clone()
    }

    pub fn use_existing_boot(&mut self, boot_id: i64) -> Result<()> {
        self.require_mount("bootId")?;
        self.draft.boot = BootChoice::Existing(boot_id);
        self.draft.profile = ProfileDraft::default();
        Ok(())
    }

    pub fn start_new_boot(&mut self) -> Result<()> {
        self.require_mount("boot")?;
        self.draft.boot = BootChoice::New(NewBootDraft::default());
        Ok(())
    }

    pub fn set_boot_brand(&mut self, brand: &str) -> Result<()> {
        self.new_boot_mut()?.brand = brand.to_string();
        Ok(())
    }

    pub fn set_boot_model(&mut self, model: &str) -> Result<()> {
        self.new_boot_mut()?.model = model.to_string();
        Ok(())
    }

    pub fn set_bsl(&mut self, bsl: u32) -> Result<()> {
        self.new_boot_mut()?.bsl = Some(bsl);
        Ok(())
    }

    pub fn set_binding_brand(&mut self, brand: &str) -> Result<()> {
        self.require_mount("bindingBrand")?;
        self.draft.binding_brand = brand.to_string();
        Ok(())
    }

    pub fn set_binding_model(&mut self, model: &str) -> Result<()> {
        self.require_mount("bindingModel")?;
        self.draft.binding_model = model.to_string();
        Ok(())
    }

    pub fn set_height_inches(&mut self, inches: u32) -> Result<()> {
        self.profile_mut()?.height_inches = Some(inches);
        Ok(())
    }

    pub fn set_height(&mut self, feet: u32, inches: u32) -> Result<()> {
        let index = self.draft_index();
        validate_range(&field(index, "inches"), inches, 0, 11)?;
        let total = feet
            .checked_mul(12)
            .and_then(|v| v.checked_add(inches))
            .ok_or_else(|| {
                IntakeError::validation(field(index, "heightInches"), "Height is out of range")
            })?;
        self.set_height_inches(total)
    }

    pub fn set_weight(&mut self, weight: u32) -> Result<()> {
        self.profile_mut()?.weight = Some(weight);
        Ok(())
    }

    pub fn set_age(&mut self, age: u32) -> Result<()> {
        self.profile_mut()?.age = Some(age);
        Ok(())
    }

    pub fn set_skier_ability_level(&mut self, ability_level: AbilityLevel) -> Result<()> {
        self.profile_mut()?.ability_level = Some(ability_level);
        Ok(())
    }

    pub fn discard_draft(&mut self) {
        self.draft = ItemDraft::default();
    }

    /// Validates the draft, appends it and starts a fresh one. Returns the new item's id.
    pub fn add_item(&mut self) -> Result<u64> {
        let item = self.draft.build(self.draft_index())?;
        let id = self.next_id;
        self.next_id += 1;

        tracing::info!(
            "Added {} item #{} ({} total)",
            item.service_type().as_str(),
            id,
            self.items.len() + 1
        );
        self.items.push((id, item));
        self.draft = ItemDraft::default();
        Ok(id)
    }

    /// Removes an item, unless it is the only one left.
    pub fn remove_item(&mut self, id: u64) -> Result<ServiceItem> {
        let position = self
            .items
            .iter()
            .position(|(item_id, _)| *item_id == id)
            .ok_or_else(|| IntakeError::validation("items", format!("No item with id {}", id)))?;

        if self.items.len() <= 1 {
            return Err(IntakeError::validation(
                "items",
                "A work order needs at least one equipment item",
            ));
        }

        let (_, item) = self.items.remove(position);
        tracing::debug!("Removed item #{} ({} left)", id, self.items.len());
        Ok(item)
    }

    /// Final check before moving on. An unsaved, partly filled draft blocks.
    pub fn finalize(&self) -> Result<Vec<ServiceItem>> {
        if !self.draft.is_pristine() {
            return Err(IntakeError::validation(
                field(self.draft_index(), "draft"),
                "Add or discard the item in progress before continuing",
            ));
        }
        let items: Vec<ServiceItem> = self.items.iter().map(|(_, item)| item.clone()).collect();
        validate_items(&items)?;
        Ok(items)
    }
}
