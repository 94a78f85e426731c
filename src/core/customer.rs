use crate::domain::model::{Customer, NewCustomer};
use crate::domain::ports::{CustomerQuery, IntakeApi};
use crate::utils::error::{IntakeError, Result};
use crate::utils::validation::{
    normalize_email, normalize_phone, validate_email, validate_non_empty_string, validate_phone,
};

/// Picks the search filter from the shape of the query text.
pub fn classify_query(query: &str) -> CustomerQuery {
    let query = query.trim();
    if query.contains('@') {
        CustomerQuery::Email(query.to_string())
    } else if !query.is_empty() && query.chars().all(|c| c.is_ascii_digit()) {
        CustomerQuery::Phone(query.to_string())
    } else {
        CustomerQuery::Name(query.to_string())
    }
}

/// Form state for a new customer; phone input is filtered as it is typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCustomerForm {
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
}

impl NewCustomerForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_first_name(&mut self, value: &str) {
        self.first_name = value.to_string();
    }

    pub fn set_last_name(&mut self, value: &str) {
        self.last_name = value.to_string();
    }

    pub fn set_email(&mut self, value: &str) {
        self.email = value.to_string();
    }

    pub fn set_phone(&mut self, raw: &str) {
        self.phone = normalize_phone(raw);
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Validates and returns the normalised customer data.
    pub fn build(&self) -> Result<NewCustomer> {
        let customer = NewCustomer {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: normalize_email(&self.email),
            phone: self.phone.clone(),
        };
        validate_new_customer(&customer)?;
        Ok(customer)
    }
}

pub fn validate_new_customer(customer: &NewCustomer) -> Result<()> {
    for (field, value) in [
        ("firstName", &customer.first_name),
        ("lastName", &customer.last_name),
        ("email", &customer.email),
        ("phone", &customer.phone),
    ] {
        validate_non_empty_string(field, value)
            .map_err(|_| IntakeError::validation(field, "All fields are required"))?;
    }
    validate_phone("phone", &customer.phone)?;
    validate_email("email", &customer.email)?;
    Ok(())
}

/// The operator's answer when a create attempt matches an existing customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateChoice {
    UseExisting,
    Abort,
}

/// Finds or creates the customer a work order is for.
pub struct CustomerResolver<A: IntakeApi> {
    api: A,
}

impl<A: IntakeApi> CustomerResolver<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn search(&self, query: &CustomerQuery) -> Result<Vec<Customer>> {
        tracing::debug!("Searching customers by {}", query.param().0);
        self.api.search_customers(query).await
    }

    pub async fn lookup(&self, email: &str, phone: &str) -> Result<Option<Customer>> {
        self.api
            .lookup_customer(&normalize_email(email), &normalize_phone(phone))
            .await
    }

    /// Validates, checks for a duplicate, then creates.
    ///
    /// A match on email/phone is returned as [`IntakeError::DuplicateCustomer`]
    /// and no create call is made; the caller resolves it with
    /// [`CustomerResolver::resolve_duplicate`].
    pub async fn create(&self, customer: &NewCustomer) -> Result<Customer> {
        validate_new_customer(customer)?;

        if let Some(existing) = self.lookup(&customer.email, &customer.phone).await? {
            tracing::info!(
                "Customer with matching email/phone already exists (id {:?})",
                existing.id
            );
            return Err(IntakeError::DuplicateCustomer {
                existing: Box::new(existing),
            });
        }

        let created = self.api.create_customer(customer).await?;
        tracing::info!("Created customer {:?}", created.id);
        Ok(created)
    }

    pub fn resolve_duplicate(existing: Customer, choice: DuplicateChoice) -> Option<Customer> {
        match choice {
            DuplicateChoice::UseExisting => Some(existing),
            DuplicateChoice::Abort => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::MockApi;

    fn jane_form() -> NewCustomerForm {
        let mut form = NewCustomerForm::new();
        form.set_first_name("Jane");
        form.set_last_name("Doe");
        form.set_email("Jane@X.com ");
        form.set_phone("(555) 123-4567");
        form
    }

    #[test]
    fn test_classify_query() {
        assert_eq!(
            classify_query("jane@x.com"),
            CustomerQuery::Email("jane@x.com".to_string())
        );
        assert_eq!(
            classify_query("5551234"),
            CustomerQuery::Phone("5551234".to_string())
        );
        assert_eq!(
            classify_query("Jane Doe"),
            CustomerQuery::Name("Jane Doe".to_string())
        );
        assert_eq!(
            classify_query("555-1234"),
            CustomerQuery::Name("555-1234".to_string())
        );
    }

    #[test]
    fn test_form_filters_phone_and_normalises_email() {
        let mut form = jane_form();
        form.set_phone("(555) 123-4567x9");
        assert_eq!(form.phone(), "5551234567");

        let customer = form.build().unwrap();
        assert_eq!(customer.email, "jane@x.com");
        assert_eq!(customer.phone, "5551234567");
    }

    #[test]
    fn test_form_rejects_missing_and_malformed_fields() {
        let mut form = jane_form();
        form.set_last_name("  ");
        let err = form.build().unwrap_err();
        assert!(matches!(err, IntakeError::Validation { ref field, .. } if field == "lastName"));

        let mut form = jane_form();
        form.set_phone("555123");
        let err = form.build().unwrap_err();
        assert_eq!(err.user_message(), "Phone number must be 10 digits");

        let mut form = jane_form();
        form.set_email("jane.x.com");
        let err = form.build().unwrap_err();
        assert_eq!(err.user_message(), "Invalid email address");
    }

    #[tokio::test]
    async fn test_create_halts_on_duplicate() {
        let api = MockApi::new();
        let existing = MockApi::jane();
        api.set_lookup(Some(existing.clone()));
        let resolver = CustomerResolver::new(api.clone());

        let err = resolver
            .create(&jane_form().build().unwrap())
            .await
            .unwrap_err();

        match err {
            IntakeError::DuplicateCustomer { existing: found } => assert_eq!(*found, existing),
            other => panic!("expected duplicate, got {:?}", other),
        }
        assert_eq!(api.calls("create_customer"), 0);
        assert_eq!(api.calls("lookup_customer"), 1);
    }

    #[tokio::test]
    async fn test_create_when_no_match() {
        let api = MockApi::new();
        let resolver = CustomerResolver::new(api.clone());

        let created = resolver.create(&jane_form().build().unwrap()).await.unwrap();

        assert!(created.id.is_some());
        assert_eq!(api.calls("lookup_customer"), 1);
        assert_eq!(api.calls("create_customer"), 1);
    }

    #[tokio::test]
    async fn test_create_validates_before_any_call() {
        let api = MockApi::new();
        let resolver = CustomerResolver::new(api.clone());
        let invalid = NewCustomer {
            phone: "123".to_string(),
            ..jane_form().build().unwrap()
        };

        assert!(resolver.create(&invalid).await.is_err());
        assert_eq!(api.calls("lookup_customer"), 0);
    }

    #[test]
    fn test_resolve_duplicate_choice() {
        let existing = MockApi::jane();
        assert_eq!(
            CustomerResolver::<MockApi>::resolve_duplicate(existing.clone(), DuplicateChoice::UseExisting),
            Some(existing.clone())
        );
        assert_eq!(
            CustomerResolver::<MockApi>::resolve_duplicate(existing, DuplicateChoice::Abort),
            None
        );
    }
}
