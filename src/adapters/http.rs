use crate::config::ApiConfig;
use crate::domain::model::{BootSummary, Customer, EquipmentSummary, NewCustomer, SkiModel};
use crate::domain::ports::{
    CreateOutcome, CustomerQuery, IntakeApi, SignAgreementReceipt, SignAgreementRequest,
    WorkOrderRequest,
};
use crate::utils::error::{IntakeError, Result};
use crate::utils::validation::validate_url;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedBody {
    work_order_id: i64,
}

/// `IntakeApi` over the shop's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpIntakeApi {
    client: Client,
    base_url: Url,
}

impl HttpIntakeApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = validate_url("api.base_url", &config.base_url)?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| IntakeError::Config {
            field: "api.base_url".to_string(),
            message: format!("Cannot build URL for {}: {}", path, e),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::json_or_error(response).await
    }

    async fn json_or_error<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::api_error(status, response).await)
        }
    }

    async fn api_error(status: StatusCode, response: Response) -> IntakeError {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
        IntakeError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait::async_trait]
impl IntakeApi for HttpIntakeApi {
    async fn search_customers(&self, query: &CustomerQuery) -> Result<Vec<Customer>> {
        let mut url = self.endpoint("api/customers/search")?;
        let (key, value) = query.param();
        url.query_pairs_mut().append_pair(key, value);
        self.get_json(url).await
    }

    async fn lookup_customer(&self, email: &str, phone: &str) -> Result<Option<Customer>> {
        let mut url = self.endpoint("api/customers/lookup")?;
        url.query_pairs_mut()
            .append_pair("email", email)
            .append_pair("phone", phone);

        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
            _ => Self::json_or_error(response).await.map(Some),
        }
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        let url = self.endpoint("api/customers")?;
        tracing::debug!("POST {}", url);
        let response = self.client.post(url).json(customer).send().await?;
        Self::json_or_error(response).await
    }

    async fn customer_equipment(&self, customer_id: i64) -> Result<Vec<EquipmentSummary>> {
        let url = self.endpoint(&format!("api/customers/{}/equipment", customer_id))?;
        self.get_json(url).await
    }

    async fn customer_boots(&self, customer_id: i64) -> Result<Vec<BootSummary>> {
        let url = self.endpoint(&format!("api/customers/{}/boots", customer_id))?;
        self.get_json(url).await
    }

    async fn ski_models(&self) -> Result<Vec<SkiModel>> {
        let url = self.endpoint("api/ski-models")?;
        self.get_json(url).await
    }

    async fn equipment_boots(&self, equipment_id: i64) -> Result<Vec<BootSummary>> {
        let url = self.endpoint(&format!(
            "api/public/workorders/equipment/{}/boots",
            equipment_id
        ))?;
        self.get_json(url).await
    }

    async fn create_work_order(&self, request: &WorkOrderRequest) -> Result<CreateOutcome> {
        let url = self.endpoint("api/public/workorders")?;
        tracing::debug!("POST {} with {} item(s)", url, request.equipment.len());
        let response = self.client.post(url).json(request).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| "Daily work order limit reached".to_string());
            return Ok(CreateOutcome::LimitReached { message });
        }

        let body: CreatedBody = Self::json_or_error(response).await?;
        Ok(CreateOutcome::Created {
            work_order_id: body.work_order_id,
        })
    }

    async fn sign_agreement(
        &self,
        work_order_id: i64,
        request: &SignAgreementRequest,
    ) -> Result<SignAgreementReceipt> {
        let url = self.endpoint(&format!(
            "api/public/workorders/{}/sign-agreement",
            work_order_id
        ))?;
        tracing::debug!("POST {}", url);
        let response = self.client.post(url).json(request).send().await?;
        Self::json_or_error(response).await
    }
}
