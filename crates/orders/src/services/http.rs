//! HTTP adapters for the cart and medicine services.

use std::time::Duration;

use async_trait::async_trait;
use common::{MedicineId, Money, UserId};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;

use super::{CartClient, CartLine, MedicineClient, MedicineSnapshot, UpstreamError};

const CART: &str = "cart";
const MEDICINE: &str = "medicine";

fn build_client(service: &'static str, timeout: Duration) -> Result<Client, UpstreamError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| UpstreamError::Unavailable {
            service,
            reason: e.to_string(),
        })
}

fn parse_base_url(service: &'static str, base_url: &str) -> Result<Url, UpstreamError> {
    let url = Url::parse(base_url).map_err(|e| UpstreamError::Unavailable {
        service,
        reason: format!("invalid base url {base_url}: {e}"),
    })?;
    if url.cannot_be_a_base() {
        return Err(UpstreamError::Unavailable {
            service,
            reason: format!("invalid base url {base_url}"),
        });
    }
    Ok(url)
}

/// Appends path segments to `base`, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn transport_error(service: &'static str, error: reqwest::Error) -> UpstreamError {
    UpstreamError::Unavailable {
        service,
        reason: error.to_string(),
    }
}

/// Turns a non-success response into `Rejected`, carrying the body as message.
async fn ensure_success(service: &'static str, response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(UpstreamError::Rejected {
        service,
        status: status.as_u16(),
        message,
    })
}

/// Cart service client speaking the cart REST contract.
#[derive(Debug, Clone)]
pub struct HttpCartClient {
    client: Client,
    base_url: Url,
}

impl HttpCartClient {
    /// Creates a client for the cart service at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: build_client(CART, timeout)?,
            base_url: parse_base_url(CART, base_url)?,
        })
    }
}

#[async_trait]
impl CartClient for HttpCartClient {
    #[tracing::instrument(skip(self), fields(service = CART))]
    async fn get_cart(&self, user_id: UserId) -> Result<Vec<CartLine>, UpstreamError> {
        let response = self
            .client
            .get(endpoint(&self.base_url, &["api", "cart", "user"]))
            .header("id", user_id.to_string())
            .send()
            .await
            .map_err(|e| transport_error(CART, e))?;
        let body = ensure_success(CART, response)
            .await?
            .text()
            .await
            .map_err(|e| transport_error(CART, e))?;

        // The cart service answers an empty body when the user has no cart.
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let lines: Option<Vec<CartLine>> =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Decode {
                service: CART,
                reason: e.to_string(),
            })?;
        Ok(lines.unwrap_or_default())
    }

    #[tracing::instrument(skip(self), fields(service = CART))]
    async fn clear(&self, user_id: UserId) -> Result<(), UpstreamError> {
        let response = self
            .client
            .delete(endpoint(&self.base_url, &["api", "cart", "clear"]))
            .header("id", user_id.to_string())
            .send()
            .await
            .map_err(|e| transport_error(CART, e))?;
        ensure_success(CART, response).await?;
        Ok(())
    }
}

/// Medicine as returned by the medicine service.
#[derive(Debug, Deserialize)]
struct MedicineResponse {
    id: String,
    name: String,
    price: f64,
    quantity: i64,
}

impl MedicineResponse {
    fn into_snapshot(self) -> Result<MedicineSnapshot, UpstreamError> {
        let available_quantity = u32::try_from(self.quantity.max(0)).map_err(|_| {
            UpstreamError::Decode {
                service: MEDICINE,
                reason: format!("quantity {} out of range", self.quantity),
            }
        })?;
        Ok(MedicineSnapshot {
            medicine_id: MedicineId::new(self.id),
            name: self.name,
            price: Money::from_decimal(self.price),
            available_quantity,
        })
    }
}

/// Medicine service client speaking the medicine REST contract.
#[derive(Debug, Clone)]
pub struct HttpMedicineClient {
    client: Client,
    base_url: Url,
}

impl HttpMedicineClient {
    /// Creates a client for the medicine service at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: build_client(MEDICINE, timeout)?,
            base_url: parse_base_url(MEDICINE, base_url)?,
        })
    }

    async fn decode(response: Response) -> Result<MedicineSnapshot, UpstreamError> {
        let medicine: MedicineResponse =
            response.json().await.map_err(|e| UpstreamError::Decode {
                service: MEDICINE,
                reason: e.to_string(),
            })?;
        medicine.into_snapshot()
    }

    async fn adjust_stock(
        &self,
        action: &str,
        medicine_id: &MedicineId,
        quantity: u32,
    ) -> Result<MedicineSnapshot, UpstreamError> {
        let response = self
            .client
            .put(endpoint(
                &self.base_url,
                &["api", "medicines", action, medicine_id.as_str()],
            ))
            .json(&quantity)
            .send()
            .await
            .map_err(|e| transport_error(MEDICINE, e))?;
        let response = ensure_success(MEDICINE, response).await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl MedicineClient for HttpMedicineClient {
    #[tracing::instrument(skip(self), fields(service = MEDICINE))]
    async fn get_snapshot(
        &self,
        medicine_id: &MedicineId,
    ) -> Result<Option<MedicineSnapshot>, UpstreamError> {
        let response = self
            .client
            .get(endpoint(
                &self.base_url,
                &["api", "medicines", medicine_id.as_str()],
            ))
            .send()
            .await
            .map_err(|e| transport_error(MEDICINE, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(MEDICINE, response).await?;
        Self::decode(response).await.map(Some)
    }

    #[tracing::instrument(skip(self), fields(service = MEDICINE))]
    async fn reduce_stock(
        &self,
        medicine_id: &MedicineId,
        quantity: u32,
    ) -> Result<MedicineSnapshot, UpstreamError> {
        self.adjust_stock("reduce", medicine_id, quantity).await
    }

    #[tracing::instrument(skip(self), fields(service = MEDICINE))]
    async fn restore_stock(
        &self,
        medicine_id: &MedicineId,
        quantity: u32,
    ) -> Result<MedicineSnapshot, UpstreamError> {
        self.adjust_stock("restore", medicine_id, quantity).await
    }
}
