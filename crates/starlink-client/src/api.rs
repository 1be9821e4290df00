//! Typed wrappers for the Enterprise API endpoints
//!
//! Each method is a thin argument-to-request translation over
//! [`StarlinkClient::execute`]; no business logic lives here. The account
//! overview is the one exception: it fans out three list calls concurrently
//! and folds the outcomes into a summary, tolerating per-branch failure.

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::warn;

use crate::client::StarlinkClient;
use crate::error::ClientResult;

/// Page size used by the overview fan-out
const OVERVIEW_PAGE_SIZE: u32 = 100;

impl StarlinkClient {
    pub async fn list_user_terminals(&self, page: u32, page_size: u32) -> ClientResult<Value> {
        let query =
            [("page".to_string(), page.to_string()), ("pageSize".to_string(), page_size.to_string())];
        self.execute(Method::GET, "/user-terminals", Some(&query), None).await
    }

    pub async fn get_terminal_details(&self, user_terminal_id: &str) -> ClientResult<Value> {
        self.execute(Method::GET, &format!("/user-terminals/{}", user_terminal_id), None, None)
            .await
    }

    pub async fn get_terminal_telemetry(&self, user_terminal_id: &str) -> ClientResult<Value> {
        self.execute(
            Method::GET,
            &format!("/user-terminals/{}/telemetry", user_terminal_id),
            None,
            None,
        )
        .await
    }

    pub async fn get_terminal_history(
        &self,
        user_terminal_id: &str,
        start_time: &str,
        end_time: &str,
    ) -> ClientResult<Value> {
        let query = [
            ("startTime".to_string(), start_time.to_string()),
            ("endTime".to_string(), end_time.to_string()),
        ];
        self.execute(
            Method::GET,
            &format!("/user-terminals/{}/history", user_terminal_id),
            Some(&query),
            None,
        )
        .await
    }

    pub async fn list_service_lines(&self, page: u32, page_size: u32) -> ClientResult<Value> {
        let query =
            [("page".to_string(), page.to_string()), ("pageSize".to_string(), page_size.to_string())];
        self.execute(Method::GET, "/service-lines", Some(&query), None).await
    }

    pub async fn get_service_line_details(&self, service_line_id: &str) -> ClientResult<Value> {
        self.execute(Method::GET, &format!("/service-lines/{}", service_line_id), None, None).await
    }

    pub async fn get_data_usage(
        &self,
        service_line_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> ClientResult<Value> {
        let query = [
            ("startDate".to_string(), start_date.to_string()),
            ("endDate".to_string(), end_date.to_string()),
        ];
        self.execute(
            Method::GET,
            &format!("/service-lines/{}/data-usage", service_line_id),
            Some(&query),
            None,
        )
        .await
    }

    pub async fn list_addresses(&self, page: u32) -> ClientResult<Value> {
        let query = [("page".to_string(), page.to_string())];
        self.execute(Method::GET, "/addresses", Some(&query), None).await
    }

    pub async fn get_address_details(&self, address_id: &str) -> ClientResult<Value> {
        self.execute(Method::GET, &format!("/addresses/{}", address_id), None, None).await
    }

    pub async fn check_service_availability(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> ClientResult<Value> {
        let query = [
            ("latitude".to_string(), latitude.to_string()),
            ("longitude".to_string(), longitude.to_string()),
        ];
        self.execute(Method::GET, "/availability", Some(&query), None).await
    }

    pub async fn list_subscription_products(&self) -> ClientResult<Value> {
        self.execute(Method::GET, "/subscription-products", None, None).await
    }

    /// Build a complete account overview from three concurrent list calls.
    ///
    /// A partial overview beats no overview: failed branches are embedded as
    /// `{"error": ...}` and counted as zero instead of failing the whole call.
    pub async fn account_overview(&self) -> Value {
        let (terminals, service_lines, addresses) = tokio::join!(
            self.list_user_terminals(1, OVERVIEW_PAGE_SIZE),
            self.list_service_lines(1, OVERVIEW_PAGE_SIZE),
            self.list_addresses(1),
        );

        json!({
            "account_summary": {
                "generated_at": Utc::now().to_rfc3339(),
                "total_terminals": result_count(&terminals),
                "total_service_lines": result_count(&service_lines),
                "total_addresses": result_count(&addresses),
            },
            "terminals": embed(terminals),
            "service_lines": embed(service_lines),
            "addresses": embed(addresses),
        })
    }
}

/// Number of items in a list payload's `results` array; 0 for failures or
/// unexpected shapes.
fn result_count(outcome: &ClientResult<Value>) -> usize {
    outcome
        .as_ref()
        .ok()
        .and_then(|payload| payload.get("results"))
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

fn embed(outcome: ClientResult<Value>) -> Value {
    match outcome {
        Ok(payload) => payload,
        Err(err) => {
            warn!("overview branch failed: {}", err);
            json!({"error": err.to_string()})
        }
    }
}
