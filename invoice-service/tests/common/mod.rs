use billing_core::config::Config as CoreConfig;
use invoice_service::config::{InvoiceConfig, MongoConfig};
use invoice_service::services::MemoryStore;
use invoice_service::startup::Application;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn the service on a random port over the in-memory store.
    pub async fn spawn() -> Self {
        let config = InvoiceConfig {
            common: CoreConfig { port: 0 },
            mongodb: MongoConfig {
                uri: "mongodb://localhost:27017".to_string(),
                database: format!("invoice_test_{}", uuid::Uuid::new_v4()),
            },
        };

        let app = Application::with_store(config, Arc::new(MemoryStore::new()))
            .await
            .expect("Failed to build test application");
        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp { address, client }
    }

    pub async fn create_tax(&self, name: &str, rate: &str) -> serde_json::Value {
        let response = self
            .client
            .post(format!("{}/taxes", self.address))
            .json(&json!({ "name": name, "rate": rate }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.expect("Failed to parse tax response")
    }

    pub async fn create_invoice(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/invoices", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_invoice(&self, invoice_number: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/invoices/{}", self.address, invoice_number))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn add_service(
        &self,
        invoice_number: &str,
        body: serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .post(format!(
                "{}/invoices/{}/services",
                self.address, invoice_number
            ))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn remove_service(
        &self,
        invoice_number: &str,
        service_id: &str,
    ) -> reqwest::Response {
        self.client
            .delete(format!(
                "{}/invoices/{}/services/{}",
                self.address, invoice_number, service_id
            ))
            .send()
            .await
            .expect("Failed to execute request")
    }
}
