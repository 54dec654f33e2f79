//! Dashboard read operations. Nothing is cached; every call hits the backend.

use crate::client::{Access, ApiClient};
use crate::error::ApiError;
use crate::models::{Reading, ReadingFilter, ServerStatus, StatsSnapshot};

#[derive(Clone)]
pub struct DashboardService {
    client: ApiClient,
}

impl DashboardService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `GET /dashboard`
    pub async fn get_stats(&self) -> Result<StatsSnapshot, ApiError> {
        self.client.get("dashboard", &[], Access::Authenticated).await
    }

    /// `GET /leituras?zona=&tipo_animal=`
    pub async fn get_readings(&self, filter: &ReadingFilter) -> Result<Vec<Reading>, ApiError> {
        self.client
            .get("leituras", &filter.query(), Access::Authenticated)
            .await
    }

    /// `GET /estatisticas/zona/{zone_id}`, returned as the backend sent it.
    pub async fn get_zone_statistics(&self, zone_id: i64) -> Result<serde_json::Value, ApiError> {
        self.client
            .get(&format!("estatisticas/zona/{}", zone_id), &[], Access::Authenticated)
            .await
    }

    /// `GET /status`, no credentials required.
    pub async fn server_status(&self) -> Result<ServerStatus, ApiError> {
        self.client.get("status", &[], Access::Public).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::models::LoginResponse;
    use crate::session::Session;
    use crate::storage::MemoryStorage;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_for(server: &MockServer) -> DashboardService {
        let session = Session::with_storage(Arc::new(MemoryStorage::new()));
        session
            .establish(&LoginResponse {
                access_token: "abc123".to_string(),
                token_type: "bearer".to_string(),
                username: "joao".to_string(),
                full_name: None,
            })
            .unwrap();
        let config = ClientConfig::default().with_api_url(&format!("{}/api", server.uri()));
        DashboardService::new(ApiClient::new(&config, session).unwrap())
    }

    fn reading(id: i64, zone: i64, animal: &str) -> serde_json::Value {
        json!({
            "id": id,
            "zona": zone,
            "tipo_animal": animal,
            "uid": format!("UID{:04}", id),
            "count": 1,
            "arduino": null,
            "timestamp": "2024-05-10T08:00:00"
        })
    }

    #[tokio::test]
    async fn test_get_stats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard"))
            .and(header("Authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_leituras": 3,
                "leituras_hoje": 1,
                "por_zona": {"zona_1": 2, "zona_2": 1},
                "por_tipo": {"vaquinha": 3},
                "ultimas_leituras": [reading(3, 2, "Vaquinha")]
            })))
            .mount(&server)
            .await;

        let stats = service_for(&server).get_stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.today, 1);
        assert_eq!(stats.by_zone.len(), 2);
        assert_eq!(stats.recent[0].zone, 2);
    }

    #[tokio::test]
    async fn test_get_readings_with_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/leituras"))
            .and(query_param("zona", "2"))
            .and(query_param("tipo_animal", "Ovelinha"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([reading(9, 2, "Ovelinha")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let filter = ReadingFilter::default().zone(2).animal_type("Ovelinha");
        let readings = service_for(&server).get_readings(&filter).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].animal_type, "Ovelinha");
        assert_eq!(readings[0].device, None);
    }

    #[tokio::test]
    async fn test_get_readings_without_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/leituras"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let readings = service_for(&server)
            .get_readings(&ReadingFilter::default())
            .await
            .unwrap();
        assert!(readings.is_empty());

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), None);
    }

    #[tokio::test]
    async fn test_zone_statistics_passthrough() {
        let server = MockServer::start().await;
        let blob = json!({
            "zona": 4,
            "total_leituras": 10,
            "por_tipo": {"Vaquinha": 10},
            "ultima_leitura": "2024-05-10T08:00:00",
            "extra": [1, 2, 3]
        });
        Mock::given(method("GET"))
            .and(path("/api/estatisticas/zona/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(blob.clone()))
            .mount(&server)
            .await;

        let stats = service_for(&server).get_zone_statistics(4).await.unwrap();
        assert_eq!(stats, blob);
    }

    #[tokio::test]
    async fn test_server_status_is_public() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "online",
                "timestamp": "2024-05-10T08:00:00",
                "version": "1.0.0"
            })))
            .mount(&server)
            .await;

        let status = service_for(&server).server_status().await.unwrap();
        assert_eq!(status.status, "online");

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }
}
