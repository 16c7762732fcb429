// file: src/classification/fetcher.rs
// description: RxClass lookup of ATC codes for a single RxCUI with failure isolation
// reference: https://lhncbc.nlm.nih.gov/RxNav/APIs/api-RxClass.getClassByRxNormDrugId.html

use crate::config::ClassificationConfig;
use crate::error::{PipelineError, Result};
use crate::models::{ClassificationKey, ClassificationResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Resolves one key to its classification codes.
///
/// Implementations never fail: anything that goes wrong is reported as
/// [`ClassificationResult::Unresolved`].
#[async_trait]
pub trait ClassificationLookup: Send + Sync {
    async fn lookup(&self, key: &ClassificationKey) -> ClassificationResult;
}

#[derive(Debug, Default, Deserialize)]
struct RxClassResponse {
    #[serde(rename = "rxclassDrugInfoList", default)]
    drug_info_list: Option<DrugInfoList>,
}

#[derive(Debug, Deserialize)]
struct DrugInfoList {
    #[serde(rename = "rxclassDrugInfo", default)]
    drug_info: Vec<DrugInfo>,
}

#[derive(Debug, Deserialize)]
struct DrugInfo {
    #[serde(rename = "rxclassMinConceptItem")]
    concept: ConceptItem,
}

#[derive(Debug, Deserialize)]
struct ConceptItem {
    #[serde(rename = "classId")]
    class_id: String,
    #[serde(rename = "classType")]
    class_type: String,
}

pub struct RxClassClient {
    client: Client,
    endpoint: String,
    class_types: String,
    class_type: String,
}

impl RxClassClient {
    pub fn new(config: &ClassificationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            class_types: config.class_types.clone(),
            class_type: config.class_type.clone(),
        })
    }

    async fn fetch(&self, key: &ClassificationKey) -> Result<Vec<String>> {
        let lookup_error = |message: String| PipelineError::Lookup {
            key: key.to_string(),
            message,
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("rxcui", key.as_str()), ("classTypes", self.class_types.as_str())])
            .send()
            .await
            .map_err(|e| lookup_error(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| lookup_error(e.to_string()))?;
        self.read_response(key, status, &body)
    }

    /// Codes from a response; a non-2xx status is a lookup failure whatever
    /// the body says.
    fn read_response(
        &self,
        key: &ClassificationKey,
        status: StatusCode,
        body: &str,
    ) -> Result<Vec<String>> {
        let lookup_error = |message: String| PipelineError::Lookup {
            key: key.to_string(),
            message,
        };

        if !status.is_success() {
            return Err(lookup_error(format!("status {}", status)));
        }

        self.extract_codes(body)
            .map_err(|e| lookup_error(format!("malformed response: {}", e)))
    }

    /// Keeps the class ids of entries tagged with the configured class type,
    /// in response order and without repeats.
    fn extract_codes(&self, body: &str) -> std::result::Result<Vec<String>, serde_json::Error> {
        let parsed: RxClassResponse = serde_json::from_str(body)?;
        let mut codes: Vec<String> = Vec::new();

        for info in parsed
            .drug_info_list
            .map(|list| list.drug_info)
            .unwrap_or_default()
        {
            if info.concept.class_type == self.class_type && !codes.contains(&info.concept.class_id)
            {
                codes.push(info.concept.class_id);
            }
        }

        Ok(codes)
    }
}

#[async_trait]
impl ClassificationLookup for RxClassClient {
    async fn lookup(&self, key: &ClassificationKey) -> ClassificationResult {
        match self.fetch(key).await {
            Ok(codes) => {
                debug!("Resolved {} to {} codes", key, codes.len());
                ClassificationResult::from_codes(codes)
            }
            Err(e) => {
                warn!("{}", e);
                ClassificationResult::Unresolved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client_with_endpoint(endpoint: &str) -> RxClassClient {
        let mut config = Config::default_config().classification;
        config.endpoint = endpoint.to_string();
        config.timeout_secs = 2;
        RxClassClient::new(&config).unwrap()
    }

    const ASPIRIN: &str = r#"{
      "userInput": {"relaSource": "ATCPROD", "rxcui": "1191"},
      "rxclassDrugInfoList": {"rxclassDrugInfo": [
        {"minConcept": {"rxcui": "1191", "name": "aspirin", "tty": "IN"},
         "rxclassMinConceptItem": {"classId": "B01AC", "className": "Platelet aggregation inhibitors excl. heparin", "classType": "ATC1-4"},
         "rela": "", "relaSource": "ATCPROD"},
        {"minConcept": {"rxcui": "1191", "name": "aspirin", "tty": "IN"},
         "rxclassMinConceptItem": {"classId": "N02BA", "className": "Salicylic acid and derivatives", "classType": "ATC1-4"},
         "rela": "", "relaSource": "ATCPROD"},
        {"minConcept": {"rxcui": "1191", "name": "aspirin", "tty": "IN"},
         "rxclassMinConceptItem": {"classId": "N02BA", "className": "Salicylic acid and derivatives", "classType": "ATC1-4"},
         "rela": "", "relaSource": "ATCPROD"},
        {"minConcept": {"rxcui": "1191", "name": "aspirin", "tty": "IN"},
         "rxclassMinConceptItem": {"classId": "N0000175722", "className": "Decreased Platelet Aggregation", "classType": "PE"},
         "rela": "has_pe", "relaSource": "FDASPL"}
      ]}
    }"#;

    #[test]
    fn test_extract_filters_by_class_type() {
        let client = client_with_endpoint("https://rxnav.example/byRxcui.json");
        let codes = client.extract_codes(ASPIRIN).unwrap();
        assert_eq!(codes, vec!["B01AC".to_string(), "N02BA".to_string()]);
    }

    #[test]
    fn test_extract_without_drug_info_is_empty() {
        let client = client_with_endpoint("https://rxnav.example/byRxcui.json");
        let codes = client
            .extract_codes(r#"{"userInput": {"rxcui": "0"}}"#)
            .unwrap();
        assert!(codes.is_empty());
    }

    #[test]
    fn test_extract_rejects_malformed_entries() {
        let client = client_with_endpoint("https://rxnav.example/byRxcui.json");
        let body = r#"{"rxclassDrugInfoList": {"rxclassDrugInfo": [{"rela": ""}]}}"#;
        assert!(client.extract_codes(body).is_err());
    }

    #[test]
    fn test_error_status_is_lookup_failure() {
        let client = client_with_endpoint("https://rxnav.example/byRxcui.json");
        let key = ClassificationKey::new("1191");

        let err = client
            .read_response(&key, StatusCode::SERVICE_UNAVAILABLE, ASPIRIN)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Lookup { .. }));

        let codes = client.read_response(&key, StatusCode::OK, ASPIRIN).unwrap();
        assert_eq!(codes.len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_degrades_to_unresolved() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let body = "upstream busy";
            let response = format!(
                "HTTP/1.1 503 Service Unavailable\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let client = client_with_endpoint(&format!("http://{}/byRxcui.json", addr));
        let result = client.lookup(&ClassificationKey::new("1191")).await;
        assert_eq!(result, ClassificationResult::Unresolved);
    }

    #[tokio::test]
    async fn test_unreachable_service_degrades_to_unresolved() {
        let client = client_with_endpoint("http://127.0.0.1:9/byRxcui.json");
        let result = client.lookup(&ClassificationKey::new("1191")).await;
        assert_eq!(result, ClassificationResult::Unresolved);
    }
}
