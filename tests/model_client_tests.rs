//! Unit and mock HTTP tests for ModelClient.
//!
//! These tests cover:
//! - Client creation and configuration
//! - Error display formatting
//! - Fetching model documents from a mock HTTP server
//! - Retry behavior for transient failures
//! - Cache fallback when the model source is unreachable

use std::sync::Arc;
use std::time::Duration;

use attire_check::model::{
    top_prediction, LinearSoftmaxEngine, ModelCache, ModelClient, ModelLoadError,
    MODEL_DEFINITION_FILE, MODEL_METADATA_FILE,
};

// === Client Creation Tests ===

#[test]
fn test_new_creates_client() {
    let client =
        ModelClient::new("https://models.test/attire/", Arc::new(LinearSoftmaxEngine)).unwrap();
    assert_eq!(client.base_url(), "https://models.test/attire/");
}

#[test]
fn test_new_empty_url_returns_error() {
    let result = ModelClient::new("", Arc::new(LinearSoftmaxEngine));
    assert!(matches!(result, Err(ModelLoadError::MissingUrl)));
}

#[test]
fn test_new_whitespace_url_returns_error() {
    let result = ModelClient::new("   ", Arc::new(LinearSoftmaxEngine));
    assert!(matches!(result, Err(ModelLoadError::MissingUrl)));
}

// === Error Display Tests ===

#[test]
fn test_missing_url_error_names_the_env_var() {
    let error = ModelLoadError::MissingUrl;
    assert!(error.to_string().contains("ATTIRE_MODEL_URL"));
}

#[test]
fn test_status_error_display() {
    let error = ModelLoadError::Status {
        resource: "model.json".to_string(),
        status: 404,
    };
    assert_eq!(
        error.to_string(),
        "Fetching model.json failed with status 404"
    );
}

#[test]
fn test_network_error_display() {
    let error = ModelLoadError::Network {
        message: "connection refused".to_string(),
        attempts: 4,
    };
    assert_eq!(
        error.to_string(),
        "Network error: connection refused (after 4 attempts)"
    );
}

#[test]
fn test_label_count_mismatch_display() {
    let error = ModelLoadError::LabelCountMismatch {
        labels: 2,
        outputs: 3,
    };
    assert_eq!(
        error.to_string(),
        "Model has 2 labels but the classifier outputs 3 classes"
    );
}

// === Mock HTTP Server Tests ===

mod mock_http_tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A 1x1 linear model whose three classes key on the red, green, and
    /// blue channels respectively.
    fn definition_json() -> serde_json::Value {
        serde_json::json!({
            "format": "linear-softmax/1",
            "input": { "width": 1, "height": 1 },
            "weights": [
                [4.0, 0.0, 0.0],
                [0.0, 4.0, 0.0],
                [0.0, 0.0, 4.0]
            ],
            "biases": [0.0, 0.0, 0.0]
        })
    }

    fn metadata_json() -> serde_json::Value {
        serde_json::json!({
            "tfjsVersion": "1.3.1",
            "packageName": "@teachablemachine/image",
            "imageSize": 224,
            "labels": ["Business Pro...", "Business Cas...", "Casual"]
        })
    }

    fn solid_png(r: u8, g: u8, b: u8) -> Vec<u8> {
        let pixels = image::RgbImage::from_pixel(8, 8, image::Rgb([r, g, b]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(pixels)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    fn client_for(url: &str) -> ModelClient {
        ModelClient::new(url, Arc::new(LinearSoftmaxEngine)).unwrap()
    }

    /// Mount both model documents, each expected to be fetched once.
    async fn mount_documents(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_DEFINITION_FILE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(definition_json()))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_METADATA_FILE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_load_builds_model_from_mock_server() {
        let server = MockServer::start().await;
        mount_documents(&server).await;

        let client = client_for(&server.uri());
        let model = client.load().await.unwrap();

        assert_eq!(
            model.labels(),
            ["Business Pro...", "Business Cas...", "Casual"]
        );
    }

    #[tokio::test]
    async fn test_loaded_model_classifies_solid_colors() {
        let server = MockServer::start().await;
        mount_documents(&server).await;

        let client = client_for(&server.uri());
        let model = client.load().await.unwrap();

        let predictions = model.classify_bytes(&solid_png(255, 0, 0)).unwrap();
        let top = top_prediction(&predictions).unwrap();
        assert_eq!(top.label, "Business Pro...");
        assert!(top.probability > 0.5 && top.probability <= 1.0);

        let predictions = model.classify_bytes(&solid_png(0, 255, 0)).unwrap();
        let top = top_prediction(&predictions).unwrap();
        assert_eq!(top.label, "Business Cas...");
    }

    #[tokio::test]
    async fn test_load_tolerates_trailing_slash_in_base_url() {
        let server = MockServer::start().await;
        mount_documents(&server).await;

        let client = client_for(&format!("{}/", server.uri()));
        let model = client.load().await.unwrap();
        assert_eq!(model.labels().len(), 3);
    }

    #[tokio::test]
    async fn test_load_refetches_on_every_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_DEFINITION_FILE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(definition_json()))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_METADATA_FILE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        client.load().await.unwrap();
        client.load().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_definition_surfaces_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_DEFINITION_FILE)))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        // The metadata fetch never happens when the definition fails.
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_METADATA_FILE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
            .expect(0)
            .mount(&server)
            .await;

        match client_for(&server.uri()).load().await {
            Err(ModelLoadError::Status { resource, status }) => {
                assert_eq!(resource, MODEL_DEFINITION_FILE);
                assert_eq!(status, 404);
            }
            Err(other) => panic!("expected Status error, got {:?}", other),
            Ok(_) => panic!("expected Status error, load succeeded"),
        }
    }

    #[tokio::test]
    async fn test_missing_metadata_surfaces_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_DEFINITION_FILE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(definition_json()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_METADATA_FILE)))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        match client_for(&server.uri()).load().await {
            Err(ModelLoadError::Status { resource, status }) => {
                assert_eq!(resource, MODEL_METADATA_FILE);
                assert_eq!(status, 404);
            }
            Err(other) => panic!("expected Status error, got {:?}", other),
            Ok(_) => panic!("expected Status error, load succeeded"),
        }
    }

    #[tokio::test]
    async fn test_malformed_definition_surfaces_engine_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_DEFINITION_FILE)))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"not json".to_vec(), "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_METADATA_FILE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server.uri()).load().await;
        assert!(matches!(result, Err(ModelLoadError::Engine(_))));
    }

    #[tokio::test]
    async fn test_malformed_metadata_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_DEFINITION_FILE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(definition_json()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_METADATA_FILE)))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"[not json".to_vec(), "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server.uri()).load().await;
        assert!(matches!(result, Err(ModelLoadError::MalformedMetadata(_))));
    }

    #[tokio::test]
    async fn test_label_count_mismatch_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_DEFINITION_FILE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(definition_json()))
            .expect(1)
            .mount(&server)
            .await;
        let two_labels = serde_json::json!({ "labels": ["Business Pro...", "Casual"] });
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_METADATA_FILE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(two_labels))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server.uri()).load().await;
        assert!(matches!(
            result,
            Err(ModelLoadError::LabelCountMismatch {
                labels: 2,
                outputs: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_gateway_errors_are_retried() {
        let server = MockServer::start().await;
        // Two 503s, then the real document.
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_DEFINITION_FILE)))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_DEFINITION_FILE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(definition_json()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_METADATA_FILE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri()).with_retry_config(
            3,
            Duration::from_millis(10),
            Duration::from_millis(50),
        );
        let model = client.load().await.unwrap();
        assert_eq!(model.labels().len(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_DEFINITION_FILE)))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server.uri()).with_retry_config(
            1,
            Duration::from_millis(1),
            Duration::from_millis(10),
        );
        match client.load().await {
            Err(ModelLoadError::Network { attempts, .. }) => assert_eq!(attempts, 2),
            Err(other) => panic!("expected Network error, got {:?}", other),
            Ok(_) => panic!("expected Network error, load succeeded"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_source_without_cache_fails() {
        // Start a server only to reserve an address, then shut it down.
        let server = MockServer::start().await;
        let url = server.uri();
        drop(server);

        let client = client_for(&url).with_retry_config(
            1,
            Duration::from_millis(1),
            Duration::from_millis(10),
        );
        let result = client.load().await;
        assert!(matches!(result, Err(ModelLoadError::Network { .. })));
    }

    #[tokio::test]
    async fn test_cache_serves_model_when_source_goes_away() {
        let server = MockServer::start().await;
        mount_documents(&server).await;
        let url = server.uri();
        let cache_dir = tempfile::tempdir().unwrap();

        let client = client_for(&url).with_cache(ModelCache::new(cache_dir.path()));
        client.load().await.unwrap();

        drop(server);

        let client = client_for(&url)
            .with_cache(ModelCache::new(cache_dir.path()))
            .with_retry_config(1, Duration::from_millis(1), Duration::from_millis(10));
        let model = client.load().await.unwrap();
        assert_eq!(
            model.labels(),
            ["Business Pro...", "Business Cas...", "Casual"]
        );
    }

    #[tokio::test]
    async fn test_cache_does_not_mask_a_missing_model() {
        let server = MockServer::start().await;
        mount_documents(&server).await;
        let cache_dir = tempfile::tempdir().unwrap();

        let client = client_for(&server.uri()).with_cache(ModelCache::new(cache_dir.path()));
        client.load().await.unwrap();

        // The model was deleted at the source; the cached copy must not
        // hide that.
        server.reset().await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", MODEL_DEFINITION_FILE)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client.load().await;
        assert!(matches!(
            result,
            Err(ModelLoadError::Status { status: 404, .. })
        ));
    }
}
