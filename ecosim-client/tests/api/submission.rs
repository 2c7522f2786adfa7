use std::time::Duration;

use color_eyre::Result;
use ecosim_client::{
    HttpPredictor, Predictor, Session, SimulatedPredictor, SubmitError, TransportError,
};
use ecosim_core::{ClassSet, FeatureSchema, InputRecord, MemoryStorage, encode};
use tokio::net::TcpListener;

use crate::helpers::{Responder, assert_epsilon};

const ASPEN_RESPONSE: &str = r#"{
    "prediction": "Aspen",
    "probabilities": [
        {"type": "Aspen", "probability": 3.0},
        {"type": "Spruce/Fir", "probability": 1.0}
    ]
}"#;

fn http_predictor(base_url: &str) -> Result<HttpPredictor> {
    Ok(HttpPredictor::new(base_url, Duration::from_secs(5))?)
}

#[tokio::test]
async fn features_are_posted_as_ordered_json() -> Result<()> {
    let responder = Responder::start(200, ASPEN_RESPONSE).await?;
    let predictor = http_predictor(&responder.base_url)?;

    let schema = FeatureSchema::forest_cover();
    let features = encode(&InputRecord::example(), &schema)?;
    let raw = predictor.predict(&features).await?;
    assert_eq!(raw.prediction, "Aspen");

    let body = responder.request_body().await?;
    let sent: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&body)?;
    assert_eq!(sent.len(), 50);
    assert_eq!(sent["Elevation"], 2596);
    assert_eq!(sent["Soil_Type10"], 1);
    assert_eq!(sent["Soil_Type1"], 0);
    assert!(body.find("\"Elevation\"") < body.find("\"Soil_Type1\""));
    Ok(())
}

#[tokio::test]
async fn session_normalizes_service_scores() -> Result<()> {
    let responder = Responder::start(200, ASPEN_RESPONSE).await?;
    let mut session = Session::new(
        FeatureSchema::forest_cover(),
        http_predictor(&responder.base_url)?,
        MemoryStorage::new(),
    );

    let outcome = session.submit(&InputRecord::example()).await?;
    let distribution = outcome.distribution.expect("service sent probabilities");

    assert_eq!(distribution.len(), 7);
    assert_epsilon(distribution.sum(), 1.0, 1e-6);
    assert_epsilon(distribution.probability("Aspen").unwrap_or(0.0), 0.75, 1e-9);
    assert_eq!(distribution.probability("Krummholz"), Some(0.0));

    let ranked: Vec<&str> = distribution.ranked().iter().map(|p| p.class.as_str()).collect();
    assert_eq!(&ranked[..3], ["Aspen", "Spruce/Fir", "Lodgepole Pine"]);

    assert_eq!(session.history_counts().get("Aspen"), Some(1));
    Ok(())
}

#[tokio::test]
async fn server_error_is_reported_with_detail() -> Result<()> {
    let responder =
        Responder::start(503, r#"{"detail": "Model or scaler not loaded."}"#).await?;
    let mut session = Session::new(
        FeatureSchema::forest_cover(),
        http_predictor(&responder.base_url)?,
        MemoryStorage::new(),
    );

    let err = session.submit(&InputRecord::example()).await.unwrap_err();
    match err {
        SubmitError::Transport(TransportError::Status { status, detail }) => {
            assert_eq!(status, 503);
            assert_eq!(detail.as_deref(), Some("Model or scaler not loaded."));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        session.state().error.as_deref(),
        Some("Failed to connect to the prediction server. Please try again later.")
    );
    assert!(!session.state().is_loading);
    assert!(session.history().is_empty());
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_a_transport_failure() -> Result<()> {
    let responder = Responder::start(200, "not json").await?;
    let mut session = Session::new(
        FeatureSchema::forest_cover(),
        http_predictor(&responder.base_url)?,
        MemoryStorage::new(),
    );

    let err = session.submit(&InputRecord::example()).await.unwrap_err();
    assert!(matches!(
        err,
        SubmitError::Transport(TransportError::MalformedBody(_))
    ));
    Ok(())
}

#[tokio::test]
async fn unreachable_service_is_a_transport_failure() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    drop(listener);

    let mut session = Session::new(
        FeatureSchema::forest_cover(),
        http_predictor(&base_url)?,
        MemoryStorage::new(),
    );

    let err = session.submit(&InputRecord::example()).await.unwrap_err();
    assert!(matches!(err, SubmitError::Transport(TransportError::Request(_))));
    assert!(session.state().prediction.is_none());
    Ok(())
}

#[tokio::test]
async fn invalid_input_never_reaches_the_service() -> Result<()> {
    let predictor: Box<dyn Predictor> =
        Box::new(SimulatedPredictor::new(ClassSet::forest_cover(), 9));
    let mut session = Session::new(FeatureSchema::forest_cover(), predictor, MemoryStorage::new());

    let record = InputRecord::example().with("Slope", "steep");
    let err = session.submit(&record).await.unwrap_err();
    assert_eq!(err.user_message(), "The 'Slope' field must be a number.");

    let outcome = session.submit(&InputRecord::example()).await?;
    assert_eq!(outcome.prediction, "Krummholz");
    assert!(session.state().error.is_none());
    Ok(())
}

#[tokio::test]
async fn full_schema_submits_wilderness_indicators() -> Result<()> {
    let responder = Responder::start(200, r#"{"prediction": "Spruce/Fir"}"#).await?;
    let mut session = Session::new(
        FeatureSchema::forest_cover_full(),
        http_predictor(&responder.base_url)?,
        MemoryStorage::new(),
    );

    let record = InputRecord::example().with("Wilderness_Area", "Wilderness_Area3");
    let outcome = session.submit(&record).await?;
    assert_eq!(outcome.prediction, "Spruce/Fir");
    assert!(outcome.distribution.is_none());

    let body = responder.request_body().await?;
    let sent: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&body)?;
    assert_eq!(sent.len(), 54);
    assert_eq!(sent["Wilderness_Area3"], 1);
    assert_eq!(sent["Wilderness_Area1"], 0);
    Ok(())
}
