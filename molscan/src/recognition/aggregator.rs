use crate::models::{Image, RecognitionOutcome, RecognitionResponse};

/// Merge per-engine outcomes into one response for `image`.
///
/// No outcomes still yields a valid response carrying the image id.
pub fn aggregate(image: &Image, outcomes: Vec<RecognitionOutcome>) -> RecognitionResponse {
    let mut response = RecognitionResponse::new(image.id.clone());
    for outcome in outcomes {
        response.engines.insert(outcome.engine.clone(), outcome);
    }
    response
}
