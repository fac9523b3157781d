mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use molscan::codec::{ImageCodec, ImageFetcher, Submission};
use molscan::error::MolscanError;
use molscan::storage::ContentStore;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::PNG_1X1;

async fn codec(dir: &TempDir, max_bytes: usize) -> ImageCodec {
    let store = ContentStore::open(dir.path()).await.unwrap();
    ImageCodec::new(store, ImageFetcher::new(5).unwrap(), max_bytes)
}

#[tokio::test]
async fn data_uri_reproduces_its_payload() {
    let dir = TempDir::new().unwrap();
    let codec = codec(&dir, 1024 * 1024).await;
    let uri = format!("data:image/png;base64,{}", STANDARD.encode(PNG_1X1));

    let image = codec
        .decode(Submission::from_form_value(uri.clone()).unwrap())
        .await
        .unwrap();
    assert_eq!(image.media_type.as_deref(), Some("image/png"));
    assert_eq!(image.encoding.as_deref(), Some("base64"));

    let stored = codec.store().fetch(&image.id).await.unwrap();
    assert_eq!(stored.to_data_uri().unwrap(), uri);
}

#[tokio::test]
async fn data_uri_without_media_type_is_sniffed() {
    let dir = TempDir::new().unwrap();
    let codec = codec(&dir, 1024 * 1024).await;
    let uri = format!("data:;base64,{}", STANDARD.encode(PNG_1X1));

    let image = codec.decode(Submission::DataUri(uri)).await.unwrap();
    assert_eq!(image.media_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn non_base64_data_uri_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let codec = codec(&dir, 1024 * 1024).await;

    let err = codec
        .decode(Submission::DataUri("data:image/png,rawpixels".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, MolscanError::UnsupportedEncoding(_)));
}

#[tokio::test]
async fn oversized_and_empty_submissions_are_rejected() {
    let dir = TempDir::new().unwrap();
    let codec = codec(&dir, 16).await;

    let err = codec
        .decode(Submission::Raw {
            bytes: vec![1; 17],
            media_type: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, MolscanError::Validation(_)));

    let err = codec
        .decode(Submission::DataUri("data:image/png;base64,".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, MolscanError::NoImageData));
}

#[tokio::test]
async fn url_is_fetched_with_declared_media_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mol.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png; charset=binary")
                .set_body_bytes(PNG_1X1),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let codec = codec(&dir, 1024 * 1024).await;
    let image = codec
        .decode(Submission::from_form_value(format!("{}/mol.png", server.uri())).unwrap())
        .await
        .unwrap();

    assert_eq!(image.media_type.as_deref(), Some("image/png"));
    assert_eq!(image.encoding.as_deref(), Some("url"));
    assert_eq!(image.bytes.as_deref(), Some(PNG_1X1));
}

#[tokio::test]
async fn unreachable_url_is_a_fetch_error() {
    let dir = TempDir::new().unwrap();
    let codec = codec(&dir, 1024 * 1024).await;

    let err = codec
        .decode(Submission::Url("http://127.0.0.1:1/mol.png".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, MolscanError::Fetch(_)));
}

#[tokio::test]
async fn oversized_remote_image_is_rejected_before_storing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/huge.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![0u8; 64 * 1024]),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let codec = codec(&dir, 1024).await;
    let err = codec
        .decode(Submission::Url(format!("{}/huge.png", server.uri())))
        .await
        .unwrap_err();

    match err {
        MolscanError::Validation(message) => assert!(message.starts_with("Image too large")),
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn remote_image_at_the_limit_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mol.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(PNG_1X1),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let codec = codec(&dir, PNG_1X1.len()).await;
    let image = codec
        .decode(Submission::Url(format!("{}/mol.png", server.uri())))
        .await
        .unwrap();
    assert_eq!(image.bytes.as_deref(), Some(PNG_1X1));
}
