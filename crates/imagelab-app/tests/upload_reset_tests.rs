//! Integration tests for upload pipeline reset semantics.

mod common;

use imagelab_upload::UploadStatus;

#[test]
fn upload_reset_tests_reset_after_success_restores_idle_defaults() {
    let (_, mut context) = common::synthetic_context();

    context.submit_login("ada", "pass1234");
    context.upload.select_file(common::jpeg_fixture(8));
    context
        .upload
        .upload(&context.client, context.sessions.session());
    assert_eq!(context.upload.status(), UploadStatus::Succeeded);

    context.upload.reset();

    assert_eq!(context.upload.status(), UploadStatus::Idle);
    assert!(context.upload.file().is_none());
    assert!(context.upload.preview().is_none());
    assert!(context.upload.prediction().is_none());
    assert!(context.upload.error_message().is_none());
    assert!(context.upload.checksum().is_none());
}
