//! Integration tests for environment-driven configuration.

use imagelab_app::{AppConfig, DEFAULT_API_URL};
use imagelab_auth::CredentialMode;
use imagelab_upload::DEFAULT_MAX_UPLOAD_BYTES;

#[test]
fn app_config_tests_env_overrides_apply_and_invalid_values_fall_back() {
    // Safety:
    // - Integration tests mutate process env in a single-threaded test body.
    // - We reset the variables before returning.
    unsafe {
        std::env::set_var("IMAGELAB_API_URL", "https://imagelab.example");
        std::env::set_var("IMAGELAB_CREDENTIAL_MODE", "cookie");
        std::env::set_var("IMAGELAB_MAX_UPLOAD_BYTES", "1048576");
    }
    let config = AppConfig::from_env();
    assert_eq!(config.api_base_url, "https://imagelab.example");
    assert_eq!(config.credential_mode, CredentialMode::Cookie);
    assert_eq!(config.max_upload_bytes, 1_048_576);

    // Safety: see rationale above.
    unsafe {
        std::env::set_var("IMAGELAB_CREDENTIAL_MODE", "bearer");
        std::env::set_var("IMAGELAB_MAX_UPLOAD_BYTES", "zero");
    }
    let config = AppConfig::from_env();
    assert_eq!(config.credential_mode, CredentialMode::Bearer);
    assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);

    // Safety: see rationale above.
    unsafe {
        std::env::remove_var("IMAGELAB_API_URL");
        std::env::remove_var("IMAGELAB_CREDENTIAL_MODE");
        std::env::remove_var("IMAGELAB_MAX_UPLOAD_BYTES");
    }
    let config = AppConfig::from_env();
    assert_eq!(config.api_base_url, DEFAULT_API_URL);
}
