//! Integration tests for endpoint security checks.

use imagelab_app::is_https_endpoint;

#[test]
fn transport_security_tests_accepts_only_https_endpoints() {
    assert!(is_https_endpoint("https://api.imagelab.test/predict"));
    assert!(!is_https_endpoint("http://api.imagelab.test/predict"));
    assert!(!is_https_endpoint("ftp://api.imagelab.test"));
    assert!(!is_https_endpoint("not a url"));
}
