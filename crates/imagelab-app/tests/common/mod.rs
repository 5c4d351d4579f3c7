//! Shared fixtures for app integration tests.

use std::sync::Arc;

use imagelab_app::{AppConfig, AppContext};
use imagelab_session::MemorySessionStore;
use imagelab_transport::SyntheticBackendTransport;
use imagelab_upload::SelectedFile;

/// Builds a context over a fresh synthetic backend with one seeded account.
#[allow(dead_code)]
pub fn synthetic_context() -> (Arc<SyntheticBackendTransport>, AppContext) {
    let transport = Arc::new(SyntheticBackendTransport::new());
    transport.seed_user("ada", "pass1234");
    let context = context_over(transport.clone());
    (transport, context)
}

/// Builds a context over the given transport with an empty session store.
#[allow(dead_code)]
pub fn context_over(transport: Arc<SyntheticBackendTransport>) -> AppContext {
    AppContext::new(
        AppConfig::default(),
        Arc::new(MemorySessionStore::new()),
        transport,
    )
    .expect("context should build")
}

/// Creates a deterministic JPEG selection fixture of the given size.
#[allow(dead_code)]
pub fn jpeg_fixture(len: usize) -> SelectedFile {
    SelectedFile {
        name: "fixture.jpg".to_string(),
        mime_type: "image/jpeg".to_string(),
        bytes: vec![0xAB; len],
    }
}
