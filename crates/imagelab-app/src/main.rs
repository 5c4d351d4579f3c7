#![warn(missing_docs)]
//! # imagelab-app binary
//!
//! Headless entry point: walks the login/upload/logout flow against the
//! synthetic backend and prints each step's outcome.

use std::sync::Arc;

use imagelab_app::{AppConfig, AppContext, app_version, is_https_endpoint};
use imagelab_session::MemorySessionStore;
use imagelab_transport::SyntheticBackendTransport;
use imagelab_upload::SelectedFile;

fn main() {
    let config = AppConfig::from_env();
    println!("imagelab-app {}", app_version());
    println!(
        "api={} https={} mode={:?} max_upload_bytes={}",
        config.api_base_url,
        is_https_endpoint(&config.api_base_url),
        config.credential_mode,
        config.max_upload_bytes
    );

    let transport = Arc::new(SyntheticBackendTransport::new());
    transport.seed_user("demo", "demo123");

    let mut context =
        match AppContext::new(config, Arc::new(MemorySessionStore::new()), transport) {
            Ok(context) => context,
            Err(error) => {
                eprintln!("failed to start imagelab-app: {error}");
                std::process::exit(1);
            }
        };

    context.submit_login("demo", "demo123");
    println!("login phase: {:?}", context.login.phase());

    context.upload.select_file(SelectedFile {
        name: "sample.jpg".to_string(),
        mime_type: "image/jpeg".to_string(),
        bytes: vec![0xAB; 64],
    });
    context
        .upload
        .upload(&context.client, context.sessions.session());
    context.refresh_ui();
    match context.upload.prediction() {
        Some(prediction) => println!("prediction: {}", prediction.label),
        None => println!(
            "upload failed: {}",
            context.upload.error_message().unwrap_or("unknown")
        ),
    }

    match context.logout() {
        Ok(()) => println!("logged out"),
        Err(error) => eprintln!("logout failed: {error}"),
    }
}
