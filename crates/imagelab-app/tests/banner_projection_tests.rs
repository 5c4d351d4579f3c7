//! Integration tests for banner projection across controller events.

mod common;

use imagelab_signup::{SignupDetails, SignupPhase};
use imagelab_transport::SYNTHETIC_OTP_CODE;
use imagelab_ui::BannerKind;

fn complete_signup(context: &mut imagelab_app::AppContext) {
    context.signup.submit_details(
        &context.client,
        SignupDetails {
            username: "grace".to_string(),
            password: "abc123".to_string(),
            confirm_password: "abc123".to_string(),
        },
    );
    context.signup.set_code(SYNTHETIC_OTP_CODE);
    context.signup.verify(&context.client);
    assert_eq!(context.signup.phase(), SignupPhase::Completed);
    context.refresh_ui();
}

#[test]
fn banner_projection_tests_login_error_shows_after_completed_signup() {
    let (_, mut context) = common::synthetic_context();

    complete_signup(&mut context);
    assert_eq!(
        context.ui.banner.as_ref().map(|banner| banner.kind),
        Some(BannerKind::Success)
    );

    // A later login failure must surface instead of the standing
    // signup-success state re-raising over it.
    context.submit_login("   ", "pass1234");

    let banner = context.ui.banner.as_ref().expect("banner should be set");
    assert_eq!(banner.kind, BannerKind::Error);
    assert_eq!(
        banner.message,
        imagelab_auth::BLANK_CREDENTIALS_MESSAGE
    );
}

#[test]
fn banner_projection_tests_dismissed_banner_stays_dismissed_on_refresh() {
    let (_, mut context) = common::synthetic_context();

    complete_signup(&mut context);
    context.ui.dismiss_banner();

    context.refresh_ui();
    assert!(context.ui.banner.is_none());
}
