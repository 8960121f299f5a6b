//! SMTP credential rotation scenarios
//!
//! The remote never returns a credential's password after creation, so the
//! published connection secret decides whether a credential exists. These
//! tests pin down when a credential is rotated and what gets published.

use mailgun_provider::resources::smtp_credential::keys;
use mailgun_provider::{Resource, SecretStore};
use mailgun_provider_test::{
    fixtures::{self, DOMAIN},
    scope, CallVerifier, ProviderHarness, SecretVerifier,
};
use mailgun_reconcile_common::{
    Managed, ReconcileError, ReconcileState, SecretKeySelector, SecretReference,
};
use mailgun_transport::{Method, Region, TransportError, SMTP_PORT};
use pretty_assertions::assert_eq;

const DELETE_ALERTS: &str = "DELETE /v3/domains/mg.example.com/credentials/alerts";
const POST_CREDENTIALS: &str = "POST /v3/domains/mg.example.com/credentials";

fn alerts_secret() -> SecretReference {
    fixtures::secret("alerts-smtp")
}

/// Test the first create of a credential
///
/// Scenario:
/// 1. Reconcile a credential that has never been published
/// 2. Verify the login is deleted before it is created, tolerating 404
/// 3. Verify the generated password and SMTP settings are published
#[tokio::test]
async fn test_first_create_rotates_and_publishes() {
    let harness = ProviderHarness::new();
    let mut credential = fixtures::smtp_credential("alerts");

    let pass = harness.reconcile(&mut credential).await;

    assert!(pass.is_ok(), "{:?}", pass.error);
    assert_eq!(pass.state, ReconcileState::Creating);
    CallVerifier::new(&harness.fake)
        .assert_calls(&[DELETE_ALERTS, POST_CREDENTIALS])
        .unwrap();
    assert_eq!(credential.external_name(), Some("alerts"));

    let password = harness.fake.credential_password(DOMAIN, "alerts").unwrap();
    let secrets = SecretVerifier::new(&harness.secrets);
    let secret = alerts_secret();
    secrets
        .assert_key(&secret, keys::USERNAME, "alerts@mg.example.com")
        .unwrap();
    secrets.assert_key(&secret, keys::PASSWORD, &password).unwrap();
    secrets
        .assert_key(&secret, keys::ENDPOINT, Region::Us.smtp_endpoint())
        .unwrap();
    secrets
        .assert_key(&secret, keys::PORT, &SMTP_PORT.to_string())
        .unwrap();
}

/// Test that a populated secret means no remote call at all
#[tokio::test]
async fn test_published_credential_is_current() {
    let harness = ProviderHarness::new();
    let mut credential = fixtures::smtp_credential("alerts");
    harness.reconcile(&mut credential).await;
    harness.fake.clear_calls();

    let pass = harness.reconcile(&mut credential).await;

    assert!(pass.is_ok());
    assert_eq!(pass.state, ReconcileState::ObservedPresentCurrent);
    assert!(harness.fake.calls().is_empty());
}

/// Test rotation after the published password is lost
///
/// Scenario:
/// 1. Create and publish a credential
/// 2. Empty the password in the published secret
/// 3. Verify the next pass deletes and re-creates the login
/// 4. Verify the new password replaces the old one everywhere
#[tokio::test]
async fn test_emptied_secret_triggers_rotation() {
    let harness = ProviderHarness::new();
    let mut credential = fixtures::smtp_credential("alerts");
    harness.reconcile(&mut credential).await;
    let old_password = harness.fake.credential_password(DOMAIN, "alerts").unwrap();

    let secret = alerts_secret();
    harness
        .secrets
        .insert(&secret, [(keys::USERNAME, "alerts@mg.example.com"), (keys::PASSWORD, "")]);
    harness.fake.clear_calls();
    let pass = harness.reconcile(&mut credential).await;

    assert!(pass.is_ok(), "{:?}", pass.error);
    assert_eq!(pass.state, ReconcileState::Creating);
    let verifier = CallVerifier::new(&harness.fake);
    verifier.assert_calls(&[DELETE_ALERTS, POST_CREDENTIALS]).unwrap();
    verifier.assert_call_order(DELETE_ALERTS, POST_CREDENTIALS).unwrap();

    let new_password = harness.fake.credential_password(DOMAIN, "alerts").unwrap();
    assert_ne!(new_password, old_password);
    assert_eq!(harness.fake.count(&scope::credentials(DOMAIN)), 1);
    SecretVerifier::new(&harness.secrets)
        .assert_key(&secret, keys::PASSWORD, &new_password)
        .unwrap();
}

/// Test that a deleted secret is treated the same as an emptied one
#[tokio::test]
async fn test_missing_secret_triggers_rotation() {
    let harness = ProviderHarness::new();
    let mut credential = fixtures::smtp_credential("alerts");
    harness.reconcile(&mut credential).await;

    harness.secrets.delete(&alerts_secret()).await.unwrap();
    harness.fake.clear_calls();
    let pass = harness.reconcile(&mut credential).await;

    assert_eq!(pass.state, ReconcileState::Creating);
    CallVerifier::new(&harness.fake)
        .assert_calls(&[DELETE_ALERTS, POST_CREDENTIALS])
        .unwrap();
    SecretVerifier::new(&harness.secrets)
        .assert_keys(&alerts_secret(), &[keys::USERNAME, keys::PASSWORD])
        .unwrap();
}

/// Test that a failed delete aborts the rotation before any create
#[tokio::test]
async fn test_failed_rotation_aborts_create() {
    let harness = ProviderHarness::new();
    let mut credential = fixtures::smtp_credential("alerts");
    harness.fake.fail_next(
        Method::Delete,
        "/v3/domains/mg.example.com/credentials/alerts",
        TransportError::service_unavailable(Some(502), "bad gateway"),
    );

    let pass = harness.reconcile(&mut credential).await;

    match pass.error {
        Some(ReconcileError::Rotation { login, .. }) => assert_eq!(login, "alerts"),
        other => panic!("expected a rotation error, got {other:?}"),
    }
    CallVerifier::new(&harness.fake).assert_calls(&[DELETE_ALERTS]).unwrap();
    assert_eq!(harness.fake.count(&scope::credentials(DOMAIN)), 0);
    SecretVerifier::new(&harness.secrets)
        .assert_absent(&alerts_secret())
        .unwrap();
    assert_eq!(credential.external_name(), None);
}

/// Test a credential whose password is declared in another secret
#[tokio::test]
async fn test_declared_password_is_sent_and_published() {
    let harness = ProviderHarness::new();
    let password_secret = fixtures::secret("alerts-password");
    harness.secrets.insert(&password_secret, [("value", "s3cret-pass")]);

    let Resource::SmtpCredential(mut record) = fixtures::smtp_credential("alerts") else {
        panic!("fixture is not an SMTP credential");
    };
    record.spec.for_provider.password_secret_ref = Some(SecretKeySelector::new(
        "alerts-password",
        fixtures::NAMESPACE,
        "value",
    ));
    let mut credential = Resource::from(record);

    let pass = harness.reconcile(&mut credential).await;

    assert!(pass.is_ok(), "{:?}", pass.error);
    let post = harness.fake.mutating_calls().pop().unwrap();
    assert_eq!(post.form.get("password"), Some("s3cret-pass"));
    assert_eq!(
        harness.fake.credential_password(DOMAIN, "alerts").as_deref(),
        Some("s3cret-pass")
    );
    SecretVerifier::new(&harness.secrets)
        .assert_key(&alerts_secret(), keys::PASSWORD, "s3cret-pass")
        .unwrap();
}

/// Test that a declared password that cannot be read stops the create
#[tokio::test]
async fn test_unreadable_declared_password() {
    let harness = ProviderHarness::new();
    let Resource::SmtpCredential(mut record) = fixtures::smtp_credential("alerts") else {
        panic!("fixture is not an SMTP credential");
    };
    record.spec.for_provider.password_secret_ref = Some(SecretKeySelector::new(
        "missing",
        fixtures::NAMESPACE,
        "value",
    ));
    let mut credential = Resource::from(record);

    let pass = harness.reconcile(&mut credential).await;

    assert!(matches!(pass.error, Some(ReconcileError::SecretStore { .. })));
    CallVerifier::new(&harness.fake).assert_calls(&[DELETE_ALERTS]).unwrap();
}

/// Test deletion of a published credential
#[tokio::test]
async fn test_deletion_removes_login_and_secret() {
    let harness = ProviderHarness::new();
    let mut credential = fixtures::smtp_credential("alerts");
    harness.reconcile(&mut credential).await;
    harness.fake.clear_calls();

    credential.meta_mut().deletion_requested = true;
    let pass = harness.reconcile(&mut credential).await;

    assert!(pass.is_ok(), "{:?}", pass.error);
    assert_eq!(pass.state, ReconcileState::Deleting);
    CallVerifier::new(&harness.fake).assert_calls(&[DELETE_ALERTS]).unwrap();
    assert_eq!(harness.fake.count(&scope::credentials(DOMAIN)), 0);
    SecretVerifier::new(&harness.secrets)
        .assert_absent(&alerts_secret())
        .unwrap();
}

/// Test deletion after the published secret was lost
///
/// Scenario:
/// 1. Create and publish a credential
/// 2. Delete the connection secret out of band
/// 3. Request deletion
/// 4. Verify the remote login is deleted even though it observed absent
#[tokio::test]
async fn test_deletion_after_secret_lost_removes_login() {
    let harness = ProviderHarness::new();
    let mut credential = fixtures::smtp_credential("alerts");
    harness.reconcile(&mut credential).await;
    assert_eq!(harness.fake.count(&scope::credentials(DOMAIN)), 1);

    harness.secrets.delete(&alerts_secret()).await.unwrap();
    harness.fake.clear_calls();
    credential.meta_mut().deletion_requested = true;
    let pass = harness.reconcile(&mut credential).await;

    assert!(pass.is_ok(), "{:?}", pass.error);
    assert!(!pass.resource_exists);
    assert_eq!(pass.state, ReconcileState::Deleting);
    CallVerifier::new(&harness.fake).assert_calls(&[DELETE_ALERTS]).unwrap();
    assert_eq!(harness.fake.count(&scope::credentials(DOMAIN)), 0);
}

/// Test deletion of a credential that was never published
#[tokio::test]
async fn test_deletion_without_connection_secret_removes_login() {
    let harness = ProviderHarness::new();
    let Resource::SmtpCredential(mut record) = fixtures::smtp_credential("alerts") else {
        panic!("fixture is not an SMTP credential");
    };
    record.spec.write_connection_secret_to = None;
    let mut credential = Resource::from(record);
    harness.reconcile(&mut credential).await;
    harness.fake.clear_calls();

    credential.meta_mut().deletion_requested = true;
    let pass = harness.reconcile(&mut credential).await;

    assert!(pass.is_ok(), "{:?}", pass.error);
    CallVerifier::new(&harness.fake).assert_calls(&[DELETE_ALERTS]).unwrap();
    assert_eq!(harness.fake.count(&scope::credentials(DOMAIN)), 0);
}

/// Test a credential without a connection secret
///
/// With nowhere to publish, the password can never be known, so every pass
/// observes the credential absent and rotates it.
#[tokio::test]
async fn test_unpublished_credential_rotates_every_pass() {
    let harness = ProviderHarness::new();
    let Resource::SmtpCredential(mut record) = fixtures::smtp_credential("alerts") else {
        panic!("fixture is not an SMTP credential");
    };
    record.spec.write_connection_secret_to = None;
    let mut credential = Resource::from(record);

    for _ in 0..2 {
        let pass = harness.reconcile(&mut credential).await;
        assert!(pass.is_ok(), "{:?}", pass.error);
        assert_eq!(pass.state, ReconcileState::Creating);
    }

    CallVerifier::new(&harness.fake)
        .assert_calls(&[DELETE_ALERTS, POST_CREDENTIALS, DELETE_ALERTS, POST_CREDENTIALS])
        .unwrap();
    assert_eq!(harness.fake.count(&scope::credentials(DOMAIN)), 1);
    assert!(harness.secrets.is_empty());
}

/// Test that an unavailable secret store fails the pass without remote calls
#[tokio::test]
async fn test_secret_store_outage() {
    let harness = ProviderHarness::new();
    let mut credential = fixtures::smtp_credential("alerts");
    harness.secrets.set_unavailable(true);

    let pass = harness.reconcile(&mut credential).await;

    assert!(matches!(pass.error, Some(ReconcileError::SecretStore { .. })));
    assert!(harness.fake.calls().is_empty());
}
