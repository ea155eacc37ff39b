//! Token state machine: issue, validate, blacklist, expire, sweep

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use common::{test_config, token_service};
use warden_auth_core::{AuthConfig, AuthError, ManualClock, TokenService, TokenStatus, TokenSweeper};
use warden_db::MemoryTokenRepository;
use warden_types::{InvalidTokenReason, TokenKind, UserId};

fn setup() -> (
    TokenService<MemoryTokenRepository>,
    Arc<MemoryTokenRepository>,
    ManualClock,
) {
    let repo = Arc::new(MemoryTokenRepository::new());
    let clock = ManualClock::default();
    (token_service(Arc::clone(&repo), clock.clone()), repo, clock)
}

#[tokio::test]
async fn test_issue_then_validate_roundtrip() {
    let (service, _, _) = setup();
    let user_id = UserId::new();
    let pair = service.issue_pair(user_id).await.unwrap();

    assert_eq!(
        service.validate(&pair.access_token, TokenKind::Access).await.unwrap(),
        TokenStatus::Valid { user_id }
    );
    assert_eq!(
        service.validate(&pair.refresh_token, TokenKind::Refresh).await.unwrap(),
        TokenStatus::Valid { user_id }
    );
}

#[tokio::test]
async fn test_pair_persists_one_record_without_raw_tokens() {
    let (service, repo, _) = setup();
    let pair = service.issue_pair(UserId::new()).await.unwrap();

    let records = repo.all();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.fingerprint, service.fingerprint(&pair.refresh_token));
    assert_eq!(
        record.access_fingerprint.as_deref(),
        Some(service.fingerprint(&pair.access_token).as_str())
    );
    assert_ne!(record.fingerprint, pair.refresh_token);
}

#[tokio::test]
async fn test_issue_single_refresh_is_persisted() {
    let (service, repo, _) = setup();
    let user_id = UserId::new();
    let access = service.issue(user_id, TokenKind::Access).await.unwrap();
    assert!(repo.is_empty());
    let refresh = service.issue(user_id, TokenKind::Refresh).await.unwrap();
    assert_eq!(repo.len(), 1);
    assert!(refresh.expires_at > access.expires_at);
}

#[tokio::test]
async fn test_blacklist_flips_only_to_blacklisted() {
    let (service, _, _) = setup();
    let pair = service.issue_pair(UserId::new()).await.unwrap();

    let fp = service.fingerprint(&pair.refresh_token);
    assert_eq!(service.blacklist_fingerprint(&fp).await.unwrap(), 1);

    assert_eq!(
        service.validate(&pair.refresh_token, TokenKind::Refresh).await.unwrap(),
        TokenStatus::Invalid(InvalidTokenReason::Blacklisted)
    );
    // The access token shares the record
    assert_eq!(
        service.validate(&pair.access_token, TokenKind::Access).await.unwrap(),
        TokenStatus::Invalid(InvalidTokenReason::Blacklisted)
    );
}

#[tokio::test]
async fn test_blacklist_twice_equals_once() {
    let (service, repo, _) = setup();
    let pair = service.issue_pair(UserId::new()).await.unwrap();
    let id = repo.all()[0].id;

    service.blacklist_record(id).await.unwrap();
    let once = repo.all();
    service.blacklist_record(id).await.unwrap();
    let twice = repo.all();

    assert_eq!(once.len(), twice.len());
    assert!(once[0].blacklisted && twice[0].blacklisted);
    assert_eq!(
        service.validate(&pair.refresh_token, TokenKind::Refresh).await.unwrap(),
        TokenStatus::Invalid(InvalidTokenReason::Blacklisted)
    );
}

#[tokio::test]
async fn test_expiry_is_enforced_without_sweep() {
    let (service, repo, clock) = setup();
    let pair = service.issue_pair(UserId::new()).await.unwrap();

    clock.advance(ChronoDuration::minutes(16));
    assert_eq!(
        service.validate(&pair.access_token, TokenKind::Access).await.unwrap(),
        TokenStatus::Invalid(InvalidTokenReason::Expired)
    );
    assert!(service
        .validate(&pair.refresh_token, TokenKind::Refresh)
        .await
        .unwrap()
        .is_valid());

    clock.advance(ChronoDuration::days(2));
    assert_eq!(repo.len(), 1, "record still present");
    assert_eq!(
        service.validate(&pair.refresh_token, TokenKind::Refresh).await.unwrap(),
        TokenStatus::Invalid(InvalidTokenReason::Expired)
    );
}

#[tokio::test]
async fn test_missing_refresh_record_is_not_found() {
    let (service, repo, _) = setup();
    let pair = service.issue_pair(UserId::new()).await.unwrap();
    repo.clear();

    assert_eq!(
        service.validate(&pair.refresh_token, TokenKind::Refresh).await.unwrap(),
        TokenStatus::Invalid(InvalidTokenReason::NotFound)
    );
    // Access tokens are not penalised for a missing record
    assert!(service
        .validate(&pair.access_token, TokenKind::Access)
        .await
        .unwrap()
        .is_valid());
}

#[tokio::test]
async fn test_wrong_kind_cannot_be_decrypted() {
    let (service, _, _) = setup();
    let pair = service.issue_pair(UserId::new()).await.unwrap();
    assert_eq!(
        service.validate(&pair.access_token, TokenKind::Refresh).await.unwrap(),
        TokenStatus::Invalid(InvalidTokenReason::CannotBeDecrypted)
    );
}

#[tokio::test]
async fn test_foreign_secret_cannot_be_decrypted() {
    let (service, _, clock) = setup();
    let other_config = AuthConfig::try_new(
        "another-secret-that-is-also-32-bytes!!",
        "warden-users",
        "warden",
        "warden-gateway",
    )
    .unwrap();
    let other = TokenService::new(&other_config, Arc::new(MemoryTokenRepository::new()))
        .unwrap()
        .with_clock(Arc::new(clock));
    let pair = other.issue_pair(UserId::new()).await.unwrap();

    assert_eq!(
        service.validate(&pair.access_token, TokenKind::Access).await.unwrap(),
        TokenStatus::Invalid(InvalidTokenReason::CannotBeDecrypted)
    );
}

#[tokio::test]
async fn test_wrong_authorized_party_cannot_be_decrypted() {
    let (service, _, clock) = setup();
    let mut config = test_config();
    config.authorized_party = "someone-else".into();
    let other = TokenService::new(&config, Arc::new(MemoryTokenRepository::new()))
        .unwrap()
        .with_clock(Arc::new(clock));
    let pair = other.issue_pair(UserId::new()).await.unwrap();

    assert_eq!(
        service.validate(&pair.access_token, TokenKind::Access).await.unwrap(),
        TokenStatus::Invalid(InvalidTokenReason::CannotBeDecrypted)
    );
}

#[tokio::test]
async fn test_bearer_prefix_accepted() {
    let (service, _, _) = setup();
    let user_id = UserId::new();
    let pair = service.issue_pair(user_id).await.unwrap();
    let header = format!("Bearer {}", pair.access_token);
    assert_eq!(
        service.validate(&header, TokenKind::Access).await.unwrap(),
        TokenStatus::Valid { user_id }
    );
}

#[tokio::test]
async fn test_pairs_issued_together_differ() {
    let (service, _, _) = setup();
    let user_id = UserId::new();
    let a = service.issue_pair(user_id).await.unwrap();
    let b = service.issue_pair(user_id).await.unwrap();
    assert_ne!(a.access_token, b.access_token);
    assert_ne!(a.refresh_token, b.refresh_token);
}

#[tokio::test]
async fn test_sweeper_removes_only_expired() {
    let (service, repo, clock) = setup();
    service.issue_pair(UserId::new()).await.unwrap();
    clock.advance(ChronoDuration::hours(12));
    service.issue_pair(UserId::new()).await.unwrap();
    clock.advance(ChronoDuration::hours(13));

    let sweeper = TokenSweeper::new(Arc::clone(&repo), Duration::from_secs(3600))
        .with_clock(Arc::new(clock.clone()));
    assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
    assert_eq!(repo.len(), 1);
}

#[tokio::test]
async fn test_sweeper_task_runs_and_stops() {
    let (service, repo, clock) = setup();
    service.issue_pair(UserId::new()).await.unwrap();
    clock.advance(ChronoDuration::days(2));

    let handle = TokenSweeper::new(Arc::clone(&repo), Duration::from_secs(3600))
        .with_clock(Arc::new(clock))
        .spawn();
    for _ in 0..50 {
        if repo.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.shutdown().await;
    assert!(repo.is_empty());
}

#[test]
fn test_oversized_ttl_rejected() {
    let config = test_config().with_refresh_ttl(Duration::from_secs(u64::MAX / 4_000));
    let result = TokenService::new(&config, Arc::new(MemoryTokenRepository::new()));
    assert!(matches!(result, Err(AuthError::Configuration(_))));

    let config = test_config().with_access_ttl(AuthConfig::MAX_TTL);
    assert!(TokenService::new(&config, Arc::new(MemoryTokenRepository::new())).is_ok());
}

#[tokio::test]
async fn test_expiry_past_calendar_end_is_an_error() {
    let repo = Arc::new(MemoryTokenRepository::new());
    let clock = ManualClock::new(DateTime::<Utc>::MAX_UTC - ChronoDuration::minutes(1));
    let service = token_service(Arc::clone(&repo), clock);

    let err = service.issue(UserId::new(), TokenKind::Access).await.unwrap_err();
    assert!(matches!(err, AuthError::Configuration(_)));
    assert!(repo.is_empty());
}
