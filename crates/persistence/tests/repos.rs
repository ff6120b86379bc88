//! Integration tests for the SQLite repositories and schema constraints

use chrono::Utc;

use accessgov_core::{Campaign, Entitlement, Principal, Review, ReviewStatus, RiskTier};
use accessgov_persistence::{
    verify_schema_version, CampaignRepo, Database, EntitlementRepo, GrantRepo, PrincipalRepo,
    ReviewRepo,
};

async fn seed_grant(db: &Database, principal_id: &str, entitlement_id: &str) {
    let principal = Principal::new(principal_id, "alice@example.com", "arn:user/alice");
    PrincipalRepo::upsert(db.pool(), &principal).await.unwrap();
    EntitlementRepo::upsert(db.pool(), entitlement_id, "AdministratorAccess")
        .await
        .unwrap();
    GrantRepo::link(db.pool(), principal_id, entitlement_id)
        .await
        .unwrap();
}

async fn seed_campaign(db: &Database) -> Campaign {
    let campaign = Campaign::new_at(Utc::now());
    CampaignRepo::insert(db.pool(), &campaign).await.unwrap();
    campaign
}

#[tokio::test]
async fn test_migrations_and_schema_version() {
    let db = Database::in_memory().await.unwrap();
    verify_schema_version(db.pool()).await.unwrap();
}

#[tokio::test]
async fn test_principal_upsert_is_idempotent() {
    let db = Database::in_memory().await.unwrap();
    let principal = Principal::new("U1", "alice@example.com", "arn:user/alice");

    assert!(PrincipalRepo::upsert(db.pool(), &principal).await.unwrap());
    assert!(!PrincipalRepo::upsert(db.pool(), &principal).await.unwrap());
    assert_eq!(PrincipalRepo::count(db.pool()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_rows_convert_to_typed_records() {
    let db = Database::in_memory().await.unwrap();
    seed_grant(&db, "U1", "E1").await;
    let campaign = seed_campaign(&db).await;

    let principal: Principal = PrincipalRepo::get_by_id(db.pool(), "U1")
        .await
        .unwrap()
        .into();
    assert_eq!(principal.display_name, "alice@example.com");

    let entitlement: Entitlement = EntitlementRepo::get_by_id(db.pool(), "E1")
        .await
        .unwrap()
        .try_into()
        .unwrap();
    assert_eq!(entitlement.risk_tier, RiskTier::Low);

    let stored = CampaignRepo::get_by_id(db.pool(), &campaign.campaign_id)
        .await
        .unwrap();
    assert_eq!(stored.name, campaign.name);
}

#[tokio::test]
async fn test_grant_link_is_idempotent() {
    let db = Database::in_memory().await.unwrap();
    seed_grant(&db, "U1", "E1").await;

    assert!(!GrantRepo::link(db.pool(), "U1", "E1").await.unwrap());
    assert_eq!(GrantRepo::count(db.pool()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_pending_unique_index_blocks_duplicate_open_review() {
    let db = Database::in_memory().await.unwrap();
    seed_grant(&db, "U1", "E1").await;
    let campaign = seed_campaign(&db).await;

    let first = Review::pending(&campaign.campaign_id, "U1", "E1");
    let second = Review::pending(&campaign.campaign_id, "U1", "E1");

    assert!(ReviewRepo::insert_pending(db.pool(), &first).await.unwrap());
    // The partial unique index swallows the second insert at the storage level
    assert!(!ReviewRepo::insert_pending(db.pool(), &second).await.unwrap());

    assert_eq!(
        ReviewRepo::count_by_status(db.pool(), ReviewStatus::Pending)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_decided_review_allows_new_pending() {
    let db = Database::in_memory().await.unwrap();
    seed_grant(&db, "U1", "E1").await;
    let campaign = seed_campaign(&db).await;

    let first = Review::pending(&campaign.campaign_id, "U1", "E1");
    ReviewRepo::insert_pending(db.pool(), &first).await.unwrap();
    assert!(ReviewRepo::decide(
        db.pool(),
        &first.review_id,
        ReviewStatus::Approved,
        Utc::now(),
        Some("still needed"),
    )
    .await
    .unwrap());

    // The uniqueness invariant covers only PENDING rows
    let next = Review::pending(&campaign.campaign_id, "U1", "E1");
    assert!(ReviewRepo::insert_pending(db.pool(), &next).await.unwrap());
}

#[tokio::test]
async fn test_decide_guard_rejects_second_decision() {
    let db = Database::in_memory().await.unwrap();
    seed_grant(&db, "U1", "E1").await;
    let campaign = seed_campaign(&db).await;

    let review = Review::pending(&campaign.campaign_id, "U1", "E1");
    ReviewRepo::insert_pending(db.pool(), &review).await.unwrap();

    assert!(ReviewRepo::decide(
        db.pool(),
        &review.review_id,
        ReviewStatus::Revoked,
        Utc::now(),
        None,
    )
    .await
    .unwrap());

    // Already decided; the guarded UPDATE must not touch the row again
    assert!(!ReviewRepo::decide(
        db.pool(),
        &review.review_id,
        ReviewStatus::Approved,
        Utc::now(),
        None,
    )
    .await
    .unwrap());

    let row = ReviewRepo::get_by_id(db.pool(), &review.review_id)
        .await
        .unwrap();
    assert_eq!(row.status, "REVOKED");
}

#[tokio::test]
async fn test_mark_remediated_sets_timestamp_at_most_once() {
    let db = Database::in_memory().await.unwrap();
    seed_grant(&db, "U1", "E1").await;
    let campaign = seed_campaign(&db).await;

    let review = Review::pending(&campaign.campaign_id, "U1", "E1");
    ReviewRepo::insert_pending(db.pool(), &review).await.unwrap();
    ReviewRepo::decide(
        db.pool(),
        &review.review_id,
        ReviewStatus::Revoked,
        Utc::now(),
        None,
    )
    .await
    .unwrap();

    assert!(ReviewRepo::mark_remediated(db.pool(), &review.review_id, Utc::now())
        .await
        .unwrap());
    assert!(!ReviewRepo::mark_remediated(db.pool(), &review.review_id, Utc::now())
        .await
        .unwrap());

    let candidates = ReviewRepo::list_revocation_candidates(db.pool())
        .await
        .unwrap();
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn test_revocation_candidates_ordered_oldest_first() {
    let db = Database::in_memory().await.unwrap();
    seed_grant(&db, "U1", "E1").await;
    seed_grant(&db, "U1", "E2").await;
    let campaign = seed_campaign(&db).await;

    let mut older = Review::pending(&campaign.campaign_id, "U1", "E1");
    older.created_at = "2026-03-01T08:00:00Z".parse().unwrap();
    let mut newer = Review::pending(&campaign.campaign_id, "U1", "E2");
    newer.created_at = "2026-03-02T08:00:00Z".parse().unwrap();

    // Insert newest first to prove ordering comes from created_at
    ReviewRepo::insert_pending(db.pool(), &newer).await.unwrap();
    ReviewRepo::insert_pending(db.pool(), &older).await.unwrap();
    for id in [&newer.review_id, &older.review_id] {
        ReviewRepo::decide(db.pool(), id, ReviewStatus::Revoked, Utc::now(), None)
            .await
            .unwrap();
    }

    let candidates = ReviewRepo::list_revocation_candidates(db.pool())
        .await
        .unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].review_id, older.review_id);
    assert_eq!(candidates[1].review_id, newer.review_id);
}
