//! ReconcileEntitlementsHandler - Repair pass between subscriptions and entitlements.
//!
//! Approval writes the subscription and the entitlement separately, so the two
//! can drift apart. This pass brings entitlements back in line:
//!
//! - a user with a live ACTIVE subscription gets `is_premium = true` and the
//!   latest `end_date` as expiry
//! - a user flagged premium without a live grant is revoked
//! - an ACTIVE record past its end date is persisted as EXPIRED
//!
//! Both scans walk every page of `batch_limit` records, so a pass covers
//! the whole store. Per-user failures are counted and logged; the pass keeps
//! going.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{
    Subscription, SubscriptionError, SubscriptionStatus, UserEntitlement,
};
use crate::ports::{Clock, EntitlementRepository, SubscriptionRepository};

use super::{latest_active_grant, store_failure};

const DEFAULT_BATCH_LIMIT: u32 = 500;

#[derive(Debug, Clone, Default)]
pub struct ReconcileEntitlementsCommand;

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Users whose entitlement was checked.
    pub examined: u32,
    pub granted: u32,
    pub revoked: u32,
    /// Lapsed ACTIVE records persisted as EXPIRED.
    pub expired: u32,
    pub failed: u32,
}

pub struct ReconcileEntitlementsHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
    clock: Arc<dyn Clock>,
    batch_limit: u32,
}

impl ReconcileEntitlementsHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscriptions,
            entitlements,
            clock,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }

    /// Page size for the ACTIVE and premium scans.
    pub fn with_batch_limit(mut self, limit: u32) -> Self {
        self.batch_limit = limit;
        self
    }

    pub async fn handle(
        &self,
        _cmd: ReconcileEntitlementsCommand,
    ) -> Result<ReconcileReport, SubscriptionError> {
        let now = self.clock.now();
        let mut report = ReconcileReport::default();

        // 1. Latest live grant per user; lapsed grants are persisted as EXPIRED
        let mut grants: BTreeMap<UserId, Subscription> = BTreeMap::new();
        let mut cursor: Option<SubscriptionId> = None;
        loop {
            let page = self
                .subscriptions
                .find_by_status(SubscriptionStatus::Active, cursor, self.batch_limit)
                .await
                .map_err(store_failure)?;
            let last_page = page.len() < self.batch_limit as usize;
            cursor = page.last().map(|sub| sub.id);

            for mut sub in page {
                if !sub.is_active_at(now) {
                    self.expire(&mut sub, now, &mut report).await;
                    continue;
                }
                match grants.get(&sub.user_id) {
                    Some(current) if current.end_date >= sub.end_date => {}
                    _ => {
                        grants.insert(sub.user_id.clone(), sub);
                    }
                }
            }

            if last_page || cursor.is_none() {
                break;
            }
        }

        // 2. Grant or correct missing entitlements
        for (user_id, grant) in &grants {
            report.examined += 1;
            match self.entitlements.get(user_id).await {
                Ok(Some(current)) if current.matches_grant(grant) => continue,
                Ok(_) => {}
                Err(err) => {
                    error!(user_id = %user_id, error = %err, "entitlement read failed during reconcile");
                    report.failed += 1;
                    continue;
                }
            }

            let Some(entitlement) = UserEntitlement::from_grant(grant) else {
                report.failed += 1;
                continue;
            };
            match self.entitlements.write(&entitlement).await {
                Ok(()) => {
                    info!(
                        user_id = %user_id,
                        subscription_id = %grant.id,
                        expiry = ?entitlement.subscription_expiry,
                        "entitlement granted by reconcile"
                    );
                    report.granted += 1;
                }
                Err(err) => {
                    error!(user_id = %user_id, error = %err, "entitlement grant failed during reconcile");
                    report.failed += 1;
                }
            }
        }

        // 3. Revoke premium without a live grant
        let mut after: Option<UserId> = None;
        loop {
            let page = self
                .entitlements
                .find_premium(after.as_ref(), self.batch_limit)
                .await
                .map_err(store_failure)?;
            let last_page = page.len() < self.batch_limit as usize;
            after = page.last().map(|entitlement| entitlement.user_id.clone());

            for entitlement in page {
                if !grants.contains_key(&entitlement.user_id) {
                    self.revoke(entitlement, now, &mut report).await;
                }
            }

            if last_page || after.is_none() {
                break;
            }
        }

        info!(
            examined = report.examined,
            granted = report.granted,
            revoked = report.revoked,
            expired = report.expired,
            failed = report.failed,
            "entitlement reconcile finished"
        );
        Ok(report)
    }

    async fn revoke(
        &self,
        entitlement: UserEntitlement,
        now: Timestamp,
        report: &mut ReconcileReport,
    ) {
        report.examined += 1;

        // Approvals may land after the grant scan
        match latest_active_grant(self.subscriptions.as_ref(), &entitlement.user_id, now).await {
            Ok(Some(grant)) => {
                warn!(
                    user_id = %entitlement.user_id,
                    subscription_id = %grant.id,
                    "live grant found after scan, leaving entitlement for next pass"
                );
                return;
            }
            Ok(None) => {}
            Err(err) => {
                error!(user_id = %entitlement.user_id, error = %err, "subscription lookup failed during reconcile");
                report.failed += 1;
                return;
            }
        }

        match self
            .entitlements
            .write(&UserEntitlement::none(entitlement.user_id.clone()))
            .await
        {
            Ok(()) => {
                info!(user_id = %entitlement.user_id, "premium revoked by reconcile");
                report.revoked += 1;
            }
            Err(err) => {
                error!(user_id = %entitlement.user_id, error = %err, "premium revoke failed during reconcile");
                report.failed += 1;
            }
        }
    }

    async fn expire(&self, sub: &mut Subscription, now: Timestamp, report: &mut ReconcileReport) {
        if let Err(err) = sub.mark_expired(now) {
            error!(subscription_id = %sub.id, error = %err, "lapsed subscription could not be expired");
            report.failed += 1;
            return;
        }
        match self.subscriptions.update(sub).await {
            Ok(()) => {
                info!(
                    subscription_id = %sub.id,
                    user_id = %sub.user_id,
                    end_date = ?sub.end_date,
                    "lapsed subscription marked expired"
                );
                report.expired += 1;
            }
            Err(err) => {
                error!(subscription_id = %sub.id, error = %err, "expiry write failed during reconcile");
                report.failed += 1;
            }
        }
    }
}
