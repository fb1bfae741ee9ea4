// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Give every account a referral code and a `referredBy` field.

use super::{unset_fields, update_each, Migration};
use crate::db::{collections, FirestoreDb};
use crate::error::AppError;
use crate::models::account::generate_referral_code;
use async_trait::async_trait;
use serde_json::Value;

const REFERRAL_CODE: &str = "referralCode";
const REFERRED_BY: &str = "referredBy";

pub struct AddAccountReferralCode;

#[async_trait]
impl Migration for AddAccountReferralCode {
    fn id(&self) -> &'static str {
        "002-AddAccountReferralCode"
    }

    async fn up(&self, db: &FirestoreDb) -> Result<(), AppError> {
        update_each(db, collections::ACCOUNTS, |doc| {
            let mut changed = false;
            if doc.get(REFERRAL_CODE).map_or(true, Value::is_null) {
                doc.insert(
                    REFERRAL_CODE.to_string(),
                    Value::String(generate_referral_code()?),
                );
                changed = true;
            }
            if !doc.contains_key(REFERRED_BY) {
                doc.insert(REFERRED_BY.to_string(), Value::Null);
                changed = true;
            }
            Ok(changed)
        })
        .await?;
        db.ensure_index(collections::ACCOUNTS, REFERRAL_CODE).await
    }

    async fn down(&self, db: &FirestoreDb) -> Result<(), AppError> {
        unset_fields(db, collections::ACCOUNTS, &[REFERRAL_CODE, REFERRED_BY]).await?;
        db.drop_index(collections::ACCOUNTS, REFERRAL_CODE).await
    }
}
