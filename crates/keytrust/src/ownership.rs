/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Ownership-proof challenge tokens.
//!
//! A token commits to the account (creation time, name, email and id) and
//! to the end of its validity window, rounded down to the minute. Signing
//! it with a key proves possession of the private half.

use crate::models::User;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sha2::{Digest, Sha256};

const TOKEN_TIME_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    let secs = at.timestamp() - at.timestamp().rem_euclid(60);
    Utc.timestamp_opt(secs, 0).single().unwrap_or(at)
}

/// The token for `user` valid until `minutes` after the current minute.
pub fn verification_token(user: &User, minutes: i64) -> String {
    verification_token_at(user, minutes, Utc::now())
}

/// [`verification_token`] evaluated at `now`.
pub fn verification_token_at(user: &User, minutes: i64, now: DateTime<Utc>) -> String {
    let expiry = truncate_to_minute(now) + Duration::minutes(minutes);
    let material = format!(
        "{}:{}:{}:{}:{}",
        expiry.format(TOKEN_TIME_FORMAT),
        user.created_at.format(TOKEN_TIME_FORMAT),
        user.name,
        user.email,
        user.id
    );
    hex::encode(Sha256::digest(material.as_bytes()))
}

/// Tokens a proof submitted at `now` may have signed: the one currently
/// issued, then the one issued during the previous minute.
pub fn accepted_tokens(user: &User, minutes: i64, now: DateTime<Utc>) -> [String; 2] {
    [
        verification_token_at(user, minutes, now),
        verification_token_at(user, minutes - 1, now),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let mut user = User::placeholder("user2", "user2@example.com");
        user.id = 2;
        user.created_at = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
        user
    }

    #[test]
    fn test_token_material() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 30).unwrap();
        let expected = hex::encode(Sha256::digest(
            b"Tue, 02 Jan 2024 03:05:00 +0000:Sun, 01 Jan 2017 00:00:00 +0000:user2:user2@example.com:2",
        ));
        assert_eq!(verification_token_at(&user(), 1, now), expected);
        assert_eq!(verification_token_at(&user(), 1, now).len(), 64);
    }

    #[test]
    fn test_token_stable_within_minute() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 0).unwrap();
        let late = start + Duration::seconds(59);
        let next = start + Duration::seconds(60);

        let token = verification_token_at(&user(), 1, start);
        assert_eq!(token, verification_token_at(&user(), 1, late));
        assert_ne!(token, verification_token_at(&user(), 1, next));
    }

    #[test]
    fn test_previous_window_accepted() {
        let issued = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 10).unwrap();
        let token = verification_token_at(&user(), 1, issued);
        let submitted = issued + Duration::seconds(60);
        assert!(accepted_tokens(&user(), 1, submitted).contains(&token));
        let too_late = issued + Duration::seconds(180);
        assert!(!accepted_tokens(&user(), 1, too_late).contains(&token));
    }

    #[test]
    fn test_token_binds_identity() {
        let now = Utc::now();
        let mut other = user();
        other.email = "someone@example.com".to_string();
        assert_ne!(
            verification_token_at(&user(), 1, now),
            verification_token_at(&other, 1, now)
        );
    }
}
