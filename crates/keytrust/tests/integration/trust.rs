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

use crate::fixtures::*;
use keytrust::models::{TrustModel, TrustStatus, User};
use keytrust::verification::{NoRepositoryKey, SigningSettings};
use keytrust::{calculate_trust_status, KeyError, KeyService};
use std::cell::Cell;

fn alice_signed(service: &KeyService) -> keytrust::CommitVerification {
    let cert = generate_cert("Alice <alice@example.com>");
    service
        .add_gpg_key(ALICE, &armored_public(&cert), "", "")
        .unwrap();
    let signature = armored_signature(&sign_primary(&cert, PAYLOAD.as_bytes()));
    let v = service
        .commit_verifier()
        .verify_commit(&commit("c1", "alice@example.com", Some(signature)), &NoRepositoryKey);
    assert!(v.verified);
    assert_eq!(v.committing_user.as_ref().map(|u| u.id), Some(ALICE));
    v
}

fn classify(v: &keytrust::CommitVerification, model: TrustModel, member: bool) -> Option<TrustStatus> {
    let mut v = v.clone();
    calculate_trust_status(&mut v, model, &mut |_: &User| Ok(member), None).unwrap();
    v.trust_status
}

#[test]
fn test_committer_model_does_not_consult_membership() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let v = alice_signed(&service);

    assert_eq!(classify(&v, TrustModel::Committer, true), Some(TrustStatus::Trusted));
    assert_eq!(classify(&v, TrustModel::Committer, false), Some(TrustStatus::Trusted));
}

#[test]
fn test_collaborator_models_follow_membership() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let v = alice_signed(&service);

    assert_eq!(classify(&v, TrustModel::Collaborator, true), Some(TrustStatus::Trusted));
    assert_eq!(classify(&v, TrustModel::Collaborator, false), Some(TrustStatus::Untrusted));
    assert_eq!(
        classify(&v, TrustModel::CollaboratorCommitter, true),
        Some(TrustStatus::Trusted)
    );
}

#[test]
fn test_unverified_commits_have_no_status() {
    let ctx = TestContext::new();
    let mut v = ctx
        .service()
        .commit_verifier()
        .verify_commit(&commit("c1", "alice@example.com", None), &NoRepositoryKey);
    calculate_trust_status(&mut v, TrustModel::Collaborator, &mut |_: &User| Ok(true), None)
        .unwrap();
    assert_eq!(v.trust_status, None);
}

#[test]
fn test_membership_failure_is_reported() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let mut v = alice_signed(&service);

    let result = calculate_trust_status(
        &mut v,
        TrustModel::Collaborator,
        &mut |_: &User| Err(KeyError::Database("membership lookup failed".to_string())),
        None,
    );
    assert!(result.is_err());
    assert_eq!(v.trust_status, Some(TrustStatus::Untrusted));
}

#[test]
fn test_batch_shares_membership_answers() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let cert = generate_cert("Alice <alice@example.com>");
    service
        .add_gpg_key(ALICE, &armored_public(&cert), "", "")
        .unwrap();
    let signature = armored_signature(&sign_primary(&cert, PAYLOAD.as_bytes()));
    let bot = generate_cert("Repo Bot <bot@example.com>");
    let repository = SigningSettings {
        sign: true,
        key_id: bot.keyid().to_hex(),
        name: "Repo Bot".to_string(),
        email: "bot@example.com".to_string(),
        public_key_content: armored_public(&bot),
    };

    let commits = vec![
        commit("c1", "alice@example.com", Some(signature.clone())),
        commit("c2", "alice@example.com", Some(signature)),
        commit(
            "c3",
            "alice@example.com",
            Some(armored_signature(&sign_primary(&bot, PAYLOAD.as_bytes()))),
        ),
        commit("c4", "alice@example.com", None),
    ];

    let calls = Cell::new(0);
    let statuses: Vec<_> = service
        .commit_verifier()
        .verify_commits(
            &commits,
            &repository,
            TrustModel::CollaboratorCommitter,
            &mut |_: &User| {
                calls.set(calls.get() + 1);
                Ok(true)
            },
        )
        .into_iter()
        .map(|v| v.trust_status)
        .collect();

    assert_eq!(calls.get(), 1);
    assert_eq!(
        statuses,
        vec![
            Some(TrustStatus::Trusted),
            Some(TrustStatus::Trusted),
            Some(TrustStatus::Untrusted),
            None
        ]
    );
}
