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
use keytrust::models::Reason;
use keytrust::verification::{NoRepositoryKey, SigningSettings};

#[test]
fn test_subkey_signature_reports_subkey() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let cert = generate_cert("Alice <alice@example.com>");
    let key = service
        .add_gpg_key(ALICE, &armored_public(&cert), "", "")
        .unwrap()
        .remove(0);
    let subkey_id = key.sub_keys[0].key_id.clone();

    let signature = armored_signature(&sign_subkey(&cert, PAYLOAD.as_bytes()));
    let v = service
        .commit_verifier()
        .verify_commit(&commit("c1", "alice@example.com", Some(signature)), &NoRepositoryKey);

    assert!(v.verified, "{:?}", v.reason);
    let signing_key = v.signing_key.unwrap();
    assert_eq!(signing_key.key_id, subkey_id);
    assert_eq!(signing_key.primary_key_id, key.key_id);
    assert_eq!(v.signing_user.unwrap().id, ALICE);
    assert_eq!(v.signing_email, "alice@example.com");
    assert_eq!(v.reason, Reason::Verified(format!("alice / {}", subkey_id)));
}

#[test]
fn test_unknown_signer_and_unsigned() {
    let ctx = TestContext::new();
    let verifier = ctx.service().commit_verifier();
    let stranger = generate_cert("Stranger <stranger@example.com>");
    let signature = armored_signature(&sign_primary(&stranger, PAYLOAD.as_bytes()));

    let v = verifier.verify_commit(
        &commit("c1", "alice@example.com", Some(signature)),
        &NoRepositoryKey,
    );
    assert!(!v.verified);
    assert!(!v.warning);
    assert_eq!(v.reason, Reason::NoKeyFound);
    assert_eq!(
        v.signing_key.unwrap().key_id,
        stranger.keyid().to_hex()
    );

    let v = verifier.verify_commit(&commit("c2", "alice@example.com", None), &NoRepositoryKey);
    assert_eq!(v.reason, Reason::NotSigned);
    assert_eq!(v.committing_user.unwrap().id, ALICE);
}

#[test]
fn test_deleted_key_no_longer_verifies() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let cert = generate_cert("Alice <alice@example.com>");
    let key = service
        .add_gpg_key(ALICE, &armored_public(&cert), "", "")
        .unwrap()
        .remove(0);
    let signature = armored_signature(&sign_primary(&cert, PAYLOAD.as_bytes()));
    let signed = commit("c1", "alice@example.com", Some(signature));

    assert!(service.commit_verifier().verify_commit(&signed, &NoRepositoryKey).verified);
    service.delete_gpg_key(&ctx.user(ALICE), key.id).unwrap();
    let v = service.commit_verifier().verify_commit(&signed, &NoRepositoryKey);
    assert_eq!(v.reason, Reason::NoKeyFound);
}

#[test]
fn test_repository_key_signs_for_placeholder() {
    let ctx = TestContext::new();
    let cert = generate_cert("Repo Bot <bot@example.com>");
    let repository = SigningSettings {
        sign: true,
        key_id: cert.keyid().to_hex(),
        name: "Repo Bot".to_string(),
        email: "bot@example.com".to_string(),
        public_key_content: armored_public(&cert),
    };
    let signature = armored_signature(&sign_primary(&cert, PAYLOAD.as_bytes()));

    let v = ctx
        .service()
        .commit_verifier()
        .verify_commit(&commit("c1", "alice@example.com", Some(signature)), &repository);
    assert!(v.verified);
    let signer = v.signing_user.unwrap();
    assert!(signer.is_placeholder());
    assert_eq!(signer.email, "bot@example.com");
}

#[test]
fn test_ssh_signature_needs_verified_key() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let alice = ctx.user(ALICE);
    let key = service.add_public_key(ALICE, "signing", SSH_PUBLIC, 0).unwrap();
    let signed = commit("c1", "alice@example.com", Some(ssh_sign("git", PAYLOAD.as_bytes())));

    let v = service.commit_verifier().verify_commit(&signed, &NoRepositoryKey);
    assert_eq!(v.reason, Reason::NoKeyFound);

    let proof = ssh_sign("gitea", service.verification_token(&alice).as_bytes());
    service
        .prove_ssh_key_ownership(&alice, &key.fingerprint, &proof)
        .unwrap();

    let v = service.commit_verifier().verify_commit(&signed, &NoRepositoryKey);
    assert!(v.verified, "{:?}", v.reason);
    assert_eq!(v.signing_ssh_key.unwrap().fingerprint, key.fingerprint);

    // Bob's address does not belong to the key's owner.
    let as_bob = commit("c2", "bob@example.com", Some(ssh_sign("git", PAYLOAD.as_bytes())));
    let v = service.commit_verifier().verify_commit(&as_bob, &NoRepositoryKey);
    assert!(!v.verified);
}
