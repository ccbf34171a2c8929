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
use keytrust::ErrorKind;

#[test]
fn test_unactivated_email_is_rejected() {
    let ctx = TestContext::new();
    ctx.accounts.add_email(ALICE, "alice-old@example.com", false);
    let cert = generate_cert("Alice <alice-old@example.com>");

    let err = ctx
        .service()
        .add_gpg_key(ALICE, &armored_public(&cert), "", "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoEmailFound);
    assert!(ctx.service().list_gpg_keys(ALICE).unwrap().is_empty());
}

#[test]
fn test_token_signature_keeps_only_signer() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let alice = ctx.user(ALICE);
    let signer = generate_cert("Alice <alice-old@example.com>");
    let bystander = generate_cert("Mallory <mallory@example.com>");

    let token = service.verification_token(&alice);
    let signature = armored_signature(&sign_primary(&signer, token.as_bytes()));
    let keys = service
        .add_gpg_key(
            ALICE,
            &armored_keyring(&[&bystander, &signer]),
            &token,
            &signature,
        )
        .unwrap();

    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].key_id, signer.keyid().to_hex());
    assert!(keys[0].verified);
    assert!(keys[0].emails.is_empty());

    let stored = service.list_gpg_keys(ALICE).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].sub_keys.len(), 1);
    assert!(service
        .gpg_import_by_key_id(&signer.keyid().to_hex())
        .is_ok());
}

#[test]
fn test_import_binds_activated_email_and_subkeys() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let cert = generate_cert("Alice <alice@example.com>");

    let keys = service
        .add_gpg_key(ALICE, &armored_public(&cert), "", "")
        .unwrap();
    assert_eq!(keys.len(), 1);
    let key = &keys[0];
    assert!(!key.verified);
    assert_eq!(key.emails.len(), 1);
    assert_eq!(key.emails[0].email, "alice@example.com");
    assert_eq!(key.sub_keys.len(), 1);
    assert_eq!(key.sub_keys[0].primary_key_id, key.key_id);

    let rebuilt = service.gpg_key_to_cert(&key.sub_keys[0]).unwrap();
    assert_eq!(rebuilt.fingerprint(), cert.fingerprint());
}

#[test]
fn test_same_key_cannot_be_imported_twice() {
    let ctx = TestContext::new();
    let service = ctx.service();
    ctx.accounts.add_email(BOB, "alice@example.com", true);
    let cert = generate_cert("Alice <alice@example.com>");
    let content = armored_public(&cert);

    service.add_gpg_key(ALICE, &content, "", "").unwrap();
    let err = service.add_gpg_key(BOB, &content, "", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(service.list_gpg_keys(BOB).unwrap().is_empty());
}

#[test]
fn test_gpg_ownership_proof() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let alice = ctx.user(ALICE);
    let cert = generate_cert("Alice <alice@example.com>");
    let key_id = cert.keyid().to_hex();
    service
        .add_gpg_key(ALICE, &armored_public(&cert), "", "")
        .unwrap();

    let wrong = armored_signature(&sign_subkey(&cert, b"not the token"));
    let err = service
        .prove_gpg_key_ownership(&alice, &key_id, &wrong)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTokenSignature);

    let token = service.verification_token(&alice);
    let proof = armored_signature(&sign_subkey(&cert, format!("{}\n", token).as_bytes()));
    assert_eq!(
        service
            .prove_gpg_key_ownership(&alice, &key_id, &proof)
            .unwrap(),
        key_id
    );
    assert!(service.list_gpg_keys(ALICE).unwrap()[0].verified);
}

#[test]
fn test_proof_for_unknown_key() {
    let ctx = TestContext::new();
    let alice = ctx.user(ALICE);
    let err = ctx
        .service()
        .prove_gpg_key_ownership(&alice, "0000000000000000", "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_delete_only_touches_own_keys() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let cert = generate_cert("Alice <alice@example.com>");
    let key = service
        .add_gpg_key(ALICE, &armored_public(&cert), "", "")
        .unwrap()
        .remove(0);

    service.delete_gpg_key(&ctx.user(BOB), key.id).unwrap();
    assert_eq!(service.list_gpg_keys(ALICE).unwrap().len(), 1);

    service.delete_gpg_key(&ctx.user(ALICE), key.id).unwrap();
    assert!(service.list_gpg_keys(ALICE).unwrap().is_empty());
    assert_eq!(
        service.gpg_import_by_key_id(&key.key_id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    service.delete_gpg_key(&ctx.user(ALICE), key.id).unwrap();
}
