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
use keytrust::models::KeyType;
use keytrust::ErrorKind;

#[test]
fn test_encodings_normalise_to_one_line() {
    let ctx = TestContext::new();
    let service = ctx.service();

    let openssh = service.check_public_key_string(OTHER_OPENSSH).unwrap();
    let ssh2 = service.check_public_key_string(OTHER_SSH2).unwrap();
    let pem = service.check_public_key_string(OTHER_PEM).unwrap();
    assert_eq!(openssh, OTHER_OPENSSH);
    assert_eq!(ssh2, openssh);
    assert_eq!(pem, openssh);

    let fingerprint = service.calc_fingerprint(&openssh).unwrap();
    assert!(fingerprint.starts_with("SHA256:"));
    assert_eq!(service.calc_fingerprint(&ssh2).unwrap(), fingerprint);
}

#[test]
fn test_add_appends_to_authorized_keys() {
    let ctx = TestContext::new();
    let service = ctx.service();

    let key = service
        .add_public_key(ALICE, "laptop", OTHER_SSH2, 0)
        .unwrap();
    assert_eq!(key.content, OTHER_OPENSSH);
    assert_eq!(key.key_type, KeyType::User);
    assert!(!key.verified);

    let file = ctx.read_ssh_file("authorized_keys");
    assert!(file.contains("# gitea public key"));
    assert!(file.contains(&format!("serv key-{}", key.id)));
    assert!(file.contains(OTHER_OPENSSH));

    let found = service.search_public_key_by_content(OTHER_OPENSSH).unwrap();
    assert_eq!(found.id, key.id);
    let prefix = &OTHER_OPENSSH[..40];
    assert_eq!(
        service.search_public_key_by_content_prefix(prefix).unwrap().id,
        key.id
    );
    assert_eq!(service.list_public_keys(ALICE).unwrap().len(), 1);
    assert!(service.list_public_keys(BOB).unwrap().is_empty());
}

#[test]
fn test_duplicates_are_rejected() {
    let ctx = TestContext::new();
    let service = ctx.service();
    service.add_public_key(ALICE, "laptop", OTHER_OPENSSH, 0).unwrap();

    let err = service
        .add_public_key(BOB, "desktop", OTHER_PEM, 0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = service
        .add_public_key(ALICE, "laptop", SSH_PUBLIC, 0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    // Nothing from the failed attempts reached the file.
    let file = ctx.read_ssh_file("authorized_keys");
    assert_eq!(file.matches("# gitea public key").count(), 1);
}

#[test]
fn test_invalid_input() {
    let ctx = TestContext::new();
    let service = ctx.service();
    assert!(service.add_public_key(ALICE, "junk", "ssh-ed25519 !!!", 0).is_err());
    assert!(service
        .add_public_key(ALICE, "mismatch", &OTHER_OPENSSH.replace("ssh-ed25519", "ssh-rsa"), 0)
        .is_err());
    assert!(service.list_public_keys(ALICE).unwrap().is_empty());
}

#[test]
fn test_delete_requires_owner_or_admin() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let key = service.add_public_key(ALICE, "laptop", OTHER_OPENSSH, 0).unwrap();
    let other = service.add_public_key(ALICE, "signing", SSH_PUBLIC, 0).unwrap();

    let err = service.delete_public_key(&ctx.user(BOB), key.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    service.delete_public_key(&ctx.user(ALICE), key.id).unwrap();
    let file = ctx.read_ssh_file("authorized_keys");
    assert!(!file.contains(OTHER_OPENSSH));
    assert!(file.contains(&format!("serv key-{}", other.id)));

    service.delete_public_key(&ctx.user(ADMIN), other.id).unwrap();
    assert!(service.list_public_keys(ALICE).unwrap().is_empty());
    assert_eq!(
        service.public_key_by_id(other.id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_rewrite_is_idempotent_and_keeps_foreign_lines() {
    let ctx = TestContext::new();
    let service = ctx.service();
    std::fs::write(
        ctx.ssh_root.path().join("authorized_keys"),
        "ssh-ed25519 AAAAforeign admin@host\n",
    )
    .unwrap();
    service.add_public_key(ALICE, "laptop", OTHER_OPENSSH, 0).unwrap();

    service
        .authorized_keys()
        .rewrite_all_public_keys(service.store())
        .unwrap();
    let first = ctx.read_ssh_file("authorized_keys");
    service
        .authorized_keys()
        .rewrite_all_public_keys(service.store())
        .unwrap();
    let second = ctx.read_ssh_file("authorized_keys");

    assert_eq!(first, second);
    assert_eq!(first.matches("# gitea public key").count(), 1);
    assert_eq!(first.matches("admin@host").count(), 1);
}

#[test]
fn test_ssh_ownership_proof() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let alice = ctx.user(ALICE);
    let key = service.add_public_key(ALICE, "signing", SSH_PUBLIC, 0).unwrap();

    let wrong = ssh_sign("gitea", b"some other text");
    let err = service
        .prove_ssh_key_ownership(&alice, &key.fingerprint, &wrong)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTokenSignature);

    let wrong_namespace = ssh_sign("git", service.verification_token(&alice).as_bytes());
    assert!(service
        .prove_ssh_key_ownership(&alice, &key.fingerprint, &wrong_namespace)
        .is_err());

    let token = service.verification_token(&alice);
    let proof = ssh_sign("gitea", token.as_bytes());
    assert_eq!(
        service
            .prove_ssh_key_ownership(&alice, &key.fingerprint, &proof)
            .unwrap(),
        key.fingerprint
    );
    assert!(service.public_key_by_id(key.id).unwrap().verified);

    // Bob cannot prove a key he does not own.
    let bob = ctx.user(BOB);
    let err = service
        .prove_ssh_key_ownership(&bob, &key.fingerprint, &proof)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_usage_and_external_management() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let key = service.add_public_key(ALICE, "ldap", OTHER_OPENSSH, 7).unwrap();
    assert!(!key.has_used());

    std::thread::sleep(std::time::Duration::from_millis(10));
    service.update_public_key_updated(key.id).unwrap();
    assert!(service.public_key_by_id(key.id).unwrap().has_used());
    assert_eq!(
        service.update_public_key_updated(9999).unwrap_err().kind(),
        ErrorKind::NotFound
    );

    let keys = service.list_public_keys_by_source(ALICE, 7).unwrap();
    assert_eq!(keys.len(), 1);
    assert!(!service.public_keys_are_externally_managed(&keys).unwrap());
    ctx.accounts.set_source_syncs_keys(7);
    assert!(service.public_keys_are_externally_managed(&keys).unwrap());
}
