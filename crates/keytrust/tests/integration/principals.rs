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
fn test_allowed_principals() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let alice = ctx.user(ALICE);

    assert_eq!(
        service.check_principal_key_string(&alice, " alice ").unwrap(),
        "alice"
    );
    assert_eq!(
        service
            .check_principal_key_string(&alice, "alice@example.com")
            .unwrap(),
        "alice@example.com"
    );

    let err = service
        .check_principal_key_string(&alice, "root")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(err.to_string().contains("email,username"));

    assert!(service
        .check_principal_key_string(&alice, "alice\nroot")
        .is_err());
    assert!(service.check_principal_key_string(&alice, "  ").is_err());
}

#[test]
fn test_unactivated_email_is_not_a_principal() {
    let ctx = TestContext::new();
    ctx.accounts.add_email(ALICE, "alice@work.example", false);
    let err = ctx
        .service()
        .check_principal_key_string(&ctx.user(ALICE), "alice@work.example")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_anything_allows_all() {
    let mut ctx = TestContext::new();
    ctx.config.ssh.authorized_principals_allow = vec!["anything".to_string()];
    assert_eq!(
        ctx.service()
            .check_principal_key_string(&ctx.user(BOB), "deploy-bot")
            .unwrap(),
        "deploy-bot"
    );
}

#[test]
fn test_principals_file_follows_store() {
    let ctx = TestContext::new();
    let service = ctx.service();

    let key = service.add_principal_key(ALICE, "alice", 0).unwrap();
    assert!(key.fingerprint.is_empty());
    let file = ctx.read_ssh_file("authorized_principals");
    assert!(file.contains("# gitea public key"));
    assert!(file.contains(&format!("serv key-{}", key.id)));
    assert!(file.ends_with(" alice\n"));
    assert!(ctx.read_ssh_file("authorized_keys").is_empty());

    let err = service.add_principal_key(BOB, "alice", 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    service.delete_public_key(&ctx.user(ALICE), key.id).unwrap();
    assert!(!ctx
        .read_ssh_file("authorized_principals")
        .contains("# gitea public key"));
}
