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

const REPO: i64 = 10;
const OTHER_REPO: i64 = 11;

#[test]
fn test_one_public_key_serves_several_repositories() {
    let ctx = TestContext::new();
    let service = ctx.service();

    let first = service.add_deploy_key(REPO, "ci", OTHER_OPENSSH, true).unwrap();
    let second = service
        .add_deploy_key(OTHER_REPO, "ci", OTHER_PEM, false)
        .unwrap();

    assert_eq!(first.key_id, second.key_id);
    assert!(first.is_read_only());
    assert!(!second.is_read_only());
    assert!(service.has_deploy_key(first.key_id, REPO).unwrap());
    assert!(service.has_deploy_key(first.key_id, OTHER_REPO).unwrap());

    let public = service.public_key_by_id(first.key_id).unwrap();
    assert_eq!(public.key_type, KeyType::Deploy);
    assert_eq!(public.owner_id, 0);
    assert_eq!(service.deploy_key_content(&second).unwrap(), OTHER_OPENSSH);

    let file = ctx.read_ssh_file("authorized_keys");
    assert_eq!(file.matches("# gitea public key").count(), 1);
    assert_eq!(
        service
            .search_deploy_keys(0, first.key_id, "")
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn test_deploy_key_conflicts() {
    let ctx = TestContext::new();
    let service = ctx.service();
    service.add_deploy_key(REPO, "ci", OTHER_OPENSSH, true).unwrap();

    let err = service
        .add_deploy_key(REPO, "ci-again", OTHER_OPENSSH, true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = service
        .add_deploy_key(REPO, "ci", SSH_PUBLIC, true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    // The rejected key never reaches authorized_keys.
    assert!(!ctx.read_ssh_file("authorized_keys").contains(SSH_PUBLIC));
    assert!(service.search_public_key_by_content(SSH_PUBLIC).is_err());

    // A user key cannot become a deploy key.
    service.add_public_key(ALICE, "laptop", SSH_PUBLIC, 0).unwrap();
    let err = service
        .add_deploy_key(OTHER_REPO, "stolen", SSH_PUBLIC, true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(service.list_deploy_keys(OTHER_REPO).unwrap().is_empty());
}

#[test]
fn test_last_binding_removes_public_key() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let first = service.add_deploy_key(REPO, "ci", OTHER_OPENSSH, true).unwrap();
    let second = service
        .add_deploy_key(OTHER_REPO, "ci", OTHER_OPENSSH, true)
        .unwrap();

    let err = service.delete_deploy_key(&ctx.user(BOB), first.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    ctx.accounts.grant_repo_admin(BOB, REPO);
    service.delete_deploy_key(&ctx.user(BOB), first.id).unwrap();
    assert!(service.is_deploy_key_exist_by_key_id(first.key_id).unwrap());
    assert!(service.public_key_by_id(first.key_id).is_ok());

    service.delete_deploy_key(&ctx.user(ADMIN), second.id).unwrap();
    assert!(!service.is_deploy_key_exist_by_key_id(first.key_id).unwrap());
    assert_eq!(
        service.public_key_by_id(first.key_id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(!ctx.read_ssh_file("authorized_keys").contains(OTHER_OPENSSH));

    // Already gone.
    service.delete_deploy_key(&ctx.user(ADMIN), second.id).unwrap();
}

#[test]
fn test_deleting_public_key_leaves_bindings() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let deploy = service.add_deploy_key(REPO, "ci", OTHER_OPENSSH, true).unwrap();

    service
        .delete_public_key(&ctx.user(ADMIN), deploy.key_id)
        .unwrap();

    assert!(service.public_key_by_id(deploy.key_id).is_err());
    assert!(service.is_deploy_key_exist_by_key_id(deploy.key_id).unwrap());
    assert_eq!(service.deploy_key_by_id(deploy.id).unwrap().repo_id, REPO);
}
