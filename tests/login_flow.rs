// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login against a live backend, then persist the session and contacts the
//! way the dashboard does.

use sentechain::api::router;
use sentechain::models::is_wallet_address;
use sentechain::state::AppState;
use sentechain::wallet::{AuthApiClient, ContactBook, LocalStore, SessionStore, UserSession};

async fn spawn_backend() -> AuthApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(AppState::default())).await.unwrap();
    });
    AuthApiClient::new(format!("http://{addr}")).unwrap()
}

#[tokio::test]
async fn first_login_creates_user_and_persists_session() {
    let client = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();

    let login = client.login("alice@example.com").await.unwrap();
    assert!(login.success);
    assert!(login.is_new_user);
    assert!(is_wallet_address(&login.user.wallet_address));
    assert_eq!(login.user.email.as_deref(), Some("alice@example.com"));

    let sessions = SessionStore::new(LocalStore::open(dir.path()).unwrap());
    sessions.save(&UserSession::from_login(&login)).unwrap();

    let reopened = SessionStore::new(LocalStore::open(dir.path()).unwrap());
    let session = reopened.load().unwrap().expect("session persisted");
    assert_eq!(session.wallet_address, login.user.wallet_address);
    assert_eq!(session.token, login.token);

    reopened.logout().unwrap();
    assert!(reopened.load().unwrap().is_none());
}

#[tokio::test]
async fn repeat_login_returns_the_same_wallet() {
    let client = spawn_backend().await;

    let first = client.login("alice@example.com").await.unwrap();
    let second = client.login("alice@example.com").await.unwrap();
    assert!(!second.is_new_user);
    assert_eq!(second.user.wallet_address, first.user.wallet_address);
    assert_eq!(second.user.id, first.user.id);

    let profile = client
        .profile(&first.user.wallet_address.to_uppercase().replacen("0X", "0x", 1))
        .await
        .unwrap();
    assert_eq!(profile.user.id, first.user.id);

    let search = client.search("ALI").await.unwrap();
    assert_eq!(search.users.len(), 1);
    assert_eq!(search.users[0].wallet_address, first.user.wallet_address);

    let me = client.me(&second.token).await.unwrap();
    assert_eq!(me.user.username, first.user.username);
}

#[tokio::test]
async fn contacts_survive_reopen_with_case_preserved() {
    let client = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let login = client.login("+15551234567").await.unwrap();
    let owner = login.user.wallet_address.clone();
    let bob = format!("0x{}", "a".repeat(40));

    let book = ContactBook::new(LocalStore::open(dir.path()).unwrap(), &owner);
    book.add("Bob", &bob).unwrap();
    drop(book);

    let book = ContactBook::new(LocalStore::open(dir.path()).unwrap(), &owner);
    let contacts = book.list().unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].name, "Bob");
    assert_eq!(contacts[0].address, bob);
}
