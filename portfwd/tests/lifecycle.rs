#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Full record lifecycle against the in-memory store: create, reload,
//! rename, destroy.

use extradata::MemoryExtraData;
use portfwd::{Collection, ForwardedPort, Protocol};

fn rule(name: &str, guest: u16, host: u16) -> ForwardedPort {
    let mut port = ForwardedPort::new();
    port.set_name(name);
    port.set_guestport(guest);
    port.set_hostport(host);
    port
}

#[tokio::test]
async fn saved_rules_survive_a_reload() {
    let store = extradata::shared(MemoryExtraData::new("devbox"));

    let mut rules = Collection::new(store.clone());
    rules.push(rule("ssh", 22, 2222));
    let mut web = rule("web", 80, 8080);
    web.set_protocol(Protocol::Udp);
    rules.push(web);
    assert!(rules.save_all().await.unwrap());

    // a fresh populate sees exactly what was saved
    let reloaded = Collection::populate(store).await;
    assert_eq!(reloaded.len(), 2);
    let ssh = reloaded.find("ssh").unwrap();
    assert_eq!(ssh.guestport(), Some(22));
    assert_eq!(ssh.hostport(), Some(2222));
    assert_eq!(ssh.protocol(), Protocol::Tcp);
    let web = reloaded.find("web").unwrap();
    assert_eq!(web.protocol(), Protocol::Udp);
    assert!(!web.new_record());
}

#[tokio::test]
async fn renaming_a_rule_moves_its_keys() {
    let store = extradata::shared(MemoryExtraData::new("devbox"));

    let mut rules = Collection::new(store.clone());
    rules.push(rule("old", 22, 2222));
    assert!(rules.save_all().await.unwrap());

    let mut rules = Collection::populate(store.clone()).await;
    let port = rules.find_mut("old").unwrap();
    port.set_name("new");
    assert!(port.save().await.unwrap());

    let snapshot = store.lock().await.snapshot();
    assert!(snapshot.keys().all(|k| !k.contains("/old/")));
    let reloaded = Collection::populate(store).await;
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.first().unwrap().name(), Some("new"));
}

#[tokio::test]
async fn destroying_the_last_rule_empties_the_namespace() {
    let store = extradata::shared(MemoryExtraData::new("devbox"));

    let mut rules = Collection::new(store.clone());
    rules.push(rule("ssh", 22, 2222));
    assert!(rules.save_all().await.unwrap());

    let mut rules = Collection::populate(store.clone()).await;
    assert!(rules.destroy("ssh").await.unwrap());
    store.lock().await.save().await.unwrap();

    assert!(store.lock().await.snapshot().is_empty());
    assert!(Collection::populate(store).await.is_empty());
}
