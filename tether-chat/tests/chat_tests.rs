/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use futures::stream;
use tether::prelude::*;
use tether_chat::{
    run_client_session, ChatMessage, Connect, Disconnect, Incoming, Rejected, RelayConfig,
};
use tether_test::prelude::*;

use crate::setup::{chat, initialize_tracing, launch_engine, ChatClient, ChatServer};

mod setup;

#[tether_test]
async fn test_alice_says_hi_to_bob_then_quits() -> anyhow::Result<()> {
    initialize_tracing();
    let server = ChatServer::start(RelayConfig::default()).await?;
    let mut alice = ChatClient::join(&server, "alice").await?;
    let mut bob = ChatClient::join(&server, "bob").await?;

    let lines = stream::iter(vec!["hi".to_string(), "quit".to_string(), "never sent".to_string()]);
    run_client_session(&alice.engine, &server.pid, &alice.pid, "alice", lines).await;

    assert_eq!(bob.next().await, chat("hi", "alice"));
    bob.assert_quiet(200).await;

    // Alice's client has been torn down without rendering anything.
    assert!(alice.incoming.recv().await.is_none());
    assert!(!alice.engine.contains(&alice.pid));

    let (alice_address, bob_address) = (alice.address().to_string(), bob.address().to_string());
    server
        .wait_for_roster(|roster| roster.username_of(&alice_address).is_none())
        .await;
    let roster = server.roster.snapshot();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster.username_of(&bob_address), Some("bob"));

    alice.engine.shutdown().await;
    bob.engine.shutdown().await;
    server.engine.shutdown().await;
    Ok(())
}

#[tether_test]
async fn test_end_of_input_disconnects_like_quit() -> anyhow::Result<()> {
    initialize_tracing();
    let server = ChatServer::start(RelayConfig::default()).await?;
    let alice = ChatClient::join(&server, "alice").await?;

    run_client_session(&alice.engine, &server.pid, &alice.pid, "alice", stream::empty()).await;

    server.wait_for_roster(|roster| roster.is_empty()).await;
    alice.engine.shutdown().await;
    server.engine.shutdown().await;
    Ok(())
}

#[tether_test]
async fn test_duplicate_connect_keeps_first_username() -> anyhow::Result<()> {
    initialize_tracing();
    let server = ChatServer::start(RelayConfig::default()).await?;
    let alice = ChatClient::join(&server, "alice").await?;
    let mut bob = ChatClient::join(&server, "bob").await?;

    let impostor = Pid::new(alice.address(), "client/mallory");
    let connect = Connect {
        username: "mallory".into(),
    };
    alice
        .engine
        .send(&server.pid, connect.into(), Some(impostor))
        .await;
    // Same link, so the relay handles the duplicate before this line.
    alice.say(&server, "still me").await;
    assert_eq!(bob.next().await, chat("still me", "alice"));

    let roster = server.roster.snapshot();
    assert_eq!(roster.len(), 2);
    assert_eq!(roster.username_of(alice.address()), Some("alice"));

    alice.engine.shutdown().await;
    bob.engine.shutdown().await;
    server.engine.shutdown().await;
    Ok(())
}

#[tether_test]
async fn test_disconnect_from_unknown_peer_is_a_no_op() -> anyhow::Result<()> {
    initialize_tracing();
    let server = ChatServer::start(RelayConfig::default()).await?;
    let mut alice = ChatClient::join(&server, "alice").await?;

    let stranger = launch_engine().await?;
    let stranger_pid = Pid::new(stranger.address(), "client/stranger");
    stranger
        .send(&server.pid, Disconnect {}.into(), Some(stranger_pid.clone()))
        .await;
    let late = Connect {
        username: "late".into(),
    };
    stranger
        .send(&server.pid, late.into(), Some(stranger_pid))
        .await;

    let stranger_address = stranger.address().to_string();
    server
        .wait_for_roster(|roster| roster.username_of(&stranger_address) == Some("late"))
        .await;
    let roster = server.roster.snapshot();
    assert_eq!(roster.len(), 2);
    assert_eq!(roster.username_of(alice.address()), Some("alice"));
    alice.assert_quiet(100).await;

    stranger.shutdown().await;
    alice.engine.shutdown().await;
    server.engine.shutdown().await;
    Ok(())
}

#[tether_test]
async fn test_broadcast_excludes_sender() -> anyhow::Result<()> {
    initialize_tracing();
    let server = ChatServer::start(RelayConfig::default()).await?;
    let mut c1 = ChatClient::join(&server, "c1").await?;
    let mut c2 = ChatClient::join(&server, "c2").await?;
    let mut c3 = ChatClient::join(&server, "c3").await?;

    c1.say(&server, "from one").await;
    assert_eq!(c2.next().await, chat("from one", "c1"));
    assert_eq!(c3.next().await, chat("from one", "c1"));

    c2.say(&server, "from two").await;
    assert_eq!(c1.next().await, chat("from two", "c2"));
    assert_eq!(c3.next().await, chat("from two", "c2"));

    c1.assert_quiet(200).await;
    c2.assert_quiet(0).await;
    c3.assert_quiet(0).await;

    for client in [c1, c2, c3] {
        client.engine.shutdown().await;
    }
    server.engine.shutdown().await;
    Ok(())
}

#[tether_test]
async fn test_messages_without_sender_are_ignored() -> anyhow::Result<()> {
    initialize_tracing();
    let server = ChatServer::start(RelayConfig::default()).await?;
    let mut alice = ChatClient::join(&server, "alice").await?;

    let anonymous = ChatMessage {
        text: "who am i".into(),
        username: "nobody".into(),
    };
    alice.engine.send(&server.pid, anonymous.into(), None).await;

    alice.assert_quiet(200).await;
    assert_eq!(server.roster.snapshot().len(), 1);

    alice.engine.shutdown().await;
    server.engine.shutdown().await;
    Ok(())
}

#[tether_test]
async fn test_lost_peer_is_dropped_from_registry() -> anyhow::Result<()> {
    initialize_tracing();
    let server = ChatServer::start(RelayConfig::default()).await?;
    let alice = ChatClient::join(&server, "alice").await?;
    let mut bob = ChatClient::join(&server, "bob").await?;

    // Forces the relay to open a link to bob.
    alice.say(&server, "ping").await;
    assert_eq!(bob.next().await, chat("ping", "alice"));

    let bob_address = bob.address().to_string();
    bob.engine.shutdown().await;

    server
        .wait_for_roster(|roster| roster.username_of(&bob_address).is_none())
        .await;
    assert_eq!(server.roster.snapshot().username_of(alice.address()), Some("alice"));

    alice.engine.shutdown().await;
    server.engine.shutdown().await;
    Ok(())
}

#[tether_test]
async fn test_unreachable_peer_is_dropped_on_next_broadcast() -> anyhow::Result<()> {
    initialize_tracing();
    let server = ChatServer::start(RelayConfig::default()).await?;
    let alice = ChatClient::join(&server, "alice").await?;
    let bob = ChatClient::join(&server, "bob").await?;

    // The relay has never dialed bob, so only a failed dial can reveal he is gone.
    let bob_address = bob.address().to_string();
    bob.engine.shutdown().await;
    assert_eq!(server.roster.snapshot().username_of(&bob_address), Some("bob"));

    alice.say(&server, "anyone there?").await;
    server
        .wait_for_roster(|roster| roster.username_of(&bob_address).is_none())
        .await;
    assert_eq!(server.roster.snapshot().username_of(alice.address()), Some("alice"));

    alice.engine.shutdown().await;
    server.engine.shutdown().await;
    Ok(())
}

#[tether_test]
async fn test_nack_reports_refusals_when_enabled() -> anyhow::Result<()> {
    initialize_tracing();
    let server = ChatServer::start(RelayConfig {
        nack_rejections: true,
    })
    .await?;
    let mut alice = ChatClient::join(&server, "alice").await?;

    let again = Connect {
        username: "alice".into(),
    };
    alice
        .engine
        .send(&server.pid, again.into(), Some(alice.pid.clone()))
        .await;
    assert!(matches!(alice.next().await, Incoming::Rejected(Rejected { .. })));

    alice
        .engine
        .send(&server.pid, Disconnect {}.into(), Some(alice.pid.clone()))
        .await;
    server.wait_for_roster(|roster| roster.is_empty()).await;

    alice
        .engine
        .send(&server.pid, Disconnect {}.into(), Some(alice.pid.clone()))
        .await;
    assert!(matches!(alice.next().await, Incoming::Rejected(Rejected { .. })));

    alice.engine.shutdown().await;
    server.engine.shutdown().await;
    Ok(())
}
