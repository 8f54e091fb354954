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

//! `tether-client`: joins a chat relay and forwards stdin lines.

use clap::Parser;
use futures::stream;
use rand::Rng;
use tether::prelude::*;
use tether_chat::{
    client_name, init_logging, run_client_session, ChatPayload, Client, StdoutSink, RELAY_NAME,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "tether-client", about = "Joins a chat relay; type `quit` to leave")]
struct Args {
    /// Address to listen on for forwarded chat. Defaults to a random local port.
    #[arg(long = "listen-at")]
    listen_at: Option<String>,

    /// Address of the relay.
    #[arg(long, default_value = "127.0.0.1:4000")]
    connect: String,

    /// Name shown next to your messages.
    #[arg(long, env = "USER")]
    username: String,
}

#[tether_main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let listen_at = args
        .listen_at
        .unwrap_or_else(|| format!("127.0.0.1:{}", rand::rng().random_range(10_000..60_000)));
    let engine =
        Engine::<ChatPayload>::launch(EngineConfig::default().with_listen_address(listen_at))
            .await?;

    let server = Pid::new(args.connect, RELAY_NAME);
    let username = args.username;
    let name = client_name(&username);
    let client = {
        let (username, server) = (username.clone(), server.clone());
        engine.spawn(move || Client::new(username, server, StdoutSink), &name)?
    };

    let stdin = BufReader::new(tokio::io::stdin()).lines();
    let lines = stream::unfold(stdin, |mut stdin| async move {
        match stdin.next_line().await {
            Ok(Some(line)) => Some((line, stdin)),
            Ok(None) => None,
            Err(e) => {
                error!("failed to read stdin: {}", e);
                None
            }
        }
    });

    run_client_session(&engine, &server, &client, &username, lines).await;
    engine.shutdown().await;
    Ok(())
}
