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

//! `tether-server`: hosts the chat relay.

use clap::Parser;
use tether::prelude::*;
use tether_chat::{init_logging, ChatPayload, Relay, RelayConfig, RELAY_NAME};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "tether-server", about = "Runs the chat relay")]
struct Args {
    /// Address to accept client connections on.
    #[arg(long = "listen-at", default_value = "127.0.0.1:4000")]
    listen_at: String,

    /// Tell clients when their Connect or Disconnect is refused.
    #[arg(long)]
    nack: bool,
}

#[tether_main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let engine = Engine::<ChatPayload>::launch(
        EngineConfig::default().with_listen_address(args.listen_at),
    )
    .await?;

    let (relay, _roster) = Relay::new(RelayConfig {
        nack_rejections: args.nack,
    });
    let pid = engine.spawn(move || relay, RELAY_NAME)?;
    info!("relay ready at {}", pid);

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    engine.shutdown().await;
    Ok(())
}
