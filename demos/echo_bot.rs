//! A small bot on top of `Connection`.
//!
//! Connects, joins a channel once registered, prints what it hears and
//! answers "hello".
//!
//! ```text
//! cargo run --example echo_bot -- irc.libera.chat Addybot '#addybot'
//! RUST_LOG=slirc_engine=debug cargo run --example echo_bot
//! ```

use slirc_engine::{ClientConfig, Connection, Event, Outbox};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let mut args = std::env::args().skip(1);
    let server = args.next().unwrap_or_else(|| "irc.libera.chat".to_string());
    let nick = args.next().unwrap_or_else(|| "Addybot".to_string());
    let channel = args.next().unwrap_or_else(|| "#addybot".to_string());

    let config = ClientConfig::new(server, nick.as_str())
        .with_port(6697)
        .with_tls(true)
        .with_realname("slirc-engine echo bot");

    let mut conn = Connection::connect(config).await?;
    info!(nick = %nick, "connected, registering");

    conn.subscribe(move |event: &Event, out: &mut Outbox| match event {
        Event::Online => out.join(channel.as_str()),
        Event::Notice { sender, text } => println!("NOTICE ({}): {}", sender, text),
        Event::ChannelMessage {
            sender,
            text,
            channel,
        } => {
            println!("{} <{}> {}", channel.name(), sender, text);
            if text.trim().eq_ignore_ascii_case("hello") {
                out.send(channel.message(format!("hello, {}!", sender.nick())));
            }
        }
        Event::PrivateMessage { sender, text } => {
            println!("<<< {} >>>: {}", sender, text);
            out.send(sender.message(text.as_str()));
        }
        Event::JoinedChannel(channel) => info!(channel = channel.name(), "joined"),
        Event::Kicked {
            sender,
            channel,
            reason,
        } => info!(channel = channel.name(), by = %sender, reason = %reason, "kicked"),
        _ => {}
    });

    conn.connect_as().await?;
    conn.run().await?;
    info!("server closed the connection");
    Ok(())
}
