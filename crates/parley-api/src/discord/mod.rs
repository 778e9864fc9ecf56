//! Discord relay bot.
//!
//! Listens in one home channel and relays every plain message to that
//! channel's chat session. The reply streams back in pieces of roughly
//! `chunk_len` characters while the bot shows as typing. Messages starting
//! with the configured prefix are left alone.

pub mod split;

use std::sync::{Arc, OnceLock};

use anyhow::Context as _;
use dashmap::DashMap;
use parley_core::template::factory::SessionOverrides;
use secrecy::ExposeSecret;
use serenity::client::{Client, Context, EventHandler};
use serenity::gateway::ActivityData;
use serenity::model::channel::Message;
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::model::id::{ChannelId, UserId};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::state::{AppState, Session};

use split::{MAX_MESSAGE_CHARS, split_response};

struct Handler {
    home_channel: ChannelId,
    prefix: String,
    chunk_len: usize,
    /// Set on `ready`; used to skip our own messages.
    bot_id: OnceLock<UserId>,
    sessions: DashMap<ChannelId, Arc<Mutex<Session>>>,
}

#[serenity::async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        let _ = self.bot_id.set(ready.user.id);
        info!(user = %ready.user.name, channel = %self.home_channel, "discord relay connected");
        ctx.set_activity(Some(ActivityData::playing("Running!")));
        if let Err(e) = self.home_channel.say(&ctx, "Bot is ready!").await {
            error!(error = %e, "could not announce in the home channel");
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if self.bot_id.get().is_some_and(|id| *id == msg.author.id) {
            return;
        }
        if msg.channel_id != self.home_channel {
            return;
        }
        if !self.prefix.is_empty() && msg.content.starts_with(&self.prefix) {
            debug!("ignoring prefixed message");
            return;
        }
        let content = msg.content.trim();
        if content.is_empty() {
            return;
        }
        let Some(session) = self
            .sessions
            .get(&msg.channel_id)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return;
        };

        info!(author = %msg.author.name, chars = content.chars().count(), "relaying message");
        self.relay(&ctx, msg.channel_id, &session, content).await;
    }
}

impl Handler {
    /// Stream one reply into the channel.
    ///
    /// The session lock is held for the whole completion, so messages in the
    /// same channel are answered in order.
    async fn relay(&self, ctx: &Context, channel: ChannelId, session: &Mutex<Session>, content: &str) {
        let typing = channel.start_typing(&ctx.http);
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let ctx_send = ctx.clone();
        let chunk_len = self.chunk_len;
        let sender = tokio::spawn(async move {
            let mut pending = String::new();
            while let Some(delta) = rx.recv().await {
                pending.push_str(&delta);
                if pending.chars().count() >= chunk_len {
                    send_text(&ctx_send, channel, &std::mem::take(&mut pending)).await;
                }
            }
            send_text(&ctx_send, channel, &pending).await;
        });

        let result = {
            let mut session = session.lock().await;
            session
                .chat_stream(content, |delta| {
                    let _ = tx.send(delta.to_string());
                })
                .await
        };
        drop(tx);
        if let Err(e) = sender.await {
            warn!(error = %e, "reply sender task failed");
        }
        typing.stop();

        match result {
            Ok(reply) => info!(chars = reply.chars().count(), "reply relayed"),
            Err(e) => {
                error!(error = %e, "failed to generate reply");
                send_text(ctx, channel, &format!("Sorry, I couldn't reply: {e}")).await;
            }
        }
    }
}

async fn send_text(ctx: &Context, channel: ChannelId, text: &str) {
    for piece in split_response(text, MAX_MESSAGE_CHARS) {
        if let Err(e) = channel.say(ctx, piece).await {
            error!(error = %e, "failed to send message");
        }
    }
}

/// Run the relay until the gateway connection ends.
pub async fn run(state: &AppState) -> anyhow::Result<()> {
    let token = state
        .secrets
        .discord_token()
        .context("set DISCORD_BOT_TOKEN to run the relay")?;
    let discord = &state.config.discord;
    let home = discord
        .home_channel
        .filter(|&id| id != 0)
        .context("set discord.home_channel or DISCORD_HOME_CHANNEL")?;

    let template = match &discord.template {
        Some(name) => state.registry.get(name),
        None => state.registry.default_template(),
    };
    let mut session = state.factory()?.build(
        template,
        SessionOverrides {
            system_prompt: Some(Some(discord.system_prompt.clone())),
            reminder: Some(discord.reminder.clone()),
            autosave_name: Some(format!("discord_{home}")),
            ..Default::default()
        },
    );
    match session.resume_autosave().await {
        Ok(Some(name)) => info!(save = %name, "resumed autosave"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "could not resume autosave"),
    }

    let home_channel = ChannelId::new(home);
    let sessions = DashMap::new();
    sessions.insert(home_channel, Arc::new(Mutex::new(session)));
    let handler = Handler {
        home_channel,
        prefix: discord.prefix.clone(),
        chunk_len: discord.chunk_len.clamp(1, MAX_MESSAGE_CHARS),
        bot_id: OnceLock::new(),
        sessions,
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(token.expose_secret(), intents)
        .event_handler(handler)
        .await
        .context("failed to build the Discord client")?;

    info!(template = %template.name, "starting discord relay");
    client.start().await.context("Discord gateway error")?;
    Ok(())
}
