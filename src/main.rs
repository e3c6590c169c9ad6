use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use serenity::all::{
    ApplicationId, Command, CommandInteraction, CreateCommand, CreateInteractionResponse,
    CreateInteractionResponseMessage, EditInteractionResponse, GatewayIntents, GuildId,
    Interaction, Message,
};
use serenity::{async_trait, model::gateway::Ready, prelude::*, Client};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use news_ai_bot::config::BotConfig;
use news_ai_bot::service::command::mention as mention_cmd;
use news_ai_bot::service::command::news as news_cmd;
use news_ai_bot::service::news::NewsAggregator;

struct Handler {
    news: Arc<NewsAggregator>,
    guild_ids: Vec<GuildId>,
    default_limit: usize,
}

fn commands() -> Vec<CreateCommand> {
    vec![
        news_cmd::register_command(),
        news_cmd::register_category_command(),
        news_cmd::register_categories_command(),
        news_cmd::register_help_command(),
    ]
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        // Guild commands show up instantly; global ones can take up to an hour
        #[cfg(debug_assertions)]
        let use_guild_commands = !self.guild_ids.is_empty();
        #[cfg(not(debug_assertions))]
        let use_guild_commands = false;

        if use_guild_commands {
            for guild_id in &self.guild_ids {
                if let Err(err) = guild_id.set_commands(&ctx.http, commands()).await {
                    warn!("Failed to register guild commands for {}: {}", guild_id, err);
                    continue;
                }
                info!("Guild commands registered for guild ID: {}", guild_id);
            }
            info!(
                "{} is connected. [DEV MODE] Guild commands registered for {} server(s).",
                ready.user.name,
                self.guild_ids.len()
            );
        } else {
            if let Err(err) = Command::set_global_commands(&ctx.http, commands()).await {
                warn!("Failed to register global commands: {}", err);
            }
            info!(
                "{} is connected. Global commands registered (may take up to 1 hour).",
                ready.user.name
            );
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        match command.data.name.as_str() {
            "news" => {
                defer(&ctx, &command).await;
                let content = match news_cmd::handle(&command, &self.news, self.default_limit).await {
                    Ok(msg) => msg,
                    Err(err) => format!("❌ {}", err),
                };
                edit(&ctx, &command, content).await;
            }
            "category" => {
                defer(&ctx, &command).await;
                let content =
                    match news_cmd::handle_category(&command, &self.news, self.default_limit).await {
                        Ok(msg) => msg,
                        Err(err) => format!("❌ {}", err),
                    };
                edit(&ctx, &command, content).await;
            }
            "categories" => respond(&ctx, &command, news_cmd::categories_text()).await,
            "help" => respond(&ctx, &command, mention_cmd::help_text().to_string()).await,
            _ => respond(&ctx, &command, "Command not implemented.".to_string()).await,
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let bot_id = ctx.cache.current_user().id;
        let prefixes = [format!("<@{}>", bot_id), format!("<@!{}>", bot_id)];

        let content = msg.content.trim();
        let rest = match prefixes.iter().find_map(|p| content.strip_prefix(p)) {
            Some(r) => r.trim(),
            None => return, // only messages addressed to the bot
        };

        if rest.is_empty() {
            let _ = msg.reply(&ctx.http, mention_cmd::help_text()).await;
            return;
        }

        let typing = msg.channel_id.start_typing(&ctx.http);
        let reply = match mention_cmd::handle(rest, &self.news, self.default_limit).await {
            Ok(text) => text,
            Err(err) => format!("❌ {}", err),
        };
        typing.stop();

        if let Err(err) = msg.reply(&ctx.http, reply).await {
            warn!("Failed to send reply: {}", err);
        }
    }
}

// Acknowledge within Discord's 3-second window; the answer is edited in later
async fn defer(ctx: &Context, command: &CommandInteraction) {
    let _ = command
        .create_response(&ctx.http, CreateInteractionResponse::Defer(Default::default()))
        .await;
}

async fn edit(ctx: &Context, command: &CommandInteraction, content: String) {
    if let Err(err) = command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(content))
        .await
    {
        warn!("Failed to edit response for /{}: {}", command.data.name, err);
    }
}

async fn respond(ctx: &Context, command: &CommandInteraction, content: String) {
    let _ = command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await;
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = BotConfig::from_env()?;
    let app_id: ApplicationId = config.application_id.into();

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    info!(
        "Initializing NewsAggregator (perplexity: {}, newsapi: {})...",
        config.news.perplexity_api_key.is_some(),
        config.news.news_api_key.is_some()
    );
    let news = Arc::new(NewsAggregator::from_config(&config.news)?);

    info!("Starting Discord client...");
    let mut client = Client::builder(&config.discord_token, intents)
        .application_id(app_id)
        .event_handler(Handler {
            news,
            guild_ids: config.guild_ids.iter().copied().map(GuildId::new).collect(),
            default_limit: config.default_limit,
        })
        .await?;

    if let Err(why) = client.start().await {
        tracing::error!("Client error: {why}");
    }

    Ok(())
}
