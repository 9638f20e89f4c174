use serenity::async_trait;
use serenity::model::application::command::{Command, CommandOptionType};
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOptionValue,
};
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use uuid::Uuid;

use crate::oauth::{authorize_url, OAuthConfig};
use crate::state::StateStore;
use crate::types::{FeedName, InteractionHandle, PendingRequest};

const SUBSCRIBE_COMMAND: &str = "subscribe";
const SUBREDDIT_OPTION: &str = "subreddit";

pub struct Handler {
    states: StateStore,
    oauth: OAuthConfig,
}

impl Handler {
    pub fn new(states: StateStore, oauth: OAuthConfig) -> Self {
        Self { states, oauth }
    }

    async fn subscribe(
        &self,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> anyhow::Result<()> {
        let input = command
            .data
            .options
            .iter()
            .find(|option| option.name == SUBREDDIT_OPTION)
            .and_then(|option| option.resolved.as_ref());

        let reply = match input {
            Some(CommandDataOptionValue::String(input)) => {
                begin_subscription(&self.states, &self.oauth, &command.token, input).await?
            }
            _ => "Expected a subreddit name".to_string(),
        };

        command
            .create_interaction_response(&ctx.http, |response| {
                response
                    .kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|message| message.content(reply).ephemeral(true))
            })
            .await?;

        Ok(())
    }
}

/// Stores a pending authorization for `input` and returns the reply that
/// carries the authorization link.
pub async fn begin_subscription(
    states: &StateStore,
    oauth: &OAuthConfig,
    interaction_token: &str,
    input: &str,
) -> anyhow::Result<String> {
    let Some(feed) = FeedName::parse(input) else {
        return Ok(format!("`{}` is not a valid subreddit name", input.trim()));
    };

    let token = Uuid::new_v4().simple().to_string();
    let url = authorize_url(oauth, &token)?;

    log::info!("Starting webhook authorization for {}", feed);

    let reply = format!(
        "[Click here]({}) to choose the channel {} should be posted to",
        url, feed
    );

    states
        .put(
            token,
            PendingRequest {
                requester: InteractionHandle::new(interaction_token),
                feed,
            },
        )
        .await;

    Ok(reply)
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        log::info!("{} is connected", ready.user.name);

        let created = Command::create_global_application_command(&ctx.http, |command| {
            command
                .name(SUBSCRIBE_COMMAND)
                .description("Post new submissions of a subreddit into a channel")
                .create_option(|option| {
                    option
                        .name(SUBREDDIT_OPTION)
                        .description("Subreddit name, e.g. golang")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
        })
        .await;

        if let Err(err) = created {
            log::error!("Failed to register /{} command: {:?}", SUBSCRIBE_COMMAND, err);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::ApplicationCommand(command) = interaction else {
            return;
        };

        if command.data.name != SUBSCRIBE_COMMAND {
            return;
        }

        log::info!(
            "Received {} command in channel {}",
            SUBSCRIBE_COMMAND,
            command.channel_id
        );

        if let Err(err) = self.subscribe(&ctx, &command).await {
            log::error!("Failed to handle {} command: {:?}", SUBSCRIBE_COMMAND, err);
        }
    }
}
