//! Slash command definitions and the mapping between twilight interaction
//! payloads and [`SlashCommand`].

use crate::commands::{self, CommandReply, Invoker, SlashCommand};
use crate::cooldown::MAX_SLEEP;
use crate::service::BotService;
use crate::types::{ChannelId, CommunityId, UserId};

use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, warn};
use twilight_http::Client as HttpClient;
use twilight_model::application::command::{Command, CommandType};
use twilight_model::application::interaction::application_command::{
    CommandDataOption, CommandOptionValue,
};
use twilight_model::application::interaction::{
    Interaction, InteractionData, InteractionDataResolved,
};
use twilight_model::channel::message::MessageFlags;
use twilight_model::guild::Permissions;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_model::id::Id;
use twilight_model::id::marker::ApplicationMarker;
use twilight_util::builder::InteractionResponseDataBuilder;
use twilight_util::builder::command::{
    ChannelBuilder, CommandBuilder, IntegerBuilder, StringBuilder, UserBuilder,
};

pub(crate) fn command_definitions() -> Vec<Command> {
    vec![
        CommandBuilder::new(
            "start",
            "Start tracking your Robo Party cooldown",
            CommandType::ChatInput,
        )
        .build(),
        CommandBuilder::new(
            "done",
            "Mark your Robo Party complete and restart the timer",
            CommandType::ChatInput,
        )
        .build(),
        CommandBuilder::new("sleep", "Pause party reminders", CommandType::ChatInput)
            .option(
                IntegerBuilder::new("hours", "Hours to sleep")
                    .min_value(0)
                    .max_value(MAX_SLEEP.whole_hours()),
            )
            .option(
                IntegerBuilder::new("minutes", "Minutes to sleep")
                    .min_value(0)
                    .max_value(MAX_SLEEP.whole_minutes()),
            )
            .option(StringBuilder::new(
                "until",
                "Wake up at HH:MM (UTC) instead of sleeping for a duration",
            ))
            .build(),
        CommandBuilder::new(
            "adduser",
            "Register a user for party reminders (admins only)",
            CommandType::ChatInput,
        )
        .option(UserBuilder::new("user", "User to ping").required(true))
        .option(ChannelBuilder::new("channel", "Channel the pings go to"))
        .build(),
        CommandBuilder::new("help", "How the party tracker works", CommandType::ChatInput).build(),
    ]
}

/// Returns `None` for commands this bot does not define.
pub(crate) fn parse_command(
    name: &str,
    options: &[CommandDataOption],
    resolved: Option<&InteractionDataResolved>,
) -> Option<SlashCommand> {
    let command = match name {
        "start" => SlashCommand::Start,
        "done" => SlashCommand::Done,
        "help" => SlashCommand::Help,
        "sleep" => SlashCommand::Sleep {
            hours: integer_option(options, "hours"),
            minutes: integer_option(options, "minutes"),
            until: options.iter().find_map(|option| match &option.value {
                CommandOptionValue::String(value) if option.name == "until" => Some(value.clone()),
                _ => None,
            }),
        },
        "adduser" => {
            let user = options.iter().find_map(|option| match option.value {
                CommandOptionValue::User(id) if option.name == "user" => Some(id),
                _ => None,
            })?;
            let channel = options.iter().find_map(|option| match option.value {
                CommandOptionValue::Channel(id) if option.name == "channel" => {
                    Some(ChannelId(id.get()))
                }
                _ => None,
            });
            let display_name = resolved
                .and_then(|resolved| resolved.users.get(&user))
                .map(|user| user.name.clone());
            SlashCommand::AddUser {
                user: UserId(user.get()),
                display_name,
                channel,
            }
        }
        _ => return None,
    };
    Some(command)
}

fn integer_option(options: &[CommandDataOption], name: &str) -> Option<i64> {
    options.iter().find_map(|option| match option.value {
        CommandOptionValue::Integer(value) if option.name == name => Some(value),
        _ => None,
    })
}

pub(crate) fn invoker(interaction: &Interaction) -> Option<Invoker> {
    let user = interaction.author_id()?;
    let is_admin = interaction
        .member
        .as_ref()
        .and_then(|member| member.permissions)
        .is_some_and(|permissions| permissions.contains(Permissions::ADMINISTRATOR));
    Some(Invoker {
        community: interaction.guild_id.map(|id| CommunityId(id.get())),
        user: UserId(user.get()),
        is_admin,
    })
}

pub(crate) fn response(reply: &CommandReply) -> InteractionResponse {
    let mut data = InteractionResponseDataBuilder::new().content(reply.content.clone());
    if reply.ephemeral {
        data = data.flags(MessageFlags::EPHEMERAL);
    }
    InteractionResponse {
        kind: InteractionResponseType::ChannelMessageWithSource,
        data: Some(data.build()),
    }
}

pub(crate) async fn handle(
    http: Arc<HttpClient>,
    application_id: Id<ApplicationMarker>,
    service: Arc<BotService>,
    interaction: Interaction,
) {
    let Some(InteractionData::ApplicationCommand(data)) = &interaction.data else {
        return;
    };
    let Some(invoker) = invoker(&interaction) else {
        warn!("interaction without an author, ignoring");
        return;
    };
    let Some(command) = parse_command(&data.name, &data.options, data.resolved.as_ref()) else {
        debug!(name = %data.name, "unknown slash command");
        return;
    };

    let reply = commands::execute(&service, invoker, command, OffsetDateTime::now_utc()).await;
    if let Err(err) = http
        .interaction(application_id)
        .create_response(interaction.id, &interaction.token, &response(&reply))
        .await
    {
        warn!(name = %data.name, "failed to answer interaction: {err}");
    }
}
