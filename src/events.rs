use poise::serenity_prelude::{self as serenity, ComponentInteraction, FullEvent, Interaction};
use tracing::{error, info};

use crate::commands::music::utils::component_handlers;
use crate::{Data, Error};

/// Gateway events the framework hands back to us: readiness logging and the
/// "music_" control buttons.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}", data_about_bot.user.name);
        }
        FullEvent::InteractionCreate {
            interaction: Interaction::Component(component),
        } if component.data.custom_id.starts_with("music_") => {
            music_component_interaction(ctx, component, data).await;
        }
        _ => {}
    }

    Ok(())
}

/// Handle component interactions for components with identities starting with "music_"
async fn music_component_interaction(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    data: &Data,
) {
    if let Err(e) = component_handlers::handle_interaction(ctx, component, &data.music).await {
        error!("Error handling component interaction: {}", e);
    }
}
