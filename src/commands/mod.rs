//! Text command surface.
//!
//! Each admin command takes a comma-delimited target, calls one registry
//! operation and returns the confirmation line shown to the user.

use crate::auth::Actor;
use crate::errors::ClanError;
use crate::models::{ClanData, ClanRank, CommandReply};
use crate::registry::{ClanRegistry, PointsDirection};

/// Run `command` with `target` on behalf of `actor`.
pub async fn execute(
    registry: &ClanRegistry,
    actor: &Actor,
    command: &str,
    target: &str,
) -> Result<CommandReply, ClanError> {
    let command = command.trim().trim_start_matches('/').to_ascii_lowercase();
    let target = target.trim();

    match command.as_str() {
        "createclan" => {
            let [name, leader] = args::<2>(
                target,
                "/createclan [clan name],[leader username] - Creates a new clan.",
                "Usage: /createclan [clan name],[leader username]",
            )?;
            let clan = registry.create_clan(actor, name, leader).await?;
            let message = format!(
                "Clan \"{}\" has been created with {} as the leader. The clan chatroom \"{}\" has been created.",
                clan.name, leader, clan.id
            );
            Ok(reply(message, clan))
        }
        "deleteclan" => {
            let [name] = args::<1>(target, "/deleteclan [clan name] - Deletes a clan.", "")?;
            let clan = registry.delete_clan(actor, name).await?;
            Ok(CommandReply {
                message: format!("Successfully deleted clan {} and its chatroom.", clan.name),
                clan: None,
            })
        }
        "givepoints" | "takepoints" => {
            let give = command == "givepoints";
            let (help, usage) = if give {
                (
                    "/givepoints [clan name],[points] - Gives points to a clan.",
                    "Usage: /givepoints [clan name],[points]. Points must be a positive number.",
                )
            } else {
                (
                    "/takepoints [clan name],[points] - Deducts points from a clan.",
                    "Usage: /takepoints [clan name],[points]. Points must be a positive number.",
                )
            };
            let [name, points] = args::<2>(target, help, usage)?;
            let amount = parse_points(points, usage)?;
            let direction = if give {
                PointsDirection::Give
            } else {
                PointsDirection::Take
            };
            let clan = registry.adjust_points(actor, name, amount, direction).await?;
            let message = if give {
                format!(
                    "Successfully gave {} points to clan \"{}\". Total points: {}",
                    amount, clan.name, clan.points
                )
            } else {
                format!(
                    "Successfully deducted {} points from clan \"{}\". Total points: {}",
                    amount, clan.name, clan.points
                )
            };
            Ok(reply(message, clan))
        }
        "setclanicon" => {
            // URLs may contain commas
            let (name, url) = name_and_rest(
                target,
                "/setclanicon [clan name], [icon URL] - Sets a clan's icon. Requires: Clan Leader or &",
                "Usage: /setclanicon [clan name], [icon URL]",
            )?;
            let clan = registry.set_clan_icon(actor, name, Some(url)).await?;
            Ok(reply(
                format!("Successfully set icon for clan \"{}\".", clan.name),
                clan,
            ))
        }
        "removeclanicon" => {
            let [name] = args::<1>(
                target,
                "/removeclanicon [clan name] - Removes a clan's icon. Requires: Clan Leader or &",
                "",
            )?;
            let clan = registry.set_clan_icon(actor, name, None).await?;
            Ok(reply(
                format!("Successfully removed icon from clan \"{}\".", clan.name),
                clan,
            ))
        }
        "setclandesc" => {
            // The description may itself contain commas
            let (name, description) = name_and_rest(
                target,
                "/setclandesc [clan name], [description] - Sets a clan's description. Requires: Clan Leader or &",
                "Usage: /setclandesc [clan name], [description]",
            )?;
            let clan = registry
                .set_clan_description(actor, name, Some(description))
                .await?;
            Ok(reply(
                format!("Successfully set description for clan \"{}\".", clan.name),
                clan,
            ))
        }
        "removeclandesc" => {
            let [name] = args::<1>(
                target,
                "/removeclandesc [clan name] - Removes a clan's description. Requires: Clan Leader or &",
                "",
            )?;
            let clan = registry.set_clan_description(actor, name, None).await?;
            Ok(reply(
                format!("Successfully removed description from clan \"{}\".", clan.name),
                clan,
            ))
        }
        "clanrank" => {
            let usage = "Usage: /clanrank [clan name], [username], [rank]. Ranks: Leader, Deputy, Senior, Member, Recruit (or 5-1).";
            let [name, user, rank] = args::<3>(
                target,
                "/clanrank [clan name], [username], [rank] - Sets a member's clan rank. Requires: Clan Leader or &",
                usage,
            )?;
            let rank = ClanRank::parse(rank).ok_or_else(|| {
                ClanError::InvalidRank(format!("'{}' is not a clan rank. {}", rank, usage))
            })?;
            let clan = registry.set_rank(actor, name, user, rank.level()).await?;
            Ok(reply(
                format!("{} is now a {} of clan \"{}\".", user, rank, clan.name),
                clan,
            ))
        }
        "addclanmember" => {
            let [name, user] = args::<2>(
                target,
                "/addclanmember [clan name], [username] - Adds a user to a clan as a Recruit. Requires: Clan Leader or &",
                "Usage: /addclanmember [clan name], [username]",
            )?;
            let clan = registry.add_member(actor, name, user).await?;
            Ok(reply(
                format!("Added {} to clan \"{}\".", user, clan.name),
                clan,
            ))
        }
        "removeclanmember" => {
            let [name, user] = args::<2>(
                target,
                "/removeclanmember [clan name], [username] - Removes a user from a clan. Requires: Clan Leader or &",
                "Usage: /removeclanmember [clan name], [username]",
            )?;
            let clan = registry.remove_member(actor, name, user).await?;
            Ok(reply(
                format!("Removed {} from clan \"{}\".", user, clan.name),
                clan,
            ))
        }
        "claninfo" => {
            let [name] = args::<1>(target, "/claninfo [clan name] - Shows a clan.", "")?;
            let clan = registry
                .get_clan(name)
                .await?
                .ok_or_else(|| ClanError::UnknownClan(name.to_string()))?;
            Ok(reply(describe(&clan), clan))
        }
        other => Err(ClanError::InvalidInput(format!(
            "The command '/{}' does not exist.",
            other
        ))),
    }
}

/// Split `target` into exactly `N` non-empty, trimmed arguments.
///
/// An empty target yields the help line; a wrong argument count yields the
/// usage line. Single-argument commands keep the whole target, commas included.
fn args<'a, const N: usize>(
    target: &'a str,
    help: &str,
    usage: &str,
) -> Result<[&'a str; N], ClanError> {
    if target.is_empty() {
        return Err(ClanError::InvalidInput(help.to_string()));
    }
    let usage = if usage.is_empty() { help } else { usage };
    let parts: Vec<&str> = if N == 1 {
        vec![target]
    } else {
        target.split(',').map(str::trim).collect()
    };
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ClanError::InvalidInput(usage.to_string()));
    }
    parts
        .try_into()
        .map_err(|_| ClanError::InvalidInput(usage.to_string()))
}

/// Split `target` at its first comma into a clan name and a free-text rest.
fn name_and_rest<'a>(
    target: &'a str,
    help: &str,
    usage: &str,
) -> Result<(&'a str, &'a str), ClanError> {
    if target.is_empty() {
        return Err(ClanError::InvalidInput(help.to_string()));
    }
    target
        .split_once(',')
        .map(|(name, rest)| (name.trim(), rest.trim()))
        .filter(|(name, rest)| !name.is_empty() && !rest.is_empty())
        .ok_or_else(|| ClanError::InvalidInput(usage.to_string()))
}

/// Parse a positive whole number of points.
fn parse_points(raw: &str, usage: &str) -> Result<i64, ClanError> {
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ClanError::InvalidAmount(usage.to_string())),
    }
}

fn reply(message: String, clan: ClanData) -> CommandReply {
    CommandReply {
        message,
        clan: Some(clan),
    }
}

fn describe(clan: &ClanData) -> String {
    let mut lines = vec![
        format!("Clan: {}", clan.name),
        format!("Leader: {}", clan.leader),
        format!("Points: {}", clan.points),
        format!("Members: {}", clan.members.len()),
        format!("Created: {}", clan.created_at.format("%Y-%m-%d %H:%M UTC")),
    ];
    if let Some(description) = &clan.description {
        lines.push(format!("Description: {}", description));
    }
    lines.join("\n")
}
