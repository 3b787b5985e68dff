//! Subcommand execution.

use anyhow::{Context as _, Result, anyhow, bail};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde_json::json;
use twodo_core::achievements::find_achievement;
use twodo_core::{
    DuoId, QuestCreateParams, QuestPriority, QuestStatus, QuestUpdateParams, RelationshipType,
    UserId, progress_within_level,
};
use twodo_engine::{ProgressionEngine, QuestFilter};

use crate::{ActorQuest, CategoryCommand, Command, DuoCommand, QuestCommand, UserCommand};

/// What every subcommand runs against.
pub struct Context {
    /// Engine over the opened store.
    pub engine: ProgressionEngine,
    /// Print JSON instead of text.
    pub json: bool,
    /// Expire overdue quests of the targeted duo before running the command.
    pub sweep_first: bool,
}

impl Context {
    fn emit(&self, value: &serde_json::Value, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }

    async fn prepare(&self, duo: &DuoId) -> Result<()> {
        if !self.sweep_first {
            return Ok(());
        }
        let report = self.engine.expire_sweep(duo).await.context("Expiry sweep failed")?;
        if !report.expired.is_empty() && !self.json {
            println!("Expired {} overdue quest(s).", report.expired.len());
        }
        Ok(())
    }
}

fn parse_priority(label: &str) -> Result<QuestPriority> {
    QuestPriority::parse(label).ok_or_else(|| anyhow!("unknown priority {label:?} (easy, medium, hard)"))
}

fn parse_status(label: &str) -> Result<QuestStatus> {
    serde_json::from_value(json!(label)).map_err(|_| anyhow!("unknown status {label:?}"))
}

/// `YYYY-MM-DD` is the end of that day in `offset`; anything else must be RFC 3339.
fn parse_due(raw: &str, offset: FixedOffset) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let end = date
            .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default())
            .and_local_timezone(offset)
            .single()
            .ok_or_else(|| anyhow!("ambiguous local time for {raw}"))?;
        return Ok(end.with_timezone(&Utc));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .with_context(|| format!("invalid date {raw:?} (expected YYYY-MM-DD or RFC 3339)"))
}

fn parse_start(raw: &str, offset: FixedOffset) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date {raw:?} (expected YYYY-MM-DD)"))?;
    date.and_time(NaiveTime::MIN)
        .and_local_timezone(offset)
        .single()
        .map(|d| d.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("ambiguous local time for {raw}"))
}

/// Run one subcommand.
pub async fn run(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::User(UserCommand::Create { uid, email, name }) => {
            let user = ctx.engine.create_user(&uid.into(), &email, &name).await?;
            ctx.emit(&serde_json::to_value(&user)?, || format!("Created user {}", user.uid))
        }
        Command::Duo(cmd) => run_duo(ctx, cmd).await,
        Command::Quest(cmd) => run_quest(ctx, cmd).await,
        Command::Sweep(arg) => {
            let duo = DuoId::from(arg.duo);
            let report = ctx.engine.expire_sweep(&duo).await?;
            ctx.emit(&serde_json::to_value(&report)?, || {
                let mut out = format!("Expired {} quest(s)", report.expired.len());
                for failure in &report.failed {
                    out.push_str(&format!("\n  failed {}: {}", failure.quest_id, failure.error));
                }
                out
            })
        }
        Command::Affection { duo, from } => {
            let duo = DuoId::from(duo.duo);
            let outcome = ctx.engine.send_affection(&duo, &from.into()).await?;
            ctx.emit(&serde_json::to_value(&outcome)?, || {
                let mut out = format!("💗 Affection sent ({} total)", outcome.affection_count);
                for a in &outcome.unlocked {
                    out.push_str(&format!("\n{} Achievement unlocked: {}", a.icon, a.name));
                }
                out
            })
        }
        Command::Category(CategoryCommand::Add { duo, name, icon }) => {
            let duo = DuoId::from(duo.duo);
            let category = ctx.engine.add_category(&duo, &name, &icon).await?;
            ctx.emit(&serde_json::to_value(&category)?, || {
                format!("Added category {} {} ({})", category.icon, category.name, category.id)
            })
        }
        Command::Status(arg) => status(ctx, &DuoId::from(arg.duo)).await,
    }
}

async fn run_duo(ctx: &Context, cmd: DuoCommand) -> Result<()> {
    match cmd {
        DuoCommand::Create { a, b, kind } => {
            let relationship = RelationshipType::parse(&kind)
                .ok_or_else(|| anyhow!("unknown relationship type {kind:?} (couple, friends, ld)"))?;
            let duo = ctx.engine.create_duo(&a.into(), &b.into(), relationship).await?;
            ctx.emit(&serde_json::to_value(&duo)?, || format!("Created duo {}", duo.id))
        }
        DuoCommand::Since { duo, date } => {
            let duo = DuoId::from(duo.duo);
            let offset = ctx.engine.config().utc_offset;
            let start = date.as_deref().map(|d| parse_start(d, offset)).transpose()?;
            let unlocked = ctx.engine.set_relationship_start(&duo, start).await?;
            ctx.emit(&json!({ "relationshipStartDate": start, "unlocked": unlocked }), || {
                let mut out = match start {
                    Some(s) => format!("Together since {}", s.date_naive()),
                    None => "Relationship start cleared".to_string(),
                };
                for a in &unlocked {
                    out.push_str(&format!("\n{} Achievement unlocked: {}", a.icon, a.name));
                }
                out
            })
        }
    }
}

async fn run_quest(ctx: &Context, cmd: QuestCommand) -> Result<()> {
    let offset = ctx.engine.config().utc_offset;
    match cmd {
        QuestCommand::Add {
            duo,
            title,
            owner,
            created_by,
            description,
            category,
            priority,
            due,
        } => {
            let duo = DuoId::from(duo.duo);
            let params = QuestCreateParams {
                title,
                description,
                category_id: category,
                created_by: Some(created_by.unwrap_or_else(|| owner.clone()).into()),
                assigned_to: Some(owner.into()),
                due_date: due.as_deref().map(|d| parse_due(d, offset)).transpose()?,
                priority: Some(parse_priority(&priority)?),
                recurring: None,
            };
            let id = ctx.engine.create_quest(&duo, params).await?;
            ctx.emit(&json!({ "questId": id }), || format!("Created quest {id}"))
        }
        QuestCommand::Edit {
            duo,
            quest,
            title,
            description,
            category,
            priority,
            due,
            clear_due,
        } => {
            let duo = DuoId::from(duo.duo);
            let due_date = match (due, clear_due) {
                (_, true) => Some(None),
                (Some(d), false) => Some(Some(parse_due(&d, offset)?)),
                (None, false) => None,
            };
            let params = QuestUpdateParams {
                title,
                description,
                category_id: category,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                due_date,
            };
            let edited = ctx.engine.update_quest(&duo, &quest.into(), params).await?;
            ctx.emit(&serde_json::to_value(&edited)?, || format!("Updated quest {}", edited.id))
        }
        QuestCommand::Complete(ActorQuest { duo, quest, actor }) => {
            let duo = DuoId::from(duo.duo);
            ctx.prepare(&duo).await?;
            let outcome = ctx
                .engine
                .complete_quest(&duo, &quest.into(), &actor.into())
                .await?;
            ctx.emit(&serde_json::to_value(&outcome)?, || {
                let mut out = format!(
                    "+{} XP{}",
                    outcome.earned_xp,
                    if outcome.is_late { " (late)" } else { "" }
                );
                if let Some(streak) = outcome.new_streak {
                    out.push_str(&format!("\n🔥 Streak: {streak} day(s)"));
                }
                if let Some(change) = &outcome.level_change {
                    out.push_str(&format!("\n⬆️  Level {} → {}", change.from, change.to));
                }
                for a in &outcome.unlocked {
                    out.push_str(&format!("\n{} Achievement unlocked: {}", a.icon, a.name));
                }
                out
            })
        }
        QuestCommand::Undo(ActorQuest { duo, quest, actor }) => {
            let duo = DuoId::from(duo.duo);
            let quest = quest.into();
            ctx.engine.undo_quest(&duo, &quest, &actor.into()).await?;
            ctx.emit(&json!({ "questId": quest }), || format!("Reopened quest {quest}"))
        }
        QuestCommand::Delete { duo, quest } => {
            let duo = DuoId::from(duo.duo);
            let quest = quest.into();
            ctx.engine.soft_delete_quest(&duo, &quest).await?;
            ctx.emit(&json!({ "questId": quest }), || format!("Deleted quest {quest}"))
        }
        QuestCommand::List {
            duo,
            owner,
            status,
            category,
        } => {
            let duo = DuoId::from(duo.duo);
            ctx.prepare(&duo).await?;
            let filter = QuestFilter {
                assigned_to: owner.map(UserId::from),
                status: status.as_deref().map(parse_status).transpose()?,
                category_id: category,
            };
            let quests = ctx.engine.list_quests(&duo, &filter).await?;
            ctx.emit(&serde_json::to_value(&quests)?, || {
                if quests.is_empty() {
                    return "No quests.".to_string();
                }
                quests
                    .iter()
                    .map(|q| {
                        let due = q
                            .due_date
                            .map(|d| format!(" due {}", d.with_timezone(&offset).date_naive()))
                            .unwrap_or_default();
                        format!(
                            "[{}] {} {} ({}, {} XP) @{}{due}",
                            q.status, q.id, q.title, q.priority, q.base_xp, q.assigned_to
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
    }
}

async fn status(ctx: &Context, duo_id: &DuoId) -> Result<()> {
    ctx.prepare(duo_id).await?;
    let duo = ctx
        .engine
        .get_duo(duo_id)
        .await?
        .ok_or_else(|| anyhow!("duo {duo_id} not found"))?;

    let mut members = Vec::new();
    for uid in &duo.member_ids {
        let Some(user) = ctx.engine.get_user(uid).await? else {
            bail!("member {uid} of duo {duo_id} not found");
        };
        let progress = progress_within_level(user.xp);
        members.push(json!({
            "uid": user.uid,
            "displayName": user.display_name,
            "xp": user.xp,
            "level": user.level,
            "questsCompleted": user.quests_completed,
            "currentInLevel": progress.current_in_level,
            "neededForNextLevel": progress.needed_for_next_level,
        }));
    }
    let achievements: Vec<_> = duo
        .unlocked_achievements
        .iter()
        .filter_map(|id| find_achievement(id))
        .collect();
    let report = json!({
        "duoId": duo.id,
        "members": members,
        "currentStreak": duo.current_streak,
        "bestStreak": duo.best_streak,
        "affectionCount": duo.affection_count,
        "achievements": achievements,
    });

    ctx.emit(&report, || {
        let mut out = format!("Duo {}", duo.id);
        for m in &members {
            out.push_str(&format!(
                "\n  {} · level {} · {}/{} XP to next · {} quests",
                m["displayName"].as_str().unwrap_or_default(),
                m["level"],
                m["currentInLevel"],
                m["neededForNextLevel"],
                m["questsCompleted"],
            ));
        }
        out.push_str(&format!(
            "\n🔥 Streak {} (best {}) · 💗 {}",
            duo.current_streak, duo.best_streak, duo.affection_count
        ));
        for a in &achievements {
            out.push_str(&format!("\n  {} {}: {}", a.icon, a.name, a.description));
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn due_date_is_end_of_local_day() {
        let due = parse_due("2024-03-05", FixedOffset::east_opt(3600).unwrap()).unwrap();
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 3, 5, 22, 59, 59).unwrap());
    }

    #[test]
    fn due_date_accepts_rfc3339() {
        let due = parse_due("2024-03-05T10:00:00+02:00", utc()).unwrap();
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap());
        assert!(parse_due("next tuesday", utc()).is_err());
    }

    #[test]
    fn start_is_local_midnight() {
        let start = parse_start("2023-12-24", utc()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 12, 24, 0, 0, 0).unwrap());
    }

    #[test]
    fn labels_parse() {
        assert_eq!(parse_priority("hard").unwrap(), QuestPriority::Hard);
        assert!(parse_priority("epic").is_err());
        assert_eq!(parse_status("expired").unwrap(), QuestStatus::Expired);
        assert!(parse_status("archived").is_err());
    }
}
