//! Slash-command surface (spec §6 "Chat transport").

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", parse_with = "default")]
pub enum Command {
    #[command(description = "list available commands")]
    Help,
    #[command(description = "show your chat/user id")]
    WhoAmI,
    #[command(description = "show the currently running job, if any")]
    Running,
    #[command(description = "cancel the active run (optionally a specific job id)")]
    Stop(String),
    #[command(description = "list known agents")]
    Agents,
    #[command(description = "memory mode / recall subcommands")]
    Memory(String),
    #[command(description = "settings.md subcommands")]
    Settings(String),
    #[command(description = "route one message through the planner, no explicit job")]
    Chat(String),
    #[command(description = "show context for a job id, or \"global\"")]
    Context(String),
    #[command(description = "start a new job with the given goal")]
    Run(String),
    #[command(description = "resume an existing job")]
    Continue(String),
    #[command(description = "job id + question: draft a prompt for manual use elsewhere")]
    GptPrompt(String),
    #[command(description = "job id: apply a previously drafted prompt's reply")]
    GptApply(String),
    #[command(description = "mark the current gpt round-trip done")]
    GptDone,
    #[command(description = "job id + message: record a tracking commit note")]
    Commit(String),
}
