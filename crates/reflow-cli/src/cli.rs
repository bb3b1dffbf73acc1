use clap::{Parser, Subcommand, ValueEnum};

/// A constraint-satisfaction autoplanner for recurring event series.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage series
    Series(SeriesCommand),
    /// Manage recurrence patterns attached to a series
    Pattern(PatternCommand),
    /// Manage chain links between series
    Chain(ChainCommand),
    /// Manage relational constraints
    Constraint(ConstraintCommand),
    /// Log a completion for a series instance
    Complete(CompleteCommand),
    /// Manage per-instance exceptions
    Exception(ExceptionCommand),
    /// Manage reminders
    Reminder(ReminderCommand),
    /// Run the reflow engine over a date window
    Reflow(ReflowCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct SeriesCommand {
    #[command(subcommand)]
    pub command: SeriesSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SeriesSubcommand {
    Add(SeriesAddCommand),
    List,
    Show(SeriesShowCommand),
    Delete(SeriesDeleteCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct SeriesAddCommand {
    /// The series title
    pub title: String,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long = "tag", num_args = 1..)]
    pub tags: Vec<String>,
    /// Rotating title labels, applied round-robin per logged completion
    #[arg(long = "cycle", num_args = 1..)]
    pub cycle: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct SeriesShowCommand {
    pub id: uuid::Uuid,
}

#[derive(Parser, Debug, Clone)]
pub struct SeriesDeleteCommand {
    pub id: uuid::Uuid,
}

#[derive(Parser, Debug, Clone)]
pub struct PatternCommand {
    #[command(subcommand)]
    pub command: PatternSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PatternSubcommand {
    Add(PatternAddCommand),
    Remove(PatternRemoveCommand),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKindArg {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Parser, Debug, Clone)]
pub struct PatternAddCommand {
    /// Series this pattern attaches to
    pub series_id: uuid::Uuid,
    #[arg(long, value_enum)]
    pub kind: PatternKindArg,
    /// Weekly only: comma-separated days (mon,tue,wed,thu,fri,sat,sun)
    #[arg(long, required_if_eq("kind", "weekly"))]
    pub days_of_week: Option<String>,
    /// Monthly only: target day of month (clamped to the month's last day)
    #[arg(long, required_if_eq("kind", "monthly"))]
    pub day_of_month: Option<u32>,
    /// Yearly only: target month
    #[arg(long, required_if_eq("kind", "yearly"))]
    pub month: Option<u32>,
    /// Yearly only: target day within `--month`
    #[arg(long, required_if_eq("kind", "yearly"))]
    pub day: Option<u32>,
    /// Time of day (HH:MM); omitted for a flexible instance with no ideal time pinned
    #[arg(long)]
    pub time: Option<String>,
    #[arg(long, default_value_t = 60)]
    pub duration: i64,
    /// Pins the instance at its ideal time; it is never moved by search
    #[arg(long)]
    pub fixed: bool,
    #[arg(long)]
    pub all_day: bool,
    #[arg(long, requires = "window_end")]
    pub window_start: Option<String>,
    #[arg(long, requires = "window_start")]
    pub window_end: Option<String>,
    #[arg(long, default_value_t = 0)]
    pub days_before: u32,
    #[arg(long, default_value_t = 0)]
    pub days_after: u32,
    #[arg(long)]
    pub adaptive_duration: bool,
    /// A JSON-encoded condition tree, e.g. `{"weekday":[1,2,3,4,5]}`
    #[arg(long)]
    pub condition: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct PatternRemoveCommand {
    pub id: uuid::Uuid,
}

#[derive(Parser, Debug, Clone)]
pub struct ChainCommand {
    #[command(subcommand)]
    pub command: ChainSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ChainSubcommand {
    Link(ChainLinkCommand),
    Unlink(ChainUnlinkCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ChainLinkCommand {
    #[arg(long)]
    pub parent: uuid::Uuid,
    #[arg(long)]
    pub child: uuid::Uuid,
    #[arg(long)]
    pub distance: i64,
    #[arg(long, default_value_t = 0)]
    pub early_wobble: i64,
    #[arg(long, default_value_t = 0)]
    pub late_wobble: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct ChainUnlinkCommand {
    /// The child series id of the link to remove
    pub child_id: uuid::Uuid,
}

#[derive(Parser, Debug, Clone)]
pub struct ConstraintCommand {
    #[command(subcommand)]
    pub command: ConstraintSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConstraintSubcommand {
    Add(ConstraintAddCommand),
    Remove(ConstraintRemoveCommand),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKindArg {
    NoOverlap,
    MustBeBefore,
}

#[derive(Parser, Debug, Clone)]
pub struct ConstraintAddCommand {
    #[arg(long, value_enum)]
    pub kind: ConstraintKindArg,
    /// `series:<uuid>` or `tag:<name>` (a bare UUID is treated as `series:`)
    #[arg(long)]
    pub a: String,
    #[arg(long)]
    pub b: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ConstraintRemoveCommand {
    pub id: uuid::Uuid,
}

#[derive(Parser, Debug, Clone)]
pub struct CompleteCommand {
    pub series_id: uuid::Uuid,
    /// Instance date (YYYY-MM-DD)
    pub date: String,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ExceptionCommand {
    #[command(subcommand)]
    pub command: ExceptionSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExceptionSubcommand {
    Cancel(ExceptionCancelCommand),
    Reschedule(ExceptionRescheduleCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ExceptionCancelCommand {
    pub series_id: uuid::Uuid,
    /// The original occurrence date (YYYY-MM-DD)
    pub date: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ExceptionRescheduleCommand {
    pub series_id: uuid::Uuid,
    /// The original occurrence date (YYYY-MM-DD)
    pub date: String,
    /// The new date (YYYY-MM-DD)
    #[arg(long)]
    pub to: String,
    /// The new time of day (HH:MM)
    #[arg(long)]
    pub at: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ReminderCommand {
    #[command(subcommand)]
    pub command: ReminderSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ReminderSubcommand {
    Add(ReminderAddCommand),
    Ack(ReminderAckCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ReminderAddCommand {
    pub series_id: uuid::Uuid,
    #[arg(long)]
    pub minutes_before: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct ReminderAckCommand {
    pub reminder_id: uuid::Uuid,
    /// The instance date the reminder fired for (YYYY-MM-DD)
    pub date: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ReflowCommand {
    /// Window start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: String,
    /// Window end date (YYYY-MM-DD); defaults to `start + lookahead_days`
    #[arg(long)]
    pub end: Option<String>,
}
