use clap::{Args, Parser, Subcommand, ValueEnum};
use cue_core::coordinator::ResizeEdge;
use cue_core::models::EventCategory;

/// Theatre schedule operator tool: recurring calls, clash checks and timelines
#[derive(Parser, Debug)]
#[command(name = "cue", author, version, about, long_about = None)]
pub struct Cli {
    /// Events file to operate on (overrides the configured one)
    #[arg(long, global = true)]
    pub file: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add an event or a recurring template
    Add(AddCommand),
    /// List scheduled events in a date window
    List(ListCommand),
    /// Preview the occurrences of a recurring template
    Expand(ExpandCommand),
    /// Report conflicts among the events in a date window
    Check(CheckCommand),
    /// Lay out one day's events per resource
    Timeline(TimelineCommand),
    /// Move an event by a time delta
    Move(MoveCommand),
    /// Drag one edge of an event by a time delta
    Resize(ResizeCommand),
    /// Cancel an event or a single occurrence
    Cancel(CancelCommand),
    /// Show the event categories with their labels and colors
    Categories,
}

/// Date window shared by the listing commands
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// First day of the window (default: today)
    #[arg(long)]
    pub from: Option<String>,
    /// Last day of the window, inclusive
    #[arg(long, conflicts_with = "days")]
    pub to: Option<String>,
    /// Window length in days (default from config)
    #[arg(long)]
    pub days: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the event
    pub title: String,
    /// The date of the event (e.g. '2025-04-10', 'tomorrow', 'next friday')
    #[arg(short, long)]
    pub date: String,
    /// Start time (e.g. '19:30')
    #[arg(long)]
    pub at: String,
    /// End time; defaults to two hours after the start
    #[arg(long)]
    pub until: Option<String>,
    #[arg(short, long, value_enum, default_value_t = CategoryArg::Other)]
    pub category: CategoryArg,
    #[arg(long)]
    pub venue: Option<String>,
    /// Shared resources the event books
    #[arg(short, long, num_args = 1..)]
    pub resource: Vec<String>,
    /// Cast or crew called for the event
    #[arg(short, long, num_args = 1..)]
    pub participant: Vec<String>,
    /// Color override (hex)
    #[arg(long)]
    pub color: Option<String>,
    /// Recurrence rule (e.g. 'FREQ=WEEKLY;BYDAY=MO,WE;COUNT=10')
    #[arg(long, help = "Recurrence rule in RRULE form")]
    pub repeat: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    #[command(flatten)]
    pub window: WindowArgs,
    /// Only events booking this resource (venues count as resources)
    #[arg(long)]
    pub resource: Option<String>,
    /// Only events in this venue
    #[arg(long)]
    pub venue: Option<String>,
    #[arg(long, value_enum)]
    pub category: Option<CategoryArg>,
    /// Include templates and cancelled events as stored
    #[arg(long)]
    pub raw: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ExpandCommand {
    /// The ID (or unique prefix) of the template
    pub id: String,
    /// First day to show (default: the template's date)
    #[arg(long)]
    pub from: Option<String>,
    /// Number of occurrences to show (default: `preview_count` from the config)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct CheckCommand {
    #[command(flatten)]
    pub window: WindowArgs,
    /// Minimum gap between venue bookings, overriding the configured policy
    #[arg(long)]
    pub buffer: Option<u32>,
    /// Exit with an error when a hard conflict is found
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct TimelineCommand {
    /// The day to lay out (default: today)
    pub day: Option<String>,
    /// Only this resource
    #[arg(long)]
    pub resource: Option<String>,
    #[arg(long)]
    pub start_hour: Option<u32>,
    #[arg(long)]
    pub end_hour: Option<u32>,
    /// Horizontal scale in pixels per hour
    #[arg(long)]
    pub scale: Option<f64>,
}

#[derive(Parser, Debug, Clone)]
pub struct MoveCommand {
    /// The ID (or unique prefix) of the event or occurrence
    pub id: String,
    /// Shift, e.g. '+30m', '-1h', '1h15m' or plain minutes
    #[arg(allow_hyphen_values = true)]
    pub delta: String,
    #[command(flatten)]
    pub window: WindowArgs,
    /// Commit without asking when only warnings are found
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ResizeCommand {
    /// The ID (or unique prefix) of the event or occurrence
    pub id: String,
    #[arg(value_enum)]
    pub edge: EdgeArg,
    /// Shift of the edge, e.g. '+30m' or '-15'
    #[arg(allow_hyphen_values = true)]
    pub delta: String,
    #[command(flatten)]
    pub window: WindowArgs,
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CancelCommand {
    /// The ID (or unique prefix) of the event or occurrence
    pub id: String,
    #[command(flatten)]
    pub window: WindowArgs,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryArg {
    Performance,
    Rehearsal,
    TechRehearsal,
    DressRehearsal,
    Meeting,
    Maintenance,
    Other,
}

impl From<CategoryArg> for EventCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Performance => EventCategory::Performance,
            CategoryArg::Rehearsal => EventCategory::Rehearsal,
            CategoryArg::TechRehearsal => EventCategory::TechRehearsal,
            CategoryArg::DressRehearsal => EventCategory::DressRehearsal,
            CategoryArg::Meeting => EventCategory::Meeting,
            CategoryArg::Maintenance => EventCategory::Maintenance,
            CategoryArg::Other => EventCategory::Other,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeArg {
    Start,
    End,
}

impl From<EdgeArg> for ResizeEdge {
    fn from(arg: EdgeArg) -> Self {
        match arg {
            EdgeArg::Start => ResizeEdge::Start,
            EdgeArg::End => ResizeEdge::End,
        }
    }
}
