use clap::Args;
use colored::Colorize;
use rk_mechanics::{CriticalKind, ResolveOptions};

use super::Session;

/// Arguments for `rk roll`.
#[derive(Args)]
pub struct RollArgs {
    /// Dice expression, e.g. 1d20+5, 2d6-1, e 3d6
    pub expression: String,

    /// User rolling
    #[arg(short, long)]
    pub user: String,

    /// Treat a lone 1d20 as a check: consume advantage and apply streak correction
    #[arg(short, long)]
    pub check: bool,

    /// Lower the dice-count limit for this roll
    #[arg(long)]
    pub max_dice: Option<u32>,

    /// Roll hidden on behalf of another user
    #[arg(long = "for", value_name = "TARGET")]
    pub target: Option<String>,

    /// Allow rolling on behalf of others
    #[arg(long, requires = "target")]
    pub privileged: bool,
}

pub fn run(session: &Session, args: &RollArgs) -> Result<(), String> {
    let mut engine = session.engine()?;

    let mut opts = if args.check {
        ResolveOptions::check()
    } else {
        ResolveOptions::default()
    };
    if let Some(max) = args.max_dice {
        let limits = engine.config().limits;
        opts = opts.with_limits(limits.with_max_count(max.min(limits.max_count)));
    }
    if let Some(target) = &args.target {
        opts = opts.on_behalf_of(target.as_str(), args.privileged);
    }

    let resolution = engine
        .resolve(&args.expression, &args.user, &opts)
        .map_err(|e| e.to_string())?;
    super::report_unsaved(resolution.persist_warning.as_ref());

    if session.json {
        return super::print_json(&resolution);
    }

    let who = if resolution.hidden {
        format!("{} (hidden, by {})", resolution.subject, args.user)
    } else {
        resolution.subject.clone()
    };
    println!(
        "  {} {} {}",
        who.bold(),
        resolution.expression.to_string().dimmed(),
        resolution.outcome
    );
    for correction in &resolution.corrections {
        println!("    {}", correction.to_string().cyan());
    }
    if let Some(critical) = &resolution.critical {
        let line = match critical.kind {
            CriticalKind::Natural1 => critical.description.red(),
            CriticalKind::Natural20 => critical.description.green(),
        };
        println!("    {line}");
    }
    Ok(())
}
