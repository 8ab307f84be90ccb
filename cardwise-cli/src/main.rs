use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cardwise_core::{
    CapBucket, CapOverflow, CapPeriod, CapStatus, CapUnit, Card, Category, EntryKind,
    PurchaseContext, RedemptionPartner, Recommendation, RewardCurrency, RewardRule, RuleScope,
    TierLevel, ValueSource, Wallet,
};
use cardwise_store::{
    demo_wallet, export_history_csv, load_wallet, parse_statement_csv, save_wallet, wallet_path,
};

mod config;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "cardwise", version, about = "Reward engine and card recommender CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create ~/.cardwise with a fresh wallet and default config
    Init {
        /// Seed the demo wallet instead of an empty one
        #[arg(long)]
        demo: bool,
    },

    /// Card management
    Card {
        #[command(subcommand)]
        command: CardCommand,
    },

    /// Reward rule management
    Rule {
        #[command(subcommand)]
        command: RuleCommand,
    },

    /// Cap bucket management
    Cap {
        #[command(subcommand)]
        command: CapCommand,
    },

    /// Redemption partner management
    Partner {
        #[command(subcommand)]
        command: PartnerCommand,
    },

    /// Rank every active card for a purchase
    Recommend {
        #[command(flatten)]
        purchase: PurchaseArgs,

        /// Print the ranked list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Dry-run a purchase against one card, with the full breakdown
    Evaluate {
        #[arg(long)]
        card: Option<u64>,

        #[command(flatten)]
        purchase: PurchaseArgs,

        /// Print the evaluation as JSON
        #[arg(long)]
        json: bool,
    },

    /// Post a purchase and earn its reward
    Spend {
        #[arg(long)]
        card: Option<u64>,

        #[command(flatten)]
        purchase: PurchaseArgs,
    },

    /// Reverse a posted transaction with a compensating entry
    Reverse {
        /// Transaction id to reverse
        #[arg(long)]
        transaction: u64,

        /// Reversal date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Append a manual ledger adjustment
    Adjust {
        #[arg(long)]
        card: Option<u64>,

        /// bonus | referral | correction | redemption | expiry
        #[arg(long)]
        kind: String,

        /// Magnitude; corrections may be signed
        #[arg(long, allow_hyphen_values = true)]
        amount: f64,

        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        note: Option<String>,
    },

    /// Current redeemable balance of a card
    Balance {
        #[arg(long)]
        card: Option<u64>,
    },

    /// Ledger history, optionally exported to CSV
    History {
        #[arg(long)]
        card: Option<u64>,

        /// Write the full ledger to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Post every purchase in a statement CSV
    Import {
        #[arg(long)]
        card: Option<u64>,

        /// Statement CSV (defaults to the configured statement file)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Parse and summarize without posting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Spend and reward grouped by category
    Summary {
        /// Restrict to one card
        #[arg(long)]
        card: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum CardCommand {
    /// Register a card
    Add {
        #[arg(long)]
        name: String,

        /// Cashback card instead of points
        #[arg(long)]
        cashback: bool,

        #[arg(long)]
        issuer: Option<String>,

        /// Statement cycle anchor day (1-28)
        #[arg(long, default_value_t = 1)]
        cycle_day: u32,

        /// base | silver | gold | platinum
        #[arg(long)]
        tier: Option<String>,

        #[arg(long)]
        tier_multiplier: Option<f64>,

        /// Value of one point in wallet currency
        #[arg(long)]
        point_value: Option<f64>,

        /// Multiplier of the card's base rule
        #[arg(long, default_value_t = 1.0)]
        base_multiplier: f64,

        #[arg(long)]
        annual_fee: Option<f64>,

        #[arg(long)]
        credit_limit: Option<f64>,
    },

    /// List every card
    List,

    /// Delete a card, its rules, caps and history
    Remove {
        #[arg(long)]
        id: u64,
    },

    /// Suspend a card without losing history
    Disable {
        #[arg(long)]
        id: u64,
    },

    /// Reactivate a suspended card
    Enable {
        #[arg(long)]
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
enum RuleCommand {
    /// Add a reward rule; scope is --category, --merchant, --portal or base
    Add {
        #[arg(long)]
        card: Option<u64>,

        /// Earn multiplier; required unless --exclude
        #[arg(long)]
        multiplier: Option<f64>,

        /// Category slug, e.g. dining or travel-flights
        #[arg(long)]
        category: Option<String>,

        /// Merchant substring, matched case-insensitively
        #[arg(long)]
        merchant: Option<String>,

        /// Portal name, matched case-insensitively
        #[arg(long)]
        portal: Option<String>,

        /// The scope never earns on this card
        #[arg(long)]
        exclude: bool,

        /// Refuse to stack with other rules of the same specificity
        #[arg(long)]
        exclusive: bool,

        /// Minimum card tier: base | silver | gold | platinum
        #[arg(long)]
        min_tier: Option<String>,

        /// Minimum purchase amount for the rule to open
        #[arg(long)]
        min_spend: Option<f64>,

        /// Attach a cap bucket by id (repeatable)
        #[arg(long = "cap")]
        caps: Vec<u64>,

        /// Over-cap behavior: degrade | forfeit
        #[arg(long)]
        overflow: Option<String>,
    },

    /// List a card's rules
    List {
        #[arg(long)]
        card: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum CapCommand {
    /// Add a cap bucket to a card
    Add {
        #[arg(long)]
        card: Option<u64>,

        /// Label shown in statuses
        #[arg(long)]
        label: String,

        /// monthly | quarterly
        #[arg(long, default_value = "monthly")]
        period: String,

        /// What the bucket counts: spend | reward
        #[arg(long, default_value = "spend")]
        unit: String,

        #[arg(long)]
        limit: f64,
    },

    /// Show every bucket's usage for a date
    Status {
        #[arg(long)]
        card: Option<u64>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand, Debug)]
enum PartnerCommand {
    /// Add a redemption partner to a card
    Add {
        #[arg(long)]
        card: Option<u64>,

        #[arg(long)]
        name: String,

        /// Partner points per card point transferred
        #[arg(long, default_value_t = 1.0)]
        ratio: f64,

        /// Value of one partner point in wallet currency
        #[arg(long)]
        value: f64,
    },

    /// List a card's partners
    List {
        #[arg(long)]
        card: Option<u64>,
    },
}

/// Purchase fields shared by recommend, evaluate and spend.
#[derive(Args, Debug)]
struct PurchaseArgs {
    #[arg(long)]
    amount: f64,

    /// Purchase date (YYYY-MM-DD, default today)
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long)]
    merchant: Option<String>,

    #[arg(long)]
    portal: Option<String>,

    /// Category slug; resolved from merchant or portal when omitted
    #[arg(long)]
    category: Option<String>,
}

impl PurchaseArgs {
    fn context(&self) -> Result<PurchaseContext> {
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());
        let mut ctx = PurchaseContext::new(self.amount, date);
        if let Some(merchant) = &self.merchant {
            ctx = ctx.with_merchant(merchant.clone());
        }
        if let Some(portal) = &self.portal {
            ctx = ctx.with_portal(portal.clone());
        }
        if let Some(category) = &self.category {
            ctx = ctx.with_category(parse_category(category)?);
        }
        Ok(ctx)
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config()?;

    match cli.command {
        Command::Init { demo } => run_init(demo)?,
        Command::Card { command } => card_command(command, &cfg)?,
        Command::Rule { command } => rule_command(command, &cfg)?,
        Command::Cap { command } => cap_command(command, &cfg)?,
        Command::Partner { command } => partner_command(command, &cfg)?,
        Command::Recommend { purchase, json } => run_recommend(&purchase, json, &cfg)?,
        Command::Evaluate { card, purchase, json } => run_evaluate(card, &purchase, json, &cfg)?,
        Command::Spend { card, purchase } => run_spend(card, &purchase, &cfg)?,
        Command::Reverse { transaction, date } => run_reverse(transaction, date)?,
        Command::Adjust {
            card,
            kind,
            amount,
            date,
            note,
        } => run_adjust(card, &kind, amount, date, note, &cfg)?,
        Command::Balance { card } => run_balance(card, &cfg)?,
        Command::History { card, export } => run_history(card, export, &cfg)?,
        Command::Import { card, csv, dry_run } => run_import(card, csv, dry_run, &cfg)?,
        Command::Summary { card } => run_summary(card, &cfg)?,
    }

    Ok(())
}

fn run_init(demo: bool) -> Result<()> {
    let path = wallet_path()?;
    if path.exists() {
        println!("Wallet already exists: {}", path.display());
    } else {
        let wallet = if demo { demo_wallet()? } else { Wallet::new() };
        save_wallet(&path, &wallet)?;
        let label = if demo { "demo wallet" } else { "empty wallet" };
        println!("Wrote {} ({})", path.display(), label);
    }
    config::init_config()?;
    Ok(())
}

fn card_command(command: CardCommand, cfg: &Config) -> Result<()> {
    let path = wallet_path()?;
    let wallet = load_wallet(&path)?;
    match command {
        CardCommand::Add {
            name,
            cashback,
            issuer,
            cycle_day,
            tier,
            tier_multiplier,
            point_value,
            base_multiplier,
            annual_fee,
            credit_limit,
        } => {
            let mut card = if cashback {
                Card::cashback(name)
            } else {
                Card::points(name)
            };
            card = card.with_cycle_day(cycle_day);
            if let Some(issuer) = issuer {
                card = card.with_issuer(issuer);
            }
            if let Some(tier) = tier {
                card = card.with_tier(parse_tier(&tier)?);
            }
            if let Some(m) = tier_multiplier {
                card = card.with_tier_multiplier(m);
            }
            if let Some(v) = point_value {
                card = card.with_point_value(v);
            }
            if let Some(fee) = annual_fee {
                card = card.with_annual_fee(fee);
            }
            if let Some(limit) = credit_limit {
                card = card.with_credit_limit(limit);
            }
            let id = wallet.add_card(card, base_multiplier)?;
            save_wallet(&path, &wallet)?;
            println!("Added card #{} (base {}x)", id, base_multiplier);
        }
        CardCommand::List => {
            let cards = wallet.cards();
            if cards.is_empty() {
                println!("No cards yet. Try `cardwise init --demo` or `cardwise card add`.");
            }
            for card in cards {
                print_card(&card, cfg);
            }
        }
        CardCommand::Remove { id } => {
            wallet.remove_card(id)?;
            save_wallet(&path, &wallet)?;
            println!("Removed card #{} and its history", id);
        }
        CardCommand::Disable { id } => {
            wallet.set_card_active(id, false)?;
            save_wallet(&path, &wallet)?;
            println!("Disabled card #{}", id);
        }
        CardCommand::Enable { id } => {
            wallet.set_card_active(id, true)?;
            save_wallet(&path, &wallet)?;
            println!("Enabled card #{}", id);
        }
    }
    Ok(())
}

fn rule_command(command: RuleCommand, cfg: &Config) -> Result<()> {
    let path = wallet_path()?;
    let wallet = load_wallet(&path)?;
    match command {
        RuleCommand::Add {
            card,
            multiplier,
            category,
            merchant,
            portal,
            exclude,
            exclusive,
            min_tier,
            min_spend,
            caps,
            overflow,
        } => {
            let card_id = resolve_card(card, cfg)?;
            let scope = rule_scope(&category, &merchant, &portal)?;
            let mut rule = if exclude {
                RewardRule::excluding(scope)
            } else {
                let m = multiplier.context("--multiplier is required unless --exclude")?;
                RewardRule::new(scope, m)
            };
            if exclusive {
                rule = rule.with_exclusive();
            }
            if let Some(tier) = min_tier {
                rule = rule.with_min_tier(parse_tier(&tier)?);
            }
            if let Some(min) = min_spend {
                rule = rule.with_min_spend(min);
            }
            for bucket in caps {
                rule = rule.with_cap(bucket);
            }
            if let Some(overflow) = overflow {
                rule = rule.with_overflow(parse_overflow(&overflow)?);
            }
            let id = wallet.add_rule(card_id, rule)?;
            save_wallet(&path, &wallet)?;
            println!("Added rule #{} to card #{}", id, card_id);
        }
        RuleCommand::List { card } => {
            let card_id = resolve_card(card, cfg)?;
            for rule in wallet.rules(card_id)? {
                print_rule(&rule, cfg);
            }
        }
    }
    Ok(())
}

fn cap_command(command: CapCommand, cfg: &Config) -> Result<()> {
    let path = wallet_path()?;
    let wallet = load_wallet(&path)?;
    match command {
        CapCommand::Add {
            card,
            label,
            period,
            unit,
            limit,
        } => {
            let card_id = resolve_card(card, cfg)?;
            let bucket = CapBucket::new(label, parse_period(&period)?, parse_unit(&unit)?, limit);
            let id = wallet.add_cap_bucket(card_id, bucket)?;
            save_wallet(&path, &wallet)?;
            println!("Added cap bucket #{} to card #{}", id, card_id);
        }
        CapCommand::Status { card, date } => {
            let card_id = resolve_card(card, cfg)?;
            let on = date.unwrap_or_else(|| Local::now().date_naive());
            let statuses = wallet.cap_statuses(card_id, on)?;
            if statuses.is_empty() {
                println!("Card #{} has no cap buckets", card_id);
            }
            for status in statuses {
                print_cap_status(&status);
            }
        }
    }
    Ok(())
}

fn partner_command(command: PartnerCommand, cfg: &Config) -> Result<()> {
    let path = wallet_path()?;
    let wallet = load_wallet(&path)?;
    match command {
        PartnerCommand::Add {
            card,
            name,
            ratio,
            value,
        } => {
            let card_id = resolve_card(card, cfg)?;
            let id = wallet.add_partner(card_id, RedemptionPartner::new(name, ratio, value))?;
            save_wallet(&path, &wallet)?;
            println!("Added partner #{} to card #{}", id, card_id);
        }
        PartnerCommand::List { card } => {
            let card_id = resolve_card(card, cfg)?;
            for partner in wallet.partners(card_id)? {
                println!(
                    "#{} {} | ratio {:.2} | {}{:.2}/pt | effective {}{:.2}/pt",
                    partner.id,
                    partner.name,
                    partner.transfer_ratio,
                    cfg.display.currency_symbol,
                    partner.unit_value,
                    cfg.display.currency_symbol,
                    partner.effective_point_value(),
                );
            }
        }
    }
    Ok(())
}

fn run_recommend(purchase: &PurchaseArgs, json: bool, cfg: &Config) -> Result<()> {
    let wallet = load_wallet(&wallet_path()?)?;
    let ctx = purchase.context()?;
    let rows = wallet.recommend(&ctx);
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No active cards to rank.");
        return Ok(());
    }
    println!(
        "Best cards for {}{:.2} on {}:\n",
        cfg.display.currency_symbol,
        ctx.amount,
        ctx.date
    );
    for row in &rows {
        print_recommendation(row, cfg);
    }
    Ok(())
}

fn run_evaluate(card: Option<u64>, purchase: &PurchaseArgs, json: bool, cfg: &Config) -> Result<()> {
    let wallet = load_wallet(&wallet_path()?)?;
    let card_id = resolve_card(card, cfg)?;
    let ctx = purchase.context()?;
    let eval = wallet.evaluate(&ctx, card_id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&eval)?);
        return Ok(());
    }
    let currency = wallet.card(card_id)?.currency;
    println!(
        "{} earns {} on {}{:.2}",
        eval.card_name,
        fmt_reward(eval.reward, currency),
        cfg.display.currency_symbol,
        ctx.amount
    );
    if eval.breakdown.excluded {
        println!("  {}", eval.breakdown.rule_summary());
        return Ok(());
    }
    for slice in &eval.breakdown.slices {
        println!(
            "  {} {}x on {}{:.2} -> {:.2}",
            slice.label,
            slice.multiplier,
            cfg.display.currency_symbol,
            slice.basis,
            slice.reward
        );
    }
    if eval.breakdown.forfeited > 0.0 {
        println!(
            "  {}{:.2} over the cap earns nothing",
            cfg.display.currency_symbol, eval.breakdown.forfeited
        );
    }
    println!(
        "  value {}{:.2} {}",
        cfg.display.currency_symbol,
        eval.valuation.value,
        fmt_source(&eval.valuation.source)
    );
    if let Some(remaining) = eval.cap_remaining_after {
        println!("  cap left after posting: {:.2}", remaining);
    }
    Ok(())
}

fn run_spend(card: Option<u64>, purchase: &PurchaseArgs, cfg: &Config) -> Result<()> {
    let path = wallet_path()?;
    let wallet = load_wallet(&path)?;
    let card_id = resolve_card(card, cfg)?;
    let ctx = purchase.context()?;
    let posted = wallet.post_transaction(card_id, &ctx)?;
    save_wallet(&path, &wallet)?;
    let currency = wallet.card(card_id)?.currency;
    println!(
        "Posted transaction #{}: earned {}, balance {}",
        posted.transaction_id,
        fmt_reward(posted.reward, currency),
        fmt_reward(posted.new_balance, currency)
    );
    for status in &posted.new_cap_state {
        print_cap_status(status);
    }
    Ok(())
}

fn run_reverse(transaction: u64, date: Option<NaiveDate>) -> Result<()> {
    let path = wallet_path()?;
    let wallet = load_wallet(&path)?;
    let on = date.unwrap_or_else(|| Local::now().date_naive());
    let reversed = wallet.reverse_transaction(transaction, on)?;
    save_wallet(&path, &wallet)?;
    println!(
        "Reversed transaction #{}: balance {:.2}",
        transaction, reversed.new_balance
    );
    Ok(())
}

fn run_adjust(
    card: Option<u64>,
    kind: &str,
    amount: f64,
    date: Option<NaiveDate>,
    note: Option<String>,
    cfg: &Config,
) -> Result<()> {
    let path = wallet_path()?;
    let wallet = load_wallet(&path)?;
    let card_id = resolve_card(card, cfg)?;
    let kind = parse_kind(kind)?;
    let on = date.unwrap_or_else(|| Local::now().date_naive());
    let adjusted = wallet.adjust_balance(card_id, kind, amount, on, note)?;
    save_wallet(&path, &wallet)?;
    println!(
        "Recorded {} of {:.2}: balance {:.2}",
        kind.label(),
        amount,
        adjusted.new_balance
    );
    Ok(())
}

fn run_balance(card: Option<u64>, cfg: &Config) -> Result<()> {
    let wallet = load_wallet(&wallet_path()?)?;
    let card_id = resolve_card(card, cfg)?;
    let card = wallet.card(card_id)?;
    let balance = wallet.get_balance(card_id)?;
    println!("{} balance: {}", card.name, fmt_reward(balance, card.currency));
    Ok(())
}

fn run_history(card: Option<u64>, export: Option<PathBuf>, cfg: &Config) -> Result<()> {
    let wallet = load_wallet(&wallet_path()?)?;
    let card_id = resolve_card(card, cfg)?;
    let entries = wallet.ledger_entries(card_id)?;

    if let Some(export_path) = export {
        let file = std::fs::File::create(&export_path)
            .with_context(|| format!("create {}", export_path.display()))?;
        export_history_csv(file, &entries)?;
        println!("Wrote {} entries to {}", entries.len(), export_path.display());
        return Ok(());
    }

    if entries.is_empty() {
        println!("No ledger entries yet.");
        return Ok(());
    }
    let shown = entries.len().min(cfg.display.max_rows);
    if shown < entries.len() {
        println!("(showing last {} of {} entries)", shown, entries.len());
    }
    for entry in entries.iter().skip(entries.len() - shown) {
        let txn = entry
            .transaction_id
            .map(|t| format!("txn #{}", t))
            .unwrap_or_default();
        println!(
            "#{} {} {:<10} {:>+12.2}  {}  {}",
            entry.id,
            entry.date,
            entry.kind.label(),
            entry.amount,
            txn,
            entry.note.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn run_import(card: Option<u64>, csv: Option<PathBuf>, dry_run: bool, cfg: &Config) -> Result<()> {
    let path = wallet_path()?;
    let wallet = load_wallet(&path)?;
    let card_id = resolve_card(card, cfg)?;
    let csv_path = csv.unwrap_or_else(|| PathBuf::from(&cfg.wallet.statement_csv));
    if !csv_path.exists() {
        bail!("CSV not found: {} (pass --csv <path>)", csv_path.display());
    }

    let rows = parse_statement_csv(&csv_path)
        .with_context(|| format!("parsing {}", csv_path.display()))?;
    println!("Parsed {} purchases from {}", rows.len(), csv_path.display());

    if dry_run {
        let mut total = 0.0;
        for row in &rows {
            total += row.amount;
            println!(
                "{} {:<28} {}{:>10.2}  {}",
                row.date,
                row.merchant,
                cfg.display.currency_symbol,
                row.amount,
                row.category.map(|c| c.label()).unwrap_or("-")
            );
        }
        println!(
            "\nWould post {} purchases totalling {}{:.2}",
            rows.len(),
            cfg.display.currency_symbol,
            total
        );
        return Ok(());
    }

    let card = wallet.card(card_id)?;
    let mut earned = 0.0;
    for (i, row) in rows.iter().enumerate() {
        let posted = wallet
            .post_transaction(card_id, &row.context())
            .with_context(|| format!("posting row {} ({})", i + 1, row.merchant))?;
        earned += posted.reward;
    }
    save_wallet(&path, &wallet)?;
    println!(
        "Imported {} purchases; earned {}, balance {}",
        rows.len(),
        fmt_reward(earned, card.currency),
        fmt_reward(wallet.get_balance(card_id)?, card.currency)
    );
    Ok(())
}

fn run_summary(card: Option<u64>, cfg: &Config) -> Result<()> {
    let wallet = load_wallet(&wallet_path()?)?;
    let card_id = match card {
        Some(id) => Some(resolve_card(Some(id), cfg)?),
        None => None,
    };
    let rows = wallet.spend_summary(card_id)?;
    if rows.is_empty() {
        println!("No transactions yet.");
        return Ok(());
    }
    for row in rows {
        println!(
            "{:<26} spend {}{:>12.2} | rewards {:>12.2} | {} txns",
            row.category.label(),
            cfg.display.currency_symbol,
            row.spend,
            row.reward,
            row.transactions
        );
    }
    Ok(())
}

fn resolve_card(arg: Option<u64>, cfg: &Config) -> Result<u64> {
    arg.or(cfg.wallet.default_card)
        .context("no card given (pass --card or set wallet.default_card in config.toml)")
}

fn rule_scope(
    category: &Option<String>,
    merchant: &Option<String>,
    portal: &Option<String>,
) -> Result<RuleScope> {
    match (category, merchant, portal) {
        (Some(c), None, None) => Ok(RuleScope::Category(parse_category(c)?)),
        (None, Some(m), None) => Ok(RuleScope::Merchant(m.clone())),
        (None, None, Some(p)) => Ok(RuleScope::Portal(p.clone())),
        (None, None, None) => Ok(RuleScope::Default),
        _ => bail!("pass at most one of --category, --merchant, --portal"),
    }
}

fn parse_category(s: &str) -> Result<Category> {
    Category::parse(s).with_context(|| format!("unknown category: {s}"))
}

fn parse_tier(s: &str) -> Result<TierLevel> {
    match s.to_ascii_lowercase().as_str() {
        "base" => Ok(TierLevel::Base),
        "silver" => Ok(TierLevel::Silver),
        "gold" => Ok(TierLevel::Gold),
        "platinum" => Ok(TierLevel::Platinum),
        other => bail!("unknown tier: {other}"),
    }
}

fn parse_period(s: &str) -> Result<CapPeriod> {
    match s.to_ascii_lowercase().as_str() {
        "monthly" => Ok(CapPeriod::Monthly),
        "quarterly" => Ok(CapPeriod::Quarterly),
        other => bail!("unknown cap period: {other}"),
    }
}

fn parse_unit(s: &str) -> Result<CapUnit> {
    match s.to_ascii_lowercase().as_str() {
        "spend" => Ok(CapUnit::Spend),
        "reward" => Ok(CapUnit::Reward),
        other => bail!("unknown cap unit: {other}"),
    }
}

fn parse_overflow(s: &str) -> Result<CapOverflow> {
    match s.to_ascii_lowercase().as_str() {
        "degrade" | "base" => Ok(CapOverflow::DegradeToBase),
        "forfeit" => Ok(CapOverflow::Forfeit),
        other => bail!("unknown overflow policy: {other}"),
    }
}

fn parse_kind(s: &str) -> Result<EntryKind> {
    match s.to_ascii_lowercase().as_str() {
        "bonus" => Ok(EntryKind::Bonus),
        "referral" => Ok(EntryKind::Referral),
        "correction" => Ok(EntryKind::Correction),
        "redemption" | "redeem" => Ok(EntryKind::Redemption),
        "expiry" | "expire" => Ok(EntryKind::Expiry),
        "earn" => bail!("earn entries come from `cardwise spend`"),
        other => bail!("unknown adjustment kind: {other}"),
    }
}

fn fmt_reward(reward: f64, currency: RewardCurrency) -> String {
    match currency {
        RewardCurrency::Points => format!("{:.0} pts", reward),
        RewardCurrency::Cashback => format!("{:.2} cashback", reward),
    }
}

fn fmt_source(source: &ValueSource) -> String {
    match source {
        ValueSource::BasePoints => "as statement credit".to_string(),
        ValueSource::Partner(name) => format!("via {}", name),
    }
}

fn print_card(card: &Card, cfg: &Config) {
    let kind = match card.currency {
        RewardCurrency::Points => "points",
        RewardCurrency::Cashback => "cashback",
    };
    let state = if card.active { "active" } else { "disabled" };
    println!(
        "#{} {}{} | {} | cycle day {} | tier {:?} x{:.2} | {}{:.2}/pt | fee {}{:.0} | {}",
        card.id,
        card.name,
        if card.issuer.is_empty() {
            String::new()
        } else {
            format!(" ({})", card.issuer)
        },
        kind,
        card.cycle_day,
        card.tier,
        card.tier_multiplier,
        cfg.display.currency_symbol,
        card.point_value,
        cfg.display.currency_symbol,
        card.annual_fee,
        state
    );
}

fn print_rule(rule: &RewardRule, cfg: &Config) {
    let mut line = format!("#{} {}", rule.id, rule.scope.label());
    if rule.exclusion {
        line.push_str(" | never earns");
    } else {
        line.push_str(&format!(" | {}x", rule.multiplier));
    }
    if rule.exclusive {
        line.push_str(" | exclusive");
    }
    if let Some(tier) = rule.min_tier {
        line.push_str(&format!(" | min tier {:?}", tier));
    }
    if let Some(min) = rule.min_spend {
        line.push_str(&format!(" | min spend {}{:.0}", cfg.display.currency_symbol, min));
    }
    if !rule.cap_buckets.is_empty() {
        line.push_str(&format!(" | caps {:?}", rule.cap_buckets));
        let overflow = match rule.overflow {
            CapOverflow::DegradeToBase => "degrade",
            CapOverflow::Forfeit => "forfeit",
        };
        line.push_str(&format!(" | overflow {}", overflow));
    }
    println!("{line}");
}

fn print_cap_status(status: &CapStatus) {
    let unit = match status.unit {
        CapUnit::Spend => "spend",
        CapUnit::Reward => "reward",
    };
    let warn = if status.low_headroom { "  (low headroom)" } else { "" };
    println!(
        "cap #{} {} [{}] | {:.0}/{:.0} used, {:.0} left | {} to {}{}",
        status.bucket_id,
        status.label,
        unit,
        status.accumulated,
        status.limit,
        status.remaining,
        status.window_start,
        status.window_end,
        warn
    );
}

fn print_recommendation(row: &Recommendation, cfg: &Config) {
    let marker = if row.excluded { "  [excluded]" } else { "" };
    println!(
        "#{} {:<24} {} | value {}{:.2} {} | {}{}",
        row.rank,
        row.card_name,
        fmt_reward(row.reward, row.currency),
        cfg.display.currency_symbol,
        row.value,
        fmt_source(&row.value_source),
        row.rule_summary,
        marker
    );
    if let Some(status) = &row.cap_status {
        print!("   ");
        print_cap_status(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_aliases() {
        assert_eq!(parse_kind("redeem").unwrap(), EntryKind::Redemption);
        assert_eq!(parse_kind("EXPIRY").unwrap(), EntryKind::Expiry);
        assert!(parse_kind("earn").is_err());
        assert!(parse_kind("magic").is_err());
    }

    #[test]
    fn test_rule_scope_resolution() {
        let scope = rule_scope(&Some("dining".to_string()), &None, &None).unwrap();
        assert_eq!(scope, RuleScope::Category(Category::Dining));
        assert_eq!(rule_scope(&None, &None, &None).unwrap(), RuleScope::Default);
        assert!(
            rule_scope(&Some("dining".to_string()), &Some("Swiggy".to_string()), &None).is_err()
        );
    }

    #[test]
    fn test_parse_tier_and_overflow() {
        assert_eq!(parse_tier("Gold").unwrap(), TierLevel::Gold);
        assert_eq!(parse_overflow("forfeit").unwrap(), CapOverflow::Forfeit);
        assert_eq!(parse_overflow("degrade").unwrap(), CapOverflow::DegradeToBase);
        assert!(parse_period("weekly").is_err());
    }
}
