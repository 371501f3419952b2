use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use homedir::my_home;
use tracing_subscriber::EnvFilter;

use omnibox::actions::{build_query_string, group_values, parse_query_string, standard_actions, ActionRef, ActionValue};
use omnibox::config::Config;
use omnibox::filter_types::FilterTypeRegistry;
use omnibox::memory::StaticQuery;
use omnibox::omnibox::{Event, Key, OmniBox};

mod cli;

use cli::{ChipView, ChipsView, Command, OptionView};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn base_path(arg: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = arg {
        return Ok(path);
    }
    if let Ok(path) = std::env::var("OMNIBOX_BASE_PATH") {
        return Ok(PathBuf::from(path));
    }

    let home = my_home()
        .context("could not determine home directory")?
        .context("home directory path is empty")?;
    Ok(home.join(".local/share/omnibox"))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn chips_view(values: &[ActionValue]) -> ChipsView {
    ChipsView {
        chips: values.iter().map(ChipView::from).collect(),
        query: build_query_string(&group_values(values)),
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = cli::Args::parse();

    let base_path = base_path(args.base_path)?;
    let config = Config::load_with(&base_path)
        .with_context(|| format!("failed to load config from {}", base_path.display()))?;

    let schema_path = args.schema.unwrap_or_else(|| base_path.join("schema.yaml"));
    let query = Arc::new(
        StaticQuery::load(&schema_path)
            .with_context(|| format!("failed to load schema {}", schema_path.display()))?,
    );
    tracing::debug!(
        columns = query.columns.len(),
        views = query.views.len(),
        rows = query.rows.len(),
        "schema loaded"
    );

    let actions = standard_actions(
        &config,
        query.clone(),
        query,
        Arc::new(FilterTypeRegistry::standard()),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(run(args.command, config, actions))
}

async fn run(command: Command, config: Config, actions: Vec<ActionRef>) -> anyhow::Result<()> {
    match command {
        Command::Suggest { input } => {
            let mut omnibox = OmniBox::new(actions, config.omnibox);
            omnibox.send(Event::Focus).await;
            omnibox.type_text(&input).await;

            let options: Vec<OptionView> = omnibox.state().options.iter().map(OptionView::from).collect();
            print_json(&options)
        }

        Command::Complete { inputs } => {
            let mut omnibox = OmniBox::new(actions, config.omnibox);
            omnibox.send(Event::Focus).await;

            for input in inputs {
                if !commit(&mut omnibox, &input).await {
                    bail!("could not complete '{input}'");
                }
            }
            print_json(&chips_view(omnibox.values()))
        }

        Command::Decode { query } => {
            let values = parse_query_string(&query, &actions).await;
            print_json(&chips_view(&values))
        }

        Command::Repl {} => repl(actions, config).await,
    }
}

/// Types `input` and presses Enter. Returns whether a chip was committed;
/// on failure the input is left in place.
async fn commit(omnibox: &mut OmniBox, input: &str) -> bool {
    let before = omnibox.values().len();
    omnibox.type_text(input).await;
    omnibox.press(Key::Enter).await;

    let committed = omnibox.values().len() > before;
    if !committed {
        tracing::debug!(input, "input did not complete");
    }
    committed
}

async fn repl(actions: Vec<ActionRef>, config: Config) -> anyhow::Result<()> {
    let mut omnibox = OmniBox::new(actions, config.omnibox).on_change(|collections, _actions| {
        println!("query: {}", build_query_string(collections));
    });
    omnibox.send(Event::Focus).await;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            "" => continue,
            ":quit" | ":q" => break,
            ":chips" => {
                for chip in omnibox.values() {
                    println!("[{}] {}", chip.action.name(), chip.display_value());
                }
            }
            ":undo" => match omnibox.values().len() {
                0 => println!("nothing to undo"),
                len => omnibox.send(Event::RemoveValue(len - 1)).await,
            },
            ":clear" => {
                omnibox.send(Event::SetValues(Vec::new())).await;
                omnibox.send(Event::Focus).await;
            }
            input => {
                if !commit(&mut omnibox, input).await {
                    println!("could not complete '{input}'");
                    for option in omnibox.state().options.iter().filter(|o| o.selectable) {
                        match &option.next_label {
                            Some(next) => println!("  {}  {}", option.label, next),
                            None => println!("  {}", option.label),
                        }
                    }
                    omnibox.send(Event::InputChange(String::new())).await;
                }
            }
        }
    }

    Ok(())
}
