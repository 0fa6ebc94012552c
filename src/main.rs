use std::fs::{self, File};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use girasol_widget::config::{self, Overrides};
use girasol_widget::{markup, ChatWidget, HttpBackend, Settings, WidgetConfig, WidgetView};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "girasol")]
#[command(about = "Sala Girasol chat widget: terminal host and embeddable markup")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    host: HostArgs,
}

#[derive(Args)]
struct HostArgs {
    /// URL the widget script is served from
    #[arg(long, global = true, env = "GIRASOL_SCRIPT_SRC")]
    script_src: Option<String>,
    /// Backend origin, overrides the one inferred from the script URL
    #[arg(long, global = true, env = "GIRASOL_API")]
    api: Option<String>,
    /// Maximum characters per message
    #[arg(long, global = true)]
    max_chars: Option<usize>,
    /// Require a success status from the readiness probe
    #[arg(long, global = true)]
    strict_probe: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the widget in the terminal (default)
    Chat,
    /// Print the widget markup for embedding in a web page
    ///
    /// The markup is a static snapshot of a freshly mounted widget, with the
    /// input and send button disabled. The embedding page must bind the
    /// `data-action="toggle"` buttons and enable the input once its own
    /// readiness check succeeds.
    Markup {
        /// Fetch the stylesheet and inline it instead of linking it
        #[arg(long)]
        inline_css: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    let log_to_file = matches!(command, Commands::Chat);
    init_logging(log_to_file)?;

    let config = load_config(&cli.host);
    info!(
        origin = ?config.api_origin,
        probe_mode = ?config.probe_mode,
        max_chars = config.max_message_chars,
        "configuration resolved"
    );

    match command {
        Commands::Chat => run_chat(config).await,
        Commands::Markup { inline_css } => print_markup(config, inline_css).await,
    }
}

fn init_logging(to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env("GIRASOL_LOG")
        .unwrap_or_else(|_| EnvFilter::new("girasol_widget=info,girasol=info"));

    if to_file {
        // The terminal is taken over by the UI, so logs go to a file.
        let log_dir = dirs::cache_dir()
            .context("Could not determine cache directory")?
            .join("girasol");
        fs::create_dir_all(&log_dir)?;
        let file = File::create(log_dir.join("girasol.log"))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}

fn load_config(args: &HostArgs) -> WidgetConfig {
    let settings = Settings::load().unwrap_or_else(|err| {
        warn!(error = %err, "ignoring unreadable settings file");
        Settings::default()
    });

    let overrides = Overrides {
        script_src: args.script_src.clone(),
        api_origin: args.api.clone(),
        max_message_chars: args.max_chars,
        strict_probe: args.strict_probe,
    };

    config::resolve(&overrides, &settings)
}

async fn run_chat(config: WidgetConfig) -> Result<()> {
    let backend = HttpBackend::from_config(&config);
    let (widget, widget_events) = ChatWidget::initialize(config, backend);
    let mut app = App::new(widget);
    let mut events = EventHandler::new(widget_events);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event),
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    app.widget.shutdown();
    tui::restore()?;
    result
}

async fn print_markup(config: WidgetConfig, inline_css: bool) -> Result<()> {
    let view = WidgetView::mount(&config.title, config.max_message_chars);

    let style = if inline_css {
        // Wait for the stylesheet to settle either way before emitting the widget.
        match HttpBackend::from_config(&config)
            .fetch_stylesheet(&config.stylesheet_href)
            .await
        {
            Ok(css) => markup::inline_style(&css),
            Err(err) => {
                warn!(error = %err, href = %config.stylesheet_href, "stylesheet unavailable, linking instead");
                markup::stylesheet_link(&config.stylesheet_href)
            }
        }
    } else {
        markup::stylesheet_link(&config.stylesheet_href)
    };

    print!("{}", markup::embed(style, &view));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_chat_is_the_default_command() {
        let cli = Cli::try_parse_from(["girasol", "--max-chars", "80"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.host.max_chars, Some(80));
    }

    #[test]
    fn test_markup_help_describes_static_snapshot() {
        let mut cmd = Cli::command();
        let markup = cmd.find_subcommand_mut("markup").unwrap();
        let help = markup.render_long_help().to_string();
        assert!(help.contains("static snapshot"), "{help}");
        assert!(help.contains("disabled"), "{help}");
        assert!(help.contains("data-action"), "{help}");
    }

    #[test]
    fn test_markup_output_starts_disabled() {
        let view = WidgetView::mount("Sala", 120);
        let html = markup::embed(markup::stylesheet_link("/widget/style.css"), &view);
        assert!(html.contains("data-action=\"toggle\""));
        let root = markup::widget(&view);
        let input = root.find_by_id("user-input").unwrap();
        assert_eq!(input.attr_value("disabled"), Some(""));
        let send = root.find_by_id("send-btn").unwrap();
        assert_eq!(send.attr_value("disabled"), Some(""));
    }
}
