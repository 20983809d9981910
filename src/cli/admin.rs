use super::ui;
use crate::core::editor::AdminEditor;
use crate::core::convert::format_rate;
use anyhow::Result;
use comfy_table::Cell;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const HELP: &str = "\
Commands:
  show                 Show the rates being edited
  rate <CCY> <value>   Set one currency's rate
  period <label>       Relabel every rate with a new period
  save <name>          Save the rates as a local draft
  load <name>          Replace the rates with a saved draft
  drafts               List saved drafts
  publish              Upsert the rates to the rate store
  reload               Discard edits and fetch the latest period
  help                 Show this help
  quit                 Leave the editor";

/// A parsed shell line.
#[derive(Debug, PartialEq)]
pub enum AdminCommand {
    Show,
    Rate { currency: String, value: String },
    Period(String),
    Save(String),
    Load(String),
    Drafts,
    Publish,
    Reload,
    Help,
    Quit,
}

impl AdminCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(AdminCommand::Show);
        };
        let rest: Vec<&str> = parts.collect();
        let arg = rest.join(" ");
        let command = match (verb.to_lowercase().as_str(), rest.as_slice()) {
            ("show", []) => AdminCommand::Show,
            ("rate", [currency, value]) => AdminCommand::Rate {
                currency: currency.to_uppercase(),
                value: value.to_string(),
            },
            ("period", [_, ..]) => AdminCommand::Period(arg),
            ("save", [_, ..]) => AdminCommand::Save(arg),
            ("load", [_, ..]) => AdminCommand::Load(arg),
            ("drafts", []) => AdminCommand::Drafts,
            ("publish", []) => AdminCommand::Publish,
            ("reload", []) => AdminCommand::Reload,
            ("help", _) => AdminCommand::Help,
            ("quit" | "exit", []) => AdminCommand::Quit,
            _ => return Err(format!("Unrecognized command: {line}")),
        };
        Ok(command)
    }
}

fn render_rates(editor: &AdminEditor) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Rate"),
        ui::header_cell("Period"),
    ]);
    for rate in editor.rates() {
        table.add_row(vec![
            Cell::new(&rate.currency),
            ui::number_cell(&format_rate(rate.rate)),
            Cell::new(&rate.period),
        ]);
    }
    format!(
        "Period: {}\n{}",
        ui::style_text(editor.current_period().as_str(), ui::StyleType::Title),
        table
    )
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

/// Runs the editor against `input` until `quit` or end of input.
///
/// The first line is taken as the password when `needs_password` is set.
pub async fn run_shell<R, W>(
    editor: &mut AdminEditor,
    input: R,
    output: &mut W,
    needs_password: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    let password = if needs_password {
        output.write_all(b"Password: ").await?;
        output.flush().await?;
        lines.next_line().await?.unwrap_or_default()
    } else {
        String::new()
    };
    let pb = ui::new_spinner("Fetching rates...");
    let ok = editor.login(password.trim()).await;
    pb.finish_and_clear();
    if !ok {
        write_line(output, &ui::style_text(editor.message(), ui::StyleType::Error)).await?;
        return Ok(());
    }
    write_line(output, &render_rates(editor)).await?;
    write_line(output, &ui::style_text("Type 'help' for commands", ui::StyleType::Subtle)).await?;

    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match AdminCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                write_line(output, &ui::style_text(&e, ui::StyleType::Error)).await?;
                continue;
            }
        };

        match command {
            AdminCommand::Show => {
                write_line(output, &render_rates(editor)).await?;
                continue;
            }
            AdminCommand::Help => {
                write_line(output, HELP).await?;
                continue;
            }
            AdminCommand::Quit => break,
            AdminCommand::Drafts => {
                let drafts = editor.list_drafts().await;
                let names: Vec<String> = drafts.iter().map(ToString::to_string).collect();
                let listing = if names.is_empty() {
                    "No saved periods".to_string()
                } else {
                    names.join(", ")
                };
                write_line(output, &listing).await?;
                continue;
            }
            AdminCommand::Rate { currency, value } => editor.update_rate(&currency, &value),
            AdminCommand::Period(label) => editor.update_period(&label),
            AdminCommand::Save(name) => editor.save_draft(&name).await,
            AdminCommand::Load(name) => editor.load_draft(&name).await,
            AdminCommand::Publish => {
                editor.publish().await;
            }
            AdminCommand::Reload => editor.reload().await,
        }
        write_line(output, editor.message()).await?;
    }

    editor.logout();
    Ok(())
}
